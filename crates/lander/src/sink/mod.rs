//! Table sinks for landed records.

mod delta;

pub use delta::DeltaSink;
