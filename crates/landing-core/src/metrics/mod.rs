//! Prometheus metrics for both stages.
//!
//! Components describe what happened as event structs in `events` and hand
//! them to [`emit!`](crate::emit); the event decides which counters and
//! histograms to touch. `server` owns the recorder and the scrape endpoint.

pub mod events;
pub mod server;

pub use server::{DEFAULT_METRICS_ADDR, MetricsController, init_global, init_test};

/// Record an [`events::InternalEvent`].
///
/// ```ignore
/// emit!(AreaLoadCompleted { status: AreaLoadStatus::Empty, area: "entity".into() });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
