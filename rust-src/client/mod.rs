//! Per-metric client handles.
//!
//! [`Client`] is the concurrent facade: every network call is an await point,
//! so daily and hourly fetches can run side by side. [`BlockingClient`] runs
//! the same futures to completion on a private runtime. [`Facade`] builds
//! whichever of the two a [`ClientConfig`](crate::config::ClientConfig) names.

mod blocking;
mod facade;
mod mode;

pub use blocking::{BlockingClient, BlockingMetricClient};
pub use facade::{Client, MetricClient};
pub use mode::Facade;
