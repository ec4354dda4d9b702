//! WaterSmart portal client with a local consumption history.
//!
//! Logs into a WaterSmart-hosted utility portal, downloads daily and hourly
//! water consumption, and keeps it in SQLite keyed by timestamp.

pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod models;
pub mod portal;
pub mod storage;

pub use client::{BlockingClient, BlockingMetricClient, Client, Facade, MetricClient};
pub use config::{ClientConfig, Credentials, ExecutionMode, Provider};
pub use error::{Error, Result};
pub use models::{DailyMeasure, HourlyMeasure, Measure, Metric};
pub use storage::{HistoryQuery, HistoryStore, SaveSummary};
