//! Blocking wrapper around [`Client`].

use tokio::runtime::{Builder, Runtime};

use super::{Client, MetricClient};
use crate::config::{ClientConfig, Credentials, ExecutionMode};
use crate::error::Result;
use crate::models::{DailyMeasure, HourlyMeasure, Metric};
use crate::portal::Session;
use crate::storage::{HistoryQuery, SaveSummary, StoredMeasure};


/// A [`Client`] whose network calls block the calling thread.
///
/// Must not be used from inside an async runtime.
pub struct BlockingClient {
    inner: Client,
    runtime: Runtime,
}


impl BlockingClient {
    pub fn new(inner: Client) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    /// Build from a [`ExecutionMode::Blocking`] configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.require_mode(ExecutionMode::Blocking)?;
        Self::new(Client::open(config)?)
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.inner = self.inner.with_credentials(credentials);
        self
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<Session> {
        self.runtime.block_on(self.inner.login(username, password))
    }

    pub fn daily(&self) -> BlockingMetricClient<'_, DailyMeasure> {
        BlockingMetricClient {
            inner: self.inner.daily(),
            runtime: &self.runtime,
        }
    }

    pub fn hourly(&self) -> BlockingMetricClient<'_, HourlyMeasure> {
        BlockingMetricClient {
            inner: self.inner.hourly(),
            runtime: &self.runtime,
        }
    }

    /// The async client underneath, for store-only calls.
    pub fn get_ref(&self) -> &Client {
        &self.inner
    }
}


/// Blocking handle on one metric.
pub struct BlockingMetricClient<'a, M> {
    inner: MetricClient<'a, M>,
    runtime: &'a Runtime,
}


impl<'a, M: StoredMeasure> BlockingMetricClient<'a, M> {
    pub fn metric(&self) -> Metric {
        self.inner.metric()
    }

    pub fn download(&self) -> Result<Vec<M>> {
        self.runtime.block_on(self.inner.download())
    }

    pub fn fetch(&self) -> Result<Vec<M>> {
        self.runtime.block_on(self.inner.fetch())
    }

    pub fn save(&self, rows: &[M]) -> Result<SaveSummary> {
        self.inner.save(rows)
    }

    pub fn get_history(&self, query: &HistoryQuery) -> Result<Vec<M>> {
        self.inner.get_history(query)
    }

    pub fn last_timestamp(&self) -> Result<Option<i64>> {
        self.inner.last_timestamp()
    }
}
