//! The concurrent client.

use std::marker::PhantomData;
use std::sync::Mutex;

use tracing::info;

use crate::config::{ClientConfig, Credentials, ExecutionMode, Provider};
use crate::error::{Error, Result};
use crate::models::{DailyMeasure, HourlyMeasure, Metric};
use crate::portal::{authenticate, fetch_dataset, Portal, Session};
use crate::storage::{HistoryQuery, HistoryStore, SaveSummary, StoredMeasure};


/// Portal client with an optional history store.
pub struct Client {
    portal: Portal,
    credentials: Option<Credentials>,
    store: Option<Mutex<HistoryStore>>,
}


impl Client {
    /// A client without credentials or storage.
    pub fn new(provider: Provider) -> Self {
        Self {
            portal: Portal::new(provider),
            credentials: None,
            store: None,
        }
    }

    /// Build from a [`ExecutionMode::Concurrent`] configuration, opening the
    /// store if a path is set and picking up credentials from the provider's
    /// environment prefix.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.require_mode(ExecutionMode::Concurrent)?;
        Self::open(config)
    }

    /// [`Client::from_config`] without the mode check.
    pub(super) fn open(config: &ClientConfig) -> Result<Self> {
        let mut client = Self::new(config.provider.clone());
        client.credentials = Credentials::from_env(config.provider.env_prefix());
        if let Some(path) = &config.db_path {
            client = client.with_store(HistoryStore::open(path)?);
        }
        Ok(client)
    }

    pub fn with_store(mut self, store: HistoryStore) -> Self {
        self.store = Some(Mutex::new(store));
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn portal(&self) -> &Portal {
        &self.portal
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Remember the credentials and check them with one authentication.
    ///
    /// Fetches still authenticate again on every call.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Session> {
        self.credentials = Some(Credentials::new(username, password));
        authenticate(&self.portal, self.credentials()?).await
    }

    pub fn daily(&self) -> MetricClient<'_, DailyMeasure> {
        MetricClient::new(self)
    }

    pub fn hourly(&self) -> MetricClient<'_, HourlyMeasure> {
        MetricClient::new(self)
    }

    fn credentials(&self) -> Result<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            Error::MissingCredentials(self.portal.provider().env_prefix().to_string())
        })
    }

    fn with_store_locked<T>(&self, f: impl FnOnce(&mut HistoryStore) -> Result<T>) -> Result<T> {
        let store = self.store.as_ref().ok_or(Error::NoStorageConfigured)?;
        let mut guard = store.lock().map_err(|_| Error::StorePoisoned)?;
        f(&mut *guard)
    }
}


/// Handle on one metric of a [`Client`].
pub struct MetricClient<'a, M> {
    client: &'a Client,
    _measure: PhantomData<fn() -> M>,
}


impl<'a, M: StoredMeasure> MetricClient<'a, M> {
    fn new(client: &'a Client) -> Self {
        Self {
            client,
            _measure: PhantomData,
        }
    }

    pub fn metric(&self) -> Metric {
        M::METRIC
    }

    /// Authenticate, download and parse the current dataset.
    pub async fn download(&self) -> Result<Vec<M>> {
        let portal = &self.client.portal;
        let session = authenticate(portal, self.client.credentials()?).await?;
        let raw = fetch_dataset(&session, portal, M::METRIC).await?;
        let rows = M::parse_dataset(&raw)?;
        info!(metric = %M::METRIC, rows = rows.len(), "downloaded dataset");
        Ok(rows)
    }

    /// Download the dataset; with a store, save it and return the whole
    /// stored history, otherwise return the downloaded rows.
    pub async fn fetch(&self) -> Result<Vec<M>> {
        let rows = self.download().await?;
        if !self.client.has_store() {
            return Ok(rows);
        }

        self.client.with_store_locked(|store| {
            store.save(&rows)?;
            store.get_history(&HistoryQuery::default())
        })
    }

    pub fn save(&self, rows: &[M]) -> Result<SaveSummary> {
        self.client.with_store_locked(|store| store.save(rows))
    }

    pub fn get_history(&self, query: &HistoryQuery) -> Result<Vec<M>> {
        self.client.with_store_locked(|store| store.get_history(query))
    }

    pub fn last_timestamp(&self) -> Result<Option<i64>> {
        self.client.with_store_locked(|store| store.last_timestamp::<M>())
    }
}
