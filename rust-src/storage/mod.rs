//! Local history of fetched measures.

mod database;
mod query;

pub use database::{HistoryStore, SaveSummary, StoreStats, StoredMeasure};
pub use query::HistoryQuery;
