//! Error type shared by the portal client and the history store.

use thiserror::Error;

use crate::config::ExecutionMode;


/// Errors raised while talking to the portal or the local history store.
#[derive(Debug, Error)]
pub enum Error {
    /// The portal answered 401.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The portal answered 403.
    #[error("Unauthorized")]
    Unauthorized,

    /// The portal answered 500.
    #[error("Server error")]
    ServerError,

    /// Any other non-200 answer.
    #[error("Request failed with status code: {0}")]
    UnknownStatus(u16),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// History was requested from a client built without a store.
    #[error("No storage backend configured")]
    NoStorageConfigured,

    #[error("Missing credentials: pass them explicitly or set {0}_USERNAME and {0}_PASSWORD")]
    MissingCredentials(String),

    /// A constructor was handed a config for the other execution mode.
    #[error("Config asks for {found} mode, but this client runs in {expected} mode")]
    ModeMismatch {
        expected: ExecutionMode,
        found: ExecutionMode,
    },

    #[error("Invalid portal URL: {0}")]
    InvalidUrl(String),

    /// Transport failure (connection refused, bad body, too many redirects).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The payload did not have the expected shape.
    #[error("Unexpected payload shape: {0}")]
    Payload(#[from] serde_json::Error),

    /// The payload had the right shape but inconsistent content.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("History store lock poisoned")]
    StorePoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}


pub type Result<T> = std::result::Result<T, Error>;
