//! Configuration for the portal client.

mod settings;

pub use settings::{
    get_db_path,
    ClientConfig,
    Credentials,
    ExecutionMode,
    Provider,
    DEFAULT_DB_NAME,
    DEFAULT_PROVIDER,
    GENERIC_ENV_PREFIX,
};
