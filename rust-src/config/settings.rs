//! Provider catalogue, credentials and path defaults.

use std::env;
use std::fmt;
use std::path::PathBuf;

use reqwest::Url;
use secrecy::SecretString;

use crate::error::{Error, Result};


/// Provider used when none is given.
pub const DEFAULT_PROVIDER: &str = "santacruz";

/// File name of the history database.
pub const DEFAULT_DB_NAME: &str = "history.db";

/// Credential prefix for portals that are not in the built-in list.
pub const GENERIC_ENV_PREFIX: &str = "WS";

/// Known hosted portals and the environment prefix for their credentials.
const KNOWN_PROVIDERS: &[(&str, &str)] = &[("santacruz", "SCMU")];


/// A WaterSmart-hosted portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    key: String,
    root_url: String,
    env_prefix: String,
}


impl Provider {
    /// Look up one of the built-in providers.
    pub fn known(key: &str) -> Result<Self> {
        let (key, prefix) = KNOWN_PROVIDERS
            .iter()
            .find(|(k, _)| *k == key)
            .ok_or_else(|| Error::UnknownProvider(key.to_string()))?;

        Ok(Self {
            key: key.to_string(),
            root_url: format!("https://{key}.watersmart.com/index.php"),
            env_prefix: prefix.to_string(),
        })
    }

    /// A portal at an explicit root URL. A built-in key keeps its
    /// credential prefix; anything else uses [`GENERIC_ENV_PREFIX`].
    pub fn custom(key: &str, root_url: &str) -> Result<Self> {
        let parsed = Url::parse(root_url)
            .map_err(|e| Error::InvalidUrl(format!("{root_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "{root_url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let env_prefix = KNOWN_PROVIDERS
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(GENERIC_ENV_PREFIX, |(_, prefix)| *prefix);

        Ok(Self {
            key: key.to_string(),
            root_url: root_url.trim_end_matches('/').to_string(),
            env_prefix: env_prefix.to_string(),
        })
    }

    /// Names of the built-in providers.
    pub fn known_keys() -> impl Iterator<Item = &'static str> {
        KNOWN_PROVIDERS.iter().map(|(k, _)| *k)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Root of the portal, without a trailing slash.
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }
}


impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Blocking => f.write_str("blocking"),
            ExecutionMode::Concurrent => f.write_str("concurrent"),
        }
    }
}


impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.root_url)
    }
}


/// Portal login.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}


impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into().into_boxed_str()),
        }
    }

    /// Read `{prefix}_USERNAME` and `{prefix}_PASSWORD`.
    pub fn from_env(prefix: &str) -> Option<Self> {
        Self::resolve(prefix, None, None)
    }

    /// Take each field from the explicit value if given, otherwise from the
    /// prefixed environment variable.
    pub fn resolve(prefix: &str, username: Option<String>, password: Option<String>) -> Option<Self> {
        let username = username.or_else(|| env::var(format!("{prefix}_USERNAME")).ok())?;
        let password = password.or_else(|| env::var(format!("{prefix}_PASSWORD")).ok())?;
        Some(Self::new(username, password))
    }
}


/// How network calls suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Each call blocks the calling thread.
    #[default]
    Blocking,
    /// Calls are futures; daily and hourly may run together.
    Concurrent,
}


/// Everything needed to build a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub provider: Provider,
    pub mode: ExecutionMode,
    /// `None` runs without a history store.
    pub db_path: Option<PathBuf>,
}


impl ClientConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            mode: ExecutionMode::default(),
            db_path: None,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub(crate) fn require_mode(&self, expected: ExecutionMode) -> Result<()> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(Error::ModeMismatch {
                expected,
                found: self.mode,
            })
        }
    }
}


/// Get the default database path.
pub fn get_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".watersmart")
        .join(DEFAULT_DB_NAME)
}


#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_known_provider() {
        let provider = Provider::known("santacruz").unwrap();
        assert_eq!(provider.key(), "santacruz");
        assert_eq!(
            provider.root_url(),
            "https://santacruz.watersmart.com/index.php"
        );
        assert_eq!(provider.env_prefix(), "SCMU");
    }

    #[test]
    fn test_unknown_provider() {
        let err = Provider::known("atlantis").unwrap_err();
        assert!(matches!(err, Error::UnknownProvider(ref k) if k == "atlantis"));
        assert_eq!(err.to_string(), "Unknown provider: atlantis");
    }

    #[test]
    fn test_custom_provider_trims_slash() {
        let provider = Provider::custom("local", "http://127.0.0.1:8080/index.php/").unwrap();
        assert_eq!(provider.root_url(), "http://127.0.0.1:8080/index.php");
        assert_eq!(provider.env_prefix(), GENERIC_ENV_PREFIX);
    }

    #[test]
    fn test_custom_root_for_known_provider_keeps_prefix() {
        let provider = Provider::custom("santacruz", "http://127.0.0.1:8080/index.php").unwrap();
        assert_eq!(provider.root_url(), "http://127.0.0.1:8080/index.php");
        assert_eq!(provider.env_prefix(), "SCMU");
    }

    #[test]
    fn test_custom_provider_rejects_bad_url() {
        assert!(matches!(
            Provider::custom("x", "not a url"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            Provider::custom("x", "ftp://example.com"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_credentials_from_env() {
        env::set_var("WSTEST_CFG_USERNAME", "user@example.com");
        env::set_var("WSTEST_CFG_PASSWORD", "hunter2");

        let creds = Credentials::from_env("WSTEST_CFG").unwrap();
        assert_eq!(creds.username, "user@example.com");
        assert_eq!(creds.password.expose_secret(), "hunter2");

        assert!(Credentials::from_env("WSTEST_MISSING").is_none());
    }

    #[test]
    fn test_credentials_resolve_per_field() {
        env::set_var("WSTEST_MIX_USERNAME", "env-user");
        env::set_var("WSTEST_MIX_PASSWORD", "env-pass");

        let creds = Credentials::resolve("WSTEST_MIX", Some("typed-user".into()), None).unwrap();
        assert_eq!(creds.username, "typed-user");
        assert_eq!(creds.password.expose_secret(), "env-pass");

        let creds = Credentials::resolve("WSTEST_MIX", None, Some("typed-pass".into())).unwrap();
        assert_eq!(creds.username, "env-user");
        assert_eq!(creds.password.expose_secret(), "typed-pass");

        assert!(Credentials::resolve("WSTEST_NONE", Some("typed-user".into()), None).is_none());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("me", "s3cret");
        assert!(!format!("{creds:?}").contains("s3cret"));
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new(Provider::known(DEFAULT_PROVIDER).unwrap())
            .with_mode(ExecutionMode::Concurrent)
            .with_db_path("/tmp/ws.db");
        assert_eq!(config.mode, ExecutionMode::Concurrent);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/ws.db")));
    }

    #[test]
    fn test_require_mode() {
        let config = ClientConfig::new(Provider::known(DEFAULT_PROVIDER).unwrap());
        assert!(config.require_mode(ExecutionMode::Blocking).is_ok());

        let err = config.require_mode(ExecutionMode::Concurrent).unwrap_err();
        assert!(matches!(
            err,
            Error::ModeMismatch {
                expected: ExecutionMode::Concurrent,
                found: ExecutionMode::Blocking
            }
        ));
        assert_eq!(
            err.to_string(),
            "Config asks for blocking mode, but this client runs in concurrent mode"
        );
    }

    #[test]
    fn test_get_db_path() {
        let path = get_db_path();
        assert!(path.to_string_lossy().contains(".watersmart"));
        assert!(path.to_string_lossy().ends_with(DEFAULT_DB_NAME));
    }
}
