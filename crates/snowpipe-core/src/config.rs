//! Configuration module
//!
//! `PipeConfig` is the explicit property surface for one pipe: the account,
//! user, pipe name and key material used to authenticate, plus the settings the
//! two operations read (history window length, file name expression, request
//! timeout). It is validated when a processor is built and re-read by the
//! trigger whenever the operator changes it; nothing derived from it is cached
//! across calls.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::Path;

use crate::error::PipeError;
use crate::region::Region;

// Common constants
const TRAILING_MINUTES: i64 = 60;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const FILE_NAME_EXPRESSION: &str = "${filename}";

/// How the service host is derived for a pipe identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPolicy {
    /// Use the fully qualified account string (`<account>.<region>.<domain>`) as the host.
    Account,
    /// Use `<account identifier>.<region domain>` as the host.
    Region(Region),
}

impl HostPolicy {
    /// Resolve the host for an account.
    pub fn resolve(&self, account: &str, account_identifier: &str) -> String {
        match self {
            HostPolicy::Account => account.to_string(),
            HostPolicy::Region(region) => format!("{}.{}", account_identifier, region.domain()),
        }
    }
}

#[derive(Clone)]
pub struct PipeConfig {
    /// Fully qualified account, `<account>.<region>.snowflakecomputing.com`
    pub account: String,
    pub user: String,
    /// Pipe name or `${attr}` expression resolved per unit of work
    pub pipe: String,
    /// Base64 PKCS#8 RSA private key
    pub private_key: String,
    pub region: Option<Region>,
    pub trailing_minutes: i64,
    /// File name expression resolved per unit of work
    pub file_name: String,
    pub request_timeout_secs: u64,
    /// Replaces `https://<host>:443` when set, e.g. for a local proxy
    pub base_url: Option<String>,
}

impl fmt::Debug for PipeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("pipe", &self.pipe)
            .field("private_key", &"<redacted>")
            .field("region", &self.region)
            .field("trailing_minutes", &self.trailing_minutes)
            .field("file_name", &self.file_name)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PipeConfig {
    /// Build a configuration with defaults for everything but the required properties.
    pub fn new(
        account: impl Into<String>,
        user: impl Into<String>,
        pipe: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            user: user.into(),
            pipe: pipe.into(),
            private_key: private_key.into(),
            region: None,
            trailing_minutes: TRAILING_MINUTES,
            file_name: FILE_NAME_EXPRESSION.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            base_url: None,
        }
    }

    /// Load from the process environment (and `.env` when present).
    ///
    /// Variables already set in the environment win over `.env`, and `.env` is
    /// only applied once per process. Use [`reload_from_env`](Self::reload_from_env)
    /// to pick up later edits to the file.
    pub fn from_env() -> Result<Self, PipeError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Re-read `.env` from disk and layer it over the process environment.
    ///
    /// Values in the file win, so an operator can change the running
    /// configuration by editing it. Without a `.env` this is the environment alone.
    pub fn reload_from_env() -> Result<Self, PipeError> {
        match dotenvy::dotenv_iter() {
            Ok(entries) => Self::from_dotenv_entries(entries),
            Err(e) if e.not_found() => Self::from_lookup(|key| env::var(key).ok()),
            Err(e) => Err(PipeError::Configuration(format!("Failed to read .env: {}", e))),
        }
    }

    /// Read `path` as a dotenv file layered over the process environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, PipeError> {
        let path = path.as_ref();
        let entries = dotenvy::from_path_iter(path).map_err(|e| {
            PipeError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_dotenv_entries(entries)
    }

    fn from_dotenv_entries<I>(entries: I) -> Result<Self, PipeError>
    where
        I: Iterator<Item = dotenvy::Result<(String, String)>>,
    {
        let file: HashMap<String, String> = entries
            .collect::<Result<_, _>>()
            .map_err(|e| PipeError::Configuration(format!("Malformed .env entry: {}", e)))?;
        Self::from_lookup(|key| file.get(key).cloned().or_else(|| env::var(key).ok()))
    }

    /// Load from an arbitrary key lookup (e.g. for tests; avoids env mutation).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PipeError::Configuration(format!("{} must be set", key)))
        };

        let region = match lookup("SNOWPIPE_REGION").filter(|s| !s.trim().is_empty()) {
            Some(value) => Some(value.parse::<Region>()?),
            None => None,
        };

        let trailing_minutes = match lookup("SNOWPIPE_TRAILING_MINUTES") {
            Some(value) => value.trim().parse::<i64>().map_err(|e| {
                PipeError::Configuration(format!(
                    "SNOWPIPE_TRAILING_MINUTES must be an integer: {}",
                    e
                ))
            })?,
            None => TRAILING_MINUTES,
        };

        let request_timeout_secs = match lookup("SNOWPIPE_REQUEST_TIMEOUT_SECS") {
            Some(value) => value.trim().parse::<u64>().map_err(|e| {
                PipeError::Configuration(format!(
                    "SNOWPIPE_REQUEST_TIMEOUT_SECS must be a whole number of seconds: {}",
                    e
                ))
            })?,
            None => REQUEST_TIMEOUT_SECS,
        };

        let config = PipeConfig {
            account: required("SNOWPIPE_ACCOUNT")?,
            user: required("SNOWPIPE_USER")?,
            pipe: required("SNOWPIPE_PIPE")?,
            private_key: required("SNOWPIPE_PRIVATE_KEY")?,
            region,
            trailing_minutes,
            file_name: lookup("SNOWPIPE_FILE_NAME")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| FILE_NAME_EXPRESSION.to_string()),
            request_timeout_secs,
            base_url: lookup("SNOWPIPE_BASE_URL").filter(|s| !s.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipeError> {
        for (name, value) in [
            ("account", &self.account),
            ("user", &self.user),
            ("pipe", &self.pipe),
            ("private key", &self.private_key),
            ("file name", &self.file_name),
        ] {
            if value.trim().is_empty() {
                return Err(PipeError::Configuration(format!("{} must not be empty", name)));
            }
        }

        if self.account.starts_with('.') {
            return Err(PipeError::Configuration(format!(
                "Account {} has an empty account identifier",
                self.account
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(PipeError::Configuration(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if let Some(base_url) = &self.base_url {
            if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
                return Err(PipeError::Configuration(format!(
                    "Base URL {} must start with http:// or https://",
                    base_url
                )));
            }
        }

        Ok(())
    }

    /// The host-resolution policy selected by this configuration.
    pub fn host_policy(&self) -> HostPolicy {
        match self.region {
            Some(region) => HostPolicy::Region(region),
            None => HostPolicy::Account,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SNOWPIPE_ACCOUNT", "xy12345.us-east-1.snowflakecomputing.com"),
            ("SNOWPIPE_USER", "loader"),
            ("SNOWPIPE_PIPE", "db.schema.orders_pipe"),
            ("SNOWPIPE_PRIVATE_KEY", "MIIE..."),
        ]
    }

    #[test]
    fn test_from_lookup_applies_defaults() {
        let config = PipeConfig::from_lookup(lookup_from(&base_pairs())).unwrap();
        assert_eq!(config.trailing_minutes, 60);
        assert_eq!(config.file_name, "${filename}");
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.region, None);
        assert_eq!(config.host_policy(), HostPolicy::Account);
    }

    #[test]
    fn test_from_lookup_reads_optional_properties() {
        let mut pairs = base_pairs();
        pairs.push(("SNOWPIPE_REGION", "eu-west-1"));
        pairs.push(("SNOWPIPE_TRAILING_MINUTES", "-15"));
        pairs.push(("SNOWPIPE_BASE_URL", "http://127.0.0.1:8080"));

        let config = PipeConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.region, Some(Region::AwsEuWest1));
        assert_eq!(config.trailing_minutes, -15);
        assert_eq!(config.base_url.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(config.host_policy(), HostPolicy::Region(Region::AwsEuWest1));
    }

    #[test]
    fn test_missing_required_property_is_configuration_error() {
        let pairs: Vec<_> = base_pairs()
            .into_iter()
            .filter(|(k, _)| *k != "SNOWPIPE_USER")
            .collect();
        let err = PipeConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, PipeError::Configuration(ref m) if m.contains("SNOWPIPE_USER")));
    }

    #[test]
    fn test_invalid_trailing_minutes_rejected() {
        let mut pairs = base_pairs();
        pairs.push(("SNOWPIPE_TRAILING_MINUTES", "an hour"));
        assert!(PipeConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_invalid_request_timeout_rejected() {
        let mut pairs = base_pairs();
        pairs.push(("SNOWPIPE_REQUEST_TIMEOUT_SECS", "30s"));
        let err = PipeConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(
            matches!(err, PipeError::Configuration(ref m) if m.contains("SNOWPIPE_REQUEST_TIMEOUT_SECS"))
        );

        let mut pairs = base_pairs();
        pairs.push(("SNOWPIPE_REQUEST_TIMEOUT_SECS", " 15 "));
        let config = PipeConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.request_timeout_secs, 15);
    }

    fn write_env_file(path: &Path, account: &str) {
        let contents = format!(
            "SNOWPIPE_ACCOUNT={}\nSNOWPIPE_USER=loader\nSNOWPIPE_PIPE=db.schema.orders_pipe\nSNOWPIPE_PRIVATE_KEY=MIIE\n",
            account
        );
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_env_file_edits_apply_on_next_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        write_env_file(&path, "first.us-east-1");
        let first = PipeConfig::from_env_file(&path).unwrap();
        assert_eq!(first.account, "first.us-east-1");

        write_env_file(&path, "second.us-east-1");
        let second = PipeConfig::from_env_file(&path).unwrap();
        assert_eq!(second.account, "second.us-east-1");
    }

    #[test]
    fn test_env_file_missing_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipeConfig::from_env_file(dir.path().join("absent.env")).unwrap_err();
        assert!(matches!(err, PipeError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut config = PipeConfig::new("acct", "user", "pipe", "key");
        assert!(config.validate().is_ok());

        config.user = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_host_policy_resolution() {
        let account = "xy12345.us-east-1.snowflakecomputing.com";
        assert_eq!(HostPolicy::Account.resolve(account, "xy12345"), account);
        assert_eq!(
            HostPolicy::Region(Region::AwsUsEast1).resolve(account, "xy12345"),
            "xy12345.us-east-1.snowflakecomputing.com"
        );
        assert_eq!(
            HostPolicy::Region(Region::AzureEastUs2).resolve(account, "xy12345"),
            "xy12345.east-us-2.azure.snowflakecomputing.com"
        );
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let config = PipeConfig::new("acct", "user", "pipe", "SUPER-SECRET-KEY");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("SUPER-SECRET-KEY"));
        assert!(rendered.contains("<redacted>"));
    }
}
