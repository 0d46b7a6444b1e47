use snowpipe_core::{HostPolicy, PipeConfig, PipeError};

pub const SCHEME: &str = "https";
pub const PORT: u16 = 443;

/// Address of one ingestion target: who is calling, which pipe, and where the
/// service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeIdentity {
    /// First `.` segment of the account string
    pub account_identifier: String,
    pub user: String,
    /// May be fully qualified (`db.schema.pipe`)
    pub pipe_name: String,
    pub host: String,
    pub scheme: &'static str,
    pub port: u16,
}

/// Short account name: everything before the first `.`, or the whole string.
pub fn account_identifier(account: &str) -> &str {
    account
        .split_once('.')
        .map(|(head, _)| head)
        .unwrap_or(account)
}

impl PipeIdentity {
    pub fn derive(
        account: &str,
        user: &str,
        pipe_name: &str,
        host_policy: HostPolicy,
    ) -> Result<Self, PipeError> {
        let account = account.trim();
        let user = user.trim();
        let pipe_name = pipe_name.trim();

        let identifier = account_identifier(account);
        if identifier.is_empty() {
            return Err(PipeError::Configuration(format!(
                "Account {:?} has an empty account identifier",
                account
            )));
        }
        if user.is_empty() {
            return Err(PipeError::Configuration("User must not be empty".to_string()));
        }
        if pipe_name.is_empty() {
            return Err(PipeError::Configuration(
                "Pipe name resolved to an empty value".to_string(),
            ));
        }

        Ok(Self {
            account_identifier: identifier.to_string(),
            user: user.to_string(),
            pipe_name: pipe_name.to_string(),
            host: host_policy.resolve(account, identifier),
            scheme: SCHEME,
            port: PORT,
        })
    }

    /// Identity for `pipe_name` (already resolved by the caller) under `config`.
    pub fn from_config(config: &PipeConfig, pipe_name: &str) -> Result<Self, PipeError> {
        Self::derive(
            &config.account,
            &config.user,
            pipe_name,
            config.host_policy(),
        )
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// `ACCOUNT.USER`, the subject of key-pair tokens.
    pub fn qualified_user(&self) -> String {
        format!(
            "{}.{}",
            self.account_identifier.to_uppercase(),
            self.user.to_uppercase()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowpipe_core::Region;

    #[test]
    fn test_account_identifier_is_first_segment() {
        assert_eq!(
            account_identifier("xy12345.us-east-1.snowflakecomputing.com"),
            "xy12345"
        );
        assert_eq!(account_identifier("xy12345.eu-west-1"), "xy12345");
        assert_eq!(account_identifier("a.b"), "a");
    }

    #[test]
    fn test_account_identifier_without_dot_is_whole_string() {
        assert_eq!(account_identifier("xy12345"), "xy12345");
        assert_eq!(account_identifier(""), "");
    }

    #[test]
    fn test_derive_with_account_host() {
        let identity = PipeIdentity::derive(
            "xy12345.us-east-1.snowflakecomputing.com",
            "loader",
            "db.schema.orders_pipe",
            HostPolicy::Account,
        )
        .unwrap();

        assert_eq!(identity.account_identifier, "xy12345");
        assert_eq!(identity.host, "xy12345.us-east-1.snowflakecomputing.com");
        assert_eq!(identity.pipe_name, "db.schema.orders_pipe");
        assert_eq!(identity.scheme, "https");
        assert_eq!(identity.port, 443);
        assert_eq!(
            identity.base_url(),
            "https://xy12345.us-east-1.snowflakecomputing.com:443"
        );
    }

    #[test]
    fn test_derive_with_region_host() {
        let identity = PipeIdentity::derive(
            "xy12345",
            "loader",
            "orders_pipe",
            HostPolicy::Region(Region::AwsEuCentral1),
        )
        .unwrap();

        assert_eq!(identity.account_identifier, "xy12345");
        assert_eq!(identity.host, "xy12345.eu-central-1.snowflakecomputing.com");
    }

    #[test]
    fn test_derive_rejects_empty_parts() {
        assert!(PipeIdentity::derive(".us-east-1", "u", "p", HostPolicy::Account).is_err());
        assert!(PipeIdentity::derive("acct", " ", "p", HostPolicy::Account).is_err());
        assert!(PipeIdentity::derive("acct", "u", "", HostPolicy::Account).is_err());
    }

    #[test]
    fn test_qualified_user_is_upper_cased() {
        let identity =
            PipeIdentity::derive("xy12345.us-east-1", "loader", "p", HostPolicy::Account).unwrap();
        assert_eq!(identity.qualified_user(), "XY12345.LOADER");
    }

    #[test]
    fn test_from_config_follows_region_setting() {
        let mut config = PipeConfig::new(
            "xy12345.us-east-1.snowflakecomputing.com",
            "loader",
            "ignored",
            "key",
        );
        let by_account = PipeIdentity::from_config(&config, "db.s.p").unwrap();
        assert_eq!(by_account.host, "xy12345.us-east-1.snowflakecomputing.com");

        config.region = Some(Region::AzureWestEurope);
        let by_region = PipeIdentity::from_config(&config, "db.s.p").unwrap();
        assert_eq!(by_region.host, "xy12345.west-europe.azure.snowflakecomputing.com");
    }
}
