use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::PipeError;

/// Known service endpoints
///
/// Each region maps to the domain suffix that follows the account identifier
/// in the account host, e.g. `xy12345.us-east-1.snowflakecomputing.com`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Region {
    AwsUsWest,
    AwsUsEast1,
    AwsCaCentral1,
    AwsEuCentral1,
    AwsEuWest1,
    AwsApSoutheast1,
    AwsApSoutheast2,
    AzureEastUs2,
    AzureUsGovVirginia,
    AzureCanadaCentral,
    AzureWestEurope,
    AzureAustraliaEast,
    AzureSoutheastAsia,
}

const BASE_DOMAIN: &str = "snowflakecomputing.com";

impl Region {
    pub const ALL: [Region; 13] = [
        Region::AwsUsWest,
        Region::AwsUsEast1,
        Region::AwsCaCentral1,
        Region::AwsEuCentral1,
        Region::AwsEuWest1,
        Region::AwsApSoutheast1,
        Region::AwsApSoutheast2,
        Region::AzureEastUs2,
        Region::AzureUsGovVirginia,
        Region::AzureCanadaCentral,
        Region::AzureWestEurope,
        Region::AzureAustraliaEast,
        Region::AzureSoutheastAsia,
    ];

    /// Short region id. US West is the default deployment and has none in its
    /// domain, so it is addressed as `us-west`.
    pub fn id(&self) -> &'static str {
        match self {
            Region::AwsUsWest => "us-west",
            Region::AwsUsEast1 => "us-east-1",
            Region::AwsCaCentral1 => "ca-central-1",
            Region::AwsEuCentral1 => "eu-central-1",
            Region::AwsEuWest1 => "eu-west-1",
            Region::AwsApSoutheast1 => "ap-southeast-1",
            Region::AwsApSoutheast2 => "ap-southeast-2",
            Region::AzureEastUs2 => "east-us-2.azure",
            Region::AzureUsGovVirginia => "us-gov-virginia.azure",
            Region::AzureCanadaCentral => "canada-central.azure",
            Region::AzureWestEurope => "west-europe.azure",
            Region::AzureAustraliaEast => "australia-east.azure",
            Region::AzureSoutheastAsia => "southeast-asia.azure",
        }
    }

    /// Domain suffix appended to the account identifier.
    pub fn domain(&self) -> String {
        match self {
            Region::AwsUsWest => BASE_DOMAIN.to_string(),
            other => format!("{}.{}", other.id(), BASE_DOMAIN),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Region::AwsUsWest => "AWS US West",
            Region::AwsUsEast1 => "AWS US East",
            Region::AwsCaCentral1 => "AWS Canada (Central)",
            Region::AwsEuCentral1 => "AWS EU (Frankfurt)",
            Region::AwsEuWest1 => "AWS EU (Dublin)",
            Region::AwsApSoutheast1 => "AWS Asia Pacific (Singapore)",
            Region::AwsApSoutheast2 => "AWS Asia Pacific (Sydney)",
            Region::AzureEastUs2 => "Azure East US 2",
            Region::AzureUsGovVirginia => "Azure US Gov Virginia",
            Region::AzureCanadaCentral => "Azure Canada Central",
            Region::AzureWestEurope => "Azure West Europe",
            Region::AzureAustraliaEast => "Azure Australia East",
            Region::AzureSoutheastAsia => "Azure Southeast Asia",
        }
    }
}

impl FromStr for Region {
    type Err = PipeError;

    /// Accepts either the short id (`us-east-1`) or the full domain
    /// (`us-east-1.snowflakecomputing.com`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Region::ALL
            .into_iter()
            .find(|region| region.id() == wanted || region.domain() == wanted)
            .ok_or_else(|| {
                PipeError::Configuration(format!(
                    "Invalid region: {} (expected one of: {})",
                    s,
                    Region::ALL
                        .iter()
                        .map(|r| r.id())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.domain())
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.domain()
    }
}

impl TryFrom<String> for Region {
    type Error = PipeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_for_default_and_regional_endpoints() {
        assert_eq!(Region::AwsUsWest.domain(), "snowflakecomputing.com");
        assert_eq!(
            Region::AwsUsEast1.domain(),
            "us-east-1.snowflakecomputing.com"
        );
        assert_eq!(
            Region::AzureWestEurope.domain(),
            "west-europe.azure.snowflakecomputing.com"
        );
    }

    #[test]
    fn test_parse_accepts_id_and_domain() {
        assert_eq!("eu-west-1".parse::<Region>().unwrap(), Region::AwsEuWest1);
        assert_eq!(
            "EU-CENTRAL-1.snowflakecomputing.com".parse::<Region>().unwrap(),
            Region::AwsEuCentral1
        );
        assert_eq!(
            "snowflakecomputing.com".parse::<Region>().unwrap(),
            Region::AwsUsWest
        );
    }

    #[test]
    fn test_parse_rejects_unknown_endpoint() {
        let err = "mars-north-1".parse::<Region>().unwrap_err();
        assert!(matches!(err, PipeError::Configuration(_)));
    }

    #[test]
    fn test_every_region_round_trips_through_its_domain() {
        for region in Region::ALL {
            assert_eq!(region.domain().parse::<Region>().unwrap(), region);
            assert_eq!(region.id().parse::<Region>().unwrap(), region);
        }
    }
}
