//! Key-pair JWT issuance
//!
//! Every request carries a short-lived RS256 token signed with the user's
//! private key. The issuer names the public key by fingerprint so the service
//! can pick the registered key; the subject is `ACCOUNT.USER`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use serde::{Deserialize, Serialize};

use crate::identity::PipeIdentity;
use crate::key::KeyMaterial;

/// Service maximum is one hour.
pub const TOKEN_LIFETIME_MINUTES: i64 = 59;

pub const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";
pub const TOKEN_TYPE: &str = "KEYPAIR_JWT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairClaims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl KeyPairClaims {
    pub fn new(identity: &PipeIdentity, key: &KeyMaterial, issued_at: DateTime<Utc>) -> Self {
        let subject = identity.qualified_user();
        Self {
            iss: format!("{}.{}", subject, key.public_key_fingerprint()),
            sub: subject,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::minutes(TOKEN_LIFETIME_MINUTES)).timestamp(),
        }
    }
}

/// Sign a token for `identity` valid from `issued_at`.
pub fn issue_token(
    identity: &PipeIdentity,
    key: &KeyMaterial,
    issued_at: DateTime<Utc>,
) -> jsonwebtoken::errors::Result<String> {
    let claims = KeyPairClaims::new(identity, key, issued_at);
    encode(&Header::new(Algorithm::RS256), &claims, key.encoding_key())
}
