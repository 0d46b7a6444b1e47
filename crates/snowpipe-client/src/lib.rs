//! Key-pair authenticated HTTP client for the Snowpipe REST API.
//!
//! An [`IngestClient`] owns one [`PipeIdentity`] and one [`KeyMaterial`] and
//! exposes the two supported operations (see [`api`]): submitting a staged file
//! and scanning the load history of a pipe. Clients are cheap to build and meant
//! to be rebuilt from the current configuration for every invocation.

pub mod api;
pub mod auth;
pub mod identity;
pub mod key;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use snowpipe_core::{PipeConfig, PipeError};
use std::time::Duration;

pub use identity::{account_identifier, PipeIdentity};
pub use key::KeyMaterial;

const USER_AGENT: &str = concat!("snowpipe-rs/", env!("CARGO_PKG_VERSION"));

/// HTTP client bound to one pipe and one signing key.
#[derive(Debug)]
pub struct IngestClient {
    client: Client,
    base_url: String,
    identity: PipeIdentity,
    key: KeyMaterial,
}

impl IngestClient {
    pub fn new(identity: PipeIdentity, key: KeyMaterial, timeout: Duration) -> Result<Self, PipeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PipeError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: identity.base_url(),
            identity,
            key,
        })
    }

    /// Build a client for one invocation from the current configuration.
    ///
    /// The key is decoded before anything else, so malformed key material fails
    /// here and no request is ever sent with it.
    pub fn from_config(config: &PipeConfig, pipe_name: &str) -> Result<Self, PipeError> {
        let key = KeyMaterial::decode(&config.private_key)?;
        let identity = PipeIdentity::from_config(config, pipe_name)?;
        let client = Self::new(
            identity,
            key,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        Ok(match &config.base_url {
            Some(base_url) => client.with_base_url(base_url.as_str()),
            None => client,
        })
    }

    /// Send requests to `base_url` instead of `https://<host>:443`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn identity(&self) -> &PipeIdentity {
        &self.identity
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn pipe_path(&self, action: &str) -> String {
        format!(
            "/v1/data/pipes/{}/{}",
            urlencoding::encode(&self.identity.pipe_name),
            action
        )
    }

    fn apply_auth(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = auth::issue_token(&self.identity, &self.key, Utc::now())
            .context("Failed to sign key-pair token")?;

        Ok(request
            .bearer_auth(token)
            .header(auth::TOKEN_TYPE_HEADER, auth::TOKEN_TYPE)
            .header(ACCEPT, "application/json"))
    }

    /// Authorize and send a request, then deserialize a successful JSON response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<(StatusCode, T)> {
        let request = self.apply_auth(request)?;

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Pipe service request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok((status, body))
    }
}

// Re-export result types for convenience.
pub use snowpipe_core::{FileEntry, HistoryQueryResult, HistoryWindow, SubmitFileResult};
