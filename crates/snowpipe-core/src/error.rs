//! Error types module
//!
//! Every failure the client can report is a `PipeError`. The variants mirror the
//! four ways an invocation can end badly: unusable key material, a failed
//! submit, a failed history query, or configuration that could not be resolved
//! before any request was attempted.
//!
//! Call failures keep their cause as an `anyhow::Error` so logs can render the
//! whole chain through [`PipeError::detailed_message`].

/// Metadata attached to every logged failure.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "INGEST_CALL_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether re-invoking on the next trigger may succeed without operator action
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the operator
    fn suggested_action(&self) -> Option<&'static str>;
}

#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    #[error("Key decode error: {0}")]
    KeyDecode(String),

    #[error("Unable to call pipe {pipe} on file {file}: {source}")]
    IngestCall {
        pipe: String,
        file: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failure invoking history range on pipe {pipe}: {source}")]
    HistoryCall {
        pipe: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PipeError {
    pub fn ingest_call(
        pipe: impl Into<String>,
        file: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        PipeError::IngestCall {
            pipe: pipe.into(),
            file: file.into(),
            source: source.into(),
        }
    }

    pub fn history_call(pipe: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        PipeError::HistoryCall {
            pipe: pipe.into(),
            source: source.into(),
        }
    }

    /// Get the error type name
    pub fn error_type(&self) -> &str {
        match self {
            PipeError::KeyDecode(_) => "KeyDecodeError",
            PipeError::IngestCall { .. } => "IngestCallError",
            PipeError::HistoryCall { .. } => "HistoryCallError",
            PipeError::Configuration(_) => "ConfigurationError",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        // The display of a call error already embeds its direct source
        let mut source = self.source().and_then(|s| s.source());
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action).
fn pipe_error_static_metadata(err: &PipeError) -> (&'static str, bool, Option<&'static str>) {
    match err {
        PipeError::KeyDecode(_) => (
            "KEY_DECODE_ERROR",
            false,
            Some("Supply a base64 encoded PKCS#8 RSA private key"),
        ),
        PipeError::IngestCall { .. } => (
            "INGEST_CALL_ERROR",
            true,
            Some("Check the pipe, the staged file and the service status"),
        ),
        PipeError::HistoryCall { .. } => (
            "HISTORY_CALL_ERROR",
            true,
            Some("The next scheduled query will retry the window"),
        ),
        PipeError::Configuration(_) => (
            "CONFIGURATION_ERROR",
            false,
            Some("Check the configured properties and unit attributes"),
        ),
    }
}

impl ErrorMetadata for PipeError {
    fn error_code(&self) -> &'static str {
        pipe_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        pipe_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        pipe_error_static_metadata(self).2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_ingest_call_display_names_pipe_and_file() {
        let err = PipeError::ingest_call(
            "db.schema.orders_pipe",
            "staged/orders_2024.csv",
            anyhow::anyhow!("connection refused"),
        );
        let message = err.to_string();
        assert!(message.contains("db.schema.orders_pipe"));
        assert!(message.contains("staged/orders_2024.csv"));
        assert!(message.contains("connection refused"));
        assert_eq!(err.error_type(), "IngestCallError");
    }

    #[test]
    fn test_error_metadata_codes() {
        let key = PipeError::KeyDecode("bad".to_string());
        assert_eq!(key.error_code(), "KEY_DECODE_ERROR");
        assert!(!key.is_recoverable());
        assert_eq!(
            key.suggested_action(),
            Some("Supply a base64 encoded PKCS#8 RSA private key")
        );

        let history = PipeError::history_call("p", anyhow::anyhow!("timeout"));
        assert_eq!(history.error_code(), "HISTORY_CALL_ERROR");
        assert!(history.is_recoverable());

        let config = PipeError::Configuration("empty file name".to_string());
        assert_eq!(config.error_code(), "CONFIGURATION_ERROR");
        assert_eq!(
            config.suggested_action(),
            Some("Check the configured properties and unit attributes")
        );
    }

    #[test]
    fn test_detailed_message_includes_chain() {
        let inner: Result<(), anyhow::Error> = Err(anyhow::anyhow!("tcp reset"));
        let source = inner.context("Failed to send request").unwrap_err();
        let err = PipeError::history_call("db.schema.p", source);

        let details = err.detailed_message();
        assert!(details.starts_with("Failure invoking history range on pipe db.schema.p"));
        assert!(details.contains("Caused by: tcp reset"));
    }
}
