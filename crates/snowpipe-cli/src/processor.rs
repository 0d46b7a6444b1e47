//! Ingest and load-history processors.
//!
//! Both hold a validated [`PipeConfig`] and build a fresh [`IngestClient`] for
//! every invocation, so key or target changes made through
//! [`reconfigure`](IngestProcessor::reconfigure) apply on the next call.
//! Neither retries; a failed call is reported once and the next trigger tries
//! again.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use snowpipe_client::IngestClient;
use tokio::time::MissedTickBehavior;
use snowpipe_core::{
    serialize_entries, ErrorMetadata, HistoryQueryResult, PipeConfig, PipeError, SubmitFileResult,
};

use crate::flow::{
    resolve_attribute_expression, FlowUnit, OutcomeRouter, Relationship, RESPONSE_CODE_ATTRIBUTE,
};

pub const PIPE_ATTRIBUTE: &str = "snowpipe.pipe";
pub const WINDOW_BEGIN_ATTRIBUTE: &str = "snowpipe.history.begin";
pub const WINDOW_END_ATTRIBUTE: &str = "snowpipe.history.end";
pub const RECORD_COUNT_ATTRIBUTE: &str = "record.count";
pub const MIME_TYPE_ATTRIBUTE: &str = "mime.type";
pub const NDJSON_MIME_TYPE: &str = "application/x-ndjson";

/// What happened to one ingest unit.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Routed to success with the response code attached.
    Accepted(SubmitFileResult),
    /// Routed to failure unchanged.
    Failed(PipeError),
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted(_))
    }
}

/// What one history query produced.
#[derive(Debug)]
pub enum HistoryOutcome {
    /// One unit with `entries` records was routed to success.
    Emitted { entries: usize },
    /// The window held no files; nothing was routed.
    Empty,
    /// The query failed; nothing was routed.
    Failed(PipeError),
}

fn log_failure(operation: &str, pipe: &str, file: Option<&str>, err: &PipeError) {
    tracing::error!(
        operation = operation,
        pipe = %pipe,
        file = %file.unwrap_or_default(),
        error_code = err.error_code(),
        error_type = err.error_type(),
        recoverable = err.is_recoverable(),
        suggested_action = err.suggested_action().unwrap_or_default(),
        error = %err.detailed_message(),
        "Pipe operation failed"
    );
}

/// Submits the staged file named by each incoming unit.
#[derive(Debug, Clone)]
pub struct IngestProcessor {
    config: PipeConfig,
}

impl IngestProcessor {
    pub fn new(config: PipeConfig) -> Result<Self, PipeError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Swap in a new configuration. The old one stays in place if validation fails.
    pub fn reconfigure(&mut self, config: PipeConfig) -> Result<(), PipeError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Submit the file named by `unit` and route the unit.
    ///
    /// Only routing errors are returned; call failures are logged and
    /// reported through [`IngestOutcome::Failed`].
    pub async fn process<R>(
        &self,
        mut unit: FlowUnit,
        router: &mut R,
    ) -> anyhow::Result<IngestOutcome>
    where
        R: OutcomeRouter + ?Sized,
    {
        let pipe = resolve_attribute_expression(&self.config.pipe, &unit.attributes);
        let file = resolve_attribute_expression(&self.config.file_name, &unit.attributes);

        match self.submit(&pipe, &file).await {
            Ok(result) => {
                tracing::info!(
                    pipe = %pipe,
                    file = %file,
                    response_code = result.response_code,
                    service_code = %result.service_code,
                    "Staged file accepted"
                );
                unit.put_attribute(RESPONSE_CODE_ATTRIBUTE, result.response_code.to_string());
                router.transfer(unit, Relationship::Success)?;
                Ok(IngestOutcome::Accepted(result))
            }
            Err(err) => {
                log_failure("ingest", &pipe, Some(&file), &err);
                router.transfer(unit, Relationship::Failure)?;
                Ok(IngestOutcome::Failed(err))
            }
        }
    }

    async fn submit(&self, pipe: &str, file: &str) -> Result<SubmitFileResult, PipeError> {
        let client = IngestClient::from_config(&self.config, pipe)?;
        client.submit_file(file).await
    }
}

/// Emits the pipe's recent load history as one newline-delimited JSON unit.
#[derive(Debug, Clone)]
pub struct HistoryProcessor {
    config: PipeConfig,
}

impl HistoryProcessor {
    pub fn new(config: PipeConfig) -> Result<Self, PipeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn reconfigure(&mut self, config: PipeConfig) -> Result<(), PipeError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Query the trailing window and route at most one new unit.
    ///
    /// An empty window and a failed query both route nothing. Only routing
    /// errors are returned.
    pub async fn run<R>(&self, router: &mut R) -> anyhow::Result<HistoryOutcome>
    where
        R: OutcomeRouter + ?Sized,
    {
        // No unit triggers a history query, so expressions see no attributes
        let pipe = resolve_attribute_expression(&self.config.pipe, &BTreeMap::new());

        let result = match self.query(&pipe).await {
            Ok(result) => result,
            Err(err) => {
                log_failure("history", &pipe, None, &err);
                return Ok(HistoryOutcome::Failed(err));
            }
        };

        if result.is_empty() {
            tracing::debug!(
                pipe = %pipe,
                begin = %result.window.begin_param(),
                end = %result.window.end_param(),
                "No files in history window"
            );
            return Ok(HistoryOutcome::Empty);
        }

        if result.complete_result == Some(false) {
            tracing::warn!(
                pipe = %pipe,
                entries = result.files.len(),
                "Load history truncated by the service; only the first page was read"
            );
        }

        let body = match serialize_entries(&result.files) {
            Ok(body) => body,
            Err(e) => {
                let err = PipeError::history_call(pipe.as_str(), e);
                log_failure("history", &pipe, None, &err);
                return Ok(HistoryOutcome::Failed(err));
            }
        };

        let entries = result.files.len();
        router.create_and_transfer(
            history_attributes(&pipe, &result),
            body,
            Relationship::Success,
        )?;

        tracing::info!(
            pipe = %pipe,
            entries = entries,
            begin = %result.window.begin_param(),
            end = %result.window.end_param(),
            "Emitted load history"
        );
        Ok(HistoryOutcome::Emitted { entries })
    }

    /// Run on a fixed `period` until `shutdown` resolves.
    ///
    /// Before every query `reload` is asked for the current configuration; a
    /// failed or invalid reload keeps the previous one. `shutdown` is watched
    /// while waiting for the next tick and while a query is in flight.
    pub async fn poll<R, L, S>(
        &mut self,
        router: &mut R,
        period: Duration,
        mut reload: L,
        shutdown: S,
    ) -> anyhow::Result<()>
    where
        R: OutcomeRouter + ?Sized,
        L: FnMut() -> anyhow::Result<PipeConfig>,
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => break,
            }

            match reload() {
                Ok(config) => {
                    if let Err(e) = self.reconfigure(config) {
                        tracing::warn!(
                            error = %e,
                            "Rejected reloaded configuration; keeping previous"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %format!("{:#}", e),
                        "Failed to reload configuration; keeping previous"
                    );
                }
            }

            tokio::select! {
                outcome = self.run(router) => {
                    outcome?;
                }
                _ = &mut shutdown => break,
            }
        }

        tracing::info!("Stopping history polling");
        Ok(())
    }

    async fn query(&self, pipe: &str) -> Result<HistoryQueryResult, PipeError> {
        let client = IngestClient::from_config(&self.config, pipe)?;
        client.query_history_range(self.config.trailing_minutes).await
    }
}

fn history_attributes(pipe: &str, result: &HistoryQueryResult) -> BTreeMap<String, String> {
    BTreeMap::from([
        (PIPE_ATTRIBUTE.to_string(), pipe.to_string()),
        (WINDOW_BEGIN_ATTRIBUTE.to_string(), result.window.begin_param()),
        (WINDOW_END_ATTRIBUTE.to_string(), result.window.end_param()),
        (RECORD_COUNT_ATTRIBUTE.to_string(), result.files.len().to_string()),
        (MIME_TYPE_ATTRIBUTE.to_string(), NDJSON_MIME_TYPE.to_string()),
    ])
}
