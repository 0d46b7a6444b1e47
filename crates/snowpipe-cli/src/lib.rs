//! Processors that drive the pipe client and route their outcomes.
//!
//! The binary in `main.rs` is one trigger; anything that can hand over a
//! [`PipeConfig`](snowpipe_core::PipeConfig) and an [`OutcomeRouter`] can drive
//! the processors the same way.

pub mod flow;
pub mod processor;

pub use flow::{
    resolve_attribute_expression, FlowUnit, JsonLinesRouter, OutcomeRouter, Relationship,
    RESPONSE_CODE_ATTRIBUTE,
};
pub use processor::{HistoryOutcome, HistoryProcessor, IngestOutcome, IngestProcessor};

/// Initialize tracing for the CLI.
///
/// Logs go to stderr so stdout only carries unit bodies. Set
/// `SNOWPIPE_LOG_FORMAT=json` for JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let json = std::env::var("SNOWPIPE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
