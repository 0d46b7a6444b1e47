//! Snowpipe Core Library
//!
//! This crate provides the domain models, error types, configuration and output
//! encoding shared by the Snowpipe client and the CLI that drives it.

pub mod config;
pub mod error;
pub mod models;
pub mod ndjson;
pub mod region;
pub mod window;

// Re-export commonly used types
pub use config::{HostPolicy, PipeConfig};
pub use error::{ErrorMetadata, PipeError};
pub use models::{
    FileEntry, HistoryQueryResult, HistoryRangeResponse, IngestResponse, InsertFilesRequest,
    LoadStatus, StagedFile, SubmitFileResult,
};
pub use ndjson::{serialize_entries, write_entries};
pub use region::Region;
pub use window::HistoryWindow;
