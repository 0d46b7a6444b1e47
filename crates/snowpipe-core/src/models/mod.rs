pub mod history;
pub mod ingest;

pub use history::{FileEntry, HistoryQueryResult, HistoryRangeResponse, LoadStatus};
pub use ingest::{IngestResponse, InsertFilesRequest, StagedFile, SubmitFileResult};
