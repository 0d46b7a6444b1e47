use serde::{Deserialize, Serialize};

/// A reference to a file already staged where the pipe can read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl StagedFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: None,
        }
    }
}

/// Body of an `insertFiles` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertFilesRequest {
    pub files: Vec<StagedFile>,
}

/// Body the service returns when it accepts an `insertFiles` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    pub response_code: String,
}

/// Outcome of an accepted submit. Acceptance only: completion shows up in the
/// load history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitFileResult {
    /// HTTP status reported by the service
    pub response_code: u16,
    /// Service-level code from the response body (e.g. `SUCCESS`)
    pub service_code: String,
    pub request_id: Option<String>,
}
