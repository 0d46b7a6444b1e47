use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::window::HistoryWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    Loaded,
    LoadInProgress,
    LoadFailed,
    PartiallyLoaded,
    #[serde(other)]
    Unknown,
}

impl Display for LoadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LoadStatus::Loaded => write!(f, "LOADED"),
            LoadStatus::LoadInProgress => write!(f, "LOAD_IN_PROGRESS"),
            LoadStatus::LoadFailed => write!(f, "LOAD_FAILED"),
            LoadStatus::PartiallyLoaded => write!(f, "PARTIALLY_LOADED"),
            LoadStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One file the service processed for a pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_received: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_insert_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_inserted: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_parsed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors_seen: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_error_line_num: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_error_character_pos: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_error_column_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LoadStatus>,
}

impl FileEntry {
    /// Entry with only a path; the service always reports at least that much.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stage_location: None,
            file_size: None,
            time_received: None,
            last_insert_time: None,
            rows_inserted: None,
            rows_parsed: None,
            errors_seen: None,
            error_limit: None,
            first_error: None,
            first_error_line_num: None,
            first_error_character_pos: None,
            first_error_column_name: None,
            system_error: None,
            complete: None,
            status: None,
        }
    }
}

/// Body of a `loadHistoryScan` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRangeResponse {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub start_time_inclusive: Option<String>,
    #[serde(default)]
    pub end_time_exclusive: Option<String>,
    #[serde(default)]
    pub range_start_time: Option<String>,
    #[serde(default)]
    pub range_end_time: Option<String>,
    #[serde(default)]
    pub pipe: Option<String>,
    #[serde(default, deserialize_with = "bool_or_string")]
    pub complete_result: Option<bool>,
}

/// The service has reported `completeResult` both as a JSON boolean and as a string.
fn bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => Some(value),
        Some(Flag::Text(text)) => text.trim().parse::<bool>().ok(),
        None => None,
    })
}

/// Files the service observed for a pipe within a window, in service order.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQueryResult {
    pub window: HistoryWindow,
    pub files: Vec<FileEntry>,
    /// `Some(false)` when the service truncated the scan to its first page
    pub complete_result: Option<bool>,
}

impl HistoryQueryResult {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAN_BODY: &str = r#"{
        "pipe": "DB.SCHEMA.ORDERS_PIPE",
        "completeResult": "true",
        "startTimeInclusive": "2024-03-01T10:00:00.000Z",
        "endTimeExclusive": "2024-03-01T11:00:00.000Z",
        "rangeStartTime": "2024-03-01T10:02:11.102Z",
        "rangeEndTime": "2024-03-01T10:41:53.330Z",
        "files": [
            {
                "path": "staged/orders_2024.csv",
                "stageLocation": "s3://bucket/staged/",
                "fileSize": 1024,
                "timeReceived": "2024-03-01T10:02:11.102Z",
                "lastInsertTime": "2024-03-01T10:02:40.000Z",
                "rowsInserted": 20,
                "rowsParsed": 20,
                "errorsSeen": 0,
                "errorLimit": 1,
                "complete": true,
                "status": "LOADED"
            },
            {
                "path": "staged/orders_bad.csv",
                "errorsSeen": 3,
                "firstError": "Numeric value 'abc' is not recognized",
                "firstErrorLineNum": 7,
                "firstErrorCharacterPos": 12,
                "firstErrorColumnName": "\"ORDERS\"[\"AMOUNT\":3]",
                "status": "LOAD_FAILED"
            }
        ]
    }"#;

    #[test]
    fn test_history_range_response_parses_service_body() {
        let response: HistoryRangeResponse = serde_json::from_str(SCAN_BODY).unwrap();
        assert_eq!(response.files.len(), 2);
        assert_eq!(response.complete_result, Some(true));
        assert_eq!(response.pipe.as_deref(), Some("DB.SCHEMA.ORDERS_PIPE"));

        let loaded = &response.files[0];
        assert_eq!(loaded.path, "staged/orders_2024.csv");
        assert_eq!(loaded.rows_inserted, Some(20));
        assert_eq!(loaded.status, Some(LoadStatus::Loaded));
        assert!(loaded.time_received.is_some());

        let failed = &response.files[1];
        assert_eq!(failed.status, Some(LoadStatus::LoadFailed));
        assert_eq!(failed.first_error_line_num, Some(7));
    }

    #[test]
    fn test_missing_files_is_empty_list() {
        let response: HistoryRangeResponse =
            serde_json::from_str(r#"{"pipe":"P","completeResult":false}"#).unwrap();
        assert!(response.files.is_empty());
        assert_eq!(response.complete_result, Some(false));
    }

    #[test]
    fn test_unknown_status_is_preserved_as_unknown() {
        let entry: FileEntry =
            serde_json::from_str(r#"{"path":"a.csv","status":"SOMETHING_NEW"}"#).unwrap();
        assert_eq!(entry.status, Some(LoadStatus::Unknown));
    }

    #[test]
    fn test_absent_fields_are_omitted_on_output() {
        let value = serde_json::to_value(FileEntry::new("a.csv")).unwrap();
        assert_eq!(value, serde_json::json!({"path": "a.csv"}));
    }
}
