//! Time-window policy for history queries.
//!
//! A window always ends at the invocation time and reaches back by the absolute
//! value of the configured trailing minutes, so a negative setting never inverts
//! it. Both endpoints are formatted as RFC 3339 timestamps with an explicit
//! offset, which is what the service accepts.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::error::PipeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl HistoryWindow {
    /// Window of `|trailing_minutes|` ending at `end`.
    pub fn trailing(end: DateTime<Utc>, trailing_minutes: i64) -> Result<Self, PipeError> {
        let minutes = i64::try_from(trailing_minutes.unsigned_abs())
            .ok()
            .and_then(Duration::try_minutes)
            .ok_or_else(|| {
                PipeError::Configuration(format!(
                    "Trailing minutes {} is out of range",
                    trailing_minutes
                ))
            })?;

        let begin = end.checked_sub_signed(minutes).ok_or_else(|| {
            PipeError::Configuration(format!(
                "Trailing minutes {} reaches before the earliest representable time",
                trailing_minutes
            ))
        })?;

        Ok(Self { begin, end })
    }

    /// Window of `|trailing_minutes|` ending now.
    pub fn ending_now(trailing_minutes: i64) -> Result<Self, PipeError> {
        Self::trailing(Utc::now(), trailing_minutes)
    }

    pub fn length(&self) -> Duration {
        self.end - self.begin
    }

    pub fn begin_param(&self) -> String {
        self.begin.to_rfc3339_opts(SecondsFormat::Millis, false)
    }

    pub fn end_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Millis, false)
    }
}
