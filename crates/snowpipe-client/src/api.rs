//! The two pipe operations.
//!
//! Each call is one authenticated round trip with no retry. Any failure along
//! the way (signing, transport, timeout, non-success status, undecodable body)
//! is reported as a single `IngestCall` or `HistoryCall` error naming the pipe.

use crate::IngestClient;
use snowpipe_core::{
    HistoryQueryResult, HistoryRangeResponse, HistoryWindow, IngestResponse, InsertFilesRequest,
    PipeError, StagedFile, SubmitFileResult,
};
use uuid::Uuid;

impl IngestClient {
    /// Ask the service to load one staged file asynchronously.
    ///
    /// Success means the request was accepted; whether the load completed is
    /// only visible through the load history.
    pub async fn submit_file(&self, file_name: &str) -> Result<SubmitFileResult, PipeError> {
        if file_name.trim().is_empty() {
            return Err(PipeError::Configuration(
                "File name resolved to an empty value".to_string(),
            ));
        }

        let pipe = &self.identity.pipe_name;
        let request_id = Uuid::new_v4().to_string();
        let body = InsertFilesRequest {
            files: vec![StagedFile::new(file_name)],
        };

        tracing::debug!(
            pipe = %pipe,
            file = %file_name,
            request_id = %request_id,
            "Submitting staged file"
        );

        let request = self
            .client
            .post(self.build_url(&self.pipe_path("insertFiles")))
            .query(&[("requestId", request_id.as_str())])
            .json(&body);

        let (status, response) = self
            .send::<IngestResponse>(request)
            .await
            .map_err(|e| PipeError::ingest_call(pipe.as_str(), file_name, e))?;

        Ok(SubmitFileResult {
            response_code: status.as_u16(),
            service_code: response.response_code,
            request_id: response.request_id.or(Some(request_id)),
        })
    }

    /// Files the service observed in the last `|trailing_minutes|` minutes.
    pub async fn query_history_range(
        &self,
        trailing_minutes: i64,
    ) -> Result<HistoryQueryResult, PipeError> {
        let window = HistoryWindow::ending_now(trailing_minutes)?;
        self.query_history_window(window).await
    }

    /// Files the service observed within `window`, in the order it reports them.
    ///
    /// Only the first page is fetched; no continuation is requested.
    pub async fn query_history_window(
        &self,
        window: HistoryWindow,
    ) -> Result<HistoryQueryResult, PipeError> {
        let pipe = &self.identity.pipe_name;
        let request_id = Uuid::new_v4().to_string();
        let begin = window.begin_param();
        let end = window.end_param();

        tracing::debug!(
            pipe = %pipe,
            begin = %begin,
            end = %end,
            request_id = %request_id,
            "Scanning load history"
        );

        let request = self
            .client
            .get(self.build_url(&self.pipe_path("loadHistoryScan")))
            .query(&[
                ("startTimeInclusive", begin.as_str()),
                ("endTimeExclusive", end.as_str()),
                ("requestId", request_id.as_str()),
            ]);

        let (_, response) = self
            .send::<HistoryRangeResponse>(request)
            .await
            .map_err(|e| PipeError::history_call(pipe.as_str(), e))?;

        Ok(HistoryQueryResult {
            window,
            files: response.files,
            complete_result: response.complete_result,
        })
    }
}
