use super::{Sink, WriteStats};
use crate::models::TargetRow;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("hosted API HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("hosted API returned status {status}: {body}")]
    Service { status: StatusCode, body: String },
    #[error("invalid API key header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    #[error("failed to decode hosted API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Writes through a hosted PostgREST-style API.
///
/// Each batch is one `POST /rest/v1/<table>?on_conflict=<column>` with
/// duplicates ignored. The response echoes only the rows actually inserted, so
/// the difference to the batch size is the conflict count.
pub struct RestSink {
    http: reqwest::Client,
    base_url: String,
    batch_size: usize,
}

impl RestSink {
    pub fn new(base_url: &str, api_key: &str, batch_size: usize) -> Result<Self, RestError> {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("apikey"), HeaderValue::from_str(api_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("resolution=ignore-duplicates,return=representation"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("bubble-migrate/0.1")
            .build()?;

        log::info!("using hosted API at {}", base_url);
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            batch_size: batch_size.max(1),
        })
    }

    fn endpoint(&self, table: &str, conflict_column: &str) -> String {
        format!(
            "{}/rest/v1/{}?on_conflict={}",
            self.base_url, table, conflict_column
        )
    }

    /// Post one batch and return how many rows were inserted.
    async fn post_batch<R: TargetRow>(&self, batch: &[R]) -> Result<usize, RestError> {
        let url = self.endpoint(R::RELATION.table(), R::CONFLICT_COLUMN);
        let response = self.http.post(url).json(batch).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RestError::Service { status, body });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(batch.len());
        }
        let inserted: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        Ok(inserted.len())
    }
}

impl Sink for RestSink {
    async fn insert<R: TargetRow>(&mut self, rows: &[R]) -> WriteStats {
        let table = R::RELATION.table();
        let mut stats = WriteStats::default();

        for (index, batch) in rows.chunks(self.batch_size).enumerate() {
            let start = index * self.batch_size;
            stats.submitted += batch.len();

            match self.post_batch(batch).await {
                Ok(inserted) => {
                    let inserted = inserted.min(batch.len());
                    stats.written += inserted;
                    stats.conflicts += batch.len() - inserted;
                    log::info!(
                        "inserted {} {} to {} ({} new, {} existing)",
                        table,
                        start + 1,
                        start + batch.len(),
                        inserted,
                        batch.len() - inserted
                    );
                }
                Err(err) => {
                    stats.failed += batch.len();
                    log::warn!(
                        "{}: batch {} to {} rejected: {}",
                        table,
                        start + 1,
                        start + batch.len(),
                        err
                    );
                }
            }
        }

        stats
    }

    async fn close(self) {
        log::debug!("hosted API client released");
    }
}
