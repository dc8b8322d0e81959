//! Unit server client over the `/xhr/` JSON endpoints.
//!
//! The endpoints are AJAX-only on the server side, so every request carries
//! `X-Requested-With: XMLHttpRequest`. Authentication piggybacks on the
//! browser session cookie when one is configured.

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;

use super::source::{SourceError, UnitSource};
use super::types::{
    ContextPayload, ContextRadius, FilterParams, IdSequence, IdSequenceResponse, UnitId,
    UnitPayload, UnitRows,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Joins ids as the comma-separated list the server's forms expect.
fn join_ids(ids: &[UnitId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Talks to a running server over HTTP.
pub struct HttpUnitSource {
    base_url: String,
    session_id: Option<String>,
    client: reqwest::Client,
}

impl HttpUnitSource {
    pub fn new(base_url: Option<String>, session_id: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id,
            client: reqwest::Client::new(),
        }
    }

    /// Sends a GET to `path` with `query` and decodes the JSON body.
    async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut builder = self
            .client
            .get(&url)
            .header("X-Requested-With", "XMLHttpRequest")
            .query(query);
        if let Some(ref session) = self.session_id {
            builder = builder.header("Cookie", format!("sessionid={session}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Unit server error: {} - {} ({})", status.as_u16(), message, path);
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        debug!("{} returned {} bytes", path, body.len());
        serde_json::from_str(&body).map_err(|e| SourceError::Parse(format!("{path}: {e}")))
    }
}

#[async_trait]
impl UnitSource for HttpUnitSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_id_sequence(&self, filter: &FilterParams) -> Result<IdSequence, SourceError> {
        let response: IdSequenceResponse = self.get_json("/xhr/uids/", filter).await?;
        let sequence = IdSequence::from(response);
        info!(
            "Fetched id sequence for {}: {} ids (begin={}, end={}, total={})",
            filter.path,
            sequence.ids.len(),
            sequence.begin,
            sequence.end,
            sequence.total
        );
        Ok(sequence)
    }

    async fn fetch_units_by_ids(
        &self,
        ids: &[UnitId],
        headers: &[UnitId],
    ) -> Result<UnitRows, SourceError> {
        let mut query = vec![("uids", join_ids(ids))];
        if !headers.is_empty() {
            query.push(("headers", join_ids(headers)));
        }
        self.get_json("/xhr/units/", &query).await
    }

    async fn fetch_unit_by_id(&self, id: UnitId) -> Result<UnitPayload, SourceError> {
        let empty: [(&str, &str); 0] = [];
        self.get_json(&format!("/xhr/units/{id}/edit/"), &empty).await
    }

    async fn fetch_context(
        &self,
        id: UnitId,
        radius: ContextRadius,
    ) -> Result<ContextPayload, SourceError> {
        let query = [("before", radius.before), ("after", radius.after)];
        self.get_json(&format!("/xhr/units/{id}/context/"), &query)
            .await
    }
}
