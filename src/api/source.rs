use std::fmt;

use async_trait::async_trait;

use super::types::{
    ContextPayload, ContextRadius, FilterParams, IdSequence, UnitId, UnitPayload, UnitRows,
};

/// Errors that can occur while talking to the unit server.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Source misconfigured (bad base URL, unbuildable client).
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// Server answered with a non-success status.
    Api { status: u16, message: String },
    /// Response body did not match the expected shape.
    Parse(String),
}

/// Coarse classification handed to the view alongside the error detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Network,
    Status(u16),
    Parse,
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::Config(_) => ErrorKind::Config,
            SourceError::Network(_) => ErrorKind::Network,
            SourceError::Api { status, .. } => ErrorKind::Status(*status),
            SourceError::Parse(_) => ErrorKind::Parse,
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Config(msg) => write!(f, "config error: {msg}"),
            SourceError::Network(msg) => write!(f, "network error: {msg}"),
            SourceError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            SourceError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// The server-side collaborator that lists ids and serves unit data.
#[async_trait]
pub trait UnitSource: Send + Sync {
    /// Returns the name of the source (for logging).
    fn name(&self) -> &str;

    /// Ordered ids matching `filter`, plus the slice's placement.
    async fn fetch_id_sequence(&self, filter: &FilterParams) -> Result<IdSequence, SourceError>;

    /// Listing rows for `ids`. `headers` is the subset that should carry
    /// file/project metadata.
    async fn fetch_units_by_ids(
        &self,
        ids: &[UnitId],
        headers: &[UnitId],
    ) -> Result<UnitRows, SourceError>;

    /// Full editor payload for one unit.
    async fn fetch_unit_by_id(&self, id: UnitId) -> Result<UnitPayload, SourceError>;

    /// Neighbouring rows of `id`.
    async fn fetch_context(
        &self,
        id: UnitId,
        radius: ContextRadius,
    ) -> Result<ContextPayload, SourceError>;
}

// ============================================================================
// Request specs
// ============================================================================

/// A request the window wants issued, described without any transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    IdSequence(FilterParams),
    Units { ids: Vec<UnitId>, headers: Vec<UnitId> },
    Unit(UnitId),
    Context { id: UnitId, radius: ContextRadius },
}

impl Request {
    /// Endpoint path this request targets, relative to the server root.
    pub fn target(&self) -> String {
        match self {
            Request::IdSequence(_) => "/xhr/uids/".to_string(),
            Request::Units { .. } => "/xhr/units/".to_string(),
            Request::Unit(id) => format!("/xhr/units/{id}/edit/"),
            Request::Context { id, .. } => format!("/xhr/units/{id}/context/"),
        }
    }

    /// Explicit queue name, if this request must not share the default
    /// per-target queue.
    pub fn queue_name(&self) -> Option<&'static str> {
        match self {
            Request::IdSequence(_) => None,
            Request::Units { .. } => Some("prefetch"),
            Request::Unit(_) => Some("unit"),
            Request::Context { .. } => Some("context"),
        }
    }
}

/// Result of a successfully performed [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    IdSequence(IdSequence),
    Units(UnitRows),
    Unit { id: UnitId, payload: UnitPayload },
    Context { id: UnitId, context: ContextPayload },
}

/// Runs `request` against `source`.
pub async fn perform(source: &dyn UnitSource, request: &Request) -> Result<Response, SourceError> {
    match request {
        Request::IdSequence(filter) => source.fetch_id_sequence(filter).await.map(Response::IdSequence),
        Request::Units { ids, headers } => source
            .fetch_units_by_ids(ids, headers)
            .await
            .map(Response::Units),
        Request::Unit(id) => source
            .fetch_unit_by_id(*id)
            .await
            .map(|payload| Response::Unit { id: *id, payload }),
        Request::Context { id, radius } => source
            .fetch_context(*id, *radius)
            .await
            .map(|context| Response::Context { id: *id, context }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        let err = SourceError::Api {
            status: 404,
            message: "missing".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Status(404));
        assert_eq!(SourceError::Network("down".into()).kind(), ErrorKind::Network);
        assert_eq!(err.to_string(), "API error (HTTP 404): missing");
    }

    #[test]
    fn test_request_targets() {
        assert_eq!(Request::IdSequence(FilterParams::default()).target(), "/xhr/uids/");
        assert_eq!(Request::Unit(UnitId(9)).target(), "/xhr/units/9/edit/");
        let ctx = Request::Context {
            id: UnitId(9),
            radius: ContextRadius::symmetric(5),
        };
        assert_eq!(ctx.target(), "/xhr/units/9/context/");
    }

    #[test]
    fn test_only_sequence_uses_default_queue() {
        assert!(Request::IdSequence(FilterParams::default()).queue_name().is_none());
        assert_eq!(
            Request::Units { ids: vec![], headers: vec![] }.queue_name(),
            Some("prefetch")
        );
        assert_ne!(Request::Unit(UnitId(1)).queue_name(), Request::Units { ids: vec![], headers: vec![] }.queue_name());
    }
}
