//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{
    ContextPayload, ContextRadius, ContextRow, ErrorKind, FilterParams, IdSequence, Request,
    SourceError, UnitId, UnitPayload, UnitRow, UnitRows, UnitSource,
};
use crate::core::action::{Effect, Notification};
use crate::core::window::{UnitWindow, WindowConfig};
use crate::navigator::View;

pub fn ids(raw: impl IntoIterator<Item = u64>) -> Vec<UnitId> {
    raw.into_iter().map(UnitId).collect()
}

/// A listing row with `source` as its only plural form.
pub fn row(source: &str) -> UnitRow {
    UnitRow {
        source: vec![source.to_string()],
        source_lang: Some("en".to_string()),
        target_lang: Some("fr".to_string()),
        ..Default::default()
    }
}

/// Rows for `ids`, with "Unit <id>" as source text.
pub fn rows_for(ids: &[UnitId]) -> UnitRows {
    ids.iter()
        .map(|id| (*id, row(&format!("Unit {id}"))))
        .collect()
}

/// An editor payload that leaves the stub's source text alone.
pub fn full_payload(target: &str) -> UnitPayload {
    UnitPayload {
        editor: "<form/>".to_string(),
        target: vec![target.to_string()],
        ..Default::default()
    }
}

pub fn window_with(config: WindowConfig, raw: impl IntoIterator<Item = u64>) -> UnitWindow {
    let mut window = UnitWindow::new(config);
    window.load_sequence(IdSequence::flat(ids(raw)));
    window
}

pub fn notifications(effects: &[Effect]) -> Vec<Notification> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Notify(n) => Some(n.clone()),
            Effect::Fetch(_) => None,
        })
        .collect()
}

/// Ids of the prefetch batch among `effects`, if any.
pub fn fetched_ids(effects: &[Effect]) -> Vec<UnitId> {
    effects
        .iter()
        .find_map(|e| match e {
            Effect::Fetch(Request::Units { ids, .. }) => Some(ids.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

// ============================================================================
// In-memory source
// ============================================================================

/// Serves a fixed id list per filter name. Filters and unit fetches can be
/// made to fail, unit fetches delayed, and every call is recorded.
#[derive(Default)]
pub struct MockSource {
    sequences: HashMap<Option<String>, Vec<UnitId>>,
    failing_filters: HashSet<String>,
    delays: Mutex<HashMap<UnitId, Duration>>,
    failing: Mutex<HashSet<UnitId>>,
    calls: Mutex<Vec<Request>>,
}

impl MockSource {
    pub fn new(raw: impl IntoIterator<Item = u64>) -> Self {
        let mut sequences = HashMap::new();
        sequences.insert(None, ids(raw));
        Self {
            sequences,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, name: &str, raw: impl IntoIterator<Item = u64>) -> Self {
        self.sequences.insert(Some(name.to_string()), ids(raw));
        self
    }

    /// Sequence requests for `name` answer with HTTP 500.
    pub fn with_failing_filter(mut self, name: &str) -> Self {
        self.failing_filters.insert(name.to_string());
        self
    }

    pub fn delay(&self, id: u64, delay: Duration) {
        self.delays.lock().unwrap().insert(UnitId(id), delay);
    }

    pub fn fail(&self, id: u64) {
        self.failing.lock().unwrap().insert(UnitId(id));
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    pub fn unit_calls(&self) -> Vec<UnitId> {
        self.calls()
            .into_iter()
            .filter_map(|r| match r {
                Request::Unit(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, request: Request) {
        self.calls.lock().unwrap().push(request);
    }
}

#[async_trait]
impl UnitSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_id_sequence(&self, filter: &FilterParams) -> Result<IdSequence, SourceError> {
        self.record(Request::IdSequence(filter.clone()));
        if let Some(name) = &filter.filter
            && self.failing_filters.contains(name)
        {
            return Err(SourceError::Api {
                status: 500,
                message: format!("filter {name} exploded"),
            });
        }
        let ids = self.sequences.get(&filter.filter).cloned().unwrap_or_default();
        Ok(IdSequence::flat(ids))
    }

    async fn fetch_units_by_ids(
        &self,
        ids: &[UnitId],
        headers: &[UnitId],
    ) -> Result<UnitRows, SourceError> {
        self.record(Request::Units {
            ids: ids.to_vec(),
            headers: headers.to_vec(),
        });
        Ok(rows_for(ids))
    }

    async fn fetch_unit_by_id(&self, id: UnitId) -> Result<UnitPayload, SourceError> {
        self.record(Request::Unit(id));
        let delay = self.delays.lock().unwrap().get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(&id) {
            return Err(SourceError::Api {
                status: 500,
                message: format!("unit {id} exploded"),
            });
        }
        Ok(full_payload(&format!("Unit {id} target")))
    }

    async fn fetch_context(
        &self,
        id: UnitId,
        radius: ContextRadius,
    ) -> Result<ContextPayload, SourceError> {
        self.record(Request::Context { id, radius });
        let neighbour = |n: u64| ContextRow {
            id: UnitId(n),
            row: row(&format!("Unit {n}")),
        };
        Ok(ContextPayload {
            before: (id.0.saturating_sub(radius.before as u64)..id.0).map(neighbour).collect(),
            after: (id.0 + 1..=id.0 + radius.after as u64).map(neighbour).collect(),
        })
    }
}

// ============================================================================
// Recording view
// ============================================================================

/// Keeps every notification it receives, in order.
#[derive(Default)]
pub struct RecordingView {
    pub events: Vec<Notification>,
}

impl RecordingView {
    pub fn positions(&self) -> Vec<UnitId> {
        self.events
            .iter()
            .filter_map(|n| match n {
                Notification::PositionChanged(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl View for RecordingView {
    fn position_changed(&mut self, _window: &UnitWindow, id: UnitId) {
        self.events.push(Notification::PositionChanged(id));
    }

    fn viewport_data_changed(&mut self, _window: &UnitWindow, ids: &[UnitId]) {
        self.events.push(Notification::ViewportDataChanged(ids.to_vec()));
    }

    fn context_changed(&mut self, _window: &UnitWindow, id: UnitId) {
        self.events.push(Notification::ContextChanged(id));
    }

    fn empty_result(&mut self) {
        self.events.push(Notification::EmptyResult);
    }

    fn fetch_error(&mut self, kind: ErrorKind, detail: &str) {
        self.events.push(Notification::FetchError {
            kind,
            detail: detail.to_string(),
        });
    }
}
