//! # Unit Window
//!
//! Owns the ordered id sequence, the current position and a bounded cache of
//! loaded [`Unit`]s around it.
//!
//! ```text
//!   sequence:  0 ........ start ...... p ........ end ......... len-1
//!                         |<-- vb+m -->|<-- va+m -->|
//!                         '-------- retention ------'
//!   vb = visible_before, va = visible_after, m = prefetch_margin
//! ```
//!
//! The window never awaits. Operations return [`Effect`]s: requests for the
//! navigator to issue and notifications for the view. Results come back
//! through the `*_loaded` / `fetch_failed` handlers, each of which re-checks
//! that the result still concerns the current position before touching
//! any state.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::RangeInclusive;

use log::{debug, info, warn};

use crate::api::{
    ContextPayload, ContextRadius, IdSequence, Request, SourceError, UnitId, UnitPayload,
    UnitRows,
};
use crate::core::action::{Effect, Notification};
use crate::core::unit::{ContextRows, Unit};

pub const DEFAULT_VISIBLE_BEFORE: usize = 8;
pub const DEFAULT_VISIBLE_AFTER: usize = 29;
pub const DEFAULT_PREFETCH_MARGIN: usize = 5;
pub const DEFAULT_CONTEXT_RADIUS: usize = 5;

/// Window sizing. More rows are shown after the current unit than before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub visible_before: usize,
    pub visible_after: usize,
    /// Extra rows kept/fetched beyond the visible ones on each side.
    pub prefetch_margin: usize,
    /// Neighbours requested on each side when loading context rows.
    pub context_radius: usize,
    /// Also fetch a partial margin when the window touches the last index.
    pub prefetch_at_tail: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            visible_before: DEFAULT_VISIBLE_BEFORE,
            visible_after: DEFAULT_VISIBLE_AFTER,
            prefetch_margin: DEFAULT_PREFETCH_MARGIN,
            context_radius: DEFAULT_CONTEXT_RADIUS,
            prefetch_at_tail: false,
        }
    }
}

impl WindowConfig {
    /// Upper bound on cached units once fetches have settled.
    pub fn max_cached(&self) -> usize {
        self.visible_before + self.visible_after + 2 * self.prefetch_margin + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Before,
    After,
}

/// Navigation requests that could not be honoured. Neither is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    NotFoundInSequence(UnitId),
    EmptySequence,
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::NotFoundInSequence(id) => write!(f, "unit {id} is not in the sequence"),
            WindowError::EmptySequence => write!(f, "sequence is empty"),
        }
    }
}

impl std::error::Error for WindowError {}

#[derive(Debug, Default)]
pub struct UnitWindow {
    config: WindowConfig,
    sequence: Vec<UnitId>,
    index: HashMap<UnitId, usize>,
    headers: HashSet<UnitId>,
    begin: usize,
    end: usize,
    total: usize,
    /// Tentative position; may run ahead of `confirmed` while a direct
    /// fetch is outstanding.
    position: Option<usize>,
    /// Last position announced to the view.
    confirmed: Option<usize>,
    /// Unit whose direct fetch we are waiting for.
    awaiting: Option<UnitId>,
    /// Context asked for while `awaiting` was still outstanding.
    deferred_context: Option<UnitId>,
    cache: HashMap<UnitId, Unit>,
}

impl UnitWindow {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    // ========================================================================
    // Sequence
    // ========================================================================

    /// Replaces the sequence, clears the cache and drops the position.
    /// An empty sequence is a legitimate state and reported as such.
    pub fn load_sequence(&mut self, sequence: IdSequence) -> Vec<Effect> {
        let IdSequence {
            ids,
            headers,
            begin,
            end,
            total,
        } = sequence;

        self.sequence = Vec::with_capacity(ids.len());
        self.index.clear();
        for id in ids {
            if self.index.contains_key(&id) {
                warn!("Dropping duplicate unit id {} from sequence", id);
                continue;
            }
            self.index.insert(id, self.sequence.len());
            self.sequence.push(id);
        }

        self.headers = headers;
        self.begin = begin;
        self.end = end;
        self.total = total;
        self.cache.clear();
        self.position = None;
        self.confirmed = None;
        self.awaiting = None;
        self.deferred_context = None;

        info!(
            "Loaded sequence of {} units (begin={}, end={}, total={})",
            self.sequence.len(),
            begin,
            end,
            total
        );

        if self.sequence.is_empty() {
            vec![Effect::Notify(Notification::EmptyResult)]
        } else {
            Vec::new()
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn goto(&mut self, id: UnitId) -> Result<Vec<Effect>, WindowError> {
        let Some(&index) = self.index.get(&id) else {
            return Err(WindowError::NotFoundInSequence(id));
        };

        let loaded = self.cache.get(&id).is_some_and(Unit::is_fully_loaded);
        if self.position == Some(index) && (loaded || self.awaiting == Some(id)) {
            return Ok(Vec::new());
        }

        self.position = Some(index);
        self.deferred_context = None;
        if loaded {
            self.awaiting = None;
            return Ok(self.confirm(id));
        }

        debug!("Unit {} not loaded, fetching it directly", id);
        self.awaiting = Some(id);
        Ok(vec![Effect::Fetch(Request::Unit(id))])
    }

    /// Moves by `delta` rows, clamped to the ends of the sequence.
    pub fn goto_by_offset(&mut self, delta: isize) -> Result<Vec<Effect>, WindowError> {
        let Some(last) = self.sequence.len().checked_sub(1) else {
            return Err(WindowError::EmptySequence);
        };
        let base = self.position.map_or(-1, |p| p as isize);
        let target = base.saturating_add(delta).clamp(0, last as isize) as usize;
        self.goto(self.sequence[target])
    }

    /// Moves to a 1-based position in the full server-side result.
    pub fn goto_position(&mut self, position: usize) -> Result<Vec<Effect>, WindowError> {
        let Some(last) = self.sequence.len().checked_sub(1) else {
            return Err(WindowError::EmptySequence);
        };
        let index = position.saturating_sub(self.begin + 1).min(last);
        self.goto(self.sequence[index])
    }

    /// Announces the current unit and refreshes the cache around it.
    fn confirm(&mut self, id: UnitId) -> Vec<Effect> {
        self.confirmed = self.position;
        let mut effects = vec![Effect::Notify(Notification::PositionChanged(id))];
        effects.extend(self.prefetch());
        self.evict();
        if self.deferred_context.take() == Some(id) {
            effects.extend(self.load_context(id));
        }
        effects
    }

    /// Gives up on the outstanding direct fetch, if any, and falls back to
    /// the last announced position. Returns whether one was outstanding.
    pub fn abandon_pending(&mut self) -> bool {
        let Some(id) = self.awaiting.take() else {
            return false;
        };
        debug!("Abandoning direct fetch of unit {}", id);
        self.position = self.confirmed;
        self.deferred_context = None;
        true
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// 1-based position within the full server-side result, 0 if none.
    pub fn position(&self) -> usize {
        self.position.map_or(0, |index| self.begin + index + 1)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.position
    }

    pub fn current_id(&self) -> Option<UnitId> {
        self.position.map(|index| self.sequence[index])
    }

    pub fn current_unit(&self) -> Option<&Unit> {
        self.current_id().and_then(|id| self.cache.get(&id))
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.cache.get(&id)
    }

    pub fn is_cached(&self, id: UnitId) -> bool {
        self.cache.contains_key(&id)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn sequence(&self) -> &[UnitId] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn index_of(&self, id: UnitId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn is_header(&self, id: UnitId) -> bool {
        self.headers.contains(&id)
    }

    pub fn begin(&self) -> usize {
        self.begin
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Unit whose direct fetch is outstanding, if any.
    pub fn awaiting(&self) -> Option<UnitId> {
        self.awaiting
    }

    pub fn is_on_first_unit(&self) -> bool {
        self.position.is_none_or(|index| index == 0)
    }

    pub fn is_on_last_unit(&self) -> bool {
        self.position.is_some() && self.position == self.sequence.len().checked_sub(1)
    }

    /// Ids to render before/after the current unit, nearest last/first.
    pub fn visible_range(&self, direction: Direction) -> &[UnitId] {
        let Some(p) = self.position else {
            return &[];
        };
        match direction {
            Direction::Before => &self.sequence[p.saturating_sub(self.config.visible_before)..p],
            Direction::After => {
                let end = (p + 1 + self.config.visible_after).min(self.sequence.len());
                &self.sequence[p + 1..end]
            }
        }
    }

    /// Index range whose units may stay cached, around the current position.
    pub fn retention_range(&self) -> Option<RangeInclusive<usize>> {
        let p = self.position?;
        let last = self.sequence.len() - 1;
        let start = p.saturating_sub(self.config.visible_before + self.config.prefetch_margin);
        let end = (p + self.config.visible_after + self.config.prefetch_margin).min(last);
        Some(start..=end)
    }

    // ========================================================================
    // Cache maintenance
    // ========================================================================

    /// Requests the retention-window units without a listing row, in one
    /// batch. Units fetched directly before being listed count as missing.
    /// Fewer than `prefetch_margin` missing units are not worth a request
    /// unless the window touches the start of the sequence.
    pub fn prefetch(&self) -> Vec<Effect> {
        let Some(range) = self.retention_range() else {
            return Vec::new();
        };
        let (start, end) = (*range.start(), *range.end());

        let missing: Vec<UnitId> = self.sequence[range]
            .iter()
            .filter(|id| !self.cache.get(id).is_some_and(Unit::is_listed))
            .copied()
            .collect();
        if missing.is_empty() {
            return Vec::new();
        }

        let at_head = start == 0;
        let at_tail = self.config.prefetch_at_tail && end + 1 == self.sequence.len();
        if missing.len() < self.config.prefetch_margin && !at_head && !at_tail {
            debug!(
                "Deferring prefetch: {} missing < margin {}",
                missing.len(),
                self.config.prefetch_margin
            );
            return Vec::new();
        }

        let headers = missing
            .iter()
            .filter(|id| self.headers.contains(id))
            .copied()
            .collect();
        debug!("Prefetching {} units in [{}, {}]", missing.len(), start, end);
        vec![Effect::Fetch(Request::Units {
            ids: missing,
            headers,
        })]
    }

    /// Drops cached units outside the retention window. Returns how many
    /// were removed. The current unit is always kept.
    pub fn evict(&mut self) -> usize {
        let Some(range) = self.retention_range() else {
            return 0;
        };
        let current = self.position;
        let index = &self.index;
        let before = self.cache.len();
        self.cache.retain(|id, _| match index.get(id) {
            Some(&i) => range.contains(&i) || Some(i) == current,
            None => false,
        });
        let removed = before - self.cache.len();
        if removed > 0 {
            debug!("Evicted {} units outside {:?}", removed, range);
        }
        removed
    }

    // ========================================================================
    // Context rows
    // ========================================================================

    /// Loads neighbouring rows for the current unit `id`. While its direct
    /// fetch is outstanding the request is held until the unit arrives.
    pub fn load_context(&mut self, id: UnitId) -> Vec<Effect> {
        if self.current_id() != Some(id) {
            debug!("Ignoring context request for non-current unit {}", id);
            return Vec::new();
        }
        match self.cache.get(&id) {
            None if self.awaiting == Some(id) => {
                info!("Unit {} still loading, context will follow", id);
                self.deferred_context = Some(id);
                Vec::new()
            }
            None => {
                debug!("Unit {} not cached yet, no context to load", id);
                Vec::new()
            }
            Some(unit) if unit.context().is_some() => {
                vec![Effect::Notify(Notification::ContextChanged(id))]
            }
            Some(_) => vec![Effect::Fetch(Request::Context {
                id,
                radius: ContextRadius::symmetric(self.config.context_radius),
            })],
        }
    }

    // ========================================================================
    // Fetch results
    // ========================================================================

    /// Direct fetch resolved. Ignored unless `id` is still the unit we are
    /// waiting on at the current position.
    pub fn unit_loaded(&mut self, id: UnitId, payload: UnitPayload) -> Vec<Effect> {
        if self.current_id() != Some(id) || self.awaiting != Some(id) {
            debug!(
                "Discarding stale unit {} (current: {:?})",
                id,
                self.current_id()
            );
            return Vec::new();
        }
        self.awaiting = None;
        self.cache
            .entry(id)
            .or_insert_with(|| Unit::unlisted(id))
            .hydrate(payload);
        self.confirm(id)
    }

    /// Prefetch batch resolved. Only ids inside the current retention window
    /// are stored. Fully loaded units keep their editor data and only take
    /// the listing fields they were missing.
    pub fn rows_loaded(&mut self, rows: UnitRows) -> Vec<Effect> {
        let Some(range) = self.retention_range() else {
            debug!("Discarding {} prefetched rows: no current unit", rows.len());
            return Vec::new();
        };

        let mut added = Vec::new();
        for (id, row) in rows {
            let Some(&index) = self.index.get(&id) else {
                continue;
            };
            if !range.contains(&index) {
                continue;
            }
            match self.cache.get_mut(&id) {
                Some(unit) => {
                    if !unit.apply_row(row) {
                        continue;
                    }
                }
                None => {
                    self.cache.insert(id, Unit::stub(id, row));
                }
            }
            added.push(id);
        }

        if added.is_empty() {
            return Vec::new();
        }
        let index = &self.index;
        added.sort_by_key(|id| index.get(id).copied());
        vec![Effect::Notify(Notification::ViewportDataChanged(added))]
    }

    pub fn context_loaded(&mut self, id: UnitId, context: ContextPayload) -> Vec<Effect> {
        if self.current_id() != Some(id) {
            debug!("Discarding context for {}: no longer current", id);
            return Vec::new();
        }
        let Some(unit) = self.cache.get_mut(&id) else {
            debug!("Discarding context for {}: unit not cached", id);
            return Vec::new();
        };
        unit.attach_context(ContextRows::from(context));
        vec![Effect::Notify(Notification::ContextChanged(id))]
    }

    /// A request failed. The window stays at its last consistent state: a
    /// failed direct fetch rolls the tentative position back.
    pub fn fetch_failed(&mut self, request: &Request, error: &SourceError) -> Vec<Effect> {
        match request {
            Request::Unit(id) if self.awaiting != Some(*id) => {
                debug!("Ignoring failure for stale unit {}: {}", id, error);
                return Vec::new();
            }
            Request::Unit(id) => {
                warn!("Failed to load unit {}: {}", id, error);
                self.abandon_pending();
            }
            Request::Context { id, .. } if self.current_id() != Some(*id) => {
                debug!("Ignoring context failure for stale unit {}: {}", id, error);
                return Vec::new();
            }
            _ => warn!("Request to {} failed: {}", request.target(), error),
        }
        vec![Effect::Notify(Notification::FetchError {
            kind: error.kind(),
            detail: error.to_string(),
        })]
    }
}
