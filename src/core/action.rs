//! # Actions
//!
//! Everything that can happen to the window becomes an `Action`.
//! User presses "next"? That's `Action::GotoOffset(1)`.
//! Server answers the direct fetch? That's `Action::UnitLoaded { .. }`.
//!
//! `update()` applies an action to the [`UnitWindow`] and returns the
//! [`Effect`]s it asks for. No I/O here. The navigator performs them.
//!
//! ```text
//! Window + Action  →  update()  →  Window' + [Effect]
//! ```

use log::debug;

use crate::api::{
    ContextPayload, ErrorKind, FilterParams, IdSequence, Request, Response, SourceError, UnitId,
    UnitPayload, UnitRows,
};
use crate::core::window::UnitWindow;

/// Something the view should hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The current unit is fully loaded and displayable.
    PositionChanged(UnitId),
    /// Prefetched rows were stored for these ids (sequence order).
    ViewportDataChanged(Vec<UnitId>),
    /// Context rows for this unit are ready.
    ContextChanged(UnitId),
    /// The filter matched nothing.
    EmptyResult,
    FetchError { kind: ErrorKind, detail: String },
}

/// Output of the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch(Request),
    Notify(Notification),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Reload the id sequence for a new filter.
    ChangeFilter(FilterParams),
    /// The id sequence arrived. `focus` is re-selected if it survived the
    /// filter change, otherwise the first unit is.
    SequenceLoaded {
        sequence: IdSequence,
        focus: Option<UnitId>,
    },
    Goto(UnitId),
    GotoOffset(isize),
    /// 1-based, as returned by `UnitWindow::position`.
    GotoPosition(usize),
    LoadContext(UnitId),
    UnitLoaded {
        id: UnitId,
        payload: UnitPayload,
    },
    RowsLoaded(UnitRows),
    ContextLoaded {
        id: UnitId,
        context: ContextPayload,
    },
    FetchFailed {
        request: Request,
        error: SourceError,
    },
}

impl Action {
    /// Turns a successful response into the action that consumes it.
    pub fn from_response(response: Response, focus: Option<UnitId>) -> Self {
        match response {
            Response::IdSequence(sequence) => Action::SequenceLoaded { sequence, focus },
            Response::Units(rows) => Action::RowsLoaded(rows),
            Response::Unit { id, payload } => Action::UnitLoaded { id, payload },
            Response::Context { id, context } => Action::ContextLoaded { id, context },
        }
    }
}

pub fn update(window: &mut UnitWindow, action: Action) -> Vec<Effect> {
    match action {
        Action::ChangeFilter(filter) => vec![Effect::Fetch(Request::IdSequence(filter))],

        Action::SequenceLoaded { sequence, focus } => {
            let mut effects = window.load_sequence(sequence);
            let target = focus
                .filter(|id| window.contains(*id))
                .or_else(|| window.sequence().first().copied());
            if let Some(id) = target {
                effects.extend(navigate(window.goto(id)));
            }
            effects
        }

        Action::Goto(id) => navigate(window.goto(id)),
        Action::GotoOffset(delta) => navigate(window.goto_by_offset(delta)),
        Action::GotoPosition(position) => navigate(window.goto_position(position)),
        Action::LoadContext(id) => window.load_context(id),

        Action::UnitLoaded { id, payload } => window.unit_loaded(id, payload),
        Action::RowsLoaded(rows) => window.rows_loaded(rows),
        Action::ContextLoaded { id, context } => window.context_loaded(id, context),
        Action::FetchFailed { request, error } => window.fetch_failed(&request, &error),
    }
}

/// Navigation errors leave the window untouched and are not surfaced.
fn navigate<E: std::fmt::Display>(result: Result<Vec<Effect>, E>) -> Vec<Effect> {
    result.unwrap_or_else(|e| {
        debug!("Navigation ignored: {}", e);
        Vec::new()
    })
}
