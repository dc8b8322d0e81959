//! # Navigator
//!
//! Drives a [`UnitWindow`] on the tokio runtime.
//!
//! ```text
//!   NavEvent ─▶ handle_event ─▶ update() ─▶ [Effect]
//!                                             │
//!                      ┌──────────────────────┴───────────┐
//!                      ▼                                  ▼
//!             spawn_fetch (RequestQueue)             View callbacks
//!                      │
//!                      ▼
//!   Completion ─▶ handle_completion ─▶ settle? ─▶ update() ─▶ ...
//! ```
//!
//! Every fetch runs in its own task and reports back over an unbounded
//! channel. Results whose ticket is no longer the latest for their queue key
//! are dropped before the window sees them.

pub mod event;
pub mod view;

pub use event::{CommandError, NavEvent, parse_command};
pub use view::{TerminalView, View};

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc;

use crate::api::{FilterParams, Request, Response, UnitId, UnitSource, perform};
use crate::core::action::{Action, Effect, Notification, update};
use crate::core::queue::{FetchError, QueueKey, RequestQueue, Ticket};
use crate::core::window::UnitWindow;

/// Something a background task finished.
#[derive(Debug)]
pub enum Completion {
    Fetched {
        key: QueueKey,
        ticket: Ticket,
        request: Request,
        outcome: Result<Response, FetchError>,
    },
    HoverElapsed {
        ticket: u64,
        id: UnitId,
    },
}

struct Hover {
    ticket: u64,
    handle: tokio::task::AbortHandle,
}

pub struct Navigator<V: View> {
    window: UnitWindow,
    queue: RequestQueue,
    source: Arc<dyn UnitSource>,
    view: V,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    hover: Option<Hover>,
    hover_delay: Duration,
    next_hover: u64,
    /// Unit to re-select once the pending id sequence arrives.
    focus: Option<UnitId>,
    filter: FilterParams,
}

impl<V: View> Navigator<V> {
    pub fn new(
        window: UnitWindow,
        source: Arc<dyn UnitSource>,
        view: V,
        hover_delay: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        info!("Navigator using {} source", source.name());
        Self {
            window,
            queue: RequestQueue::new(),
            source,
            view,
            tx,
            rx,
            hover: None,
            hover_delay,
            next_hover: 0,
            focus: None,
            filter: FilterParams::default(),
        }
    }

    pub fn window(&self) -> &UnitWindow {
        &self.window
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn filter(&self) -> &FilterParams {
        &self.filter
    }

    /// Handles one user event. Returns `false` once the user quits.
    pub fn handle_event(&mut self, event: NavEvent) -> bool {
        debug!("Event: {:?}", event);
        match event {
            NavEvent::Next => self.apply(Action::GotoOffset(1)),
            NavEvent::Prev => self.apply(Action::GotoOffset(-1)),
            NavEvent::Goto(id) => self.apply(Action::Goto(id)),
            NavEvent::GotoPosition(position) => self.apply(Action::GotoPosition(position)),
            NavEvent::ShowContext => {
                if let Some(id) = self.window.current_id() {
                    self.apply(Action::LoadContext(id));
                }
            }
            NavEvent::HoverStart(id) => self.start_hover(id),
            NavEvent::HoverEnd => self.cancel_hover(),
            NavEvent::FilterChanged(filter) => self.change_filter(filter),
            NavEvent::Quit => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Fetched {
                key,
                ticket,
                request,
                outcome,
            } => {
                if !self.queue.settle(&key, ticket) {
                    debug!("Dropping superseded result {:?} under {}", ticket, key);
                    return;
                }
                let action = match outcome {
                    Ok(response) => {
                        let focus = match response {
                            Response::IdSequence(_) => self.focus.take(),
                            _ => None,
                        };
                        Action::from_response(response, focus)
                    }
                    Err(FetchError::Aborted) => return,
                    Err(FetchError::Failed(error)) => Action::FetchFailed { request, error },
                };
                self.apply(action);
            }
            Completion::HoverElapsed { ticket, id } => {
                if self.hover.as_ref().is_some_and(|h| h.ticket == ticket) {
                    self.hover = None;
                    self.apply(Action::LoadContext(id));
                }
            }
        }
    }

    /// Processes completions until no request or hover timer is pending.
    pub async fn run_until_idle(&mut self) {
        while !self.queue.is_idle() || self.hover.is_some() {
            match self.rx.recv().await {
                Some(completion) => self.handle_completion(completion),
                None => break,
            }
        }
    }

    /// Main loop: interleaves user events with fetch completions until the
    /// user quits or the event stream ends. Returns the view.
    pub async fn run(mut self, mut events: mpsc::Receiver<NavEvent>) -> V {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if !self.handle_event(event) {
                            break;
                        }
                    }
                    None => {
                        self.shutdown();
                        break;
                    }
                },
                Some(completion) = self.rx.recv() => self.handle_completion(completion),
            }
        }
        info!("Navigator stopped");
        self.view
    }

    fn apply(&mut self, action: Action) {
        let effects = update(&mut self.window, action);
        self.dispatch(effects);
    }

    fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Fetch(request) => self.spawn_fetch(request),
                Effect::Notify(notification) => self.notify(notification),
            }
        }
    }

    fn notify(&mut self, notification: Notification) {
        match notification {
            Notification::PositionChanged(id) => self.view.position_changed(&self.window, id),
            Notification::ViewportDataChanged(ids) => {
                self.view.viewport_data_changed(&self.window, &ids)
            }
            Notification::ContextChanged(id) => self.view.context_changed(&self.window, id),
            Notification::EmptyResult => self.view.empty_result(),
            Notification::FetchError { kind, detail } => self.view.fetch_error(kind, &detail),
        }
    }

    fn spawn_fetch(&mut self, request: Request) {
        let source = Arc::clone(&self.source);
        let outgoing = request.clone();
        let pending = self.queue.fetch(QueueKey::for_request(&request), async move {
            perform(source.as_ref(), &outgoing).await
        });
        let key = pending.key().clone();
        let ticket = pending.ticket();
        let tx = self.tx.clone();

        debug!("Fetching {} ({:?})", request.target(), ticket);
        tokio::spawn(async move {
            let outcome = pending.outcome().await;
            let _ = tx.send(Completion::Fetched {
                key,
                ticket,
                request,
                outcome,
            });
        });
    }

    /// Cancels in-flight unit work and reloads the id sequence, keeping the
    /// current unit selected if the new filter still matches it.
    fn change_filter(&mut self, filter: FilterParams) {
        self.focus = self.window.current_id().or(filter.uid);
        self.cancel_unit_work();
        self.cancel_hover();

        let filter = FilterParams {
            uid: self.focus,
            ..filter
        };
        info!("Filter changed: {:?}", filter);
        self.filter = filter.clone();
        self.apply(Action::ChangeFilter(filter));
    }

    fn start_hover(&mut self, id: UnitId) {
        self.cancel_hover();
        let ticket = self.next_hover;
        self.next_hover += 1;

        let tx = self.tx.clone();
        let delay = self.hover_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Completion::HoverElapsed { ticket, id });
        });
        self.hover = Some(Hover {
            ticket,
            handle: task.abort_handle(),
        });
    }

    fn cancel_hover(&mut self) {
        if let Some(hover) = self.hover.take() {
            hover.handle.abort();
        }
    }

    /// Cancels per-unit requests and takes the window off any unit it was
    /// still fetching directly.
    fn cancel_unit_work(&mut self) {
        for name in ["unit", "prefetch", "context"] {
            self.queue.cancel(&QueueKey::named(name));
        }
        if self.window.abandon_pending() {
            debug!("Rolled back to {:?}", self.window.current_id());
        }
    }

    fn shutdown(&mut self) {
        self.queue.cancel_all();
        self.window.abandon_pending();
        self.cancel_hover();
    }
}
