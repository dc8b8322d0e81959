//! # Request Queue
//!
//! At most one in-flight request per queue key. Starting a request under a
//! busy key aborts the previous one: its future is dropped (closing the
//! transport) and it resolves to [`FetchError::Aborted`].
//!
//! Queue-level cancellation only protects against literal duplicates.
//! Callers still have to check, when a result arrives, that it is relevant
//! to whatever is current *now*.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use futures::future::{AbortHandle, Abortable, Aborted};
use log::debug;

use crate::api::{Request, SourceError};

/// Logical bucket for deduplication and cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey(String);

impl QueueKey {
    /// Default key: the endpoint path the request targets.
    pub fn for_target(path: impl Into<String>) -> Self {
        QueueKey(path.into())
    }

    /// Explicit queue name, for requests that must not share the default.
    pub fn named(name: &str) -> Self {
        QueueKey(format!("queue:{name}"))
    }

    pub fn for_request(request: &Request) -> Self {
        match request.queue_name() {
            Some(name) => QueueKey::named(name),
            None => QueueKey::for_target(request.target()),
        }
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one issued request; later requests get larger tickets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

/// How a queued request ended, other than successfully.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Superseded or cancelled. Always a silent no-op for callers.
    Aborted,
    /// The transport or server failed.
    Failed(SourceError),
}

impl FetchError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Aborted => write!(f, "request aborted"),
            FetchError::Failed(e) => write!(f, "request failed: {e}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<Aborted> for FetchError {
    fn from(_: Aborted) -> Self {
        FetchError::Aborted
    }
}

/// A request registered with the queue but not yet awaited.
pub struct Pending<F> {
    key: QueueKey,
    ticket: Ticket,
    inner: Abortable<F>,
}

impl<F, T> Pending<F>
where
    F: Future<Output = Result<T, SourceError>>,
{
    pub fn key(&self) -> &QueueKey {
        &self.key
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Drives the request to completion.
    pub async fn outcome(self) -> Result<T, FetchError> {
        self.inner.await?.map_err(FetchError::Failed)
    }
}

struct InFlight {
    ticket: Ticket,
    handle: AbortHandle,
}

#[derive(Default)]
pub struct RequestQueue {
    in_flight: HashMap<QueueKey, InFlight>,
    next_ticket: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `request` under `key`, aborting whatever was in flight there.
    pub fn fetch<F, T>(&mut self, key: QueueKey, request: F) -> Pending<F>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        self.cancel(&key);

        let (handle, registration) = AbortHandle::new_pair();
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight.insert(key.clone(), InFlight { ticket, handle });
        debug!("Queued request {:?} under {}", ticket, key);

        Pending {
            key,
            ticket,
            inner: Abortable::new(request, registration),
        }
    }

    /// Marks the request identified by `ticket` as finished. Returns `true`
    /// only if it was still the latest request for `key`; a `false` means
    /// the result belongs to a superseded request and must be ignored.
    pub fn settle(&mut self, key: &QueueKey, ticket: Ticket) -> bool {
        match self.in_flight.get(key) {
            Some(current) if current.ticket == ticket => {
                self.in_flight.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Aborts the in-flight request under `key`, if any.
    pub fn cancel(&mut self, key: &QueueKey) -> bool {
        match self.in_flight.remove(key) {
            Some(previous) => {
                debug!("Aborting {:?} under {}", previous.ticket, key);
                previous.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, in_flight) in self.in_flight.drain() {
            in_flight.handle.abort();
        }
    }

    pub fn is_in_flight(&self, key: &QueueKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }
}
