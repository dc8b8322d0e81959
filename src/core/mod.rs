//! # Core Navigation Logic
//!
//! The windowed unit cache and everything it needs. It knows nothing about
//! any specific transport or UI.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • UnitWindow (state)   │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │  • RequestQueue         │
//!                    └───────────┬─────────────┘
//!                                │ Effect
//!                  ┌─────────────┴─────────────┐
//!                  ▼                           ▼
//!           ┌────────────┐              ┌────────────┐
//!           │ Navigator  │ ── Request ─▶│ UnitSource │
//!           │  (tokio)   │ ◀─ Response ─│  (HTTP)    │
//!           └────────────┘              └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`window`]: `UnitWindow`, the position / cache state machine
//! - [`unit`]: `Unit`, one translation unit with two-stage loading
//! - [`action`]: `Action`, `Effect` and the `update()` reducer
//! - [`queue`]: `RequestQueue`, one in-flight request per key
//! - [`config`]: `~/.unitnav/config.toml` loading and resolution

pub mod action;
pub mod config;
pub mod queue;
pub mod unit;
pub mod window;

pub use action::{Action, Effect, Notification, update};
pub use queue::{FetchError, Pending, QueueKey, RequestQueue, Ticket};
pub use unit::{ContextRows, EditorData, Unit};
pub use window::{Direction, UnitWindow, WindowConfig, WindowError};
