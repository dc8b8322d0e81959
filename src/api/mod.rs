pub mod client;
pub mod source;
pub mod types;

pub use client::HttpUnitSource;
pub use source::{ErrorKind, Request, Response, SourceError, UnitSource, perform};
pub use types::{
    ContextPayload, ContextRadius, ContextRow, FilterParams, IdSequence, UnitId, UnitPayload,
    UnitRow, UnitRows,
};
