//! User input, as the navigator sees it.

use std::fmt;

use crate::api::{FilterParams, UnitId};

#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    Next,
    Prev,
    Goto(UnitId),
    /// 1-based position in the full result.
    GotoPosition(usize),
    /// Load context rows for the current unit right away.
    ShowContext,
    /// Pointer rests on a row; context loads after the hover delay.
    HoverStart(UnitId),
    HoverEnd,
    FilterChanged(FilterParams),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument(&'static str),
    InvalidNumber(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::Unknown(cmd) => write!(f, "unknown command: {cmd}"),
            CommandError::MissingArgument(what) => write!(f, "missing argument: {what}"),
            CommandError::InvalidNumber(raw) => write!(f, "not a number: {raw}"),
        }
    }
}

impl std::error::Error for CommandError {}

fn number<T: std::str::FromStr>(raw: Option<&str>, what: &'static str) -> Result<T, CommandError> {
    let raw = raw.ok_or(CommandError::MissingArgument(what))?;
    raw.parse()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}

/// Parses one line of the interactive prompt. `filter` is the active filter,
/// which `filter` / `search` commands refine.
pub fn parse_command(line: &str, filter: &FilterParams) -> Result<NavEvent, CommandError> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, Some(rest.trim()).filter(|r| !r.is_empty())),
        None => (line, None),
    };

    match command {
        "" => Err(CommandError::Empty),
        "n" | "next" => Ok(NavEvent::Next),
        "p" | "prev" => Ok(NavEvent::Prev),
        "g" | "goto" => Ok(NavEvent::Goto(UnitId(number(rest, "unit id")?))),
        "pos" => Ok(NavEvent::GotoPosition(number(rest, "position")?)),
        "ctx" | "context" => Ok(NavEvent::ShowContext),
        "hover" => Ok(NavEvent::HoverStart(UnitId(number(rest, "unit id")?))),
        "unhover" => Ok(NavEvent::HoverEnd),
        "filter" => Ok(NavEvent::FilterChanged(FilterParams {
            filter: rest.map(str::to_string),
            ..filter.clone()
        })),
        "search" => Ok(NavEvent::FilterChanged(FilterParams {
            search: rest.map(str::to_string),
            ..filter.clone()
        })),
        "q" | "quit" => Ok(NavEvent::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}
