//! Rendering seam. The navigator reports every window notification to a
//! [`View`]; all methods default to doing nothing.

use std::io::{self, Write};

use log::{debug, warn};

use crate::api::{ErrorKind, UnitId};
use crate::core::unit::Unit;
use crate::core::window::{Direction, UnitWindow};

pub trait View {
    fn position_changed(&mut self, _window: &UnitWindow, _id: UnitId) {}
    fn viewport_data_changed(&mut self, _window: &UnitWindow, _ids: &[UnitId]) {}
    fn context_changed(&mut self, _window: &UnitWindow, _id: UnitId) {}
    fn empty_result(&mut self) {}
    fn fetch_error(&mut self, _kind: ErrorKind, _detail: &str) {}
}

/// Line-oriented output for the interactive binary.
pub struct TerminalView<W: Write> {
    out: W,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

fn summary(unit: &Unit) -> String {
    let source = unit.source_text().first().map(String::as_str).unwrap_or("");
    let target = unit.target_text().first().map(String::as_str).unwrap_or("");
    let fuzzy = if unit.is_fuzzy() { " (fuzzy)" } else { "" };
    format!("#{} {} → {}{}", unit.id(), source, target, fuzzy)
}

impl<W: Write> View for TerminalView<W> {
    fn position_changed(&mut self, window: &UnitWindow, id: UnitId) {
        let Some(unit) = window.unit(id) else {
            return;
        };
        let header = format!("[{}/{}] {}", window.position(), window.total(), summary(unit));
        self.line(&header);
        if let Some(file) = unit.file() {
            self.line(&format!("  file: {file}"));
        }
        let before = window.visible_range(Direction::Before).len();
        let after = window.visible_range(Direction::After).len();
        self.line(&format!("  {before} rows above, {after} rows below"));
    }

    fn viewport_data_changed(&mut self, _window: &UnitWindow, ids: &[UnitId]) {
        debug!("{} rows ready for display", ids.len());
    }

    fn context_changed(&mut self, window: &UnitWindow, id: UnitId) {
        let Some(context) = window.unit(id).and_then(Unit::context) else {
            return;
        };
        let lines: Vec<String> = context
            .before
            .iter()
            .map(|u| format!("  - {}", summary(u)))
            .chain(std::iter::once(format!("  > #{id}")))
            .chain(context.after.iter().map(|u| format!("  + {}", summary(u))))
            .collect();
        for line in lines {
            self.line(&line);
        }
    }

    fn empty_result(&mut self) {
        self.line("No units match the current filter.");
    }

    fn fetch_error(&mut self, kind: ErrorKind, detail: &str) {
        self.line(&format!("error ({kind:?}): {detail}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::WindowConfig;
    use crate::test_support::{full_payload, window_with};

    #[test]
    fn test_position_line() {
        let mut window = window_with(WindowConfig::default(), 1..=3);
        window.goto(UnitId(2)).unwrap();
        window.unit_loaded(UnitId(2), full_payload("deux"));

        let mut view = TerminalView::new(Vec::new());
        view.position_changed(&window, UnitId(2));
        let out = String::from_utf8(view.into_inner()).unwrap();
        assert!(out.starts_with("[2/3] #2  → deux"));
        assert!(out.contains("1 rows above, 1 rows below"));
    }

    #[test]
    fn test_empty_and_error_lines() {
        let mut view = TerminalView::new(Vec::new());
        view.empty_result();
        view.fetch_error(ErrorKind::Status(404), "not found");
        let out = String::from_utf8(view.into_inner()).unwrap();
        assert_eq!(
            out,
            "No units match the current filter.\nerror (Status(404)): not found\n"
        );
    }
}
