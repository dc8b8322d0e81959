//! # Unit
//!
//! One translation unit with two-stage loading: a *stub* built from a
//! listing row, and a *fully loaded* unit once the editor payload arrives.
//! Hydration only ever adds data; a loaded unit is never downgraded back to
//! a stub.

use std::collections::BTreeMap;

use crate::api::{ContextPayload, UnitId, UnitPayload, UnitRow};

/// Neighbouring units, cached once per unit for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRows {
    pub before: Vec<Unit>,
    pub after: Vec<Unit>,
}

impl From<ContextPayload> for ContextRows {
    fn from(payload: ContextPayload) -> Self {
        let wrap = |rows: Vec<crate::api::ContextRow>| -> Vec<Unit> {
            rows.into_iter()
                .map(|ctx| Unit::stub(ctx.id, ctx.row))
                .collect()
        };
        Self {
            before: wrap(payload.before),
            after: wrap(payload.after),
        }
    }
}

/// Editor-only data present once the unit is fully loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorData {
    pub markup: String,
    pub sources: BTreeMap<String, Vec<String>>,
    pub tm_suggestions: Vec<serde_json::Value>,
    pub is_obsolete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    id: UnitId,
    source: Vec<String>,
    target: Vec<String>,
    source_lang: Option<String>,
    target_lang: Option<String>,
    is_fuzzy: bool,
    language: Option<String>,
    project: Option<String>,
    file: Option<String>,
    editor: Option<EditorData>,
    context: Option<ContextRows>,
    /// Whether a listing row has been seen for this unit.
    listed: bool,
}

impl Unit {
    /// Creates a not-yet-loaded unit from whatever the listing told us.
    pub fn stub(id: UnitId, row: UnitRow) -> Self {
        Self {
            id,
            source: row.source,
            target: row.target,
            source_lang: row.source_lang,
            target_lang: row.target_lang,
            is_fuzzy: row.is_fuzzy,
            language: row.language,
            project: row.project,
            file: row.file,
            editor: None,
            context: None,
            listed: true,
        }
    }

    /// A unit fetched directly before any listing row mentioned it.
    pub fn unlisted(id: UnitId) -> Self {
        Self {
            listed: false,
            ..Unit::stub(id, UnitRow::default())
        }
    }

    /// Applies a listing row and returns whether anything changed.
    ///
    /// A stub takes the row wholesale. A fully loaded unit keeps its editor
    /// data and only picks up the listing-only fields (languages, header
    /// metadata) the first time a row arrives for it.
    pub fn apply_row(&mut self, row: UnitRow) -> bool {
        if !self.is_fully_loaded() {
            let context = self.context.take();
            *self = Unit::stub(self.id, row);
            self.context = context;
            return true;
        }
        if self.listed {
            return false;
        }

        self.listed = true;
        self.source_lang = row.source_lang.or(self.source_lang.take());
        self.target_lang = row.target_lang.or(self.target_lang.take());
        self.language = row.language.or(self.language.take());
        self.project = row.project.or(self.project.take());
        self.file = row.file.or(self.file.take());
        match self.editor_source() {
            Some(source) => self.source = source,
            None if self.source.is_empty() => self.source = row.source,
            None => {}
        }
        true
    }

    /// Marks the unit fully loaded. Calling it again replaces the fields.
    ///
    /// The source text is taken from `sources` by `source_lang` only; without
    /// a known language it stays as is until a listing row names one.
    pub fn hydrate(&mut self, payload: UnitPayload) {
        let source = self
            .source_lang
            .as_ref()
            .and_then(|lang| payload.sources.get(lang))
            .cloned();
        if let Some(source) = source {
            self.source = source;
        }
        self.target = payload.target;
        self.is_fuzzy = payload.is_fuzzy;
        self.editor = Some(EditorData {
            markup: payload.editor,
            sources: payload.sources,
            tm_suggestions: payload.tm_suggestions,
            is_obsolete: payload.is_obsolete,
        });
    }

    fn editor_source(&self) -> Option<Vec<String>> {
        let lang = self.source_lang.as_ref()?;
        self.editor.as_ref()?.sources.get(lang).cloned()
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.editor.is_some()
    }

    pub fn is_listed(&self) -> bool {
        self.listed
    }

    /// Caches context rows. Returns `false` (and keeps the old rows) if
    /// context was already attached.
    pub fn attach_context(&mut self, context: ContextRows) -> bool {
        if self.context.is_some() {
            return false;
        }
        self.context = Some(context);
        true
    }

    pub fn context(&self) -> Option<&ContextRows> {
        self.context.as_ref()
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Source plural forms; empty until something is known.
    pub fn source_text(&self) -> &[String] {
        &self.source
    }

    pub fn target_text(&self) -> &[String] {
        &self.target
    }

    pub fn source_lang(&self) -> Option<&str> {
        self.source_lang.as_deref()
    }

    pub fn target_lang(&self) -> Option<&str> {
        self.target_lang.as_deref()
    }

    pub fn is_fuzzy(&self) -> bool {
        self.is_fuzzy
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn editor(&self) -> Option<&EditorData> {
        self.editor.as_ref()
    }
}
