use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a translation unit, unique within one result set.
///
/// The server encodes ids as JSON numbers in lists and as strings when they
/// are object keys; `transparent` lets serde_json accept both.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UnitId {
    fn from(id: u64) -> Self {
        UnitId(id)
    }
}

/// Search/filter parameters sent with the id-sequence request.
/// Only `path` is required; everything else is omitted when unset.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FilterParams {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Comma-separated search fields (e.g. "source,target").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sfields: Option<String>,
    /// Unit the server should centre its sub-window on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<UnitId>,
}

impl FilterParams {
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Id sequence
// ============================================================================

/// The `uids` member is grouped by file (first id of each group is a header
/// row); older servers send a flat list.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum UidList {
    Grouped(Vec<Vec<UnitId>>),
    Flat(Vec<UnitId>),
}

/// Raw `/xhr/uids/` response body.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct IdSequenceResponse {
    #[serde(default)]
    pub begin: usize,
    #[serde(default)]
    pub end: usize,
    #[serde(default)]
    pub total: usize,
    pub uids: UidList,
}

/// Ordered ids matching the current filter plus the slice's placement in the
/// full server-side result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdSequence {
    pub ids: Vec<UnitId>,
    pub headers: HashSet<UnitId>,
    pub begin: usize,
    pub end: usize,
    pub total: usize,
}

impl IdSequence {
    /// A header-less sequence covering the whole result.
    pub fn flat(ids: Vec<UnitId>) -> Self {
        let total = ids.len();
        Self {
            ids,
            headers: HashSet::new(),
            begin: 0,
            end: total,
            total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<IdSequenceResponse> for IdSequence {
    fn from(response: IdSequenceResponse) -> Self {
        let mut ids = Vec::new();
        let mut headers = HashSet::new();
        match response.uids {
            UidList::Flat(flat) => ids = flat,
            UidList::Grouped(groups) => {
                for group in groups {
                    if let Some(first) = group.first() {
                        headers.insert(*first);
                    }
                    ids.extend(group);
                }
            }
        }
        // A single unit never gets a header row
        if response.total <= 1 {
            headers.clear();
        }
        Self {
            ids,
            headers,
            begin: response.begin,
            end: response.end,
            total: response.total,
        }
    }
}

// ============================================================================
// Unit payloads
// ============================================================================

/// Lightweight unit data as returned by the listing (`/xhr/units/`) and
/// context endpoints. Header rows also carry language/project/file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UnitRow {
    #[serde(default)]
    pub source: Vec<String>,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub target: Vec<String>,
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default, rename = "isfuzzy")]
    pub is_fuzzy: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
}

/// Listing response: rows keyed by unit id.
pub type UnitRows = HashMap<UnitId, UnitRow>;

/// Full editor payload from `/xhr/units/<id>/edit/`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UnitPayload {
    /// Pre-rendered editor markup.
    pub editor: String,
    #[serde(default)]
    pub tm_suggestions: Vec<serde_json::Value>,
    #[serde(default)]
    pub is_obsolete: bool,
    /// Source strings keyed by language code (alternative sources included).
    #[serde(default)]
    pub sources: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub target: Vec<String>,
    #[serde(default, rename = "isfuzzy")]
    pub is_fuzzy: bool,
}

/// A context row is a listing row plus its id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContextRow {
    pub id: UnitId,
    #[serde(flatten)]
    pub row: UnitRow,
}

/// Neighbouring units of one unit within its file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ContextPayload {
    #[serde(default)]
    pub before: Vec<ContextRow>,
    #[serde(default)]
    pub after: Vec<ContextRow>,
}

/// Number of neighbours requested on each side of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRadius {
    pub before: usize,
    pub after: usize,
}

impl ContextRadius {
    pub fn symmetric(n: usize) -> Self {
        Self { before: n, after: n }
    }
}
