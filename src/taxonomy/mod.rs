//! UNSPSC taxonomy model
//!
//! The taxonomy is a four-level tree keyed by fixed-width zero-padded decimal
//! codes: Segment (2 digits), Family (4), Class (6), Commodity (8). A node's
//! code is a string-prefix of every descendant's code, so the full 8-digit
//! commodity code encodes its entire ancestry.

pub mod repository;

pub use repository::{InMemoryTaxonomy, TaxonomyRepository};

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four levels of the UNSPSC hierarchy, shallowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Segment,
    Family,
    Class,
    Commodity,
}

impl Level {
    /// Descent order.
    pub const ALL: [Level; 4] = [Level::Segment, Level::Family, Level::Class, Level::Commodity];

    /// Fixed code width in digits at this level.
    pub fn code_width(self) -> usize {
        match self {
            Level::Segment => 2,
            Level::Family => 4,
            Level::Class => 6,
            Level::Commodity => 8,
        }
    }

    /// How many candidates are offered to the oracle for one decision.
    ///
    /// The list is truncated in repository order with no re-ranking, so the
    /// true best match can be excluded for large fan-out parents. Known
    /// accuracy limitation, kept as-is.
    pub fn prompt_limit(self) -> usize {
        match self {
            Level::Segment => 20,
            Level::Family => 10,
            Level::Class => 12,
            Level::Commodity => 15,
        }
    }

    pub fn parent(self) -> Option<Level> {
        match self {
            Level::Segment => None,
            Level::Family => Some(Level::Segment),
            Level::Class => Some(Level::Family),
            Level::Commodity => Some(Level::Class),
        }
    }

    pub fn child(self) -> Option<Level> {
        match self {
            Level::Segment => Some(Level::Family),
            Level::Family => Some(Level::Class),
            Level::Class => Some(Level::Commodity),
            Level::Commodity => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Segment => "segment",
            Level::Family => "family",
            Level::Class => "class",
            Level::Commodity => "commodity",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One taxonomy entry: a coded node at a specific level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    /// Fixed-width zero-padded decimal code (2/4/6/8 digits per level).
    pub code: String,
    pub description: String,
    pub level: Level,
}

impl TaxonomyNode {
    pub fn new(level: Level, code: impl Into<String>, description: impl Into<String>) -> Self {
        let code = pad_code(&code.into(), level.code_width());
        Self {
            code,
            description: description.into(),
            level,
        }
    }
}

/// Left-zero-pad a code to the given width.
///
/// Codes arrive as strings and may have lost leading zeros on the way
/// through external systems; every comparison in the chain normalizes
/// through this first.
pub fn pad_code(code: &str, width: usize) -> String {
    format!("{:0>width$}", code.trim(), width = width)
}

/// Right-zero-pad a code from `level` width out to the full 8-digit form.
///
/// A class-level result becomes `XXXXXX00`, a family `XXXX0000`, a segment
/// `XX000000`. This is what guarantees every successful run yields a
/// well-formed 8-digit code regardless of achieved depth.
pub fn pad_to_commodity(code: &str, level: Level) -> String {
    let padded = pad_code(code, level.code_width());
    format!("{:0<8}", padded)
}

/// Code and description for one achieved hierarchy level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelEntry {
    pub code: String,
    pub description: String,
}

/// Ordered per-level breakdown of a classification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub segment: Option<LevelEntry>,
    pub family: Option<LevelEntry>,
    pub class: Option<LevelEntry>,
    pub commodity: Option<LevelEntry>,
}

impl Hierarchy {
    pub fn entry(&self, level: Level) -> Option<&LevelEntry> {
        match level {
            Level::Segment => self.segment.as_ref(),
            Level::Family => self.family.as_ref(),
            Level::Class => self.class.as_ref(),
            Level::Commodity => self.commodity.as_ref(),
        }
    }

    pub fn set(&mut self, level: Level, code: impl Into<String>, description: impl Into<String>) {
        let entry = LevelEntry {
            code: pad_code(&code.into(), level.code_width()),
            description: description.into(),
        };
        match level {
            Level::Segment => self.segment = Some(entry),
            Level::Family => self.family = Some(entry),
            Level::Class => self.class = Some(entry),
            Level::Commodity => self.commodity = Some(entry),
        }
    }

    /// Deepest level with an entry, if any.
    pub fn deepest(&self) -> Option<Level> {
        self.deepest_entry().map(|(level, _)| level)
    }

    /// Deepest level together with its entry, if any.
    pub fn deepest_entry(&self) -> Option<(Level, &LevelEntry)> {
        Level::ALL
            .iter()
            .rev()
            .find_map(|&level| self.entry(level).map(|entry| (level, entry)))
    }

    /// Levels achieved, shallowest first.
    pub fn levels_achieved(&self) -> Vec<Level> {
        Level::ALL
            .iter()
            .copied()
            .filter(|&level| self.entry(level).is_some())
            .collect()
    }

    /// Human-readable descent path, e.g. `"40 → 4015 → 401515 → 40151509"`.
    ///
    /// Presentational only; nothing in the chain consumes this.
    pub fn path_string(&self) -> String {
        let codes: Vec<&str> = Level::ALL
            .iter()
            .filter_map(|&level| self.entry(level))
            .map(|entry| entry.code.as_str())
            .collect();
        codes.join(" → ")
    }
}
