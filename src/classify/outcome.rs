//! Classification outcome types
//!
//! One [`LevelOutcome`] per level decision, one [`ClassificationResult`] per
//! whole run. The oracle's "CONFUSED" sentinel is modeled as an explicit
//! variant rather than string inspection downstream.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::taxonomy::{Hierarchy, Level, TaxonomyNode};

/// Confidence attached to a level decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
    /// Desperate fallback: no keyword matched any candidate.
    VeryLow,
    /// Oracle-declared ambiguity. A judgment, not a failure.
    Confused,
    /// Nothing to classify into.
    None,
}

impl Confidence {
    /// Parse an oracle-supplied confidence label.
    ///
    /// The "CONFUSED" sentinel must match exactly (case-insensitive); the
    /// other labels match on containment so decorated forms like
    /// "High - strong match" still parse. An unrecognized label defaults to
    /// Medium, the same lenient reading the oracle prompt asks for.
    pub fn parse(label: &str) -> Confidence {
        let label = label.trim();
        if label.eq_ignore_ascii_case("confused") {
            return Confidence::Confused;
        }
        let lower = label.to_lowercase();
        if lower.contains("very low") {
            Confidence::VeryLow
        } else if lower.contains("high") {
            Confidence::High
        } else if lower.contains("medium") {
            Confidence::Medium
        } else if lower.contains("low") {
            Confidence::Low
        } else {
            Confidence::Medium
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
            Confidence::VeryLow => "Very Low",
            Confidence::Confused => "CONFUSED",
            Confidence::None => "None",
        };
        f.write_str(label)
    }
}

/// Outcome of a single level's classification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LevelOutcome {
    /// A validated pick from the candidate set.
    Classified {
        node: TaxonomyNode,
        confidence: Confidence,
        reasoning: String,
        /// True when the deterministic fallback produced the pick instead
        /// of the oracle.
        via_fallback: bool,
    },
    /// The oracle declared several candidates equally plausible. Descent
    /// stops here and the parent level's result stands; the keyword
    /// fallback is never applied to a confused answer.
    Confused { reasoning: String },
    /// Empty candidate set: a normal "stop descending here" signal.
    NoCandidates,
}

impl LevelOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, LevelOutcome::Classified { .. })
    }

    pub fn confidence(&self) -> Confidence {
        match self {
            LevelOutcome::Classified { confidence, .. } => *confidence,
            LevelOutcome::Confused { .. } => Confidence::Confused,
            LevelOutcome::NoCandidates => Confidence::None,
        }
    }
}

/// Complete result of one classification run.
///
/// Built fresh per `classify()` call, mutated level-by-level by the chain,
/// finalized once. Whenever at least the segment level succeeds,
/// `final_code` is exactly 8 digits, right-zero-padded past the deepest
/// achieved level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub success: bool,
    pub hierarchy: Hierarchy,
    pub achieved_level: Option<Level>,
    pub final_code: Option<String>,
    pub final_description: Option<String>,
    pub confidence: Confidence,
    pub reasoning: String,
    pub errors: Vec<String>,
}

impl ClassificationResult {
    pub(crate) fn empty() -> Self {
        Self {
            success: false,
            hierarchy: Hierarchy::default(),
            achieved_level: None,
            final_code: None,
            final_description: None,
            confidence: Confidence::None,
            reasoning: String::new(),
            errors: Vec::new(),
        }
    }

    /// Human-readable descent path, e.g. `"40 → 4015 → 401515"`.
    pub fn path_string(&self) -> String {
        self.hierarchy.path_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_parsing_matches_oracle_labels() {
        assert_eq!(Confidence::parse("High"), Confidence::High);
        assert_eq!(Confidence::parse("medium"), Confidence::Medium);
        assert_eq!(Confidence::parse("LOW"), Confidence::Low);
        assert_eq!(Confidence::parse("Very Low"), Confidence::VeryLow);
        assert_eq!(Confidence::parse("CONFUSED"), Confidence::Confused);
        assert_eq!(Confidence::parse("confused"), Confidence::Confused);
    }

    #[test]
    fn decorated_labels_still_parse() {
        assert_eq!(Confidence::parse("High - exact match"), Confidence::High);
        assert_eq!(Confidence::parse("medium (corrected)"), Confidence::Medium);
    }

    #[test]
    fn unknown_label_defaults_to_medium() {
        assert_eq!(Confidence::parse(""), Confidence::Medium);
        assert_eq!(Confidence::parse("certain"), Confidence::Medium);
    }

    #[test]
    fn confused_must_match_exactly_not_by_containment() {
        // "not confused at all" contains no recognized label either way;
        // it must not be read as the sentinel.
        assert_ne!(
            Confidence::parse("not confused at all"),
            Confidence::Confused
        );
    }

    #[test]
    fn outcome_accessors() {
        let outcome = LevelOutcome::Confused {
            reasoning: "two candidates tied".to_string(),
        };
        assert!(!outcome.succeeded());
        assert_eq!(outcome.confidence(), Confidence::Confused);
        assert_eq!(LevelOutcome::NoCandidates.confidence(), Confidence::None);
    }
}
