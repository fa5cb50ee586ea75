//! Commodity reflection
//!
//! After class succeeds, a commodity attempt is always made; this module
//! decides whether to commit that 8-digit pick or retreat to the 6-digit
//! class code. The policy is asymmetric on purpose: an incorrect deep code
//! is more harmful downstream than a correct-but-shallow one.

use tracing::debug;

use super::outcome::{Confidence, LevelOutcome};
use super::text::meaningful_overlap;

/// Commodity descriptions containing one of these are catch-all buckets;
/// a medium-confidence pick of one is not worth trusting over the class.
const GENERIC_TERMS: [&str; 5] = ["other", "miscellaneous", "general", "various", "unspecified"];

/// Whether to keep the commodity pick or stay at the class level.
#[derive(Debug, Clone, PartialEq)]
pub enum ReflectionVerdict {
    Commit {
        confidence: Confidence,
        reasoning: String,
    },
    Retreat {
        confidence: Confidence,
        reasoning: String,
    },
}

impl ReflectionVerdict {
    pub fn committed(&self) -> bool {
        matches!(self, ReflectionVerdict::Commit { .. })
    }
}

/// Decide between the commodity pick and the class level.
///
/// Policy, evaluated in order:
/// 1. No classified commodity (failed, confused, or no candidates): retreat.
/// 2. High confidence: commit unconditionally.
/// 3. Medium confidence: commit unless the description is a generic
///    catch-all; generic retreats.
/// 4. Low / Very Low confidence: commit only on a meaningful keyword
///    overlap of 2 or more between item and commodity descriptions,
///    upgraded to Medium; otherwise retreat.
pub fn reflect(description: &str, commodity: &LevelOutcome) -> ReflectionVerdict {
    match commodity {
        LevelOutcome::Classified {
            node,
            confidence,
            reasoning,
            ..
        } => match confidence {
            Confidence::High => {
                debug!("high confidence commodity match, committing");
                ReflectionVerdict::Commit {
                    confidence: Confidence::High,
                    reasoning: if reasoning.is_empty() {
                        "high confidence commodity match".to_string()
                    } else {
                        reasoning.clone()
                    },
                }
            }
            Confidence::Medium => {
                let lower = node.description.to_lowercase();
                let generic = GENERIC_TERMS.iter().any(|term| lower.contains(term));
                if generic {
                    debug!(code = %node.code, "generic commodity description, retreating to class");
                    ReflectionVerdict::Retreat {
                        confidence: Confidence::Medium,
                        reasoning: "commodity too generic, class level more appropriate"
                            .to_string(),
                    }
                } else {
                    ReflectionVerdict::Commit {
                        confidence: Confidence::Medium,
                        reasoning: "medium confidence but specific commodity".to_string(),
                    }
                }
            }
            Confidence::Low | Confidence::VeryLow => {
                let overlap = meaningful_overlap(description, &node.description);
                if overlap.len() >= 2 {
                    debug!(code = %node.code, ?overlap, "keyword overlap rescues low confidence");
                    ReflectionVerdict::Commit {
                        confidence: Confidence::Medium,
                        reasoning: format!("strong keyword overlap: {}", overlap.join(", ")),
                    }
                } else {
                    ReflectionVerdict::Retreat {
                        confidence: Confidence::Medium,
                        reasoning: "commodity confidence too low, class level safer".to_string(),
                    }
                }
            }
            // A classified outcome never carries these, but retreat is the
            // safe answer if one ever does.
            Confidence::Confused | Confidence::None => ReflectionVerdict::Retreat {
                confidence: Confidence::Medium,
                reasoning: "commodity confidence unusable, class level safer".to_string(),
            },
        },
        LevelOutcome::Confused { reasoning } => ReflectionVerdict::Retreat {
            confidence: Confidence::Medium,
            reasoning: format!("commodity classification confused: {reasoning}"),
        },
        LevelOutcome::NoCandidates => ReflectionVerdict::Retreat {
            confidence: Confidence::Medium,
            reasoning: "no commodities available under this class".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{Level, TaxonomyNode};

    fn commodity(description: &str, confidence: Confidence) -> LevelOutcome {
        LevelOutcome::Classified {
            node: TaxonomyNode::new(Level::Commodity, "40151509", description),
            confidence,
            reasoning: String::new(),
            via_fallback: false,
        }
    }

    #[test]
    fn high_confidence_commits_unconditionally() {
        // Even a generic description commits at High.
        let verdict = reflect("hydraulic pump", &commodity("Other pumps", Confidence::High));
        assert!(verdict.committed());
    }

    #[test]
    fn medium_specific_commits() {
        let verdict = reflect(
            "hydraulic pump",
            &commodity("Rotary pumps", Confidence::Medium),
        );
        assert!(verdict.committed());
    }

    #[test]
    fn medium_generic_retreats() {
        for description in [
            "Other hydraulic equipment",
            "Miscellaneous pumps",
            "General-purpose fittings",
            "Various spare parts",
            "Unspecified components",
        ] {
            let verdict = reflect("hydraulic pump", &commodity(description, Confidence::Medium));
            assert!(!verdict.committed(), "expected retreat for {description:?}");
        }
    }

    #[test]
    fn low_with_strong_overlap_upgrades_to_medium() {
        let verdict = reflect(
            "hydraulic gear pump, 3000 PSI",
            &commodity("hydraulic gear pumps", Confidence::Low),
        );
        match verdict {
            ReflectionVerdict::Commit {
                confidence,
                reasoning,
            } => {
                assert_eq!(confidence, Confidence::Medium);
                assert!(reasoning.contains("gear"));
                assert!(reasoning.contains("hydraulic"));
            }
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn low_with_weak_overlap_retreats() {
        let verdict = reflect(
            "hydraulic gear pump, 3000 PSI",
            &commodity("other hydraulic equipment", Confidence::Low),
        );
        assert!(!verdict.committed());
    }

    #[test]
    fn failed_or_confused_commodity_retreats() {
        assert!(!reflect("pump", &LevelOutcome::NoCandidates).committed());
        assert!(!reflect(
            "pump",
            &LevelOutcome::Confused {
                reasoning: "two tied".to_string()
            }
        )
        .committed());
    }
}
