//! Generic per-level classifier
//!
//! One implementation drives all four taxonomy levels; the [`Level`] value
//! supplies the code width, the candidate truncation bound, and the prompt
//! wording. The flow per call: fetch candidates (cached per parent code),
//! ask the oracle to pick exactly one, defensively parse, validate against
//! the candidate set, and fall back to deterministic keyword matching when
//! the answer is unusable.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::outcome::{Confidence, LevelOutcome};
use super::payload::{extract_payload, OracleAnswer, ParsedPick};
use super::text::keyword_score;
use crate::oracle::LanguageOracle;
use crate::taxonomy::{pad_code, Level, TaxonomyNode, TaxonomyRepository};

/// Classifies an item description into one child of `parent_code`.
pub struct LevelClassifier {
    level: Level,
    repository: Arc<dyn TaxonomyRepository>,
    oracle: Arc<dyn LanguageOracle>,
    // Candidate cache, keyed by padded parent code ("" for the root fetch).
    // Read-mostly: one write per distinct parent over the classifier's life.
    cache: RwLock<HashMap<String, Arc<Vec<TaxonomyNode>>>>,
}

impl LevelClassifier {
    pub fn new(
        level: Level,
        repository: Arc<dyn TaxonomyRepository>,
        oracle: Arc<dyn LanguageOracle>,
    ) -> Self {
        Self {
            level,
            repository,
            oracle,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Classify `description` into one child of `parent_code`.
    ///
    /// `parent_code` is required for every level except [`Level::Segment`].
    /// Always returns a usable outcome: whenever the candidate set is
    /// non-empty, an unusable oracle answer degrades to the deterministic
    /// fallback rather than an error.
    pub async fn classify(&self, description: &str, parent_code: Option<&str>) -> LevelOutcome {
        let candidates = self.candidates(parent_code).await;
        if candidates.is_empty() {
            debug!(level = %self.level, parent = parent_code.unwrap_or("<root>"),
                "no candidates to classify into");
            return LevelOutcome::NoCandidates;
        }

        let prompt = self.build_prompt(description, parent_code, &candidates);

        let response = match self.oracle.ask(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(level = %self.level, "oracle call failed: {e}");
                return self.fallback(description, &candidates, "oracle call failed");
            }
        };

        match extract_payload(&response) {
            OracleAnswer::Pick(pick) => match self.validate(pick, parent_code, &candidates) {
                Ok(outcome) => outcome,
                Err(reason) => {
                    warn!(level = %self.level, "rejected oracle pick: {reason}");
                    self.fallback(description, &candidates, &reason)
                }
            },
            OracleAnswer::Confused { reasoning } => {
                // The ambiguity judgment came from the oracle itself, so the
                // keyword fallback does not apply here.
                debug!(level = %self.level, "oracle confused: {reasoning}");
                LevelOutcome::Confused {
                    reasoning: if reasoning.is_empty() {
                        "multiple candidates seem equally valid".to_string()
                    } else {
                        reasoning
                    },
                }
            }
            OracleAnswer::Malformed(reason) => {
                warn!(level = %self.level, "unparseable oracle response: {reason}");
                self.fallback(description, &candidates, &reason)
            }
        }
    }

    /// Fetch candidates for `parent_code`, caching per parent for the
    /// classifier's lifetime. Repository failures degrade to an empty set
    /// (and are cached as such) so one bad lookup cannot abort the run.
    async fn candidates(&self, parent_code: Option<&str>) -> Arc<Vec<TaxonomyNode>> {
        let key = match (self.level.parent(), parent_code) {
            (Some(parent_level), Some(code)) => pad_code(code, parent_level.code_width()),
            _ => String::new(),
        };

        if let Some(cached) = self.cache.read().expect("cache lock poisoned").get(&key) {
            return Arc::clone(cached);
        }

        let fetched = match self.repository.children_of(self.level, parent_code).await {
            Ok(children) => {
                debug!(level = %self.level, parent = %key, count = children.len(),
                    "loaded candidates");
                children
            }
            Err(e) => {
                warn!(level = %self.level, parent = %key, "candidate lookup failed: {e}");
                Vec::new()
            }
        };

        let entry = Arc::new(fetched);
        self.cache
            .write()
            .expect("cache lock poisoned")
            .insert(key, Arc::clone(&entry));
        entry
    }

    /// Compose the single-pick request. The candidate list is truncated to
    /// the level's prompt limit in repository order; validation still runs
    /// against the full fetched set.
    fn build_prompt(
        &self,
        description: &str,
        parent_code: Option<&str>,
        candidates: &[TaxonomyNode],
    ) -> String {
        let scope = match (self.level.parent(), parent_code) {
            (Some(parent_level), Some(code)) => {
                format!(" in {} {}", parent_level, pad_code(code, parent_level.code_width()))
            }
            _ => String::new(),
        };

        let candidate_lines = candidates
            .iter()
            .take(self.level.prompt_limit())
            .map(|node| format!("{}: {}", node.code, node.description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"Classify this item into ONE UNSPSC {level} ({width}-digit code){scope}.

ITEM: {description}

AVAILABLE {level_upper} OPTIONS:
{candidate_lines}

Return JSON:
{{
    "code": "<{width}-digit code from the options>",
    "description": "<that option's description>",
    "confidence": "High|Medium|Low",
    "reasoning": "<one short sentence>"
}}

If several options seem equally valid, return "confidence": "CONFUSED" instead of guessing."#,
            level = self.level,
            width = self.level.code_width(),
            scope = scope,
            level_upper = self.level.as_str().to_uppercase(),
            candidate_lines = candidate_lines,
        )
    }

    /// Validate a parsed pick: digits only, exact width after zero-padding,
    /// containment under the parent code, and verbatim membership in the
    /// fetched candidate set (defense against hallucinated codes). The
    /// returned node carries the repository's description, not the oracle's.
    fn validate(
        &self,
        pick: ParsedPick,
        parent_code: Option<&str>,
        candidates: &[TaxonomyNode],
    ) -> Result<LevelOutcome, String> {
        let width = self.level.code_width();

        if pick.code.is_empty() || !pick.code.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("code '{}' is not numeric", pick.code));
        }

        let code = pad_code(&pick.code, width);
        if code.len() != width {
            return Err(format!(
                "code '{}' does not fit {} width {}",
                pick.code, self.level, width
            ));
        }

        if let (Some(parent_level), Some(parent)) = (self.level.parent(), parent_code) {
            let parent = pad_code(parent, parent_level.code_width());
            if !code.starts_with(&parent) {
                return Err(format!(
                    "code {} does not belong to {} {}",
                    code, parent_level, parent
                ));
            }
        }

        let node = candidates
            .iter()
            .find(|candidate| candidate.code == code)
            .ok_or_else(|| format!("code {} is not in the candidate set", code))?;

        Ok(LevelOutcome::Classified {
            node: node.clone(),
            confidence: Confidence::parse(&pick.confidence),
            reasoning: pick.reasoning,
            via_fallback: false,
        })
    }

    /// Deterministic fallback: keyword-overlap score per candidate, max
    /// wins (ties by repository order) at Low confidence; if nothing scores,
    /// the first candidate at Very Low. Guarantees a usable code whenever
    /// the candidate set is non-empty.
    fn fallback(
        &self,
        description: &str,
        candidates: &[TaxonomyNode],
        cause: &str,
    ) -> LevelOutcome {
        let mut best: Option<(usize, &TaxonomyNode)> = None;
        for candidate in candidates {
            let score = keyword_score(description, &candidate.description);
            if score > 0 && best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, candidate));
            }
        }

        if let Some((score, node)) = best {
            debug!(level = %self.level, code = %node.code, score, "fallback keyword match");
            return LevelOutcome::Classified {
                node: node.clone(),
                confidence: Confidence::Low,
                reasoning: format!("fallback keyword match after {cause}"),
                via_fallback: true,
            };
        }

        // Nothing overlapped at all; first candidate in repository order.
        let node = &candidates[0];
        debug!(level = %self.level, code = %node.code, "desperate fallback");
        LevelOutcome::Classified {
            node: node.clone(),
            confidence: Confidence::VeryLow,
            reasoning: format!("desperate fallback, first available {} after {cause}", self.level),
            via_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaxonomyError;
    use crate::taxonomy::{Hierarchy, InMemoryTaxonomy};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Oracle that always returns the same canned response.
    struct CannedOracle(String);

    #[async_trait]
    impl LanguageOracle for CannedOracle {
        async fn ask(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.clone())
        }
    }

    /// Repository wrapper that counts children_of calls.
    struct CountingRepository {
        inner: InMemoryTaxonomy,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TaxonomyRepository for CountingRepository {
        async fn children_of(
            &self,
            level: Level,
            parent_code: Option<&str>,
        ) -> Result<Vec<TaxonomyNode>, TaxonomyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.children_of(level, parent_code).await
        }

        async fn ancestors_of(&self, commodity_code: &str) -> Result<Hierarchy, TaxonomyError> {
            self.inner.ancestors_of(commodity_code).await
        }
    }

    fn pump_families() -> InMemoryTaxonomy {
        InMemoryTaxonomy::from_nodes([
            TaxonomyNode::new(Level::Family, "4014", "Fluid and gas distribution"),
            TaxonomyNode::new(Level::Family, "4015", "Industrial pumps and compressors"),
            TaxonomyNode::new(Level::Family, "4016", "Industrial filtering and purification"),
        ])
    }

    fn classifier(taxonomy: InMemoryTaxonomy, response: &str) -> LevelClassifier {
        LevelClassifier::new(
            Level::Family,
            Arc::new(taxonomy),
            Arc::new(CannedOracle(response.to_string())),
        )
    }

    #[tokio::test]
    async fn valid_pick_uses_repository_description() {
        let classifier = classifier(
            pump_families(),
            r#"{"code": "4015", "description": "pumps (oracle wording)", "confidence": "High", "reasoning": "pump keywords"}"#,
        );

        let outcome = classifier.classify("hydraulic gear pump", Some("40")).await;
        match outcome {
            LevelOutcome::Classified {
                node,
                confidence,
                via_fallback,
                ..
            } => {
                assert_eq!(node.code, "4015");
                assert_eq!(node.description, "Industrial pumps and compressors");
                assert_eq!(confidence, Confidence::High);
                assert!(!via_fallback);
            }
            other => panic!("expected classified, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hallucinated_code_falls_back_to_keyword_match() {
        let classifier = classifier(
            pump_families(),
            r#"{"code": "4099", "description": "Made up family", "confidence": "High"}"#,
        );

        let outcome = classifier
            .classify("industrial pumps for a refinery", Some("40"))
            .await;
        match outcome {
            LevelOutcome::Classified {
                node,
                confidence,
                via_fallback,
                ..
            } => {
                assert_eq!(node.code, "4015");
                assert_eq!(confidence, Confidence::Low);
                assert!(via_fallback);
            }
            other => panic!("expected fallback pick, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn containment_violation_falls_back() {
        // 2315 is numeric and 4 digits wide, but not under segment 40.
        let classifier = classifier(
            pump_families(),
            r#"{"code": "2315", "confidence": "High"}"#,
        );

        let outcome = classifier.classify("industrial pumps", Some("40")).await;
        assert!(matches!(
            outcome,
            LevelOutcome::Classified { via_fallback: true, .. }
        ));
    }

    #[tokio::test]
    async fn garbage_response_still_yields_a_code() {
        let classifier = classifier(pump_families(), "no json here, sorry");

        let outcome = classifier.classify("something unrelated", Some("40")).await;
        match outcome {
            LevelOutcome::Classified {
                node,
                confidence,
                via_fallback,
                ..
            } => {
                // Zero keyword overlap: desperate fallback takes the first
                // candidate in repository order.
                assert_eq!(node.code, "4014");
                assert_eq!(confidence, Confidence::VeryLow);
                assert!(via_fallback);
            }
            other => panic!("expected fallback pick, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn confused_is_passed_through_without_fallback() {
        let classifier = classifier(
            pump_families(),
            r#"{"confidence": "CONFUSED", "reasoning": "pumps and compressors both fit"}"#,
        );

        let outcome = classifier.classify("industrial pump", Some("40")).await;
        assert_eq!(
            outcome,
            LevelOutcome::Confused {
                reasoning: "pumps and compressors both fit".to_string()
            }
        );
    }

    #[tokio::test]
    async fn empty_candidate_set_is_a_normal_signal() {
        let classifier = classifier(pump_families(), r#"{"code": "9915", "confidence": "High"}"#);

        let outcome = classifier.classify("anything", Some("99")).await;
        assert_eq!(outcome, LevelOutcome::NoCandidates);
    }

    #[tokio::test]
    async fn candidates_are_cached_per_parent_code() {
        let repository = Arc::new(CountingRepository {
            inner: pump_families(),
            calls: AtomicUsize::new(0),
        });
        let classifier = LevelClassifier::new(
            Level::Family,
            Arc::clone(&repository) as Arc<dyn TaxonomyRepository>,
            Arc::new(CannedOracle(
                r#"{"code": "4015", "confidence": "High"}"#.to_string(),
            )),
        );

        classifier.classify("pump", Some("40")).await;
        classifier.classify("pump", Some("40")).await;
        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);

        classifier.classify("pump", Some("23")).await;
        assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn prompt_truncates_candidates_but_validates_against_full_set() {
        // 12 families; the family prompt carries only the first 10, but a
        // pick outside the prompted window is still valid if the repository
        // returned it.
        let mut taxonomy = InMemoryTaxonomy::new();
        for i in 1..=12 {
            taxonomy.insert(TaxonomyNode::new(
                Level::Family,
                format!("40{:02}", i),
                format!("Family number {i}"),
            ));
        }
        let classifier = classifier(taxonomy, r#"{"code": "4012", "confidence": "High"}"#);

        let outcome = classifier.classify("anything", Some("40")).await;
        assert!(matches!(
            outcome,
            LevelOutcome::Classified { node, via_fallback: false, .. } if node.code == "4012"
        ));
    }
}
