//! Classification chain orchestrator
//!
//! Drives the sequential descent Segment → Family → Class → Commodity, one
//! oracle decision per level, then lets reflection decide whether the
//! commodity pick stands. Descent never skips a level and never retries
//! beyond each classifier's own internal fallback: a level that ends
//! confused or empty halts the run at the last classified level.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::level::LevelClassifier;
use super::outcome::{ClassificationResult, LevelOutcome};
use super::reflect::{reflect, ReflectionVerdict};
use crate::oracle::LanguageOracle;
use crate::taxonomy::{pad_to_commodity, Level, TaxonomyRepository};

/// Descent progress, for tracing and for the failure distinction: `Failed`
/// is terminal and reachable only when the taxonomy root itself yields
/// nothing to classify into (or the root decision ends confused).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainState {
    Init,
    Segment,
    Family,
    Class,
    CommodityReflect,
    Finalized,
    Failed,
}

/// Orchestrates one full classification per [`classify`](Self::classify)
/// call. Stateless across calls; the only state the chain holds is the
/// per-level candidate caches inside its classifiers.
pub struct ClassificationChain {
    repository: Arc<dyn TaxonomyRepository>,
    segment: LevelClassifier,
    family: LevelClassifier,
    class: LevelClassifier,
    commodity: LevelClassifier,
}

impl ClassificationChain {
    pub fn new(repository: Arc<dyn TaxonomyRepository>, oracle: Arc<dyn LanguageOracle>) -> Self {
        let classifier = |level| {
            LevelClassifier::new(level, Arc::clone(&repository), Arc::clone(&oracle))
        };
        Self {
            segment: classifier(Level::Segment),
            family: classifier(Level::Family),
            class: classifier(Level::Class),
            commodity: classifier(Level::Commodity),
            repository,
        }
    }

    /// Classify a free-text item description into the deepest taxonomy
    /// level the evidence supports.
    ///
    /// Always returns a [`ClassificationResult`]; every failure mode is
    /// reported through `success`/`errors`, never as an `Err`. Whenever at
    /// least the segment level is achieved, `final_code` is exactly 8
    /// digits.
    pub async fn classify(&self, description: &str) -> ClassificationResult {
        let mut result = ClassificationResult::empty();
        let mut state = ChainState::Init;
        debug!(?state, "chain run created");

        let description = description.trim();
        if description.is_empty() {
            result.errors.push("empty item description".to_string());
            return result;
        }

        info!(item = %truncate(description, 80), "starting classification");

        // Segment: the root decision. This is the only level whose failure
        // leaves no result to fall back on.
        state = ChainState::Segment;
        debug!(?state, "descending");
        match self.segment.classify(description, None).await {
            LevelOutcome::Classified {
                node,
                confidence,
                reasoning,
                ..
            } => {
                result
                    .hierarchy
                    .set(Level::Segment, &node.code, &node.description);
                result.confidence = confidence;
                result.reasoning = reasoning;
            }
            LevelOutcome::Confused { reasoning } => {
                result
                    .errors
                    .push(format!("segment classification confused: {reasoning}"));
                self.finalize(&mut result, state);
                return result;
            }
            LevelOutcome::NoCandidates => {
                result
                    .errors
                    .push("no segments available: taxonomy root is empty".to_string());
                self.finalize(&mut result, state);
                return result;
            }
        }

        // Family, then class. Each needs the previous level's code; a halt
        // here keeps the result achieved so far.
        let mut parent_code = result.hierarchy.entry(Level::Segment).map(|e| e.code.clone());
        for classifier in [&self.family, &self.class] {
            let level = classifier.level();
            state = match level {
                Level::Family => ChainState::Family,
                _ => ChainState::Class,
            };
            debug!(?state, "descending");

            let parent = parent_code.as_deref().unwrap_or_default();
            match classifier.classify(description, Some(parent)).await {
                LevelOutcome::Classified { node, .. } => {
                    result.hierarchy.set(level, &node.code, &node.description);
                    parent_code = Some(node.code);
                }
                LevelOutcome::Confused { reasoning } => {
                    result
                        .errors
                        .push(format!("{level} classification confused: {reasoning}"));
                    self.finalize(&mut result, state);
                    return result;
                }
                LevelOutcome::NoCandidates => {
                    result
                        .errors
                        .push(format!("no {level} candidates under {parent}"));
                    self.finalize(&mut result, state);
                    return result;
                }
            }
        }

        // Commodity is always attempted once class succeeds; reflection
        // then decides commit vs retreat.
        state = ChainState::CommodityReflect;
        debug!(?state, "descending");
        let class_code = parent_code.as_deref().unwrap_or_default();
        let commodity_outcome = self.commodity.classify(description, Some(class_code)).await;

        match reflect(description, &commodity_outcome) {
            ReflectionVerdict::Commit {
                confidence,
                reasoning,
            } => {
                if let LevelOutcome::Classified { node, .. } = commodity_outcome {
                    info!(code = %node.code, "reflection committed commodity");
                    result
                        .hierarchy
                        .set(Level::Commodity, &node.code, &node.description);
                    result.confidence = confidence;
                    result.reasoning = reasoning;
                    self.backfill_hierarchy(&mut result, &node.code).await;
                }
            }
            ReflectionVerdict::Retreat {
                confidence,
                reasoning,
            } => {
                info!(class = class_code, %reasoning, "reflection retreated to class");
                result.confidence = confidence;
                result.reasoning = reasoning;
            }
        }

        self.finalize(&mut result, state);
        result
    }

    /// Refresh every achieved level from the committed commodity's
    /// ancestry. The commodity code encodes the full path, so this corrects
    /// any description drift between levels. Failure is non-fatal.
    async fn backfill_hierarchy(&self, result: &mut ClassificationResult, commodity_code: &str) {
        match self.repository.ancestors_of(commodity_code).await {
            Ok(ancestry) => {
                for level in Level::ALL {
                    if let Some(entry) = ancestry.entry(level) {
                        result.hierarchy.set(level, &entry.code, &entry.description);
                    }
                }
            }
            Err(e) => {
                warn!(code = commodity_code, "hierarchy backfill failed: {e}");
            }
        }
    }

    /// Freeze the result: deepest achieved level, 8-digit final code, and
    /// the depth warnings the descent contract implies.
    fn finalize(&self, result: &mut ClassificationResult, state: ChainState) {
        let deepest = result
            .hierarchy
            .deepest_entry()
            .map(|(level, entry)| (level, entry.clone()));

        match deepest {
            Some((level, entry)) => {
                result.achieved_level = Some(level);
                result.final_code = Some(pad_to_commodity(&entry.code, level));
                result.final_description = Some(entry.description);
                result.success = true;
                debug!(from = ?state, to = ?ChainState::Finalized, "descent complete");

                // Reflection guarantees class depth on the happy path, so a
                // shallower stop is worth flagging to the caller.
                if level < Level::Class {
                    result
                        .errors
                        .push(format!("classification stopped at {level} level"));
                }

                info!(
                    final_code = result.final_code.as_deref().unwrap_or_default(),
                    achieved = %level,
                    confidence = %result.confidence,
                    path = %result.hierarchy.path_string(),
                    "classification finalized"
                );
            }
            None => {
                result.success = false;
                if result.errors.is_empty() {
                    result.errors.push("no classification level achieved".to_string());
                }
                warn!(from = ?state, to = ?ChainState::Failed, "classification failed with no hierarchy");
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
