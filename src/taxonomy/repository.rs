//! Taxonomy repository trait and the in-memory reference implementation

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use super::{pad_code, Hierarchy, Level, TaxonomyNode};
use crate::error::TaxonomyError;

/// Read access to the taxonomy tree.
///
/// `children_of` must preserve the backing store's ordering: the chain
/// truncates candidate lists and breaks fallback ties by position, so
/// ordering is part of the contract, not a cosmetic detail.
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    /// Children of `parent_code` at the given level.
    ///
    /// `parent_code` is `None` only for [`Level::Segment`] (the root).
    /// An empty result is a normal "nothing to classify into" signal,
    /// not an error.
    async fn children_of(
        &self,
        level: Level,
        parent_code: Option<&str>,
    ) -> Result<Vec<TaxonomyNode>, TaxonomyError>;

    /// Full ancestry of an 8-digit commodity code, derived from its prefixes.
    async fn ancestors_of(&self, commodity_code: &str) -> Result<Hierarchy, TaxonomyError>;
}

/// In-memory taxonomy backed by per-level ordered maps.
///
/// Ships in the crate for tests and for embedding callers with small
/// taxonomies; production deployments implement [`TaxonomyRepository`]
/// over their own store.
#[derive(Debug, Default)]
pub struct InMemoryTaxonomy {
    // BTreeMap keeps children in code order, which doubles as repository order.
    levels: BTreeMap<Level, BTreeMap<String, TaxonomyNode>>,
}

impl InMemoryTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = TaxonomyNode>) -> Self {
        let mut taxonomy = Self::new();
        for node in nodes {
            taxonomy.insert(node);
        }
        taxonomy
    }

    pub fn insert(&mut self, node: TaxonomyNode) {
        self.levels
            .entry(node.level)
            .or_default()
            .insert(node.code.clone(), node);
    }

    fn lookup(&self, level: Level, code: &str) -> Option<&TaxonomyNode> {
        self.levels.get(&level)?.get(code)
    }
}

#[async_trait]
impl TaxonomyRepository for InMemoryTaxonomy {
    async fn children_of(
        &self,
        level: Level,
        parent_code: Option<&str>,
    ) -> Result<Vec<TaxonomyNode>, TaxonomyError> {
        let prefix = match (level.parent(), parent_code) {
            (None, _) => String::new(),
            (Some(parent_level), Some(code)) => pad_code(code, parent_level.code_width()),
            (Some(_), None) => {
                return Err(TaxonomyError::Lookup {
                    level,
                    parent: String::new(),
                    message: "parent code required for non-root levels".to_string(),
                })
            }
        };

        let children: Vec<TaxonomyNode> = self
            .levels
            .get(&level)
            .map(|nodes| {
                nodes
                    .values()
                    .filter(|node| node.code.starts_with(&prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        debug!(%level, parent = %prefix, count = children.len(), "taxonomy children fetched");
        Ok(children)
    }

    async fn ancestors_of(&self, commodity_code: &str) -> Result<Hierarchy, TaxonomyError> {
        let code = pad_code(commodity_code, Level::Commodity.code_width());
        if self.lookup(Level::Commodity, &code).is_none() {
            return Err(TaxonomyError::UnknownCode(code));
        }

        // Each ancestor code is a prefix of the commodity code; a missing
        // intermediate entry is tolerated and simply left unset.
        let mut hierarchy = Hierarchy::default();
        for level in Level::ALL {
            let prefix = &code[..level.code_width()];
            if let Some(node) = self.lookup(level, prefix) {
                hierarchy.set(level, &node.code, &node.description);
            }
        }
        Ok(hierarchy)
    }
}
