//! UNSPSC classification chain
//!
//! Maps a free-text item description onto the four-level UNSPSC taxonomy
//! (2/4/6/8-digit codes, each level's code a string-prefix of its children)
//! by delegating one "pick exactly one child" decision per level to a
//! text-generation oracle, validating every answer against the candidate
//! set, and recovering deterministically when the oracle is wrong,
//! ambiguous, or silent.
//!
//! ## Architecture
//!
//! Descent order: Segment → Family → Class → Commodity, strictly
//! sequential because each level's candidates depend on the previous pick.
//! After the commodity attempt, a reflection step decides whether to trust
//! the deep 8-digit match or retreat to the safer 6-digit class code.
//! Whenever at least the segment succeeds the final code is exactly 8
//! digits, right-zero-padded past the deepest achieved level.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use unspsc_chain::{
//!     ClassificationChain, InMemoryTaxonomy, Level, MultiProviderOracle, TaxonomyNode,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let taxonomy = InMemoryTaxonomy::from_nodes([
//!     TaxonomyNode::new(Level::Segment, "40", "Distribution and Conditioning Systems"),
//!     TaxonomyNode::new(Level::Family, "4015", "Industrial pumps and compressors"),
//! ]);
//! let oracle = MultiProviderOracle::from_env()?;
//!
//! let chain = ClassificationChain::new(Arc::new(taxonomy), Arc::new(oracle));
//! let result = chain.classify("hydraulic gear pump, 3000 PSI").await;
//! println!("{} ({})", result.final_code.clone().unwrap_or_default(), result.path_string());
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Taxonomy model and repository access
pub mod taxonomy;

// Language oracle abstraction and HTTP providers
pub mod oracle;

// The classification decision procedure
pub mod classify;

pub use classify::{
    ClassificationChain, ClassificationResult, Confidence, LevelClassifier, LevelOutcome,
    ReflectionVerdict,
};
pub use error::TaxonomyError;
pub use oracle::{LanguageOracle, MultiProviderOracle, OracleProvider, ProviderConfig};
pub use taxonomy::{
    Hierarchy, InMemoryTaxonomy, Level, LevelEntry, TaxonomyNode, TaxonomyRepository,
};
