//! Hierarchical classification core
//!
//! The decision procedure: a generic per-level classifier, the commodity
//! reflection policy, and the chain that drives the four-level descent.

pub mod chain;
pub mod level;
pub mod outcome;
pub mod reflect;

mod payload;
mod text;

pub use chain::ClassificationChain;
pub use level::LevelClassifier;
pub use outcome::{ClassificationResult, Confidence, LevelOutcome};
pub use reflect::{reflect, ReflectionVerdict};
