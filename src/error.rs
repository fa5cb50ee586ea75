//! Error types for the classification chain
//!
//! This module provides idiomatic Rust error types using thiserror.
//! Oracle transport failures are carried as `anyhow::Error` inside the
//! provider layer; everything the chain itself can raise lives here.

use thiserror::Error;

use crate::taxonomy::Level;

/// Errors raised by a taxonomy repository implementation.
///
/// Lookup failures are recoverable from the chain's point of view: a level
/// that cannot fetch its candidates degrades to an empty candidate set and
/// descent halts there. Callers embedding their own repository should map
/// their storage errors onto these variants.
#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("lookup failed for {level} children of '{parent}': {message}")]
    Lookup {
        level: Level,
        parent: String,
        message: String,
    },

    #[error("unknown commodity code: {0}")]
    UnknownCode(String),

    #[error("taxonomy transport error: {0}")]
    Transport(String),
}
