//! Structural stylesheet optimizer: merges, splits and rewrites rule-sets so
//! the serialized output gets shorter while the cascade stays the same.

pub mod atrule;
pub mod disjoin;
pub mod error;
pub mod fingerprint;
pub mod indexer;
pub mod initial_merge;
pub mod merge_rules;
pub mod options;
pub mod pipeline;
pub mod redundancy;
pub mod restructure_rules;
pub mod shorthand;
pub mod specificity;
pub mod usage;
pub mod utils;

#[cfg(test)]
mod tests_properties;

#[cfg(test)]
mod tests_edge_cases;

pub use error::{RestructureError, RestructureResult};
pub use fingerprint::Fingerprinter;
pub use indexer::Indexer;
pub use options::{RestructureOptions, Usage};
pub use pipeline::{compress, restructure, PassStats, RestructureReport};
pub use specificity::{specificity, Specificity};
