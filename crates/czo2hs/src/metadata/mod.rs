//! Metadata assembly: turns one raw export row into the structured bundle
//! submitted to the target repository.

pub mod assembler;
pub mod creator;

pub use assembler::{assemble, EXTRA_METADATA_COLUMNS, KEYWORD_COLUMNS};
pub use creator::{CreatorResolver, GroupDirectory};

use std::collections::{BTreeMap, BTreeSet};

/// Everything the orchestrator submits in stages 1-5, assembled up front so
/// a malformed row fails before any remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataBundle {
    pub title: String,
    pub abstract_text: String,
    /// Lower-cased, deduplicated, never contains the empty string.
    /// Iteration order is an implementation detail consumers must not rely on.
    pub keywords: BTreeSet<String>,
    pub creator: Creator,
    /// Fully present or entirely omitted: the remote API replaces spatial
    /// coverage when temporal is set and vice versa, so they travel together.
    pub coverage: Option<Coverage>,
    /// Opaque key→string bag carried through for round-trip fidelity.
    pub extra_metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub name: String,
    pub organization: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub spatial: SpatialCoverage,
    pub temporal: TemporalCoverage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpatialCoverage {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalCoverage {
    pub start: String,
    pub end: String,
}
