//! Level-specific algorithms over the generic container engine.
//!
//! # Responsibility
//! - Host the per-level operations (repair, timing, renaming, copy link
//!   remapping) as free functions over `AnnotationGraph`.
//!
//! # Invariants
//! - Functions taking an entity of a fixed level reject other kinds with
//!   `StoreError::KindMismatch`.

pub mod corpus;
pub mod segment;
pub mod tier;
pub mod timing;
pub mod transcription;

use crate::model::entity::{EntityId, EntityKind};
use crate::store::{AnnotationGraph, StoreResult};

/// Reserved content of filler segments.
pub const DEFAULT_GAP_MARKER: &str = "_";
/// Name prefix used for generated segment names.
pub const DEFAULT_SEGMENT_PREFIX: &str = "a";

/// Restores structural links inside a fresh containment copy.
///
/// `mapping` pairs each original element of `source` with its copy inside
/// `copy`, in containment order.
pub(crate) fn remap_copied_links(
    graph: &mut AnnotationGraph,
    source: EntityId,
    copy: EntityId,
    mapping: &[(EntityId, EntityId)],
) -> StoreResult<()> {
    match graph.kind(source) {
        Some(EntityKind::Tier) => tier::remap_segment_links(graph, mapping),
        Some(EntityKind::Transcription) => {
            transcription::remap_tier_links(graph, source, copy, mapping)
        }
        _ => Ok(()),
    }
}
