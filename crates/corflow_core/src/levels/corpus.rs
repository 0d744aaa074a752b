//! Corpus traversal across transcriptions.

use crate::model::entity::EntityId;
use crate::store::AnnotationGraph;

/// Every tier of every transcription, in containment order.
pub fn iter_tier(graph: &AnnotationGraph, corpus: EntityId) -> impl Iterator<Item = EntityId> + '_ {
    graph
        .elements(corpus)
        .iter()
        .flat_map(move |transcription| graph.elements(*transcription).iter().copied())
}

/// Every segment of every tier, transcription by transcription.
pub fn iter_seg(graph: &AnnotationGraph, corpus: EntityId) -> impl Iterator<Item = EntityId> + '_ {
    iter_tier(graph, corpus).flat_map(move |tier| graph.elements(tier).iter().copied())
}
