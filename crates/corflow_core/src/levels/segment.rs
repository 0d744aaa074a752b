//! Segment helpers: owner lookup, child timing and content cleanup.

use super::timing::split;
use crate::model::entity::{EntityId, EntityKind};
use crate::store::{AnnotationGraph, StoreResult};

/// Tier owning `segment`.
pub fn tier_of(graph: &AnnotationGraph, segment: EntityId) -> Option<EntityId> {
    owner(graph, segment, EntityKind::Tier)
}

/// Transcription owning `segment` through its tier.
pub fn transcription_of(graph: &AnnotationGraph, segment: EntityId) -> Option<EntityId> {
    owner(graph, segment, EntityKind::Transcription)
}

/// Corpus owning `segment` through its tier and transcription.
pub fn corpus_of(graph: &AnnotationGraph, segment: EntityId) -> Option<EntityId> {
    owner(graph, segment, EntityKind::Corpus)
}

/// Splits the segment's span over each group of its structural children
/// (one group per child tier).
///
/// A group whose first member already has a start is skipped unless `force`
/// is set. Nothing happens while the segment itself is untimed.
pub fn set_child_time(
    graph: &mut AnnotationGraph,
    segment: EntityId,
    force: bool,
) -> StoreResult<()> {
    graph.require_kind(segment, EntityKind::Segment)?;
    let Some((start, end)) = graph.get(segment).and_then(|entity| entity.span()) else {
        return Ok(());
    };
    for (_, group) in graph.child_groups(segment) {
        let stamped = group
            .first()
            .and_then(|first| graph.get(*first))
            .is_some_and(|entity| entity.start.is_some());
        if stamped && !force {
            continue;
        }
        split(graph, &group, start, end);
    }
    Ok(())
}

/// Removes every occurrence of each string in `remove`, then trims
/// `strip` characters (whitespace when `None`) from both ends.
pub fn clean_content(
    graph: &mut AnnotationGraph,
    segment: EntityId,
    remove: &[&str],
    strip: Option<&str>,
) -> StoreResult<()> {
    graph.require_kind(segment, EntityKind::Segment)?;
    if let Some(entity) = graph.get_mut(segment) {
        let mut content = entity.content.clone();
        for pattern in remove.iter().filter(|pattern| !pattern.is_empty()) {
            content = content.replace(pattern, "");
        }
        entity.content = match strip {
            Some(chars) if !chars.is_empty() => content
                .trim_matches(|c: char| chars.contains(c))
                .to_string(),
            _ => content.trim().to_string(),
        };
    }
    Ok(())
}

fn owner(graph: &AnnotationGraph, segment: EntityId, kind: EntityKind) -> Option<EntityId> {
    if graph.kind(segment)? != EntityKind::Segment {
        return None;
    }
    graph.owner_of_kind(segment, kind)
}
