//! Tier algorithms: ordering, overlap/gap repair, renaming, child timing.
//!
//! # Invariants
//! - `sort_by_time` and every insertion/removal leave the link-table
//!   indices synchronized.
//! - `fix_overlaps` only ever shrinks segment ends.
//! - Filler segments are recognized by content alone.

use super::timing::split;
use super::DEFAULT_SEGMENT_PREFIX;
use crate::model::entity::{EntityDraft, EntityId, EntityKind};
use crate::store::{AnnotationGraph, StoreResult};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid duration regex"));

/// Stable sort of the tier's segments by start time.
///
/// Segments with an unset start sort first.
pub fn sort_by_time(graph: &mut AnnotationGraph, tier: EntityId) -> StoreResult<()> {
    graph.require_kind(tier, EntityKind::Tier)?;
    let mut keyed: Vec<(Option<f64>, EntityId)> = graph
        .elements(tier)
        .iter()
        .map(|id| (graph.get(*id).and_then(|entity| entity.start), *id))
        .collect();
    keyed.sort_by(|(left, _), (right, _)| match (left, right) {
        (Some(left), Some(right)) => left.total_cmp(right),
        (left, right) => left.is_some().cmp(&right.is_some()),
    });
    if let Some(node) = graph.node_mut(tier) {
        node.elements = keyed.into_iter().map(|(_, id)| id).collect();
    }
    graph.resync_indices(tier, 0, usize::MAX);
    Ok(())
}

/// Cuts each segment's end back to the next segment's start when they
/// overlap. Returns the number of segments shortened.
pub fn fix_overlaps(graph: &mut AnnotationGraph, tier: EntityId) -> StoreResult<usize> {
    graph.require_kind(tier, EntityKind::Tier)?;
    let segments = graph.elements(tier).to_vec();
    let mut trimmed = 0;
    for pair in segments.windows(2) {
        let next_start = graph.get(pair[1]).and_then(|entity| entity.start);
        let Some(current) = graph.get_mut(pair[0]) else {
            continue;
        };
        if let (Some(end), Some(next_start)) = (current.end, next_start) {
            if end > next_start {
                current.end = Some(next_start);
                trimmed += 1;
            }
        }
    }
    if trimmed > 0 {
        debug!(
            "event=overlaps_fixed module=levels kind=tier trimmed={}",
            trimmed
        );
    }
    Ok(trimmed)
}

/// Inserts filler segments holding `marker` wherever the tier's span is not
/// covered: before the first segment, between segments, after the last.
///
/// Returns the number of fillers inserted. Gaps next to an unset time are
/// left alone.
pub fn fix_gaps(graph: &mut AnnotationGraph, tier: EntityId, marker: &str) -> StoreResult<usize> {
    graph.require_kind(tier, EntityKind::Tier)?;
    let segments = graph.elements(tier).to_vec();
    let (Some(first), Some(last)) = (segments.first().copied(), segments.last().copied()) else {
        return Ok(0);
    };
    let (tier_start, tier_end) = match graph.get(tier) {
        Some(entity) => (entity.start, entity.end),
        None => (None, None),
    };
    let start_of = |graph: &AnnotationGraph, id: EntityId| graph.get(id).and_then(|e| e.start);
    let end_of = |graph: &AnnotationGraph, id: EntityId| graph.get(id).and_then(|e| e.end);
    let filler = |start: f64, end: f64| {
        EntityDraft::new(DEFAULT_SEGMENT_PREFIX)
            .with_span(start, end)
            .with_content(marker)
    };

    let mut inserted = 0;
    if let (Some(last_end), Some(tier_end)) = (end_of(graph, last), tier_end) {
        if last_end < tier_end {
            graph.create(tier, None, filler(last_end, tier_end))?;
            inserted += 1;
        }
    }
    for position in (1..segments.len()).rev() {
        let previous_end = end_of(graph, segments[position - 1]);
        let next_start = start_of(graph, segments[position]);
        if let (Some(previous_end), Some(next_start)) = (previous_end, next_start) {
            if previous_end < next_start {
                graph.create(tier, Some(position), filler(previous_end, next_start))?;
                inserted += 1;
            }
        }
    }
    if let (Some(first_start), Some(tier_start)) = (start_of(graph, first), tier_start) {
        if first_start > tier_start {
            graph.create(tier, Some(0), filler(tier_start, first_start))?;
            inserted += 1;
        }
    }
    debug!(
        "event=gaps_fixed module=levels kind=tier inserted={}",
        inserted
    );
    Ok(inserted)
}

/// Deletes every segment whose content equals `marker`.
///
/// Each filler is detached from its structural parent and children first;
/// its children are unlinked, not deleted. Returns the number removed.
pub fn rem_gaps(graph: &mut AnnotationGraph, tier: EntityId, marker: &str) -> StoreResult<usize> {
    graph.require_kind(tier, EntityKind::Tier)?;
    let fillers: Vec<EntityId> = graph
        .elements(tier)
        .iter()
        .copied()
        .filter(|id| graph.get(*id).is_some_and(|entity| entity.content == marker))
        .collect();
    for filler in &fillers {
        graph.excise(*filler)?;
    }
    debug!(
        "event=gaps_removed module=levels kind=tier removed={}",
        fillers.len()
    );
    Ok(fillers.len())
}

/// Renames segments to `prefix + counter` in containment order and returns
/// the next unused counter.
pub fn rename_segs(
    graph: &mut AnnotationGraph,
    tier: EntityId,
    prefix: &str,
    start_counter: usize,
) -> StoreResult<usize> {
    graph.require_kind(tier, EntityKind::Tier)?;
    let mut counter = start_counter;
    for segment in graph.elements(tier).to_vec() {
        if let Some(entity) = graph.get_mut(segment) {
            entity.name = format!("{prefix}{counter}");
        }
        counter += 1;
    }
    Ok(counter)
}

/// Time-stamps the segments of each direct structural child tier.
///
/// Consecutive child segments sharing a parent segment split that parent's
/// span. A child tier whose first segment already has a start is skipped
/// unless `force` is set.
pub fn set_child_time(graph: &mut AnnotationGraph, tier: EntityId, force: bool) -> StoreResult<()> {
    graph.require_kind(tier, EntityKind::Tier)?;
    for child_tier in graph.children(tier, None) {
        if graph.kind(child_tier) != Some(EntityKind::Tier) {
            continue;
        }
        if !force && is_time_stamped(graph, child_tier) {
            continue;
        }
        let segments = graph.elements(child_tier).to_vec();
        let mut group: Vec<EntityId> = Vec::new();
        let mut group_parent: Option<EntityId> = None;
        for segment in segments {
            let parent = graph.parent(segment);
            if parent != group_parent {
                split_over(graph, group_parent, &group);
                group.clear();
                group_parent = parent;
            }
            group.push(segment);
        }
        split_over(graph, group_parent, &group);
    }
    Ok(())
}

/// Replaces filler content with its printed duration (3 decimals), wrapped
/// in `brackets` when given. Returns the number of segments rewritten.
pub fn sym_to_dur(
    graph: &mut AnnotationGraph,
    tier: EntityId,
    marker: &str,
    brackets: Option<(char, char)>,
) -> StoreResult<usize> {
    graph.require_kind(tier, EntityKind::Tier)?;
    let mut rewritten = 0;
    for segment in graph.elements(tier).to_vec() {
        let Some(entity) = graph.get_mut(segment) else {
            continue;
        };
        if entity.content != marker {
            continue;
        }
        let Some(duration) = entity.duration() else {
            continue;
        };
        entity.content = match brackets {
            Some((open, close)) => format!("{open}{duration:.3}{close}"),
            None => format!("{duration:.3}"),
        };
        rewritten += 1;
    }
    Ok(rewritten)
}

/// Reverse of `sym_to_dur`: content that is a (bracketed) number becomes
/// `marker`. Returns the number of segments rewritten.
pub fn dur_to_sym(
    graph: &mut AnnotationGraph,
    tier: EntityId,
    marker: &str,
    brackets: Option<(char, char)>,
) -> StoreResult<usize> {
    graph.require_kind(tier, EntityKind::Tier)?;
    let mut rewritten = 0;
    for segment in graph.elements(tier).to_vec() {
        let Some(entity) = graph.get_mut(segment) else {
            continue;
        };
        let inner = match brackets {
            Some((open, close)) => entity
                .content
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close)),
            None => Some(entity.content.as_str()),
        };
        if inner.is_some_and(|inner| DURATION_RE.is_match(inner)) {
            entity.content = marker.to_string();
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

/// Whether the tier's first segment already carries a start time.
pub fn is_time_stamped(graph: &AnnotationGraph, tier: EntityId) -> bool {
    graph
        .elements(tier)
        .first()
        .and_then(|segment| graph.get(*segment))
        .is_some_and(|entity| entity.start.is_some())
}

fn split_over(graph: &mut AnnotationGraph, parent: Option<EntityId>, group: &[EntityId]) {
    let Some(parent) = parent else {
        return;
    };
    if let Some((start, end)) = graph.get(parent).and_then(|entity| entity.span()) {
        split(graph, group, start, end);
    }
}

/// Relinks copied segments whose structural parent was copied alongside
/// them. Links leaving the copied tier are dropped.
pub(crate) fn remap_segment_links(
    graph: &mut AnnotationGraph,
    mapping: &[(EntityId, EntityId)],
) -> StoreResult<()> {
    let lookup: HashMap<EntityId, EntityId> = mapping.iter().copied().collect();
    for (original, copy) in mapping {
        let Some(parent) = graph.parent(*original) else {
            continue;
        };
        if let Some(parent_copy) = lookup.get(&parent) {
            graph.set_parent(*copy, Some(*parent_copy))?;
        }
    }
    Ok(())
}
