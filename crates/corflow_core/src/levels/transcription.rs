//! Transcription algorithms: bounds, child timing, timetable, speakers and
//! copy link remapping.
//!
//! # Invariants
//! - `set_bounds` is idempotent.
//! - `set_child_time` stamps one structural level completely before the next.
//! - Copy remapping restores one structural hop only: a segment keeps its
//!   parent when that parent lives in the tier's structural parent tier.

use super::tier;
use super::timing::TimeOrdered;
use crate::model::entity::{EntityId, EntityKind};
use crate::model::metadata::{DIVISION_OMNI, DIVISION_TECH};
use crate::store::{AnnotationGraph, StoreResult};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Tier types counted by `timetable`.
const TIMED_TIER_TYPES: [&str; 2] = ["time", "subtime"];

/// One speaker gathered by `speakers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speaker {
    pub name: String,
    /// Fields from the transcription's grouped metadata.
    pub fields: BTreeMap<String, String>,
    /// Tiers tagged with this speaker.
    pub tiers: Vec<EntityId>,
}

/// All segments, tier by tier.
pub fn iter_seg(
    graph: &AnnotationGraph,
    transcription: EntityId,
) -> impl Iterator<Item = EntityId> + '_ {
    graph
        .elements(transcription)
        .iter()
        .flat_map(move |tier| graph.elements(*tier).iter().copied())
}

/// All segments in start-time order across tiers.
pub fn iter_time(graph: &AnnotationGraph, transcription: EntityId) -> TimeOrdered<'_> {
    TimeOrdered::new(graph, graph.elements(transcription))
}

/// Tiers without a structural parent, in containment order.
pub fn top_tiers(graph: &AnnotationGraph, transcription: EntityId) -> Vec<EntityId> {
    graph
        .elements(transcription)
        .iter()
        .copied()
        .filter(|tier| graph.parent(*tier).is_none())
        .collect()
}

/// Sorted, distinct segment boundaries of the timed tiers.
///
/// A tier counts when its `tech` type is `time`, `subtime`, or unset.
pub fn timetable(graph: &AnnotationGraph, transcription: EntityId) -> Vec<f64> {
    let mut times: Vec<f64> = Vec::new();
    for tier in graph.elements(transcription) {
        let Some(entity) = graph.get(*tier) else {
            continue;
        };
        let tier_type = entity.metadata.meta("type", DIVISION_TECH, "");
        if !tier_type.is_empty() && !TIMED_TIER_TYPES.iter().any(|timed| *timed == tier_type) {
            continue;
        }
        for segment in graph.elements(*tier) {
            if let Some(segment) = graph.get(*segment) {
                times.extend(segment.start);
                times.extend(segment.end);
            }
        }
    }
    times.sort_by(f64::total_cmp);
    times.dedup();
    times
}

/// Sets every tier's and the transcription's bounds to the envelope of the
/// tiers' first-segment starts and last-segment ends.
///
/// Tiers without segments do not count. Unless `allow_negative_start`, a
/// negative start never becomes the bound. Returns the bounds applied.
pub fn set_bounds(
    graph: &mut AnnotationGraph,
    transcription: EntityId,
    allow_negative_start: bool,
) -> StoreResult<(Option<f64>, Option<f64>)> {
    graph.require_kind(transcription, EntityKind::Transcription)?;
    let tiers = graph.elements(transcription).to_vec();
    let mut start: Option<f64> = None;
    let mut end: Option<f64> = None;
    for tier in &tiers {
        let segments = graph.elements(*tier);
        let first = segments
            .first()
            .and_then(|id| graph.get(*id))
            .and_then(|e| e.start);
        let last = segments
            .last()
            .and_then(|id| graph.get(*id))
            .and_then(|e| e.end);
        if let Some(first) = first {
            if (allow_negative_start || first >= 0.0) && start.map_or(true, |s| first < s) {
                start = Some(first);
            }
        }
        if let Some(last) = last {
            if end.map_or(true, |e| last > e) {
                end = Some(last);
            }
        }
    }
    for id in tiers.iter().copied().chain(std::iter::once(transcription)) {
        if let Some(entity) = graph.get_mut(id) {
            entity.start = start;
            entity.end = end;
        }
    }
    debug!(
        "event=bounds_set module=levels kind=transcription tiers={}",
        tiers.len()
    );
    Ok((start, end))
}

/// Time-stamps dependent tiers breadth-first from the top tiers down.
///
/// See `tier::set_child_time` for the per-tier rule and `force`.
pub fn set_child_time(
    graph: &mut AnnotationGraph,
    transcription: EntityId,
    force: bool,
) -> StoreResult<()> {
    graph.require_kind(transcription, EntityKind::Transcription)?;
    let mut level = top_tiers(graph, transcription);
    let mut depth = 0;
    while !level.is_empty() {
        let mut next = Vec::new();
        for parent_tier in &level {
            next.extend(
                graph
                    .children(*parent_tier, None)
                    .into_iter()
                    .filter(|child| graph.kind(*child) == Some(EntityKind::Tier)),
            );
            tier::set_child_time(graph, *parent_tier, force)?;
        }
        level = next;
        depth += 1;
    }
    debug!(
        "event=child_time_set module=levels kind=transcription depth={}",
        depth
    );
    Ok(())
}

/// Runs `tier::fix_overlaps` on every tier. Returns the total trimmed.
pub fn fix_overlaps(graph: &mut AnnotationGraph, transcription: EntityId) -> StoreResult<usize> {
    for_each_tier(graph, transcription, tier::fix_overlaps)
}

/// Runs `tier::fix_gaps` on every tier. Returns the total inserted.
pub fn fix_gaps(
    graph: &mut AnnotationGraph,
    transcription: EntityId,
    marker: &str,
) -> StoreResult<usize> {
    for_each_tier(graph, transcription, |graph, tier| {
        tier::fix_gaps(graph, tier, marker)
    })
}

/// Runs `tier::rem_gaps` on every tier. Returns the total removed.
pub fn rem_gaps(
    graph: &mut AnnotationGraph,
    transcription: EntityId,
    marker: &str,
) -> StoreResult<usize> {
    for_each_tier(graph, transcription, |graph, tier| {
        tier::rem_gaps(graph, tier, marker)
    })
}

/// Renames all segments with one counter running across tiers.
pub fn rename_segs(
    graph: &mut AnnotationGraph,
    transcription: EntityId,
    prefix: &str,
) -> StoreResult<usize> {
    graph.require_kind(transcription, EntityKind::Transcription)?;
    let mut counter = 0;
    for tier in graph.elements(transcription).to_vec() {
        counter = tier::rename_segs(graph, tier, prefix, counter)?;
    }
    Ok(counter)
}

/// Speakers from grouped transcription metadata plus tier speaker tags.
///
/// Grouped records come from `group` keys in `division`. Each tier joins the
/// speaker named by its `speaker_key` value in `omni`, creating it when
/// unknown. Untagged tiers are gathered under a generated `group + n` name.
pub fn speakers(
    graph: &AnnotationGraph,
    transcription: EntityId,
    group: &str,
    division: &str,
    speaker_key: &str,
) -> Vec<Speaker> {
    let Some(entity) = graph.get(transcription) else {
        return Vec::new();
    };
    let mut speakers: Vec<Speaker> = entity
        .metadata
        .meta_group(group, division, crate::model::metadata::DEFAULT_META_SEPARATOR)
        .into_iter()
        .map(|record| Speaker {
            name: record.name,
            fields: record.fields,
            tiers: Vec::new(),
        })
        .collect();

    let mut untagged = Vec::new();
    for tier in graph.elements(transcription) {
        let name = graph
            .get(*tier)
            .map(|tier| tier.metadata.meta(speaker_key, DIVISION_OMNI, "").to_string())
            .unwrap_or_default();
        if name.is_empty() {
            untagged.push(*tier);
            continue;
        }
        match speakers.iter_mut().find(|speaker| speaker.name == name) {
            Some(speaker) => speaker.tiers.push(*tier),
            None => speakers.push(Speaker {
                name,
                fields: BTreeMap::new(),
                tiers: vec![*tier],
            }),
        }
    }

    if !untagged.is_empty() {
        let mut counter = 1;
        let mut name = format!("{group}{counter}");
        while speakers.iter().any(|speaker| speaker.name == name) {
            counter += 1;
            name = format!("{group}{counter}");
        }
        speakers.push(Speaker {
            name,
            fields: BTreeMap::new(),
            tiers: untagged,
        });
    }
    speakers
}

/// Rebuilds tier-level and one hop of segment-level parentage after a
/// transcription copy.
pub(crate) fn remap_tier_links(
    graph: &mut AnnotationGraph,
    source: EntityId,
    copy: EntityId,
    mapping: &[(EntityId, EntityId)],
) -> StoreResult<()> {
    let lookup: HashMap<EntityId, EntityId> = mapping.iter().copied().collect();
    for (original_tier, copied_tier) in mapping {
        let Some(parent_tier) = graph.parent(*original_tier) else {
            continue;
        };
        let Some(copied_parent_tier) = lookup.get(&parent_tier).copied() else {
            continue;
        };
        graph.set_parent(*copied_tier, Some(copied_parent_tier))?;

        let originals = graph.elements(*original_tier).to_vec();
        let copies = graph.elements(*copied_tier).to_vec();
        for (original_segment, copied_segment) in originals.iter().zip(copies) {
            let Some(parent_segment) = graph.parent(*original_segment) else {
                continue;
            };
            if graph.container(parent_segment) != Some(parent_tier) {
                continue;
            }
            let Some(position) = graph.index(parent_segment) else {
                continue;
            };
            if let Some(target) = graph.get_index(copied_parent_tier, position) {
                graph.set_parent(copied_segment, Some(target))?;
            }
        }
    }
    debug!(
        "event=links_remapped module=levels kind=transcription source={} copy={}",
        source, copy
    );
    Ok(())
}

fn for_each_tier<F>(
    graph: &mut AnnotationGraph,
    transcription: EntityId,
    mut op: F,
) -> StoreResult<usize>
where
    F: FnMut(&mut AnnotationGraph, EntityId) -> StoreResult<usize>,
{
    graph.require_kind(transcription, EntityKind::Transcription)?;
    let mut total = 0;
    for tier in graph.elements(transcription).to_vec() {
        total += op(graph, tier)?;
    }
    Ok(total)
}
