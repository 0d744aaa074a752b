//! Time synthesis and cross-tier time-ordered iteration.

use crate::model::entity::EntityId;
use crate::store::AnnotationGraph;

/// Decimal places kept by synthesized time values.
pub const TIME_PRECISION_DECIMALS: i32 = 4;

/// Rounds to `TIME_PRECISION_DECIMALS` places.
pub fn round_time(value: f64) -> f64 {
    let scale = 10f64.powi(TIME_PRECISION_DECIMALS);
    (value * scale).round() / scale
}

/// Spreads `[start, end]` evenly over `children`, in order.
///
/// The i-th child gets `[start + i*dur, start + (i+1)*dur]` with
/// `dur = (end - start) / children.len()`. No-op for an empty slice.
pub fn split(graph: &mut AnnotationGraph, children: &[EntityId], start: f64, end: f64) {
    if children.is_empty() {
        return;
    }
    let duration = (end - start) / children.len() as f64;
    for (position, child) in children.iter().enumerate() {
        if let Some(entity) = graph.get_mut(*child) {
            entity.start = Some(round_time(start + duration * position as f64));
            entity.end = Some(round_time(start + duration * (position + 1) as f64));
        }
    }
}

/// Lazy merge of several tiers' segments by start time.
///
/// Produced by `transcription::iter_time`. Segments with an unset start come
/// after every timed segment; ties go to the earlier tier.
pub struct TimeOrdered<'a> {
    graph: &'a AnnotationGraph,
    cursors: Vec<(&'a [EntityId], usize)>,
}

impl<'a> TimeOrdered<'a> {
    pub(crate) fn new(graph: &'a AnnotationGraph, tiers: &[EntityId]) -> Self {
        Self {
            graph,
            cursors: tiers
                .iter()
                .map(|tier| (graph.elements(*tier), 0))
                .collect(),
        }
    }
}

impl Iterator for TimeOrdered<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let mut best: Option<(usize, f64)> = None;
        for (slot, (segments, cursor)) in self.cursors.iter().enumerate() {
            let Some(segment) = segments.get(*cursor) else {
                continue;
            };
            let start = self
                .graph
                .get(*segment)
                .and_then(|entity| entity.start)
                .unwrap_or(f64::INFINITY);
            if best.map_or(true, |(_, current)| start < current) {
                best = Some((slot, start));
            }
        }
        let (slot, _) = best?;
        let (segments, cursor) = &mut self.cursors[slot];
        let segment = segments[*cursor];
        *cursor += 1;
        Some(segment)
    }
}
