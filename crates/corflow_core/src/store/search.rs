//! Element lookups by position, name and time.
//!
//! Every lookup returns `None` when nothing matches.

use super::AnnotationGraph;
use crate::model::entity::EntityId;
use regex::Regex;

impl AnnotationGraph {
    /// Element at `index` of `container`.
    pub fn get_index(&self, container: EntityId, index: usize) -> Option<EntityId> {
        self.elements(container).get(index).copied()
    }

    /// First element of `container` whose name equals `name`.
    pub fn get_name(&self, container: EntityId, name: &str) -> Option<EntityId> {
        self.elements(container)
            .iter()
            .copied()
            .find(|id| self.get(*id).is_some_and(|entity| entity.name == name))
    }

    /// First element of `container` whose name matches `pattern` anywhere.
    pub fn find_name(&self, container: EntityId, pattern: &Regex) -> Option<EntityId> {
        self.elements(container)
            .iter()
            .copied()
            .find(|id| self.get(*id).is_some_and(|entity| pattern.is_match(&entity.name)))
    }

    /// Element of `container` covering `timecode`.
    ///
    /// Assumes elements sorted by time and not overlapping. A match is
    /// `start <= t < end`, or `t == start == end` for zero-duration elements.
    /// Probe positions are interpolated from the timecode inside the span of
    /// the remaining range.
    pub fn get_time(&self, container: EntityId, timecode: f64) -> Option<EntityId> {
        let elements = self.elements(container);
        let (first, last) = (*elements.first()?, *elements.last()?);
        let mut span_start = self.get(first)?.start?;
        let mut span_end = self.get(last)?.end?;
        if span_start == span_end && timecode == span_end {
            return Some(first);
        }
        if timecode < span_start || timecode > span_end {
            return None;
        }

        let mut low = 0;
        let mut high = elements.len() - 1;
        while low < high {
            if timecode < span_start || timecode >= span_end {
                return None;
            }
            let ratio = (timecode - span_start) / (span_end - span_start);
            let probe = (low + ((high - low) as f64 * ratio) as usize).min(high);
            let entity = self.get(elements[probe])?;
            if entity.contains_time(timecode) {
                return Some(elements[probe]);
            }
            let (start, end) = entity.span()?;
            if timecode < start {
                if probe == low {
                    return None;
                }
                high = probe - 1;
                span_end = self.get(elements[high])?.end?;
            } else if timecode >= end {
                if probe == high {
                    return None;
                }
                low = probe + 1;
                span_start = self.get(elements[low])?.start?;
            } else {
                return None;
            }
        }

        let candidate = elements[low];
        self.get(candidate)?
            .contains_time(timecode)
            .then_some(candidate)
    }
}
