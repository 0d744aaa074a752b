//! Entity domain model shared by all four hierarchy levels.
//!
//! # Responsibility
//! - Define the value part of Corpus/Transcription/Tier/Segment entities.
//! - Define the stable handle used to address entities inside a graph.
//!
//! # Invariants
//! - `EntityId` values are never reused inside one `AnnotationGraph`.
//! - `end` should not be earlier than `start` when both are set.
//! - Only `EntityKind::Segment` carries non-empty `content`.

use crate::model::metadata::Metadata;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable handle of one entity inside an `AnnotationGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    /// Raw arena slot.
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hierarchy level of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Collection of transcriptions.
    Corpus,
    /// One annotated recording.
    Transcription,
    /// One annotation layer.
    Tier,
    /// Text bound to a time interval.
    Segment,
}

impl EntityKind {
    /// Kind that lives one level below, `None` for segments.
    pub fn child_kind(self) -> Option<EntityKind> {
        match self {
            Self::Corpus => Some(Self::Transcription),
            Self::Transcription => Some(Self::Tier),
            Self::Tier => Some(Self::Segment),
            Self::Segment => None,
        }
    }

    /// Kind that owns this one, `None` for corpora.
    pub fn container_kind(self) -> Option<EntityKind> {
        match self {
            Self::Corpus => None,
            Self::Transcription => Some(Self::Corpus),
            Self::Tier => Some(Self::Transcription),
            Self::Segment => Some(Self::Tier),
        }
    }

    /// Stable lowercase label used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Corpus => "corpus",
            Self::Transcription => "transcription",
            Self::Tier => "tier",
            Self::Segment => "segment",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for entity values.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityValidationError {
    /// `end` is earlier than `start`.
    InvalidTimeSpan { start: f64, end: f64 },
    /// A time bound is NaN or infinite.
    NonFiniteTime(f64),
}

impl Display for EntityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimeSpan { start, end } => {
                write!(f, "end ({end}) must be >= start ({start})")
            }
            Self::NonFiniteTime(value) => write!(f, "time bound must be finite, got {value}"),
        }
    }
}

impl Error for EntityValidationError {}

/// Value part of one node: everything except its place in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    kind: EntityKind,
    /// Display name, not required to be unique.
    pub name: String,
    /// Start time in seconds. `None` means unset.
    pub start: Option<f64>,
    /// End time in seconds. `None` means unset.
    pub end: Option<f64>,
    /// Annotation text. Always empty for non-segments.
    pub content: String,
    /// Layered metadata.
    pub metadata: Metadata,
}

impl Entity {
    pub(crate) fn from_draft(kind: EntityKind, draft: EntityDraft) -> Self {
        let content = if kind == EntityKind::Segment {
            draft.content
        } else {
            String::new()
        };
        Self {
            kind,
            name: draft.name,
            start: draft.start,
            end: draft.end,
            content,
            metadata: draft.metadata,
        }
    }

    /// Hierarchy level.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns `(start, end)` when both bounds are set.
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((self.start?, self.end?))
    }

    /// Duration when both bounds are set.
    pub fn duration(&self) -> Option<f64> {
        self.span().map(|(start, end)| end - start)
    }

    /// Whether `timecode` falls in `[start, end)`.
    ///
    /// A zero-duration entity also contains its own single instant.
    pub fn contains_time(&self, timecode: f64) -> bool {
        match self.span() {
            Some((start, end)) => {
                timecode >= start && (timecode < end || (timecode == end && end == start))
            }
            None => false,
        }
    }

    /// Validates time bounds.
    ///
    /// # Errors
    /// - `NonFiniteTime` when a set bound is NaN or infinite.
    /// - `InvalidTimeSpan` when both bounds are set and `end < start`.
    pub fn validate(&self) -> Result<(), EntityValidationError> {
        for value in [self.start, self.end].into_iter().flatten() {
            if !value.is_finite() {
                return Err(EntityValidationError::NonFiniteTime(value));
            }
        }
        if let Some((start, end)) = self.span() {
            if end < start {
                return Err(EntityValidationError::InvalidTimeSpan { start, end });
            }
        }
        Ok(())
    }
}

/// Construction input for `AnnotationGraph::create` and `new_root`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDraft {
    pub name: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
    /// Dropped unless the created entity is a segment.
    pub content: String,
    pub metadata: Metadata,
}

impl EntityDraft {
    /// Draft with a name and no times.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets both time bounds.
    pub fn with_span(mut self, start: f64, end: f64) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, EntityDraft, EntityId, EntityKind, EntityValidationError};

    #[test]
    fn handles_cover_the_whole_slot_range() {
        let last = EntityId(usize::MAX);
        assert_eq!(last.index(), usize::MAX);
        assert_ne!(last, EntityId(usize::MAX >> 32));
        assert_eq!(last.to_string(), format!("#{}", usize::MAX));
    }

    #[test]
    fn content_is_dropped_above_segment_level() {
        let tier = Entity::from_draft(EntityKind::Tier, EntityDraft::new("t").with_content("x"));
        assert!(tier.content.is_empty());

        let seg = Entity::from_draft(EntityKind::Segment, EntityDraft::new("s").with_content("x"));
        assert_eq!(seg.content, "x");
    }

    #[test]
    fn zero_duration_contains_its_instant() {
        let seg = Entity::from_draft(EntityKind::Segment, EntityDraft::new("s").with_span(2.0, 2.0));
        assert!(seg.contains_time(2.0));
        assert!(!seg.contains_time(2.1));
    }

    #[test]
    fn validate_rejects_reversed_span() {
        let seg = Entity::from_draft(EntityKind::Segment, EntityDraft::new("s").with_span(3.0, 1.0));
        assert_eq!(
            seg.validate().unwrap_err(),
            EntityValidationError::InvalidTimeSpan {
                start: 3.0,
                end: 1.0
            }
        );
    }
}
