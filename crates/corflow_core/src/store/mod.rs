//! Arena-backed container engine shared by all hierarchy levels.
//!
//! # Responsibility
//! - Own every entity of a corpus graph behind stable `EntityId` handles.
//! - Keep containment order and the structural link table consistent under
//!   create/add/move/remove.
//!
//! # Invariants
//! - Each attached entity has exactly one link record, whose `index` points
//!   back at it in its container's `elements` (re-synchronized lazily).
//! - Structural parent/child links agree in both directions.
//! - The structural graph is acyclic.
//! - Handles are never reused; a removed handle stays unknown forever.

use crate::model::entity::{Entity, EntityDraft, EntityId, EntityKind};
use log::trace;
use std::cell::Cell;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod container;
mod links;
mod navigate;
mod search;

pub use navigate::AllChildren;

/// Result type used by graph operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Broad failure class of a `StoreError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation needs structure the entity does not have.
    Structural,
    /// Argument kind does not fit the operation.
    InvalidArgument,
    /// Handle does not name a live entity.
    UnknownEntity,
}

/// Errors from graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Handle was never issued or its entity was removed.
    UnknownEntity(EntityId),
    /// Entity is not owned by any container.
    NoContainer(EntityId),
    /// Linking would make the structural graph cyclic.
    CycleDetected { child: EntityId, parent: EntityId },
    /// Container kind cannot hold child elements.
    NoChildKind { container: EntityId, kind: EntityKind },
    /// Entity kind does not fit the container it is copied into.
    ContainerMismatch {
        container: EntityId,
        expected: EntityKind,
        actual: EntityKind,
    },
    /// Level algorithm called on the wrong entity kind.
    KindMismatch {
        entity: EntityId,
        expected: EntityKind,
        actual: EntityKind,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownEntity(_) => ErrorKind::UnknownEntity,
            Self::NoContainer(_) | Self::CycleDetected { .. } => ErrorKind::Structural,
            Self::NoChildKind { .. }
            | Self::ContainerMismatch { .. }
            | Self::KindMismatch { .. } => ErrorKind::InvalidArgument,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEntity(id) => write!(f, "unknown entity: {id}"),
            Self::NoContainer(id) => write!(f, "entity has no container: {id}"),
            Self::CycleDetected { child, parent } => write!(
                f,
                "link would create cycle: child {child} under parent {parent}"
            ),
            Self::NoChildKind { container, kind } => {
                write!(f, "{kind} {container} cannot contain elements")
            }
            Self::ContainerMismatch {
                container,
                expected,
                actual,
            } => write!(
                f,
                "container {container} holds {expected} elements, got {actual}"
            ),
            Self::KindMismatch {
                entity,
                expected,
                actual,
            } => write!(f, "entity {entity} must be {expected}, got {actual}"),
        }
    }
}

impl Error for StoreError {}

/// Link-table record of one attached entity.
#[derive(Debug, Clone)]
pub(crate) struct LinkRecord {
    /// Containment index, possibly stale until the next `index` lookup.
    pub(crate) index: Cell<usize>,
    /// Structural parent.
    pub(crate) parent: Option<EntityId>,
    /// Structural children, in link order.
    pub(crate) children: Vec<EntityId>,
}

impl LinkRecord {
    fn new(index: usize) -> Self {
        Self {
            index: Cell::new(index),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) entity: Entity,
    pub(crate) container: Option<EntityId>,
    pub(crate) elements: Vec<EntityId>,
}

/// Owner of a whole annotation graph.
///
/// Entities are created through `new_root` or `create`/`add`, and addressed
/// by `EntityId` afterwards.
#[derive(Debug, Clone, Default)]
pub struct AnnotationGraph {
    nodes: Vec<Option<Node>>,
    links: HashMap<EntityId, LinkRecord>,
}

impl AnnotationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a container-less entity (usually a Corpus or a standalone
    /// Transcription).
    pub fn new_root(&mut self, kind: EntityKind, draft: EntityDraft) -> EntityId {
        self.alloc(Entity::from_draft(kind, draft), None)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    /// Whether `id` names a live entity.
    pub fn contains(&self, id: EntityId) -> bool {
        self.node(id).is_some()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.node(id).map(|node| &node.entity)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.node_mut(id).map(|node| &mut node.entity)
    }

    pub fn kind(&self, id: EntityId) -> Option<EntityKind> {
        self.get(id).map(Entity::kind)
    }

    /// Owning container.
    pub fn container(&self, id: EntityId) -> Option<EntityId> {
        self.node(id).and_then(|node| node.container)
    }

    /// First containment ancestor of the given kind, `id` itself included.
    pub fn owner_of_kind(&self, id: EntityId, kind: EntityKind) -> Option<EntityId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.kind(current)? == kind {
                return Some(current);
            }
            cursor = self.container(current);
        }
        None
    }

    /// Ordered containment children. Empty for unknown handles.
    pub fn elements(&self, id: EntityId) -> &[EntityId] {
        self.node(id)
            .map(|node| node.elements.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self, id: EntityId) -> usize {
        self.elements(id).len()
    }

    pub fn is_empty(&self, id: EntityId) -> bool {
        self.elements(id).is_empty()
    }

    /// Containment index of `id` in its container.
    ///
    /// Repairs a stale link-table index on the way.
    pub fn index(&self, id: EntityId) -> Option<usize> {
        let record = self.links.get(&id)?;
        let elements = self.elements(self.container(id)?);
        let cached = record.index.get();
        if elements.get(cached) == Some(&id) {
            return Some(cached);
        }
        let actual = elements.iter().position(|current| *current == id)?;
        trace!(
            "event=index_resync module=store entity={} stale={} actual={}",
            id,
            cached,
            actual
        );
        record.index.set(actual);
        Some(actual)
    }

    /// Whether `id` has a record in the link table.
    pub fn is_linked(&self, id: EntityId) -> bool {
        self.links.contains_key(&id)
    }

    /// Number of link records naming `id` as owner, parent or child.
    pub fn link_references(&self, id: EntityId) -> usize {
        self.links
            .iter()
            .map(|(owner, record)| {
                usize::from(*owner == id)
                    + usize::from(record.parent == Some(id))
                    + record.children.iter().filter(|child| **child == id).count()
            })
            .sum()
    }

    pub(crate) fn node(&self, id: EntityId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn node_mut(&mut self, id: EntityId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub(crate) fn require(&self, id: EntityId) -> StoreResult<&Node> {
        self.node(id).ok_or(StoreError::UnknownEntity(id))
    }

    pub(crate) fn require_kind(&self, id: EntityId, expected: EntityKind) -> StoreResult<()> {
        let actual = self.require(id)?.entity.kind();
        if actual != expected {
            return Err(StoreError::KindMismatch {
                entity: id,
                expected,
                actual,
            });
        }
        Ok(())
    }

    pub(crate) fn alloc(&mut self, entity: Entity, container: Option<EntityId>) -> EntityId {
        let id = EntityId(self.nodes.len());
        self.nodes.push(Some(Node {
            entity,
            container,
            elements: Vec::new(),
        }));
        id
    }

    pub(crate) fn record(&self, id: EntityId) -> Option<&LinkRecord> {
        self.links.get(&id)
    }

    pub(crate) fn record_mut(&mut self, id: EntityId) -> Option<&mut LinkRecord> {
        self.links.get_mut(&id)
    }
}
