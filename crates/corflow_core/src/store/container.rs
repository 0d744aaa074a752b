//! Containment mutations: create, copy, move and remove.
//!
//! # Invariants
//! - Every insertion registers a link record and re-synchronizes the indices
//!   of the elements after the insertion point.
//! - Removal is post-order over structural descendants.
//! - Contained elements of a removed entity are destroyed with it; their
//!   structural links are severed, never followed.

use super::{AnnotationGraph, LinkRecord, StoreError, StoreResult};
use crate::levels;
use crate::model::entity::{Entity, EntityDraft, EntityId};
use log::{debug, warn};

impl AnnotationGraph {
    /// Creates a child entity inside `container`.
    ///
    /// The new entity's kind is the container's child kind. `index = None`
    /// or an out-of-range index appends.
    ///
    /// # Errors
    /// - `UnknownEntity` when `container` is not live.
    /// - `NoChildKind` when `container` is a segment.
    pub fn create(
        &mut self,
        container: EntityId,
        index: Option<usize>,
        draft: EntityDraft,
    ) -> StoreResult<EntityId> {
        let container_kind = self.require(container)?.entity.kind();
        let kind = container_kind.child_kind().ok_or(StoreError::NoChildKind {
            container,
            kind: container_kind,
        })?;
        let id = self.alloc(Entity::from_draft(kind, draft), Some(container));
        let position = self.insert_element(container, index, id)?;
        debug!(
            "event=entity_created module=store kind={} index={}",
            kind, position
        );
        Ok(id)
    }

    /// Inserts a copy of `source` into `container`.
    ///
    /// Containment children are copied recursively with the level-specific
    /// link remapping. `parent` becomes the copy's structural parent. With
    /// `copy_structural_children`, the copy adopts the source's structural
    /// children: they are relinked, not duplicated.
    ///
    /// # Errors
    /// - `UnknownEntity` for dead `container`, `source` or `parent`.
    /// - `NoChildKind` / `ContainerMismatch` when `source` cannot live in
    ///   `container`.
    /// - `NoContainer` when `parent` is not attached anywhere.
    /// - `CycleDetected` when `parent` is an adopted child or lies below one.
    ///   The graph is left untouched.
    pub fn add(
        &mut self,
        container: EntityId,
        index: Option<usize>,
        source: EntityId,
        parent: Option<EntityId>,
        copy_structural_children: bool,
    ) -> StoreResult<EntityId> {
        let container_kind = self.require(container)?.entity.kind();
        let source_kind = self.require(source)?.entity.kind();
        let expected = container_kind.child_kind().ok_or(StoreError::NoChildKind {
            container,
            kind: container_kind,
        })?;
        if expected != source_kind {
            return Err(StoreError::ContainerMismatch {
                container,
                expected,
                actual: source_kind,
            });
        }
        let adopted = if copy_structural_children {
            self.record(source)
                .map(|record| record.children.clone())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        if let Some(parent) = parent {
            self.require(parent)?;
            if !self.is_linked(parent) {
                return Err(StoreError::NoContainer(parent));
            }
            // An adopted child above `parent` would end up below the copy.
            if let Some(child) = adopted
                .iter()
                .copied()
                .find(|child| self.is_ancestor_or_self(*child, parent))
            {
                warn!(
                    "event=link_rejected module=store reason=cycle child={} parent={}",
                    child, parent
                );
                return Err(StoreError::CycleDetected { child, parent });
            }
        }

        let copy = self.copy_entity(source, Some(container), false)?;
        let position = self.insert_element(container, index, copy)?;
        if let Some(parent) = parent {
            self.set_parent(copy, Some(parent))?;
        }
        for child in adopted {
            self.set_parent(child, Some(copy))?;
        }
        debug!(
            "event=entity_copied module=store kind={} index={}",
            source_kind, position
        );
        Ok(copy)
    }

    /// Copies `source` into a new container-less root.
    ///
    /// With `empty`, only the entity's own values are copied.
    pub fn duplicate(&mut self, source: EntityId, empty: bool) -> StoreResult<EntityId> {
        self.copy_entity(source, None, empty)
    }

    /// Moves `entity` within its own container.
    ///
    /// After the call the entity sits at `new_index`, clamped to the last
    /// position; `None` moves it to the end. Returns the final position.
    ///
    /// # Errors
    /// - `UnknownEntity` when `entity` is not live.
    /// - `NoContainer` when `entity` is a root.
    pub fn move_to(&mut self, entity: EntityId, new_index: Option<usize>) -> StoreResult<usize> {
        let container = self
            .require(entity)?
            .container
            .ok_or(StoreError::NoContainer(entity))?;
        let old = self.index(entity).ok_or(StoreError::NoContainer(entity))?;
        let node = self
            .node_mut(container)
            .ok_or(StoreError::UnknownEntity(container))?;
        let last = node.elements.len().saturating_sub(1);
        let target = new_index.unwrap_or(last).min(last);
        if target == old {
            return Ok(old);
        }
        node.elements.remove(old);
        node.elements.insert(target, entity);
        self.resync_indices(container, old.min(target), old.max(target) + 1);
        debug!(
            "event=entity_moved module=store from={} to={}",
            old, target
        );
        Ok(target)
    }

    /// Removes `entity` and every structural descendant.
    ///
    /// Descendants go first, deepest first. Returns the removed values; any
    /// contained elements are destroyed with it.
    ///
    /// # Errors
    /// - `UnknownEntity` when `entity` is not live.
    /// - `NoContainer` when `entity` is a root.
    pub fn remove(&mut self, entity: EntityId) -> StoreResult<Entity> {
        let value = self.require(entity)?.entity.clone();
        let kind = value.kind();
        if self.container(entity).is_none() {
            return Err(StoreError::NoContainer(entity));
        }
        let descendants: Vec<EntityId> = self.all_children(entity, &[]).collect();
        for descendant in descendants.iter().rev() {
            if self.contains(*descendant) {
                self.excise(*descendant)?;
            }
        }
        // A descendant may contain `entity` and have destroyed it already.
        let removed = if self.contains(entity) {
            self.excise(entity)?
        } else {
            value
        };
        debug!(
            "event=entity_removed module=store kind={} descendants={}",
            kind,
            descendants.len()
        );
        Ok(removed)
    }

    /// Removes the element at `index` of `container`.
    pub fn pop(&mut self, container: EntityId, index: usize) -> Option<Entity> {
        let id = self.get_index(container, index)?;
        self.remove(id).ok()
    }

    /// Removes the first element of `container` named `name`.
    pub fn rem_name(&mut self, container: EntityId, name: &str) -> Option<Entity> {
        let id = self.get_name(container, name)?;
        self.remove(id).ok()
    }

    /// Detaches `entity` from the structural graph and its container without
    /// touching its structural descendants.
    pub(crate) fn excise(&mut self, entity: EntityId) -> StoreResult<Entity> {
        self.require(entity)?;
        let container = self.container(entity);
        let position = self.index(entity);
        self.unlink_all(entity);
        self.links.remove(&entity);
        if let (Some(container), Some(position)) = (container, position) {
            if let Some(node) = self.node_mut(container) {
                node.elements.remove(position);
            }
            self.resync_indices(container, position, usize::MAX);
        }
        self.purge_contents(entity);
        self.nodes
            .get_mut(entity.index())
            .and_then(Option::take)
            .map(|node| node.entity)
            .ok_or(StoreError::UnknownEntity(entity))
    }

    /// Rewrites the link-table index of `container`'s elements in
    /// `[from, to)`.
    pub(crate) fn resync_indices(&self, container: EntityId, from: usize, to: usize) {
        let elements = self.elements(container);
        let to = to.min(elements.len());
        for (position, element) in elements.iter().enumerate().take(to).skip(from) {
            if let Some(record) = self.links.get(element) {
                record.index.set(position);
            }
        }
    }

    /// Inserts an allocated entity into `container` and registers its link
    /// record. Returns the position used.
    pub(crate) fn insert_element(
        &mut self,
        container: EntityId,
        index: Option<usize>,
        id: EntityId,
    ) -> StoreResult<usize> {
        let node = self
            .node_mut(container)
            .ok_or(StoreError::UnknownEntity(container))?;
        let len = node.elements.len();
        let position = index.map_or(len, |index| index.min(len));
        node.elements.insert(position, id);
        if let Some(child) = self.node_mut(id) {
            child.container = Some(container);
        }
        self.links.insert(id, LinkRecord::new(position));
        self.resync_indices(container, position + 1, usize::MAX);
        Ok(position)
    }

    /// Copies the values and containment subtree of `source`.
    ///
    /// The copy is allocated with `container` as owner but is not inserted
    /// into that container's elements.
    pub(crate) fn copy_entity(
        &mut self,
        source: EntityId,
        container: Option<EntityId>,
        empty: bool,
    ) -> StoreResult<EntityId> {
        let entity = self.require(source)?.entity.clone();
        let copy = self.alloc(entity, container);
        if empty {
            return Ok(copy);
        }
        let elements = self.elements(source).to_vec();
        let mut mapping = Vec::with_capacity(elements.len());
        for element in elements {
            let element_copy = self.copy_entity(element, Some(copy), false)?;
            self.insert_element(copy, None, element_copy)?;
            mapping.push((element, element_copy));
        }
        levels::remap_copied_links(self, source, copy, &mapping)?;
        Ok(copy)
    }

    /// Severs every structural link touching `entity`, keeping its record.
    fn unlink_all(&mut self, entity: EntityId) {
        let Some(record) = self.links.get_mut(&entity) else {
            return;
        };
        let parent = record.parent.take();
        let children = std::mem::take(&mut record.children);
        if let Some(parent) = parent {
            if let Some(parent_record) = self.links.get_mut(&parent) {
                parent_record.children.retain(|child| *child != entity);
            }
        }
        for child in children {
            if let Some(child_record) = self.links.get_mut(&child) {
                if child_record.parent == Some(entity) {
                    child_record.parent = None;
                }
            }
        }
    }

    /// Destroys the containment subtree below `entity`.
    fn purge_contents(&mut self, entity: EntityId) {
        let mut stack = match self.node_mut(entity) {
            Some(node) => std::mem::take(&mut node.elements),
            None => return,
        };
        while let Some(element) = stack.pop() {
            self.unlink_all(element);
            self.links.remove(&element);
            if let Some(node) = self.nodes.get_mut(element.index()).and_then(Option::take) {
                stack.extend(node.elements);
            }
        }
    }
}
