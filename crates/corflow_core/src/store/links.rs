//! Structural link mutation.
//!
//! # Invariants
//! - Every public mutation updates both the child's `parent` and the
//!   parent's `children`.
//! - A child appears at most once in a parent's `children`.
//! - Links are only recorded between attached entities.

use super::{AnnotationGraph, StoreError, StoreResult};
use crate::model::entity::EntityId;
use log::{debug, warn};

impl AnnotationGraph {
    /// Sets (or clears, with `None`) the structural parent of `child`.
    ///
    /// The old parent loses `child` from its children first.
    ///
    /// # Errors
    /// - `UnknownEntity` for dead handles.
    /// - `NoContainer` when `child` or `parent` is unattached.
    /// - `CycleDetected` when `parent` is `child` or one of its descendants.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> StoreResult<()> {
        self.ensure_linkable(child)?;
        if let Some(parent) = parent {
            self.ensure_linkable(parent)?;
            if self.is_ancestor_or_self(child, parent) {
                warn!(
                    "event=link_rejected module=store reason=cycle child={} parent={}",
                    child, parent
                );
                return Err(StoreError::CycleDetected { child, parent });
            }
        }

        let old = self.parent(child);
        if old == parent {
            return Ok(());
        }
        if let Some(old) = old {
            self.drop_child_side(old, child);
        }
        self.set_parent_side(child, parent);
        if let Some(parent) = parent {
            self.push_child_side(parent, child);
        }
        debug!(
            "event=link_set module=store child={} parent={}",
            child,
            parent.map_or_else(|| "none".to_string(), |id| id.to_string())
        );
        Ok(())
    }

    /// Makes `child` a structural child of `parent`.
    ///
    /// Same checks as `set_parent`.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> StoreResult<()> {
        self.set_parent(child, Some(parent))
    }

    /// Unlinks `child` from `parent`. Returns whether a link existed.
    pub fn rem_child(&mut self, parent: EntityId, child: EntityId) -> StoreResult<bool> {
        self.ensure_linkable(parent)?;
        let listed = self
            .record(parent)
            .is_some_and(|record| record.children.contains(&child));
        if !listed {
            return Ok(false);
        }
        self.drop_child_side(parent, child);
        if self.parent(child) == Some(parent) {
            self.set_parent_side(child, None);
        }
        Ok(true)
    }

    /// Unlinks every structural child of `parent` and returns them.
    pub fn clear_children(&mut self, parent: EntityId) -> StoreResult<Vec<EntityId>> {
        self.ensure_linkable(parent)?;
        let children = match self.record_mut(parent) {
            Some(record) => std::mem::take(&mut record.children),
            None => Vec::new(),
        };
        for child in &children {
            if self.parent(*child) == Some(parent) {
                self.set_parent_side(*child, None);
            }
        }
        Ok(children)
    }

    fn ensure_linkable(&self, id: EntityId) -> StoreResult<()> {
        self.require(id)?;
        if !self.is_linked(id) {
            warn!(
                "event=link_rejected module=store reason=no_container entity={}",
                id
            );
            return Err(StoreError::NoContainer(id));
        }
        Ok(())
    }

    /// Whether `node` is `candidate` or one of its structural ancestors.
    pub(crate) fn is_ancestor_or_self(&self, node: EntityId, candidate: EntityId) -> bool {
        let mut cursor = Some(candidate);
        while let Some(current) = cursor {
            if current == node {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn set_parent_side(&mut self, child: EntityId, parent: Option<EntityId>) {
        if let Some(record) = self.record_mut(child) {
            record.parent = parent;
        }
    }

    fn push_child_side(&mut self, parent: EntityId, child: EntityId) {
        if let Some(record) = self.record_mut(parent) {
            if !record.children.contains(&child) {
                record.children.push(child);
            }
        }
    }

    fn drop_child_side(&mut self, parent: EntityId, child: EntityId) {
        if let Some(record) = self.record_mut(parent) {
            record.children.retain(|current| *current != child);
        }
    }
}
