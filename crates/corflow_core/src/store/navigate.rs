//! Read-only navigation over the structural graph.

use super::AnnotationGraph;
use crate::model::entity::EntityId;

impl AnnotationGraph {
    /// Direct structural parent.
    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.record(id).and_then(|record| record.parent)
    }

    /// Direct structural children, optionally only those owned by `within`.
    pub fn children(&self, id: EntityId, within: Option<EntityId>) -> Vec<EntityId> {
        self.structural_children(id)
            .iter()
            .copied()
            .filter(|child| within.map_or(true, |container| self.container(*child) == Some(container)))
            .collect()
    }

    /// Direct structural children grouped by owning container, groups in
    /// first-seen order.
    pub fn child_groups(&self, id: EntityId) -> Vec<(EntityId, Vec<EntityId>)> {
        let mut groups: Vec<(EntityId, Vec<EntityId>)> = Vec::new();
        for child in self.structural_children(id) {
            let Some(container) = self.container(*child) else {
                continue;
            };
            match groups.iter_mut().find(|(current, _)| *current == container) {
                Some((_, members)) => members.push(*child),
                None => groups.push((container, vec![*child])),
            }
        }
        groups
    }

    /// Structural ancestors, top-most first.
    ///
    /// With `stop_at`, the walk ends at the first ancestor owned by that
    /// container (that ancestor included).
    pub fn parents(&self, id: EntityId, stop_at: Option<EntityId>) -> Vec<EntityId> {
        let mut ancestors = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            ancestors.push(current);
            if stop_at.is_some() && self.container(current) == stop_at {
                break;
            }
            cursor = self.parent(current);
        }
        ancestors.reverse();
        ancestors
    }

    /// The top-most ancestor followed by its whole structural subtree,
    /// excluding entities that share `id`'s container.
    pub fn all_parents(&self, id: EntityId, stop_at: Option<EntityId>) -> Vec<EntityId> {
        let ancestors = self.parents(id, stop_at);
        let Some(top) = ancestors.first().copied() else {
            return Vec::new();
        };
        let stop: Vec<EntityId> = self.container(id).into_iter().collect();
        std::iter::once(top)
            .chain(self.all_children(top, &stop))
            .collect()
    }

    /// Depth-first, pre-order walk over every structural descendant.
    ///
    /// Children owned by a container in `stop` are skipped together with
    /// their own subtrees.
    pub fn all_children(&self, id: EntityId, stop: &[EntityId]) -> AllChildren<'_> {
        AllChildren {
            graph: self,
            stack: vec![(self.structural_children(id), 0)],
            stop: stop.to_vec(),
        }
    }

    /// Direct ancestors, `id`, then direct children.
    pub fn tree(&self, id: EntityId) -> Vec<EntityId> {
        let mut out = self.parents(id, None);
        out.push(id);
        out.extend(self.children(id, None));
        out
    }

    /// `all_parents`, `id`, then `all_children`.
    pub fn all_tree(&self, id: EntityId) -> Vec<EntityId> {
        let mut out = self.all_parents(id, None);
        out.push(id);
        out.extend(self.all_children(id, &[]));
        out
    }

    pub(crate) fn structural_children(&self, id: EntityId) -> &[EntityId] {
        self.record(id)
            .map(|record| record.children.as_slice())
            .unwrap_or(&[])
    }
}

/// Explicit-stack iterator returned by `AnnotationGraph::all_children`.
pub struct AllChildren<'a> {
    graph: &'a AnnotationGraph,
    stack: Vec<(&'a [EntityId], usize)>,
    stop: Vec<EntityId>,
}

impl Iterator for AllChildren<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        loop {
            let (siblings, cursor) = *self.stack.last()?;
            let Some(child) = siblings.get(cursor).copied() else {
                self.stack.pop();
                continue;
            };
            if let Some(frame) = self.stack.last_mut() {
                frame.1 += 1;
            }
            let pruned = self
                .graph
                .container(child)
                .is_some_and(|container| self.stop.contains(&container));
            if pruned {
                continue;
            }
            let grandchildren = self.graph.structural_children(child);
            if !grandchildren.is_empty() {
                self.stack.push((grandchildren, 0));
            }
            return Some(child);
        }
    }
}
