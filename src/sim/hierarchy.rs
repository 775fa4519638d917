//! Parent/child links and position propagation
//!
//! Every node keeps an explicit child list. Moving a node applies the same
//! delta once to each descendant, and reparenting refuses to close a cycle.

use glam::Vec2;

use super::error::{SimError, ensure_finite};
use super::node::NodeId;
use super::scene::Scene;

impl Scene {
    pub fn position(&self, id: NodeId) -> Result<Vec2, SimError> {
        Ok(self.node(id)?.position())
    }

    /// Move a node and carry its whole subtree along
    ///
    /// Nothing moves unless every new position in the subtree is finite.
    pub fn set_position(&mut self, id: NodeId, position: Vec2) -> Result<(), SimError> {
        ensure_finite(position, "position")?;
        let delta = position - self.position(id)?;
        let shifted = if delta == Vec2::ZERO {
            Vec::new()
        } else {
            self.shifted_descendants(id, delta)?
        };

        self.node_mut(id)?.place(position);
        for (child, child_position) in shifted {
            if let Some(node) = self.get_mut(child) {
                node.place(child_position);
            }
        }
        Ok(())
    }

    pub fn translate(&mut self, id: NodeId, delta: Vec2) -> Result<(), SimError> {
        ensure_finite(delta, "translation")?;
        let position = self.position(id)?;
        self.set_position(id, position + delta)
    }

    /// Parent of `id`, if both are still registered
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent().filter(|&p| self.contains(p))
    }

    /// Direct children; empty for unknown nodes
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children()).unwrap_or(&[])
    }

    /// Every node below `id`, depth first, in child order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// True when `ancestor` sits somewhere above `id`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            cursor = self.parent(p);
        }
        false
    }

    /// Attach `id` under `parent`, or detach it with `None`
    ///
    /// Positions are left as they are; only later moves propagate.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<(), SimError> {
        self.node(id)?;
        if let Some(p) = parent {
            self.node(p)?;
            if p == id || self.is_ancestor(id, p) {
                return Err(SimError::CyclicParent { child: id, parent: p });
            }
        }

        let old = self.node(id)?.parent;
        if old == parent {
            return Ok(());
        }
        if let Some(old) = old.and_then(|p| self.get_mut(p)) {
            old.children.retain(|&c| c != id);
        }
        if let Some(new) = parent.and_then(|p| self.get_mut(p)) {
            new.children.push(id);
        }
        self.node_mut(id)?.parent = parent;
        Ok(())
    }

    /// New position of every descendant after moving `id` by `delta`
    fn shifted_descendants(&self, id: NodeId, delta: Vec2) -> Result<Vec<(NodeId, Vec2)>, SimError> {
        let mut shifted = Vec::new();
        let mut stack = self.children(id).to_vec();
        while let Some(child) = stack.pop() {
            let Some(node) = self.get(child) else {
                continue;
            };
            let position = ensure_finite(node.position() + delta, "position")?;
            shifted.push((child, position));
            stack.extend_from_slice(node.children());
        }
        Ok(shifted)
    }
}
