//! Node registry and lifecycle passes
//!
//! The scene owns every node in a generational arena. Creation and removal
//! are deferred: new nodes wait in a pending-add queue and removal requests in
//! a pending-remove queue until the next flush. Load, Unload and Update flush
//! before iterating; Draw is read-only and sees the live list as of the last
//! flush, so a node spawned during Update is first drawn on the next frame.

use std::any::Any;
use std::collections::HashMap;

use super::error::SimError;
use super::node::{DrawSink, Metadata, Node, NodeConfig, NodeId, NodeKind, NodeState};
use super::shape::Shape;
use crate::settings::{DuplicateNamePolicy, SimSettings};

/// Arena slot; the generation is bumped whenever the occupant is excised
#[derive(Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pass {
    Load,
    Unload,
    Update(f32),
}

impl Pass {
    fn label(&self) -> &'static str {
        match self {
            Pass::Load => "load",
            Pass::Unload => "unload",
            Pass::Update(_) => "update",
        }
    }
}

/// Derived per-kind list a live node is registered in
#[derive(Debug, Clone, Copy)]
enum View {
    Areas,
    StaticBodies,
    KinematicBodies,
}

impl View {
    fn of(kind: &NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Plain => None,
            NodeKind::Area(_) => Some(View::Areas),
            NodeKind::StaticBody(_) => Some(View::StaticBodies),
            NodeKind::KinematicBody(_) => Some(View::KinematicBodies),
        }
    }
}

/// Owned simulation context: node arena, live list, name index and the
/// derived per-kind views used by queries
pub struct Scene {
    settings: SimSettings,
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    /// Live nodes in insertion order
    live: Vec<NodeId>,
    pending_add: Vec<NodeId>,
    pending_remove: Vec<NodeId>,
    names: HashMap<String, NodeId>,
    /// Live areas in registration order
    pub(crate) areas: Vec<NodeId>,
    pub(crate) static_bodies: Vec<NodeId>,
    pub(crate) kinematic_bodies: Vec<NodeId>,
    in_pass: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            settings: SimSettings::default(),
            slots: Vec::new(),
            free_slots: Vec::new(),
            live: Vec::new(),
            pending_add: Vec::new(),
            pending_remove: Vec::new(),
            names: HashMap::new(),
            areas: Vec::new(),
            static_bodies: Vec::new(),
            kinematic_bodies: Vec::new(),
            in_pass: false,
        }
    }

    pub fn with_settings(settings: SimSettings) -> Result<Self, SimError> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::new()
        })
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// The node behind `id`, if it is still registered (pending, live or freeing)
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, SimError> {
        self.get(id).ok_or(SimError::StaleNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SimError> {
        self.get_mut(id).ok_or(SimError::StaleNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_live)
    }

    /// Node registered under `name`
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Live nodes in the order passes visit them
    pub fn live(&self) -> &[NodeId] {
        &self.live
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn pending_additions(&self) -> usize {
        self.pending_add.len()
    }

    pub fn pending_removals(&self) -> usize {
        self.pending_remove.len()
    }

    /// True while a load, unload or update pass is running
    pub fn in_pass(&self) -> bool {
        self.in_pass
    }

    pub fn metadata_mut(&mut self, id: NodeId) -> Result<&mut Metadata, SimError> {
        Ok(&mut self.node_mut(id)?.metadata)
    }

    /// Typed payload handed over in the node's config
    pub fn payload<T: Any>(&self, id: NodeId) -> Result<&T, SimError> {
        self.node(id)?
            .payload
            .as_ref()
            .and_then(|p| p.downcast_ref::<T>())
            .ok_or(SimError::PayloadType {
                id,
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn payload_mut<T: Any>(&mut self, id: NodeId) -> Result<&mut T, SimError> {
        self.node_mut(id)?
            .payload
            .as_mut()
            .and_then(|p| p.downcast_mut::<T>())
            .ok_or(SimError::PayloadType {
                id,
                expected: std::any::type_name::<T>(),
            })
    }

    // =========================================================================
    // Creation and removal
    // =========================================================================

    /// Construct a node; it becomes live at the next flush
    pub fn create_node(&mut self, config: NodeConfig) -> Result<NodeId, SimError> {
        config.validate()?;
        if let Some(parent) = config.parent {
            self.node(parent)?;
        }
        let name = config
            .name
            .clone()
            .or_else(|| config.type_tag.clone())
            .unwrap_or_else(|| config.kind.type_tag().to_string());
        self.check_name(&name)?;

        let id = self.allocate();
        let node = Node::from_config(id, config);
        let parent = node.parent;
        self.slots[id.index() as usize].node = Some(node);

        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.children.push(id);
        }
        self.names.insert(name, id);
        self.pending_add.push(id);
        log::trace!("queued node {id} for addition");
        Ok(id)
    }

    /// Change a node's name and its name-index entry
    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), SimError> {
        let name = name.into();
        let old = self.node(id)?.name().to_string();
        if old == name {
            return Ok(());
        }
        self.check_name(&name)?;
        if self.names.get(&old) == Some(&id) {
            self.names.remove(&old);
        }
        self.node_mut(id)?.set_name(name.clone());
        self.names.insert(name, id);
        Ok(())
    }

    /// Replace a node's shape; the new shape snaps to the node's position
    pub fn set_shape(&mut self, id: NodeId, shape: Shape) -> Result<(), SimError> {
        shape.validate()?;
        self.node_mut(id)?.replace_shape(Some(shape));
        Ok(())
    }

    /// Request removal at the next flush. Unknown or already freeing nodes
    /// are ignored.
    pub fn queue_free(&mut self, id: NodeId) {
        let Some(node) = self.get_mut(id) else {
            return;
        };
        if node.state == NodeState::Freeing {
            return;
        }
        node.state = NodeState::Freeing;
        self.pending_remove.push(id);
    }

    /// Remove a node right away. Inside a pass this degrades to
    /// [`queue_free`](Self::queue_free) so the running iteration never sees a
    /// vanished node.
    pub fn free_immediate(&mut self, id: NodeId) {
        if self.in_pass {
            log::debug!("free_immediate({id}) during a pass, deferring to next flush");
            self.queue_free(id);
            return;
        }
        self.excise(id);
    }

    /// Drop a node that has not been flushed yet. Pending nodes are not in
    /// the live list, so this is safe even inside a pass.
    pub(crate) fn discard_pending(&mut self, id: NodeId) {
        if self.get(id).is_some_and(|n| n.state == NodeState::Pending) {
            self.excise(id);
        }
    }

    /// Apply pending additions then pending removals
    pub fn flush(&mut self) {
        if self.in_pass {
            log::debug!("flush requested during a pass, ignored");
            return;
        }
        if self.pending_add.is_empty() && self.pending_remove.is_empty() {
            return;
        }

        let added = std::mem::take(&mut self.pending_add);
        let mut activated = 0;
        for id in added {
            let view = match self.get_mut(id) {
                Some(node) if node.state == NodeState::Pending => {
                    node.state = NodeState::Live;
                    View::of(&node.kind)
                }
                _ => continue,
            };
            match view {
                Some(View::Areas) => self.areas.push(id),
                Some(View::StaticBodies) => self.static_bodies.push(id),
                Some(View::KinematicBodies) => self.kinematic_bodies.push(id),
                None => {}
            }
            self.live.push(id);
            activated += 1;
        }

        let removed = std::mem::take(&mut self.pending_remove);
        let excised = removed.len();
        for id in removed {
            self.excise(id);
        }

        log::debug!(
            "flush: {activated} added, {excised} removed, {} live",
            self.live.len()
        );
    }

    // =========================================================================
    // Lifecycle passes
    // =========================================================================

    /// Flush, then call `load` on every live node. Returns the number visited.
    pub fn load(&mut self) -> Result<usize, SimError> {
        self.run_pass(Pass::Load)
    }

    pub fn unload(&mut self) -> Result<usize, SimError> {
        self.run_pass(Pass::Unload)
    }

    pub fn update(&mut self, dt: f32) -> Result<usize, SimError> {
        let dt = super::error::ensure_delta(dt)?;
        self.run_pass(Pass::Update(dt))
    }

    /// Hand every live node to its behavior's draw hook (or straight to the
    /// sink when it has none). No flush happens here.
    pub fn draw(&self, sink: &mut dyn DrawSink) -> usize {
        let mut drawn = 0;
        for &id in &self.live {
            let Some(node) = self.get(id) else {
                continue;
            };
            if !node.is_live() {
                continue;
            }
            match &node.behavior {
                Some(behavior) => behavior.draw(node, sink),
                None => sink.draw_node(node),
            }
            drawn += 1;
        }
        drawn
    }

    fn run_pass(&mut self, pass: Pass) -> Result<usize, SimError> {
        if self.in_pass {
            return Err(SimError::ReentrantPass);
        }
        self.flush();
        self.in_pass = true;

        let snapshot = self.live.clone();
        let mut visited = 0;
        for id in snapshot {
            // Nodes freed earlier in this pass are skipped
            let Some(node) = self.get_mut(id) else {
                continue;
            };
            if !node.is_live() {
                continue;
            }
            visited += 1;
            let Some(mut behavior) = node.behavior.take() else {
                continue;
            };

            let result = match pass {
                Pass::Load => behavior.load(id, self),
                Pass::Unload => behavior.unload(id, self),
                Pass::Update(dt) => behavior.update(id, self, dt),
            };
            if let Err(err) = result {
                log::warn!("{} callback failed for node {id}: {err}", pass.label());
            }

            if let Some(node) = self.get_mut(id) {
                node.behavior = Some(behavior);
            }
        }

        self.in_pass = false;
        Ok(visited)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn allocate(&mut self) -> NodeId {
        if let Some(index) = self.free_slots.pop() {
            NodeId::new(index, self.slots[index as usize].generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::default());
            NodeId::new(index, 0)
        }
    }

    fn check_name(&self, name: &str) -> Result<(), SimError> {
        let Some(existing) = self.find(name) else {
            return Ok(());
        };
        match self.settings.duplicate_names {
            DuplicateNamePolicy::Reject => Err(SimError::DuplicateName(name.to_string())),
            DuplicateNamePolicy::LastWriteWins => {
                log::warn!("node name '{name}' already used by {existing}, lookup now returns the newer node");
                Ok(())
            }
        }
    }

    /// Drop a node from every list and release its slot
    fn excise(&mut self, id: NodeId) {
        let Some(slot) = self.slots.get_mut(id.index() as usize) else {
            return;
        };
        if slot.generation != id.generation() {
            return;
        }
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index());

        self.live.retain(|&n| n != id);
        self.pending_add.retain(|&n| n != id);
        self.pending_remove.retain(|&n| n != id);
        self.areas.retain(|&n| n != id);
        self.static_bodies.retain(|&n| n != id);
        self.kinematic_bodies.retain(|&n| n != id);

        if self.names.get(node.name()) == Some(&id) {
            self.names.remove(node.name());
        }
        if let Some(parent) = node.parent.and_then(|p| self.get_mut(p)) {
            parent.children.retain(|&c| c != id);
        }
        // Parent links are weak: children outlive their parent as roots
        for child in &node.children {
            if let Some(child) = self.get_mut(*child) {
                child.parent = None;
            }
        }
        log::trace!("excised node {id} ('{}')", node.name());
    }
}
