//! Nodes, their handles and the configuration used to build them
//!
//! A node is identified by a generational [`NodeId`]. When a node is excised
//! its slot can be reused, but the generation bump makes every old handle
//! stale instead of silently aliasing the new occupant.

use std::any::Any;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::area::AreaState;
use super::error::SimError;
use super::kinematic::KinematicBody;
use super::scene::Scene;
use super::shape::Shape;

/// Free-form per-node metadata read by renderers and gameplay code
pub type Metadata = Map<String, Value>;

/// Handle to a node in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Immovable collision geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticBody {
    /// Disabled bodies are ignored by every collision query
    pub enabled: bool,
    /// Blocks only downward movement from above (jump-through platform)
    pub one_way: bool,
}

impl Default for StaticBody {
    fn default() -> Self {
        Self {
            enabled: true,
            one_way: false,
        }
    }
}

/// Simulation role of a node
#[derive(Debug, Clone, Default)]
pub enum NodeKind {
    /// Carries a position (and optionally a shape) but takes part in no queries
    #[default]
    Plain,
    /// Overlap tracker
    Area(AreaState),
    StaticBody(StaticBody),
    KinematicBody(KinematicBody),
}

impl NodeKind {
    pub fn area() -> Self {
        NodeKind::Area(AreaState::default())
    }

    pub fn static_body() -> Self {
        NodeKind::StaticBody(StaticBody::default())
    }

    pub fn kinematic() -> Self {
        NodeKind::KinematicBody(KinematicBody::default())
    }

    /// Default name and factory key for the kind
    pub fn type_tag(&self) -> &'static str {
        match self {
            NodeKind::Plain => "Node",
            NodeKind::Area(_) => "Area",
            NodeKind::StaticBody(_) => "StaticBody",
            NodeKind::KinematicBody(_) => "KinematicBody",
        }
    }

    fn requires_shape(&self) -> bool {
        !matches!(self, NodeKind::Plain)
    }
}

/// Where a node is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Created, waiting for the next flush
    Pending,
    /// In the live list and visited by lifecycle passes
    Live,
    /// Removal requested, excised at the next flush
    Freeing,
}

/// Gameplay callbacks invoked by the lifecycle passes
///
/// The behavior is detached from its node while a callback runs, so the
/// callback gets full mutable access to the scene. Nodes created or freed from
/// here are queued until the next flush.
pub trait NodeBehavior {
    fn load(&mut self, _id: NodeId, _scene: &mut Scene) -> Result<(), SimError> {
        Ok(())
    }

    fn unload(&mut self, _id: NodeId, _scene: &mut Scene) -> Result<(), SimError> {
        Ok(())
    }

    fn update(&mut self, _id: NodeId, _scene: &mut Scene, _dt: f32) -> Result<(), SimError> {
        Ok(())
    }

    /// Read-only; by default hands the node to the sink as is
    fn draw(&self, node: &Node, sink: &mut dyn DrawSink) {
        sink.draw_node(node);
    }
}

/// Receiver for the draw pass (the renderer lives outside this crate)
pub trait DrawSink {
    fn draw_node(&mut self, node: &Node);
}

/// Snapshot of what the draw pass handed over for one node
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub id: NodeId,
    pub name: String,
    pub position: Vec2,
    pub shape: Option<Shape>,
}

impl DrawSink for Vec<DrawItem> {
    fn draw_node(&mut self, node: &Node) {
        self.push(DrawItem {
            id: node.id(),
            name: node.name().to_string(),
            position: node.position(),
            shape: node.shape().copied(),
        });
    }
}

/// Everything needed to construct a node
///
/// When a shape is given its location wins over `position`, matching how
/// importers hand over level regions.
#[derive(Default)]
pub struct NodeConfig {
    pub name: Option<String>,
    /// Overrides the kind's tag (set by factories)
    pub type_tag: Option<String>,
    pub parent: Option<NodeId>,
    pub shape: Option<Shape>,
    pub position: Option<Vec2>,
    pub kind: NodeKind,
    pub metadata: Metadata,
    pub payload: Option<Box<dyn Any>>,
    pub behavior: Option<Box<dyn NodeBehavior>>,
}

impl NodeConfig {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_shape(mut self, shape: impl Into<Shape>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn child_of(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_behavior(mut self, behavior: impl NodeBehavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    pub fn with_payload<T: Any>(mut self, payload: T) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check the configuration before anything is allocated
    pub(crate) fn validate(&self) -> Result<(), SimError> {
        match &self.shape {
            Some(shape) => shape.validate()?,
            None if self.kind.requires_shape() => {
                return Err(SimError::MissingShape {
                    kind: self.kind.type_tag(),
                });
            }
            None => {}
        }
        if let Some(position) = self.position {
            super::error::ensure_finite(position, "position")?;
        }
        Ok(())
    }
}

/// A node owned by a [`Scene`]
pub struct Node {
    id: NodeId,
    name: String,
    type_tag: String,
    position: Vec2,
    shape: Option<Shape>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) state: NodeState,
    pub metadata: Metadata,
    pub(crate) payload: Option<Box<dyn Any>>,
    pub(crate) behavior: Option<Box<dyn NodeBehavior>>,
}

impl Node {
    /// Build from an already validated config
    pub(crate) fn from_config(id: NodeId, config: NodeConfig) -> Self {
        let type_tag = config
            .type_tag
            .unwrap_or_else(|| config.kind.type_tag().to_string());
        let name = config.name.unwrap_or_else(|| type_tag.clone());
        let position = match &config.shape {
            Some(shape) => shape.location(),
            None => config.position.unwrap_or(Vec2::ZERO),
        };

        let mut node = Self {
            id,
            name,
            type_tag,
            position,
            shape: config.shape,
            parent: config.parent,
            children: Vec::new(),
            kind: config.kind,
            state: NodeState::Pending,
            metadata: config.metadata,
            payload: config.payload,
            behavior: config.behavior,
        };
        node.place(position);
        node
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == NodeState::Live
    }

    /// Set position without touching descendants; keeps the shape on the
    /// nearest integer coordinate
    pub(crate) fn place(&mut self, position: Vec2) {
        self.position = position;
        if let Some(shape) = self.shape.as_mut() {
            shape.set_location(crate::snap(position));
        }
    }

    pub(crate) fn replace_shape(&mut self, shape: Option<Shape>) {
        self.shape = shape;
        let position = self.position;
        self.place(position);
    }

    pub fn static_body(&self) -> Option<&StaticBody> {
        match &self.kind {
            NodeKind::StaticBody(body) => Some(body),
            _ => None,
        }
    }

    pub fn kinematic(&self) -> Option<&KinematicBody> {
        match &self.kind {
            NodeKind::KinematicBody(body) => Some(body),
            _ => None,
        }
    }

    pub fn area(&self) -> Option<&AreaState> {
        match &self.kind {
            NodeKind::Area(area) => Some(area),
            _ => None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type_tag", &self.type_tag)
            .field("position", &self.position)
            .field("shape", &self.shape)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
