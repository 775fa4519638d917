//! Node factories keyed by type tag
//!
//! A level importer hands over entity records; the table maps each record's
//! tag to a constructor registered at startup. No runtime type discovery.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::SimError;
use super::node::{NodeConfig, NodeId, NodeKind, StaticBody};
use super::scene::Scene;
use super::shape::{Rect, Shape};

/// One entity as produced by a level importer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Factory key
    pub tag: String,
    #[serde(default)]
    pub name: Option<String>,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    /// Custom per-entity values; copied into the node's metadata
    #[serde(default)]
    pub values: Map<String, Value>,
    #[serde(skip)]
    pub parent: Option<NodeId>,
    /// Extra instances of the same entity, parented to the first one
    #[serde(default)]
    pub nodes: Vec<Vec2>,
}

impl SpawnRequest {
    /// Parse one importer record
    pub fn from_value(value: Value) -> Result<Self, SimError> {
        serde_json::from_value(value).map_err(|e| SimError::InvalidRequest(e.to_string()))
    }

    /// Region covered by the entity
    pub fn region(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn bool_value(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// Base config shared by every built-in factory
    pub fn base_config(&self, kind: NodeKind) -> NodeConfig {
        let mut config = NodeConfig::new(kind).with_shape(self.region());
        config.name = self.name.clone();
        config.type_tag = Some(self.tag.clone());
        config.parent = self.parent;
        config.metadata = self.values.clone();
        config
    }
}

pub type Factory = Box<dyn Fn(&SpawnRequest) -> Result<NodeConfig, SimError>>;

/// Type tag to constructor table
#[derive(Default)]
pub struct FactoryTable {
    factories: HashMap<String, Factory>,
}

impl FactoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with `Node`, `Area`, `StaticBody` and `KinematicBody` registered
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.register("Node", |req| Ok(req.base_config(NodeKind::Plain)));
        table.register("Area", |req| Ok(req.base_config(NodeKind::area())));
        table.register("StaticBody", |req| {
            let body = StaticBody {
                enabled: req.bool_value("collidable").unwrap_or(true),
                one_way: req.bool_value("one_way").unwrap_or(false),
            };
            Ok(req.base_config(NodeKind::StaticBody(body)))
        });
        table.register("KinematicBody", |req| {
            Ok(req.base_config(NodeKind::kinematic()))
        });
        table
    }

    /// Register a constructor, replacing any previous one for the tag
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn(&SpawnRequest) -> Result<NodeConfig, SimError> + 'static,
    {
        let tag = tag.into();
        if self.factories.insert(tag.clone(), Box::new(factory)).is_some() {
            log::debug!("factory for '{tag}' replaced");
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Build the request's node plus one child per extra point
    ///
    /// Returns the primary node first. All or nothing: if any instance fails,
    /// the ones already created are discarded before the error is returned.
    pub fn spawn(&self, scene: &mut Scene, request: &SpawnRequest) -> Result<Vec<NodeId>, SimError> {
        let factory = self
            .factories
            .get(&request.tag)
            .ok_or_else(|| SimError::UnknownType(request.tag.clone()))?;

        let primary = scene.create_node(factory(request)?)?;
        let mut spawned = vec![primary];
        if let Err(err) = Self::spawn_extras(factory, scene, request, primary, &mut spawned) {
            log::debug!("spawn of '{}' failed, discarding {} nodes", request.tag, spawned.len());
            for &id in spawned.iter().rev() {
                scene.discard_pending(id);
            }
            return Err(err);
        }
        Ok(spawned)
    }

    fn spawn_extras(
        factory: &Factory,
        scene: &mut Scene,
        request: &SpawnRequest,
        primary: NodeId,
        spawned: &mut Vec<NodeId>,
    ) -> Result<(), SimError> {
        for (i, point) in request.nodes.iter().enumerate() {
            let mut extra = request.clone();
            extra.name = request.name.as_ref().map(|name| format!("{name}_{}", i + 1));
            extra.x = point.x;
            extra.y = point.y;
            extra.parent = Some(primary);
            extra.nodes.clear();
            let mut config = factory(&extra)?;
            config.shape = Some(Shape::from(extra.region()));
            spawned.push(scene.create_node(config)?);
        }
        Ok(())
    }
}
