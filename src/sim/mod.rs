//! Deterministic scene simulation module
//!
//! All node bookkeeping and movement lives here:
//! - Fixed timestep only
//! - Stable iteration order (registration order, never hash order)
//! - Structural changes deferred to flush points
//! - No rendering or platform dependencies

pub mod area;
pub mod clock;
pub mod error;
pub mod factory;
pub mod hierarchy;
pub mod kinematic;
pub mod node;
pub mod scene;
pub mod shape;

pub use area::{AreaPoll, AreaState};
pub use clock::FrameClock;
pub use error::{SimError, ensure_delta, ensure_finite};
pub use factory::{Factory, FactoryTable, SpawnRequest};
pub use kinematic::{KinematicBody, MoveOutcome};
pub use node::{
    DrawItem, DrawSink, Metadata, Node, NodeBehavior, NodeConfig, NodeId, NodeKind, NodeState,
    StaticBody,
};
pub use scene::Scene;
pub use shape::{Circle, Rect, Shape};
