//! Scene2D - a small 2D scene graph with grid-snapped kinematic movement
//!
//! Core modules:
//! - `sim`: Scene, nodes, shapes, areas, bodies and the fixed-step clock
//! - `settings`: Data-driven tunables loaded from JSON

pub mod settings;
pub mod sim;

pub use settings::{CarryMode, DuplicateNamePolicy, SimSettings};
pub use sim::{Scene, SimError};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Distance a body is nudged when probing for ground, walls and riders
    pub const PROBE_DISTANCE: f32 = 1.0;
}

/// Round each component to the nearest integer, ties to even
#[inline]
pub fn round_even(v: Vec2) -> Vec2 {
    Vec2::new(v.x.round_ties_even(), v.y.round_ties_even())
}

/// Snap a position to the integer grid shapes live on
#[inline]
pub fn snap(pos: Vec2) -> Vec2 {
    round_even(pos)
}

/// Split a displacement into whole units and what is left over
#[inline]
pub fn split_whole(displacement: Vec2) -> (Vec2, Vec2) {
    let whole = round_even(displacement);
    (whole, displacement - whole)
}
