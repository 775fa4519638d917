//! Kinematic movement with sub-pixel accumulation
//!
//! Velocity is integrated into a per-axis remainder. Each call moves the body
//! by the rounded part of the remainder, one unit at a time, testing every
//! unit against the enabled static bodies before committing it. The fraction
//! left over carries to the next call, so drift stays under one unit no
//! matter how the frame time is sliced.
//!
//! Cost is O(distance moved x static bodies) per axis per frame. Distances
//! per step are small, and stepping unit by unit is what rules out tunneling.
//!
//! Rectangles that share an edge count as overlapping, so a body never comes
//! to rest flush against a wall or floor: it stops one unit short, and the
//! ground and wall probes look exactly that one unit ahead.
//!
//! Only live static bodies block. One queued for removal stops colliding as
//! soon as it is queued, not at the next flush.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::error::{SimError, ensure_delta, ensure_finite};
use super::node::{NodeId, NodeKind};
use super::scene::Scene;
use super::shape::Shape;
use crate::consts::PROBE_DISTANCE;
use crate::settings::CarryMode;

/// Moving body state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KinematicBody {
    velocity: Vec2,
    /// Unresolved sub-unit displacement, each axis within (-1, 1)
    remainder: Vec2,
    locked: bool,
}

impl KinematicBody {
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn remainder(&self) -> Vec2 {
        self.remainder
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Fold `displacement` into the remainder and split off whole units
    fn accumulate(&mut self, displacement: Vec2) -> Vec2 {
        let (step, rest) = crate::split_whole(self.remainder + displacement);
        self.remainder = rest;
        step
    }
}

/// What happened during one [`Scene::move_body`] call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveOutcome {
    /// Whole units actually moved
    pub moved: Vec2,
    pub blocked_x: bool,
    pub blocked_y: bool,
    /// Displacement picked up from moving bodies underneath
    pub carried: Vec2,
}

impl Scene {
    fn body(&self, id: NodeId) -> Result<&KinematicBody, SimError> {
        self.node(id)?.kinematic().ok_or(SimError::WrongKind {
            id,
            expected: "KinematicBody",
        })
    }

    fn body_mut(&mut self, id: NodeId) -> Result<&mut KinematicBody, SimError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::KinematicBody(body) => Ok(body),
            _ => Err(SimError::WrongKind {
                id,
                expected: "KinematicBody",
            }),
        }
    }

    fn body_shape(&self, id: NodeId) -> Result<Shape, SimError> {
        self.node(id)?
            .shape()
            .copied()
            .ok_or(SimError::MissingShape {
                kind: "KinematicBody",
            })
    }

    pub fn velocity(&self, id: NodeId) -> Result<Vec2, SimError> {
        Ok(self.body(id)?.velocity)
    }

    pub fn set_velocity(&mut self, id: NodeId, velocity: Vec2) -> Result<(), SimError> {
        ensure_finite(velocity, "velocity")?;
        self.body_mut(id)?.velocity = velocity;
        Ok(())
    }

    pub fn remainder(&self, id: NodeId) -> Result<Vec2, SimError> {
        Ok(self.body(id)?.remainder)
    }

    /// A locked body drops its velocity and does not move
    pub fn set_locked(&mut self, id: NodeId, locked: bool) -> Result<(), SimError> {
        self.body_mut(id)?.locked = locked;
        Ok(())
    }

    /// Whether `tentative` would hit a static body
    ///
    /// `current` is where the body is now and `direction` the probe or step
    /// direction; one-way bodies only block downward motion from outside.
    fn blocked(&self, current: &Shape, tentative: &Shape, direction: Vec2) -> bool {
        self.static_bodies.iter().any(|&id| {
            let Some(node) = self.get(id).filter(|n| n.is_live()) else {
                return false;
            };
            let (Some(body), Some(shape)) = (node.static_body(), node.shape()) else {
                return false;
            };
            if !body.enabled || !tentative.intersects(shape) {
                return false;
            }
            !body.one_way || (direction.y > 0.0 && !current.intersects(shape))
        })
    }

    /// Whether `shape` overlaps any enabled solid static body
    pub fn collides(&self, shape: &Shape) -> bool {
        self.static_bodies.iter().any(|&id| {
            self.get(id).is_some_and(|node| {
                node.is_live()
                    && matches!(node.static_body(), Some(b) if b.enabled && !b.one_way)
                    && node.shape().is_some_and(|s| shape.intersects(s))
            })
        })
    }

    /// Standing on something: one unit down is blocked
    pub fn is_on_ground(&self, id: NodeId) -> Result<bool, SimError> {
        let shape = self.body_shape(id)?;
        let down = Vec2::new(0.0, PROBE_DISTANCE);
        Ok(self.blocked(&shape, &shape.translated(down), down))
    }

    /// Touching a solid body one unit to the left or right
    pub fn is_on_wall(&self, id: NodeId) -> Result<bool, SimError> {
        let shape = self.body_shape(id)?;
        let left = Vec2::new(-PROBE_DISTANCE, 0.0);
        let right = Vec2::new(PROBE_DISTANCE, 0.0);
        Ok(self.blocked(&shape, &shape.translated(left), left)
            || self.blocked(&shape, &shape.translated(right), right))
    }

    /// Sum of velocities of moving bodies this one rests on
    fn carry_velocity(&self, id: NodeId) -> Result<Vec2, SimError> {
        let feet = self
            .body_shape(id)?
            .bounding_box()
            .translated(Vec2::new(0.0, PROBE_DISTANCE));
        let mut carry = Vec2::ZERO;
        for &other in &self.kinematic_bodies {
            if other == id {
                continue;
            }
            let Some(node) = self.get(other).filter(|n| n.is_live()) else {
                continue;
            };
            let (Some(body), Some(shape)) = (node.kinematic(), node.shape()) else {
                continue;
            };
            if body.velocity != Vec2::ZERO && feet.intersects(&shape.bounding_box()) {
                carry += body.velocity;
            }
        }
        Ok(carry)
    }

    /// Advance one kinematic body by `dt` seconds
    pub fn move_body(&mut self, id: NodeId, dt: f32) -> Result<MoveOutcome, SimError> {
        let dt = ensure_delta(dt)?;
        let mut outcome = MoveOutcome::default();

        let body = self.body_mut(id)?;
        if body.locked {
            body.velocity = Vec2::ZERO;
            return Ok(outcome);
        }
        // Finite velocity times finite dt can still overflow
        let displacement = ensure_finite(body.velocity * dt, "displacement")?;

        // Passive carry is not collision checked
        let carry = match self.settings().carry {
            CarryMode::Velocity => self.carry_velocity(id)?,
            CarryMode::Displacement => self.carry_velocity(id)? * dt,
        };
        if carry != Vec2::ZERO {
            self.translate(id, carry)?;
            outcome.carried = carry;
        }

        let step = self.body_mut(id)?.accumulate(displacement);

        let (moved_x, blocked_x) = self.step_axis(id, step.x as i32, Vec2::X)?;
        let (moved_y, blocked_y) = self.step_axis(id, step.y as i32, Vec2::Y)?;
        outcome.moved = Vec2::new(moved_x as f32, moved_y as f32);
        outcome.blocked_x = blocked_x;
        outcome.blocked_y = blocked_y;
        Ok(outcome)
    }

    /// Move `amount` whole units along `axis`; returns units moved and
    /// whether a static body stopped the motion
    fn step_axis(&mut self, id: NodeId, amount: i32, axis: Vec2) -> Result<(i32, bool), SimError> {
        let sign = amount.signum();
        let unit = axis * sign as f32;
        let mut moved = 0;

        while moved != amount {
            let current = self.body_shape(id)?;
            let tentative = current.translated(unit);
            if self.blocked(&current, &tentative, unit) {
                let body = self.body_mut(id)?;
                if axis.x != 0.0 {
                    body.velocity.x = 0.0;
                } else {
                    body.velocity.y = 0.0;
                }
                log::trace!("body {id} blocked after {moved} of {amount} units along {axis}");
                return Ok((moved, true));
            }
            self.translate(id, unit)?;
            moved += sign;
        }
        Ok((moved, false))
    }

    /// Move every live kinematic body once, in live order
    pub fn step_bodies(&mut self, dt: f32) -> Result<(), SimError> {
        let dt = ensure_delta(dt)?;
        let bodies = self.kinematic_bodies.clone();
        for id in bodies {
            if !self.is_live(id) {
                continue;
            }
            self.move_body(id, dt)?;
        }
        Ok(())
    }
}
