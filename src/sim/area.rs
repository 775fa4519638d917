//! Overlap tracking between areas
//!
//! An area remembers one bit: whether it overlapped another area at its last
//! poll. Each poll compares that bit with the current overlap and reports the
//! enter/exit edge, so an area must be polled exactly once per frame.
//!
//! Areas queued for removal drop out of scans immediately; a partner freed
//! this frame reports an exit on the next poll.

use serde::{Deserialize, Serialize};

use super::error::SimError;
use super::node::{NodeId, NodeKind};
use super::scene::Scene;
use super::shape::Shape;

/// Prior-overlap state of an area
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaState {
    was_inside: bool,
}

impl AreaState {
    /// Result of the last poll
    pub fn is_inside(&self) -> bool {
        self.was_inside
    }

    /// Advance the state machine; returns `(entered, exited)`
    fn transition(&mut self, inside: bool) -> (bool, bool) {
        let entered = !self.was_inside && inside;
        let exited = self.was_inside && !inside;
        self.was_inside = inside;
        (entered, exited)
    }
}

/// Edges reported by one poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AreaPoll {
    /// Went from outside to overlapping
    pub entered: bool,
    /// Went from overlapping to outside
    pub exited: bool,
    /// First overlapping area in registration order
    pub partner: Option<NodeId>,
}

impl Scene {
    /// Live areas in registration order
    pub fn areas(&self) -> &[NodeId] {
        &self.areas
    }

    fn area_shape(&self, id: NodeId) -> Result<Shape, SimError> {
        let node = self.node(id)?;
        if node.area().is_none() {
            return Err(SimError::WrongKind {
                id,
                expected: "Area",
            });
        }
        node.shape()
            .copied()
            .ok_or(SimError::MissingShape { kind: "Area" })
    }

    fn overlaps_with(&self, shape: Shape, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.areas.iter().copied().filter(move |&other| {
            other != id
                && self
                    .get(other)
                    .filter(|n| n.is_live())
                    .and_then(|n| n.shape())
                    .is_some_and(|s| shape.intersects(s))
        })
    }

    /// First other area overlapping `id`, without touching its state
    pub fn first_overlap(&self, id: NodeId) -> Result<Option<NodeId>, SimError> {
        let shape = self.area_shape(id)?;
        Ok(self.overlaps_with(shape, id).next())
    }

    /// Every other area overlapping `id`, without touching its state
    pub fn overlapping_areas(&self, id: NodeId) -> Result<Vec<NodeId>, SimError> {
        let shape = self.area_shape(id)?;
        Ok(self.overlaps_with(shape, id).collect())
    }

    /// Poll an area once for this frame
    pub fn poll_area(&mut self, id: NodeId) -> Result<AreaPoll, SimError> {
        let partner = self.first_overlap(id)?;
        let NodeKind::Area(state) = &mut self.node_mut(id)?.kind else {
            return Err(SimError::WrongKind {
                id,
                expected: "Area",
            });
        };
        let (entered, exited) = state.transition(partner.is_some());
        if entered || exited {
            log::trace!("area {id}: entered={entered} exited={exited} partner={partner:?}");
        }
        Ok(AreaPoll {
            entered,
            exited,
            partner,
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::sim::node::NodeConfig;

    fn area(scene: &mut Scene, name: &str, shape: Shape) -> NodeId {
        scene
            .create_node(NodeConfig::new(NodeKind::area()).named(name).with_shape(shape))
            .unwrap()
    }

    #[test]
    fn test_enter_then_exit_edges() {
        let mut scene = Scene::new();
        let a = area(&mut scene, "a", Shape::circle(Vec2::ZERO, 5.0));
        let b = area(&mut scene, "b", Shape::circle(Vec2::new(30.0, 0.0), 5.0));
        scene.flush();

        let poll = scene.poll_area(a).unwrap();
        assert!(!poll.entered && !poll.exited);

        scene.set_position(b, Vec2::new(8.0, 0.0)).unwrap();
        let poll = scene.poll_area(a).unwrap();
        assert!(poll.entered);
        assert_eq!(poll.partner, Some(b));

        for _ in 0..3 {
            let poll = scene.poll_area(a).unwrap();
            assert!(!poll.entered && !poll.exited);
        }

        scene.set_position(b, Vec2::new(20.0, 0.0)).unwrap();
        let poll = scene.poll_area(a).unwrap();
        assert!(poll.exited);
        assert_eq!(poll.partner, None);
        assert!(!scene.poll_area(a).unwrap().exited);
    }

    #[test]
    fn test_partner_is_first_in_registration_order() {
        let mut scene = Scene::new();
        let sensor = area(&mut scene, "sensor", Shape::rect(0.0, 0.0, 10.0, 10.0));
        let first = area(&mut scene, "first", Shape::circle(Vec2::new(5.0, 5.0), 2.0));
        let second = area(&mut scene, "second", Shape::rect(2.0, 2.0, 2.0, 2.0));
        scene.flush();

        assert_eq!(scene.poll_area(sensor).unwrap().partner, Some(first));
        assert_eq!(scene.overlapping_areas(sensor).unwrap(), vec![first, second]);
        // Scanning does not disturb the edge state
        assert!(scene.node(sensor).unwrap().area().unwrap().is_inside());
    }

    #[test]
    fn test_pending_areas_are_not_scanned() {
        let mut scene = Scene::new();
        let a = area(&mut scene, "a", Shape::circle(Vec2::ZERO, 5.0));
        area(&mut scene, "b", Shape::circle(Vec2::ZERO, 5.0));

        assert_eq!(scene.first_overlap(a).unwrap(), None);
        scene.flush();
        assert!(scene.poll_area(a).unwrap().entered);
    }

    #[test]
    fn test_freed_partner_triggers_exit() {
        let mut scene = Scene::new();
        let a = area(&mut scene, "a", Shape::circle(Vec2::ZERO, 5.0));
        let b = area(&mut scene, "b", Shape::circle(Vec2::ONE, 5.0));
        scene.flush();
        assert!(scene.poll_area(a).unwrap().entered);

        scene.queue_free(b);
        scene.flush();
        assert!(scene.areas().iter().all(|&n| n != b));
        assert!(scene.poll_area(a).unwrap().exited);
    }

    #[test]
    fn test_queued_partner_exits_before_flush() {
        let mut scene = Scene::new();
        let a = area(&mut scene, "a", Shape::circle(Vec2::ZERO, 5.0));
        let b = area(&mut scene, "b", Shape::circle(Vec2::ONE, 5.0));
        let c = area(&mut scene, "c", Shape::circle(Vec2::new(2.0, 0.0), 5.0));
        scene.flush();
        assert_eq!(scene.poll_area(a).unwrap().partner, Some(b));

        scene.queue_free(b);
        let poll = scene.poll_area(a).unwrap();
        assert!(!poll.exited);
        assert_eq!(poll.partner, Some(c));

        scene.queue_free(c);
        assert!(scene.poll_area(a).unwrap().exited);
        assert!(scene.areas().contains(&c));
    }

    #[test]
    fn test_poll_requires_area() {
        let mut scene = Scene::new();
        let wall = scene
            .create_node(
                NodeConfig::new(NodeKind::static_body()).with_shape(Shape::rect(0.0, 0.0, 1.0, 1.0)),
            )
            .unwrap();
        assert!(matches!(
            scene.poll_area(wall),
            Err(SimError::WrongKind { .. })
        ));
    }
}
