use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use scene2d::settings::{DuplicateNamePolicy, SimSettings};
use scene2d::sim::{
    DrawItem, NodeBehavior, NodeConfig, NodeId, NodeKind, Scene, Shape, SimError,
};

type Log = Rc<RefCell<Vec<String>>>;

struct Tagged {
    tag: &'static str,
    log: Log,
}

impl NodeBehavior for Tagged {
    fn update(&mut self, _id: NodeId, _scene: &mut Scene, _dt: f32) -> Result<(), SimError> {
        self.log.borrow_mut().push(self.tag.to_string());
        Ok(())
    }
}

/// Spawns one child node on its first update
struct Spawner {
    spawned: Rc<RefCell<Option<NodeId>>>,
}

impl NodeBehavior for Spawner {
    fn update(&mut self, _id: NodeId, scene: &mut Scene, _dt: f32) -> Result<(), SimError> {
        if self.spawned.borrow().is_none() {
            let id = scene.create_node(NodeConfig::new(NodeKind::Plain).named("spawned"))?;
            *self.spawned.borrow_mut() = Some(id);
        }
        Ok(())
    }
}

/// Frees a target node during update
struct Reaper {
    target: NodeId,
}

impl NodeBehavior for Reaper {
    fn update(&mut self, _id: NodeId, scene: &mut Scene, _dt: f32) -> Result<(), SimError> {
        scene.free_immediate(self.target);
        Ok(())
    }
}

fn drawn_names(scene: &Scene) -> Vec<String> {
    let mut items: Vec<DrawItem> = Vec::new();
    scene.draw(&mut items);
    items.into_iter().map(|item| item.name).collect()
}

#[test]
fn node_spawned_during_update_is_drawn_next_frame() {
    let mut scene = Scene::new();
    let spawned = Rc::new(RefCell::new(None));
    scene
        .create_node(
            NodeConfig::new(NodeKind::Plain)
                .named("spawner")
                .with_behavior(Spawner {
                    spawned: spawned.clone(),
                }),
        )
        .unwrap();

    scene.update(1.0 / 60.0).unwrap();
    assert!(spawned.borrow().is_some());
    assert_eq!(drawn_names(&scene), vec!["spawner"]);

    scene.update(1.0 / 60.0).unwrap();
    assert_eq!(drawn_names(&scene), vec!["spawner", "spawned"]);
}

#[test]
fn node_freed_after_its_update_is_gone_from_later_passes() {
    let log: Log = Rc::default();
    let mut scene = Scene::new();
    let victim = scene
        .create_node(
            NodeConfig::new(NodeKind::Plain)
                .named("victim")
                .with_behavior(Tagged {
                    tag: "victim",
                    log: log.clone(),
                }),
        )
        .unwrap();
    scene
        .create_node(
            NodeConfig::new(NodeKind::Plain)
                .named("reaper")
                .with_behavior(Reaper { target: victim }),
        )
        .unwrap();

    // The victim runs first, then the reaper frees it mid-pass
    scene.update(0.1).unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert!(scene.contains(victim));
    assert_eq!(drawn_names(&scene), vec!["reaper"]);

    // The flush at the start of the next pass excises it
    scene.update(0.1).unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert!(!scene.contains(victim));
}

#[test]
fn node_freed_earlier_in_a_pass_is_skipped() {
    let log: Log = Rc::default();
    let mut scene = Scene::new();
    let target = Rc::new(RefCell::new(None::<NodeId>));

    struct LateReaper(Rc<RefCell<Option<NodeId>>>);
    impl NodeBehavior for LateReaper {
        fn update(&mut self, _id: NodeId, scene: &mut Scene, _dt: f32) -> Result<(), SimError> {
            if let Some(target) = *self.0.borrow() {
                scene.queue_free(target);
            }
            Ok(())
        }
    }

    scene
        .create_node(
            NodeConfig::new(NodeKind::Plain)
                .named("reaper")
                .with_behavior(LateReaper(target.clone())),
        )
        .unwrap();
    let victim = scene
        .create_node(
            NodeConfig::new(NodeKind::Plain)
                .named("victim")
                .with_behavior(Tagged {
                    tag: "victim",
                    log: log.clone(),
                }),
        )
        .unwrap();
    *target.borrow_mut() = Some(victim);

    let visited = scene.update(0.1).unwrap();
    assert_eq!(visited, 1);
    assert!(log.borrow().is_empty());
    assert_eq!(drawn_names(&scene), vec!["reaper"]);
}

#[test]
fn stale_handles_do_not_resolve_after_slot_reuse() {
    let mut scene = Scene::new();
    let first = scene.create_node(NodeConfig::new(NodeKind::Plain).named("a")).unwrap();
    scene.flush();
    scene.free_immediate(first);

    let second = scene.create_node(NodeConfig::new(NodeKind::Plain).named("b")).unwrap();
    assert_eq!(first.index(), second.index());
    assert_ne!(first, second);
    assert!(matches!(scene.node(first), Err(SimError::StaleNode(_))));
    assert_eq!(scene.find("b"), Some(second));
}

#[test]
fn duplicate_names_follow_policy() {
    let mut scene = Scene::new();
    let a = scene.create_node(NodeConfig::new(NodeKind::Plain).named("dup")).unwrap();
    let b = scene.create_node(NodeConfig::new(NodeKind::Plain).named("dup")).unwrap();
    assert_ne!(a, b);
    assert_eq!(scene.find("dup"), Some(b));

    let settings = SimSettings {
        duplicate_names: DuplicateNamePolicy::Reject,
        ..SimSettings::default()
    };
    let mut strict = Scene::with_settings(settings).unwrap();
    strict.create_node(NodeConfig::new(NodeKind::Plain).named("dup")).unwrap();
    assert_eq!(
        strict
            .create_node(NodeConfig::new(NodeKind::Plain).named("dup"))
            .unwrap_err(),
        SimError::DuplicateName("dup".into())
    );
}

#[test]
fn hierarchy_delta_reaches_every_depth_once() {
    let mut scene = Scene::new();
    let root = scene
        .create_node(NodeConfig::new(NodeKind::Plain).named("root").at(Vec2::ZERO))
        .unwrap();
    let mut parent = root;
    let mut chain = Vec::new();
    for depth in 1..=5 {
        let id = scene
            .create_node(
                NodeConfig::new(NodeKind::Plain)
                    .named(format!("n{depth}"))
                    .at(Vec2::splat(5.0 * depth as f32))
                    .child_of(parent),
            )
            .unwrap();
        chain.push(id);
        parent = id;
    }

    scene.set_position(root, Vec2::new(10.0, 0.0)).unwrap();
    for (i, id) in chain.iter().enumerate() {
        let start = Vec2::splat(5.0 * (i + 1) as f32);
        assert_eq!(scene.position(*id).unwrap(), start + Vec2::new(10.0, 0.0));
    }
    assert_eq!(scene.descendants(root), chain);
}

#[test]
fn reparenting_into_own_subtree_is_rejected() {
    let mut scene = Scene::new();
    let p = scene.create_node(NodeConfig::new(NodeKind::Plain).named("p")).unwrap();
    let c = scene
        .create_node(NodeConfig::new(NodeKind::Plain).named("c").child_of(p))
        .unwrap();
    assert_eq!(
        scene.set_parent(p, Some(c)).unwrap_err(),
        SimError::CyclicParent { child: p, parent: c }
    );
    assert_eq!(scene.parent(c), Some(p));
}

#[test]
fn area_edges_follow_overlap() {
    let mut scene = Scene::new();
    let a = scene
        .create_node(NodeConfig::new(NodeKind::area()).named("a").with_shape(Shape::circle(Vec2::ZERO, 5.0)))
        .unwrap();
    let b = scene
        .create_node(
            NodeConfig::new(NodeKind::area())
                .named("b")
                .with_shape(Shape::circle(Vec2::new(40.0, 0.0), 5.0)),
        )
        .unwrap();
    scene.flush();
    assert!(!scene.poll_area(a).unwrap().entered);

    scene.set_position(b, Vec2::new(8.0, 0.0)).unwrap();
    assert!(scene.poll_area(a).unwrap().entered);
    assert!(!scene.poll_area(a).unwrap().entered);

    scene.set_position(b, Vec2::new(20.0, 0.0)).unwrap();
    assert!(scene.poll_area(a).unwrap().exited);
    assert!(!scene.poll_area(a).unwrap().exited);
}

#[test]
fn tangent_circles_do_not_intersect() {
    let a = Shape::circle(Vec2::ZERO, 3.0);
    assert!(!a.intersects(&Shape::circle(Vec2::new(6.0, 0.0), 3.0)));
    assert!(a.intersects(&Shape::circle(Vec2::new(5.999, 0.0), 3.0)));
}

#[test]
fn reentrant_pass_is_rejected() {
    struct Nested(Rc<RefCell<Option<SimError>>>);
    impl NodeBehavior for Nested {
        fn update(&mut self, _id: NodeId, scene: &mut Scene, dt: f32) -> Result<(), SimError> {
            if let Err(err) = scene.update(dt) {
                *self.0.borrow_mut() = Some(err);
            }
            Ok(())
        }
    }

    let seen = Rc::new(RefCell::new(None));
    let mut scene = Scene::new();
    scene
        .create_node(NodeConfig::new(NodeKind::Plain).with_behavior(Nested(seen.clone())))
        .unwrap();
    scene.update(0.1).unwrap();
    assert_eq!(*seen.borrow(), Some(SimError::ReentrantPass));
    assert!(!scene.in_pass());
}
