//! Scene2D headless demo
//!
//! Builds a small platformer level, then drives it with the fixed-step clock
//! using jittered frame times. Set `SCENE2D_SETTINGS` to a JSON settings file
//! and `SCENE2D_SEED` to change the jitter sequence.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde_json::json;

use scene2d::consts::SIM_DT;
use scene2d::settings::{CarryMode, SimSettings};
use scene2d::sim::{
    DrawItem, FactoryTable, FrameClock, NodeBehavior, NodeConfig, NodeId, NodeKind, Scene, Shape,
    SimError, SpawnRequest, StaticBody,
};

const FRAMES: u32 = 240;
const GRAVITY: f32 = 600.0;
const MAX_FALL: f32 = 400.0;

/// Runs back and forth, hops every so often, falls otherwise
struct Walker {
    run_speed: f32,
    jump_speed: f32,
    jump_every: f32,
    since_jump: f32,
}

impl NodeBehavior for Walker {
    fn update(&mut self, id: NodeId, scene: &mut Scene, dt: f32) -> Result<(), SimError> {
        let mut velocity = scene.velocity(id)?;
        if scene.is_on_wall(id)? {
            self.run_speed = -self.run_speed;
        }
        velocity.x = self.run_speed;

        self.since_jump += dt;
        if scene.is_on_ground(id)? {
            velocity.y = 0.0;
            if self.since_jump >= self.jump_every {
                velocity.y = -self.jump_speed;
                self.since_jump = 0.0;
                log::debug!("{} jumps", scene.node(id)?.name());
            }
        } else {
            velocity.y = (velocity.y + GRAVITY * dt).min(MAX_FALL);
        }
        scene.set_velocity(id, velocity)
    }
}

/// Moves horizontally between two x bounds
struct Patrol {
    min_x: f32,
    max_x: f32,
    speed: f32,
}

impl NodeBehavior for Patrol {
    fn update(&mut self, id: NodeId, scene: &mut Scene, _dt: f32) -> Result<(), SimError> {
        let x = scene.position(id)?.x;
        if x >= self.max_x {
            self.speed = -self.speed.abs();
        } else if x <= self.min_x {
            self.speed = self.speed.abs();
        }
        scene.set_velocity(id, Vec2::new(self.speed, 0.0))
    }
}

struct Coin {
    value: u32,
}

fn static_body(name: &str, shape: Shape, one_way: bool) -> NodeConfig {
    NodeConfig::new(NodeKind::StaticBody(StaticBody {
        enabled: true,
        one_way,
    }))
    .named(name)
    .with_shape(shape)
}

fn build_level(scene: &mut Scene) -> Result<(NodeId, NodeId), SimError> {
    scene.create_node(static_body("floor", Shape::rect(0.0, 200.0, 400.0, 16.0), false))?;
    scene.create_node(static_body("wall", Shape::rect(380.0, 0.0, 20.0, 200.0), false))?;
    scene.create_node(static_body("ledge", Shape::rect(100.0, 150.0, 80.0, 4.0), true))?;

    scene.create_node(
        NodeConfig::new(NodeKind::kinematic())
            .named("lift")
            .with_shape(Shape::rect(220.0, 170.0, 40.0, 8.0))
            .with_behavior(Patrol {
                min_x: 200.0,
                max_x: 300.0,
                speed: 40.0,
            }),
    )?;

    let player = scene.create_node(
        NodeConfig::new(NodeKind::kinematic())
            .named("player")
            .with_shape(Shape::rect(40.0, 100.0, 12.0, 16.0))
            .with_behavior(Walker {
                run_speed: 60.0,
                jump_speed: 220.0,
                jump_every: 1.5,
                since_jump: 0.0,
            }),
    )?;
    let sensor = scene.create_node(
        NodeConfig::new(NodeKind::area())
            .named("player_sensor")
            .with_shape(Shape::rect(40.0, 100.0, 12.0, 16.0))
            .child_of(player),
    )?;

    let mut factories = FactoryTable::with_builtins();
    factories.register("Coin", |req| {
        let value = req
            .values
            .get("value")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(1) as u32;
        Ok(req.base_config(NodeKind::area()).with_payload(Coin { value }))
    });

    let coins = SpawnRequest::from_value(json!({
        "tag": "Coin",
        "name": "coin",
        "x": 80.0, "y": 188.0, "width": 6.0, "height": 6.0,
        "values": { "value": 10 },
        "nodes": [[160.0, 188.0], [240.0, 188.0], [330.0, 188.0]]
    }))?;
    let spawned = factories.spawn(scene, &coins)?;
    log::info!("Spawned {} coins", spawned.len());

    Ok((player, sensor))
}

fn run() -> Result<(), SimError> {
    let settings = match std::env::var("SCENE2D_SETTINGS") {
        Ok(path) => SimSettings::load_from(path)?,
        Err(_) => SimSettings {
            carry: CarryMode::Displacement,
            ..SimSettings::default()
        },
    };
    let seed = std::env::var("SCENE2D_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(42u64);
    log::info!(
        "Starting demo: dt={:.4}s, max_substeps={}, carry={}, seed={}",
        settings.fixed_dt,
        settings.max_substeps,
        settings.carry.as_str(),
        seed
    );

    let mut clock = FrameClock::from_settings(&settings);
    let mut scene = Scene::with_settings(settings)?;
    let (player, sensor) = build_level(&mut scene)?;
    scene.load()?;

    let mut rng = Pcg32::seed_from_u64(seed);
    let mut score = 0;
    let mut frame_items: Vec<DrawItem> = Vec::new();

    for frame in 0..FRAMES {
        let elapsed = SIM_DT * rng.random_range(0.5f32..2.0);
        let dt = clock.fixed_dt();
        for _ in 0..clock.advance(elapsed) {
            scene.update(dt)?;
            scene.step_bodies(dt)?;

            let poll = scene.poll_area(sensor)?;
            if poll.entered
                && let Some(coin) = poll.partner
            {
                if let Ok(picked) = scene.payload::<Coin>(coin) {
                    score += picked.value;
                    log::info!(
                        "Frame {frame}: picked up {} (+{}, score {score})",
                        scene.node(coin)?.name(),
                        picked.value
                    );
                }
                scene.queue_free(coin);
            }
        }

        frame_items.clear();
        scene.draw(&mut frame_items);

        if frame % 60 == 0 {
            log::info!(
                "Frame {frame}: player at {}, {} nodes drawn, ground={}",
                scene.position(player)?,
                frame_items.len(),
                scene.is_on_ground(player)?
            );
        }
    }

    scene.unload()?;
    log::info!("Demo finished with score {score}, {} nodes live", scene.len());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Scene2D demo starting...");

    if let Err(e) = run() {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}
