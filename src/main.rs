//! Headless world driver.
//!
//! Streams a world around a walking agent, digs and builds a few blocks,
//! then logs what it did.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   JSON engine config (default: built-in defaults)
//!   --frames <N>      Frames to simulate at 60 Hz (default: 600)
//!   --seed <SEED>     Override the generation seed
//!   --sync            Generate chunks inline instead of on workers
//!   --new-world-at <N> Discard edits and reseed the world at frame N

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Vec2, Vec3};

use blockterra::core::config::{EngineConfig, SchedulingMode};
use blockterra::core::logging;
use blockterra::math::Aabb;
use blockterra::physics::agent::{RESET_POSITION, SPAWN_POSITION};
use blockterra::physics::{Agent, CollisionSystem};
use blockterra::streaming::{StreamEvent, WorldStreamer, DEFAULT_REACH};
use blockterra::voxel::block::{BlockId, BlockRegistry};

const FRAME_DT: f32 = 1.0 / 60.0;

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> blockterra::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = parse_u32_arg(&args, "--seed") {
        config.world.generation.seed = seed;
    }
    if args.iter().any(|a| a == "--sync") {
        config.world.scheduling = SchedulingMode::Immediate;
    }
    let frames = parse_usize_arg(&args, "--frames").unwrap_or(600);
    let new_world_at = parse_usize_arg(&args, "--new-world-at");

    log::info!(
        "Seed {}, chunk {}x{}, draw distance {}, {:?} scheduling",
        config.world.generation.seed,
        config.world.chunk_size.width,
        config.world.chunk_size.height,
        config.world.draw_distance,
        config.world.scheduling
    );

    let registry = Arc::new(BlockRegistry::standard());
    let mut world = WorldStreamer::new(&config.world, registry)?;
    let mut physics = CollisionSystem::new(&config.physics);
    let mut agent = Agent::from_config(&config.agent);

    let start = Instant::now();
    world.update(agent.position);
    if !world.wait_idle(Duration::from_secs(30)) {
        log::warn!("Initial chunks still generating after 30s");
    }
    log::info!("Initial window ready in {:.1?} ({} chunks)", start.elapsed(), world.chunk_count());

    // Drop onto the surface instead of falling through generated terrain
    let spawn_x = SPAWN_POSITION.x.floor() as i32;
    let spawn_z = SPAWN_POSITION.z.floor() as i32;
    if let Some(top) = world.surface_height(spawn_x, spawn_z) {
        agent.reset(Vec3::new(SPAWN_POSITION.x, top as f32 + 1.0 + agent.height + 0.5, SPAWN_POSITION.z));
    }

    let mut loaded = 0usize;
    let mut unloaded = 0usize;
    let mut edits = 0usize;
    let mut steps = 0u64;
    let mut batch_uploads = 0usize;

    for frame in 0..frames {
        // Walk in a slow circle, jumping now and then
        let heading = frame as f32 * 0.01;
        agent.steer(Vec2::new(heading.cos(), heading.sin()));
        if frame % 90 == 45 {
            agent.jump();
        }

        steps += physics.update(FRAME_DT, &mut agent, &world) as u64;
        world.update(agent.position);

        if frame % 120 == 60 {
            let look = Vec3::new(heading.cos(), -1.0, heading.sin());
            if let Some(hit) = world.raycast(agent.position, look, DEFAULT_REACH) {
                if world.remove_block(hit.block) {
                    edits += 1;
                }
            }
        } else if frame % 120 == 0 && frame > 0 {
            let look = Vec3::new(-heading.cos(), -1.0, -heading.sin());
            if let Some(hit) = world.raycast(agent.position, look, DEFAULT_REACH) {
                let target = hit.place_position();
                if !agent.bounds().intersects(&Aabb::block(target))
                    && world.add_block(target, BlockId::STONE)
                {
                    edits += 1;
                }
            }
        }

        if new_world_at == Some(frame) {
            let mut params = world.params().clone();
            params.seed = params.seed.wrapping_add(1);
            log::info!("New world with seed {} at frame {}", params.seed, frame);
            world.set_params(params);
            world.reset();
            world.update(agent.position);
            world.wait_idle(Duration::from_secs(30));
            agent.reset(RESET_POSITION);
        }

        // Stand-in for the renderer re-uploading changed batches
        batch_uploads += world.chunks_mut().map(|c| c.take_dirty()).filter(|dirty| *dirty).count();

        for event in world.drain_events() {
            match event {
                StreamEvent::Loaded(_) => loaded += 1,
                StreamEvent::Unloaded(_) => unloaded += 1,
                StreamEvent::Modified(_) => {}
            }
        }

        if agent.position.y < -64.0 {
            log::warn!("Agent fell out of the world at frame {frame}; resetting");
            agent.reset(RESET_POSITION);
        }
    }

    let instances: usize = world.chunks().map(|c| c.instance_count()).sum();
    log::info!(
        "Simulated {} frames ({} physics steps) in {:.1?}",
        frames,
        steps,
        start.elapsed()
    );
    log::info!(
        "Agent at ({:.2}, {:.2}, {:.2}), on ground: {}",
        agent.position.x,
        agent.position.y,
        agent.position.z,
        agent.on_ground()
    );
    log::info!(
        "{} chunks resident, {} loads, {} unloads, {} edits, {} block instances, {} batch uploads",
        world.chunk_count(),
        loaded,
        unloaded,
        edits,
        instances,
        batch_uploads
    );
    Ok(())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
