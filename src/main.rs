//! Toro Tag entry point
//!
//! Runs a headless game of tag: five NPCs on a wrapping 512x512 arena with
//! a handful of fixed obstacles, advanced at a fixed millisecond timestep.
//! Tag transfers are reported as they happen and a final summary (plus a
//! JSON snapshot of the end state) goes to stdout.
//!
//! Usage: `toro-tag [seed] [seconds]`

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use toro_tag::consts::*;
use toro_tag::controllers::{Avoid, Conditional, Evade, PeriodicRamp, Pursue, Randomize};
use toro_tag::math::{random_position, uniform_dir};
use toro_tag::sim::{Character, Circle, GameState, Obstacle, Shape, Simulator};
use toro_tag::{Controller, Perception};

const NUM_CHARACTERS: usize = 5;
const NUM_OBSTACLES: usize = 7;
const STEP: f32 = 1.0 / TICKS_PER_SEC as f32;

/// The standard NPC brain. While tagged: chase the nearest character.
/// Otherwise: flee the tagged one, rethinking at a cadence that tightens
/// as the threat closes in, with a heading jitter that fades the closer
/// the threat gets. Both branches swerve around immovable obstacles.
fn npc_controller(seed: u64) -> Box<dyn Controller> {
    let chase = Box::new(Avoid::new(Box::new(Pursue)));

    let flee = Box::new(Avoid::new(Box::new(PeriodicRamp::new(
        Box::new(Randomize::new(
            Box::new(Evade),
            Box::new(|p: &Perception| p.distance_to_tagged()),
            200.0,
            seed,
        )),
        Box::new(|p: &Perception| p.distance_to_tagged()),
        100,
        2000,
        300.0,
    ))));

    Box::new(Conditional::new(
        Box::new(|p: &Perception| p.myself_tagged()),
        chase,
        flee,
    ))
}

fn build_world(seed: u64) -> (Simulator, GameState) {
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut sim = Simulator::new();
    let mut gs = GameState::new(Vec2::splat(WORLD_DIM));
    gs.add_boundary_sides();

    for i in 0..NUM_CHARACTERS {
        let id = sim.add_controller(npc_controller(seed.wrapping_add(i as u64)));
        let mut c = Character::new(CHARACTER_RADIUS, id);
        c.body_mut()
            .set_position(random_position(gs.world_dim(), &mut rng));
        c.body_mut().set_orientation(uniform_dir(&mut rng));
        gs.add_character(c);
    }

    for _ in 0..NUM_OBSTACLES {
        let mut o = Obstacle::new(Shape::Circle(Circle::new(OBSTACLE_RADIUS)));
        o.set_position(random_position(gs.world_dim(), &mut rng));
        gs.add_obstacle(o);
    }

    // Somebody has to be it.
    gs.set_tagged(0, 0);
    (sim, gs)
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = args
        .next()
        .map(|s| s.parse().expect("seed must be an integer"))
        .unwrap_or(0xDECADE);
    let seconds: f64 = args
        .next()
        .map(|s| s.parse().expect("duration must be in seconds"))
        .unwrap_or(30.0);

    log::info!("starting tag run: seed {seed}, {seconds} s");
    let (mut sim, mut gs) = build_world(seed);

    let mut holder = gs.tags().tagged();
    let mut transfers = 0u32;
    while gs.time() < seconds {
        sim.forward(&mut gs, STEP);
        let now_holder = gs.tags().tagged();
        if now_holder != holder {
            transfers += 1;
            log::info!(
                "tick {}: character {:?} is now it (transfer #{transfers})",
                gs.ticks(),
                now_holder
            );
            holder = now_holder;
        }
    }

    println!(
        "ran {} frames over {:.1} s: {} tag transfers, character {:?} ends up it",
        gs.frame(),
        gs.time(),
        transfers,
        holder
    );
    match serde_json::to_string_pretty(&gs) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("could not snapshot final state: {e}"),
    }
}
