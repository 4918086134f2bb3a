//! Fixed-timestep physics and game-rule engine
//!
//! Each call to [`Simulator::forward`] advances the world one frame in four
//! phases, in order:
//!
//! 1. generate actions: every controller sees a perception bound to its
//!    character and decides a steering action
//! 2. process actions: actions become force-limited velocity changes
//! 3. resolve collisions: impulse resolution, repeated until no pair is
//!    still closing; tags transfer on character contact
//! 4. update positions: integrate velocities and wrap at the world edges
//!
//! Phases never interleave across characters, so the result is independent
//! of everything but registration order.

use glam::Vec2;

use super::body::ControllerId;
use super::perception::Perception;
use super::state::GameState;
use crate::consts::{COLLISION_PASS_LIMIT, MIN_TAG_INTERVAL_TICKS, RESTITUTION};
use crate::controllers::Controller;
use crate::math::Vec2Ext;

/// Post-impulse speeds along the contact tangent for two finite-mass
/// bodies meeting at tangential speeds `uit` and `ujt`
fn impulse_pair(uit: f32, ujt: f32, mi: f32, mj: f32, e: f32) -> (f32, f32) {
    let k = (uit - ujt) / (mi + mj);
    (uit - (1.0 + e) * mj * k, ujt + (1.0 + e) * mi * k)
}

/// Post-impulse tangential speed for a body bouncing off an immovable one
fn impulse_immovable(uit: f32, e: f32) -> f32 {
    -e * uit
}

/// Owns the controllers and drives the game state forward
#[derive(Default)]
pub struct Simulator {
    controllers: Vec<Box<dyn Controller>>,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller; characters refer to it by the returned id
    pub fn add_controller(&mut self, controller: Box<dyn Controller>) -> ControllerId {
        self.controllers.push(controller);
        ControllerId(self.controllers.len() - 1)
    }

    /// Advance the world by `delta_t` seconds
    pub fn forward(&mut self, gs: &mut GameState, delta_t: f32) {
        gs.advance_clock(delta_t);
        self.generate_actions(gs);
        process_actions(gs, delta_t);
        resolve_collisions(gs);
        update_positions(gs, delta_t);
    }

    /// Phase 1: one decision per character, in index order
    fn generate_actions(&mut self, gs: &mut GameState) {
        if gs.characters().is_empty() {
            return;
        }
        let mut actions = Vec::with_capacity(gs.characters().len());
        let mut view = Perception::new(gs);
        for i in 0..gs.characters().len() {
            view.bind(i);
            let ControllerId(c) = gs.character(i).controller();
            actions.push(self.controllers[c].decide(&view));
        }
        for (i, action) in actions.into_iter().enumerate() {
            gs.character_mut(i).set_action(action);
        }
    }
}

/// Phase 2: turn each character's action into a velocity change, limited
/// by its max force and capped at its max speed
fn process_actions(gs: &mut GameState, delta_t: f32) {
    for i in 0..gs.characters().len() {
        let c = gs.character(i);
        let action = c.action();
        let desired = action.direction() * (action.speed() * c.max_speed());

        let mass = c.body().mass();
        let force = ((desired - c.body().velocity()) * mass).clamp_length_max(c.max_force());
        let accel = force / mass * delta_t;

        let v = (c.body().velocity() + accel).clamp_length_max(c.max_speed());
        gs.character_mut(i).body_mut().set_velocity(v);
    }
}

/// Phase 3: repeated impulse passes until no body pair is still closing.
/// Each pass rechecks every pair against the velocities the previous
/// resolutions produced, so chains of touching bodies settle too.
fn resolve_collisions(gs: &mut GameState) {
    let n = gs.characters().len();
    let mut passes: u32 = 0;
    loop {
        let mut resolved_any = false;

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                if gs.character(i).body().is_colliding(gs.character(j).body()) {
                    bounce_characters(gs, i, j);
                    transfer_tag(gs, i, j);
                    resolved_any = true;
                }
            }
        }

        for i in 0..n {
            for o in 0..gs.obstacles().len() {
                if gs.character(i).body().is_colliding(&gs.obstacles()[o]) {
                    bounce_off_fixed(gs, i, o);
                    resolved_any = true;
                }
            }
        }

        if !resolved_any {
            break;
        }
        passes += 1;
        if passes == COLLISION_PASS_LIMIT / 10 {
            log::warn!("collision resolution still unsettled after {passes} passes");
        }
        assert!(
            passes < COLLISION_PASS_LIMIT,
            "collision resolution failed to converge after {passes} passes"
        );
    }
}

/// Elastic impulse between two characters. Velocities are decomposed
/// along the contact tangent `t` (the center line) and its perpendicular
/// `n`; only the tangential parts exchange momentum.
fn bounce_characters(gs: &mut GameState, i: usize, j: usize) {
    let (t, ui, uj, mi, mj) = {
        let bi = gs.character(i).body();
        let bj = gs.character(j).body();
        (
            bi.normal_to(bj),
            bi.velocity(),
            bj.velocity(),
            bi.mass(),
            bj.mass(),
        )
    };
    let n = Vec2::new(t.y, -t.x);

    let (vit, vjt) = impulse_pair(ui.dot(t), uj.dot(t), mi, mj, RESTITUTION);
    let vi = t * vit + n * ui.dot(n);
    let vj = t * vjt + n * uj.dot(n);

    let now = gs.ticks();
    let ci = gs.character_mut(i);
    ci.body_mut().set_velocity(vi);
    ci.set_collide_time(now);
    let cj = gs.character_mut(j);
    cj.body_mut().set_velocity(vj);
    cj.set_collide_time(now);
}

/// Character `i` bounces off fixed obstacle `o`; the obstacle is unmoved
fn bounce_off_fixed(gs: &mut GameState, i: usize, o: usize) {
    let (t, ui) = {
        let bi = gs.character(i).body();
        (bi.normal_to(&gs.obstacles()[o]), bi.velocity())
    };
    let n = Vec2::new(t.y, -t.x);

    let vit = impulse_immovable(ui.dot(t), RESTITUTION);
    let vi = t * vit + n * ui.dot(n);

    let now = gs.ticks();
    let ci = gs.character_mut(i);
    ci.body_mut().set_velocity(vi);
    ci.set_collide_time(now);
}

/// The tag passes between a colliding pair in whichever direction applies,
/// but only once the re-tag cooldown since the previous transfer has
/// elapsed. Updating the cooldown inside the transfer keeps a pair from
/// trading the tag back within the same tick.
fn transfer_tag(gs: &mut GameState, i: usize, j: usize) {
    let now = gs.ticks();
    if now - gs.last_tag_tick() <= MIN_TAG_INTERVAL_TICKS {
        return;
    }
    let (from, to) = if gs.character(j).is_tagged() {
        (j, i)
    } else if gs.character(i).is_tagged() {
        (i, j)
    } else {
        return;
    };
    gs.character_mut(from).set_tag_time(-1);
    gs.set_tagged(to, now);
    gs.set_last_tag_tick(now);
    log::debug!("tag passed from character {from} to character {to} at tick {now}");
}

/// Phase 4: integrate positions and wrap them into the world rectangle
fn update_positions(gs: &mut GameState, delta_t: f32) {
    let bounds = gs.world_dim();
    for i in 0..gs.characters().len() {
        let body = gs.character_mut(i).body_mut();
        let p = (body.position() + body.velocity() * delta_t).wrapped(bounds);
        body.set_position(p);
    }
}
