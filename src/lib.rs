//! Toro Tag - a multi-agent tag game on a toroidal 2D arena
//!
//! Core modules:
//! - `math`: 2D vector extensions and the small row/column matrix helper
//! - `sim`: Deterministic simulation (shapes, bodies, perception, physics)
//! - `controllers`: Pluggable steering strategies consumed by the simulator

pub mod controllers;
pub mod math;
pub mod sim;

pub use controllers::Controller;
pub use sim::{Action, GameState, Perception, Simulator};

/// Game configuration constants
pub mod consts {
    /// Simulation clock resolution (game ticks per second)
    pub const TICKS_PER_SEC: i64 = 1000;

    /// Default world bounds (toroidal, positions wrap at the edges)
    pub const WORLD_DIM: f32 = 512.0;

    /// Character defaults
    pub const CHARACTER_RADIUS: f32 = 10.0;
    pub const CHARACTER_MAX_SPEED: f32 = 100.0;
    pub const CHARACTER_MAX_FORCE: f32 = 150.0;
    pub const CHARACTER_MAX_TURN_RATE: f32 = 10.0;
    /// Max-speed handicap applied while a character is tagged
    pub const TAGGED_SPEED_FACTOR: f32 = 0.8;

    /// Fixed circular obstacle default radius
    pub const OBSTACLE_RADIUS: f32 = 10.0;

    /// Coefficient of restitution for collision impulses
    pub const RESTITUTION: f32 = 0.75;
    /// Minimum ticks between re-tagging
    pub const MIN_TAG_INTERVAL_TICKS: i64 = 3000;
    /// How many ticks ago still counts as "recently" tagged
    pub const RECENT_TAG_THRESHOLD_TICKS: i64 = 5000;
    /// Hard cap on collision-resolution passes per tick
    pub const COLLISION_PASS_LIMIT: u32 = 1000;

    /// Wall contact is modeled but switched off: the arena wraps instead.
    /// The boundary sides still exist as obstacles so ray-cast percepts
    /// and future wall physics have geometry to work against.
    pub const WALL_CONTACT_ENABLED: bool = false;
}

/// Absolute tolerance for near-equality of scalars and vector components
pub const EPSILON: f32 = 1e-5;

/// True iff x is within [`EPSILON`] of y. Two infinities of the same sign
/// compare equal ("no intersection" sentinels must match each other).
#[inline]
pub fn almost_eq(x: f32, y: f32) -> bool {
    (x - y).abs() <= EPSILON || (x == f32::INFINITY && y == f32::INFINITY)
}

/// True iff x is within [`EPSILON`] of zero
#[inline]
pub fn almost_zero(x: f32) -> bool {
    almost_eq(x, 0.0)
}
