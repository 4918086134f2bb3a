//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (owned by controllers, never ambient)
//! - Stable iteration order (by registration index)
//! - No rendering or platform dependencies

pub mod body;
pub mod perception;
pub mod shape;
pub mod simulator;
pub mod state;

pub use body::{Action, Character, ControllerId, Obstacle};
pub use perception::Perception;
pub use shape::{Circle, Shape, Side};
pub use state::{BodyId, GameState, TagEvent, TagLedger};
pub use simulator::Simulator;
