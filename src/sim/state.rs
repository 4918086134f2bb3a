//! Authoritative world state
//!
//! One arena of bodies split by kind: characters (movable, controlled) and
//! fixed obstacles (circles and boundary sides). [`BodyId`] names a body of
//! either kind so queries can range over everything without runtime type
//! inspection. The tag ledger records who is tagged, who tagged whom, and
//! when, so perception can answer memory percepts without rescanning.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{Character, Obstacle};
use super::shape::{Shape, Side};
use crate::consts::TICKS_PER_SEC;

/// Names any body in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyId {
    Character(usize),
    Obstacle(usize),
}

/// One tag transfer: which character became tagged, and when
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TagEvent {
    pub who: usize,
    pub tick: i64,
}

/// Memory of tag transfers, pushed by the simulator as they happen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagLedger {
    tagged: Option<usize>,
    /// For each character, who most recently tagged them
    tagged_by: HashMap<usize, usize>,
    /// Every tag event since the start of the run, oldest first
    history: Vec<TagEvent>,
}

impl TagLedger {
    /// The currently tagged character, if any
    #[inline]
    pub fn tagged(&self) -> Option<usize> {
        self.tagged
    }

    pub fn who_last_tagged(&self, who: usize) -> Option<usize> {
        self.tagged_by.get(&who).copied()
    }

    /// Record that `who` became tagged at `tick`. Whoever held the tag
    /// before is remembered as the one who passed it on.
    pub fn record(&mut self, who: usize, tick: i64) {
        if let Some(old) = self.tagged.replace(who) {
            self.tagged_by.insert(who, old);
        }
        self.history.push(TagEvent { who, tick });
    }

    /// How many times `who` was tagged within the last `threshold` ticks
    /// before `now`
    pub fn recent_tag_count(&self, who: usize, now: i64, threshold: i64) -> usize {
        self.history
            .iter()
            .rev()
            .take_while(|e| now - e.tick <= threshold)
            .filter(|e| e.who == who)
            .count()
    }
}

/// Complete world state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Toroidal world bounds; positions wrap at the edges
    world_dim: Vec2,
    characters: Vec<Character>,
    /// Fixed, non-character obstacles only
    obstacles: Vec<Obstacle>,
    /// Frames advanced so far
    frame: u64,
    /// Simulation clock in seconds, advanced only by the simulator
    time: f64,
    /// Tick of the most recent tag transfer; -1 before the first
    last_tag_tick: i64,
    tags: TagLedger,
}

impl GameState {
    pub fn new(world_dim: Vec2) -> Self {
        assert!(
            world_dim.x > 0.0 && world_dim.y > 0.0,
            "world bounds must be positive"
        );
        Self {
            world_dim,
            characters: Vec::new(),
            obstacles: Vec::new(),
            frame: 0,
            time: 0.0,
            last_tag_tick: -1,
            tags: TagLedger::default(),
        }
    }

    #[inline]
    pub fn world_dim(&self) -> Vec2 {
        self.world_dim
    }

    /// Register a character; the returned index is its stable identity
    pub fn add_character(&mut self, c: Character) -> usize {
        self.characters.push(c);
        self.characters.len() - 1
    }

    /// Register a fixed obstacle
    pub fn add_obstacle(&mut self, o: Obstacle) -> usize {
        self.obstacles.push(o);
        self.obstacles.len() - 1
    }

    /// Install the four boundary walls of the world rectangle, normals
    /// pointing into the arena
    pub fn add_boundary_sides(&mut self) {
        let dim = self.world_dim;
        let corners = [
            Vec2::ZERO,
            Vec2::new(dim.x, 0.0),
            dim,
            Vec2::new(0.0, dim.y),
        ];
        let sides = [
            // left: x = 0
            Side::new(Vec2::X, 0.0, corners[3], corners[0]),
            // right: x = dim.x
            Side::new(-Vec2::X, -dim.x, corners[1], corners[2]),
            // bottom: y = 0
            Side::new(Vec2::Y, 0.0, corners[0], corners[1]),
            // top: y = dim.y
            Side::new(-Vec2::Y, -dim.y, corners[2], corners[3]),
        ];
        for side in sides {
            self.add_obstacle(Obstacle::new(Shape::Side(side)));
        }
    }

    #[inline]
    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    #[inline]
    pub fn character(&self, i: usize) -> &Character {
        &self.characters[i]
    }

    #[inline]
    pub fn character_mut(&mut self, i: usize) -> &mut Character {
        &mut self.characters[i]
    }

    #[inline]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// The physical body behind any id
    pub fn body(&self, id: BodyId) -> &Obstacle {
        match id {
            BodyId::Character(i) => self.characters[i].body(),
            BodyId::Obstacle(i) => &self.obstacles[i],
        }
    }

    /// Every body in the world, characters first, in registration order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Obstacle)> {
        self.characters
            .iter()
            .enumerate()
            .map(|(i, c)| (BodyId::Character(i), c.body()))
            .chain(
                self.obstacles
                    .iter()
                    .enumerate()
                    .map(|(i, o)| (BodyId::Obstacle(i), o)),
            )
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Game time in seconds
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Game time in ticks ([`TICKS_PER_SEC`] per second)
    #[inline]
    pub fn ticks(&self) -> i64 {
        (self.time * TICKS_PER_SEC as f64).round() as i64
    }

    /// Advance the clock and frame counter by one step of `delta_t` seconds
    pub fn advance_clock(&mut self, delta_t: f32) {
        self.time += f64::from(delta_t);
        self.frame += 1;
    }

    #[inline]
    pub fn last_tag_tick(&self) -> i64 {
        self.last_tag_tick
    }

    pub fn set_last_tag_tick(&mut self, tick: i64) {
        self.last_tag_tick = tick;
    }

    #[inline]
    pub fn tags(&self) -> &TagLedger {
        &self.tags
    }

    /// Mark `who` tagged as of `tick` and push the event into the ledger.
    /// Clearing the previous holder is the caller's job (the simulator
    /// untags the old holder when a transfer happens).
    pub fn set_tagged(&mut self, who: usize, tick: i64) {
        self.characters[who].set_tag_time(tick);
        self.tags.record(who, tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{CHARACTER_RADIUS, RECENT_TAG_THRESHOLD_TICKS};
    use crate::sim::body::ControllerId;
    use crate::sim::shape::Circle;

    fn world_with(characters: usize, obstacles: usize) -> GameState {
        let mut gs = GameState::new(Vec2::splat(512.0));
        for _ in 0..characters {
            gs.add_character(Character::new(CHARACTER_RADIUS, ControllerId(0)));
        }
        for _ in 0..obstacles {
            gs.add_obstacle(Obstacle::new(Shape::Circle(Circle::new(10.0))));
        }
        gs
    }

    #[test]
    fn test_body_iteration_order_is_stable() {
        let mut gs = world_with(2, 1);
        gs.add_boundary_sides();
        let ids: Vec<BodyId> = gs.bodies().map(|(id, _)| id).collect();
        assert_eq!(ids.len(), 2 + 1 + 4);
        assert_eq!(ids[0], BodyId::Character(0));
        assert_eq!(ids[1], BodyId::Character(1));
        assert_eq!(ids[2], BodyId::Obstacle(0));
    }

    #[test]
    fn test_clock_ticks() {
        let mut gs = world_with(0, 0);
        assert_eq!(gs.ticks(), 0);
        for _ in 0..10 {
            gs.advance_clock(0.1);
        }
        assert_eq!(gs.ticks(), 1000);
        assert_eq!(gs.frame(), 10);
    }

    #[test]
    fn test_ledger_records_transfers() {
        let mut gs = world_with(3, 0);
        gs.set_tagged(0, 100);
        assert_eq!(gs.tags().tagged(), Some(0));
        assert!(gs.character(0).is_tagged());
        // Nobody held the tag before, so nobody "tagged" character 0.
        assert_eq!(gs.tags().who_last_tagged(0), None);

        gs.character_mut(0).set_tag_time(-1);
        gs.set_tagged(2, 4200);
        assert_eq!(gs.tags().tagged(), Some(2));
        assert_eq!(gs.tags().who_last_tagged(2), Some(0));
    }

    #[test]
    fn test_recent_tag_count_window() {
        let mut ledger = TagLedger::default();
        ledger.record(1, 0);
        ledger.record(2, 1000);
        ledger.record(1, 2000);
        ledger.record(1, 8000);

        let now = 9000;
        // Window covers ticks >= 4000: only the event at 8000 qualifies.
        assert_eq!(
            ledger.recent_tag_count(1, now, RECENT_TAG_THRESHOLD_TICKS),
            1
        );
        assert_eq!(
            ledger.recent_tag_count(2, now, RECENT_TAG_THRESHOLD_TICKS),
            0
        );

        // A wider window sees all three taggings of character 1.
        assert_eq!(ledger.recent_tag_count(1, now, 10_000), 3);
    }

    #[test]
    fn test_state_survives_json() {
        let mut gs = world_with(2, 1);
        gs.add_boundary_sides();
        gs.set_tagged(1, 500);
        gs.advance_clock(0.5);

        let json = serde_json::to_string(&gs).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.frame(), gs.frame());
        assert_eq!(back.ticks(), gs.ticks());
        assert_eq!(back.tags().tagged(), Some(1));
        assert_eq!(back.characters().len(), 2);
        assert_eq!(back.obstacles().len(), 5);
    }
}
