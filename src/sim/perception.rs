//! Read-only world queries for controllers
//!
//! A [`Perception`] borrows the game state and answers questions from the
//! point of view of one character at a time. The simulator builds one per
//! frame and rebinds it to each character in turn; derived queries that
//! scan the whole world (nearest character, nearest obstacle, first body
//! hit by the facing ray) are computed once per binding and memoized.
//!
//! Controllers only ever see a `&Perception`, so they can observe the
//! world but never mutate it.

use std::cell::Cell;

use glam::Vec2;

use super::body::Obstacle;
use super::state::{BodyId, GameState};
use crate::consts::RECENT_TAG_THRESHOLD_TICKS;

/// One character's view of the world
pub struct Perception<'a> {
    gs: &'a GameState,
    me: usize,
    // Memoized per-binding scans. The outer Option is "not yet computed".
    nearest_character: Cell<Option<usize>>,
    nearest_obstacle: Cell<Option<BodyId>>,
    next_collider: Cell<Option<Option<BodyId>>>,
}

impl<'a> Perception<'a> {
    /// View bound to character 0; use [`bind`](Self::bind) to retarget
    pub fn new(gs: &'a GameState) -> Self {
        assert!(
            !gs.characters().is_empty(),
            "perception needs at least one character"
        );
        Self {
            gs,
            me: 0,
            nearest_character: Cell::new(None),
            nearest_obstacle: Cell::new(None),
            next_collider: Cell::new(None),
        }
    }

    /// Rebind the view to another character, dropping all memoized scans
    pub fn bind(&mut self, me: usize) {
        assert!(me < self.gs.characters().len());
        self.me = me;
        self.nearest_character.set(None);
        self.nearest_obstacle.set(None);
        self.next_collider.set(None);
    }

    #[inline]
    pub fn me(&self) -> usize {
        self.me
    }

    #[inline]
    fn my_body(&self) -> &Obstacle {
        self.gs.character(self.me).body()
    }

    // --- self percepts ---

    #[inline]
    pub fn my_position(&self) -> Vec2 {
        self.my_body().position()
    }

    #[inline]
    pub fn my_velocity(&self) -> Vec2 {
        self.my_body().velocity()
    }

    #[inline]
    pub fn my_speed(&self) -> f32 {
        self.my_body().speed()
    }

    #[inline]
    pub fn my_orientation(&self) -> Vec2 {
        self.my_body().orientation()
    }

    /// My outline radius
    #[inline]
    pub fn my_max_extent(&self) -> f32 {
        self.gs.character(self.me).radius()
    }

    #[inline]
    pub fn my_max_speed(&self) -> f32 {
        self.gs.character(self.me).max_speed()
    }

    #[inline]
    pub fn myself_tagged(&self) -> bool {
        self.gs.character(self.me).is_tagged()
    }

    // --- tag percepts ---

    /// The currently tagged character, if any
    pub fn tagged(&self) -> Option<usize> {
        self.gs.tags().tagged()
    }

    fn tagged_body(&self) -> &Obstacle {
        let it = self.tagged().expect("no character is tagged");
        self.gs.character(it).body()
    }

    pub fn tagged_position(&self) -> Vec2 {
        self.tagged_body().position()
    }

    pub fn tagged_velocity(&self) -> Vec2 {
        self.tagged_body().velocity()
    }

    pub fn tagged_relative_position(&self) -> Vec2 {
        self.tagged_position() - self.my_position()
    }

    pub fn distance_to_tagged(&self) -> f32 {
        self.my_body().distance_to(self.tagged_body())
    }

    pub fn distance_squared_to_tagged(&self) -> f32 {
        self.my_body().distance_squared_to(self.tagged_body())
    }

    /// Where the tagged character will be in one second at its current
    /// velocity
    pub fn tagged_future_position(&self) -> Vec2 {
        self.tagged_position() + self.tagged_velocity()
    }

    /// Who most recently passed the tag to me, if anyone ever has
    pub fn who_last_tagged_me(&self) -> Option<usize> {
        self.gs.tags().who_last_tagged(self.me)
    }

    /// How many times I was tagged in the recent past
    pub fn my_recent_tag_count(&self) -> usize {
        self.gs
            .tags()
            .recent_tag_count(self.me, self.gs.ticks(), RECENT_TAG_THRESHOLD_TICKS)
    }

    pub fn myself_recently_tagged(&self) -> bool {
        self.my_recent_tag_count() > 0
    }

    // --- world scans (memoized per binding) ---

    /// The closest other character
    pub fn nearest_character(&self) -> usize {
        if let Some(found) = self.nearest_character.get() {
            return found;
        }
        let mut best = None;
        let mut best_d2 = f32::INFINITY;
        for (i, c) in self.gs.characters().iter().enumerate() {
            if i == self.me {
                continue;
            }
            let d2 = self.my_body().distance_squared_to(c.body());
            if d2 < best_d2 {
                best_d2 = d2;
                best = Some(i);
            }
        }
        let found = best.expect("nearest character needs at least two characters");
        self.nearest_character.set(Some(found));
        found
    }

    /// The closest body of any kind. Bodies with no defined distance (the
    /// boundary sides, while wall contact is off) never win.
    pub fn nearest_obstacle(&self) -> BodyId {
        if let Some(found) = self.nearest_obstacle.get() {
            return found;
        }
        let mut best = None;
        let mut best_d = f32::INFINITY;
        for (id, body) in self.gs.bodies() {
            if id == BodyId::Character(self.me) {
                continue;
            }
            let d = self.my_body().distance_to(body);
            if d < best_d {
                best_d = d;
                best = Some(id);
            }
        }
        let found = best.expect("no obstacle within a finite distance");
        self.nearest_obstacle.set(Some(found));
        found
    }

    /// The first body my facing ray would run into, ranked by surface
    /// distance (ray hit minus my own radius), or `None` if the path
    /// ahead is clear
    pub fn next_collider(&self) -> Option<BodyId> {
        if let Some(found) = self.next_collider.get() {
            return found;
        }
        let p = self.my_position();
        let v = self.my_orientation();
        let mut best = None;
        let mut best_d = f32::INFINITY;
        for (id, body) in self.gs.bodies() {
            if id == BodyId::Character(self.me) {
                continue;
            }
            if let Some(hit) = body.nearest_intersection(p, v) {
                let d = (hit - p).length() - self.my_max_extent();
                if d < best_d {
                    best_d = d;
                    best = Some(id);
                }
            }
        }
        self.next_collider.set(Some(best));
        best
    }

    /// Where my facing ray first meets the next collider
    pub fn next_collision_point(&self) -> Option<Vec2> {
        self.next_collider().and_then(|id| {
            self.gs
                .body(id)
                .nearest_intersection(self.my_position(), self.my_orientation())
        })
    }

    /// Distance along my facing to the next collision, `INFINITY` when the
    /// path ahead is clear. A distance rather than a true time, but at a
    /// steady speed the two rank identically.
    pub fn time_to_collision(&self) -> f32 {
        match self.next_collision_point() {
            Some(cp) => (cp - self.my_position()).length(),
            None => f32::INFINITY,
        }
    }

    // --- queries about an arbitrary body ---

    pub fn position(&self, id: BodyId) -> Vec2 {
        self.gs.body(id).position()
    }

    pub fn velocity(&self, id: BodyId) -> Vec2 {
        self.gs.body(id).velocity()
    }

    pub fn relative_position(&self, id: BodyId) -> Vec2 {
        self.position(id) - self.my_position()
    }

    pub fn distance_to(&self, id: BodyId) -> f32 {
        self.my_body().distance_to(self.gs.body(id))
    }

    pub fn distance_squared_to(&self, id: BodyId) -> f32 {
        self.my_body().distance_squared_to(self.gs.body(id))
    }

    pub fn mass(&self, id: BodyId) -> f32 {
        self.gs.body(id).mass()
    }

    /// Contact normal of `id` oriented toward me
    pub fn normal_to_me(&self, id: BodyId) -> Vec2 {
        self.gs.body(id).normal_to(self.my_body())
    }

    // --- clock percepts ---

    #[inline]
    pub fn frame(&self) -> u64 {
        self.gs.frame()
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.gs.time()
    }

    #[inline]
    pub fn ticks(&self) -> i64 {
        self.gs.ticks()
    }
}
