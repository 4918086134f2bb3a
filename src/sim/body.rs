//! Physical bodies: obstacles and the characters that play tag
//!
//! An [`Obstacle`] wraps exactly one [`Shape`] and adds mass and a scalar
//! speed; velocity is derived as speed along the shape's orientation.
//! A [`Character`] is a circular obstacle with a controller, an action
//! cache, and tag state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shape::{Circle, Shape};
use crate::almost_zero;
use crate::consts::{
    CHARACTER_MAX_FORCE, CHARACTER_MAX_SPEED, CHARACTER_MAX_TURN_RATE, TAGGED_SPEED_FACTOR,
};

/// Handle for a controller registered with the simulator. Several
/// characters may share one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerId(pub usize);

/// A steering decision: a unit direction and a speed expressed as a
/// fraction of the actor's max speed.
///
/// Direction and speed are kept separate so a character can stop and still
/// remember which way it was facing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Action {
    direction: Vec2,
    speed: f32,
}

impl Action {
    pub fn new(direction: Vec2, speed: f32) -> Self {
        debug_assert!(
            direction == Vec2::ZERO || crate::almost_eq(direction.length(), 1.0),
            "action direction must be unit length"
        );
        debug_assert!(
            (0.0..=1.0).contains(&speed),
            "action speed must be a fraction in [0, 1]"
        );
        Self { direction, speed }
    }

    /// Stand still, facing +x
    pub fn idle() -> Self {
        Self {
            direction: Vec2::X,
            speed: 0.0,
        }
    }

    #[inline]
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::idle()
    }
}

/// Infinite mass survives a JSON round trip as null, which serde rejects
/// for plain f32; immovable bodies serialize their mass as None instead.
mod mass_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(mass: &f32, ser: S) -> Result<S::Ok, S::Error> {
        let repr = if mass.is_finite() { Some(*mass) } else { None };
        repr.serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<f32, D::Error> {
        Ok(Option::<f32>::deserialize(de)?.unwrap_or(f32::INFINITY))
    }
}

/// A physical body: one shape plus mass and scalar speed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    shape: Shape,
    /// `f32::INFINITY` marks an immovable body (the default)
    #[serde(with = "mass_serde")]
    mass: f32,
    speed: f32,
}

impl Obstacle {
    /// New immovable body; give it a finite mass to make it movable
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            mass: f32::INFINITY,
            speed: 0.0,
        }
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.shape.position()
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.shape.set_position(position);
    }

    #[inline]
    pub fn orientation(&self) -> Vec2 {
        self.shape.orientation()
    }

    pub fn set_orientation(&mut self, orientation: Vec2) {
        self.shape.set_orientation(orientation);
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        // An infinitely heavy body cannot be given a speed.
        assert!(self.mass < f32::INFINITY, "immovable body cannot move");
        self.speed = speed;
    }

    /// Velocity derived from orientation and scalar speed
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.orientation() * self.speed
    }

    /// Decompose a velocity into orientation and speed. A near-zero
    /// velocity stops the body but keeps its facing, avoiding a divide by
    /// a near-zero length.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        let s = velocity.length();
        if almost_zero(s) {
            self.set_speed(0.0);
        } else {
            self.set_speed(s);
            self.set_orientation(velocity / s);
        }
    }

    pub fn is_touching(&self, other: &Obstacle) -> bool {
        self.shape.is_touching(&other.shape)
    }

    /// Touching and approaching: the relative velocity along the contact
    /// normal closes the gap. Bodies that merely overlap while separating
    /// are not re-resolved.
    pub fn is_colliding(&self, other: &Obstacle) -> bool {
        if !self.is_touching(other) {
            return false;
        }
        let n = self.normal_to(other);
        self.velocity().dot(n) > other.velocity().dot(n)
    }

    pub fn normal_to(&self, other: &Obstacle) -> Vec2 {
        self.shape.normal_to(&other.shape)
    }

    pub fn distance_to(&self, other: &Obstacle) -> f32 {
        self.shape.distance_to(&other.shape)
    }

    pub fn distance_squared_to(&self, other: &Obstacle) -> f32 {
        self.shape.distance_squared_to(&other.shape)
    }

    pub fn nearest_intersection(&self, p: Vec2, v: Vec2) -> Option<Vec2> {
        self.shape.nearest_intersection(p, v)
    }
}

/// An NPC or player character: a circular movable obstacle with a
/// controller and tag state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    body: Obstacle,
    controller: ControllerId,
    /// Controllers can be shared across characters, so each character
    /// keeps its own copy of the last computed action.
    action: Action,
    base_max_speed: f32,
    max_force: f32,
    pub max_turn_rate: f32,
    /// Tick at which this character became tagged; -1 while untagged
    tag_time: i64,
    /// Tick of this character's most recent collision; -1 if never
    collide_time: i64,
}

impl Character {
    pub fn new(radius: f32, controller: ControllerId) -> Self {
        let mut body = Obstacle::new(Shape::Circle(Circle::new(radius)));
        body.set_mass(1.0);
        Self {
            body,
            controller,
            action: Action::idle(),
            base_max_speed: CHARACTER_MAX_SPEED,
            max_force: CHARACTER_MAX_FORCE,
            max_turn_rate: CHARACTER_MAX_TURN_RATE,
            tag_time: -1,
            collide_time: -1,
        }
    }

    #[inline]
    pub fn body(&self) -> &Obstacle {
        &self.body
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut Obstacle {
        &mut self.body
    }

    #[inline]
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    pub fn set_controller(&mut self, controller: ControllerId) {
        self.controller = controller;
    }

    #[inline]
    pub fn action(&self) -> Action {
        self.action
    }

    pub fn set_action(&mut self, action: Action) {
        self.action = action;
    }

    pub fn radius(&self) -> f32 {
        self.body
            .shape()
            .as_circle()
            .expect("characters are circular")
            .radius()
    }

    #[inline]
    pub fn is_tagged(&self) -> bool {
        self.tag_time >= 0
    }

    #[inline]
    pub fn tag_time(&self) -> i64 {
        self.tag_time
    }

    /// A non-negative tick marks this character tagged at that tick;
    /// a negative tick clears the status.
    pub fn set_tag_time(&mut self, tick: i64) {
        self.tag_time = tick;
    }

    #[inline]
    pub fn collide_time(&self) -> i64 {
        self.collide_time
    }

    pub fn set_collide_time(&mut self, tick: i64) {
        self.collide_time = tick;
    }

    /// Top speed, handicapped while tagged so the chase stays winnable
    pub fn max_speed(&self) -> f32 {
        if self.is_tagged() {
            TAGGED_SPEED_FACTOR * self.base_max_speed
        } else {
            self.base_max_speed
        }
    }

    #[inline]
    pub fn max_force(&self) -> f32 {
        self.max_force
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2Ext;

    fn character_at(pos: Vec2, radius: f32) -> Character {
        let mut c = Character::new(radius, ControllerId(0));
        c.body_mut().set_position(pos);
        c
    }

    #[test]
    fn test_velocity_round_trip() {
        let mut c = character_at(Vec2::ZERO, 2.0);
        c.body_mut().set_velocity(Vec2::new(3.0, 4.0));
        assert!(crate::almost_eq(c.body().speed(), 5.0));
        assert!(c.body().orientation().almost_eq(Vec2::new(0.6, 0.8)));
        assert!(c.body().velocity().almost_eq(Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn test_zero_velocity_keeps_facing() {
        let mut c = character_at(Vec2::ZERO, 2.0);
        c.body_mut().set_velocity(Vec2::new(0.0, 7.0));
        c.body_mut().set_velocity(Vec2::ZERO);
        assert_eq!(c.body().speed(), 0.0);
        assert!(c.body().orientation().almost_eq(Vec2::Y));
    }

    #[test]
    #[should_panic(expected = "immovable body cannot move")]
    fn test_immovable_body_rejects_speed() {
        let mut wall = Obstacle::new(Shape::Circle(Circle::new(10.0)));
        wall.set_speed(1.0);
    }

    #[test]
    fn test_touching_vs_colliding() {
        let mut a = character_at(Vec2::ZERO, 2.0);
        let b = character_at(Vec2::new(4.0, 0.0), 2.0);

        // Touching but at rest: no closing velocity, no collision.
        assert!(a.body().is_touching(b.body()));
        assert!(!a.body().is_colliding(b.body()));

        // Approaching: collision.
        a.body_mut().set_velocity(Vec2::new(2.0, 0.0));
        assert!(a.body().is_colliding(b.body()));

        // Separating while still overlapping: not a collision.
        a.body_mut().set_velocity(Vec2::new(-2.0, 0.0));
        assert!(!a.body().is_colliding(b.body()));
    }

    #[test]
    fn test_tagged_speed_handicap() {
        let mut c = character_at(Vec2::ZERO, 2.0);
        let full = c.max_speed();
        c.set_tag_time(100);
        assert!(c.is_tagged());
        assert!(crate::almost_eq(c.max_speed(), 0.8 * full));
        c.set_tag_time(-1);
        assert!(!c.is_tagged());
        assert!(crate::almost_eq(c.max_speed(), full));
    }

    #[test]
    fn test_immovable_mass_survives_json() {
        let wall = Obstacle::new(Shape::Circle(Circle::new(10.0)));
        let json = serde_json::to_string(&wall).unwrap();
        let back: Obstacle = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mass(), f32::INFINITY);
    }
}
