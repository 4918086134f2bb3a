//! Pluggable steering strategies
//!
//! A [`Controller`] turns one character's [`Perception`] into an [`Action`]
//! once per frame. Controllers are plain values owned by the simulator and
//! may keep state between frames (a held evasive action, a decision timer,
//! a seeded RNG), which is why `decide` takes `&mut self`.
//!
//! The interesting behaviors are built by composition: wrappers like
//! [`Avoid`], [`Conditional`], [`Periodic`], and [`Randomize`] decorate an
//! inner controller rather than reimplementing it.

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::math::{angle, dir, perpendicular_toward, uniform_dir, Vec2Ext};
use crate::sim::{Action, BodyId, Perception};

/// A scalar world measurement, picked by the composing code
pub type ScalarPercept = Box<dyn Fn(&Perception) -> f32>;

/// Decides one steering action per frame for one character
pub trait Controller {
    fn decide(&mut self, p: &Perception) -> Action;
}

/// Drifts in a fresh random direction every frame
pub struct Wander {
    rng: Pcg32,
}

impl Wander {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl Controller for Wander {
    fn decide(&mut self, _p: &Perception) -> Action {
        let direction = uniform_dir(&mut self.rng);
        let speed = self.rng.random::<f32>().clamp(0.25, 1.0);
        Action::new(direction, speed)
    }
}

/// Full-speed chase of the nearest other character
pub struct Pursue;

impl Controller for Pursue {
    fn decide(&mut self, p: &Perception) -> Action {
        let target = BodyId::Character(p.nearest_character());
        let direction = p.relative_position(target).normalize_or_zero();
        Action::new(direction, 1.0)
    }
}

/// Full-speed flight straight away from the tagged character
pub struct Evade;

impl Controller for Evade {
    fn decide(&mut self, p: &Perception) -> Action {
        let direction = -p.tagged_relative_position().normalize_or_zero();
        Action::new(direction, 1.0)
    }
}

/// How long an evasive action is held before rechecking, in ticks
const AVOID_HOLD_TICKS: i64 = 500;

/// Distance ahead at which an obstacle counts as an imminent collision
const AVOID_SOON: f32 = 50.0;

/// Defers to an inner controller unless an immovable obstacle lies close
/// ahead, in which case it swerves perpendicular to the current heading,
/// biased toward the obstacle's outward normal. The evasive action is held
/// for a short time so the swerve is committed rather than re-litigated
/// every frame.
pub struct Avoid {
    inner: Box<dyn Controller>,
    hold: Option<(i64, Action)>,
}

impl Avoid {
    pub fn new(inner: Box<dyn Controller>) -> Self {
        Self { inner, hold: None }
    }
}

impl Controller for Avoid {
    fn decide(&mut self, p: &Perception) -> Action {
        if let Some((until, action)) = self.hold {
            if p.ticks() < until {
                return action;
            }
            self.hold = None;
        }

        if let Some(id) = p.next_collider() {
            let immovable = p.mass(id) == f32::INFINITY;
            if immovable && p.time_to_collision() < AVOID_SOON {
                let away = perpendicular_toward(p.my_orientation(), p.normal_to_me(id));
                let action = Action::new(away, 1.0);
                self.hold = Some((p.ticks() + AVOID_HOLD_TICKS, action));
                return action;
            }
        }
        self.inner.decide(p)
    }
}

/// Routes each frame to one of two controllers based on a predicate
pub struct Conditional {
    when: Box<dyn Fn(&Perception) -> bool>,
    then: Box<dyn Controller>,
    otherwise: Box<dyn Controller>,
}

impl Conditional {
    pub fn new(
        when: Box<dyn Fn(&Perception) -> bool>,
        then: Box<dyn Controller>,
        otherwise: Box<dyn Controller>,
    ) -> Self {
        Self {
            when,
            then,
            otherwise,
        }
    }
}

impl Controller for Conditional {
    fn decide(&mut self, p: &Perception) -> Action {
        if (self.when)(p) {
            self.then.decide(p)
        } else {
            self.otherwise.decide(p)
        }
    }
}

/// Consults the inner controller at a fixed cadence and repeats its last
/// action in between
pub struct Periodic {
    inner: Box<dyn Controller>,
    period_ticks: i64,
    next_at: i64,
    last: Action,
}

impl Periodic {
    pub fn new(inner: Box<dyn Controller>, period_ticks: i64) -> Self {
        assert!(period_ticks > 0, "decision period must be positive");
        Self {
            inner,
            period_ticks,
            next_at: 0,
            last: Action::idle(),
        }
    }
}

impl Controller for Periodic {
    fn decide(&mut self, p: &Perception) -> Action {
        if p.ticks() >= self.next_at {
            self.last = self.inner.decide(p);
            self.next_at = p.ticks() + self.period_ticks;
        }
        self.last
    }
}

/// Like [`Periodic`], but the cadence stretches with a measured distance:
/// react quickly when the threat is close, lazily when it is far.
pub struct PeriodicRamp {
    inner: Box<dyn Controller>,
    percept: ScalarPercept,
    min_period: i64,
    max_period: i64,
    /// Distance at which the period reaches its maximum
    far: f32,
    next_at: i64,
    last: Action,
}

impl PeriodicRamp {
    pub fn new(
        inner: Box<dyn Controller>,
        percept: ScalarPercept,
        min_period: i64,
        max_period: i64,
        far: f32,
    ) -> Self {
        assert!(0 < min_period && min_period <= max_period);
        assert!(far > 0.0);
        Self {
            inner,
            percept,
            min_period,
            max_period,
            far,
            next_at: 0,
            last: Action::idle(),
        }
    }

    fn period(&self, p: &Perception) -> i64 {
        let d = (self.percept)(p);
        let scaled = (self.max_period as f32 * (d / self.far)) as i64;
        scaled.clamp(self.min_period, self.max_period)
    }
}

impl Controller for PeriodicRamp {
    fn decide(&mut self, p: &Perception) -> Action {
        if p.ticks() >= self.next_at {
            self.last = self.inner.decide(p);
            self.next_at = p.ticks() + self.period(p);
        }
        self.last
    }
}

/// Perturbs an inner controller's heading by a random angle whose spread
/// grows with a measured distance. Up close the inner decision passes
/// through untouched; far away the heading is close to uniformly random.
pub struct Randomize {
    inner: Box<dyn Controller>,
    percept: ScalarPercept,
    /// Distance at which the jitter reaches a full half-turn either way
    far: f32,
    rng: Pcg32,
}

impl Randomize {
    pub fn new(inner: Box<dyn Controller>, percept: ScalarPercept, far: f32, seed: u64) -> Self {
        assert!(far > 0.0);
        Self {
            inner,
            percept,
            far,
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl Controller for Randomize {
    fn decide(&mut self, p: &Perception) -> Action {
        let action = self.inner.decide(p);
        if action.direction().almost_zero() {
            return action;
        }
        let frac = ((self.percept)(p) / self.far).min(1.0);
        let jitter = (self.rng.random::<f32>() * 2.0 - 1.0) * 180.0 * frac;
        let direction = dir(angle(action.direction()) + jitter);
        Action::new(direction, action.speed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    use crate::consts::CHARACTER_RADIUS;
    use crate::math::Vec2Ext;
    use crate::sim::{Character, Circle, ControllerId, GameState, Obstacle, Shape};

    /// Counts consultations and always heads +x
    struct Counting {
        calls: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl Controller for Counting {
        fn decide(&mut self, _p: &Perception) -> Action {
            self.calls.set(self.calls.get() + 1);
            Action::new(Vec2::X, 1.0)
        }
    }

    fn counting() -> (Box<dyn Controller>, std::rc::Rc<std::cell::Cell<usize>>) {
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        (
            Box::new(Counting {
                calls: calls.clone(),
            }),
            calls,
        )
    }

    fn character_at(pos: Vec2) -> Character {
        let mut c = Character::new(CHARACTER_RADIUS, ControllerId(0));
        c.body_mut().set_position(pos);
        c
    }

    fn two_character_world() -> GameState {
        let mut gs = GameState::new(Vec2::splat(512.0));
        gs.add_character(character_at(Vec2::new(100.0, 100.0)));
        gs.add_character(character_at(Vec2::new(200.0, 100.0)));
        gs
    }

    #[test]
    fn test_wander_is_deterministic_per_seed() {
        let gs = two_character_world();
        let view = Perception::new(&gs);
        let a = Wander::new(42).decide(&view);
        let b = Wander::new(42).decide(&view);
        assert_eq!(a.direction(), b.direction());
        assert_eq!(a.speed(), b.speed());
        assert!(crate::almost_eq(a.direction().length(), 1.0));
        assert!((0.25..=1.0).contains(&a.speed()));
    }

    #[test]
    fn test_pursue_heads_for_nearest() {
        let gs = two_character_world();
        let view = Perception::new(&gs);
        let action = Pursue.decide(&view);
        assert!(action.direction().almost_eq(Vec2::X));
        assert_eq!(action.speed(), 1.0);
    }

    #[test]
    fn test_evade_flees_the_tagged() {
        let mut gs = two_character_world();
        gs.set_tagged(1, 0);
        let view = Perception::new(&gs);
        let action = Evade.decide(&view);
        assert!(action.direction().almost_eq(-Vec2::X));
    }

    #[test]
    fn test_conditional_routes_on_predicate() {
        let mut gs = two_character_world();
        gs.set_tagged(0, 0);
        let (then_ctl, then_calls) = counting();
        let (else_ctl, else_calls) = counting();
        let mut ctl = Conditional::new(
            Box::new(|p: &Perception| p.myself_tagged()),
            then_ctl,
            else_ctl,
        );

        let mut view = Perception::new(&gs);
        ctl.decide(&view);
        assert_eq!((then_calls.get(), else_calls.get()), (1, 0));

        view.bind(1);
        ctl.decide(&view);
        assert_eq!((then_calls.get(), else_calls.get()), (1, 1));
    }

    #[test]
    fn test_periodic_holds_between_decisions() {
        let mut gs = two_character_world();
        let (inner, calls) = counting();
        let mut ctl = Periodic::new(inner, 1000);

        let view = Perception::new(&gs);
        ctl.decide(&view);
        ctl.decide(&view);
        // Still inside the period: no second consultation.
        assert_eq!(calls.get(), 1);

        for _ in 0..10 {
            gs.advance_clock(0.1);
        }
        let view = Perception::new(&gs);
        ctl.decide(&view);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_periodic_ramp_stretches_with_distance() {
        let mut gs = two_character_world();
        gs.set_tagged(1, 0);
        let (inner, _calls) = counting();
        let ctl = PeriodicRamp::new(
            inner,
            Box::new(|p: &Perception| p.distance_to_tagged()),
            100,
            2000,
            200.0,
        );

        // Surface distance 80 out of 200: period scales to 800 ticks.
        let view = Perception::new(&gs);
        assert_eq!(ctl.period(&view), 800);

        // Move the tagged character far away: period pegs at the maximum.
        gs.character_mut(1)
            .body_mut()
            .set_position(Vec2::new(500.0, 500.0));
        let view = Perception::new(&gs);
        assert_eq!(ctl.period(&view), 2000);
    }

    #[test]
    fn test_avoid_swerves_from_immovable_ahead() {
        let mut gs = two_character_world();
        let mut block = Obstacle::new(Shape::Circle(Circle::new(10.0)));
        block.set_position(Vec2::new(140.0, 100.0));
        gs.add_obstacle(block);

        let (inner, calls) = counting();
        let mut ctl = Avoid::new(inner);

        // Character 0 faces +x; the block surface is 20 units ahead.
        let view = Perception::new(&gs);
        let action = ctl.decide(&view);
        assert_eq!(calls.get(), 0);
        assert!(crate::almost_zero(action.direction().dot(Vec2::X)));

        // The swerve is held on the next frame without re-deciding.
        let held = ctl.decide(&view);
        assert_eq!(held.direction(), action.direction());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_avoid_defers_when_clear() {
        let gs = two_character_world();
        let (inner, calls) = counting();
        let mut ctl = Avoid::new(inner);

        // The only thing ahead of character 0 is character 1, which has
        // finite mass and is dodged by physics, not by steering.
        let view = Perception::new(&gs);
        let action = ctl.decide(&view);
        assert_eq!(calls.get(), 1);
        assert!(action.direction().almost_eq(Vec2::X));
    }

    #[test]
    fn test_randomize_passes_through_up_close() {
        let mut gs = two_character_world();
        gs.set_tagged(1, 0);
        // Zero measured distance means zero jitter.
        gs.character_mut(1)
            .body_mut()
            .set_position(Vec2::new(120.0, 100.0));

        let (inner, _calls) = counting();
        let mut ctl = Randomize::new(
            inner,
            Box::new(|p: &Perception| p.distance_to_tagged().max(0.0)),
            200.0,
            7,
        );
        let view = Perception::new(&gs);
        let action = ctl.decide(&view);
        assert!(action.direction().almost_eq(Vec2::X));
        assert_eq!(action.speed(), 1.0);
    }
}
