//! Shape geometry for bodies and arena walls
//!
//! Distance, contact-normal, and ray queries are defined per concrete pair
//! of shape kinds (circle-circle, circle-side, side-side), so dispatch is a
//! single match over the pair rather than virtual-call gymnastics.
//!
//! Wall (side) contact is currently switched off via
//! [`WALL_CONTACT_ENABLED`]: sides report no distance and no ray hit, and
//! characters cross the arena edge by wrapping instead. The real formulas
//! are kept (and tested) behind that switch.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::WALL_CONTACT_ENABLED;
use crate::{almost_eq, almost_zero};

/// A circular body outline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circle {
    position: Vec2,
    /// Facing direction, always unit length
    orientation: Vec2,
    radius: f32,
}

impl Circle {
    pub fn new(radius: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            orientation: Vec2::X,
            radius,
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Center distance minus both radii; negative means overlapping
    fn distance_to_circle(&self, other: &Circle) -> f32 {
        (self.position - other.position).length() - self.radius - other.radius
    }

    /// Nearest point on the circle boundary at or ahead of `p` along unit
    /// ray direction `v`. Standard ray-circle quadratic; roots within
    /// epsilon of zero count as forward hits.
    fn ray_intersection(&self, p: Vec2, v: Vec2) -> Option<Vec2> {
        let rp = p - self.position;
        let k0 = rp.length_squared() - self.radius * self.radius;
        let k1 = v.dot(rp);

        let disc = k1 * k1 - k0;
        let mut roots = [0.0f32; 2];
        let count = if almost_zero(disc) {
            roots[0] = -k1;
            1
        } else if disc > 0.0 {
            let sq = disc.sqrt();
            roots[0] = -k1 - sq;
            roots[1] = -k1 + sq;
            2
        } else {
            0
        };

        roots[..count]
            .iter()
            .copied()
            .find(|&t| almost_zero(t) || t > 0.0)
            .map(|t| p + v * t)
    }
}

/// One wall of the bounding world: a directed segment on the line
/// `normal . x = offset`, with the normal pointing into the arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Side {
    normal: Vec2,
    /// Signed distance of the supporting line from the origin
    offset: f32,
    begin: Vec2,
    end: Vec2,
}

impl Side {
    pub fn new(normal: Vec2, offset: f32, begin: Vec2, end: Vec2) -> Self {
        assert!(
            almost_eq(normal.length(), 1.0),
            "side normal must be unit length"
        );
        Self {
            normal,
            offset,
            begin,
            end,
        }
    }

    #[inline]
    pub fn normal(&self) -> Vec2 {
        self.normal
    }

    #[inline]
    pub fn begin(&self) -> Vec2 {
        self.begin
    }

    #[inline]
    pub fn end(&self) -> Vec2 {
        self.end
    }

    /// Signed clearance between the wall line and the circle edge
    fn clearance_to_circle(&self, c: &Circle) -> f32 {
        let d = self.normal.dot(c.position) - self.offset;
        if d < 0.0 {
            d + c.radius()
        } else {
            d - c.radius()
        }
    }

    /// Intersection of the ray from `p` along `v` with the wall segment
    fn ray_hit(&self, p: Vec2, v: Vec2) -> Option<Vec2> {
        let u = self.end - self.begin;
        let d = v.y * u.x - v.x * u.y;
        // Parallel ray and segment never meet.
        if almost_zero(d) {
            return None;
        }

        let s = (v.x * (self.begin.y - p.y) - v.y * (self.begin.x - p.x)) / d;
        if !(0.0..=1.0).contains(&s) {
            return None;
        }

        let t = (u.x * (self.begin.y - p.y) - u.y * (self.begin.x - p.x)) / d;
        if t < 0.0 {
            return None;
        }

        Some(self.begin + u * s)
    }
}

/// A geometric primitive with a position and a unit orientation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Shape {
    Circle(Circle),
    Side(Side),
}

impl Shape {
    pub fn position(&self) -> Vec2 {
        match self {
            Shape::Circle(c) => c.position,
            Shape::Side(s) => (s.begin + s.end) * 0.5,
        }
    }

    pub fn set_position(&mut self, position: Vec2) {
        match self {
            Shape::Circle(c) => c.position = position,
            Shape::Side(_) => panic!("boundary sides cannot be repositioned"),
        }
    }

    pub fn orientation(&self) -> Vec2 {
        match self {
            Shape::Circle(c) => c.orientation,
            Shape::Side(s) => s.normal,
        }
    }

    pub fn set_orientation(&mut self, orientation: Vec2) {
        assert!(
            almost_eq(orientation.length(), 1.0),
            "orientation must be unit length"
        );
        match self {
            Shape::Circle(c) => c.orientation = orientation,
            Shape::Side(_) => panic!("boundary sides have a fixed orientation"),
        }
    }

    /// The circle outline, for shapes known to be circular
    pub fn as_circle(&self) -> Option<&Circle> {
        match self {
            Shape::Circle(c) => Some(c),
            Shape::Side(_) => None,
        }
    }

    /// Signed separation between the two shape boundaries. Non-positive
    /// means the shapes touch or overlap. Sides report no contact while
    /// wall contact is disabled.
    pub fn distance_to(&self, other: &Shape) -> f32 {
        match (self, other) {
            (Shape::Circle(a), Shape::Circle(b)) => a.distance_to_circle(b),
            (Shape::Circle(c), Shape::Side(s)) | (Shape::Side(s), Shape::Circle(c)) => {
                if WALL_CONTACT_ENABLED {
                    s.clearance_to_circle(c)
                } else {
                    f32::INFINITY
                }
            }
            (Shape::Side(_), Shape::Side(_)) => {
                panic!("distance between two boundary sides is undefined")
            }
        }
    }

    pub fn distance_squared_to(&self, other: &Shape) -> f32 {
        let d = self.distance_to(other);
        d * d
    }

    pub fn is_touching(&self, other: &Shape) -> bool {
        self.distance_to(other) <= 0.0
    }

    /// Unit vector normal to the contact between self and other, oriented
    /// from self toward other (for a circle pair: along the center line)
    pub fn normal_to(&self, other: &Shape) -> Vec2 {
        match (self, other) {
            (Shape::Circle(a), Shape::Circle(b)) => {
                (b.position - a.position).normalize_or_zero()
            }
            (Shape::Circle(_), Shape::Side(s)) => -s.normal,
            (Shape::Side(s), _) => s.normal,
        }
    }

    /// Nearest point on this shape's boundary at or ahead of `p` along the
    /// unit direction `v`, or `None` if the ray never reaches it
    pub fn nearest_intersection(&self, p: Vec2, v: Vec2) -> Option<Vec2> {
        debug_assert!(almost_eq(v.length(), 1.0), "ray direction must be unit");
        match self {
            Shape::Circle(c) => c.ray_intersection(p, v),
            Shape::Side(s) => {
                if WALL_CONTACT_ENABLED {
                    s.ray_hit(p, v)
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2Ext;

    fn circle_at(pos: Vec2, radius: f32) -> Shape {
        let mut c = Shape::Circle(Circle::new(radius));
        c.set_position(pos);
        c
    }

    #[test]
    fn test_circle_circle_distance() {
        let a = circle_at(Vec2::ZERO, 2.0);
        let b = circle_at(Vec2::new(4.0, 0.0), 2.0);
        // centers 4 apart, radii sum 4: exactly touching
        assert!(almost_zero(a.distance_to(&b)));
        assert!(a.is_touching(&b));

        let c = circle_at(Vec2::new(10.0, 0.0), 2.0);
        assert!(almost_eq(a.distance_to(&c), 6.0));
        assert!(!a.is_touching(&c));
        assert!(almost_eq(a.distance_squared_to(&c), 36.0));
    }

    #[test]
    fn test_circle_circle_normal() {
        let a = circle_at(Vec2::ZERO, 1.0);
        let b = circle_at(Vec2::new(0.0, 5.0), 1.0);
        assert!(a.normal_to(&b).almost_eq(Vec2::Y));
        assert!(b.normal_to(&a).almost_eq(-Vec2::Y));
    }

    #[test]
    fn test_ray_circle_two_roots_takes_nearest() {
        let c = circle_at(Vec2::new(10.0, 0.0), 2.0);
        let hit = c.nearest_intersection(Vec2::ZERO, Vec2::X).unwrap();
        assert!(hit.almost_eq(Vec2::new(8.0, 0.0)));
    }

    #[test]
    fn test_ray_circle_from_inside() {
        let c = circle_at(Vec2::ZERO, 2.0);
        // From the center the only non-negative root is the exit point.
        let hit = c.nearest_intersection(Vec2::ZERO, Vec2::X).unwrap();
        assert!(hit.almost_eq(Vec2::new(2.0, 0.0)));
    }

    #[test]
    fn test_ray_circle_behind_is_none() {
        let c = circle_at(Vec2::new(-10.0, 0.0), 2.0);
        assert!(c.nearest_intersection(Vec2::ZERO, Vec2::X).is_none());
    }

    #[test]
    fn test_ray_circle_tangent() {
        let c = circle_at(Vec2::new(5.0, 2.0), 2.0);
        // Ray along +x grazes the circle at (5, 0).
        let hit = c.nearest_intersection(Vec2::ZERO, Vec2::X).unwrap();
        assert!((hit - Vec2::new(5.0, 0.0)).length() < 1e-2);
    }

    #[test]
    fn test_ray_circle_miss() {
        let c = circle_at(Vec2::new(5.0, 10.0), 2.0);
        assert!(c.nearest_intersection(Vec2::ZERO, Vec2::X).is_none());
    }

    #[test]
    fn test_side_contact_is_disabled() {
        let side = Shape::Side(Side::new(
            Vec2::X,
            0.0,
            Vec2::new(0.0, 512.0),
            Vec2::ZERO,
        ));
        let c = circle_at(Vec2::new(1.0, 256.0), 10.0);

        // While wall contact is off, sides are untouchable and cast no hits.
        assert_eq!(side.distance_to(&c), f32::INFINITY);
        assert!(!side.is_touching(&c));
        assert!(side.nearest_intersection(Vec2::new(50.0, 256.0), -Vec2::X).is_none());
    }

    #[test]
    fn test_side_normal_dispatch() {
        let side = Shape::Side(Side::new(
            Vec2::X,
            0.0,
            Vec2::new(0.0, 512.0),
            Vec2::ZERO,
        ));
        let c = circle_at(Vec2::new(1.0, 256.0), 10.0);
        assert_eq!(side.normal_to(&c), Vec2::X);
        assert_eq!(c.normal_to(&side), -Vec2::X);
    }

    #[test]
    fn test_side_ray_hit_formula() {
        // Exercise the gated formula directly.
        let side = Side::new(Vec2::X, 0.0, Vec2::new(0.0, 512.0), Vec2::ZERO);

        let hit = side.ray_hit(Vec2::new(50.0, 256.0), -Vec2::X).unwrap();
        assert!(hit.almost_eq(Vec2::new(0.0, 256.0)));

        // Heading away from the wall: no forward hit.
        assert!(side.ray_hit(Vec2::new(50.0, 256.0), Vec2::X).is_none());
        // Parallel to the wall: no hit.
        assert!(side.ray_hit(Vec2::new(50.0, 256.0), Vec2::Y).is_none());
        // Past the segment's extent: no hit.
        assert!(
            side.ray_hit(Vec2::new(50.0, 600.0), -Vec2::X).is_none()
        );
    }

    #[test]
    fn test_side_clearance_formula() {
        let side = Side::new(Vec2::X, 0.0, Vec2::new(0.0, 512.0), Vec2::ZERO);
        let mut c = Circle::new(10.0);
        c.position = Vec2::new(25.0, 100.0);
        assert!(almost_eq(side.clearance_to_circle(&c), 15.0));

        c.position = Vec2::new(5.0, 100.0);
        assert!(almost_eq(side.clearance_to_circle(&c), -5.0));
    }

    #[test]
    #[should_panic(expected = "unit length")]
    fn test_orientation_must_be_unit() {
        let mut c = circle_at(Vec2::ZERO, 1.0);
        c.set_orientation(Vec2::new(3.0, 4.0));
    }
}
