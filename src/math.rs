//! 2D vector and matrix helpers
//!
//! The simulation uses `glam::Vec2` for all 2D quantities. This module adds
//! the handful of operations glam does not provide (toroidal wrap, epsilon
//! comparison, random sampling) plus a tiny row-major 2x2 matrix whose
//! column view is derived lazily and cached.

use std::cell::Cell;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::almost_zero;

/// Extra vector operations used throughout the simulation
pub trait Vec2Ext: Sized {
    /// Component-wise near-equality with absolute tolerance [`crate::EPSILON`]
    fn almost_eq(self, other: Vec2) -> bool;
    /// True iff every component is within [`crate::EPSILON`] of zero
    fn almost_zero(self) -> bool;
    /// Rescale to the given length; a near-zero vector stays zero
    fn set_length(self, len: f32) -> Self;
    /// Bring each component into `[0, bounds[i])` by repeated add/subtract.
    /// Bounds must be strictly positive or the loop would never terminate.
    fn wrapped(self, bounds: Vec2) -> Self;
    /// Randomly exchange the two components
    fn shuffled(self, rng: &mut Pcg32) -> Self;
    /// Rescale so the components sum to one (a distribution over two outcomes)
    fn probability_distribution(self) -> Self;
    /// This vector expressed relative to `origin`
    fn relative_to(self, origin: Vec2) -> Self;
}

impl Vec2Ext for Vec2 {
    fn almost_eq(self, other: Vec2) -> bool {
        crate::almost_eq(self.x, other.x) && crate::almost_eq(self.y, other.y)
    }

    fn almost_zero(self) -> bool {
        almost_zero(self.x) && almost_zero(self.y)
    }

    fn set_length(self, len: f32) -> Self {
        let l = self.length();
        if almost_zero(l) {
            Vec2::ZERO
        } else {
            self * (len / l)
        }
    }

    fn wrapped(self, bounds: Vec2) -> Self {
        let mut v = self;
        for i in 0..2 {
            assert!(bounds[i] > 0.0, "wrap bounds must be positive");
            while v[i] < 0.0 {
                v[i] += bounds[i];
            }
            while v[i] >= bounds[i] {
                v[i] -= bounds[i];
            }
        }
        v
    }

    fn shuffled(self, rng: &mut Pcg32) -> Self {
        if rng.random_bool(0.5) {
            Vec2::new(self.y, self.x)
        } else {
            self
        }
    }

    fn probability_distribution(self) -> Self {
        let s = self.x + self.y;
        if s <= 0.0 {
            log::warn!("probability_distribution: component sum {s} is not positive");
            return self;
        }
        self / s
    }

    fn relative_to(self, origin: Vec2) -> Self {
        self - origin
    }
}

/// Uniform sample in the unit square, one coordinate per component
pub fn random_unit_square(rng: &mut Pcg32) -> Vec2 {
    Vec2::new(rng.random::<f32>(), rng.random::<f32>())
}

/// Uniform random position inside the world bounds
pub fn random_position(bounds: Vec2, rng: &mut Pcg32) -> Vec2 {
    random_unit_square(rng) * bounds
}

/// Unit vector at the given heading in degrees
pub fn dir(degrees: f32) -> Vec2 {
    let t = degrees.to_radians();
    Vec2::new(t.cos(), t.sin())
}

/// Uniformly distributed unit vector
pub fn uniform_dir(rng: &mut Pcg32) -> Vec2 {
    dir(rng.random::<f32>() * 360.0 - 180.0)
}

/// Heading of a vector in degrees, in [-180, 180]
pub fn angle(v: Vec2) -> f32 {
    v.y.atan2(v.x).to_degrees()
}

/// A 2x2 matrix stored as rows. The column view is derived on demand and
/// cached; any row mutation invalidates the cache.
#[derive(Debug, Clone)]
pub struct RowMat2 {
    rows: [Vec2; 2],
    cols: Cell<Option<[Vec2; 2]>>,
}

impl RowMat2 {
    pub fn from_rows(r0: Vec2, r1: Vec2) -> Self {
        Self {
            rows: [r0, r1],
            cols: Cell::new(None),
        }
    }

    /// Rotation by `t` radians (counter-clockwise)
    pub fn rotation(t: f32) -> Self {
        let (s, c) = t.sin_cos();
        Self::from_rows(Vec2::new(c, -s), Vec2::new(s, c))
    }

    pub fn row(&self, i: usize) -> Vec2 {
        self.rows[i]
    }

    pub fn set_row(&mut self, i: usize, v: Vec2) {
        self.rows[i] = v;
        self.cols.set(None);
    }

    /// Column `j`, computed lazily and memoized until a row changes
    pub fn col(&self, j: usize) -> Vec2 {
        let cols = self.cols.get().unwrap_or_else(|| {
            let computed = [
                Vec2::new(self.rows[0].x, self.rows[1].x),
                Vec2::new(self.rows[0].y, self.rows[1].y),
            ];
            self.cols.set(Some(computed));
            computed
        });
        cols[j]
    }

    /// Matrix-vector product (rows dotted with v)
    pub fn mul_vec2(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.rows[0].dot(v), self.rows[1].dot(v))
    }
}

/// The two unit-independent perpendiculars of v, one per row
pub fn perpendicular_pair(v: Vec2) -> RowMat2 {
    RowMat2::from_rows(Vec2::new(v.y, -v.x), Vec2::new(-v.y, v.x))
}

/// The perpendicular of unit vector `v` closest in direction to unit vector `d`
pub fn perpendicular_toward(v: Vec2, d: Vec2) -> Vec2 {
    debug_assert!(crate::almost_eq(v.length(), 1.0));
    debug_assert!(crate::almost_eq(d.length(), 1.0));

    let pair = perpendicular_pair(v);
    let cos_a = d.dot(pair.row(0));

    if almost_zero(cos_a) {
        return pair.row(0);
    }
    // The two rows point 180 degrees apart, so the sign picks one unambiguously.
    if cos_a > 0.0 { pair.row(0) } else { pair.row(1) }
}
