//! Toroidal space arithmetic.
//!
//! Both axes wrap around, so every position is taken modulo the world size
//! and every displacement is the shortest vector between two points.

use glam::{UVec2, Vec2};

/// Metric of a toroidal world of fixed integer size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpaceMetric {
    size: Vec2,
}

impl SpaceMetric {
    /// Creates the metric of a `size.x` × `size.y` torus.
    ///
    /// ### Panics
    /// Panics if one of the axes is zero. Validated parameters never are.
    pub fn new(size: UVec2) -> Self {
        assert!(size.x > 0 && size.y > 0, "world size must be positive");
        Self {
            size: size.as_vec2(),
        }
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Wraps a position into `[0, size)` on both axes.
    pub fn correct_position(&self, pos: Vec2) -> Vec2 {
        Vec2::new(wrap(pos.x, self.size.x), wrap(pos.y, self.size.y))
    }

    /// Reduces an arbitrary vector to its shortest representative.
    ///
    /// Each component ends up in `(-size/2, size/2]`, so a difference of
    /// exactly half the world size always resolves to the positive direction.
    pub fn correct_displacement(&self, d: Vec2) -> Vec2 {
        Vec2::new(shortest(d.x, self.size.x), shortest(d.y, self.size.y))
    }

    /// Shortest signed vector pointing from `from` to `to`.
    pub fn displacement(&self, from: Vec2, to: Vec2) -> Vec2 {
        self.correct_displacement(to - from)
    }

    /// Euclidean length of [`SpaceMetric::displacement`].
    pub fn distance(&self, from: Vec2, to: Vec2) -> f32 {
        self.displacement(from, to).length()
    }

    /// Translates `pos` by `shift` and wraps the result.
    pub fn shift_position(&self, pos: Vec2, shift: Vec2) -> Vec2 {
        self.correct_position(pos + shift)
    }

    /// Whether `pos` lies in the rectangle spanning `extent` from `top_left`,
    /// with the rectangle itself wrapping around the world edges.
    pub fn contains(&self, top_left: Vec2, extent: Vec2, pos: Vec2) -> bool {
        let offset = self.correct_position(pos - top_left);
        let covers = |offset: f32, extent: f32, size: f32| extent >= size || offset < extent;
        covers(offset.x, extent.x, self.size.x) && covers(offset.y, extent.y, self.size.y)
    }
}

fn wrap(value: f32, size: f32) -> f32 {
    let wrapped = value.rem_euclid(size);
    // rem_euclid may round tiny negative inputs up to exactly `size`.
    if wrapped >= size { 0.0 } else { wrapped }
}

fn shortest(delta: f32, size: f32) -> f32 {
    let wrapped = wrap(delta, size);
    if wrapped > size * 0.5 {
        wrapped - size
    } else {
        wrapped
    }
}
