//! Small fixed-size math types shared by references, metrics and the packer.

use std::ops::{Add, Neg};

// ───────────────────────────────────────────────────────────────────
// Vec2 — texture-space offsets and scales
// ───────────────────────────────────────────────────────────────────

/// Two-component float vector (8 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const ONE: Vec2 = Vec2 { x: 1.0, y: 1.0 };

    #[inline(always)]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Componentwise product.
    #[inline(always)]
    pub fn mul_componentwise(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x * other.x, self.y * other.y)
    }

    /// Componentwise reciprocal, mapping zero components to zero.
    #[inline]
    pub fn recip_or_zero(self) -> Vec2 {
        let recip = |v: f32| if v.abs() < f32::EPSILON { 0.0 } else { 1.0 / v };
        Vec2::new(recip(self.x), recip(self.y))
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    #[inline(always)]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    #[inline(always)]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

// ───────────────────────────────────────────────────────────────────
// Pixel-space integer types
// ───────────────────────────────────────────────────────────────────

/// Pixel-space point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PointI {
    pub x: i32,
    pub y: i32,
}

impl PointI {
    #[inline(always)]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pixel-space rectangle stored as left/top/right/bottom edges
/// (right and bottom exclusive).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RectI {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl RectI {
    #[inline(always)]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create from origin + size.
    #[inline(always)]
    pub const fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    #[inline(always)]
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline(always)]
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Area in pixels; zero for degenerate or inverted rectangles.
    #[inline]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width()) * i64::from(self.height())
        }
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}
