//! Region shapes: circles and axis-aligned rectangles
//!
//! Coordinates follow screen convention (y grows downward). A circle's
//! location is its center, a rectangle's location is its top-left origin.
//!
//! Boundary rules:
//! - circle vs circle overlaps only when strictly closer than the radii sum,
//!   so tangent circles do not intersect
//! - circle vs rectangle and rectangle vs rectangle include shared boundaries
//! - point containment includes the boundary for both variants

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::error::SimError;

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left corner
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const EMPTY: Rect = Rect {
        origin: Vec2::ZERO,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            width,
            height,
        }
    }

    /// Build the rectangle spanning two corners (in any order)
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self {
            origin: min,
            width: max.x - min.x,
            height: max.y - min.y,
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.origin.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.origin.x + self.width
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.origin.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.origin.y + self.height
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        self.origin + self.size() * 0.5
    }

    /// Corners in order: top-left, top-right, bottom-left, bottom-right
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.left(), self.top()),
            Vec2::new(self.right(), self.top()),
            Vec2::new(self.left(), self.bottom()),
            Vec2::new(self.right(), self.bottom()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    /// Box overlap, shared edges included
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.top() <= other.bottom()
            && other.top() <= self.bottom()
    }

    pub fn offset(&mut self, delta: Vec2) {
        self.origin += delta;
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            origin: self.origin + delta,
            ..*self
        }
    }

    /// Grow (or shrink, with negative amounts) by the given margins on every side
    pub fn inflate(&self, horizontal: f32, vertical: f32) -> Self {
        Self {
            origin: self.origin - Vec2::new(horizontal, vertical),
            width: self.width + 2.0 * horizontal,
            height: self.height + 2.0 * vertical,
        }
    }

    /// Closest point inside the rectangle to `p`
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.left(), self.right()),
            p.y.clamp(self.top(), self.bottom()),
        )
    }
}

/// Circle given by center and radius
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub const EMPTY: Circle = Circle {
        center: Vec2::ZERO,
        radius: 0.0,
    };

    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        self.center.distance_squared(p) <= self.radius * self.radius
    }

    /// Strict: tangent circles are not intersecting
    pub fn intersects_circle(&self, other: &Circle) -> bool {
        let sum = self.radius + other.radius;
        self.center.distance_squared(other.center) < sum * sum
    }

    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        let closest = rect.clamp_point(self.center);
        self.center.distance_squared(closest) <= self.radius * self.radius
    }

    pub fn contains_circle(&self, other: &Circle) -> bool {
        self.center.distance(other.center) + other.radius <= self.radius
    }

    pub fn contains_rect(&self, rect: &Rect) -> bool {
        rect.corners().iter().all(|&c| self.contains_point(c))
    }

    pub fn bounding_box(&self) -> Rect {
        Rect {
            origin: self.center - Vec2::splat(self.radius),
            width: self.radius * 2.0,
            height: self.radius * 2.0,
        }
    }
}

/// A region used for overlap and collision queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle(Circle),
    Rectangle(Rect),
}

impl Shape {
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Shape::Circle(Circle::new(center, radius))
    }

    pub fn rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Shape::Rectangle(Rect::new(x, y, width, height))
    }

    /// Center of a circle, origin of a rectangle
    pub fn location(&self) -> Vec2 {
        match self {
            Shape::Circle(c) => c.center,
            Shape::Rectangle(r) => r.origin,
        }
    }

    pub fn set_location(&mut self, location: Vec2) {
        match self {
            Shape::Circle(c) => c.center = location,
            Shape::Rectangle(r) => r.origin = location,
        }
    }

    pub fn offset(&mut self, delta: Vec2) {
        let location = self.location();
        self.set_location(location + delta);
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        let mut shape = *self;
        shape.offset(delta);
        shape
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Shape::Circle(c) => c.is_empty(),
            Shape::Rectangle(r) => r.is_empty(),
        }
    }

    pub fn bounding_box(&self) -> Rect {
        match self {
            Shape::Circle(c) => c.bounding_box(),
            Shape::Rectangle(r) => *r,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        match self {
            Shape::Circle(c) => c.contains_point(point),
            Shape::Rectangle(r) => r.contains_point(point),
        }
    }

    pub fn intersects(&self, other: &Shape) -> bool {
        match (self, other) {
            (Shape::Circle(a), Shape::Circle(b)) => a.intersects_circle(b),
            (Shape::Circle(c), Shape::Rectangle(r)) | (Shape::Rectangle(r), Shape::Circle(c)) => {
                c.intersects_rect(r)
            }
            (Shape::Rectangle(a), Shape::Rectangle(b)) => a.intersects(b),
        }
    }

    /// Whether `other` lies entirely inside this shape
    ///
    /// Circles can hold circles and rectangles, rectangles can hold rectangles.
    /// A rectangle never reports containing a circle.
    pub fn contains_shape(&self, other: &Shape) -> bool {
        match (self, other) {
            (Shape::Circle(outer), Shape::Circle(inner)) => outer.contains_circle(inner),
            (Shape::Circle(outer), Shape::Rectangle(inner)) => outer.contains_rect(inner),
            (Shape::Rectangle(outer), Shape::Rectangle(inner)) => outer.contains_rect(inner),
            (Shape::Rectangle(_), Shape::Circle(_)) => false,
        }
    }

    /// Check extents are finite and non-negative
    pub fn validate(&self) -> Result<(), SimError> {
        let (location, extents) = match self {
            Shape::Circle(c) => (c.center, Vec2::splat(c.radius)),
            Shape::Rectangle(r) => (r.origin, r.size()),
        };
        if !location.is_finite() || !extents.is_finite() {
            return Err(SimError::InvalidShape(format!(
                "non-finite coordinates in {self:?}"
            )));
        }
        if extents.min_element() < 0.0 {
            return Err(SimError::InvalidShape(format!(
                "negative extent in {self:?}"
            )));
        }
        Ok(())
    }
}

impl From<Circle> for Shape {
    fn from(c: Circle) -> Self {
        Shape::Circle(c)
    }
}

impl From<Rect> for Shape {
    fn from(r: Rect) -> Self {
        Shape::Rectangle(r)
    }
}
