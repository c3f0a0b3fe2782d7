//! Minimal 2-D geometry for the spatial index
//!
//! Points are `glam::DVec2`. Rectangles are half-open (`min <= p < max`) so
//! that the four quadrants of a rectangle tile it without overlap.

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};

/// A point (or vector) in world space
pub type Point = DVec2;

/// Axis-aligned rectangle with inclusive minimum and exclusive maximum
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Top-left (minimum) corner, inclusive
    pub min: Point,
    /// Bottom-right (maximum) corner, exclusive
    pub max: Point,
}

impl Rectangle {
    /// Create a rectangle from its minimum and maximum corners
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Create a square centered on `center` extending `half_width` each way
    pub fn around(center: Point, half_width: f64) -> Self {
        let offset = Point::splat(half_width);
        Self::new(center - offset, center + offset)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Midpoint of the rectangle
    #[inline]
    pub fn center(&self) -> Point {
        self.min + (self.max - self.min) / 2.0
    }

    /// Half-open containment test
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x
            && point.x < self.max.x
            && point.y >= self.min.y
            && point.y < self.max.y
    }

    /// Corners in order: top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }

    /// Boundary segments, walking the corners clockwise
    pub fn edges(&self) -> [Line; 4] {
        let [tl, tr, br, bl] = self.corners();
        [
            Line::new(tl, tr),
            Line::new(tr, br),
            Line::new(br, bl),
            Line::new(bl, tl),
        ]
    }

    /// Split at the midpoint of both axes
    ///
    /// Returned in order: top-left, top-right, bottom-left, bottom-right.
    pub fn quadrants(&self) -> [Rectangle; 4] {
        let mid = self.center();
        [
            Rectangle::new(self.min, mid),
            Rectangle::new(Point::new(mid.x, self.min.y), Point::new(self.max.x, mid.y)),
            Rectangle::new(Point::new(self.min.x, mid.y), Point::new(mid.x, self.max.y)),
            Rectangle::new(mid, self.max),
        ]
    }

    /// Whether halving this rectangle produces four non-empty children
    pub fn can_subdivide(&self) -> bool {
        let mid = self.center();
        self.min.x < mid.x && mid.x < self.max.x && self.min.y < mid.y && mid.y < self.max.y
    }

    /// Whether the two half-open rectangles share at least one point
    pub fn overlaps(&self, other: &Rectangle) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    /// Rectangle-vs-circle test
    ///
    /// True if the circle's center is inside, or if the orthogonal projection
    /// of the center onto any edge lands on that edge within the radius. A
    /// corner inside the circle also counts, since a circle can clip a corner
    /// while every edge projection falls outside its segment.
    pub fn intersects_circle(&self, circle: &Circle) -> bool {
        if self.contains(circle.center) {
            return true;
        }

        let edge_hit = self.edges().iter().any(|edge| {
            edge.project_point(circle.center)
                .map_or(false, |projected| circle.contains(projected))
        });

        edge_hit || self.corners().iter().any(|&corner| circle.contains(corner))
    }

    fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(MapError::UnknownShape(format!(
                "rectangle with non-finite corners {:?} .. {:?}",
                self.min, self.max
            )));
        }
        if self.min.x > self.max.x || self.min.y > self.max.y {
            return Err(MapError::UnknownShape(format!(
                "inverted rectangle {:?} .. {:?}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Circle given by center and radius; the boundary is inclusive
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Euclidean distance from the center is at most the radius
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        self.center.distance(point) <= self.radius
    }

    fn validate(&self) -> Result<()> {
        if !self.center.is_finite() || !self.radius.is_finite() || self.radius < 0.0 {
            return Err(MapError::UnknownShape(format!(
                "circle at {:?} with radius {}",
                self.center, self.radius
            )));
        }
        Ok(())
    }
}

/// Bounded line segment
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Segment from `start_radius` to `end_radius` along a polar angle
    pub fn polar(origin: Point, angle: f64, start_radius: f64, end_radius: f64) -> Self {
        Self::new(
            origin + polar_offset(angle, start_radius),
            origin + polar_offset(angle, end_radius),
        )
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Orthogonal projection of `point` onto the segment
    ///
    /// Returns `None` when the projection falls outside the segment, or the
    /// segment has zero length.
    pub fn project_point(&self, point: Point) -> Option<Point> {
        let direction = self.end - self.start;
        let length_squared = direction.length_squared();
        if length_squared == 0.0 {
            return None;
        }

        let t = (point - self.start).dot(direction) / length_squared;
        if (0.0..=1.0).contains(&t) {
            Some(self.start + direction * t)
        } else {
            None
        }
    }
}

/// Cartesian offset of a polar coordinate
#[inline]
pub fn polar_offset(angle: f64, distance: f64) -> Point {
    Point::new(distance * angle.cos(), distance * angle.sin())
}

/// Closed set of query shapes understood by the spatial index
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rectangle(Rectangle),
    Circle(Circle),
}

impl Shape {
    /// Reject shapes that cannot be interpreted (NaN coordinates, negative
    /// radius, inverted rectangle)
    pub fn validate(&self) -> Result<()> {
        match self {
            Shape::Rectangle(rect) => rect.validate(),
            Shape::Circle(circle) => circle.validate(),
        }
    }

    /// Point containment predicate for this shape
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Shape::Rectangle(rect) => rect.contains(point),
            Shape::Circle(circle) => circle.contains(point),
        }
    }

    /// Whether this shape could contain any point of `rect`
    #[inline]
    pub fn touches_rect(&self, rect: &Rectangle) -> bool {
        match self {
            Shape::Rectangle(other) => other.overlaps(rect),
            Shape::Circle(circle) => rect.intersects_circle(circle),
        }
    }

    /// Shape-vs-shape intersection, dispatched on both variants
    ///
    /// A rectangle and a circle intersect when the circle's center is inside
    /// the rectangle, when the center's projection onto an edge lies within
    /// the radius, or when a corner lies within the radius. The corner case
    /// goes beyond the plain center-or-edge rule: a rectangle `[0, 10)²` and a
    /// circle of radius 1.5 at `(-1, -1)` intersect here, but not under the
    /// center-or-edge rule alone.
    ///
    /// # Errors
    ///
    /// Returns `UnknownShape` if either shape is malformed
    pub fn intersects(&self, other: &Shape) -> Result<bool> {
        self.validate()?;
        other.validate()?;

        let hit = match (self, other) {
            (Shape::Rectangle(a), Shape::Rectangle(b)) => a.overlaps(b),
            (Shape::Rectangle(rect), Shape::Circle(circle))
            | (Shape::Circle(circle), Shape::Rectangle(rect)) => rect.intersects_circle(circle),
            (Shape::Circle(a), Shape::Circle(b)) => {
                a.center.distance(b.center) <= a.radius + b.radius
            }
        };
        Ok(hit)
    }
}

impl From<Rectangle> for Shape {
    fn from(rect: Rectangle) -> Self {
        Shape::Rectangle(rect)
    }
}

impl From<Circle> for Shape {
    fn from(circle: Circle) -> Self {
        Shape::Circle(circle)
    }
}
