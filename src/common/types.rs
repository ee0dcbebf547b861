//! Common types used throughout parking_rrt

use nalgebra::Vector2;

/// 2D point / free vector. Positions and headings share this representation.
pub type Point2D = Vector2<f64>;

/// 2D pose (position + unit heading vector)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2D {
    pub position: Point2D,
    pub heading: Point2D,
}

impl Pose2D {
    /// Build a pose from coordinates and a heading angle in radians.
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self {
            position: Point2D::new(x, y),
            heading: Point2D::new(yaw.cos(), yaw.sin()),
        }
    }

    /// Build a pose from a position and an arbitrary (non-zero) heading vector.
    /// The heading is normalized.
    pub fn from_vectors(position: Point2D, heading: Point2D) -> Self {
        let norm = heading.norm();
        let heading = if norm > 0.0 { heading / norm } else { Point2D::new(1.0, 0.0) };
        Self { position, heading }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    /// Heading angle in (-pi, pi]
    pub fn yaw(&self) -> f64 {
        self.heading.y.atan2(self.heading.x)
    }

    pub fn distance(&self, other: &Pose2D) -> f64 {
        (self.position - other.position).norm()
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::origin()
    }
}

/// Area bounds for the sampling space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl AreaBounds {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        AreaBounds { x_min, x_max, y_min, y_max }
    }

    /// Smallest bounds enclosing all points, `None` for an empty input.
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point2D>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let init = AreaBounds::new(first.x, first.x, first.y, first.y);
        Some(iter.fold(init, |b, p| AreaBounds {
            x_min: b.x_min.min(p.x),
            x_max: b.x_max.max(p.x),
            y_min: b.y_min.min(p.y),
            y_max: b.y_max.max(p.y),
        }))
    }

    pub fn contains(&self, p: &Point2D) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}
