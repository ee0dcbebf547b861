//! Static obstacles of a parking lot

use crate::common::{PlannerError, PlannerResult, Point2D, Pose2D};
use crate::utils::collision::{polygon_polygon_collision, segment_polygon_collision};

/// Distance of the docking pose in front of a spot's open side [m]
pub const DOCKING_OFFSET: f64 = 1.1;

/// Outline of an obstacle with its broad-phase circle
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    points: Vec<Point2D>,
    centroid: Point2D,
    range: f64,
}

impl Shape {
    fn new(points: Vec<Point2D>, expected: usize) -> PlannerResult<Self> {
        if points.len() != expected {
            return Err(PlannerError::InvalidGeometry(format!(
                "expected {} points, got {}",
                expected,
                points.len()
            )));
        }
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(PlannerError::InvalidGeometry("non-finite obstacle point".to_string()));
        }
        let centroid = points.iter().sum::<Point2D>() / points.len() as f64;
        let range = points.iter().map(|p| (p - centroid).norm()).fold(0.0, f64::max);
        Ok(Shape { points, centroid, range })
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub fn centroid(&self) -> Point2D {
        self.centroid
    }

    /// Largest distance from the centroid to a vertex
    pub fn range(&self) -> f64 {
        self.range
    }
}

/// Rectangular parking space. Points 0 and 3 are the open front corners,
/// points 1 and 2 the rear ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingSpot {
    shape: Shape,
}

impl ParkingSpot {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn front_center(&self) -> Point2D {
        (self.shape.points[0] + self.shape.points[3]) / 2.0
    }

    pub fn rear_center(&self) -> Point2D {
        (self.shape.points[1] + self.shape.points[2]) / 2.0
    }

    /// Unit vector from the rear of the spot to its open front
    pub fn axis(&self) -> Point2D {
        (self.front_center() - self.rear_center()).normalize()
    }

    /// Rear axle pose of a vehicle parked nose out, centered along the spot.
    pub fn final_pose(&self, vehicle_length: f64, rear_overhang: f64) -> Pose2D {
        let axis = self.front_center() - self.rear_center();
        let space = axis.norm() - vehicle_length;
        let ori = axis.normalize();
        Pose2D::from_vectors(self.rear_center() + ori * (space / 2.0 + rear_overhang), ori)
    }

    /// Pose just in front of the spot from which the vehicle backs in.
    pub fn docking_pose(&self) -> Pose2D {
        let ori = self.axis();
        Pose2D::from_vectors(self.front_center() + ori * DOCKING_OFFSET, ori)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Obstacle {
    Pillar(Shape),
    Wall(Shape),
    ParkingSpot(ParkingSpot),
}

impl Obstacle {
    pub fn pillar(points: [Point2D; 4]) -> PlannerResult<Self> {
        Ok(Obstacle::Pillar(Shape::new(points.to_vec(), 4)?))
    }

    pub fn wall(a: Point2D, b: Point2D) -> PlannerResult<Self> {
        if a == b {
            return Err(PlannerError::InvalidGeometry("wall endpoints coincide".to_string()));
        }
        Ok(Obstacle::Wall(Shape::new(vec![a, b], 2)?))
    }

    pub fn parking_spot(points: [Point2D; 4]) -> PlannerResult<Self> {
        let shape = Shape::new(points.to_vec(), 4)?;
        let spot = ParkingSpot { shape };
        if !((spot.front_center() - spot.rear_center()).norm() > 0.0) {
            return Err(PlannerError::InvalidGeometry("parking spot has no depth".to_string()));
        }
        Ok(Obstacle::ParkingSpot(spot))
    }

    /// Axis-aligned rectangle helper for pillars
    pub fn pillar_rect(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> PlannerResult<Self> {
        Obstacle::pillar([
            Point2D::new(x_min, y_min),
            Point2D::new(x_max, y_min),
            Point2D::new(x_max, y_max),
            Point2D::new(x_min, y_max),
        ])
    }

    pub fn shape(&self) -> &Shape {
        match self {
            Obstacle::Pillar(shape) | Obstacle::Wall(shape) => shape,
            Obstacle::ParkingSpot(spot) => &spot.shape,
        }
    }

    pub fn as_parking_spot(&self) -> Option<&ParkingSpot> {
        match self {
            Obstacle::ParkingSpot(spot) => Some(spot),
            _ => None,
        }
    }

    /// Narrow-phase test against a footprint polygon
    pub fn collides_with(&self, zone: &[Point2D]) -> bool {
        match self {
            Obstacle::Wall(shape) => segment_polygon_collision(&shape.points[0], &shape.points[1], zone),
            Obstacle::Pillar(shape) => polygon_polygon_collision(&shape.points, zone),
            Obstacle::ParkingSpot(spot) => polygon_polygon_collision(&spot.shape.points, zone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn spot() -> ParkingSpot {
        let obstacle = Obstacle::parking_spot([
            Point2D::new(10.0, 5.7),
            Point2D::new(10.0, 0.2),
            Point2D::new(12.6, 0.2),
            Point2D::new(12.6, 5.7),
        ])
        .unwrap();
        obstacle.as_parking_spot().cloned().unwrap()
    }

    #[test]
    fn test_shape_broad_phase() {
        let pillar = Obstacle::pillar_rect(0.0, 0.0, 2.0, 2.0).unwrap();
        assert_abs_diff_eq!(pillar.shape().centroid().x, 1.0);
        assert_abs_diff_eq!(pillar.shape().range(), 2.0_f64.sqrt(), epsilon = 1e-12);
        assert!(pillar.as_parking_spot().is_none());
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(matches!(
            Obstacle::wall(Point2D::new(1.0, 1.0), Point2D::new(1.0, 1.0)),
            Err(PlannerError::InvalidGeometry(_))
        ));
        assert!(Obstacle::pillar_rect(0.0, 0.0, f64::NAN, 1.0).is_err());
        let flat = [Point2D::new(0.0, 0.0); 4];
        assert!(Obstacle::parking_spot(flat).is_err());
    }

    #[test]
    fn test_spot_poses() {
        let s = spot();
        assert_abs_diff_eq!(s.axis().y, 1.0, epsilon = 1e-12);
        let fin = s.final_pose(4.87, 1.07);
        assert_abs_diff_eq!(fin.x(), 11.3, epsilon = 1e-9);
        assert_abs_diff_eq!(fin.y(), 0.2 + (5.5 - 4.87) / 2.0 + 1.07, epsilon = 1e-9);
        let dock = s.docking_pose();
        assert_abs_diff_eq!(dock.y(), 5.7 + DOCKING_OFFSET, epsilon = 1e-9);
        assert_abs_diff_eq!(dock.heading.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_wall_and_pillar_narrow_phase() {
        let zone = [
            Point2D::new(0.0, 0.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(4.0, 2.0),
            Point2D::new(0.0, 2.0),
        ];
        let crossing = Obstacle::wall(Point2D::new(2.0, -1.0), Point2D::new(2.0, 5.0)).unwrap();
        let beside = Obstacle::wall(Point2D::new(5.0, -1.0), Point2D::new(5.0, 5.0)).unwrap();
        assert!(crossing.collides_with(&zone));
        assert!(!beside.collides_with(&zone));
        assert!(Obstacle::pillar_rect(3.5, 1.5, 6.0, 6.0).unwrap().collides_with(&zone));
        assert!(!Obstacle::pillar_rect(4.5, 0.0, 6.0, 6.0).unwrap().collides_with(&zone));
    }
}
