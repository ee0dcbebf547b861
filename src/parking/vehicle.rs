//! Car-like vehicle model
//!
//! Rectangular footprint anchored at the rear axle center. The pose of the
//! vehicle is the pose of its rear axle center.

use crate::common::{PlannerError, PlannerResult, Point2D, Pose2D};
use crate::utils::geometry::perpendicular;

/// Vehicle dimensions [m]
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub pose: Pose2D,
    pub length: f64,
    pub width: f64,
    pub wheelbase: f64,
    /// Distance from the tail to the rear axle
    pub rear_overhang: f64,
    /// Turning radius of the outer front corner at full lock
    pub turn_radius: f64,
    pub safety_margin: f64,
}

impl Default for Vehicle {
    fn default() -> Self {
        Self {
            pose: Pose2D::from_vectors(Point2D::new(10.78, 19.06), Point2D::new(-0.1961, -0.9805)),
            length: 4.87,
            width: 2.12,
            wheelbase: 2.85,
            rear_overhang: 1.07,
            turn_radius: 5.5,
            safety_margin: 0.1,
        }
    }
}

impl Vehicle {
    pub fn new(
        pose: Pose2D,
        length: f64,
        width: f64,
        wheelbase: f64,
        rear_overhang: f64,
        turn_radius: f64,
    ) -> PlannerResult<Self> {
        let vehicle = Vehicle {
            pose,
            length,
            width,
            wheelbase,
            rear_overhang,
            turn_radius,
            ..Default::default()
        };
        vehicle.validate()?;
        Ok(vehicle)
    }

    pub fn validate(&self) -> PlannerResult<()> {
        let dims = [
            ("length", self.length),
            ("width", self.width),
            ("wheelbase", self.wheelbase),
            ("turn_radius", self.turn_radius),
        ];
        for (name, value) in dims {
            if !(value.is_finite() && value > 0.0) {
                return Err(PlannerError::InvalidParameter(format!("vehicle {} must be positive, got {}", name, value)));
            }
        }
        if !(self.rear_overhang >= 0.0 && self.rear_overhang < self.length) {
            return Err(PlannerError::InvalidParameter(format!(
                "rear overhang {} must lie within the vehicle length {}",
                self.rear_overhang, self.length
            )));
        }
        if !(self.safety_margin.is_finite() && self.safety_margin >= 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "safety margin must be non-negative, got {}",
                self.safety_margin
            )));
        }
        self.rear_axle_turn_radius().map(|_| ())
    }

    /// Minimum turning radius of the rear axle center
    pub fn rear_axle_turn_radius(&self) -> PlannerResult<f64> {
        let front = (self.length - self.rear_overhang) / self.turn_radius;
        let radius = self.turn_radius * front.asin().cos() - self.width / 2.0;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(PlannerError::InvalidParameter(format!(
                "turn radius {} is too small for a {} x {} m vehicle",
                self.turn_radius, self.length, self.width
            )));
        }
        Ok(radius)
    }

    /// Footprint corners at `pose`: tail left, tail right, nose right, nose left.
    pub fn corners(&self, pose: &Pose2D) -> [Point2D; 4] {
        self.collision_zone(pose, 0.0)
    }

    /// Footprint grown by `margin` on every side
    pub fn collision_zone(&self, pose: &Pose2D, margin: f64) -> [Point2D; 4] {
        let ori = pose.heading;
        let side = perpendicular(&ori) * (self.width / 2.0 + margin);
        let tail = pose.position - ori * (self.rear_overhang + margin);
        let nose = pose.position + ori * (self.length - self.rear_overhang + margin);
        [tail + side, tail - side, nose - side, nose + side]
    }

    /// Middle of the footprint
    pub fn footprint_center(&self, pose: &Pose2D) -> Point2D {
        pose.position + pose.heading * (self.length / 2.0 - self.rear_overhang)
    }

    /// Broad-phase radius around the footprint center
    pub fn broad_phase_range(&self, margin: f64) -> f64 {
        (self.length + 2.0 * margin).hypot(self.width + 2.0 * margin)
    }
}
