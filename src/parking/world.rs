//! Parking lot: vehicle, obstacles and the planning entry point

use log::{debug, info};

use crate::common::{AreaBounds, CollisionOracle, MapBounds, PlannerError, PlannerResult, Pose2D};
use crate::parking::obstacle::{Obstacle, ParkingSpot};
use crate::parking::vehicle::Vehicle;
use crate::path_planning::ram_tree::{CarConfiguration, RamTree, RamTreeConfig, TargetSet};
use crate::path_planning::trajectory::{
    Segment, Trajectory, TruncationCause, TruncationOutcome, TruncationPolicy,
};

/// Validation increment for the pre-computed maneuvers [m]
const MANEUVER_STEP: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct ParkingWorld {
    vehicle: Vehicle,
    obstacles: Vec<Obstacle>,
    bounds: Option<AreaBounds>,
    active_spot: Option<usize>,
}

/// Result of a planning run
#[derive(Debug, Clone)]
pub struct ParkingPlan {
    /// Path into the spot, `None` when the budget ran out
    pub trajectory: Option<Trajectory>,
    pub targets: TargetSet,
    /// Every edge segment grown by the tree
    pub edges: Vec<Segment>,
    pub vertex_count: usize,
}

impl ParkingWorld {
    pub fn new(vehicle: Vehicle) -> PlannerResult<Self> {
        vehicle.validate()?;
        Ok(ParkingWorld { vehicle, obstacles: Vec::new(), bounds: None, active_spot: None })
    }

    /// Sample inside `bounds` instead of the obstacles' bounding box.
    pub fn with_bounds(mut self, bounds: AreaBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> usize {
        self.obstacles.push(obstacle);
        self.obstacles.len() - 1
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn set_vehicle_pose(&mut self, pose: Pose2D) {
        self.vehicle.pose = pose;
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Parking spots with their obstacle indices
    pub fn spots(&self) -> impl Iterator<Item = (usize, &ParkingSpot)> {
        self.obstacles.iter().enumerate().filter_map(|(i, o)| o.as_parking_spot().map(|s| (i, s)))
    }

    pub fn spot(&self, index: usize) -> PlannerResult<&ParkingSpot> {
        self.obstacles
            .get(index)
            .and_then(Obstacle::as_parking_spot)
            .ok_or_else(|| PlannerError::InvalidParameter(format!("obstacle {} is not a parking spot", index)))
    }

    pub fn active_spot(&self) -> Option<usize> {
        self.active_spot
    }

    /// Make `index` the target spot. The active spot does not block the vehicle.
    pub fn activate_spot(&mut self, index: usize) -> PlannerResult<()> {
        self.spot(index)?;
        self.active_spot = Some(index);
        Ok(())
    }

    pub fn deactivate_spot(&mut self) {
        self.active_spot = None;
    }

    /// Footprint test that skips the obstacle at `ignored`
    pub fn collides_ignoring(&self, pose: &Pose2D, safety_margin: f64, ignored: Option<usize>) -> bool {
        let zone = self.vehicle.collision_zone(pose, safety_margin);
        let center = self.vehicle.footprint_center(pose);
        let range = self.vehicle.broad_phase_range(safety_margin);
        self.obstacles.iter().enumerate().any(|(i, obstacle)| {
            if Some(i) == ignored {
                return false;
            }
            let shape = obstacle.shape();
            (center - shape.centroid()).norm() < range + shape.range() && obstacle.collides_with(&zone)
        })
    }

    /// Rear axle pose of the vehicle parked in spot `index`
    pub fn final_pose(&self, index: usize) -> PlannerResult<Pose2D> {
        let spot = self.spot(index)?;
        Ok(spot.final_pose(self.vehicle.length, self.vehicle.rear_overhang))
    }

    /// Docking configuration of spot `index` plus the configurations reachable
    /// from it by turning out forward on either side. Every maneuver is
    /// validated against the world with the spot itself ignored.
    pub fn target_set(&self, index: usize) -> PlannerResult<TargetSet> {
        let spot = self.spot(index)?;
        let radius = self.vehicle.rear_axle_turn_radius()?;
        let oracle = |pose: &Pose2D, margin: f64| self.collides_ignoring(pose, margin, Some(index));
        let margin = self.vehicle.safety_margin;

        let mut targets = TargetSet::new();
        let dock = targets.push(CarConfiguration::root(spot.docking_pose()));

        for right in [false, true] {
            let sign = if right { -1.0 } else { 1.0 };
            let start = spot.docking_pose();
            let (first, outcome) = self.maneuver(&oracle, start, sign * std::f64::consts::FRAC_PI_2, radius, right)?;
            let swept = first.as_ref().map_or(0.0, |t| t.length() / radius);
            let mut parent = dock;
            if let Some(first) = first {
                parent = push_maneuver(&mut targets, dock, first, margin)?;
            }
            // blocked before a quarter turn: back out with the opposite lock
            if outcome == TruncationOutcome::Truncated(TruncationCause::Collision) {
                let from = targets.get(parent).map_or(start, |c| c.pose);
                let rest = sign * (std::f64::consts::FRAC_PI_2 - swept);
                if let (Some(second), _) = self.maneuver(&oracle, from, rest, radius, !right)? {
                    push_maneuver(&mut targets, parent, second, margin)?;
                }
            }
        }
        debug!("spot {}: {} target configurations", index, targets.len());
        Ok(targets)
    }

    /// Drive a single arc from `start`, cut at the first collision.
    fn maneuver<O>(
        &self,
        oracle: &O,
        start: Pose2D,
        angle: f64,
        radius: f64,
        right: bool,
    ) -> PlannerResult<(Option<Trajectory>, TruncationOutcome)>
    where
        O: CollisionOracle + ?Sized,
    {
        let mut t = Trajectory::new(start, MANEUVER_STEP)?;
        t.append_curve(angle, radius, right);
        let outcome = t.truncate(oracle, None, self.vehicle.safety_margin, TruncationPolicy::Chunk);
        if outcome.is_accepted() {
            Ok((Some(t), outcome))
        } else {
            Ok((None, outcome))
        }
    }

    /// Grow a tree from the vehicle pose towards spot `index` and, on success,
    /// finish with the straight reverse into the spot. The tree always turns
    /// with the vehicle's rear axle radius.
    pub fn plan(&self, index: usize, config: RamTreeConfig, budget: usize) -> PlannerResult<ParkingPlan> {
        let targets = self.target_set(index)?;
        let final_pose = self.final_pose(index)?;
        let config = RamTreeConfig { min_turn_radius: self.vehicle.rear_axle_turn_radius()?, ..config };
        let oracle = |pose: &Pose2D, margin: f64| self.collides_ignoring(pose, margin, Some(index));
        let bounds = self.bounds();

        let (trajectory, edges, vertex_count) = {
            let mut tree = RamTree::new(self.vehicle.pose, &targets, config, &oracle)?;
            tree.grow(&oracle, &bounds, budget);
            let trajectory = match tree.compose_trajectory() {
                Ok(mut t) => {
                    final_approach(&mut t, &final_pose);
                    info!("parking path into spot {}: {:.2} m", index, t.length());
                    Some(t)
                }
                Err(PlannerError::TargetNotReached) => {
                    info!("spot {} not reached after {} samples", index, budget);
                    None
                }
                Err(e) => return Err(e),
            };
            (trajectory, tree.edges().cloned().collect(), tree.len())
        };
        Ok(ParkingPlan { trajectory, targets, edges, vertex_count })
    }
}

/// Record `maneuver` as a configuration at its end pose whose backing drives
/// the same arc back to `parent`. Maneuvers no longer than the safety margin
/// are dropped and `parent` is returned instead.
fn push_maneuver(targets: &mut TargetSet, parent: usize, maneuver: Trajectory, margin: f64) -> PlannerResult<usize> {
    if maneuver.length() <= margin {
        return Ok(parent);
    }
    let Some(Segment::Curve(arc)) = maneuver.segments().first() else {
        return Ok(parent);
    };
    let end = maneuver.end_pose();
    let mut backing = Trajectory::new(end, maneuver.step_length())?;
    backing.append_curve(-arc.angle, arc.radius, arc.right);
    Ok(targets.push(CarConfiguration::chained(end, parent, backing)))
}

/// Append the straight reverse from the trajectory's end into `final_pose`.
pub fn final_approach(trajectory: &mut Trajectory, final_pose: &Pose2D) {
    let distance = (final_pose.position - trajectory.end_pose().position).norm();
    trajectory.append_linear(distance, false);
}

impl CollisionOracle for ParkingWorld {
    fn collides(&self, pose: &Pose2D, safety_margin: f64) -> bool {
        self.collides_ignoring(pose, safety_margin, self.active_spot)
    }
}

impl MapBounds for ParkingWorld {
    /// Explicit bounds, else the bounding box of all obstacle points, else the
    /// vehicle position.
    fn bounds(&self) -> AreaBounds {
        if let Some(bounds) = self.bounds {
            return bounds;
        }
        let points = self.obstacles.iter().flat_map(|o| o.shape().points().iter());
        AreaBounds::enclosing(points).unwrap_or_else(|| {
            let p = self.vehicle.pose.position;
            AreaBounds::new(p.x, p.x, p.y, p.y)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Point2D;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn spot_at(x: f64) -> Obstacle {
        Obstacle::parking_spot([
            Point2D::new(x, 5.7),
            Point2D::new(x, 0.2),
            Point2D::new(x + 2.6, 0.2),
            Point2D::new(x + 2.6, 5.7),
        ])
        .unwrap()
    }

    fn open_lot() -> (ParkingWorld, usize) {
        let mut world = ParkingWorld::new(Vehicle::default()).unwrap();
        let spot = world.add_obstacle(spot_at(10.0));
        (world, spot)
    }

    fn assert_pose_eq(a: &Pose2D, b: &Pose2D) {
        assert_abs_diff_eq!(a.x(), b.x(), epsilon = 1e-6);
        assert_abs_diff_eq!(a.y(), b.y(), epsilon = 1e-6);
        assert_abs_diff_eq!(a.heading.x, b.heading.x, epsilon = 1e-6);
        assert_abs_diff_eq!(a.heading.y, b.heading.y, epsilon = 1e-6);
    }

    #[test]
    fn test_collision_oracle() {
        let (mut world, spot) = open_lot();
        world.add_obstacle(Obstacle::pillar_rect(20.0, 0.0, 22.0, 2.0).unwrap());
        world.add_obstacle(Obstacle::wall(Point2D::new(0.0, 20.0), Point2D::new(30.0, 20.0)).unwrap());

        assert!(!world.collides(&Pose2D::new(5.0, 10.0, 0.0), 0.1));
        // nose reaches into the pillar
        assert!(world.collides(&Pose2D::new(17.0, 1.0, 0.0), 0.1));
        assert!(!world.collides(&Pose2D::new(14.0, 1.0, 0.0), 0.1));
        // margin closes the gap
        assert!(world.collides(&Pose2D::new(15.9, 1.0, 0.0), 0.5));
        // wall crossing the footprint
        assert!(world.collides(&Pose2D::new(5.0, 20.0, 0.0), 0.1));
        assert!(world.collides(&Pose2D::new(5.0, 19.0, PI / 2.0), 0.1));

        let parked = world.final_pose(spot).unwrap();
        assert!(world.collides(&parked, 0.1));
        world.activate_spot(spot).unwrap();
        assert!(!world.collides(&parked, 0.1));
        world.deactivate_spot();
        assert!(world.collides(&parked, 0.1));
    }

    #[test]
    fn test_activate_requires_spot() {
        let (mut world, _) = open_lot();
        let pillar = world.add_obstacle(Obstacle::pillar_rect(0.0, 0.0, 1.0, 1.0).unwrap());
        assert!(matches!(world.activate_spot(pillar), Err(PlannerError::InvalidParameter(_))));
        assert!(world.activate_spot(42).is_err());
        assert_eq!(world.spots().count(), 1);
    }

    #[test]
    fn test_bounds() {
        let (world, _) = open_lot();
        let b = world.bounds();
        assert_abs_diff_eq!(b.x_min, 10.0);
        assert_abs_diff_eq!(b.x_max, 12.6);
        assert_abs_diff_eq!(b.y_min, 0.2);
        assert_abs_diff_eq!(b.y_max, 5.7);
        let explicit = AreaBounds::new(0.0, 30.0, 0.0, 20.0);
        assert_eq!(world.with_bounds(explicit).bounds(), explicit);

        let empty = ParkingWorld::new(Vehicle::default()).unwrap();
        let b = empty.bounds();
        assert_abs_diff_eq!(b.x_min, Vehicle::default().pose.x());
        assert_eq!(b.width(), 0.0);
    }

    #[test]
    fn test_open_lot_targets() {
        let (world, spot) = open_lot();
        let targets = world.target_set(spot).unwrap();
        assert_eq!(targets.len(), 3);
        let dock = targets.get(0).unwrap();
        assert!(dock.parent.is_none());
        assert_pose_eq(&dock.pose, &world.spot(spot).unwrap().docking_pose());

        let r = world.vehicle().rear_axle_turn_radius().unwrap();
        let left = targets.get(1).unwrap();
        assert_pose_eq(&left.pose, &Pose2D::new(11.3 - r, 6.8 + r, PI));
        let right = targets.get(2).unwrap();
        assert_pose_eq(&right.pose, &Pose2D::new(11.3 + r, 6.8 + r, 0.0));
        for config in [left, right] {
            assert_eq!(config.parent, Some(0));
            let backing = config.backing.as_ref().unwrap();
            assert_pose_eq(&backing.start_pose(), &config.pose);
            assert_pose_eq(&backing.end_pose(), &dock.pose);
        }
    }

    #[test]
    fn test_blocked_turn_adds_second_leg() {
        let (mut world, spot) = open_lot();
        world.add_obstacle(Obstacle::wall(Point2D::new(-20.0, 12.0), Point2D::new(40.0, 12.0)).unwrap());
        let targets = world.target_set(spot).unwrap();
        assert_eq!(targets.len(), 5);

        for (i, config) in targets.iter().enumerate().skip(1) {
            let parent = targets.get(config.parent.unwrap()).unwrap();
            let backing = config.backing.as_ref().unwrap();
            assert_pose_eq(&backing.start_pose(), &config.pose);
            assert_pose_eq(&backing.end_pose(), &parent.pose);
            assert!(!world.collides_ignoring(&config.pose, 0.1, Some(spot)), "config {} collides", i);
        }
        // second legs hang off the first ones
        assert_eq!(targets.get(2).unwrap().parent, Some(1));
        assert_eq!(targets.get(4).unwrap().parent, Some(3));
        assert_eq!(targets.backing_chain(2).len(), 2);
    }

    #[test]
    fn test_final_approach() {
        let (world, spot) = open_lot();
        let dock = world.spot(spot).unwrap().docking_pose();
        let mut t = Trajectory::new(Pose2D::new(11.3, 12.0, PI / 2.0), 0.5).unwrap();
        t.append_linear(12.0 - dock.y(), false);
        let fin = world.final_pose(spot).unwrap();
        final_approach(&mut t, &fin);
        assert_pose_eq(&t.end_pose(), &fin);
    }

    #[test]
    fn test_plan_from_nearby_pose() {
        let (mut world, spot) = open_lot();
        world.set_vehicle_pose(Pose2D::new(11.3, 12.0, PI / 2.0));
        let world = world.with_bounds(AreaBounds::new(0.0, 25.0, 0.0, 20.0));
        let config = RamTreeConfig { seed: Some(3), ..Default::default() };
        let plan = world.plan(spot, config, 10).unwrap();
        let t = plan.trajectory.expect("docking pose is within reach of the start");
        assert_pose_eq(&t.end_pose(), &world.final_pose(spot).unwrap());
        assert!(plan.vertex_count >= 2);
        assert!(!plan.edges.is_empty());
    }
}
