// Reeds-Shepp RRT parking demo
//
// Builds a small lot in code, plans into one of its spots and plots the tree
// together with the composed path.

use std::f64::consts::PI;

use log::{error, info};

use parking_rrt::parking::{Obstacle, ParkingPlan, ParkingWorld, Vehicle};
use parking_rrt::path_planning::RamTreeConfig;
use parking_rrt::utils::{colors, PathStyle, PointStyle, Visualizer};
use parking_rrt::{PlannerResult, Point2D, Pose2D};

const SPOT_WIDTH: f64 = 2.6;
const SPOT_DEPTH: f64 = 5.5;
const BUDGET: usize = 3000;

/// Spot along the bottom wall, open towards +y
fn spot_at(x: f64) -> PlannerResult<Obstacle> {
    Obstacle::parking_spot([
        Point2D::new(x, 0.2 + SPOT_DEPTH),
        Point2D::new(x, 0.2),
        Point2D::new(x + SPOT_WIDTH, 0.2),
        Point2D::new(x + SPOT_WIDTH, 0.2 + SPOT_DEPTH),
    ])
}

/// Returns the world and the index of the spot to park in.
fn build_lot() -> PlannerResult<(ParkingWorld, usize)> {
    let vehicle = Vehicle { pose: Pose2D::new(22.0, 14.0, PI), ..Default::default() };
    let mut world = ParkingWorld::new(vehicle)?;

    let corners = [
        Point2D::new(0.0, 0.0),
        Point2D::new(30.0, 0.0),
        Point2D::new(30.0, 20.0),
        Point2D::new(0.0, 20.0),
    ];
    for i in 0..corners.len() {
        world.add_obstacle(Obstacle::wall(corners[i], corners[(i + 1) % corners.len()])?);
    }

    world.add_obstacle(spot_at(4.8)?);
    let target = world.add_obstacle(spot_at(10.0)?);
    world.add_obstacle(spot_at(15.2)?);

    world.add_obstacle(Obstacle::pillar_rect(7.6, 0.2, 8.2, 1.0)?);
    world.add_obstacle(Obstacle::pillar_rect(18.0, 0.2, 18.6, 1.0)?);
    world.add_obstacle(Obstacle::pillar_rect(14.0, 16.0, 16.0, 18.0)?);

    Ok((world, target))
}

fn draw(world: &ParkingWorld, plan: &ParkingPlan, path: &str) -> Result<(), String> {
    let mut vis = Visualizer::new();
    vis.set_title("Reeds-Shepp RRT parking").set_x_range(-1.0, 31.0).set_y_range(-1.0, 21.0);

    let tree_style = PathStyle::new(colors::TREE, "Tree").with_line_width(0.5);
    vis.plot_segments(plan.edges.iter(), &tree_style);

    let wall_style = PathStyle::new(colors::OBSTACLE, "");
    let spot_style = PathStyle::new(colors::SPOT, "").with_line_width(1.0);
    for obstacle in world.obstacles() {
        match obstacle {
            Obstacle::Wall(shape) => vis.plot_polyline(shape.points(), false, &wall_style),
            Obstacle::Pillar(shape) => vis.plot_polyline(shape.points(), true, &wall_style),
            Obstacle::ParkingSpot(spot) => vis.plot_polyline(spot.shape().points(), true, &spot_style),
        };
    }

    let target_style = PathStyle::new(colors::TARGET, "Maneuvers").with_line_width(1.5);
    vis.plot_segments(plan.targets.iter().filter_map(|c| c.backing.as_ref()).flat_map(|t| t.segments()), &target_style);

    let vehicle = world.vehicle();
    let footprint = PathStyle::new(colors::VEHICLE, "").with_line_width(1.0);
    vis.plot_polyline(&vehicle.corners(&vehicle.pose), true, &footprint);
    vis.plot_pose(&vehicle.pose, 1.0, &PointStyle::new(colors::VEHICLE, "Start"));

    if let Some(trajectory) = &plan.trajectory {
        vis.plot_trajectory(trajectory, &PathStyle::default());
        let end = trajectory.end_pose();
        vis.plot_polyline(&vehicle.corners(&end), true, &footprint);
    }

    vis.save_png(path, 1200, 800)
}

fn main() {
    env_logger::init();

    let (world, target) = match build_lot() {
        Ok(lot) => lot,
        Err(e) => {
            error!("invalid parking lot: {}", e);
            return;
        }
    };

    let config = RamTreeConfig { seed: Some(7), ..Default::default() };
    let plan = match world.plan(target, config, BUDGET) {
        Ok(plan) => plan,
        Err(e) => {
            error!("planning failed: {}", e);
            return;
        }
    };

    match &plan.trajectory {
        Some(t) => info!(
            "path found: {:.2} m in {} segments, tree of {} vertices",
            t.length(),
            t.segments().len(),
            plan.vertex_count
        ),
        None => info!("no path within {} samples ({} vertices)", BUDGET, plan.vertex_count),
    }

    if let Err(e) = std::fs::create_dir_all("img") {
        error!("cannot create img directory: {}", e);
        return;
    }
    if let Err(e) = draw(&world, &plan, "./img/parking_rrt.png") {
        error!("plotting failed: {}", e);
    }
}
