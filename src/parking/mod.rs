//! Parking lot model: vehicle, obstacles and target generation

pub mod vehicle;
pub mod obstacle;
pub mod world;

pub use vehicle::Vehicle;
pub use obstacle::{Obstacle, ParkingSpot, Shape, DOCKING_OFFSET};
pub use world::{final_approach, ParkingPlan, ParkingWorld};
