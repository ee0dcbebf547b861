//! parking_rrt - Reeds-Shepp RRT parking planner
//!
//! This crate plans collision-free, kinematically feasible paths for a
//! car-like vehicle into a parking spot. A rapidly-exploring random tree is
//! grown with minimal Reeds-Shepp connections that are validated step by step
//! against a collision oracle.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod path_planning;
pub mod parking;

// Re-export common types for convenience
pub use common::{Point2D, Pose2D, AreaBounds};
pub use common::{CollisionOracle, MapBounds};
pub use common::{PlannerError, PlannerResult};
