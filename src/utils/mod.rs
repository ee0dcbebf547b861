//! Utility modules for parking_rrt

pub mod geometry;
pub mod collision;
pub mod visualization;

pub use visualization::{Visualizer, PathStyle, PointStyle, colors};
