//! Common traits defining the planner's collaborator interfaces

use crate::common::types::*;

/// Collision oracle consulted while edges are validated.
///
/// Implementations place the vehicle footprint at `pose`, inflate it by
/// `safety_margin`, and test it against every registered obstacle. Calls are
/// synchronous and must not mutate observable state.
pub trait CollisionOracle {
    fn collides(&self, pose: &Pose2D, safety_margin: f64) -> bool;
}

/// Provider of the sampling area
pub trait MapBounds {
    fn bounds(&self) -> AreaBounds;
}

/// Oracle for an empty world
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeSpace;

impl CollisionOracle for FreeSpace {
    fn collides(&self, _pose: &Pose2D, _safety_margin: f64) -> bool {
        false
    }
}

impl<F> CollisionOracle for F
where
    F: Fn(&Pose2D, f64) -> bool,
{
    fn collides(&self, pose: &Pose2D, safety_margin: f64) -> bool {
        self(pose, safety_margin)
    }
}

impl MapBounds for AreaBounds {
    fn bounds(&self) -> AreaBounds {
        *self
    }
}
