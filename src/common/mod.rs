//! Common types, traits, and error definitions for parking_rrt
//!
//! This module provides the foundational building blocks shared by the
//! trajectory engine, the Reeds-Shepp family, the tree and the parking world.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
