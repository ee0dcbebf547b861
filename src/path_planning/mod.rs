// Path Planning algorithms module

pub mod trajectory;
pub mod reeds_shepp_path;
pub mod ram_tree;

pub use trajectory::*;
pub use reeds_shepp_path::{connect, shortest_path, Candidate, Gear, PathElem, ReedsSheppSolution, Steering};
pub use ram_tree::*;
