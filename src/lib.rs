//! # rf-assembly
//!
//! Planning and validation for rod structures built in alternating human/robot
//! steps, plus reachability scoring of candidate robot base poses.
//!
//! Rods are nodes of an [`Assembly`]. Each rod has two connectors; closing a
//! module on an open connector adds a robot-held rod and a human-placed rod
//! whose poses follow from a flip code, a rotation and a shift. Proposed rods
//! can be checked for clearance and for a quasi-static moment balance before
//! they are built.
//!
//! Independently, a [`ReachabilityMap`] sampled in the robot base frame is
//! placed at candidate base poses and indexed with a k-d tree to score how
//! well the robot reaches a set of goal points.

pub mod assembly;
pub mod base_map;
pub mod connector;
pub mod cursor;
pub mod element;
pub mod error;
pub mod export;
pub mod feed;
pub mod geometry;
pub mod interpreter;
pub mod placement;
pub mod reachability;
pub mod validate;

pub use assembly::*;
pub use base_map::*;
pub use connector::*;
pub use cursor::*;
pub use element::*;
pub use error::{Error, Result};
pub use export::*;
pub use feed::*;
pub use geometry::*;
pub use interpreter::*;
pub use placement::*;
pub use reachability::*;
pub use validate::*;
