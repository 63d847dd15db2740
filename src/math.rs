//! Mathematical structs and functions.

pub use kinematics::*;

mod kinematics;
