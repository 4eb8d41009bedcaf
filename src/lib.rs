#![allow(non_snake_case)]

use types::Float;
pub extern crate nalgebra as na;

pub mod collision;
pub mod constraints;
pub mod contact;
pub mod dynamics;
pub mod energy;
pub mod error;
pub mod inertia;
pub mod joint;
pub mod kinematic_path;
pub mod kinematics;
pub mod kinematics_cache;
pub mod momentum;
pub mod rigid_body;
pub mod spatial;
pub mod tree;
pub mod types;
pub mod util;

pub mod helpers;

pub const GRAVITY: Float = 9.81;

/// Name of the root body and of the inertial frame
pub const WORLD_FRAME: &str = "world";

pub const PI: Float = std::f64::consts::PI;
