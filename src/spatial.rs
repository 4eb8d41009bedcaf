pub mod geometric_jacobian;
pub mod spatial_acceleration;
pub mod transform;
pub mod twist;
pub mod wrench;
