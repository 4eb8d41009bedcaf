use na::{DMatrix, DVector, Isometry3};
use rand::Rng;

use crate::{
    joint::JointModel,
    spatial::{
        geometric_jacobian::GeometricJacobian, spatial_acceleration::SpatialAcceleration,
        transform::Transform3D,
    },
    types::{Float, Real},
};

/// Welds the successor to its predecessor. No positions, no velocities.
#[derive(Debug, Clone)]
pub struct FixedJoint {
    pub transform: Transform3D, // fixed transform from successor frame to predecessor frame
}

impl FixedJoint {
    pub fn new(transform: Transform3D) -> Self {
        Self { transform }
    }
}

impl JointModel for FixedJoint {
    fn num_positions(&self) -> usize {
        0
    }

    fn num_velocities(&self) -> usize {
        0
    }

    fn transform_to_parent(&self) -> &Transform3D {
        &self.transform
    }

    fn joint_motion<T: Real>(&self, _q: &[T]) -> Isometry3<T> {
        Isometry3::identity()
    }

    fn motion_subspace<T: Real>(&self, _q: &[T]) -> GeometricJacobian<T> {
        GeometricJacobian::zeros(&self.transform.from, &self.transform.to, &self.transform.from, 0)
    }

    fn motion_subspace_dot_times_v<T: Real>(&self, _q: &[T], _v: &[T]) -> SpatialAcceleration<T> {
        SpatialAcceleration::zero(&self.transform.from, &self.transform.to, &self.transform.from)
    }

    fn qdot_to_v<T: Real>(&self, _q: &[T]) -> DMatrix<T> {
        DMatrix::zeros(0, 0)
    }

    fn v_to_qdot<T: Real>(&self, _q: &[T]) -> DMatrix<T> {
        DMatrix::zeros(0, 0)
    }

    fn zero_configuration(&self) -> DVector<Float> {
        DVector::zeros(0)
    }

    fn random_configuration<R: Rng>(&self, _rng: &mut R) -> DVector<Float> {
        DVector::zeros(0)
    }
}
