use na::{DMatrix, DVector, Isometry3, Matrix3xX, Translation3, UnitQuaternion, UnitVector3};
use rand::Rng;

use crate::{
    joint::{JointFriction, JointModel},
    spatial::{
        geometric_jacobian::GeometricJacobian, spatial_acceleration::SpatialAcceleration,
        transform::Transform3D,
    },
    types::{Float, Real},
    util::cast_vector3,
};

/// Represents a prismatic joint connecting a predecessor and a successor body.
///
/// Note: joint frame is defined as the successor body frame
#[derive(Debug, Clone)]
pub struct PrismaticJoint {
    pub transform: Transform3D,
    pub axis: UnitVector3<Float>, // axis expressed in successor body frame
    pub joint_limit_min: Float,
    pub joint_limit_max: Float,
    pub friction: JointFriction,
}

impl PrismaticJoint {
    pub fn new(transform: Transform3D, axis: UnitVector3<Float>) -> Self {
        Self {
            transform,
            axis,
            joint_limit_min: Float::NEG_INFINITY,
            joint_limit_max: Float::INFINITY,
            friction: JointFriction::default(),
        }
    }

    pub fn with_limits(mut self, min: Float, max: Float) -> Self {
        self.joint_limit_min = min;
        self.joint_limit_max = max;
        self
    }

    pub fn with_friction(mut self, friction: JointFriction) -> Self {
        self.friction = friction;
        self
    }
}

impl JointModel for PrismaticJoint {
    fn num_positions(&self) -> usize {
        1
    }

    fn num_velocities(&self) -> usize {
        1
    }

    fn transform_to_parent(&self) -> &Transform3D {
        &self.transform
    }

    /// Moved along axis by q
    fn joint_motion<T: Real>(&self, q: &[T]) -> Isometry3<T> {
        let axis = cast_vector3::<T>(&self.axis.into_inner());
        Isometry3::from_parts(Translation3::from(axis * q[0]), UnitQuaternion::identity())
    }

    fn motion_subspace<T: Real>(&self, _q: &[T]) -> GeometricJacobian<T> {
        let axis = cast_vector3::<T>(&self.axis.into_inner());
        GeometricJacobian::new(
            &self.transform.from,
            &self.transform.to,
            &self.transform.from,
            Matrix3xX::zeros(1),
            Matrix3xX::from_column_slice(axis.as_slice()),
        )
    }

    fn motion_subspace_dot_times_v<T: Real>(&self, _q: &[T], _v: &[T]) -> SpatialAcceleration<T> {
        SpatialAcceleration::zero(&self.transform.from, &self.transform.to, &self.transform.from)
    }

    fn qdot_to_v<T: Real>(&self, _q: &[T]) -> DMatrix<T> {
        DMatrix::identity(1, 1)
    }

    fn v_to_qdot<T: Real>(&self, _q: &[T]) -> DMatrix<T> {
        DMatrix::identity(1, 1)
    }

    fn zero_configuration(&self) -> DVector<Float> {
        DVector::zeros(1)
    }

    fn position_limits(&self) -> (DVector<Float>, DVector<Float>) {
        (
            DVector::from_element(1, self.joint_limit_min),
            DVector::from_element(1, self.joint_limit_max),
        )
    }

    fn friction_torque<T: Real>(&self, v: &[T]) -> DVector<T> {
        DVector::from_element(1, self.friction.torque(v[0]))
    }

    fn random_configuration<R: Rng>(&self, rng: &mut R) -> DVector<Float> {
        let (min, max) = if self.joint_limit_min.is_finite() && self.joint_limit_max.is_finite() {
            (self.joint_limit_min, self.joint_limit_max)
        } else {
            (-1.0, 1.0)
        };
        DVector::from_element(1, rng.random_range(min..=max))
    }
}
