use na::{
    DMatrix, DVector, Isometry3, Matrix3xX, Translation3, UnitQuaternion, UnitVector3, Vector3,
};
use rand::Rng;

use crate::{
    joint::{JointFriction, JointModel},
    spatial::{
        geometric_jacobian::GeometricJacobian, spatial_acceleration::SpatialAcceleration,
        transform::Transform3D,
    },
    types::{Float, Real},
    util::cast_vector3,
    PI,
};

/// Represents a revolute joint connecting a predecessor and a successor body.
///
/// Note: joint frame is defined as the successor body frame
#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    pub transform: Transform3D, // fixed transform from successor frame to predecessor frame
    pub axis: UnitVector3<Float>, // axis of rotation expressed in successor body frame
    pub joint_limit_min: Float,
    pub joint_limit_max: Float,
    pub friction: JointFriction,
}

impl RevoluteJoint {
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

    fn axis_in<T: Real>(&self) -> Vector3<T> {
        cast_vector3(&self.axis.into_inner())
    }
}

impl JointModel for RevoluteJoint {
    fn num_positions(&self) -> usize {
        1
    }

    fn num_velocities(&self) -> usize {
        1
    }

    fn transform_to_parent(&self) -> &Transform3D {
        &self.transform
    }

    fn joint_motion<T: Real>(&self, q: &[T]) -> Isometry3<T> {
        let axis = UnitVector3::new_unchecked(self.axis_in::<T>());
        Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(&axis, q[0]),
        )
    }

    fn motion_subspace<T: Real>(&self, _q: &[T]) -> GeometricJacobian<T> {
        GeometricJacobian::new(
            &self.transform.from,
            &self.transform.to,
            &self.transform.from,
            Matrix3xX::from_column_slice(self.axis_in::<T>().as_slice()),
            Matrix3xX::zeros(1),
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

    /// Uniform within the joint limits when both are finite, else within [-π, π]
    fn random_configuration<R: Rng>(&self, rng: &mut R) -> DVector<Float> {
        let (min, max) = if self.joint_limit_min.is_finite() && self.joint_limit_max.is_finite() {
            (self.joint_limit_min, self.joint_limit_max)
        } else {
            (-PI, PI)
        };
        DVector::from_element(1, rng.random_range(min..=max))
    }
}
