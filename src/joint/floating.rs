use na::{
    DMatrix, DVector, Isometry3, Matrix3, Matrix3xX, Quaternion, Translation3, UnitQuaternion,
    Vector3,
};
use rand::Rng;

use crate::{
    joint::JointModel,
    spatial::{
        geometric_jacobian::GeometricJacobian, spatial_acceleration::SpatialAcceleration,
        transform::Transform3D,
    },
    types::{real, Float, Real},
    util::quaternion_derivative_matrix,
    PI,
};

/// A six degree-of-freedom joint.
///
/// q = [x, y, z, qw, qx, qy, qz]: position of the successor in the joint's
/// fixed frame, followed by the orientation quaternion.
/// v = [ω, v]: angular velocity and origin velocity of the successor, both
/// expressed in the successor frame.
#[derive(Debug, Clone)]
pub struct FloatingJoint {
    pub transform: Transform3D, // fixed transform from successor frame to predecessor frame
}

impl FloatingJoint {
    pub fn new(transform: Transform3D) -> Self {
        Self { transform }
    }

    fn quaternion<T: Real>(q: &[T]) -> Quaternion<T> {
        Quaternion::new(q[3], q[4], q[5], q[6])
    }

    fn rotation<T: Real>(q: &[T]) -> UnitQuaternion<T> {
        UnitQuaternion::from_quaternion(Self::quaternion(q))
    }
}

impl JointModel for FloatingJoint {
    fn num_positions(&self) -> usize {
        7
    }

    fn num_velocities(&self) -> usize {
        6
    }

    fn transform_to_parent(&self) -> &Transform3D {
        &self.transform
    }

    fn joint_motion<T: Real>(&self, q: &[T]) -> Isometry3<T> {
        Isometry3::from_parts(
            Translation3::new(q[0], q[1], q[2]),
            Self::rotation(q),
        )
    }

    fn motion_subspace<T: Real>(&self, _q: &[T]) -> GeometricJacobian<T> {
        let mut angular = Matrix3xX::zeros(6);
        angular
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&Matrix3::identity());
        let mut linear = Matrix3xX::zeros(6);
        linear
            .fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&Matrix3::identity());
        GeometricJacobian::new(
            &self.transform.from,
            &self.transform.to,
            &self.transform.from,
            angular,
            linear,
        )
    }

    /// The motion subspace is constant in the successor frame
    fn motion_subspace_dot_times_v<T: Real>(&self, _q: &[T], _v: &[T]) -> SpatialAcceleration<T> {
        SpatialAcceleration::zero(&self.transform.from, &self.transform.to, &self.transform.from)
    }

    /// ω = 2 G(q)^T * quaternion_dot, v = R^T * position_dot
    fn qdot_to_v<T: Real>(&self, q: &[T]) -> DMatrix<T> {
        let R = Self::rotation(q).to_rotation_matrix().into_inner();
        let G = quaternion_derivative_matrix(&Self::quaternion(q));

        let mut result = DMatrix::zeros(6, 7);
        result
            .view_mut((0, 3), (3, 4))
            .copy_from(&(G.transpose() * real::<T>(2.0)));
        result.view_mut((3, 0), (3, 3)).copy_from(&R.transpose());
        result
    }

    /// position_dot = R * v, quaternion_dot = 1/2 G(q) * ω
    fn v_to_qdot<T: Real>(&self, q: &[T]) -> DMatrix<T> {
        let R = Self::rotation(q).to_rotation_matrix().into_inner();
        let G = quaternion_derivative_matrix(&Self::quaternion(q));

        let mut result = DMatrix::zeros(7, 6);
        result.view_mut((0, 3), (3, 3)).copy_from(&R);
        result
            .view_mut((3, 0), (4, 3))
            .copy_from(&(G * real::<T>(0.5)));
        result
    }

    fn zero_configuration(&self) -> DVector<Float> {
        DVector::from_vec(vec![0., 0., 0., 1., 0., 0., 0.])
    }

    fn random_configuration<R: Rng>(&self, rng: &mut R) -> DVector<Float> {
        let position = Vector3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        );
        let rotation = UnitQuaternion::from_euler_angles(
            rng.random_range(-PI..=PI),
            rng.random_range(-PI / 2.0..=PI / 2.0),
            rng.random_range(-PI..=PI),
        );
        DVector::from_vec(vec![
            position.x, position.y, position.z, rotation.w, rotation.i, rotation.j, rotation.k,
        ])
    }

    fn configuration_warning<T: Real>(&self, q: &[T]) -> Option<&'static str> {
        let deviation = Self::quaternion(q).norm_squared() - T::one();
        if deviation * deviation > real(1e-12) {
            Some("floating joint quaternion is not normalized; it will be normalized internally")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod floating_joint_tests {
    use na::vector;

    use crate::{assert_vec_close, WORLD_FRAME};

    use super::*;

    /// v_to_qdot * v reproduces the quaternion derivative and the world-frame
    /// translation rate
    #[test]
    fn v_to_qdot_matches_quaternion_derivative() {
        // Arrange
        let joint = FloatingJoint::new(Transform3D::identity("b", WORLD_FRAME));
        let rotation = UnitQuaternion::from_euler_angles(0.3, -0.4, 1.2);
        let q = [1., 2., 3., rotation.w, rotation.i, rotation.j, rotation.k];
        let omega = vector![0.5, -1.0, 0.25];
        let v_body = vector![1.0, 0.0, -2.0];
        let v = DVector::from_vec(vec![omega.x, omega.y, omega.z, v_body.x, v_body.y, v_body.z]);

        // Act
        let qdot = joint.v_to_qdot(&q) * v;

        // Assert
        let expected_quat_dot = crate::util::quaternion_derivative(&rotation, &omega);
        assert_vec_close!(qdot.rows(0, 3), rotation * v_body, 1e-12);
        assert_vec_close!(
            qdot.rows(3, 4),
            vector![expected_quat_dot.w, expected_quat_dot.i, expected_quat_dot.j, expected_quat_dot.k],
            1e-12
        );
    }

    #[test]
    fn non_unit_quaternion_is_flagged() {
        let joint = FloatingJoint::new(Transform3D::identity("b", WORLD_FRAME));

        assert!(joint.configuration_warning(&[0., 0., 0., 2., 0., 0., 0.]).is_some());
        assert!(joint.configuration_warning(&[0., 0., 0., 1., 0., 0., 0.]).is_none());
    }
}
