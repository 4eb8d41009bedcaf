use fixed::FixedJoint;
use floating::FloatingJoint;
use na::{DMatrix, DVector, Isometry3};
use prismatic::PrismaticJoint;
use rand::Rng;
use revolute::RevoluteJoint;

use crate::{
    spatial::{
        geometric_jacobian::GeometricJacobian, spatial_acceleration::SpatialAcceleration,
        transform::Transform3D,
    },
    types::{real, Float, Real},
};

pub mod fixed;
pub mod floating;
pub mod prismatic;
pub mod revolute;

/// Viscous and Coulomb friction of a single-axis joint. The Coulomb part
/// ramps linearly over |v| < coulomb_window so it stays continuous at rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointFriction {
    pub damping: Float,
    pub coulomb_friction: Float,
    pub coulomb_window: Float,
}

impl Default for JointFriction {
    fn default() -> Self {
        JointFriction {
            damping: 0.,
            coulomb_friction: 0.,
            coulomb_window: Float::EPSILON,
        }
    }
}

impl JointFriction {
    /// Torque (or force) opposing the joint velocity v
    pub fn torque<T: Real>(&self, v: T) -> T {
        let one = T::one();
        let ramp = (v / real::<T>(self.coulomb_window)).max(-one).min(one);
        -(v * real::<T>(self.damping) + ramp * real::<T>(self.coulomb_friction))
    }
}

/// Behaviour shared by every joint type.
///
/// A joint connects a successor body to its predecessor (parent). Its fixed
/// transform maps the successor's joint frame into the parent body frame; the
/// joint motion is applied on top of it, so that
///     body_to_parent(q) = transform_to_parent * joint_motion(q).
/// Motion subspaces and velocity vectors are expressed in the successor frame.
///
/// `q` and `v` slices only hold this joint's own coordinates.
pub trait JointModel {
    fn num_positions(&self) -> usize;

    fn num_velocities(&self) -> usize;

    /// Fixed transform from the successor body frame to the parent body frame
    fn transform_to_parent(&self) -> &Transform3D;

    /// Motion of the successor relative to the joint's fixed placement
    fn joint_motion<T: Real>(&self, q: &[T]) -> Isometry3<T>;

    /// Columns span the successor's twist w.r.t. the parent, expressed in the
    /// successor frame
    fn motion_subspace<T: Real>(&self, q: &[T]) -> GeometricJacobian<T>;

    /// d/dt(S) * v, expressed in the successor frame
    fn motion_subspace_dot_times_v<T: Real>(&self, q: &[T], v: &[T]) -> SpatialAcceleration<T>;

    /// Maps qdot to v: v = qdot_to_v(q) * qdot
    fn qdot_to_v<T: Real>(&self, q: &[T]) -> DMatrix<T>;

    /// Maps v to qdot: qdot = v_to_qdot(q) * v
    fn v_to_qdot<T: Real>(&self, q: &[T]) -> DMatrix<T>;

    fn zero_configuration(&self) -> DVector<Float>;

    fn random_configuration<R: Rng>(&self, rng: &mut R) -> DVector<Float>;

    /// Returns a message if q is not a valid configuration as given, e.g. a
    /// non-unit quaternion. Such q are still usable, with the joint
    /// normalizing internally.
    fn configuration_warning<T: Real>(&self, _q: &[T]) -> Option<&'static str> {
        None
    }

    /// Lower and upper bounds on q. Unbounded by default.
    fn position_limits(&self) -> (DVector<Float>, DVector<Float>) {
        (
            DVector::from_element(self.num_positions(), Float::NEG_INFINITY),
            DVector::from_element(self.num_positions(), Float::INFINITY),
        )
    }

    /// Friction torques at joint velocity v. Frictionless by default.
    fn friction_torque<T: Real>(&self, _v: &[T]) -> DVector<T> {
        DVector::zeros(self.num_velocities())
    }

    /// Transform from the successor body frame to the parent body frame at q
    fn transform<T: Real>(&self, q: &[T]) -> Transform3D<T> {
        let fixed = self.transform_to_parent();
        Transform3D::new(
            &fixed.from,
            &fixed.to,
            crate::util::cast_isometry(&fixed.iso) * self.joint_motion(q),
        )
    }

    /// Name of the successor body
    fn body_name(&self) -> &str {
        &self.transform_to_parent().from
    }

    /// Name of the parent body
    fn parent_name(&self) -> &str {
        &self.transform_to_parent().to
    }
}

#[derive(Debug, Clone)]
pub enum Joint {
    FixedJoint(FixedJoint),
    RevoluteJoint(RevoluteJoint),
    PrismaticJoint(PrismaticJoint),
    FloatingJoint(FloatingJoint),
}

macro_rules! dispatch {
    ($self:ident, $joint:ident => $body:expr) => {
        match $self {
            Joint::FixedJoint($joint) => $body,
            Joint::RevoluteJoint($joint) => $body,
            Joint::PrismaticJoint($joint) => $body,
            Joint::FloatingJoint($joint) => $body,
        }
    };
}

impl JointModel for Joint {
    fn num_positions(&self) -> usize {
        dispatch!(self, joint => joint.num_positions())
    }

    fn num_velocities(&self) -> usize {
        dispatch!(self, joint => joint.num_velocities())
    }

    fn transform_to_parent(&self) -> &Transform3D {
        dispatch!(self, joint => joint.transform_to_parent())
    }

    fn joint_motion<T: Real>(&self, q: &[T]) -> Isometry3<T> {
        dispatch!(self, joint => joint.joint_motion(q))
    }

    fn motion_subspace<T: Real>(&self, q: &[T]) -> GeometricJacobian<T> {
        dispatch!(self, joint => joint.motion_subspace(q))
    }

    fn motion_subspace_dot_times_v<T: Real>(&self, q: &[T], v: &[T]) -> SpatialAcceleration<T> {
        dispatch!(self, joint => joint.motion_subspace_dot_times_v(q, v))
    }

    fn qdot_to_v<T: Real>(&self, q: &[T]) -> DMatrix<T> {
        dispatch!(self, joint => joint.qdot_to_v(q))
    }

    fn v_to_qdot<T: Real>(&self, q: &[T]) -> DMatrix<T> {
        dispatch!(self, joint => joint.v_to_qdot(q))
    }

    fn zero_configuration(&self) -> DVector<Float> {
        dispatch!(self, joint => joint.zero_configuration())
    }

    fn random_configuration<R: Rng>(&self, rng: &mut R) -> DVector<Float> {
        dispatch!(self, joint => joint.random_configuration(rng))
    }

    fn configuration_warning<T: Real>(&self, q: &[T]) -> Option<&'static str> {
        dispatch!(self, joint => joint.configuration_warning(q))
    }

    fn position_limits(&self) -> (DVector<Float>, DVector<Float>) {
        dispatch!(self, joint => joint.position_limits())
    }

    fn friction_torque<T: Real>(&self, v: &[T]) -> DVector<T> {
        dispatch!(self, joint => joint.friction_torque(v))
    }
}

impl Joint {
    pub fn is_fixed(&self) -> bool {
        matches!(self, Joint::FixedJoint(_))
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Joint::FloatingJoint(_))
    }
}

#[cfg(test)]
mod tests {
    use na::Vector3;
    use rand::{rngs::StdRng, SeedableRng};

    use crate::{assert_vec_close, WORLD_FRAME};

    use super::*;

    fn all_joints() -> Vec<Joint> {
        vec![
            Joint::FixedJoint(FixedJoint::new(Transform3D::move_x("a", WORLD_FRAME, 1.0))),
            Joint::RevoluteJoint(RevoluteJoint::new(
                Transform3D::move_x("b", WORLD_FRAME, 1.0),
                Vector3::z_axis(),
            )),
            Joint::PrismaticJoint(PrismaticJoint::new(
                Transform3D::move_z("c", WORLD_FRAME, 1.0),
                Vector3::x_axis(),
            )),
            Joint::FloatingJoint(FloatingJoint::new(Transform3D::identity("d", WORLD_FRAME))),
        ]
    }

    /// qdot_to_v * v_to_qdot is the identity on v for every joint
    #[test]
    fn velocity_maps_are_consistent() {
        let mut rng = StdRng::seed_from_u64(1);
        for joint in all_joints() {
            let q = joint.random_configuration(&mut rng);
            let q = q.as_slice();

            let product = joint.qdot_to_v(q) * joint.v_to_qdot(q);

            let n = joint.num_velocities();
            assert_eq!(product.shape(), (n, n));
            assert_vec_close!(product, DMatrix::<Float>::identity(n, n), 1e-10);
        }
    }

    /// The motion subspace has as many columns as the joint has velocities
    #[test]
    fn motion_subspace_dimensions() {
        for joint in all_joints() {
            let q = joint.zero_configuration();
            let S: GeometricJacobian = joint.motion_subspace(q.as_slice());
            assert_eq!(S.dim(), joint.num_velocities());
            assert_eq!(S.body, joint.body_name());
            assert_eq!(S.base, WORLD_FRAME);
        }
    }

    #[test]
    fn friction_opposes_motion() {
        let friction = JointFriction {
            damping: 0.5,
            coulomb_friction: 2.0,
            coulomb_window: 0.1,
        };

        assert_eq!(friction.torque(0.0), 0.0);
        // inside the window the Coulomb part ramps
        assert!((friction.torque(0.05 as Float) - (-0.025 - 1.0)).abs() < 1e-12);
        // outside it saturates
        assert!((friction.torque(-3.0 as Float) - (1.5 + 2.0)).abs() < 1e-12);
    }

    #[test]
    fn unlimited_joints_have_infinite_bounds() {
        for joint in all_joints() {
            let (lower, upper) = joint.position_limits();
            assert_eq!(lower.len(), joint.num_positions());
            assert!(lower.iter().all(|x| *x == Float::NEG_INFINITY));
            assert!(upper.iter().all(|x| *x == Float::INFINITY));
        }
    }

    #[test]
    fn zero_configuration_is_fixed_transform() {
        for joint in all_joints() {
            let q = joint.zero_configuration();
            let transform: Transform3D = joint.transform(q.as_slice());
            assert_vec_close!(
                transform.trans(),
                joint.transform_to_parent().trans(),
                1e-12
            );
        }
    }
}
