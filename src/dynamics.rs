use std::collections::HashMap;

use itertools::izip;
use na::{DMatrix, DVector, Vector3};
use tracing::debug;

use crate::{
    error::{KinematicsError, KinematicsResult},
    inertia::SpatialInertia,
    joint::JointModel,
    kinematics_cache::{KinematicsCache, KinematicsCacheElement},
    momentum::MomentumMatrix,
    rigid_body::RigidBody,
    spatial::{spatial_acceleration::SpatialAcceleration, twist::Twist, wrench::Wrench},
    tree::RigidBodyTree,
    types::Real,
    util::{cast_vector3, mul_inertia},
    WORLD_FRAME,
};

/// Apply the Newton-Euler equation to compute the wrench to move a body at
/// given acceleration and velocity:
///     f = I * a + v \dualcross I * v
///
/// Reference: Table 5.1 in "Robot Dynamics Algorithms" by Roy Featherstone
pub fn newton_euler<T: Real>(
    inertia: &SpatialInertia<T>,
    twist: &Twist<T>,
    accel: &SpatialAcceleration<T>,
) -> Wrench<T> {
    if twist.frame != accel.frame || inertia.frame != twist.frame {
        panic!(
            "inertia frame {}, twist frame {} and acceleration frame {} must agree!",
            inertia.frame, twist.frame, accel.frame
        );
    }

    let (J, c, m) = (&inertia.moment, &inertia.cross_part, inertia.mass);
    let (mut ang, mut lin) = mul_inertia(J, c, m, &accel.angular, &accel.linear);
    let (angular_momentum, linear_momentum) = mul_inertia(J, c, m, &twist.angular, &twist.linear);

    ang += twist.angular.cross(&angular_momentum) + twist.linear.cross(&linear_momentum);
    lin += twist.angular.cross(&linear_momentum);
    Wrench::new(&twist.frame, ang, lin)
}

impl RigidBodyTree {
    /// Fill in each body's inertia in world, and the composite inertia of
    /// the subtree it roots
    pub fn update_composite_rigid_body_inertias<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
    ) -> KinematicsResult<()> {
        self.check_cache(cache, false, false, "update_composite_rigid_body_inertias")?;

        let (elements, _, _) = cache.split_mut();
        for (body, element) in izip!(self.bodies.iter(), elements.iter_mut()) {
            element.inertia_in_world = body.inertia.cast::<T>().transform(&element.transform_to_world);
            element.crb_in_world = element.inertia_in_world.clone();
        }
        // Children come after their parents
        for (i, body) in self.bodies.iter().enumerate().rev() {
            let Some(parent) = body.parent else {
                continue;
            };
            let (done, rest) = elements.split_at_mut(i);
            done[parent].crb_in_world += &rest[0].crb_in_world;
        }

        cache.set_inertias_cached();
        debug!(bodies = self.num_bodies(), "Composite rigid body inertias updated");
        Ok(())
    }

    /// Joint-space mass matrix M(q), by the composite rigid body algorithm in
    /// world frame.
    ///
    /// Reference: Chapter 6.2 in "Robot Dynamics Algorithms" by Roy Featherstone
    pub fn mass_matrix<T: Real>(&self, cache: &mut KinematicsCache<T>) -> KinematicsResult<DMatrix<T>> {
        self.check_cache(cache, false, false, "mass_matrix")?;
        if !cache.are_inertias_cached() {
            self.update_composite_rigid_body_inertias(cache)?;
        }

        let mut H = DMatrix::zeros(self.num_velocities(), self.num_velocities());
        for (i, body_i) in self.bodies.iter().enumerate() {
            let Some(joint_i) = body_i.joint.as_ref() else {
                continue;
            };
            let element_i = cache.element(i)?;
            let F = MomentumMatrix::mul(&element_i.crb_in_world, &element_i.motion_subspace_in_world);
            let (vi, ni) = (body_i.velocity_num_start, joint_i.num_velocities());
            if ni == 0 {
                continue;
            }
            H.view_mut((vi, vi), (ni, ni))
                .copy_from(&F.transpose_mul(&element_i.motion_subspace_in_world));

            let mut ancestor = body_i.parent;
            while let Some(j) = ancestor {
                let body_j = self.body(j)?;
                if let Some(joint_j) = body_j.joint.as_ref() {
                    let (vj, nj) = (body_j.velocity_num_start, joint_j.num_velocities());
                    let Hij = F.transpose_mul(&cache.element(j)?.motion_subspace_in_world);
                    H.view_mut((vi, vj), (ni, nj)).copy_from(&Hij);
                    H.view_mut((vj, vi), (nj, ni)).copy_from(&Hij.transpose());
                }
                ancestor = body_j.parent;
            }
        }
        Ok(H)
    }

    /// External wrench on `body` as a world-frame wrench. Accepts wrenches in
    /// the body frame or the world frame.
    fn external_wrench_in_world<T: Real>(
        &self,
        body: &RigidBody,
        element: &KinematicsCacheElement<T>,
        wrench: &Wrench<T>,
    ) -> KinematicsResult<Wrench<T>> {
        if wrench.frame == WORLD_FRAME {
            Ok(wrench.clone())
        } else if wrench.frame == body.name {
            Ok(wrench.transform(&element.transform_to_world))
        } else {
            Err(KinematicsError::frame_mismatch(&body.name, &wrench.frame))
        }
    }

    /// Joint torques τ such that M(q) vd + c(q, v) = τ, with c including
    /// gravity and the external wrenches `f_ext` (keyed by body index).
    /// `vd` defaults to zero.
    ///
    /// Recursive Newton-Euler in world frame.
    /// Reference: Table 5.1 in "Robot Dynamics Algorithms" by Roy Featherstone
    pub fn inverse_dynamics<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
        f_ext: &HashMap<usize, Wrench<T>>,
        vd: Option<&DVector<T>>,
    ) -> KinematicsResult<DVector<T>> {
        self.check_cache(cache, true, true, "inverse_dynamics")?;
        if let Some(vd) = vd {
            if vd.len() != self.num_velocities() {
                return Err(KinematicsError::dimension("vd", self.num_velocities(), vd.len()));
            }
        }
        for &body in f_ext.keys() {
            self.body(body)?;
        }
        if !cache.are_inertias_cached() {
            self.update_composite_rigid_body_inertias(cache)?;
        }

        // Gravity enters as an upward acceleration of the world
        let gravity = cast_vector3::<T>(self.gravity());
        let inv_gravity = SpatialAcceleration::inv_gravitational_spatial_acceleration(&gravity, WORLD_FRAME);

        // Accumulated S * vd of the joints between world and each body
        let mut joint_accels: Vec<(Vector3<T>, Vector3<T>)> =
            vec![(Vector3::zeros(), Vector3::zeros()); self.num_bodies()];
        let mut wrenches: Vec<Wrench<T>> = Vec::with_capacity(self.num_bodies());
        for (i, body) in self.bodies.iter().enumerate() {
            let element = cache.element(i)?;
            if let (Some(parent), Some(joint), Some(vd)) = (body.parent, body.joint.as_ref(), vd) {
                let vd_joint = vd.rows(body.velocity_num_start, joint.num_velocities()).into_owned();
                let S = &element.motion_subspace_in_world;
                let (ang, lin) = joint_accels[parent];
                joint_accels[i] = (ang + &S.angular * &vd_joint, lin + &S.linear * &vd_joint);
            } else if let Some(parent) = body.parent {
                joint_accels[i] = joint_accels[parent];
            }

            let jdotv = &element.motion_subspace_in_world_dot_times_v;
            let accel = SpatialAcceleration::new(
                &body.name,
                WORLD_FRAME,
                WORLD_FRAME,
                inv_gravity.angular + jdotv.angular + joint_accels[i].0,
                inv_gravity.linear + jdotv.linear + joint_accels[i].1,
            );
            let mut wrench = newton_euler(&element.inertia_in_world, &element.twist_in_world, &accel);
            if let Some(external) = f_ext.get(&i) {
                wrench -= &self.external_wrench_in_world(body, element, external)?;
            }
            wrenches.push(wrench);
        }

        let mut torques = DVector::zeros(self.num_velocities());
        for (i, body) in self.bodies.iter().enumerate().rev() {
            let (Some(parent), Some(joint)) = (body.parent, body.joint.as_ref()) else {
                continue;
            };
            let S = &cache.element(i)?.motion_subspace_in_world;
            torques
                .rows_mut(body.velocity_num_start, joint.num_velocities())
                .copy_from(&S.transpose_mul_wrench(&wrenches[i]));
            let (done, rest) = wrenches.split_at_mut(i);
            done[parent] += &rest[0];
        }
        Ok(torques)
    }

    /// Compute the 'dynamics bias term', i.e. the term
    ///     c(q, v)
    /// in the unconstrained joint-space equations of motion
    ///     M(q) vdot + c(q, v) = τ
    pub fn dynamics_bias_term<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
        f_ext: &HashMap<usize, Wrench<T>>,
    ) -> KinematicsResult<DVector<T>> {
        self.inverse_dynamics(cache, f_ext, None)
    }

    /// Joint friction torques at velocity v, from each joint's damping and
    /// Coulomb friction. Add them to τ before calling forward_dynamics.
    pub fn friction_torques<T: Real>(&self, v: &DVector<T>) -> KinematicsResult<DVector<T>> {
        if v.len() != self.num_velocities() {
            return Err(KinematicsError::dimension("v", self.num_velocities(), v.len()));
        }
        let mut torques = DVector::zeros(self.num_velocities());
        for (body, joint) in self.joints() {
            let n = joint.num_velocities();
            let v_joint = v.rows(body.velocity_num_start, n).into_owned();
            torques
                .rows_mut(body.velocity_num_start, n)
                .copy_from(&joint.friction_torque(v_joint.as_slice()));
        }
        Ok(torques)
    }

    /// Solve M(q) vd + c(q, v) = τ for vd
    pub fn forward_dynamics<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
        tau: &DVector<T>,
        f_ext: &HashMap<usize, Wrench<T>>,
    ) -> KinematicsResult<DVector<T>> {
        if tau.len() != self.num_velocities() {
            return Err(KinematicsError::dimension("tau", self.num_velocities(), tau.len()));
        }
        let bias = self.dynamics_bias_term(cache, f_ext)?;
        let mass_matrix = self.mass_matrix(cache)?;

        mass_matrix
            .lu()
            .solve(&(tau - bias))
            .ok_or(KinematicsError::SingularMassMatrix)
    }
}

#[cfg(test)]
mod tests {
    use na::{dvector, vector, UnitQuaternion};
    use rand::{rngs::StdRng, SeedableRng};

    use crate::{
        assert_close, assert_vec_close,
        error::Requirement,
        helpers::{
            build_bracket_pendulum, build_branching_tree, build_double_pendulum,
            build_floating_body, build_rod_pendulum,
        },
        types::Float,
        util::test_utils::{random_dvector, random_quaternion},
        GRAVITY, PI,
    };

    use crate::{
        joint::{
            fixed::FixedJoint, prismatic::PrismaticJoint, revolute::RevoluteJoint, Joint,
            JointFriction,
        },
        spatial::transform::Transform3D,
    };

    use super::*;

    fn no_wrenches() -> HashMap<usize, Wrench<Float>> {
        HashMap::new()
    }

    #[test]
    fn double_pendulum_mass_matrix() {
        // Arrange
        let tree = build_double_pendulum(1.0, 1.0).unwrap();
        let q2: Float = 0.7;
        let mut cache = tree.kinematics(&dvector![0.2, q2]).unwrap();

        // Act
        let M = tree.mass_matrix(&mut cache).unwrap();

        // Assert
        assert_close!(M[(0, 0)], 3.0 + 2.0 * q2.cos(), 1e-12);
        assert_close!(M[(0, 1)], 1.0 + q2.cos(), 1e-12);
        assert_close!(M[(1, 0)], 1.0 + q2.cos(), 1e-12);
        assert_close!(M[(1, 1)], 1.0, 1e-12);
        assert!(cache.are_inertias_cached());
    }

    #[test]
    fn double_pendulum_gravity_bias() {
        // Arrange
        let tree = build_double_pendulum(1.0, 1.0).unwrap();
        let (q1, q2): (Float, Float) = (0.4, -0.3);
        let mut cache = tree
            .kinematics_with_velocity(&dvector![q1, q2], &dvector![0.0, 0.0], true)
            .unwrap();

        // Act
        let c = tree.dynamics_bias_term(&mut cache, &no_wrenches()).unwrap();

        // Assert
        let g = GRAVITY;
        assert_close!(c[0], g * (2.0 * q1.sin() + (q1 + q2).sin()), 1e-10);
        assert_close!(c[1], g * (q1 + q2).sin(), 1e-10);
    }

    /// A uniform rod released horizontally: vd = -3g / (2l)
    #[test]
    fn rod_pendulum_released_horizontally() {
        // Arrange
        let l = 2.0;
        let tree = build_rod_pendulum(5.0, l).unwrap();
        let mut cache = tree
            .kinematics_with_velocity(&dvector![PI / 2.0], &dvector![0.0], true)
            .unwrap();

        // Act
        let vd = tree
            .forward_dynamics(&mut cache, &dvector![0.0], &no_wrenches())
            .unwrap();

        // Assert
        assert_close!(vd[0], -3.0 * GRAVITY / (2.0 * l), 1e-10);
    }

    /// A translating free body falls with g, seen from its own frame
    #[test]
    fn free_body_falls() {
        // Arrange
        let tree = build_floating_body().unwrap();
        let mut rng = StdRng::seed_from_u64(30);
        let rotation = random_quaternion(&mut rng, PI);
        let q = dvector![0.5, -1., 2., rotation.w, rotation.i, rotation.j, rotation.k];
        let v = dvector![0., 0., 0., 0.3, -0.2, 0.1];
        let mut cache = tree.kinematics_with_velocity(&q, &v, true).unwrap();

        // Act
        let vd = tree
            .forward_dynamics(&mut cache, &DVector::zeros(6), &no_wrenches())
            .unwrap();

        // Assert
        let expected_linear = rotation.inverse() * vector![0., 0., -GRAVITY];
        assert_vec_close!(vd.rows(0, 3), vector![0., 0., 0.], 1e-10);
        assert_vec_close!(vd.rows(3, 3), expected_linear, 1e-10);
    }

    /// Holding a body up with an external force cancels gravity, whether the
    /// force is given in world or in the body frame
    #[test]
    fn external_wrench_cancels_gravity() {
        // Arrange
        let tree = build_floating_body().unwrap();
        let rotation = UnitQuaternion::from_euler_angles(0.3, -0.2, 0.5);
        let q = dvector![1., 0., 0., rotation.w, rotation.i, rotation.j, rotation.k];
        let mut cache = tree
            .kinematics_with_velocity(&q, &DVector::zeros(6), true)
            .unwrap();
        let lift = vector![0., 0., GRAVITY];
        let in_world = Wrench::from_force(&vector![1., 0., 0.], &lift, WORLD_FRAME);
        let in_body = Wrench::from_force(&vector![0., 0., 0.], &(rotation.inverse() * lift), "body");

        for wrench in [in_world, in_body] {
            // Act
            let f_ext = HashMap::from([(1, wrench)]);
            let vd = tree
                .forward_dynamics(&mut cache, &DVector::zeros(6), &f_ext)
                .unwrap();

            // Assert
            assert_vec_close!(vd, DVector::<Float>::zeros(6), 1e-10);
        }
    }

    #[test]
    fn wrench_in_unrelated_frame_is_rejected() {
        let tree = build_floating_body().unwrap();
        let mut cache = tree
            .kinematics_with_velocity(&tree.zero_configuration(), &DVector::zeros(6), true)
            .unwrap();
        let f_ext = HashMap::from([(1, Wrench::zero("elsewhere"))]);

        let result = tree.dynamics_bias_term(&mut cache, &f_ext);

        assert_eq!(result, Err(KinematicsError::frame_mismatch("body", "elsewhere")));
    }

    /// inverse_dynamics(vd) = M vd + c on a branching tree
    #[test]
    fn inverse_dynamics_agrees_with_mass_matrix() {
        // Arrange
        let tree = build_branching_tree().unwrap();
        let mut rng = StdRng::seed_from_u64(31);
        let q = tree.random_configuration(&mut rng);
        let v = random_dvector(&mut rng, tree.num_velocities(), 1.0);
        let vd = random_dvector(&mut rng, tree.num_velocities(), 1.0);
        let mut cache = tree.kinematics_with_velocity(&q, &v, true).unwrap();
        let f_ext = HashMap::from([(3, Wrench::new("3", vector![0.1, 0.2, 0.3], vector![-1., 0.5, 2.]))]);

        // Act
        let tau = tree.inverse_dynamics(&mut cache, &f_ext, Some(&vd)).unwrap();

        // Assert
        let M = tree.mass_matrix(&mut cache).unwrap();
        let c = tree.dynamics_bias_term(&mut cache, &f_ext).unwrap();
        assert_vec_close!(&tau, &M * &vd + &c, 1e-9);
        assert_vec_close!(&M, M.transpose(), 1e-12);

        let vd_solved = tree.forward_dynamics(&mut cache, &tau, &f_ext).unwrap();
        assert_vec_close!(vd_solved, vd, 1e-8);
    }

    /// Same identity on a tree with a welded body between two hinges
    #[test]
    fn inverse_dynamics_across_fixed_joint() {
        // Arrange
        let tree = build_bracket_pendulum(1.0, 1.0).unwrap();
        let q = dvector![0.4, -0.7];
        let v = dvector![1.3, -0.8];
        let vd = dvector![0.5, 2.0];
        let mut cache = tree.kinematics_with_velocity(&q, &v, true).unwrap();

        // Act
        let tau = tree.inverse_dynamics(&mut cache, &no_wrenches(), Some(&vd)).unwrap();

        // Assert
        let M = tree.mass_matrix(&mut cache).unwrap();
        let c = tree.dynamics_bias_term(&mut cache, &no_wrenches()).unwrap();
        assert_eq!(M.shape(), (2, 2));
        assert_vec_close!(&tau, &M * &vd + &c, 1e-10);
        // The bracket's mass rides on the upper hinge
        let bracket_crb = &cache.element(2).unwrap().crb_in_world;
        assert_close!(bracket_crb.mass, 1.5, 1e-12);
    }

    #[test]
    fn friction_torques_per_joint() {
        // Arrange
        let mut tree = RigidBodyTree::new();
        let friction = JointFriction {
            damping: 0.5,
            coulomb_friction: 1.0,
            coulomb_window: 0.1,
        };
        let hinge = RevoluteJoint::new(Transform3D::identity("a", WORLD_FRAME), Vector3::y_axis())
            .with_friction(friction);
        tree.add_body(RigidBody::new_sphere(1.0, 0.1, "a"), 0, Joint::RevoluteJoint(hinge))
            .unwrap();
        let weld = FixedJoint::new(Transform3D::move_x("b", "a", 1.0));
        tree.add_body(RigidBody::new_sphere(1.0, 0.1, "b"), 1, Joint::FixedJoint(weld))
            .unwrap();
        let slider = PrismaticJoint::new(Transform3D::identity("c", "b"), Vector3::x_axis());
        tree.add_body(RigidBody::new_sphere(1.0, 0.1, "c"), 2, Joint::PrismaticJoint(slider))
            .unwrap();

        // Act
        let tau = tree.friction_torques(&dvector![2.0, 3.0]).unwrap();

        // Assert
        assert_vec_close!(tau, dvector![-2.0, 0.0], 1e-12);
        assert_eq!(
            tree.friction_torques(&dvector![1.0]),
            Err(KinematicsError::dimension("v", 2, 1))
        );
    }

    /// Damping drains energy from a swinging pendulum
    #[test]
    fn damped_pendulum_slows_down() {
        let mut tree = RigidBodyTree::new();
        let hinge = RevoluteJoint::new(Transform3D::identity("rod", WORLD_FRAME), Vector3::y_axis())
            .with_friction(JointFriction {
                damping: 1.0,
                ..Default::default()
            });
        let rod = RigidBody::new_point_mass(1.0, &vector![0., 0., -1.], "rod");
        tree.add_body(rod, 0, Joint::RevoluteJoint(hinge)).unwrap();
        let v = dvector![2.0];
        let mut cache = tree
            .kinematics_with_velocity(&dvector![0.0], &v, true)
            .unwrap();

        let tau = tree.friction_torques(&v).unwrap();
        let vd = tree.forward_dynamics(&mut cache, &tau, &no_wrenches()).unwrap();

        // M = 1, no gravity torque at the bottom
        assert_close!(vd[0], -2.0, 1e-10);
    }

    #[test]
    fn composite_inertia_of_root_is_total() {
        let tree = build_branching_tree().unwrap();
        let mut cache = tree.kinematics(&tree.zero_configuration()).unwrap();

        tree.update_composite_rigid_body_inertias(&mut cache).unwrap();

        let root = cache.element(0).unwrap();
        assert_close!(root.crb_in_world.mass, tree.total_mass(), 1e-12);
        assert_close!(cache.element(4).unwrap().crb_in_world.mass, 2.0, 1e-12);
    }

    #[test]
    fn inverse_dynamics_needs_jdotv() {
        let tree = build_double_pendulum(1.0, 1.0).unwrap();
        let mut cache = tree
            .kinematics_with_velocity(&dvector![0.1, 0.2], &dvector![0.0, 0.0], false)
            .unwrap();

        let result = tree.dynamics_bias_term(&mut cache, &no_wrenches());

        assert_eq!(
            result,
            Err(KinematicsError::NotReady {
                method: "inverse_dynamics",
                requirement: Requirement::JdotV
            })
        );
    }

    #[test]
    fn wrong_vd_length_is_rejected() {
        let tree = build_double_pendulum(1.0, 1.0).unwrap();
        let mut cache = tree
            .kinematics_with_velocity(&dvector![0.1, 0.2], &dvector![0.0, 0.0], true)
            .unwrap();

        let result = tree.inverse_dynamics(&mut cache, &no_wrenches(), Some(&dvector![1.0]));

        assert_eq!(result, Err(KinematicsError::dimension("vd", 2, 1)));
    }
}
