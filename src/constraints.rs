//! Constraints on q: joint limits, and loop closures between two frames.
//! Each is a function phi(q) together with its Jacobian.

use na::{DMatrix, DVector, Matrix3xX, Vector3};

use crate::{
    error::{KinematicsError, KinematicsResult},
    joint::JointModel,
    kinematics::RotationType,
    kinematics_cache::KinematicsCache,
    rigid_body::BodyOrFrameId,
    tree::RigidBodyTree,
    types::{real, Float, Real},
    util::cast_vector3,
};

/// Closes a kinematic loop. The origins of frames A and B coincide, and the
/// tip of `axis` in frame A coincides with the tip of `axis` in frame B, which
/// leaves rotation about `axis` free.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidBodyLoop {
    pub frame_a: usize,
    pub frame_b: usize,
    pub axis: Vector3<Float>, // same coordinates in both frames
}

impl RigidBodyLoop {
    pub fn new(frame_a: usize, frame_b: usize, axis: Vector3<Float>) -> Self {
        RigidBodyLoop {
            frame_a,
            frame_b,
            axis,
        }
    }

    /// Frame A origin and axis tip, in frame A coordinates
    fn points<T: Real>(&self) -> Matrix3xX<T> {
        Matrix3xX::from_columns(&[Vector3::zeros(), cast_vector3(&self.axis)])
    }

    fn frames(&self) -> (BodyOrFrameId, BodyOrFrameId) {
        (BodyOrFrameId::Frame(self.frame_a), BodyOrFrameId::Frame(self.frame_b))
    }
}

impl RigidBodyTree {
    /// Lower and upper bounds of every position coordinate
    pub fn joint_limits(&self) -> (DVector<Float>, DVector<Float>) {
        let mut lower = DVector::from_element(self.num_positions(), Float::NEG_INFINITY);
        let mut upper = DVector::from_element(self.num_positions(), Float::INFINITY);
        for (body, joint) in self.joints() {
            let (joint_lower, joint_upper) = joint.position_limits();
            let (start, n) = (body.position_num_start, joint.num_positions());
            lower.rows_mut(start, n).copy_from(&joint_lower);
            upper.rows_mut(start, n).copy_from(&joint_upper);
        }
        (lower, upper)
    }

    /// One constraint per finite bound
    pub fn num_joint_limit_constraints(&self) -> usize {
        let (lower, upper) = self.joint_limits();
        lower
            .iter()
            .chain(upper.iter())
            .filter(|bound| bound.is_finite())
            .count()
    }

    /// phi(q) >= 0 holds inside the joint limits. The rows are q - lower for
    /// every finite lower bound, then upper - q for every finite upper bound.
    /// Also returns d(phi)/dq.
    pub fn joint_limit_constraints<T: Real>(
        &self,
        q: &DVector<T>,
    ) -> KinematicsResult<(DVector<T>, DMatrix<T>)> {
        if q.len() != self.num_positions() {
            return Err(KinematicsError::dimension("q", self.num_positions(), q.len()));
        }
        let (lower, upper) = self.joint_limits();
        let n = self.num_joint_limit_constraints();
        let mut phi = DVector::zeros(n);
        let mut J = DMatrix::zeros(n, self.num_positions());

        let mut row = 0;
        for (i, bound) in lower.iter().enumerate().filter(|(_, b)| b.is_finite()) {
            phi[row] = q[i] - real::<T>(*bound);
            J[(row, i)] = T::one();
            row += 1;
        }
        for (i, bound) in upper.iter().enumerate().filter(|(_, b)| b.is_finite()) {
            phi[row] = real::<T>(*bound) - q[i];
            J[(row, i)] = -T::one();
            row += 1;
        }
        Ok((phi, J))
    }

    /// Register a loop closure, returning its index
    pub fn add_loop(&mut self, rb_loop: RigidBodyLoop) -> KinematicsResult<usize> {
        self.frame(rb_loop.frame_a)?;
        self.frame(rb_loop.frame_b)?;
        self.loops.push(rb_loop);
        Ok(self.loops.len() - 1)
    }

    pub fn loops(&self) -> &[RigidBodyLoop] {
        &self.loops
    }

    /// Six per loop
    pub fn num_position_constraints(&self) -> usize {
        6 * self.loops.len()
    }

    /// For each loop, frame A's origin in frame B, then frame A's axis tip in
    /// frame B minus the axis. All zero when every loop is closed.
    pub fn position_constraints<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
    ) -> KinematicsResult<DVector<T>> {
        self.check_cache(cache, false, false, "position_constraints")?;
        let mut phi = DVector::zeros(self.num_position_constraints());
        for (i, rb_loop) in self.loops.iter().enumerate() {
            let (a, b) = rb_loop.frames();
            let x = self.forward_kin(cache, &rb_loop.points(), a, b, RotationType::None)?;
            let origin: Vector3<T> = x.fixed_view::<3, 1>(0, 0).into_owned();
            let axis_tip: Vector3<T> = x.fixed_view::<3, 1>(0, 1).into_owned();
            phi.fixed_rows_mut::<3>(6 * i).copy_from(&origin);
            phi.fixed_rows_mut::<3>(6 * i + 3)
                .copy_from(&(axis_tip - cast_vector3::<T>(&rb_loop.axis)));
        }
        Ok(phi)
    }

    /// Jacobian of `position_constraints` w.r.t. v (or q, when
    /// `in_terms_of_qdot`)
    pub fn position_constraints_jacobian<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        in_terms_of_qdot: bool,
    ) -> KinematicsResult<DMatrix<T>> {
        self.check_cache(cache, false, false, "position_constraints_jacobian")?;
        let ncols = if in_terms_of_qdot {
            self.num_positions()
        } else {
            self.num_velocities()
        };
        let mut J = DMatrix::zeros(self.num_position_constraints(), ncols);
        for (i, rb_loop) in self.loops.iter().enumerate() {
            let (a, b) = rb_loop.frames();
            // 3 rows for the origin, then 3 for the axis tip
            let loop_jacobian = self.forward_kin_jacobian(
                cache,
                &rb_loop.points(),
                a,
                b,
                RotationType::None,
                in_terms_of_qdot,
            )?;
            J.rows_mut(6 * i, 6).copy_from(&loop_jacobian);
        }
        Ok(J)
    }
}

#[cfg(test)]
mod tests {
    use na::{dvector, vector};

    use crate::{
        assert_close, assert_vec_close,
        helpers::{build_branching_tree, build_double_pendulum},
        joint::{prismatic::PrismaticJoint, revolute::RevoluteJoint, Joint},
        rigid_body::{RigidBody, RigidBodyFrame},
        spatial::transform::Transform3D,
        WORLD_FRAME,
    };

    use super::*;

    fn limited_tree() -> RigidBodyTree {
        let mut tree = RigidBodyTree::new();
        let hinge = RevoluteJoint::new(Transform3D::identity("a", WORLD_FRAME), Vector3::y_axis())
            .with_limits(-1.0, 2.0);
        tree.add_body(RigidBody::new_sphere(1.0, 0.1, "a"), 0, Joint::RevoluteJoint(hinge))
            .unwrap();
        let free = RevoluteJoint::new(Transform3D::move_x("b", "a", 1.0), Vector3::y_axis());
        tree.add_body(RigidBody::new_sphere(1.0, 0.1, "b"), 1, Joint::RevoluteJoint(free))
            .unwrap();
        let mut slider = PrismaticJoint::new(Transform3D::identity("c", "b"), Vector3::x_axis());
        slider.joint_limit_max = 0.5;
        tree.add_body(RigidBody::new_sphere(1.0, 0.1, "c"), 2, Joint::PrismaticJoint(slider))
            .unwrap();
        tree
    }

    #[test]
    fn joint_limit_rows() {
        // Arrange
        let tree = limited_tree();
        let q: DVector<Float> = dvector![0.5, 3.0, 0.75];

        // Act
        let (phi, J) = tree.joint_limit_constraints(&q).unwrap();

        // Assert
        assert_eq!(tree.num_joint_limit_constraints(), 3);
        assert_vec_close!(phi, dvector![1.5, 1.5, -0.25], 1e-12);
        let expected = DMatrix::from_row_slice(3, 3, &[
            1., 0., 0., //
            -1., 0., 0., //
            0., 0., -1.,
        ]);
        assert_eq!(J, expected);
    }

    #[test]
    fn unlimited_tree_has_no_limit_constraints() {
        let tree = build_branching_tree().unwrap();

        let (phi, J) = tree.joint_limit_constraints(&tree.zero_configuration()).unwrap();

        assert_eq!(tree.num_joint_limit_constraints(), 0);
        assert_eq!(phi.len(), 0);
        assert_eq!(J.shape(), (0, tree.num_positions()));
    }

    /// Double pendulum whose tip is pinned to a point in the world, with the
    /// pin allowing rotation about y
    fn pinned_double_pendulum() -> RigidBodyTree {
        let mut tree = build_double_pendulum(1.0, 1.0).unwrap();
        let tip = tree
            .add_frame(RigidBodyFrame::new(2, Transform3D::move_z("tip", "rod2", -1.0)))
            .unwrap();
        let anchor = tree
            .add_frame(RigidBodyFrame::new(0, Transform3D::move_z("anchor", WORLD_FRAME, -2.0)))
            .unwrap();
        tree.add_loop(RigidBodyLoop::new(tip, anchor, vector![0., 1., 0.]))
            .unwrap();
        tree
    }

    #[test]
    fn closed_loop_has_zero_constraint() {
        let tree = pinned_double_pendulum();
        let cache = tree.kinematics(&dvector![0.0, 0.0]).unwrap();

        let phi = tree.position_constraints(&cache).unwrap();

        assert_eq!(tree.num_position_constraints(), 6);
        assert_vec_close!(phi, DVector::<Float>::zeros(6), 1e-12);
    }

    #[test]
    fn open_loop_reports_tip_offset() {
        // Arrange
        let tree = pinned_double_pendulum();
        let q1: Float = 0.3;
        let cache = tree.kinematics(&dvector![q1, 0.0]).unwrap();

        // Act
        let phi = tree.position_constraints(&cache).unwrap();

        // Assert
        // tip at 2 * (-sin q1, 0, -cos q1), anchor at (0, 0, -2)
        assert_close!(phi[0], -2.0 * q1.sin(), 1e-12);
        assert_close!(phi[1], 0.0, 1e-12);
        assert_close!(phi[2], 2.0 - 2.0 * q1.cos(), 1e-12);
        // rotations about y leave the y axis in place
        assert_vec_close!(phi.rows(3, 3), vector![0., 0., 0.], 1e-12);
    }

    #[test]
    fn position_constraints_jacobian_matches_finite_difference() {
        // Arrange
        let tree = pinned_double_pendulum();
        let q = dvector![0.3, -0.8];
        let cache = tree.kinematics(&q).unwrap();

        // Act
        let J = tree.position_constraints_jacobian(&cache, true).unwrap();

        // Assert
        let h = 1e-6;
        let phi = tree.position_constraints(&cache).unwrap();
        for j in 0..2 {
            let mut q_next = q.clone();
            q_next[j] += h;
            let cache_next = tree.kinematics(&q_next).unwrap();
            let numerical = (tree.position_constraints(&cache_next).unwrap() - &phi) / h;
            assert_vec_close!(J.column(j), numerical, 1e-5);
        }
    }

    #[test]
    fn loop_needs_existing_frames() {
        let mut tree = build_double_pendulum(1.0, 1.0).unwrap();

        let result = tree.add_loop(RigidBodyLoop::new(0, 5, Vector3::y()));

        assert_eq!(result, Err(KinematicsError::UnknownFrame(0)));
    }
}
