//! Paths through the tree, and Jacobians assembled from the cached joint
//! motion subspaces along them.

use na::{DMatrix, DVector, Matrix3xX, Quaternion, UnitQuaternion, Vector3};

use crate::{
    error::{KinematicsError, KinematicsResult},
    joint::JointModel,
    kinematics::RotationType,
    kinematics_cache::KinematicsCache,
    rigid_body::BodyOrFrameId,
    spatial::{geometric_jacobian::GeometricJacobian, spatial_acceleration::SpatialAcceleration},
    tree::RigidBodyTree,
    types::Real,
    util::{
        angular_velocity_to_quaternion_dot_matrix, angular_velocity_to_rpy_dot_matrix,
        angular_velocity_to_rpy_dot_matrix_dot, colwise_cross,
    },
    WORLD_FRAME,
};

/// The route between two bodies through their lowest common ancestor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KinematicPath {
    /// start, ..., common ancestor, ..., end
    pub body_path: Vec<usize>,
    /// Each traversed joint, identified by its successor body
    pub joint_path: Vec<usize>,
    /// -1 for joints traversed towards the root (start side), +1 away from it
    pub joint_direction_signs: Vec<i8>,
}

impl RigidBodyTree {
    /// Parent chain of `body`, from its parent up to and including the root
    pub fn find_ancestor_bodies(&self, body: usize) -> KinematicsResult<Vec<usize>> {
        let mut ancestors = vec![];
        let mut current = self.body(body)?;
        while let Some(parent) = current.parent {
            ancestors.push(parent);
            current = self.body(parent)?;
        }
        Ok(ancestors)
    }

    pub fn find_kinematic_path(
        &self,
        start: impl Into<BodyOrFrameId>,
        end: impl Into<BodyOrFrameId>,
    ) -> KinematicsResult<KinematicPath> {
        let (start, _) = self.parse_body_or_frame_id::<f64>(start.into())?;
        let (end, _) = self.parse_body_or_frame_id::<f64>(end.into())?;

        let mut start_chain = vec![start];
        start_chain.extend(self.find_ancestor_bodies(start)?);
        let mut end_chain = vec![end];
        end_chain.extend(self.find_ancestor_bodies(end)?);

        // Both chains end at the root; strip the shared suffix down to the
        // lowest common ancestor.
        let mut shared = 0;
        while shared < start_chain.len().min(end_chain.len())
            && start_chain[start_chain.len() - 1 - shared] == end_chain[end_chain.len() - 1 - shared]
        {
            shared += 1;
        }
        let start_side = &start_chain[..start_chain.len() - shared];
        let end_side = &end_chain[..end_chain.len() - shared];
        let common_ancestor = start_chain[start_chain.len() - shared];

        let mut path = KinematicPath::default();
        path.body_path.extend_from_slice(start_side);
        path.body_path.push(common_ancestor);
        path.body_path.extend(end_side.iter().rev());

        path.joint_path.extend_from_slice(start_side);
        path.joint_direction_signs.extend(start_side.iter().map(|_| -1));
        path.joint_path.extend(end_side.iter().rev());
        path.joint_direction_signs.extend(end_side.iter().map(|_| 1));
        Ok(path)
    }

    /// Jacobian mapping v (or qdot, when `in_terms_of_qdot`) restricted to the
    /// joints between `base` and `end_effector` to the twist of the end
    /// effector w.r.t. the base, expressed in `expressed_in`.
    ///
    /// Also returns, for each column, the index into v (or q) it belongs to.
    pub fn geometric_jacobian<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        base: impl Into<BodyOrFrameId>,
        end_effector: impl Into<BodyOrFrameId>,
        expressed_in: impl Into<BodyOrFrameId>,
        in_terms_of_qdot: bool,
    ) -> KinematicsResult<(GeometricJacobian<T>, Vec<usize>)> {
        self.check_cache(cache, false, false, "geometric_jacobian")?;
        let (base, end_effector) = (base.into(), end_effector.into());
        let path = self.find_kinematic_path(base, end_effector)?;

        let mut blocks = vec![];
        let mut indices = vec![];
        for (&joint_body, &sign) in path.joint_path.iter().zip(path.joint_direction_signs.iter()) {
            let body = self.body(joint_body)?;
            let element = cache.element(joint_body)?;
            let mut block = element.motion_subspace_in_world.clone();
            if in_terms_of_qdot {
                block = block.mul_matrix(&element.qdot_to_v);
            }
            let start = if in_terms_of_qdot {
                body.position_num_start
            } else {
                body.velocity_num_start
            };
            indices.extend(start..start + block.dim());
            let sign: T = if sign < 0 { -T::one() } else { T::one() };
            blocks.push((block, sign));
        }

        let mut angular = Matrix3xX::zeros(indices.len());
        let mut linear = Matrix3xX::zeros(indices.len());
        let mut col = 0;
        for (block, sign) in blocks {
            let n = block.dim();
            angular.columns_mut(col, n).copy_from(&(block.angular * sign));
            linear.columns_mut(col, n).copy_from(&(block.linear * sign));
            col += n;
        }

        let jacobian_in_world = GeometricJacobian::new(
            self.name_of(end_effector)?,
            self.name_of(base)?,
            WORLD_FRAME,
            angular,
            linear,
        );
        let world_to_expressed =
            self.relative_transform(cache, expressed_in, BodyOrFrameId::Body(0))?;
        Ok((jacobian_in_world.transform(&world_to_expressed), indices))
    }

    /// Scatter the columns of a Jacobian over `joint_path` into a matrix with
    /// one column per v (or q) entry, zero elsewhere
    pub fn compact_to_full<T: Real>(
        &self,
        compact: &DMatrix<T>,
        joint_path: &[usize],
        in_terms_of_qdot: bool,
    ) -> KinematicsResult<DMatrix<T>> {
        let ncols = if in_terms_of_qdot {
            self.num_positions()
        } else {
            self.num_velocities()
        };
        let mut full = DMatrix::zeros(compact.nrows(), ncols);

        let mut compact_col = 0;
        for &joint_body in joint_path {
            let body = self.body(joint_body)?;
            let Some(joint) = body.joint.as_ref() else {
                continue;
            };
            let (start, n) = if in_terms_of_qdot {
                (body.position_num_start, joint.num_positions())
            } else {
                (body.velocity_num_start, joint.num_velocities())
            };
            if compact_col + n > compact.ncols() {
                return Err(KinematicsError::dimension(
                    "compact jacobian columns",
                    compact_col + n,
                    compact.ncols(),
                ));
            }
            full.columns_mut(start, n)
                .copy_from(&compact.columns(compact_col, n));
            compact_col += n;
        }
        if compact_col != compact.ncols() {
            return Err(KinematicsError::dimension(
                "compact jacobian columns",
                compact_col,
                compact.ncols(),
            ));
        }
        Ok(full)
    }

    /// Jdot * v of the end effector w.r.t. the base, expressed in `expressed_in`
    pub fn geometric_jacobian_dot_times_v<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        base: impl Into<BodyOrFrameId>,
        end_effector: impl Into<BodyOrFrameId>,
        expressed_in: impl Into<BodyOrFrameId>,
    ) -> KinematicsResult<SpatialAcceleration<T>> {
        self.check_cache(cache, true, true, "geometric_jacobian_dot_times_v")?;
        let (base, end_effector) = (base.into(), end_effector.into());
        let (base_body, _) = self.parse_body_or_frame_id::<T>(base)?;
        let (end_effector_body, _) = self.parse_body_or_frame_id::<T>(end_effector)?;

        let base_jdotv = &cache.element(base_body)?.motion_subspace_in_world_dot_times_v;
        let end_effector_jdotv = &cache
            .element(end_effector_body)?
            .motion_subspace_in_world_dot_times_v;
        let in_world = SpatialAcceleration::new(
            self.name_of(end_effector)?,
            self.name_of(base)?,
            WORLD_FRAME,
            end_effector_jdotv.angular - base_jdotv.angular,
            end_effector_jdotv.linear - base_jdotv.linear,
        );

        self.transform_spatial_acceleration(
            cache,
            &in_world,
            base,
            end_effector,
            BodyOrFrameId::Body(0),
            expressed_in,
        )
    }

    /// Jacobian of `forward_kin` with respect to v (or q, when
    /// `in_terms_of_qdot`). Each point contributes 3 position rows followed
    /// by the orientation rows of `rotation_type`, so the rows line up with
    /// the columns of `forward_kin` stacked on top of each other.
    pub fn forward_kin_jacobian<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        points: &Matrix3xX<T>,
        current: impl Into<BodyOrFrameId>,
        new: impl Into<BodyOrFrameId>,
        rotation_type: RotationType,
        in_terms_of_qdot: bool,
    ) -> KinematicsResult<DMatrix<T>> {
        self.check_cache(cache, false, false, "forward_kin_jacobian")?;
        let (current, new) = (current.into(), new.into());
        let (J, indices) = self.geometric_jacobian(cache, new, current, new, in_terms_of_qdot)?;
        let current_to_new = self.relative_transform(cache, new, current)?;
        let rotation_block =
            rotation_rate_matrix(&current_to_new.iso.rotation, rotation_type) * &J.angular;

        let ncols = if in_terms_of_qdot {
            self.num_positions()
        } else {
            self.num_velocities()
        };
        let num_rotation_rows = rotation_type.num_rows();
        let rows_per_point = 3 + num_rotation_rows;
        let mut result = DMatrix::zeros(rows_per_point * points.ncols(), ncols);
        for (i, point) in points.column_iter().enumerate() {
            let p = current_to_new.transform_point(&point.into_owned());
            // v_point = v + ω x p
            let position_block = &J.linear - colwise_cross(&p, &J.angular);
            let row = rows_per_point * i;
            for (compact_col, &full_col) in indices.iter().enumerate() {
                result
                    .view_mut((row, full_col), (3, 1))
                    .copy_from(&position_block.column(compact_col));
                if num_rotation_rows > 0 {
                    result
                        .view_mut((row + 3, full_col), (num_rotation_rows, 1))
                        .copy_from(&rotation_block.column(compact_col));
                }
            }
        }
        Ok(result)
    }

    /// d/dt(forward_kin_jacobian) * v for points fixed in `body`, expressed
    /// in `base`. Same row layout as `forward_kin_jacobian`.
    pub fn forward_jac_dot_times_v<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        points: &Matrix3xX<T>,
        body: impl Into<BodyOrFrameId>,
        base: impl Into<BodyOrFrameId>,
        rotation_type: RotationType,
    ) -> KinematicsResult<DVector<T>> {
        self.check_cache(cache, true, true, "forward_jac_dot_times_v")?;
        let (body, base) = (body.into(), base.into());
        let body_to_base = self.relative_transform(cache, base, body)?;
        let twist = self.relative_twist(cache, base, body, base)?;
        let jdotv = self.geometric_jacobian_dot_times_v(cache, base, body, base)?;
        let (omega, omegadot) = (twist.angular, jdotv.angular);

        let rotation = &body_to_base.iso.rotation;
        let rotation_rows = rotation_rate_matrix(rotation, rotation_type) * omegadot
            + rotation_rate_matrix_dot(rotation, &omega, rotation_type) * omega;

        let num_rotation_rows = rotation_type.num_rows();
        let rows_per_point = 3 + num_rotation_rows;
        let mut result = DVector::zeros(rows_per_point * points.ncols());
        for (i, point) in points.column_iter().enumerate() {
            let p = body_to_base.transform_point(&point.into_owned());
            let p_dot = twist.linear + omega.cross(&p);
            let p_ddot = jdotv.linear + omegadot.cross(&p) + omega.cross(&p_dot);
            let row = rows_per_point * i;
            result.rows_mut(row, 3).copy_from(&p_ddot);
            if num_rotation_rows > 0 {
                result
                    .rows_mut(row + 3, num_rotation_rows)
                    .copy_from(&rotation_rows);
            }
        }
        Ok(result)
    }

    /// qdot = v_to_qdot * v, block by block
    pub fn transform_velocity_to_qdot<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        v: &DVector<T>,
    ) -> KinematicsResult<DVector<T>> {
        self.check_cache(cache, false, false, "transform_velocity_to_qdot")?;
        if v.len() != self.num_velocities() {
            return Err(KinematicsError::dimension("v", self.num_velocities(), v.len()));
        }
        let mut qdot = DVector::zeros(self.num_positions());
        for (i, body) in self.bodies.iter().enumerate() {
            let Some(joint) = body.joint.as_ref() else {
                continue;
            };
            let element = cache.element(i)?;
            qdot.rows_mut(body.position_num_start, joint.num_positions())
                .copy_from(&(&element.v_to_qdot * v.rows(body.velocity_num_start, joint.num_velocities())));
        }
        Ok(qdot)
    }

    /// v = qdot_to_v * qdot, block by block
    pub fn transform_qdot_to_velocity<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        qdot: &DVector<T>,
    ) -> KinematicsResult<DVector<T>> {
        self.check_cache(cache, false, false, "transform_qdot_to_velocity")?;
        if qdot.len() != self.num_positions() {
            return Err(KinematicsError::dimension("qdot", self.num_positions(), qdot.len()));
        }
        let mut v = DVector::zeros(self.num_velocities());
        for (i, body) in self.bodies.iter().enumerate() {
            let Some(joint) = body.joint.as_ref() else {
                continue;
            };
            let element = cache.element(i)?;
            v.rows_mut(body.velocity_num_start, joint.num_velocities())
                .copy_from(&(&element.qdot_to_v * qdot.rows(body.position_num_start, joint.num_positions())));
        }
        Ok(v)
    }

    /// Turn a matrix acting on qdot into one acting on v: mat * v_to_qdot
    pub fn transform_position_dot_mapping_to_velocity_mapping<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        mat: &DMatrix<T>,
    ) -> KinematicsResult<DMatrix<T>> {
        self.check_cache(
            cache,
            false,
            false,
            "transform_position_dot_mapping_to_velocity_mapping",
        )?;
        if mat.ncols() != self.num_positions() {
            return Err(KinematicsError::dimension(
                "mapping columns",
                self.num_positions(),
                mat.ncols(),
            ));
        }
        let mut result = DMatrix::zeros(mat.nrows(), self.num_velocities());
        for (i, body) in self.bodies.iter().enumerate() {
            let Some(joint) = body.joint.as_ref() else {
                continue;
            };
            let element = cache.element(i)?;
            result
                .columns_mut(body.velocity_num_start, joint.num_velocities())
                .copy_from(&(mat.columns(body.position_num_start, joint.num_positions()) * &element.v_to_qdot));
        }
        Ok(result)
    }

    /// Turn a matrix acting on v into one acting on qdot: mat * qdot_to_v
    pub fn transform_velocity_mapping_to_position_dot_mapping<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        mat: &DMatrix<T>,
    ) -> KinematicsResult<DMatrix<T>> {
        self.check_cache(
            cache,
            false,
            false,
            "transform_velocity_mapping_to_position_dot_mapping",
        )?;
        if mat.ncols() != self.num_velocities() {
            return Err(KinematicsError::dimension(
                "mapping columns",
                self.num_velocities(),
                mat.ncols(),
            ));
        }
        let mut result = DMatrix::zeros(mat.nrows(), self.num_positions());
        for (i, body) in self.bodies.iter().enumerate() {
            let Some(joint) = body.joint.as_ref() else {
                continue;
            };
            let element = cache.element(i)?;
            result
                .columns_mut(body.position_num_start, joint.num_positions())
                .copy_from(&(mat.columns(body.velocity_num_start, joint.num_velocities()) * &element.qdot_to_v));
        }
        Ok(result)
    }
}

/// E such that d/dt(orientation) = E * ω, for ω expressed in the frame the
/// rotation maps into
fn rotation_rate_matrix<T: Real>(
    rotation: &UnitQuaternion<T>,
    rotation_type: RotationType,
) -> DMatrix<T> {
    match rotation_type {
        RotationType::None => DMatrix::zeros(0, 3),
        RotationType::RollPitchYaw => {
            let (roll, pitch, yaw) = rotation.euler_angles();
            let rpy = Vector3::new(roll, pitch, yaw);
            DMatrix::from_column_slice(3, 3, angular_velocity_to_rpy_dot_matrix(&rpy).as_slice())
        }
        RotationType::Quaternion => DMatrix::from_column_slice(
            4,
            3,
            angular_velocity_to_quaternion_dot_matrix(rotation.quaternion()).as_slice(),
        ),
    }
}

/// d/dt(E) along a rotation moving with angular velocity ω
fn rotation_rate_matrix_dot<T: Real>(
    rotation: &UnitQuaternion<T>,
    omega: &Vector3<T>,
    rotation_type: RotationType,
) -> DMatrix<T> {
    match rotation_type {
        RotationType::None => DMatrix::zeros(0, 3),
        RotationType::RollPitchYaw => {
            let (roll, pitch, yaw) = rotation.euler_angles();
            let rpy = Vector3::new(roll, pitch, yaw);
            let rpy_dot = angular_velocity_to_rpy_dot_matrix(&rpy) * omega;
            let dot = angular_velocity_to_rpy_dot_matrix_dot(&rpy, &rpy_dot);
            DMatrix::from_column_slice(3, 3, dot.as_slice())
        }
        RotationType::Quaternion => {
            let quaternion_dot =
                angular_velocity_to_quaternion_dot_matrix(rotation.quaternion()) * omega;
            let quaternion_dot = Quaternion::new(
                quaternion_dot[0],
                quaternion_dot[1],
                quaternion_dot[2],
                quaternion_dot[3],
            );
            DMatrix::from_column_slice(
                4,
                3,
                angular_velocity_to_quaternion_dot_matrix(&quaternion_dot).as_slice(),
            )
        }
    }
}
