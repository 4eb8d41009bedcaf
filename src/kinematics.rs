//! The forward kinematics pass and the queries that read its results.

use na::{DMatrix, DVector, Matrix3xX};
use tracing::debug;

use crate::{
    error::{KinematicsError, KinematicsResult, Requirement},
    joint::JointModel,
    kinematics_cache::KinematicsCache,
    rigid_body::BodyOrFrameId,
    spatial::{
        spatial_acceleration::SpatialAcceleration, transform::Transform3D, twist::Twist,
    },
    tree::RigidBodyTree,
    types::Real,
    WORLD_FRAME,
};

/// How forward_kin reports orientation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationType {
    None,
    /// roll, pitch, yaw
    RollPitchYaw,
    /// w, x, y, z
    Quaternion,
}

impl RotationType {
    pub fn num_rows(&self) -> usize {
        match self {
            RotationType::None => 0,
            RotationType::RollPitchYaw => 3,
            RotationType::Quaternion => 4,
        }
    }
}

impl RigidBodyTree {
    /// A cache sized for this tree, not yet initialized
    pub fn create_kinematics_cache<T: Real>(&self) -> KinematicsCache<T> {
        KinematicsCache::new(&self.bodies)
    }

    /// Forward kinematics pass.
    ///
    /// Walks the bodies in order, so each parent is done before its children,
    /// and fills in transforms, motion subspaces and velocity maps. When the
    /// cache holds a velocity vector, twists are computed too, and when
    /// `compute_jdotv` is also set, so are the bias accelerations Jdot * v.
    pub fn do_kinematics<T: Real>(
        &self,
        cache: &mut KinematicsCache<T>,
        compute_jdotv: bool,
    ) -> KinematicsResult<()> {
        self.check_cache_matches(cache)?;
        if !cache.is_configuration_valid() {
            return Err(KinematicsError::NotReady {
                method: "do_kinematics",
                requirement: Requirement::Configuration,
            });
        }

        let has_v = cache.has_v();
        let compute_jdotv = compute_jdotv && has_v;
        cache.set_position_kinematics_cached();

        let (elements, q, v) = cache.split_mut();
        for (i, body) in self.bodies.iter().enumerate() {
            let (done, rest) = elements.split_at_mut(i);
            let element = &mut rest[0];

            let (Some(parent), Some(joint)) = (body.parent, body.joint.as_ref()) else {
                element.transform_to_world = Transform3D::identity(&body.name, WORLD_FRAME);
                if has_v {
                    element.twist_in_world = Twist::zero(&body.name, WORLD_FRAME, WORLD_FRAME);
                    element.motion_subspace_in_world_dot_times_v =
                        SpatialAcceleration::zero(&body.name, WORLD_FRAME, WORLD_FRAME);
                }
                continue;
            };
            let parent_element = &done[parent];

            let q_joint = &q.as_slice()
                [body.position_num_start..body.position_num_start + joint.num_positions()];
            if let Some(message) = joint.configuration_warning(q_joint) {
                self.warn_once(&format!("configuration of {}", body.name), message);
            }

            let body_to_parent = joint.transform(q_joint);
            element.transform_to_world = &parent_element.transform_to_world * &body_to_parent;
            element.motion_subspace_in_body = joint.motion_subspace(q_joint);
            element.motion_subspace_in_world = element
                .motion_subspace_in_body
                .transform(&element.transform_to_world);
            element.qdot_to_v = joint.qdot_to_v(q_joint);
            element.v_to_qdot = joint.v_to_qdot(q_joint);

            if !has_v {
                continue;
            }
            let v_joint = v.rows(body.velocity_num_start, joint.num_velocities()).into_owned();
            let joint_twist = element.motion_subspace_in_world.twist(&v_joint);
            element.twist_in_world = &parent_element.twist_in_world + &joint_twist;

            if compute_jdotv {
                element.motion_subspace_in_body_dot_times_v =
                    joint.motion_subspace_dot_times_v(q_joint, v_joint.as_slice());
                let coupling = element.twist_in_world.cross(&joint_twist);
                let joint_bias = &coupling
                    + &element
                        .motion_subspace_in_body_dot_times_v
                        .transform(&element.transform_to_world);
                element.motion_subspace_in_world_dot_times_v =
                    &parent_element.motion_subspace_in_world_dot_times_v + &joint_bias;
            }
        }

        cache.set_jdotv_cached(compute_jdotv);
        debug!(
            bodies = self.num_bodies(),
            velocity = has_v,
            jdotv = compute_jdotv,
            "Forward kinematics done"
        );
        Ok(())
    }

    /// Fail unless `cache` was created for this tree: same bodies, same
    /// coordinate counts, and each element sized for its body's joint
    pub(crate) fn check_cache_matches<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
    ) -> KinematicsResult<()> {
        let mismatch = |what, in_cache, in_tree| KinematicsError::CacheTreeMismatch {
            what,
            cache: in_cache,
            tree: in_tree,
        };
        if cache.num_bodies() != self.num_bodies() {
            return Err(mismatch("number of bodies", cache.num_bodies(), self.num_bodies()));
        }
        if cache.num_positions() != self.num_positions() {
            return Err(mismatch(
                "number of positions",
                cache.num_positions(),
                self.num_positions(),
            ));
        }
        if cache.num_velocities() != self.num_velocities() {
            return Err(mismatch(
                "number of velocities",
                cache.num_velocities(),
                self.num_velocities(),
            ));
        }
        for (body, element) in self.bodies.iter().zip(cache.elements()) {
            let (nq, nv) = body
                .joint
                .as_ref()
                .map_or((0, 0), |joint| (joint.num_positions(), joint.num_velocities()));
            let (element_nv, element_nq) = element.qdot_to_v.shape();
            if element_nq != nq {
                return Err(mismatch("joint positions", element_nq, nq));
            }
            if element_nv != nv {
                return Err(mismatch("joint velocities", element_nv, nv));
            }
        }
        Ok(())
    }

    /// `check_cached_kinematics_settings`, after making sure the cache
    /// belongs to this tree
    pub(crate) fn check_cache<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        velocity_kinematics_required: bool,
        jdot_times_v_required: bool,
        method: &'static str,
    ) -> KinematicsResult<()> {
        self.check_cache_matches(cache)?;
        cache.check_cached_kinematics_settings(
            velocity_kinematics_required,
            jdot_times_v_required,
            method,
        )
    }

    /// Fresh cache with position kinematics at q
    pub fn kinematics<T: Real>(&self, q: &DVector<T>) -> KinematicsResult<KinematicsCache<T>> {
        let mut cache = self.create_kinematics_cache();
        cache.initialize(q)?;
        self.do_kinematics(&mut cache, false)?;
        Ok(cache)
    }

    /// Fresh cache with position and velocity kinematics at (q, v)
    pub fn kinematics_with_velocity<T: Real>(
        &self,
        q: &DVector<T>,
        v: &DVector<T>,
        compute_jdotv: bool,
    ) -> KinematicsResult<KinematicsCache<T>> {
        let mut cache = self.create_kinematics_cache();
        cache.initialize_with_velocity(q, v)?;
        self.do_kinematics(&mut cache, compute_jdotv)?;
        Ok(cache)
    }

    /// Body index of `id` and the transform from its frame to the world
    pub(crate) fn frame_to_world<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        id: BodyOrFrameId,
    ) -> KinematicsResult<(usize, Transform3D<T>)> {
        let (body, frame_to_body) = self.parse_body_or_frame_id::<T>(id)?;
        let body_to_world = &cache.element(body)?.transform_to_world;
        Ok((body, body_to_world * &frame_to_body))
    }

    /// Transform from `body` to `base`
    pub fn relative_transform<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        base: impl Into<BodyOrFrameId>,
        body: impl Into<BodyOrFrameId>,
    ) -> KinematicsResult<Transform3D<T>> {
        self.check_cache(cache, false, false, "relative_transform")?;
        let (_, base_to_world) = self.frame_to_world(cache, base.into())?;
        let (_, body_to_world) = self.frame_to_world(cache, body.into())?;
        Ok(&base_to_world.inv() * &body_to_world)
    }

    /// Twist of `body` w.r.t. `base`, expressed in `expressed_in`
    pub fn relative_twist<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        base: impl Into<BodyOrFrameId>,
        body: impl Into<BodyOrFrameId>,
        expressed_in: impl Into<BodyOrFrameId>,
    ) -> KinematicsResult<Twist<T>> {
        self.check_cache(cache, true, false, "relative_twist")?;
        let (base, body) = (base.into(), body.into());
        let (base_body, _) = self.parse_body_or_frame_id::<T>(base)?;
        let (body_body, _) = self.parse_body_or_frame_id::<T>(body)?;

        let base_twist = &cache.element(base_body)?.twist_in_world;
        let body_twist = &cache.element(body_body)?.twist_in_world;
        let twist_in_world = Twist::new(
            self.name_of(body)?,
            self.name_of(base)?,
            WORLD_FRAME,
            body_twist.angular - base_twist.angular,
            body_twist.linear - base_twist.linear,
        );

        let world_to_expressed =
            self.relative_transform(cache, expressed_in, BodyOrFrameId::Body(0))?;
        Ok(twist_in_world.transform(&world_to_expressed))
    }

    /// Re-express a spatial acceleration of `body` w.r.t. `base` from frame
    /// `old` into frame `new`, accounting for the motion of `old` relative to
    /// `new`.
    pub fn transform_spatial_acceleration<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        spatial_acceleration: &SpatialAcceleration<T>,
        base: impl Into<BodyOrFrameId>,
        body: impl Into<BodyOrFrameId>,
        old: impl Into<BodyOrFrameId>,
        new: impl Into<BodyOrFrameId>,
    ) -> KinematicsResult<SpatialAcceleration<T>> {
        self.check_cache(cache, true, false, "transform_spatial_acceleration")?;
        let (base, body, old, new) = (base.into(), body.into(), old.into(), new.into());
        let old_name = self.name_of(old)?;
        if spatial_acceleration.frame != old_name {
            return Err(KinematicsError::frame_mismatch(
                old_name,
                &spatial_acceleration.frame,
            ));
        }
        if old == new {
            return Ok(spatial_acceleration.clone());
        }

        let twist_of_body_wrt_base = self.relative_twist(cache, base, body, old)?;
        let twist_of_old_wrt_new = self.relative_twist(cache, new, old, old)?;
        let correction = twist_of_old_wrt_new.cross(&twist_of_body_wrt_base);
        let corrected = SpatialAcceleration::new(
            &spatial_acceleration.body,
            &spatial_acceleration.base,
            old_name,
            spatial_acceleration.angular + correction.angular,
            spatial_acceleration.linear + correction.linear,
        );

        let old_to_new = self.relative_transform(cache, new, old)?;
        Ok(corrected.transform(&old_to_new))
    }

    /// Transform points given in frame `current` into frame `new`, stacking
    /// the orientation of `current` in `new` underneath each point.
    ///
    /// Returns a (3 + rotation rows) x num_points matrix.
    pub fn forward_kin<T: Real>(
        &self,
        cache: &KinematicsCache<T>,
        points: &Matrix3xX<T>,
        current: impl Into<BodyOrFrameId>,
        new: impl Into<BodyOrFrameId>,
        rotation_type: RotationType,
    ) -> KinematicsResult<DMatrix<T>> {
        self.check_cache(cache, false, false, "forward_kin")?;
        let current_to_new = self.relative_transform(cache, new, current)?;

        let rotation = &current_to_new.iso.rotation;
        let orientation: Vec<T> = match rotation_type {
            RotationType::None => vec![],
            RotationType::RollPitchYaw => {
                let (roll, pitch, yaw) = rotation.euler_angles();
                vec![roll, pitch, yaw]
            }
            RotationType::Quaternion => vec![rotation.w, rotation.i, rotation.j, rotation.k],
        };

        let mut result = DMatrix::zeros(3 + rotation_type.num_rows(), points.ncols());
        for (i, point) in points.column_iter().enumerate() {
            let transformed = current_to_new.transform_point(&point.into_owned());
            result.view_mut((0, i), (3, 1)).copy_from(&transformed);
            for (r, value) in orientation.iter().enumerate() {
                result[(3 + r, i)] = *value;
            }
        }
        Ok(result)
    }
}
