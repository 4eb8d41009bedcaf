//! Per-body results of a forward kinematics pass, and the flags that record
//! which of them are currently valid.

use na::{DMatrix, DVector};

use crate::{
    error::{KinematicsError, KinematicsResult, Requirement},
    inertia::SpatialInertia,
    joint::JointModel,
    rigid_body::RigidBody,
    spatial::{
        geometric_jacobian::GeometricJacobian, spatial_acceleration::SpatialAcceleration,
        transform::Transform3D, twist::Twist,
    },
    types::{Float, Real},
    WORLD_FRAME,
};

/// Everything the forward kinematics pass and the inertia update compute for
/// one body. Quantities "in world" are expressed in the world frame, with
/// spatial vectors taken about the world origin.
#[derive(Debug, Clone)]
pub struct KinematicsCacheElement<T: Real = Float> {
    /// From the body frame to the world frame
    pub transform_to_world: Transform3D<T>,
    /// Joint motion subspace, body w.r.t. parent, in the body frame
    pub motion_subspace_in_body: GeometricJacobian<T>,
    /// Joint motion subspace, body w.r.t. parent, in the world frame
    pub motion_subspace_in_world: GeometricJacobian<T>,
    /// nv_joint x nq_joint
    pub qdot_to_v: DMatrix<T>,
    /// nq_joint x nv_joint
    pub v_to_qdot: DMatrix<T>,
    pub inertia_in_world: SpatialInertia<T>,
    /// Inertia of the subtree rooted at this body
    pub crb_in_world: SpatialInertia<T>,
    /// Body w.r.t. world
    pub twist_in_world: Twist<T>,
    /// Joint Sdot * v, body w.r.t. parent, in the body frame
    pub motion_subspace_in_body_dot_times_v: SpatialAcceleration<T>,
    /// Jdot * v of the body w.r.t. world, i.e. its acceleration at vd = 0
    pub motion_subspace_in_world_dot_times_v: SpatialAcceleration<T>,
}

impl<T: Real> KinematicsCacheElement<T> {
    pub fn new(body: &str, parent: &str, num_positions: usize, num_velocities: usize) -> Self {
        KinematicsCacheElement {
            transform_to_world: Transform3D::identity(body, WORLD_FRAME),
            motion_subspace_in_body: GeometricJacobian::zeros(body, parent, body, num_velocities),
            motion_subspace_in_world: GeometricJacobian::zeros(
                body,
                parent,
                WORLD_FRAME,
                num_velocities,
            ),
            qdot_to_v: DMatrix::zeros(num_velocities, num_positions),
            v_to_qdot: DMatrix::zeros(num_positions, num_velocities),
            inertia_in_world: SpatialInertia::zero(WORLD_FRAME),
            crb_in_world: SpatialInertia::zero(WORLD_FRAME),
            twist_in_world: Twist::zero(body, WORLD_FRAME, WORLD_FRAME),
            motion_subspace_in_body_dot_times_v: SpatialAcceleration::zero(body, parent, body),
            motion_subspace_in_world_dot_times_v: SpatialAcceleration::zero(
                body,
                WORLD_FRAME,
                WORLD_FRAME,
            ),
        }
    }
}

/// Holds q, v and the per-body kinematics of one tree.
///
/// Results only become valid through the `set_*` methods, and every
/// (re)initialization invalidates them.
#[derive(Debug, Clone)]
pub struct KinematicsCache<T: Real = Float> {
    elements: Vec<KinematicsCacheElement<T>>,
    q: DVector<T>,
    v: DVector<T>,
    configuration_valid: bool,
    velocity_vector_valid: bool,
    position_kinematics_cached: bool,
    jdotv_cached: bool,
    inertias_cached: bool,
}

impl<T: Real> KinematicsCache<T> {
    /// One element per body, in body order. `bodies` must be the bodies of a
    /// tree, so that every parent index is valid.
    pub fn new(bodies: &[RigidBody]) -> Self {
        let mut num_positions = 0;
        let mut num_velocities = 0;
        let elements = bodies
            .iter()
            .map(|body| {
                let parent = body
                    .parent
                    .and_then(|p| bodies.get(p))
                    .map_or(body.name.as_str(), |p| p.name.as_str());
                let (nq, nv) = body
                    .joint
                    .as_ref()
                    .map_or((0, 0), |j| (j.num_positions(), j.num_velocities()));
                num_positions += nq;
                num_velocities += nv;
                KinematicsCacheElement::new(&body.name, parent, nq, nv)
            })
            .collect();

        KinematicsCache {
            elements,
            q: DVector::zeros(num_positions),
            v: DVector::zeros(num_velocities),
            configuration_valid: false,
            velocity_vector_valid: false,
            position_kinematics_cached: false,
            jdotv_cached: false,
            inertias_cached: false,
        }
    }

    fn invalidate(&mut self) {
        self.position_kinematics_cached = false;
        self.jdotv_cached = false;
        self.inertias_cached = false;
    }

    /// Set q and drop any velocity. Clears all cached results.
    pub fn initialize(&mut self, q: &DVector<T>) -> KinematicsResult<()> {
        if q.len() != self.q.len() {
            return Err(KinematicsError::dimension("q", self.q.len(), q.len()));
        }
        self.invalidate();
        self.q.copy_from(q);
        self.configuration_valid = true;
        self.velocity_vector_valid = false;
        Ok(())
    }

    /// Set q and v. Clears all cached results.
    pub fn initialize_with_velocity(&mut self, q: &DVector<T>, v: &DVector<T>) -> KinematicsResult<()> {
        if q.len() != self.q.len() {
            return Err(KinematicsError::dimension("q", self.q.len(), q.len()));
        }
        if v.len() != self.v.len() {
            return Err(KinematicsError::dimension("v", self.v.len(), v.len()));
        }
        self.invalidate();
        self.q.copy_from(q);
        self.v.copy_from(v);
        self.configuration_valid = true;
        self.velocity_vector_valid = true;
        Ok(())
    }

    /// Fail unless the cached state that `method` depends on is valid
    pub fn check_cached_kinematics_settings(
        &self,
        velocity_kinematics_required: bool,
        jdot_times_v_required: bool,
        method: &'static str,
    ) -> KinematicsResult<()> {
        let missing = if !self.position_kinematics_cached {
            Some(Requirement::PositionKinematics)
        } else if velocity_kinematics_required && !self.velocity_vector_valid {
            Some(Requirement::VelocityKinematics)
        } else if jdot_times_v_required && !self.jdotv_cached {
            Some(Requirement::JdotV)
        } else {
            None
        };
        match missing {
            Some(requirement) => Err(KinematicsError::NotReady {
                method,
                requirement,
            }),
            None => Ok(()),
        }
    }

    pub fn element(&self, body: usize) -> KinematicsResult<&KinematicsCacheElement<T>> {
        self.elements
            .get(body)
            .ok_or(KinematicsError::UnknownBody(body))
    }

    pub fn element_mut(&mut self, body: usize) -> KinematicsResult<&mut KinematicsCacheElement<T>> {
        self.elements
            .get_mut(body)
            .ok_or(KinematicsError::UnknownBody(body))
    }

    pub fn elements(&self) -> &[KinematicsCacheElement<T>] {
        &self.elements
    }

    /// Elements alongside q and v, for passes that write elements while
    /// reading the state vectors
    pub(crate) fn split_mut(&mut self) -> (&mut [KinematicsCacheElement<T>], &DVector<T>, &DVector<T>) {
        (&mut self.elements, &self.q, &self.v)
    }

    pub fn num_bodies(&self) -> usize {
        self.elements.len()
    }

    pub fn num_positions(&self) -> usize {
        self.q.len()
    }

    pub fn num_velocities(&self) -> usize {
        self.v.len()
    }

    pub fn q(&self) -> &DVector<T> {
        &self.q
    }

    pub fn v(&self) -> KinematicsResult<&DVector<T>> {
        if !self.velocity_vector_valid {
            return Err(KinematicsError::NoVelocity);
        }
        Ok(&self.v)
    }

    pub fn has_v(&self) -> bool {
        self.velocity_vector_valid
    }

    pub fn is_configuration_valid(&self) -> bool {
        self.configuration_valid
    }

    pub fn is_position_kinematics_cached(&self) -> bool {
        self.position_kinematics_cached
    }

    pub fn is_jdotv_cached(&self) -> bool {
        self.jdotv_cached
    }

    pub fn are_inertias_cached(&self) -> bool {
        self.inertias_cached
    }

    pub fn set_position_kinematics_cached(&mut self) {
        self.position_kinematics_cached = true;
    }

    pub fn set_jdotv_cached(&mut self, jdotv_cached: bool) {
        self.jdotv_cached = jdotv_cached;
    }

    pub fn set_inertias_cached(&mut self) {
        self.inertias_cached = true;
    }
}
