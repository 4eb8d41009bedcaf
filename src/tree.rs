use std::{collections::HashSet, sync::Mutex};

use na::{DVector, Vector3};
use rand::Rng;
use tracing::{debug, warn};

use crate::{
    constraints::RigidBodyLoop,
    error::{KinematicsError, KinematicsResult},
    joint::{Joint, JointModel},
    rigid_body::{BodyOrFrameId, RigidBody, RigidBodyFrame},
    spatial::transform::Transform3D,
    types::{Float, Real},
    GRAVITY,
};

/// An articulated tree of rigid bodies.
///
/// Bodies live in a flat arena and refer to their parent by index. Body 0 is
/// the world. A body can only be attached to a body that is already in the
/// tree, so parents always precede their children.
#[derive(Debug)]
pub struct RigidBodyTree {
    pub(crate) bodies: Vec<RigidBody>,
    pub(crate) frames: Vec<RigidBodyFrame>,
    pub(crate) loops: Vec<RigidBodyLoop>,
    num_positions: usize,
    num_velocities: usize,
    gravity: Vector3<Float>,
    pub(crate) next_element_id: usize,
    already_printed_warnings: Mutex<HashSet<String>>,
}

impl RigidBodyTree {
    pub fn new() -> Self {
        RigidBodyTree {
            bodies: vec![RigidBody::world()],
            frames: vec![],
            loops: vec![],
            num_positions: 0,
            num_velocities: 0,
            gravity: Vector3::new(0., 0., -GRAVITY),
            next_element_id: 0,
            already_printed_warnings: Mutex::new(HashSet::new()),
        }
    }

    /// Attach `body` to `parent` through `joint`, returning the body's index.
    ///
    /// The joint transform must go from the body's name to the parent's name,
    /// and the body's inertia must be expressed in the body frame.
    pub fn add_body(
        &mut self,
        mut body: RigidBody,
        parent: usize,
        joint: Joint,
    ) -> KinematicsResult<usize> {
        if parent >= self.bodies.len() {
            return Err(KinematicsError::InvalidParent {
                parent,
                num_bodies: self.bodies.len(),
            });
        }
        self.check_name_available(&body.name)?;
        if body.inertia.frame != body.name {
            return Err(KinematicsError::frame_mismatch(&body.name, &body.inertia.frame));
        }
        if joint.body_name() != body.name {
            return Err(KinematicsError::frame_mismatch(&body.name, joint.body_name()));
        }
        let parent_name = &self.bodies[parent].name;
        if joint.parent_name() != parent_name {
            return Err(KinematicsError::frame_mismatch(parent_name, joint.parent_name()));
        }

        body.parent = Some(parent);
        body.position_num_start = self.num_positions;
        body.velocity_num_start = self.num_velocities;
        self.num_positions += joint.num_positions();
        self.num_velocities += joint.num_velocities();
        body.joint = Some(joint);

        debug!(
            body = %body.name,
            parent = %self.bodies[parent].name,
            num_positions = self.num_positions,
            num_velocities = self.num_velocities,
            "Added body"
        );
        self.bodies.push(body);
        Ok(self.bodies.len() - 1)
    }

    /// Attach a named frame to an existing body, returning the frame's index
    pub fn add_frame(&mut self, frame: RigidBodyFrame) -> KinematicsResult<usize> {
        let body = self.body(frame.body)?;
        if frame.transform_to_body.to != body.name {
            return Err(KinematicsError::frame_mismatch(
                &body.name,
                &frame.transform_to_body.to,
            ));
        }
        if frame.transform_to_body.from != frame.name {
            return Err(KinematicsError::frame_mismatch(
                &frame.name,
                &frame.transform_to_body.from,
            ));
        }
        self.check_name_available(&frame.name)?;

        self.frames.push(frame);
        Ok(self.frames.len() - 1)
    }

    fn check_name_available(&self, name: &str) -> KinematicsResult<()> {
        let taken = self.bodies.iter().any(|b| b.name == name)
            || self.frames.iter().any(|f| f.name == name);
        if taken {
            return Err(KinematicsError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    pub fn find_body(&self, name: &str) -> KinematicsResult<usize> {
        self.bodies
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| KinematicsError::UnknownBodyName(name.to_string()))
    }

    pub fn find_frame(&self, name: &str) -> KinematicsResult<usize> {
        self.frames
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| KinematicsError::UnknownFrameName(name.to_string()))
    }

    pub fn body(&self, index: usize) -> KinematicsResult<&RigidBody> {
        self.bodies
            .get(index)
            .ok_or(KinematicsError::UnknownBody(index))
    }

    pub fn frame(&self, index: usize) -> KinematicsResult<&RigidBodyFrame> {
        self.frames
            .get(index)
            .ok_or(KinematicsError::UnknownFrame(index))
    }

    /// Bodies in index order, parents before children
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    pub fn frames(&self) -> &[RigidBodyFrame] {
        &self.frames
    }

    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn num_positions(&self) -> usize {
        self.num_positions
    }

    pub fn num_velocities(&self) -> usize {
        self.num_velocities
    }

    pub fn gravity(&self) -> &Vector3<Float> {
        &self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vector3<Float>) {
        self.gravity = gravity;
    }

    /// Total mass of all bodies
    pub fn total_mass(&self) -> Float {
        self.bodies.iter().map(|b| b.inertia.mass).sum()
    }

    /// Concatenation of every joint's zero configuration
    pub fn zero_configuration(&self) -> DVector<Float> {
        let mut q = DVector::zeros(self.num_positions);
        for (body, joint) in self.joints() {
            q.rows_mut(body.position_num_start, joint.num_positions())
                .copy_from(&joint.zero_configuration());
        }
        q
    }

    /// Concatenation of every joint's random configuration
    pub fn random_configuration<R: Rng>(&self, rng: &mut R) -> DVector<Float> {
        let mut q = DVector::zeros(self.num_positions);
        for (body, joint) in self.joints() {
            q.rows_mut(body.position_num_start, joint.num_positions())
                .copy_from(&joint.random_configuration(rng));
        }
        q
    }

    /// Every non-root body together with its joint
    pub fn joints(&self) -> impl Iterator<Item = (&RigidBody, &Joint)> {
        self.bodies
            .iter()
            .filter_map(|body| body.joint.as_ref().map(|joint| (body, joint)))
    }

    /// Name of the body or frame
    pub fn name_of(&self, id: BodyOrFrameId) -> KinematicsResult<&str> {
        match id {
            BodyOrFrameId::Body(index) => Ok(&self.body(index)?.name),
            BodyOrFrameId::Frame(index) => Ok(&self.frame(index)?.name),
        }
    }

    /// Resolve a body or frame into the index of the body it is attached to,
    /// and the transform from the frame to that body
    pub fn parse_body_or_frame_id<T: Real>(
        &self,
        id: BodyOrFrameId,
    ) -> KinematicsResult<(usize, Transform3D<T>)> {
        match id {
            BodyOrFrameId::Body(index) => {
                let body = self.body(index)?;
                Ok((index, Transform3D::identity(&body.name, &body.name)))
            }
            BodyOrFrameId::Frame(index) => {
                let frame = self.frame(index)?;
                Ok((frame.body, frame.transform_to_body.cast()))
            }
        }
    }

    /// Log `message` as a warning the first time `id` is seen by this tree
    pub fn warn_once(&self, id: &str, message: &str) {
        let mut printed = self
            .already_printed_warnings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if printed.insert(id.to_string()) {
            warn!("{}", message);
        }
    }
}

impl Default for RigidBodyTree {
    fn default() -> Self {
        Self::new()
    }
}
