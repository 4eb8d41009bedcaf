use na::{vector, Matrix3, Vector3};

use crate::{
    collision::CollisionElement,
    contact::ContactPoint,
    error::{KinematicsError, KinematicsResult},
    inertia::SpatialInertia,
    joint::Joint,
    spatial::transform::Transform3D,
    types::Float,
    WORLD_FRAME,
};

/// A rigid body of a tree. Its index in the tree is its identity.
///
/// `parent`, `joint` and the coordinate offsets are filled in when the body is
/// added to a `RigidBodyTree`; the root (world) body has neither parent nor joint.
#[derive(Clone, Debug)]
pub struct RigidBody {
    pub name: String,
    pub inertia: SpatialInertia, // expressed in the body frame
    pub parent: Option<usize>,
    pub joint: Option<Joint>,
    pub position_num_start: usize,
    pub velocity_num_start: usize,
    pub collision_elements: Vec<CollisionElement>,
    pub contact_points: Vec<ContactPoint>,
}

impl RigidBody {
    pub fn new(name: &str, inertia: SpatialInertia) -> Self {
        RigidBody {
            name: name.to_string(),
            inertia,
            parent: None,
            joint: None,
            position_num_start: 0,
            velocity_num_start: 0,
            collision_elements: vec![],
            contact_points: vec![],
        }
    }

    /// The massless root body
    pub fn world() -> Self {
        RigidBody::new(WORLD_FRAME, SpatialInertia::zero(WORLD_FRAME))
    }

    /// A point mass located at `com` in the body frame
    pub fn new_point_mass(m: Float, com: &Vector3<Float>, name: &str) -> RigidBody {
        let moment = (Matrix3::identity() * com.norm_squared() - com * com.transpose()) * m;
        RigidBody::new(name, SpatialInertia::new(moment, com * m, m, name))
    }

    pub fn new_sphere(m: Float, r: Float, name: &str) -> RigidBody {
        let moment_x = 2.0 / 5.0 * m * r * r;
        let moment = Matrix3::from_diagonal(&vector![moment_x, moment_x, moment_x]);
        RigidBody::new(name, SpatialInertia::new(moment, Vector3::zeros(), m, name))
    }

    pub fn new_cube(m: Float, l: Float, name: &str) -> RigidBody {
        let moment_x = m * l * l / 6.0;
        let moment = Matrix3::from_diagonal(&vector![moment_x, moment_x, moment_x]);
        RigidBody::new(name, SpatialInertia::new(moment, Vector3::zeros(), m, name))
    }

    pub fn new_cuboid(m: Float, w: Float, d: Float, h: Float, name: &str) -> RigidBody {
        let moment_x = m * (d * d + h * h) / 12.0;
        let moment_y = m * (w * w + h * h) / 12.0;
        let moment_z = m * (w * w + d * d) / 12.0;
        let moment = Matrix3::from_diagonal(&vector![moment_x, moment_y, moment_z]);
        RigidBody::new(name, SpatialInertia::new(moment, Vector3::zeros(), m, name))
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn add_contact_point(&mut self, contact_point: ContactPoint) -> KinematicsResult<()> {
        if contact_point.frame != self.name {
            return Err(KinematicsError::frame_mismatch(&self.name, contact_point.frame));
        }
        self.contact_points.push(contact_point);
        Ok(())
    }

    /// Add contact points on the 8 corners of a cuboid
    pub fn add_cuboid_contacts(&mut self, w: Float, d: Float, h: Float) {
        for sz in [1.0, -1.0] {
            for sy in [1.0, -1.0] {
                for sx in [-1.0, 1.0] {
                    let corner = vector![sx * w / 2.0, sy * d / 2.0, sz * h / 2.0];
                    self.contact_points
                        .push(ContactPoint::new(&self.name, corner));
                }
            }
        }
    }
}

/// A named frame rigidly attached to a body.
#[derive(Clone, Debug)]
pub struct RigidBodyFrame {
    pub name: String,
    pub body: usize,
    pub transform_to_body: Transform3D, // from this frame to the body frame
}

impl RigidBodyFrame {
    pub fn new(body: usize, transform_to_body: Transform3D) -> Self {
        RigidBodyFrame {
            name: transform_to_body.from.clone(),
            body,
            transform_to_body,
        }
    }
}

/// Addresses either a body or a frame of a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyOrFrameId {
    Body(usize),
    Frame(usize),
}

impl From<usize> for BodyOrFrameId {
    fn from(body: usize) -> Self {
        BodyOrFrameId::Body(body)
    }
}

#[cfg(test)]
mod tests {
    use crate::{assert_close, assert_vec_close};

    use super::*;

    #[test]
    fn point_mass_inertia() {
        let body = RigidBody::new_point_mass(2.0, &vector![0., 0., -3.], "b");

        assert_close!(body.inertia.moment[(0, 0)], 18.0, 1e-12);
        assert_close!(body.inertia.moment[(2, 2)], 0.0, 1e-12);
        assert_vec_close!(body.inertia.cross_part, vector![0., 0., -6.], 1e-12);
        assert_eq!(body.inertia.frame, "b");
    }

    #[test]
    fn frame_takes_name_from_transform() {
        let frame = RigidBodyFrame::new(1, Transform3D::move_x("tip", "b", 1.0));
        assert_eq!(frame.name, "tip");
        assert_eq!(BodyOrFrameId::from(3usize), BodyOrFrameId::Body(3));
    }
}
