use na::{vector, Isometry3, Matrix3, UnitVector3, Vector3};

use crate::{
    error::KinematicsResult,
    inertia::SpatialInertia,
    joint::{fixed::FixedJoint, floating::FloatingJoint, revolute::RevoluteJoint, Joint},
    rigid_body::RigidBody,
    spatial::transform::Transform3D,
    tree::RigidBodyTree,
    types::Float,
    WORLD_FRAME,
};

/// Build a single-body pendulum hanging from the world by a revolute joint
pub fn build_pendulum(
    mass: Float,
    moment: &Matrix3<Float>,
    cross_part: &Vector3<Float>,
    rod_to_world: &Isometry3<Float>,
    axis: &UnitVector3<Float>,
) -> KinematicsResult<RigidBodyTree> {
    let rod_frame = "rod";
    let rod = RigidBody::new(
        rod_frame,
        SpatialInertia::new(*moment, *cross_part, mass, rod_frame),
    );
    let joint = RevoluteJoint::new(
        Transform3D::new(rod_frame, WORLD_FRAME, *rod_to_world),
        *axis,
    );

    let mut tree = RigidBodyTree::new();
    tree.add_body(rod, 0, Joint::RevoluteJoint(joint))?;
    Ok(tree)
}

/// Uniform rod of length l hanging from the world at one end, swinging about y
pub fn build_rod_pendulum(m: Float, l: Float) -> KinematicsResult<RigidBodyTree> {
    let moment_x = m * l * l / 3.0;
    let moment = Matrix3::from_diagonal(&vector![moment_x, moment_x, 0.]);
    let cross_part = vector![0., 0., -m * l / 2.0];
    build_pendulum(
        m,
        &moment,
        &cross_part,
        &Isometry3::identity(),
        &Vector3::y_axis(),
    )
}

/// Two point masses m, each at the end of a massless rod of length l.
/// Both joints rotate about y; "rod1" hangs from the world origin and "rod2"
/// from the mass of "rod1". q = 0 is hanging straight down.
pub fn build_double_pendulum(m: Float, l: Float) -> KinematicsResult<RigidBodyTree> {
    let mut tree = RigidBodyTree::new();
    let com = vector![0., 0., -l];

    let rod1 = RigidBody::new_point_mass(m, &com, "rod1");
    let joint1 = RevoluteJoint::new(Transform3D::identity("rod1", WORLD_FRAME), Vector3::y_axis());
    tree.add_body(rod1, 0, Joint::RevoluteJoint(joint1))?;

    let rod2 = RigidBody::new_point_mass(m, &com, "rod2");
    let joint2 = RevoluteJoint::new(Transform3D::move_z("rod2", "rod1", -l), Vector3::y_axis());
    tree.add_body(rod2, 1, Joint::RevoluteJoint(joint2))?;

    Ok(tree)
}

/// A unit cube named "body" floating freely in the world
pub fn build_floating_body() -> KinematicsResult<RigidBodyTree> {
    let mut tree = RigidBodyTree::new();
    let body = RigidBody::new_cube(1.0, 1.0, "body");
    let joint = FloatingJoint::new(Transform3D::identity("body", WORLD_FRAME));
    tree.add_body(body, 0, Joint::FloatingJoint(joint))?;
    Ok(tree)
}

/// A floating base "1" with two revolute branches:
/// 3         5
/// |         |
/// 2 -- 1 -- 4
/// Bodies are added in name order, so body "i" has index i.
pub fn build_branching_tree() -> KinematicsResult<RigidBodyTree> {
    let mut tree = RigidBodyTree::new();
    let sphere = |name: &str| RigidBody::new_sphere(1.0, 0.2, name);
    let revolute =
        |offset: Transform3D| Joint::RevoluteJoint(RevoluteJoint::new(offset, Vector3::y_axis()));

    let base = FloatingJoint::new(Transform3D::identity("1", WORLD_FRAME));
    tree.add_body(sphere("1"), 0, Joint::FloatingJoint(base))?;
    tree.add_body(sphere("2"), 1, revolute(Transform3D::move_x("2", "1", -1.0)))?;
    tree.add_body(sphere("3"), 2, revolute(Transform3D::move_z("3", "2", 1.0)))?;
    tree.add_body(sphere("4"), 1, revolute(Transform3D::move_x("4", "1", 1.0)))?;
    tree.add_body(sphere("5"), 4, revolute(Transform3D::move_z("5", "4", 1.0)))?;
    Ok(tree)
}

/// A pendulum whose second link hangs off a bracket welded to the first:
/// "upper" swings about y from the world, "bracket" is fixed to the end of
/// "upper" at a tilt, and "lower" swings about the bracket's x axis.
pub fn build_bracket_pendulum(m: Float, l: Float) -> KinematicsResult<RigidBodyTree> {
    let mut tree = RigidBodyTree::new();
    let com = vector![0., 0., -l];

    let upper = RigidBody::new_point_mass(m, &com, "upper");
    let hinge = RevoluteJoint::new(Transform3D::identity("upper", WORLD_FRAME), Vector3::y_axis());
    tree.add_body(upper, 0, Joint::RevoluteJoint(hinge))?;

    let bracket = RigidBody::new_point_mass(m / 2.0, &vector![0.2, 0., 0.], "bracket");
    let weld = FixedJoint::new(Transform3D::new_xyz_rpy(
        "bracket",
        "upper",
        &[0., 0., -l],
        &[0.3, 0., 0.5],
    ));
    tree.add_body(bracket, 1, Joint::FixedJoint(weld))?;

    let lower = RigidBody::new_point_mass(m, &com, "lower");
    let hinge = RevoluteJoint::new(Transform3D::move_x("lower", "bracket", 0.2), Vector3::x_axis());
    tree.add_body(lower, 2, Joint::RevoluteJoint(hinge))?;

    Ok(tree)
}
