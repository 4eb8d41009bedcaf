use std::ops::Mul;

use na::{Isometry3, Matrix3, Translation3, UnitQuaternion, UnitVector3, Vector3};

use crate::{
    types::{Float, Real},
    util::cast_isometry,
};

/// A homogeneous transformation representing the transformation from one
/// 3-dimensional Cartesian coordinate system to another.
/// `iso` maps coordinates expressed in `from` into coordinates expressed in `to`.
#[derive(Debug, PartialEq, Clone)]
pub struct Transform3D<T: Real = Float> {
    pub from: String,
    pub to: String,
    pub iso: Isometry3<T>,
}

impl<T: Real> Transform3D<T> {
    pub fn new(from: &str, to: &str, iso: Isometry3<T>) -> Self {
        Transform3D {
            from: from.to_string(),
            to: to.to_string(),
            iso,
        }
    }

    pub fn identity(from: &str, to: &str) -> Self {
        Transform3D::new(from, to, Isometry3::identity())
    }

    pub fn inv(&self) -> Self {
        Transform3D {
            from: self.to.clone(),
            to: self.from.clone(),
            iso: self.iso.inverse(),
        }
    }

    pub fn rot(&self) -> Matrix3<T> {
        self.iso.rotation.to_rotation_matrix().matrix().into_owned()
    }

    pub fn trans(&self) -> Vector3<T> {
        self.iso.translation.vector
    }

    pub fn transform_point(&self, point: &Vector3<T>) -> Vector3<T> {
        self.rot() * point + self.trans()
    }

    pub fn transform_vector(&self, vector: &Vector3<T>) -> Vector3<T> {
        self.rot() * vector
    }
}

impl Transform3D<Float> {
    pub fn new_xyz_rpy(from: &str, to: &str, xyz: &[Float; 3], rpy: &[Float; 3]) -> Self {
        let translation = Translation3::new(xyz[0], xyz[1], xyz[2]);
        let rotation = UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]);
        Transform3D::new(from, to, Isometry3::from_parts(translation, rotation))
    }

    pub fn move_x(from: &str, to: &str, amount: Float) -> Self {
        Transform3D::new(from, to, Isometry3::translation(amount, 0., 0.))
    }

    pub fn move_y(from: &str, to: &str, amount: Float) -> Self {
        Transform3D::new(from, to, Isometry3::translation(0., amount, 0.))
    }

    pub fn move_z(from: &str, to: &str, amount: Float) -> Self {
        Transform3D::new(from, to, Isometry3::translation(0., 0., amount))
    }

    /// Returns a transform that translates by (x, y, z)
    pub fn move_xyz(from: &str, to: &str, x: Float, y: Float, z: Float) -> Self {
        Transform3D::new(from, to, Isometry3::translation(x, y, z))
    }

    /// Returns a pure rotation by theta about axis
    pub fn rotation(from: &str, to: &str, axis: &Vector3<Float>, theta: Float) -> Self {
        let rotation = UnitQuaternion::from_axis_angle(&UnitVector3::new_normalize(*axis), theta);
        Transform3D::new(
            from,
            to,
            Isometry3::from_parts(Translation3::identity(), rotation),
        )
    }

    /// Lift the transform into the computation scalar
    pub fn cast<T: Real>(&self) -> Transform3D<T> {
        Transform3D {
            from: self.from.clone(),
            to: self.to.clone(),
            iso: cast_isometry(&self.iso),
        }
    }
}

impl<T: Real> Mul for Transform3D<T> {
    type Output = Transform3D<T>;

    fn mul(self, rhs: Self) -> Self::Output {
        if self.from != rhs.to {
            panic!(
                "lhs from frame {} is not same as rhs to frame {}!",
                self.from, rhs.to
            );
        }
        Transform3D {
            from: rhs.from,
            to: self.to,
            iso: self.iso * rhs.iso,
        }
    }
}

impl<'a, 'b, T: Real> Mul<&'b Transform3D<T>> for &'a Transform3D<T> {
    type Output = Transform3D<T>;

    fn mul(self, rhs: &'b Transform3D<T>) -> Self::Output {
        if self.from != rhs.to {
            panic!(
                "lhs from frame {} is not same as rhs to frame {}!",
                self.from, rhs.to
            );
        }
        Transform3D {
            from: rhs.from.clone(),
            to: self.to.clone(),
            iso: self.iso * rhs.iso,
        }
    }
}

#[cfg(test)]
mod tests {
    use na::vector;

    use crate::{assert_vec_close, PI, WORLD_FRAME};

    use super::*;

    #[test]
    fn compose_chain() {
        // Arrange
        let two_to_one = Transform3D::move_x("2", "1", -1.0);
        let one_to_world = Transform3D::rotation("1", WORLD_FRAME, &Vector3::z_axis(), PI / 2.0);

        // Act
        let two_to_world = &one_to_world * &two_to_one;

        // Assert
        assert_eq!(two_to_world.from, "2");
        assert_eq!(two_to_world.to, WORLD_FRAME);
        assert_vec_close!(two_to_world.trans(), vector![0., -1., 0.], 1e-12);
    }

    #[test]
    fn inverse_round_trip() {
        let t = Transform3D::new_xyz_rpy("a", "b", &[1., 2., 3.], &[0.3, -0.2, 0.1]);
        let p = vector![0.5, -1.5, 2.0];

        let back = t.inv().transform_point(&t.transform_point(&p));

        assert_vec_close!(back, p, 1e-12);
    }

    #[test]
    #[should_panic]
    fn compose_mismatched_frames() {
        let a = Transform3D::move_x("a", "b", 1.0);
        let c = Transform3D::move_x("c", "d", 1.0);
        let _ = a * c;
    }
}
