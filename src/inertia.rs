use std::ops::{Add, AddAssign};

use na::{Matrix3, Matrix6, Vector3};

use crate::{
    spatial::{transform::Transform3D, twist::Twist},
    types::{real, Float, Real},
    util::{cast_matrix3, cast_vector3, skew_symmetric},
};

/// A spatial inertia, or inertia matrix, represents the mass distribution of a
/// rigid body.
/// A spatial inertia expressed in frame i is defined as:
/// I^i = | J         c_hat |
///       | c_hat^T     mI  |
/// where J is the mass moment of inertia, m is the total mass, and c is the
/// 'cross part', which is the center of mass position scaled by m.
///
/// !!! Warning
///     The __moment__ field of a __SpatialInertia__ is the moment of inertia
///     about the origin of its __frame__, not about the center of mass.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialInertia<T: Real = Float> {
    pub frame: String,
    pub moment: Matrix3<T>,
    pub cross_part: Vector3<T>,
    pub mass: T,
}

impl<T: Real> SpatialInertia<T> {
    pub fn new(moment: Matrix3<T>, cross_part: Vector3<T>, mass: T, frame: &str) -> Self {
        SpatialInertia {
            frame: frame.to_string(),
            moment,
            cross_part,
            mass,
        }
    }

    pub fn zero(frame: &str) -> Self {
        SpatialInertia::new(Matrix3::zeros(), Vector3::zeros(), T::zero(), frame)
    }

    /// Center of mass in the inertia's frame. None for a massless inertia.
    pub fn center_of_mass(&self) -> Option<Vector3<T>> {
        if self.mass == T::zero() {
            return None;
        }
        Some(self.cross_part / self.mass)
    }

    /// Transform the spatial inertia to be expressed in the "to" frame of transform
    pub fn transform(&self, transform: &Transform3D<T>) -> SpatialInertia<T> {
        if self.frame != transform.from {
            panic!(
                "self frame {} and transform from frame {} do not match!",
                self.frame, transform.from
            );
        }

        let R = transform.rot();
        let p = transform.trans();

        let J = self.moment;
        let mc = self.cross_part;
        let m = self.mass;

        let Rmc = R * mc;
        let mp = p * m;
        let mcnew = Rmc + mp;
        let X = Rmc * p.transpose();
        let Y = X + X.transpose() + mp * p.transpose();
        let Jnew = R * J * R.transpose() - Y + Matrix3::identity() * Y.trace();

        SpatialInertia {
            frame: transform.to.clone(),
            moment: Jnew,
            cross_part: mcnew,
            mass: m,
        }
    }

    /// The 6x6 matrix form acting on [angular; linear] motion vectors
    pub fn as_matrix(&self) -> Matrix6<T> {
        let c_hat = skew_symmetric(&self.cross_part);
        let mut result = Matrix6::zeros();
        result.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.moment);
        result.fixed_view_mut::<3, 3>(0, 3).copy_from(&c_hat);
        result
            .fixed_view_mut::<3, 3>(3, 0)
            .copy_from(&c_hat.transpose());
        result
            .fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&(Matrix3::identity() * self.mass));
        result
    }
}

impl SpatialInertia<Float> {
    /// Lift the inertia into the computation scalar
    pub fn cast<T: Real>(&self) -> SpatialInertia<T> {
        SpatialInertia {
            frame: self.frame.clone(),
            moment: cast_matrix3(&self.moment),
            cross_part: cast_vector3(&self.cross_part),
            mass: real(self.mass),
        }
    }
}

impl<'a, 'b, T: Real> Add<&'b SpatialInertia<T>> for &'a SpatialInertia<T> {
    type Output = SpatialInertia<T>;

    fn add(self, rhs: &SpatialInertia<T>) -> SpatialInertia<T> {
        if self.frame != rhs.frame {
            panic!("lhs frame {} != rhs frame {}!", self.frame, rhs.frame);
        }

        SpatialInertia {
            frame: self.frame.clone(),
            moment: self.moment + rhs.moment,
            cross_part: self.cross_part + rhs.cross_part,
            mass: self.mass + rhs.mass,
        }
    }
}

impl<'b, T: Real> AddAssign<&'b SpatialInertia<T>> for SpatialInertia<T> {
    fn add_assign(&mut self, rhs: &Self) {
        if self.frame != rhs.frame {
            panic!("lhs frame {} != rhs frame {}!", self.frame, rhs.frame);
        }

        self.moment += rhs.moment;
        self.cross_part += rhs.cross_part;
        self.mass += rhs.mass;
    }
}

/// Computes the kinetic energy of a body
/// Essentially implements KE = 1/2 * v^T * M * v
pub fn kinetic_energy<T: Real>(inertia: &SpatialInertia<T>, twist: &Twist<T>) -> T {
    if inertia.frame != twist.frame {
        panic!(
            "spatial inertia frame {} is not twist frame {}.",
            inertia.frame, twist.frame
        );
    }

    let w = twist.angular;
    let v = twist.linear;
    let J = inertia.moment;
    let c = inertia.cross_part;
    let m = inertia.mass;

    let two: T = real(2.0);
    (w.dot(&(J * w)) + v.dot(&(v * m + w.cross(&c) * two))) / two
}

#[cfg(test)]
mod tests {
    use na::{vector, Isometry3, Vector6};

    use crate::{
        assert_close, assert_vec_close, util::test_utils::random_vector, PI, WORLD_FRAME,
    };
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn point_mass(m: Float, frame: &str) -> SpatialInertia {
        SpatialInertia::new(Matrix3::zeros(), Vector3::zeros(), m, frame)
    }

    #[test]
    fn point_mass_moved_out() {
        // Arrange
        let inertia = point_mass(2.0, "b");
        let b_to_world = Transform3D::new("b", WORLD_FRAME, Isometry3::translation(0., 0., -3.));

        // Act
        let in_world = inertia.transform(&b_to_world);

        // Assert
        assert_vec_close!(in_world.cross_part, vector![0., 0., -6.], 1e-12);
        assert_close!(in_world.moment[(0, 0)], 18.0, 1e-12);
        assert_close!(in_world.moment[(1, 1)], 18.0, 1e-12);
        assert_close!(in_world.moment[(2, 2)], 0.0, 1e-12);
        assert_vec_close!(in_world.center_of_mass().unwrap(), vector![0., 0., -3.], 1e-12);
    }

    /// Transforming the inertia and the twist together keeps the kinetic energy
    #[test]
    fn kinetic_energy_invariant() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(7);
        let inertia = SpatialInertia::new(
            Matrix3::from_diagonal(&vector![1., 2., 3.]),
            vector![0.1, -0.2, 0.3],
            1.5,
            "b",
        );
        let twist = Twist::new("b", WORLD_FRAME, "b", random_vector(&mut rng, 1.0), random_vector(&mut rng, 1.0));
        let transform = Transform3D::new(
            "b",
            WORLD_FRAME,
            Isometry3::new(vector![1., -2., 0.5], vector![0., PI / 3., 0.2]),
        );

        // Act
        let ke_body = kinetic_energy(&inertia, &twist);
        let ke_world = kinetic_energy(&inertia.transform(&transform), &twist.transform(&transform));

        // Assert
        assert_close!(ke_body, ke_world, 1e-10);
    }

    #[test]
    fn matrix_form_agrees_with_kinetic_energy() {
        let mut rng = StdRng::seed_from_u64(11);
        let inertia = SpatialInertia::new(
            Matrix3::from_diagonal(&vector![1., 2., 3.]),
            vector![0.4, 0.0, -0.3],
            2.0,
            "b",
        );
        let twist = Twist::new("b", WORLD_FRAME, "b", random_vector(&mut rng, 1.0), random_vector(&mut rng, 1.0));
        let t: Vector6<Float> = twist.as_vector();

        let ke = 0.5 * t.dot(&(inertia.as_matrix() * t));

        assert_close!(ke, kinetic_energy(&inertia, &twist), 1e-12);
    }
}
