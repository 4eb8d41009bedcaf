use std::ops::{Add, AddAssign, Sub, SubAssign};

use na::Vector3;

use crate::{
    spatial::transform::Transform3D,
    types::{Float, Real},
};

/// A wrench represents a system of forces.
/// The wrench w^i expressed in frame i in defined as
///     w^i = (τ^i f^i) = ∑ over j (r_j^i \cross f_j^i   f_j^i)
/// where the f_j^i are forces expressed in frame i, exerted at positions r_j^i.
/// τ^i is the total torque and f^i is the total force.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrench<T: Real = Float> {
    pub frame: String,
    pub angular: Vector3<T>,
    pub linear: Vector3<T>,
}

impl<T: Real> Wrench<T> {
    pub fn new(frame: &str, angular: Vector3<T>, linear: Vector3<T>) -> Self {
        Wrench {
            frame: frame.to_string(),
            angular,
            linear,
        }
    }

    pub fn zero(frame: &str) -> Self {
        Wrench::new(frame, Vector3::zeros(), Vector3::zeros())
    }

    /// Return the wrench of a force applied at point
    pub fn from_force(point: &Vector3<T>, force: &Vector3<T>, frame: &str) -> Self {
        Wrench::new(frame, point.cross(force), *force)
    }

    /// Transform the wrench to be expressed in the "to" frame of transform
    pub fn transform(&self, transform: &Transform3D<T>) -> Wrench<T> {
        if self.frame != transform.from {
            panic!(
                "wrench {} frame is not equal to transform `from` {} frame!",
                self.frame, transform.from
            );
        }

        let rot = transform.rot();
        let linear = rot * self.linear;
        let angular = rot * self.angular + transform.trans().cross(&linear);

        Wrench {
            frame: transform.to.clone(),
            angular,
            linear,
        }
    }
}

impl<'a, 'b, T: Real> Add<&'b Wrench<T>> for &'a Wrench<T> {
    type Output = Wrench<T>;

    fn add(self, rhs: &Wrench<T>) -> Wrench<T> {
        if self.frame != rhs.frame {
            panic!("lhs frame {} != rhs frame {}!", self.frame, rhs.frame);
        }

        Wrench {
            frame: self.frame.clone(),
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        }
    }
}

impl<T: Real> AddAssign<&Wrench<T>> for Wrench<T> {
    fn add_assign(&mut self, rhs: &Wrench<T>) {
        if self.frame != rhs.frame {
            panic!("lhs frame {} != rhs frame {}!", self.frame, rhs.frame);
        }

        self.angular += rhs.angular;
        self.linear += rhs.linear;
    }
}

impl<'a, 'b, T: Real> Sub<&'b Wrench<T>> for &'a Wrench<T> {
    type Output = Wrench<T>;

    fn sub(self, rhs: &Wrench<T>) -> Wrench<T> {
        if self.frame != rhs.frame {
            panic!("lhs frame {} != rhs frame {}!", self.frame, rhs.frame);
        }

        Wrench {
            frame: self.frame.clone(),
            angular: self.angular - rhs.angular,
            linear: self.linear - rhs.linear,
        }
    }
}

impl<T: Real> SubAssign<&Wrench<T>> for Wrench<T> {
    fn sub_assign(&mut self, rhs: &Wrench<T>) {
        if self.frame != rhs.frame {
            panic!("lhs frame {} != rhs frame {}!", self.frame, rhs.frame);
        }

        self.angular -= rhs.angular;
        self.linear -= rhs.linear;
    }
}

#[cfg(test)]
mod tests {
    use na::{vector, Isometry3};

    use crate::{assert_vec_close, WORLD_FRAME};

    use super::*;

    #[test]
    fn force_moved_to_world_picks_up_moment() {
        // Arrange
        let wrench = Wrench::from_force(&vector![0., 0., 0.], &vector![0., 0., -1.], "b");
        let b_to_world = Transform3D::new("b", WORLD_FRAME, Isometry3::translation(2., 0., 0.));

        // Act
        let in_world = wrench.transform(&b_to_world);

        // Assert
        assert_eq!(in_world.frame, WORLD_FRAME);
        assert_vec_close!(in_world.linear, vector![0., 0., -1.], 1e-12);
        assert_vec_close!(in_world.angular, vector![0., 2., 0.], 1e-12);
    }

    #[test]
    #[should_panic]
    fn add_in_different_frames() {
        let a: Wrench = Wrench::zero("a");
        let b = Wrench::zero("b");
        let _ = &a + &b;
    }
}
