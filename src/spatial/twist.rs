use std::ops::{Add, Sub};

use na::{Vector3, Vector6};

use crate::{
    spatial::{spatial_acceleration::SpatialAcceleration, transform::Transform3D},
    types::{Float, Real},
};

/// A twist represents the relative angular and linear velocity between two bodies.
/// The twist of frame j with respect to frame i, expressed in frame k is
/// defined as:
///     T_j^(k,i) = (w_j^(k,i)  v_j^(k,i)) \in R^6
/// Twist is a spatial vector.
#[derive(PartialEq, Debug, Clone)]
pub struct Twist<T: Real = Float> {
    pub body: String,
    pub base: String,
    pub frame: String,
    pub angular: Vector3<T>,
    pub linear: Vector3<T>,
}

impl<T: Real> Twist<T> {
    pub fn new(body: &str, base: &str, frame: &str, angular: Vector3<T>, linear: Vector3<T>) -> Self {
        Twist {
            body: body.to_string(),
            base: base.to_string(),
            frame: frame.to_string(),
            angular,
            linear,
        }
    }

    pub fn zero(body: &str, base: &str, frame: &str) -> Self {
        Twist::new(body, base, frame, Vector3::zeros(), Vector3::zeros())
    }

    /// Transform the twist to be expressed in the "to" frame of transform
    pub fn transform(&self, transform: &Transform3D<T>) -> Twist<T> {
        if self.frame != transform.from {
            panic!(
                "twist {} frame is not equal to transform `from` {} frame!",
                self.frame, transform.from
            );
        }

        let angular = transform.iso.rotation * self.angular;
        let linear =
            transform.iso.rotation * self.linear + transform.iso.translation.vector.cross(&angular);

        Twist {
            body: self.body.clone(),
            base: self.base.clone(),
            frame: transform.to.clone(),
            angular,
            linear,
        }
    }

    /// Take the spatial cross product of two twists
    /// Returns a spatial acceleration term
    pub fn cross(&self, rhs: &Twist<T>) -> SpatialAcceleration<T> {
        if self.frame != rhs.frame {
            panic!(
                "Frames of two twists do not match: {} vs {}!",
                self.frame, rhs.frame
            );
        }

        let angular = self.angular.cross(&rhs.angular);
        let linear = self.angular.cross(&rhs.linear) + self.linear.cross(&rhs.angular);

        SpatialAcceleration {
            body: rhs.body.clone(),
            base: rhs.base.clone(),
            frame: self.frame.clone(),
            angular,
            linear,
        }
    }

    /// Compute the velocity of the point that has this twist.
    /// The point is expressed in the twist's frame.
    pub fn point_velocity(&self, point: &Vector3<T>) -> Vector3<T> {
        self.linear + self.angular.cross(point)
    }

    /// The twist as a stacked [angular; linear] vector
    pub fn as_vector(&self) -> Vector6<T> {
        let mut result = Vector6::zeros();
        result.fixed_rows_mut::<3>(0).copy_from(&self.angular);
        result.fixed_rows_mut::<3>(3).copy_from(&self.linear);
        result
    }
}

impl<'a, 'b, T: Real> Add<&'b Twist<T>> for &'a Twist<T> {
    type Output = Twist<T>;

    /// lhs is A to B twist, rhs is B to C twist,
    /// returns A to C twist.
    fn add(self, rhs: &Twist<T>) -> Twist<T> {
        if self.frame != rhs.frame {
            panic!("lhs and rhs are not expressed in the same frame!");
        }

        if self.body != rhs.base {
            panic!(
                "lhs body {} is not same as rhs base {}!",
                self.body, rhs.base
            );
        }

        Twist {
            body: rhs.body.clone(),
            base: self.base.clone(),
            frame: self.frame.clone(),
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        }
    }
}

impl<'a, 'b, T: Real> Sub<&'b Twist<T>> for &'a Twist<T> {
    type Output = Twist<T>;

    /// lhs is A to C twist, rhs is B to C twist,
    /// returns A to B twist.
    fn sub(self, rhs: &Twist<T>) -> Twist<T> {
        if self.frame != rhs.frame {
            panic!("lhs and rhs are not expressed in the same frame!");
        }

        if self.base != rhs.base {
            panic!(
                "lhs base {} is not same as rhs base {}!",
                self.base, rhs.base
            );
        }

        Twist {
            body: self.body.clone(),
            base: rhs.body.clone(),
            frame: self.frame.clone(),
            angular: self.angular - rhs.angular,
            linear: self.linear - rhs.linear,
        }
    }
}

#[cfg(test)]
#[rustfmt::skip]
mod tests {
    use na::{Isometry3, Translation3, UnitQuaternion};
    use nalgebra::vector;

    use crate::{assert_vec_close, PI};

    use super::*;

    #[test]
    fn test_transform_angular() {
        // Arrange
        let twist_in_body = Twist::new("body", "base", "body", vector![0., 1., 0.], vector![0., 0., 0.]);
        let rot = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI/2.0);
        let iso = Isometry3::from_parts(Translation3::new(5., 0., 0.), rot);
        let transform = Transform3D::new("body", "root", iso);

        // Act
        let twist_in_root = twist_in_body.transform(&transform);

        // Assert
        assert_eq!(twist_in_root.body, "body");
        assert_eq!(twist_in_root.base, "base");
        assert_eq!(twist_in_root.frame, "root");
        assert_vec_close!(twist_in_root.angular, vector![0., 0., 1.], 1e-6);
        assert_vec_close!(twist_in_root.linear, vector![0., -5., 0.], 1e-6);
    }

    #[test]
    fn test_transform_linear() {
        // Arrange
        let twist_in_body = Twist::new("body", "base", "body", vector![0., 0., 0.], vector![0., 1., 0.]);
        let rot = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI/2.0);
        let iso = Isometry3::from_parts(Translation3::new(5., 0., 0.), rot);
        let transform = Transform3D::new("body", "root", iso);

        // Act
        let twist_in_root = twist_in_body.transform(&transform);

        // Assert
        assert_eq!(twist_in_root.frame, "root");
        assert_vec_close!(twist_in_root.angular, vector![0., 0., 0.], 1e-6);
        assert_vec_close!(twist_in_root.linear, vector![0., 0., 1.], 1e-6);
    }

    #[test]
    fn add_then_sub() {
        // Arrange
        let b_wrt_a = Twist::new("b", "a", "w", vector![1., 0., 0.], vector![0., 2., 0.]);
        let c_wrt_b = Twist::new("c", "b", "w", vector![0., 0., 3.], vector![1., 0., 0.]);

        // Act
        let c_wrt_a = &b_wrt_a + &c_wrt_b;
        let back = &c_wrt_a - &b_wrt_a;

        // Assert
        assert_eq!(c_wrt_a.body, "c");
        assert_eq!(c_wrt_a.base, "a");
        assert_eq!(back.body, "c");
        assert_eq!(back.base, "b");
        assert_vec_close!(back.as_vector(), c_wrt_b.as_vector(), 1e-12);
    }

    #[test]
    #[should_panic]
    fn add_broken_chain() {
        let b_wrt_a: Twist = Twist::zero("b", "a", "w");
        let d_wrt_c: Twist = Twist::zero("d", "c", "w");
        let _ = &b_wrt_a + &d_wrt_c;
    }
}
