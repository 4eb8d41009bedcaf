use std::ops::{Add, Sub};

use na::{Vector3, Vector6};

use crate::{
    spatial::transform::Transform3D,
    types::{Float, Real},
};

/// A spatial acceleration is the time derivative of a twist
#[derive(PartialEq, Debug, Clone)]
pub struct SpatialAcceleration<T: Real = Float> {
    pub body: String,
    pub base: String,
    pub frame: String,
    pub angular: Vector3<T>,
    pub linear: Vector3<T>,
}

impl<T: Real> SpatialAcceleration<T> {
    pub fn new(body: &str, base: &str, frame: &str, angular: Vector3<T>, linear: Vector3<T>) -> Self {
        SpatialAcceleration {
            body: body.to_string(),
            base: base.to_string(),
            frame: frame.to_string(),
            angular,
            linear,
        }
    }

    pub fn zero(body: &str, base: &str, frame: &str) -> Self {
        SpatialAcceleration::new(body, base, frame, Vector3::zeros(), Vector3::zeros())
    }

    /// Transform the spatial acceleration to be expressed in the "to" frame of transform
    pub fn transform(&self, transform: &Transform3D<T>) -> SpatialAcceleration<T> {
        if self.frame != transform.from {
            panic!(
                "spatial acceleration {} frame is not equal to transform `from` {} frame!",
                self.frame, transform.from
            );
        }

        let rot = transform.rot();
        let trans = transform.trans();
        let angular = rot * self.angular;
        let linear = rot * self.linear + trans.cross(&angular);

        SpatialAcceleration {
            body: self.body.clone(),
            base: self.base.clone(),
            frame: transform.to.clone(),
            angular,
            linear,
        }
    }

    /// Negated gravitational acceleration of the world w.r.t. itself.
    /// Adding it to every body's acceleration is how gravity enters the
    /// recursive Newton-Euler pass: the whole system sits in an elevator
    /// accelerating against gravity.
    pub fn inv_gravitational_spatial_acceleration(gravity: &Vector3<T>, world: &str) -> Self {
        SpatialAcceleration::new(world, world, world, Vector3::zeros(), -gravity)
    }

    pub fn as_vector(&self) -> Vector6<T> {
        let mut result = Vector6::zeros();
        result.fixed_rows_mut::<3>(0).copy_from(&self.angular);
        result.fixed_rows_mut::<3>(3).copy_from(&self.linear);
        result
    }
}

impl<'a, 'b, T: Real> Add<&'b SpatialAcceleration<T>> for &'a SpatialAcceleration<T> {
    type Output = SpatialAcceleration<T>;

    /// lhs is A to B spatial acceleration, rhs is B to C spatial acceleration,
    /// returns A to C spatial acceleration.
    /// Two terms of the same body/base pair can also be summed.
    fn add(self, rhs: &SpatialAcceleration<T>) -> SpatialAcceleration<T> {
        if self.frame != rhs.frame {
            panic!("lhs and rhs are not expressed in the same frame!");
        }

        if self.body != rhs.base && !(self.base == rhs.base && self.body == rhs.body) {
            panic!(
                "lhs ({} wrt {}) does not chain with rhs ({} wrt {})!",
                self.body, self.base, rhs.body, rhs.base
            );
        }
        SpatialAcceleration {
            body: rhs.body.clone(),
            base: self.base.clone(),
            frame: self.frame.clone(),
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        }
    }
}

impl<'a, 'b, T: Real> Sub<&'b SpatialAcceleration<T>> for &'a SpatialAcceleration<T> {
    type Output = SpatialAcceleration<T>;

    /// lhs is A to C spatial acceleration, rhs is B to C spatial acceleration,
    /// returns A to B spatial acceleration.
    fn sub(self, rhs: &SpatialAcceleration<T>) -> SpatialAcceleration<T> {
        if self.frame != rhs.frame {
            panic!("lhs and rhs are not expressed in the same frame!");
        }

        if self.base != rhs.base {
            panic!("lhs base {} is not same as rhs base {}!", self.base, rhs.base);
        }

        SpatialAcceleration {
            body: self.body.clone(),
            base: rhs.body.clone(),
            frame: self.frame.clone(),
            angular: self.angular - rhs.angular,
            linear: self.linear - rhs.linear,
        }
    }
}
