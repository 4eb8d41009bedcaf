use na::{DMatrix, DVector, Matrix3xX};

use crate::{
    spatial::{
        spatial_acceleration::SpatialAcceleration, transform::Transform3D, twist::Twist,
        wrench::Wrench,
    },
    types::{Float, Real},
    util::colwise_cross,
};

/// A geometric Jacobian maps a vector of joint velocities to a twist.
/// Each column is a unit twist of `body` w.r.t. `base`, expressed in `frame`.
#[derive(PartialEq, Debug, Clone)]
pub struct GeometricJacobian<T: Real = Float> {
    pub body: String,
    pub base: String,
    pub frame: String,
    pub angular: Matrix3xX<T>,
    pub linear: Matrix3xX<T>,
}

impl<T: Real> GeometricJacobian<T> {
    pub fn new(
        body: &str,
        base: &str,
        frame: &str,
        angular: Matrix3xX<T>,
        linear: Matrix3xX<T>,
    ) -> Self {
        if angular.ncols() != linear.ncols() {
            panic!(
                "angular part has {} columns but linear part has {}",
                angular.ncols(),
                linear.ncols()
            );
        }
        GeometricJacobian {
            body: body.to_string(),
            base: base.to_string(),
            frame: frame.to_string(),
            angular,
            linear,
        }
    }

    pub fn zeros(body: &str, base: &str, frame: &str, ncols: usize) -> Self {
        GeometricJacobian::new(
            body,
            base,
            frame,
            Matrix3xX::zeros(ncols),
            Matrix3xX::zeros(ncols),
        )
    }

    /// Build from a stacked 6 x n [angular; linear] matrix
    pub fn from_matrix(body: &str, base: &str, frame: &str, matrix: &DMatrix<T>) -> Self {
        if matrix.nrows() != 6 {
            panic!("expected 6 rows, got {}", matrix.nrows());
        }
        let angular = Matrix3xX::from_fn(matrix.ncols(), |r, c| matrix[(r, c)]);
        let linear = Matrix3xX::from_fn(matrix.ncols(), |r, c| matrix[(r + 3, c)]);
        GeometricJacobian::new(body, base, frame, angular, linear)
    }

    /// Transform the jacobian to be expressed in the "to" frame of transform
    pub fn transform(&self, transform: &Transform3D<T>) -> GeometricJacobian<T> {
        if self.frame != transform.from {
            panic!(
                "jacobian {} frame is not equal to transform `from` {} frame!",
                self.frame, transform.from
            );
        }

        let rot = transform.rot();
        let trans = transform.trans();
        let angular = rot * &self.angular;
        let linear = rot * &self.linear + colwise_cross(&trans, &angular);

        GeometricJacobian {
            body: self.body.clone(),
            base: self.base.clone(),
            frame: transform.to.clone(),
            angular,
            linear,
        }
    }

    pub fn dim(&self) -> usize {
        self.angular.ncols()
    }

    /// Stacked 6 x n [angular; linear] matrix
    pub fn as_matrix(&self) -> DMatrix<T> {
        let n = self.dim();
        let mut result = DMatrix::zeros(6, n);
        result.view_mut((0, 0), (3, n)).copy_from(&self.angular);
        result.view_mut((3, 0), (3, n)).copy_from(&self.linear);
        result
    }

    /// Right-multiply by a n x k matrix, e.g. a velocity-to-position-rate map
    pub fn mul_matrix(&self, rhs: &DMatrix<T>) -> GeometricJacobian<T> {
        if rhs.nrows() != self.dim() {
            panic!(
                "jacobian has {} columns but rhs has {} rows",
                self.dim(),
                rhs.nrows()
            );
        }
        GeometricJacobian {
            body: self.body.clone(),
            base: self.base.clone(),
            frame: self.frame.clone(),
            angular: &self.angular * rhs,
            linear: &self.linear * rhs,
        }
    }

    /// The twist obtained from joint velocities v
    pub fn twist(&self, v: &DVector<T>) -> Twist<T> {
        Twist::new(
            &self.body,
            &self.base,
            &self.frame,
            &self.angular * v,
            &self.linear * v,
        )
    }

    /// The spatial acceleration obtained from joint accelerations vd
    pub fn spatial_acceleration(&self, vd: &DVector<T>) -> SpatialAcceleration<T> {
        SpatialAcceleration::new(
            &self.body,
            &self.base,
            &self.frame,
            &self.angular * vd,
            &self.linear * vd,
        )
    }

    /// J^T w, i.e. the joint torques that balance the wrench
    pub fn transpose_mul_wrench(&self, wrench: &Wrench<T>) -> DVector<T> {
        if self.frame != wrench.frame {
            panic!(
                "jacobian frame {} and wrench frame {} differ!",
                self.frame, wrench.frame
            );
        }
        self.angular.tr_mul(&wrench.angular) + self.linear.tr_mul(&wrench.linear)
    }
}
