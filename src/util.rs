use na::{
    Isometry3, Matrix3, Matrix3xX, Matrix4x3, Quaternion, Translation3, UnitQuaternion, Vector3,
};

use crate::types::{real, Float, Real};

/// Mulitiply a spatial inertia with a spatial motion vector
/// | J         c_hat | | w |   | Jw        + c_hat v |
/// | c_hat^T   m     | | v | = | c_hat^T w + mv      |
pub fn mul_inertia<T: Real>(
    J: &Matrix3<T>,
    c: &Vector3<T>,
    m: T,
    w: &Vector3<T>,
    v: &Vector3<T>,
) -> (Vector3<T>, Vector3<T>) {
    let angular = J * w + c.cross(v);
    let linear = v * m - c.cross(w);
    (angular, linear)
}

/// Perform column-wise cross product
pub fn colwise_cross<T: Real>(a: &Vector3<T>, b: &Matrix3xX<T>) -> Matrix3xX<T> {
    let ncols = b.ncols();
    let mut result = Matrix3xX::zeros(ncols);
    for i in 0..ncols {
        result.set_column(i, &a.cross(&b.column(i)));
    }
    result
}

/// Skew-symmetric matrix of v, such that skew(v) * x == v.cross(x)
#[rustfmt::skip]
pub fn skew_symmetric<T: Real>(v: &Vector3<T>) -> Matrix3<T> {
    let zero = T::zero();
    Matrix3::new(
        zero, -v.z,  v.y,
         v.z, zero, -v.x,
        -v.y,  v.x, zero,
    )
}

/// Matrix G(q) such that the quaternion derivative is
///     qdot = 1/2 * G(q) * ω,
/// where q = (w, x, y, z) is the orientation, and ω is angular velocity in body frame
///
/// Ref: 1.5.2 & 1.5.4 in Quaternions and Dynamics, Basile Graf, 2007
#[rustfmt::skip]
pub fn quaternion_derivative_matrix<T: Real>(q: &Quaternion<T>) -> Matrix4x3<T> {
    let w = q.w;
    let x = q.i;
    let y = q.j;
    let z = q.k;

    Matrix4x3::new(
        -x, -y, -z,
         w, -z,  y,
         z,  w, -x,
        -y,  x,  w,
    )
}

/// Compute the derivative of quaternion, given angular velocity in body frame
pub fn quaternion_derivative<T: Real>(q: &UnitQuaternion<T>, omega: &Vector3<T>) -> Quaternion<T> {
    let quaternion_dot = quaternion_derivative_matrix(q.quaternion()) * omega / real::<T>(2.0);
    Quaternion::new(
        quaternion_dot[0],
        quaternion_dot[1],
        quaternion_dot[2],
        quaternion_dot[3],
    )
}

/// Matrix Φ(rpy) such that d/dt(rpy) = Φ(rpy) * ω, where rpy = (roll, pitch,
/// yaw) describes R = Rz(yaw) * Ry(pitch) * Rx(roll), and ω is angular
/// velocity in the fixed frame. Singular at pitch = ±π/2.
#[rustfmt::skip]
pub fn angular_velocity_to_rpy_dot_matrix<T: Real>(rpy: &Vector3<T>) -> Matrix3<T> {
    let (sp, cp) = (rpy.y.sin(), rpy.y.cos());
    let (sy, cy) = (rpy.z.sin(), rpy.z.cos());
    let tp = sp / cp;
    Matrix3::new(
        cy / cp,  sy / cp,  T::zero(),
        -sy,      cy,       T::zero(),
        cy * tp,  sy * tp,  T::one(),
    )
}

/// Time derivative of Φ(rpy), given the rates d/dt(rpy)
#[rustfmt::skip]
pub fn angular_velocity_to_rpy_dot_matrix_dot<T: Real>(
    rpy: &Vector3<T>,
    rpy_dot: &Vector3<T>,
) -> Matrix3<T> {
    let (sp, cp) = (rpy.y.sin(), rpy.y.cos());
    let (sy, cy) = (rpy.z.sin(), rpy.z.cos());
    let (pd, yd) = (rpy_dot.y, rpy_dot.z);
    let tp = sp / cp;
    let cp2 = cp * cp;
    Matrix3::new(
        -sy * yd / cp + cy * sp * pd / cp2,  cy * yd / cp + sy * sp * pd / cp2,  T::zero(),
        -cy * yd,                            -sy * yd,                           T::zero(),
        -sy * yd * tp + cy * pd / cp2,       cy * yd * tp + sy * pd / cp2,       T::zero(),
    )
}

/// Matrix G(q) such that the quaternion derivative is qdot = G(q) * ω,
/// where q = (w, x, y, z) and ω is angular velocity in the fixed frame.
/// G is linear in q, so d/dt(G(q)) = G(qdot).
#[rustfmt::skip]
pub fn angular_velocity_to_quaternion_dot_matrix<T: Real>(q: &Quaternion<T>) -> Matrix4x3<T> {
    let half = real::<T>(0.5);
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    Matrix4x3::new(
        -x, -y, -z,
         w,  z, -y,
        -z,  w,  x,
         y, -x,  w,
    ) * half
}

pub fn cast_vector3<T: Real>(v: &Vector3<Float>) -> Vector3<T> {
    v.map(real::<T>)
}

pub fn cast_matrix3<T: Real>(m: &Matrix3<Float>) -> Matrix3<T> {
    m.map(real::<T>)
}

/// Lift an isometry with Float entries into the computation scalar.
pub fn cast_isometry<T: Real>(iso: &Isometry3<Float>) -> Isometry3<T> {
    let q = iso.rotation.quaternion();
    let rotation = UnitQuaternion::new_unchecked(Quaternion::new(
        real(q.w),
        real(q.i),
        real(q.j),
        real(q.k),
    ));
    Isometry3::from_parts(
        Translation3::from(cast_vector3::<T>(&iso.translation.vector)),
        rotation,
    )
}

#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr, $tolerance:expr) => {
        let left: $crate::types::Float = $left;
        let right: $crate::types::Float = $right;
        let tol = $tolerance;
        let diff = (left - right).abs();
        if diff > tol {
            panic!(
                "assertion failed: {} ~= {} \
                (tolerance: {}, difference: {})",
                left, right, tol, diff
            );
        }
    };
}

#[macro_export]
macro_rules! assert_vec_close {
    ($left:expr, $right:expr, $tolerance:expr) => {
        match (&$left, &$right) {
            (left, right) => {
                let tol = $tolerance;
                assert_eq!(left.len(), right.len(), "length mismatch");
                for (a, b) in left.iter().zip(right.iter()) {
                    $crate::assert_close!(*a, *b, tol);
                }
            }
        }
    };
}
