use na::RealField;

/// Scalar type of model parameters (joint offsets, axes, inertias, limits).
pub type Float = f64;

/// Scalar type that kinematic and dynamic quantities are computed in.
///
/// Any `nalgebra::RealField` that is `Copy` works: plain `f64` for ordinary
/// use, or a forward-mode dual number to get derivatives with respect to
/// `q`/`v` out of the same code path.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

/// Lift a model parameter into the computation scalar.
pub fn real<T: Real>(x: Float) -> T {
    na::convert(x)
}
