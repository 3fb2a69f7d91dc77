use nalgebra::{ClosedAdd, ClosedMul, RealField, Scalar};
use num::{Complex, Zero};

pub use nalgebra;

pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

/// A scalar type that generated native kernels can operate on directly.
///
/// Conversions from wider types are lossy in the same way a C++ conversion is: narrowing
/// floating point values rounds, and converting a complex number to a real type keeps the
/// real part.
pub trait NativeScalar: Scalar + Copy + Zero + ClosedAdd + ClosedMul {
    /// Name of the corresponding C++ type.
    const C_TYPE: &'static str;

    fn from_f32(x: f32) -> Self;
    fn from_f64(x: f64) -> Self;
    fn from_c64(z: Complex<f64>) -> Self;
}

impl NativeScalar for f32 {
    const C_TYPE: &'static str = "float";

    fn from_f32(x: f32) -> Self {
        x
    }

    fn from_f64(x: f64) -> Self {
        x as f32
    }

    fn from_c64(z: Complex<f64>) -> Self {
        z.re as f32
    }
}

impl NativeScalar for f64 {
    const C_TYPE: &'static str = "double";

    fn from_f32(x: f32) -> Self {
        x.into()
    }

    fn from_f64(x: f64) -> Self {
        x
    }

    fn from_c64(z: Complex<f64>) -> Self {
        z.re
    }
}

impl NativeScalar for Complex<f64> {
    const C_TYPE: &'static str = "std::complex<double>";

    fn from_f32(x: f32) -> Self {
        Complex::new(x.into(), 0.0)
    }

    fn from_f64(x: f64) -> Self {
        Complex::new(x, 0.0)
    }

    fn from_c64(z: Complex<f64>) -> Self {
        z
    }
}
