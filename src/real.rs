/// Scalar used for literals, bindings and results.
///
/// `f64` unless the `f32` feature is enabled.
#[cfg(feature = "f32")]
pub type Real = f32;

#[cfg(not(feature = "f32"))]
pub type Real = f64;
