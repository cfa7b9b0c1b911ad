//! Math expression parser/evaluator for sampling surfaces.
//!
//! An expression such as `sin(x) * cos(z)` is parsed once into an
//! [`Expression`] tree. Variables are single characters held in a
//! caller-owned [`Bindings`] table; the tree refers to them by
//! [`BindingId`], so the caller can move `x` and `z` across a grid and
//! re-evaluate without re-parsing.
//!
//! Supported syntax: `+ - * /`, `^`, parentheses, decimal literals, and the
//! unary functions `cos sin tan acos asin atan log` (with longer aliases such
//! as `cosine` and `arctan`, case-insensitive). A function applies to
//! everything up to the next operator, so `cos x^2` is `(cos x)^2`.
//!
//! # Example
//!
//! ```rust
//! use surface_expr::*;
//!
//! let mut bindings = Bindings::xz();
//! let x = bindings.find('x').unwrap();
//! let parsed = Expression::parse("2 * (x + 1) ^ 2", &bindings).unwrap();
//!
//! bindings.set(x, 2.0);
//! assert_eq!(parsed.evaluate(&bindings), 18.0);
//! bindings.set(x, -1.0);
//! assert_eq!(parsed.evaluate(&bindings), 0.0);
//!
//! let err = Expression::parse("2 * (x + 1", &bindings).unwrap_err();
//! assert_eq!(err.kind, ParseErrorKind::UnmatchedBracket);
//! assert_eq!(err.offset, 4);
//! ```

mod bindings;
mod error;
mod evaluate;
mod expression;
mod parse;
mod real;
mod scan;

pub use bindings::*;
pub use error::*;
pub use evaluate::*;
pub use expression::*;
pub use real::Real;

pub trait FloatExt: num_traits::Float + std::str::FromStr + Send + Sync {}
impl FloatExt for f32 {}
impl FloatExt for f64 {}
