//! Float trait abstraction for f32/f64 support.
//!
//! Every algorithm in this crate is generic over [`DenoiseFloat`], so image
//! buffers can be stored in either single or double precision.

use num_traits::{Float, FromPrimitive, NumAssign};
use std::fmt::Debug;
use std::iter::Sum;

/// Trait alias for floating point sample types.
///
/// Combines the bounds the denoisers rely on:
/// - Basic float operations (Float, NumAssign)
/// - Conversion from primitive types (FromPrimitive)
/// - Iteration support (Sum)
/// - Thread safety for rayon (Send, Sync)
pub trait DenoiseFloat:
    Float + FromPrimitive + NumAssign + Sum + Debug + Send + Sync + 'static
{
    /// Machine epsilon used to guard divisions.
    const TINY: Self;

    /// Create a value from an f64 constant.
    fn from_f64_c(val: f64) -> Self;

    /// Create a value from a usize constant.
    fn usize_as(val: usize) -> Self;

    /// Widen to f64 for statistics that need the extra precision.
    fn as_f64(self) -> f64;
}

impl DenoiseFloat for f32 {
    const TINY: Self = f32::EPSILON;

    #[inline]
    fn from_f64_c(val: f64) -> Self {
        val as f32
    }

    #[inline]
    fn usize_as(val: usize) -> Self {
        val as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl DenoiseFloat for f64 {
    const TINY: Self = f64::EPSILON;

    #[inline]
    fn from_f64_c(val: f64) -> Self {
        val
    }

    #[inline]
    fn usize_as(val: usize) -> Self {
        val as f64
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}
