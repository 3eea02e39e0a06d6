//! Multi-level 2D discrete wavelet transform.
//!
//! Orthonormal Daubechies filters are applied separably (rows, then columns)
//! with periodic boundary handling. Before each level an odd dimension is
//! extended by replicating its last sample, so every level works on an even
//! length; the inverse crops those samples back off. Because the periodized
//! filter bank is orthogonal, `inverse(forward(x))` reproduces `x` to
//! floating-point precision for any shape.
//!
//! Coefficient layout follows the usual 2D convention:
//! - `horizontal`: high-pass along columns (axis 0), low-pass along rows
//! - `vertical`: low-pass along columns, high-pass along rows (axis 1)
//! - `diagonal`: high-pass along both axes

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{DenoiseError, Result};
use crate::float_trait::DenoiseFloat;

// =============================================================================
// Filter Banks
// =============================================================================

/// Daubechies-4 (8 tap) scaling filter.
const DB4_LO: [f64; 8] = [
    0.230_377_813_308_855_23,
    0.714_846_570_552_541_5,
    0.630_880_767_929_590_4,
    -0.027_983_769_416_983_85,
    -0.187_034_811_718_881_14,
    0.030_841_381_835_986_965,
    0.032_883_011_666_982_945,
    -0.010_597_401_784_997_278,
];

/// Wavelet family used by the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wavelet {
    /// Haar (db1), 2 taps.
    Haar,
    /// Daubechies-2, 4 taps, two vanishing moments.
    #[default]
    Db2,
    /// Daubechies-4, 8 taps, four vanishing moments.
    Db4,
}

impl Wavelet {
    /// Number of filter taps.
    pub fn filter_len(self) -> usize {
        match self {
            Wavelet::Haar => 2,
            Wavelet::Db2 => 4,
            Wavelet::Db4 => 8,
        }
    }

    /// Low-pass decomposition filter.
    fn scaling_filter(self) -> Vec<f64> {
        match self {
            Wavelet::Haar => {
                let v = std::f64::consts::FRAC_1_SQRT_2;
                vec![v, v]
            }
            Wavelet::Db2 => {
                let s3 = 3.0_f64.sqrt();
                let norm = 4.0 * 2.0_f64.sqrt();
                vec![
                    (1.0 + s3) / norm,
                    (3.0 + s3) / norm,
                    (3.0 - s3) / norm,
                    (1.0 - s3) / norm,
                ]
            }
            Wavelet::Db4 => DB4_LO.to_vec(),
        }
    }
}

/// Analysis filter pair converted to the working precision.
///
/// The high-pass filter is the quadrature mirror of the low-pass one:
/// `hi[k] = (-1)^k * lo[L-1-k]`. For orthonormal wavelets the same pair is
/// used for synthesis.
#[derive(Debug, Clone)]
struct FilterBank<F> {
    lo: Vec<F>,
    hi: Vec<F>,
}

impl<F: DenoiseFloat> FilterBank<F> {
    fn new(wavelet: Wavelet) -> Self {
        let lo64 = wavelet.scaling_filter();
        let n = lo64.len();
        let hi = (0..n)
            .map(|k| {
                let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                F::from_f64_c(sign * lo64[n - 1 - k])
            })
            .collect();
        Self {
            lo: lo64.into_iter().map(F::from_f64_c).collect(),
            hi,
        }
    }
}

/// Deepest useful decomposition level for a signal of length `len`.
///
/// `⌊log2(len / (filter_len - 1))⌋`, or 0 when the signal is shorter than
/// the filter.
pub fn max_level(len: usize, wavelet: Wavelet) -> usize {
    let taps = wavelet.filter_len();
    if len < taps - 1 {
        return 0;
    }
    let ratio = len / (taps - 1);
    (usize::BITS - 1 - ratio.leading_zeros()) as usize
}

// =============================================================================
// 1D Kernels
// =============================================================================

/// Single-level periodized analysis of one lane.
///
/// Odd-length input is extended by repeating its last sample. Writes
/// `ceil(n/2)` coefficients into each of `approx` and `detail`.
fn analyze_lane<F: DenoiseFloat>(
    input: &[F],
    bank: &FilterBank<F>,
    approx: &mut [F],
    detail: &mut [F],
) {
    let n = input.len();
    let padded_len = n + n % 2;
    let half = padded_len / 2;
    let sample = |idx: usize| input[(idx % padded_len).min(n - 1)];

    for i in 0..half {
        let mut lo_sum = F::zero();
        let mut hi_sum = F::zero();
        for (k, (&lo, &hi)) in bank.lo.iter().zip(bank.hi.iter()).enumerate() {
            let x = sample(2 * i + k);
            lo_sum += lo * x;
            hi_sum += hi * x;
        }
        approx[i] = lo_sum;
        detail[i] = hi_sum;
    }
}

/// Single-level periodized synthesis of one lane, cropped to `output.len()`.
///
/// `scratch` must hold the even-extended length (`approx.len() * 2`).
fn synthesize_lane<F: DenoiseFloat>(
    approx: &[F],
    detail: &[F],
    bank: &FilterBank<F>,
    scratch: &mut [F],
    output: &mut [F],
) {
    let padded_len = scratch.len();
    scratch.iter_mut().for_each(|v| *v = F::zero());

    for (i, (&a, &d)) in approx.iter().zip(detail.iter()).enumerate() {
        for (k, (&lo, &hi)) in bank.lo.iter().zip(bank.hi.iter()).enumerate() {
            scratch[(2 * i + k) % padded_len] += lo * a + hi * d;
        }
    }

    let n = output.len();
    output.copy_from_slice(&scratch[..n]);
}

/// Analyze every lane along `axis`, returning (low, high) halves.
fn analyze_axis<F: DenoiseFloat>(
    input: ArrayView2<F>,
    axis: Axis,
    bank: &FilterBank<F>,
) -> (Array2<F>, Array2<F>) {
    let (rows, cols) = input.dim();
    let len = input.len_of(axis);
    let half = (len + 1) / 2;
    let out_dim = if axis == Axis(0) { (half, cols) } else { (rows, half) };

    let mut low = Array2::zeros(out_dim);
    let mut high = Array2::zeros(out_dim);
    let mut lane_buf = Vec::with_capacity(len);
    let mut lo_buf = vec![F::zero(); half];
    let mut hi_buf = vec![F::zero(); half];

    for ((lane, mut lo_lane), mut hi_lane) in input
        .lanes(axis)
        .into_iter()
        .zip(low.lanes_mut(axis))
        .zip(high.lanes_mut(axis))
    {
        lane_buf.clear();
        lane_buf.extend(lane.iter().copied());
        analyze_lane(&lane_buf, bank, &mut lo_buf, &mut hi_buf);
        lo_lane.iter_mut().zip(&lo_buf).for_each(|(d, &s)| *d = s);
        hi_lane.iter_mut().zip(&hi_buf).for_each(|(d, &s)| *d = s);
    }

    (low, high)
}

/// Inverse of [`analyze_axis`]; `len` is the original length along `axis`.
fn synthesize_axis<F: DenoiseFloat>(
    low: ArrayView2<F>,
    high: ArrayView2<F>,
    axis: Axis,
    len: usize,
    bank: &FilterBank<F>,
) -> Array2<F> {
    let (rows, cols) = low.dim();
    let half = low.len_of(axis);
    let out_dim = if axis == Axis(0) { (len, cols) } else { (rows, len) };

    let mut output = Array2::zeros(out_dim);
    let mut lo_buf = Vec::with_capacity(half);
    let mut hi_buf = Vec::with_capacity(half);
    let mut scratch = vec![F::zero(); 2 * half];
    let mut out_buf = vec![F::zero(); len];

    for ((lo_lane, hi_lane), mut out_lane) in low
        .lanes(axis)
        .into_iter()
        .zip(high.lanes(axis))
        .zip(output.lanes_mut(axis))
    {
        lo_buf.clear();
        lo_buf.extend(lo_lane.iter().copied());
        hi_buf.clear();
        hi_buf.extend(hi_lane.iter().copied());
        synthesize_lane(&lo_buf, &hi_buf, bank, &mut scratch, &mut out_buf);
        out_lane.iter_mut().zip(&out_buf).for_each(|(d, &s)| *d = s);
    }

    output
}

// =============================================================================
// Coefficient Containers
// =============================================================================

/// The three directional detail subbands of one level.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailSubbands<F: DenoiseFloat> {
    pub horizontal: Array2<F>,
    pub vertical: Array2<F>,
    pub diagonal: Array2<F>,
}

impl<F: DenoiseFloat> DetailSubbands<F> {
    /// Total coefficient count across the three subbands.
    pub fn len(&self) -> usize {
        self.horizontal.len() + self.vertical.len() + self.diagonal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate the subbands in horizontal, vertical, diagonal order.
    pub fn iter(&self) -> impl Iterator<Item = &Array2<F>> {
        [&self.horizontal, &self.vertical, &self.diagonal].into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Array2<F>> {
        [&mut self.horizontal, &mut self.vertical, &mut self.diagonal].into_iter()
    }

    /// Sum of squared detail coefficients.
    pub fn energy(&self) -> F {
        self.iter()
            .flat_map(|band| band.iter())
            .map(|&x| x * x)
            .sum()
    }
}

/// One decomposition level: its detail subbands and the shape of the
/// approximation it was computed from (needed to crop on reconstruction).
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletLevel<F: DenoiseFloat> {
    pub details: DetailSubbands<F>,
    input_shape: (usize, usize),
}

impl<F: DenoiseFloat> WaveletLevel<F> {
    /// Shape of the signal this level decomposed.
    pub fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }
}

/// Multi-level decomposition of a single-channel image.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletCoefficients<F: DenoiseFloat> {
    wavelet: Wavelet,
    /// Coarsest approximation subband.
    pub approximation: Array2<F>,
    /// Levels ordered finest (index 0) to coarsest; never empty.
    levels: Vec<WaveletLevel<F>>,
}

impl<F: DenoiseFloat> WaveletCoefficients<F> {
    pub fn wavelet(&self) -> Wavelet {
        self.wavelet
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Every level, finest first.
    pub fn levels(&self) -> &[WaveletLevel<F>] {
        &self.levels
    }

    /// Level `index`, counting from the finest.
    pub fn level(&self, index: usize) -> Option<&WaveletLevel<F>> {
        self.levels.get(index)
    }

    /// Finest-scale details, where noise dominates.
    pub fn finest(&self) -> &DetailSubbands<F> {
        &self.levels[0].details
    }

    /// Shape of the image that was decomposed.
    pub fn original_shape(&self) -> (usize, usize) {
        self.levels[0].input_shape
    }

    /// Mutable access to every detail subband, finest level first.
    pub fn details_mut(&mut self) -> impl Iterator<Item = &mut DetailSubbands<F>> {
        self.levels.iter_mut().map(|level| &mut level.details)
    }
}

// =============================================================================
// Transform
// =============================================================================

/// Decompose a 2D image into `levels` wavelet levels.
///
/// Each level transforms the previous level's approximation. Fails with
/// [`DenoiseError::InvalidParameter`] when `levels` is zero and
/// [`DenoiseError::ShapeMismatch`] on an empty image.
pub fn forward<F: DenoiseFloat>(
    image: ArrayView2<F>,
    wavelet: Wavelet,
    levels: usize,
) -> Result<WaveletCoefficients<F>> {
    if levels == 0 {
        return Err(DenoiseError::InvalidParameter(
            "wavelet levels must be > 0".to_string(),
        ));
    }
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 {
        return Err(DenoiseError::ShapeMismatch(format!(
            "cannot decompose a {}x{} image",
            rows, cols
        )));
    }

    let bank = FilterBank::new(wavelet);
    let mut approx = image.to_owned();
    let mut decomposed = Vec::with_capacity(levels);

    for _ in 0..levels {
        let input_shape = approx.dim();

        // Rows first (axis 1), then columns (axis 0) of each half.
        let (row_lo, row_hi) = analyze_axis(approx.view(), Axis(1), &bank);
        let (ll, lh) = analyze_axis(row_lo.view(), Axis(0), &bank);
        let (hl, hh) = analyze_axis(row_hi.view(), Axis(0), &bank);

        decomposed.push(WaveletLevel {
            details: DetailSubbands {
                horizontal: lh,
                vertical: hl,
                diagonal: hh,
            },
            input_shape,
        });
        approx = ll;
    }

    Ok(WaveletCoefficients {
        wavelet,
        approximation: approx,
        levels: decomposed,
    })
}

/// Reconstruct the image from its (possibly modified) coefficients.
pub fn inverse<F: DenoiseFloat>(coeffs: &WaveletCoefficients<F>) -> Array2<F> {
    let bank = FilterBank::new(coeffs.wavelet);
    let mut approx = coeffs.approximation.clone();

    for level in coeffs.levels.iter().rev() {
        let (rows, cols) = level.input_shape;
        let details = &level.details;

        let row_lo = synthesize_axis(
            approx.view(),
            details.horizontal.view(),
            Axis(0),
            rows,
            &bank,
        );
        let row_hi = synthesize_axis(
            details.vertical.view(),
            details.diagonal.view(),
            Axis(0),
            rows,
            &bank,
        );
        approx = synthesize_axis(row_lo.view(), row_hi.view(), Axis(1), cols, &bank);
    }

    approx
}
