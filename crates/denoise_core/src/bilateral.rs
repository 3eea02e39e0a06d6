//! Edge-preserving bilateral filter.
//!
//! Every output pixel is a normalized weighted mean of its window:
//!
//! ```text
//! w(q) = exp(-|p - q|² / (2 σs²)) · exp(-||I(p) - I(q)||² / (2 σc²))
//! ```
//!
//! The range term uses the Euclidean distance across all channels, so an edge
//! in any channel is preserved. Pixels outside the image are read from the
//! nearest edge pixel (clamp-to-edge). A window wider than the image is
//! truncated to the image's larger dimension.

use ndarray::{Array3, ArrayView3, ArrayViewMut2, Axis};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{DenoiseError, Result};
use crate::float_trait::DenoiseFloat;
use crate::image::ImageBuffer;

// =============================================================================
// Constants
// =============================================================================

/// Default spatial standard deviation in pixels.
const DEFAULT_SIGMA_SPATIAL: f64 = 1.0;

/// Window half-width in units of `sigma_spatial` when no radius is given.
const WINDOW_TRUNCATE: f64 = 3.0;

/// Smallest automatically derived window radius (a 5×5 window).
const MIN_AUTO_RADIUS: usize = 2;

// =============================================================================
// Configuration
// =============================================================================

/// Parameters for [`denoise_bilateral`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilateralConfig<F: DenoiseFloat> {
    /// Range (color) standard deviation. `None` uses the standard deviation
    /// of the input image. Larger values blur across larger color
    /// differences. Default: None
    pub sigma_color: Option<F>,
    /// Spatial standard deviation in pixels. Default: 1.0
    pub sigma_spatial: F,
    /// Window half-width. `None` derives `max(2, ceil(3 · sigma_spatial))`.
    /// Default: None
    pub window_radius: Option<usize>,
}

impl<F: DenoiseFloat> Default for BilateralConfig<F> {
    fn default() -> Self {
        Self {
            sigma_color: None,
            sigma_spatial: F::from_f64_c(DEFAULT_SIGMA_SPATIAL),
            window_radius: None,
        }
    }
}

impl<F: DenoiseFloat> BilateralConfig<F> {
    pub fn new(sigma_color: F, sigma_spatial: F) -> Self {
        Self {
            sigma_color: Some(sigma_color),
            sigma_spatial,
            window_radius: None,
        }
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if let Some(sigma_color) = self.sigma_color {
            if !(sigma_color > F::zero()) || !sigma_color.is_finite() {
                return Err(DenoiseError::InvalidParameter(format!(
                    "sigma_color must be a finite value > 0, got {:?}",
                    sigma_color
                )));
            }
        }
        if !(self.sigma_spatial > F::zero()) || !self.sigma_spatial.is_finite() {
            return Err(DenoiseError::InvalidParameter(format!(
                "sigma_spatial must be a finite value > 0, got {:?}",
                self.sigma_spatial
            )));
        }
        if self.window_radius == Some(0) {
            return Err(DenoiseError::InvalidParameter(
                "window_radius must be > 0".to_string(),
            ));
        }
        let radius = self.resolved_radius();
        if window_area(radius).is_none() {
            return Err(DenoiseError::InvalidParameter(format!(
                "window radius {} is too large",
                radius
            )));
        }
        Ok(())
    }

    /// Window half-width actually used.
    pub fn resolved_radius(&self) -> usize {
        self.window_radius.unwrap_or_else(|| {
            let r = (F::from_f64_c(WINDOW_TRUNCATE) * self.sigma_spatial)
                .ceil()
                .to_usize()
                .unwrap_or(usize::MAX);
            r.max(MIN_AUTO_RADIUS)
        })
    }
}

// =============================================================================
// Kernel
// =============================================================================

/// Number of samples in a `(2r+1)²` window, `None` on overflow.
fn window_area(radius: usize) -> Option<usize> {
    let side = radius.checked_mul(2)?.checked_add(1)?;
    side.checked_mul(side)
}

/// Spatial Gaussian weights for every offset in the `(2r+1)²` window,
/// row-major. Computed per call and dropped with it.
fn spatial_kernel<F: DenoiseFloat>(radius: usize, sigma_spatial: F) -> Vec<F> {
    let size = 2 * radius + 1;
    let inv_two_sigma2 = F::one() / (F::from_f64_c(2.0) * sigma_spatial * sigma_spatial);
    let mut kernel = Vec::with_capacity(size * size);
    for dr in 0..size {
        for dc in 0..size {
            let y = F::usize_as(dr) - F::usize_as(radius);
            let x = F::usize_as(dc) - F::usize_as(radius);
            kernel.push((-(x * x + y * y) * inv_two_sigma2).exp());
        }
    }
    kernel
}

#[inline(always)]
fn clamp_index(idx: isize, len: usize) -> usize {
    idx.clamp(0, len as isize - 1) as usize
}

/// Filter one output row.
fn filter_row<F: DenoiseFloat>(
    input: ArrayView3<F>,
    row: usize,
    radius: usize,
    kernel: &[F],
    inv_two_sigma_color2: F,
    mut out_row: ArrayViewMut2<F>,
) {
    let (height, width, channels) = input.dim();
    let mut acc = vec![F::zero(); channels];

    for col in 0..width {
        acc.iter_mut().for_each(|a| *a = F::zero());
        let mut weight_sum = F::zero();
        let center = input.slice(ndarray::s![row, col, ..]);

        let mut k = 0;
        for dr in -(radius as isize)..=(radius as isize) {
            let r = clamp_index(row as isize + dr, height);
            for dc in -(radius as isize)..=(radius as isize) {
                let c = clamp_index(col as isize + dc, width);
                let neighbor = input.slice(ndarray::s![r, c, ..]);

                let mut dist2 = F::zero();
                for ch in 0..channels {
                    let d = neighbor[ch] - center[ch];
                    dist2 += d * d;
                }
                // identical samples weigh 1 even when 1/σc² overflows
                let range = if dist2 > F::zero() {
                    (-dist2 * inv_two_sigma_color2).exp()
                } else {
                    F::one()
                };
                let w = kernel[k] * range;
                k += 1;

                weight_sum += w;
                for ch in 0..channels {
                    acc[ch] += w * neighbor[ch];
                }
            }
        }

        // the center pixel always contributes weight 1, so weight_sum >= 1
        for ch in 0..channels {
            out_row[[col, ch]] = acc[ch] / weight_sum;
        }
    }
}

/// Bilateral-filter an image.
///
/// Rows are filtered in parallel; each output pixel depends only on the
/// read-only input.
pub fn denoise_bilateral<F: DenoiseFloat>(
    image: &ImageBuffer<F>,
    config: &BilateralConfig<F>,
) -> Result<ImageBuffer<F>> {
    config.validate()?;
    image.ensure_finite("bilateral input")?;

    // A flat image has zero spread; any positive sigma then leaves it unchanged.
    let sigma_color = config
        .sigma_color
        .unwrap_or_else(|| image.std_dev().max(F::TINY));
    let radius = config
        .resolved_radius()
        .min(image.height().max(image.width()));
    debug!(
        sigma_color = sigma_color.as_f64(),
        sigma_spatial = config.sigma_spatial.as_f64(),
        radius,
        "bilateral filter"
    );

    let kernel = spatial_kernel(radius, config.sigma_spatial);
    let inv_two_sigma_color2 = F::one() / (F::from_f64_c(2.0) * sigma_color * sigma_color);

    let input = image.view();
    let mut output = Array3::<F>::zeros(image.dim());
    let out_rows: Vec<_> = output.axis_iter_mut(Axis(0)).collect();

    out_rows
        .into_par_iter()
        .enumerate()
        .for_each(|(row, out_row)| {
            filter_row(input, row, radius, &kernel, inv_two_sigma_color2, out_row);
        });

    let output = ImageBuffer::new(output)?;
    output.ensure_finite("bilateral output")?;
    Ok(output)
}
