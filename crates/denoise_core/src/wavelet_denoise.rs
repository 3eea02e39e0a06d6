//! Wavelet-domain denoising by detail coefficient thresholding.
//!
//! Per channel: decompose, estimate the noise sigma from the finest diagonal
//! subband, shrink every detail subband at every level, and reconstruct. The
//! approximation subband is never modified. Optionally the image is moved to
//! YCbCr first, which separates luminance noise from chrominance noise.
//!
//! ## Threshold rules
//!
//! - **VisuShrink** (Donoho & Johnstone, 1994): `σ · sqrt(2 ln N)` with `N`
//!   the number of detail coefficients at the level.
//! - **BayesShrink** (Chang, Yu & Vetterli, 2000): `σ² / σ_x` per subband,
//!   where `σ_x² = max(mean(d²) - σ², eps)` is the signal variance.

use ndarray::Array2;
use rayon::prelude::*;
use std::str::FromStr;
use tracing::debug;

use crate::color::{rgb_to_ycbcr, ycbcr_to_rgb};
use crate::error::{DenoiseError, Result};
use crate::float_trait::DenoiseFloat;
use crate::image::{self, ImageBuffer};
use crate::noise_estimation::sigma_from_detail;
use crate::wavelet::{self, max_level, Wavelet};

/// Levels subtracted from the maximum decomposition depth when the caller
/// does not choose one; the coarsest levels carry mostly image structure.
const AUTO_LEVEL_MARGIN: usize = 3;

// =============================================================================
// Types
// =============================================================================

/// How detail coefficients below the threshold are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdMode {
    /// Shrink every magnitude toward zero by the threshold, clamping at zero.
    #[default]
    Soft,
    /// Zero coefficients whose magnitude is below the threshold, keep the rest.
    Hard,
}

impl FromStr for ThresholdMode {
    type Err = DenoiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "soft" => Ok(ThresholdMode::Soft),
            "hard" => Ok(ThresholdMode::Hard),
            other => Err(DenoiseError::InvalidParameter(format!(
                "unsupported threshold mode '{}', expected 'soft' or 'hard'",
                other
            ))),
        }
    }
}

/// Rule used to derive the threshold from the noise sigma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdMethod {
    /// Universal threshold `σ · sqrt(2 ln N)` per level.
    #[default]
    VisuShrink,
    /// Adaptive `σ² / σ_x` per subband.
    BayesShrink,
}

impl FromStr for ThresholdMethod {
    type Err = DenoiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "visushrink" => Ok(ThresholdMethod::VisuShrink),
            "bayesshrink" => Ok(ThresholdMethod::BayesShrink),
            other => Err(DenoiseError::InvalidParameter(format!(
                "unsupported threshold method '{}'",
                other
            ))),
        }
    }
}

/// Parameters for [`denoise_wavelet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveletDenoiseConfig<F: DenoiseFloat> {
    /// Soft or hard thresholding. Default: Soft
    pub mode: ThresholdMode,
    /// Threshold rule. Default: VisuShrink
    pub method: ThresholdMethod,
    /// Denoise in YCbCr instead of RGB (3-channel images only). Default: false
    pub convert_to_ycbcr: bool,
    /// Wavelet basis. Default: Db2
    pub wavelet: Wavelet,
    /// Decomposition depth. `None` uses `max(max_level - 3, 1)`. Default: None
    pub levels: Option<usize>,
    /// Noise sigma. `None` estimates it per channel. Default: None
    pub sigma: Option<F>,
}

impl<F: DenoiseFloat> Default for WaveletDenoiseConfig<F> {
    fn default() -> Self {
        Self {
            mode: ThresholdMode::default(),
            method: ThresholdMethod::default(),
            convert_to_ycbcr: false,
            wavelet: Wavelet::default(),
            levels: None,
            sigma: None,
        }
    }
}

impl<F: DenoiseFloat> WaveletDenoiseConfig<F> {
    pub fn new(mode: ThresholdMode, convert_to_ycbcr: bool) -> Self {
        Self {
            mode,
            convert_to_ycbcr,
            ..Self::default()
        }
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.levels == Some(0) {
            return Err(DenoiseError::InvalidParameter(
                "levels must be > 0".to_string(),
            ));
        }
        if let Some(sigma) = self.sigma {
            if !(sigma >= F::zero()) || !sigma.is_finite() {
                return Err(DenoiseError::InvalidParameter(format!(
                    "sigma must be a finite value >= 0, got {:?}",
                    sigma
                )));
            }
        }
        Ok(())
    }

    /// Decomposition depth for an image of the given size.
    pub fn resolved_levels(&self, height: usize, width: usize) -> usize {
        self.levels.unwrap_or_else(|| {
            max_level(height.min(width), self.wavelet)
                .saturating_sub(AUTO_LEVEL_MARGIN)
                .max(1)
        })
    }
}

// =============================================================================
// Thresholding
// =============================================================================

/// Soft-threshold a coefficient: `sign(x) · max(|x| - t, 0)`.
#[inline]
pub fn soft_threshold<F: DenoiseFloat>(x: F, threshold: F) -> F {
    let magnitude = x.abs() - threshold;
    if magnitude > F::zero() {
        magnitude * x.signum()
    } else {
        F::zero()
    }
}

/// Hard-threshold a coefficient: zero when `|x| < t`.
#[inline]
pub fn hard_threshold<F: DenoiseFloat>(x: F, threshold: F) -> F {
    if x.abs() < threshold {
        F::zero()
    } else {
        x
    }
}

fn apply_threshold<F: DenoiseFloat>(band: &mut Array2<F>, threshold: F, mode: ThresholdMode) {
    match mode {
        ThresholdMode::Soft => band.mapv_inplace(|x| soft_threshold(x, threshold)),
        ThresholdMode::Hard => band.mapv_inplace(|x| hard_threshold(x, threshold)),
    }
}

/// VisuShrink threshold for a level holding `count` detail coefficients.
fn visushrink_threshold<F: DenoiseFloat>(sigma: F, count: usize) -> F {
    let log_n = F::usize_as(count.max(1)).ln();
    sigma * (F::from_f64_c(2.0) * log_n).sqrt()
}

/// BayesShrink threshold for one subband.
fn bayesshrink_threshold<F: DenoiseFloat>(band: &Array2<F>, sigma: F) -> F {
    let noise_var = sigma * sigma;
    let band_var = band.iter().map(|&x| x * x).sum::<F>() / F::usize_as(band.len().max(1));
    let signal_std = (band_var - noise_var).max(F::TINY).sqrt();
    noise_var / signal_std
}

// =============================================================================
// Entry Points
// =============================================================================

/// Denoise one channel plane.
pub fn denoise_wavelet_channel<F: DenoiseFloat>(
    channel: ndarray::ArrayView2<F>,
    config: &WaveletDenoiseConfig<F>,
) -> Result<Array2<F>> {
    config.validate()?;
    let (rows, cols) = channel.dim();
    let levels = config.resolved_levels(rows, cols);

    let mut coeffs = wavelet::forward(channel, config.wavelet, levels)?;
    let sigma = match config.sigma {
        Some(sigma) => sigma,
        None => sigma_from_detail(coeffs.finest().diagonal.view()),
    };

    for (level, details) in coeffs.details_mut().enumerate() {
        match config.method {
            ThresholdMethod::VisuShrink => {
                let threshold = visushrink_threshold(sigma, details.len());
                debug!(level, threshold = threshold.as_f64(), "visushrink threshold");
                for band in details.iter_mut() {
                    apply_threshold(band, threshold, config.mode);
                }
            }
            ThresholdMethod::BayesShrink => {
                for band in details.iter_mut() {
                    let threshold = bayesshrink_threshold(band, sigma);
                    apply_threshold(band, threshold, config.mode);
                }
            }
        }
    }

    let out = wavelet::inverse(&coeffs);
    image::ensure_finite(out.iter().copied(), "wavelet reconstruction")?;
    Ok(out)
}

/// Wavelet-threshold denoising of an image.
///
/// With `convert_to_ycbcr` the channels are denoised in YCbCr and converted
/// back; requesting this for a single-channel image is an
/// [`DenoiseError::InvalidParameter`].
pub fn denoise_wavelet<F: DenoiseFloat>(
    image: &ImageBuffer<F>,
    config: &WaveletDenoiseConfig<F>,
) -> Result<ImageBuffer<F>> {
    config.validate()?;
    image.ensure_finite("wavelet denoising input")?;

    if config.convert_to_ycbcr && image.channels() != 3 {
        return Err(DenoiseError::InvalidParameter(format!(
            "YCbCr conversion requires 3 channels, got {}",
            image.channels()
        )));
    }

    debug!(
        mode = ?config.mode,
        method = ?config.method,
        wavelet = ?config.wavelet,
        levels = config.resolved_levels(image.height(), image.width()),
        convert_to_ycbcr = config.convert_to_ycbcr,
        "wavelet denoising"
    );

    let working = if config.convert_to_ycbcr {
        rgb_to_ycbcr(image)?
    } else {
        image.clone()
    };

    let planes = (0..working.channels())
        .into_par_iter()
        .map(|ch| denoise_wavelet_channel(working.channel(ch), config))
        .collect::<Result<Vec<_>>>()?;
    let denoised = ImageBuffer::from_channels(planes)?;

    if config.convert_to_ycbcr {
        ycbcr_to_rgb(&denoised)
    } else {
        Ok(denoised)
    }
}
