//! Gaussian noise level estimation from wavelet detail coefficients.
//!
//! Each channel is decomposed with a single-level Daubechies-2 transform and
//! the noise standard deviation is taken as `median(|HH|) / 0.6745`, where
//! `HH` is the finest diagonal subband (Donoho & Johnstone, 1994). Natural
//! images are sparse in that subband, so its median magnitude is dominated by
//! noise; 0.6745 is the median absolute value of a standard normal sample.

use ndarray::ArrayView2;
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::debug;

use crate::error::Result;
use crate::float_trait::DenoiseFloat;
use crate::image::ImageBuffer;
use crate::wavelet::{self, Wavelet};

/// Median absolute deviation of a standard normal distribution.
const MAD_TO_SIGMA_DENOMINATOR: f64 = 0.6745;

/// Wavelet used for estimation.
const ESTIMATION_WAVELET: Wavelet = Wavelet::Db2;

/// Estimated noise standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseEstimate<F> {
    /// Mean of the per-channel estimates.
    Scalar(F),
    /// One estimate per channel, in channel order.
    PerChannel(Vec<F>),
}

impl<F: DenoiseFloat> NoiseEstimate<F> {
    /// Scalar value, averaging per-channel estimates if necessary.
    pub fn mean(&self) -> F {
        match self {
            NoiseEstimate::Scalar(sigma) => *sigma,
            NoiseEstimate::PerChannel(sigmas) => {
                sigmas.iter().copied().sum::<F>() / F::usize_as(sigmas.len().max(1))
            }
        }
    }

    /// Per-channel values; a scalar estimate yields a single element.
    pub fn as_slice(&self) -> &[F] {
        match self {
            NoiseEstimate::Scalar(sigma) => std::slice::from_ref(sigma),
            NoiseEstimate::PerChannel(sigmas) => sigmas,
        }
    }
}

/// Median of a slice, averaging the two middle values for even lengths.
/// The slice is reordered. Returns zero for empty input.
pub(crate) fn median_of_slice<F: DenoiseFloat>(data: &mut [F]) -> F {
    let len = data.len();
    if len == 0 {
        return F::zero();
    }
    let mid = len / 2;
    let cmp = |a: &F, b: &F| a.partial_cmp(b).unwrap_or(Ordering::Equal);

    // select_nth_unstable finds the median in O(n)
    let (left, &mut median, _) = data.select_nth_unstable_by(mid, cmp);

    if len % 2 == 1 {
        median
    } else {
        // everything left of mid is <= median; its maximum is the lower middle
        let lower = left
            .iter()
            .copied()
            .fold(F::neg_infinity(), |a, b| if b > a { b } else { a });
        (lower + median) / F::from_f64_c(2.0)
    }
}

/// Robust noise sigma from a detail subband: `median(|d|) / 0.6745`.
///
/// A subband of zeros yields zero rather than an error.
pub fn sigma_from_detail<F: DenoiseFloat>(detail: ArrayView2<F>) -> F {
    let mut magnitudes: Vec<F> = detail.iter().map(|x| x.abs()).collect();
    median_of_slice(&mut magnitudes) / F::from_f64_c(MAD_TO_SIGMA_DENOMINATOR)
}

/// Estimate the noise sigma of a single channel.
pub fn estimate_channel_sigma<F: DenoiseFloat>(channel: ArrayView2<F>) -> Result<F> {
    let coeffs = wavelet::forward(channel, ESTIMATION_WAVELET, 1)?;
    Ok(sigma_from_detail(coeffs.finest().diagonal.view()))
}

/// Estimate the Gaussian noise standard deviation of an image.
///
/// Channels are estimated independently. With `average_channels` the
/// per-channel values are averaged into [`NoiseEstimate::Scalar`]; otherwise
/// [`NoiseEstimate::PerChannel`] is returned. A constant channel has an
/// estimate of exactly zero.
pub fn estimate_noise_sigma<F: DenoiseFloat>(
    image: &ImageBuffer<F>,
    average_channels: bool,
) -> Result<NoiseEstimate<F>> {
    image.ensure_finite("noise estimation input")?;

    let sigmas = (0..image.channels())
        .into_par_iter()
        .map(|ch| estimate_channel_sigma(image.channel(ch)))
        .collect::<Result<Vec<F>>>()?;

    debug!(?sigmas, average_channels, "estimated noise sigma");

    let estimate = NoiseEstimate::PerChannel(sigmas);
    if average_channels {
        Ok(NoiseEstimate::Scalar(estimate.mean()))
    } else {
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DenoiseError;
    use ndarray::{Array2, Array3};
    use rand::prelude::*;
    use rand_distr::{Distribution, Normal};

    fn noisy_smooth_image(h: usize, w: usize, sigma: f64, seed: u64) -> ImageBuffer<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, sigma).unwrap();
        let data = Array3::from_shape_fn((h, w, 3), |(r, c, ch)| {
            let base = 0.3 + 0.4 * (r as f64 / h as f64) + 0.1 * ch as f64;
            base + 0.05 * (c as f64 / w as f64) + normal.sample(&mut rng)
        });
        ImageBuffer::new(data).unwrap()
    }

    #[test]
    fn test_median_odd_and_even() {
        let mut odd = vec![5.0f64, 1.0, 3.0];
        assert_eq!(median_of_slice(&mut odd), 3.0);

        let mut even = vec![4.0f64, 1.0, 3.0, 2.0];
        assert_eq!(median_of_slice(&mut even), 2.5);

        let mut empty: Vec<f32> = vec![];
        assert_eq!(median_of_slice(&mut empty), 0.0);
    }

    #[test]
    fn test_sigma_from_detail_of_zeros_is_zero() {
        let zeros = Array2::<f32>::zeros((8, 8));
        assert_eq!(sigma_from_detail(zeros.view()), 0.0);
    }

    #[test]
    fn test_constant_image_yields_zero() {
        let img = ImageBuffer::from_elem(32, 32, 3, 0.5f64).unwrap();
        let est = estimate_noise_sigma(&img, true).unwrap();
        assert!(est.mean().abs() < 1e-12, "got {}", est.mean());
    }

    #[test]
    fn test_known_sigma_recovered() {
        let sigma_true = 0.1;
        let img = noisy_smooth_image(128, 128, sigma_true, 42);
        let est = estimate_noise_sigma(&img, true).unwrap().mean();
        let error = (est - sigma_true).abs() / sigma_true;
        assert!(error < 0.10, "Error {:.2}% exceeds 10% tolerance", error * 100.0);
    }

    #[test]
    fn test_per_channel_estimates() {
        let mut rng = StdRng::seed_from_u64(3);
        let sigmas: [f64; 3] = [0.02, 0.05, 0.1];
        let normals: Vec<_> = sigmas.iter().map(|&s| Normal::new(0.0, s).unwrap()).collect();
        let data = Array3::from_shape_fn((96, 96, 3), |(_, _, ch)| {
            0.5 + normals[ch].sample(&mut rng)
        });
        let img = ImageBuffer::new(data).unwrap();

        let est = estimate_noise_sigma(&img, false).unwrap();
        let per_channel = est.as_slice();
        assert_eq!(per_channel.len(), 3);
        for (&e, &s) in per_channel.iter().zip(sigmas.iter()) {
            assert!((e - s).abs() / s < 0.15, "estimate {} for sigma {}", e, s);
        }
        assert!(per_channel[0] < per_channel[1] && per_channel[1] < per_channel[2]);
    }

    #[test]
    fn test_relative_noise_levels() {
        let low = noisy_smooth_image(64, 64, 0.01, 42);
        let high = noisy_smooth_image(64, 64, 0.10, 42);

        let est_low = estimate_noise_sigma(&low, true).unwrap().mean();
        let est_high = estimate_noise_sigma(&high, true).unwrap().mean();

        let ratio = est_high / est_low;
        assert!(ratio > 7.0 && ratio < 13.0, "Expected ratio ~10, got {}", ratio);
    }

    #[test]
    fn test_f32_support() {
        let img64 = noisy_smooth_image(96, 96, 0.05, 999);
        let img = ImageBuffer::new(img64.view().mapv(|x| x as f32)).unwrap();
        let est = estimate_noise_sigma(&img, true).unwrap().mean();
        assert!((est - 0.05).abs() / 0.05 < 0.15, "f32 estimate {}", est);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let mut data = Array3::from_elem((8, 8, 1), 0.5f64);
        data[[3, 3, 0]] = f64::INFINITY;
        let img = ImageBuffer::new(data).unwrap();
        assert!(matches!(
            estimate_noise_sigma(&img, true),
            Err(DenoiseError::NumericalInstability(_))
        ));
    }
}
