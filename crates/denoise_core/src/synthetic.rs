//! Synthetic Gaussian noise for test fixtures and demos.

use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use crate::error::{DenoiseError, Result};
use crate::float_trait::DenoiseFloat;
use crate::image::ImageBuffer;

/// Add zero-mean Gaussian noise of standard deviation `sigma`.
///
/// The output is deterministic for a given `seed`. With `clip` every sample
/// is clamped to `[0, 1]` afterwards.
pub fn add_gaussian_noise<F: DenoiseFloat>(
    image: &ImageBuffer<F>,
    sigma: f64,
    seed: u64,
    clip: bool,
) -> Result<ImageBuffer<F>> {
    if !(sigma > 0.0) || !sigma.is_finite() {
        return Err(DenoiseError::InvalidParameter(format!(
            "noise sigma must be a finite value > 0, got {}",
            sigma
        )));
    }
    let normal = Normal::new(0.0, sigma)
        .map_err(|e| DenoiseError::InvalidParameter(format!("noise distribution: {}", e)))?;
    let mut rng = StdRng::seed_from_u64(seed);

    let noisy = image
        .view()
        .mapv(|x| x + F::from_f64_c(normal.sample(&mut rng)));
    let noisy = ImageBuffer::new(noisy)?;

    if clip {
        Ok(noisy.clamp(F::zero(), F::one()))
    } else {
        Ok(noisy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_statistics() {
        let clean = ImageBuffer::from_elem(128, 128, 3, 0.5f64).unwrap();
        let noisy = add_gaussian_noise(&clean, 0.1, 7, false).unwrap();

        let mse = noisy.mean_squared_error(&clean).unwrap();
        assert!((mse.sqrt() - 0.1).abs() < 0.005, "rms {}", mse.sqrt());
        assert!((noisy.mean() - 0.5).abs() < 0.005);
    }

    #[test]
    fn test_deterministic_by_seed() {
        let clean = ImageBuffer::from_elem(16, 16, 1, 0.5f64).unwrap();
        let a = add_gaussian_noise(&clean, 0.2, 11, false).unwrap();
        let b = add_gaussian_noise(&clean, 0.2, 11, false).unwrap();
        let c = add_gaussian_noise(&clean, 0.2, 12, false).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_clip_bounds_output() {
        let clean = ImageBuffer::from_elem(32, 32, 3, 0.95f32).unwrap();
        let noisy = add_gaussian_noise(&clean, 0.3, 1, true).unwrap();
        assert!(noisy.view().iter().all(|&x| (0.0..=1.0).contains(&x)));

        let unclipped = add_gaussian_noise(&clean, 0.3, 1, false).unwrap();
        assert!(unclipped.view().iter().any(|&x| x > 1.0));
    }

    #[test]
    fn test_invalid_sigma_rejected() {
        let clean = ImageBuffer::from_elem(4, 4, 1, 0.5f64).unwrap();
        for sigma in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                add_gaussian_noise(&clean, sigma, 0, false),
                Err(DenoiseError::InvalidParameter(_))
            ));
        }
    }
}
