//! Image Denoising Core Library
//!
//! Pure Rust implementation of noise estimation and three denoising families
//! for grayscale and color images: Chambolle total-variation minimization,
//! bilateral filtering and wavelet coefficient thresholding. This crate
//! contains all algorithm logic without Python bindings.
//!
//! Every operation is a pure function over an [`ImageBuffer`] and an explicit
//! configuration value; nothing reads global state.

pub mod bilateral;
pub mod color;
pub mod error;
pub mod float_trait;
pub mod image;
pub mod noise_estimation;
pub mod synthetic;
pub mod tv;
pub mod wavelet;
pub mod wavelet_denoise;

// Re-export commonly used types at the crate root
pub use bilateral::{denoise_bilateral, BilateralConfig};
pub use color::{rgb_to_ycbcr, ycbcr_to_rgb};
pub use error::{DenoiseError, Result};
pub use float_trait::DenoiseFloat;
pub use image::ImageBuffer;
pub use noise_estimation::{estimate_noise_sigma, NoiseEstimate};
pub use synthetic::add_gaussian_noise;
pub use tv::{denoise_tv_chambolle, total_variation, TvConfig};
pub use wavelet::{Wavelet, WaveletCoefficients};
pub use wavelet_denoise::{denoise_wavelet, ThresholdMethod, ThresholdMode, WaveletDenoiseConfig};
