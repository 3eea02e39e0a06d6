//! Scenario tests spanning noise synthesis, estimation and all denoisers.

use denoise_core::{
    add_gaussian_noise, denoise_bilateral, denoise_tv_chambolle, denoise_wavelet,
    estimate_noise_sigma, total_variation, BilateralConfig, ImageBuffer, NoiseEstimate,
    ThresholdMethod, ThresholdMode, TvConfig, WaveletDenoiseConfig,
};
use ndarray::Array3;

fn flat_gray_scene() -> (ImageBuffer<f64>, ImageBuffer<f64>) {
    let clean = ImageBuffer::from_elem(64, 64, 3, 0.5).unwrap();
    let noisy = add_gaussian_noise(&clean, 0.1, 2024, false).unwrap();
    (clean, noisy)
}

fn smooth_scene(size: usize) -> ImageBuffer<f64> {
    let s = size as f64;
    let data = Array3::from_shape_fn((size, size, 3), |(r, c, ch)| {
        0.3 + 0.3 * (r as f64 / s) + 0.1 * (c as f64 / s) + 0.05 * ch as f64
    });
    ImageBuffer::new(data).unwrap()
}

#[test]
fn all_denoisers_reduce_error_on_flat_image() {
    let (clean, noisy) = flat_gray_scene();
    let mse_noisy = noisy.mean_squared_error(&clean).unwrap();

    let tv = denoise_tv_chambolle(&noisy, &TvConfig::default()).unwrap();
    let bilateral = denoise_bilateral(&noisy, &BilateralConfig::new(0.2, 2.0)).unwrap();
    let wavelet = denoise_wavelet(
        &noisy,
        &WaveletDenoiseConfig::new(ThresholdMode::Soft, false),
    )
    .unwrap();

    for (name, out) in [("tv", &tv), ("bilateral", &bilateral), ("wavelet", &wavelet)] {
        assert_eq!(out.dim(), noisy.dim(), "{} changed shape", name);
        let mse = out.mean_squared_error(&clean).unwrap();
        assert!(
            mse < mse_noisy,
            "{}: MSE {} not below noisy MSE {}",
            name,
            mse,
            mse_noisy
        );
    }
}

#[test]
fn noise_level_recovered_within_tolerance() {
    let sigma = 0.155;
    let clean = smooth_scene(128);
    let noisy = add_gaussian_noise(&clean, sigma, 7, false).unwrap();

    let estimate = estimate_noise_sigma(&noisy, true).unwrap();
    assert!(matches!(estimate, NoiseEstimate::Scalar(_)));
    let relative_error = (estimate.mean() - sigma).abs() / sigma;
    assert!(
        relative_error < 0.15,
        "estimate {} is {:.1}% off",
        estimate.mean(),
        relative_error * 100.0
    );
}

#[test]
fn estimated_sigma_feeds_wavelet_denoiser() {
    let clean = smooth_scene(96);
    let noisy = add_gaussian_noise(&clean, 0.08, 3, false).unwrap();
    let sigma = estimate_noise_sigma(&noisy, true).unwrap().mean();

    let config = WaveletDenoiseConfig {
        sigma: Some(sigma),
        method: ThresholdMethod::BayesShrink,
        ..Default::default()
    };
    let out = denoise_wavelet(&noisy, &config).unwrap();
    assert!(out.mean_squared_error(&clean).unwrap() < noisy.mean_squared_error(&clean).unwrap());
}

#[test]
fn wavelet_in_both_color_spaces() {
    let clean = smooth_scene(64);
    let noisy = add_gaussian_noise(&clean, 0.1, 99, false).unwrap();
    let mse_noisy = noisy.mean_squared_error(&clean).unwrap();

    for convert in [true, false] {
        let config = WaveletDenoiseConfig::new(ThresholdMode::Soft, convert);
        let out = denoise_wavelet(&noisy, &config).unwrap();
        assert_eq!(out.dim(), noisy.dim());
        assert!(out.mean_squared_error(&clean).unwrap() < mse_noisy);
    }
}

#[test]
fn stronger_tv_weight_gives_smoother_output() {
    let (_, noisy) = flat_gray_scene();
    let light = denoise_tv_chambolle(&noisy, &TvConfig::with_weight(0.1)).unwrap();
    let heavy = denoise_tv_chambolle(&noisy, &TvConfig::with_weight(0.2)).unwrap();

    let tv_noisy = total_variation(&noisy);
    let tv_light = total_variation(&light);
    let tv_heavy = total_variation(&heavy);
    assert!(tv_light < tv_noisy);
    assert!(tv_heavy < tv_light, "{} >= {}", tv_heavy, tv_light);
}

#[test]
fn clipped_noise_stays_in_unit_range_through_denoising() {
    let clean = smooth_scene(48);
    let noisy = add_gaussian_noise(&clean, 0.155, 5, true).unwrap();
    assert!(noisy.view().iter().all(|&x| (0.0..=1.0).contains(&x)));

    // bilateral output is a weighted mean of input samples
    let bilateral = denoise_bilateral(&noisy, &BilateralConfig::new(0.1, 3.0)).unwrap();
    assert!(bilateral
        .view()
        .iter()
        .all(|&x| (-1e-12..=1.0 + 1e-12).contains(&x)));
}
