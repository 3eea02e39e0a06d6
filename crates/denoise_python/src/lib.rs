//! PyO3 Python bindings for the denoising core.
//!
//! This crate provides thin Python bindings for the denoise_core library.
//! All algorithm logic is in denoise_core; this crate only handles
//! Python/NumPy type conversions. Images are `(height, width, channel)`
//! float64 arrays with 1 or 3 channels.

use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use denoise_core::{
    add_gaussian_noise, denoise_bilateral as bilateral_impl, denoise_tv_chambolle as tv_impl,
    denoise_wavelet as wavelet_impl, estimate_noise_sigma, BilateralConfig, DenoiseError,
    ImageBuffer, NoiseEstimate, ThresholdMethod, ThresholdMode, TvConfig, Wavelet,
    WaveletDenoiseConfig,
};

fn to_py_err(e: DenoiseError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn to_image(image: PyReadonlyArray3<f64>) -> PyResult<ImageBuffer<f64>> {
    ImageBuffer::new(image.as_array().to_owned()).map_err(to_py_err)
}

fn parse_wavelet(name: &str) -> PyResult<Wavelet> {
    match name.to_ascii_lowercase().as_str() {
        "haar" | "db1" => Ok(Wavelet::Haar),
        "db2" => Ok(Wavelet::Db2),
        "db4" => Ok(Wavelet::Db4),
        other => Err(PyValueError::new_err(format!(
            "unsupported wavelet '{}', expected one of haar, db2, db4",
            other
        ))),
    }
}

/// Estimate the Gaussian noise standard deviation.
///
/// Returns a float when `average_sigmas` is true, otherwise a list with one
/// value per channel.
#[pyfunction]
#[pyo3(signature = (image, average_sigmas = true))]
pub fn estimate_sigma(
    py: Python<'_>,
    image: PyReadonlyArray3<f64>,
    average_sigmas: bool,
) -> PyResult<PyObject> {
    let image = to_image(image)?;
    let estimate = py
        .allow_threads(|| estimate_noise_sigma(&image, average_sigmas))
        .map_err(to_py_err)?;
    Ok(match estimate {
        NoiseEstimate::Scalar(sigma) => sigma.into_py(py),
        NoiseEstimate::PerChannel(sigmas) => sigmas.into_py(py),
    })
}

/// Total-variation denoising with Chambolle's projection algorithm.
#[pyfunction]
#[pyo3(signature = (image, weight = 0.1, max_iterations = 200, tolerance = 1e-4))]
pub fn denoise_tv_chambolle<'py>(
    py: Python<'py>,
    image: PyReadonlyArray3<f64>,
    weight: f64,
    max_iterations: usize,
    tolerance: f64,
) -> PyResult<&'py PyArray3<f64>> {
    let image = to_image(image)?;
    let config = TvConfig {
        weight,
        max_iterations,
        tolerance,
    };
    let output = py
        .allow_threads(|| tv_impl(&image, &config))
        .map_err(to_py_err)?;
    Ok(output.into_array().into_pyarray(py))
}

/// Edge-preserving bilateral filter.
///
/// `sigma_color = None` uses the standard deviation of the image.
#[pyfunction]
#[pyo3(signature = (image, sigma_color = None, sigma_spatial = 1.0, window_radius = None))]
pub fn denoise_bilateral<'py>(
    py: Python<'py>,
    image: PyReadonlyArray3<f64>,
    sigma_color: Option<f64>,
    sigma_spatial: f64,
    window_radius: Option<usize>,
) -> PyResult<&'py PyArray3<f64>> {
    let image = to_image(image)?;
    let config = BilateralConfig {
        sigma_color,
        sigma_spatial,
        window_radius,
    };
    let output = py
        .allow_threads(|| bilateral_impl(&image, &config))
        .map_err(to_py_err)?;
    Ok(output.into_array().into_pyarray(py))
}

/// Wavelet-threshold denoising.
#[pyfunction]
#[pyo3(signature = (
    image,
    mode = "soft",
    convert_to_ycbcr = false,
    wavelet = "db2",
    method = "VisuShrink",
    wavelet_levels = None,
    sigma = None,
))]
#[allow(clippy::too_many_arguments)]
pub fn denoise_wavelet<'py>(
    py: Python<'py>,
    image: PyReadonlyArray3<f64>,
    mode: &str,
    convert_to_ycbcr: bool,
    wavelet: &str,
    method: &str,
    wavelet_levels: Option<usize>,
    sigma: Option<f64>,
) -> PyResult<&'py PyArray3<f64>> {
    let image = to_image(image)?;
    let config = WaveletDenoiseConfig {
        mode: mode.parse::<ThresholdMode>().map_err(to_py_err)?,
        method: method.parse::<ThresholdMethod>().map_err(to_py_err)?,
        convert_to_ycbcr,
        wavelet: parse_wavelet(wavelet)?,
        levels: wavelet_levels,
        sigma,
    };
    let output = py
        .allow_threads(|| wavelet_impl(&image, &config))
        .map_err(to_py_err)?;
    Ok(output.into_array().into_pyarray(py))
}

/// Add seeded Gaussian noise, clipping to [0, 1] when `clip` is true.
#[pyfunction]
#[pyo3(signature = (image, sigma, seed = 0, clip = true))]
pub fn random_noise<'py>(
    py: Python<'py>,
    image: PyReadonlyArray3<f64>,
    sigma: f64,
    seed: u64,
    clip: bool,
) -> PyResult<&'py PyArray3<f64>> {
    let image = to_image(image)?;
    let output = py
        .allow_threads(|| add_gaussian_noise(&image, sigma, seed, clip))
        .map_err(to_py_err)?;
    Ok(output.into_array().into_pyarray(py))
}

/// Image denoising Rust accelerator module
#[pymodule]
fn denoise_rust(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(estimate_sigma, m)?)?;
    m.add_function(wrap_pyfunction!(denoise_tv_chambolle, m)?)?;
    m.add_function(wrap_pyfunction!(denoise_bilateral, m)?)?;
    m.add_function(wrap_pyfunction!(denoise_wavelet, m)?)?;
    m.add_function(wrap_pyfunction!(random_noise, m)?)?;
    Ok(())
}
