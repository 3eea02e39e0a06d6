//! In-memory image buffer shared by all denoisers.
//!
//! Samples are stored as a dense `(height, width, channel)` array. Values are
//! nominally in `[0, 1]` but nothing here clamps them; callers that need
//! display-safe output use [`ImageBuffer::clamp`].

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::error::{DenoiseError, Result};
use crate::float_trait::DenoiseFloat;

/// Channel counts accepted by the denoisers (grayscale or RGB/YCbCr).
const SUPPORTED_CHANNELS: [usize; 2] = [1, 3];

/// Dense `H × W × C` floating-point image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer<F: DenoiseFloat> {
    data: Array3<F>,
}

fn check_shape(height: usize, width: usize, channels: usize) -> Result<()> {
    if height == 0 || width == 0 {
        return Err(DenoiseError::ShapeMismatch(format!(
            "image dimensions must be positive, got {}x{}",
            height, width
        )));
    }
    if !SUPPORTED_CHANNELS.contains(&channels) {
        return Err(DenoiseError::ShapeMismatch(format!(
            "expected 1 or 3 channels, got {}",
            channels
        )));
    }
    Ok(())
}

impl<F: DenoiseFloat> ImageBuffer<F> {
    /// Wrap an `(height, width, channel)` array.
    pub fn new(data: Array3<F>) -> Result<Self> {
        let (h, w, c) = data.dim();
        check_shape(h, w, c)?;
        Ok(Self { data })
    }

    pub fn zeros(height: usize, width: usize, channels: usize) -> Result<Self> {
        Self::from_elem(height, width, channels, F::zero())
    }

    /// Image with every sample set to `value`.
    pub fn from_elem(height: usize, width: usize, channels: usize, value: F) -> Result<Self> {
        check_shape(height, width, channels)?;
        Ok(Self {
            data: Array3::from_elem((height, width, channels), value),
        })
    }

    /// Single-channel image from a 2D array.
    pub fn from_gray(gray: Array2<F>) -> Result<Self> {
        let (h, w) = gray.dim();
        check_shape(h, w, 1)?;
        Ok(Self {
            data: gray.insert_axis(Axis(2)),
        })
    }

    /// Stack equally sized planes into an image, one plane per channel.
    pub fn from_channels(planes: Vec<Array2<F>>) -> Result<Self> {
        let Some(first) = planes.first() else {
            return Err(DenoiseError::ShapeMismatch(
                "at least one channel is required".to_string(),
            ));
        };
        let (h, w) = first.dim();
        check_shape(h, w, planes.len())?;

        if let Some(bad) = planes.iter().find(|p| p.dim() != (h, w)) {
            return Err(DenoiseError::ShapeMismatch(format!(
                "channel planes differ in shape: {:?} vs {:?}",
                (h, w),
                bad.dim()
            )));
        }

        let mut data = Array3::zeros((h, w, planes.len()));
        for (ch, plane) in planes.iter().enumerate() {
            data.index_axis_mut(Axis(2), ch).assign(plane);
        }
        Ok(Self { data })
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// `(height, width, channels)`.
    #[inline]
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Number of samples (`H · W · C`).
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: construction rejects empty images.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bounds-checked sample access.
    #[inline]
    pub fn get(&self, row: usize, col: usize, channel: usize) -> Option<F> {
        self.data.get((row, col, channel)).copied()
    }

    /// View of a single channel plane.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= self.channels()`.
    pub fn channel(&self, channel: usize) -> ArrayView2<'_, F> {
        self.data.index_axis(Axis(2), channel)
    }

    pub fn view(&self) -> ArrayView3<'_, F> {
        self.data.view()
    }

    pub fn as_array(&self) -> &Array3<F> {
        &self.data
    }

    pub fn into_array(self) -> Array3<F> {
        self.data
    }

    pub fn same_shape(&self, other: &Self) -> bool {
        self.dim() == other.dim()
    }

    /// Arithmetic mean over all samples.
    pub fn mean(&self) -> F {
        self.data.iter().copied().sum::<F>() / F::usize_as(self.len())
    }

    /// Population standard deviation over all samples.
    pub fn std_dev(&self) -> F {
        let mean = self.mean();
        let var = self
            .data
            .iter()
            .map(|&x| (x - mean) * (x - mean))
            .sum::<F>()
            / F::usize_as(self.len());
        var.sqrt()
    }

    /// Mean squared error against an image of identical shape.
    pub fn mean_squared_error(&self, other: &Self) -> Result<F> {
        if !self.same_shape(other) {
            return Err(DenoiseError::ShapeMismatch(format!(
                "cannot compare {:?} with {:?}",
                self.dim(),
                other.dim()
            )));
        }
        let sum = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| (a - b) * (a - b))
            .sum::<F>();
        Ok(sum / F::usize_as(self.len()))
    }

    /// Peak signal-to-noise ratio in dB for a data range of 1.0.
    ///
    /// Identical images yield `+inf`.
    pub fn psnr(&self, reference: &Self) -> Result<F> {
        let mse = self.mean_squared_error(reference)?;
        Ok(F::from_f64_c(10.0) * (F::one() / mse).log10())
    }

    /// Copy with every sample clamped to `[lo, hi]`.
    pub fn clamp(&self, lo: F, hi: F) -> Self {
        Self {
            data: self.data.mapv(|x| x.max(lo).min(hi)),
        }
    }

    /// Fail with [`DenoiseError::NumericalInstability`] if any sample is NaN
    /// or infinite. `stage` names where the check ran.
    pub fn ensure_finite(&self, stage: &str) -> Result<()> {
        ensure_finite(self.data.iter().copied(), stage)
    }
}

/// Shared NaN/Inf guard for arrays produced inside the algorithms.
pub(crate) fn ensure_finite<F: DenoiseFloat>(
    mut samples: impl Iterator<Item = F>,
    stage: &str,
) -> Result<()> {
    if samples.all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(DenoiseError::NumericalInstability(format!(
            "non-finite sample in {}",
            stage
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_rejects_unsupported_channel_counts() {
        for c in [0usize, 2, 4] {
            let err = ImageBuffer::<f32>::zeros(4, 4, c).unwrap_err();
            assert!(matches!(err, DenoiseError::ShapeMismatch(_)), "c={}", c);
        }
        assert!(ImageBuffer::<f32>::zeros(4, 4, 1).is_ok());
        assert!(ImageBuffer::<f32>::zeros(4, 4, 3).is_ok());
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(matches!(
            ImageBuffer::<f64>::zeros(0, 4, 3),
            Err(DenoiseError::ShapeMismatch(_))
        ));
        assert!(matches!(
            ImageBuffer::new(Array3::<f64>::zeros((5, 0, 1))),
            Err(DenoiseError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_bounds_checked_get() {
        let img = ImageBuffer::from_elem(2, 3, 3, 0.5f64).unwrap();
        assert_eq!(img.get(1, 2, 2), Some(0.5));
        assert_eq!(img.get(2, 0, 0), None);
        assert_eq!(img.get(0, 3, 0), None);
        assert_eq!(img.get(0, 0, 3), None);
    }

    #[test]
    fn test_from_channels_round_trips_planes() {
        let r = Array2::from_elem((3, 4), 0.1f32);
        let g = Array2::from_elem((3, 4), 0.2f32);
        let b = Array2::from_elem((3, 4), 0.3f32);
        let img = ImageBuffer::from_channels(vec![r.clone(), g, b]).unwrap();

        assert_eq!(img.dim(), (3, 4, 3));
        assert_eq!(img.channel(0), r.view());
        assert_eq!(img.get(2, 3, 2), Some(0.3));
    }

    #[test]
    fn test_from_channels_rejects_mismatched_planes() {
        let a = Array2::<f32>::zeros((3, 4));
        let b = Array2::<f32>::zeros((4, 3));
        let c = Array2::<f32>::zeros((3, 4));
        assert!(matches!(
            ImageBuffer::from_channels(vec![a, b, c]),
            Err(DenoiseError::ShapeMismatch(_))
        ));
        assert!(ImageBuffer::<f32>::from_channels(vec![]).is_err());
    }

    #[test]
    fn test_from_gray_is_single_channel() {
        let img = ImageBuffer::from_gray(Array2::from_elem((5, 7), 1.0f64)).unwrap();
        assert_eq!(img.dim(), (5, 7, 1));
    }

    #[test]
    fn test_mse_and_psnr() {
        let a = ImageBuffer::from_elem(4, 4, 1, 0.5f64).unwrap();
        let b = ImageBuffer::from_elem(4, 4, 1, 0.6f64).unwrap();

        let mse = a.mean_squared_error(&b).unwrap();
        assert!((mse - 0.01).abs() < 1e-12);
        assert!((a.psnr(&b).unwrap() - 20.0).abs() < 1e-9);

        let c = ImageBuffer::from_elem(4, 4, 3, 0.5f64).unwrap();
        assert!(a.mean_squared_error(&c).is_err());
    }

    #[test]
    fn test_clamp_does_not_touch_source() {
        let mut data = Array3::from_elem((2, 2, 1), 0.5f32);
        data[[0, 0, 0]] = -0.2;
        data[[1, 1, 0]] = 1.4;
        let img = ImageBuffer::new(data).unwrap();
        let clamped = img.clamp(0.0, 1.0);

        assert_eq!(clamped.get(0, 0, 0), Some(0.0));
        assert_eq!(clamped.get(1, 1, 0), Some(1.0));
        assert_eq!(img.get(1, 1, 0), Some(1.4));
    }

    #[test]
    fn test_ensure_finite() {
        let mut data = Array3::from_elem((2, 2, 1), 0.5f64);
        let img = ImageBuffer::new(data.clone()).unwrap();
        assert!(img.ensure_finite("input").is_ok());

        data[[1, 0, 0]] = f64::NAN;
        let img = ImageBuffer::new(data).unwrap();
        assert!(matches!(
            img.ensure_finite("input"),
            Err(DenoiseError::NumericalInstability(_))
        ));
    }

    #[test]
    fn test_std_dev_of_constant_is_zero() {
        let img = ImageBuffer::from_elem(3, 3, 3, 0.25f64).unwrap();
        assert_eq!(img.std_dev(), 0.0);
        assert!((img.mean() - 0.25).abs() < 1e-15);
    }
}
