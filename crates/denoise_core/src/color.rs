//! RGB ↔ YCbCr conversion.
//!
//! Full-range ITU-R BT.601 (the JPEG convention) with both chroma channels
//! centred on 0.5, so an RGB image in `[0, 1]` maps to YCbCr in `[0, 1]`.
//! The inverse is written in terms of the same luma weights rather than
//! rounded matrix entries, which keeps the round trip exact to rounding.

use ndarray::{Array3, Zip};

use crate::error::{DenoiseError, Result};
use crate::float_trait::DenoiseFloat;
use crate::image::ImageBuffer;

/// Red luma weight (Kr).
const KR: f64 = 0.299;
/// Blue luma weight (Kb).
const KB: f64 = 0.114;
/// Green luma weight, `1 - Kr - Kb`.
const KG: f64 = 1.0 - KR - KB;
/// Offset applied to both chroma channels.
const CHROMA_OFFSET: f64 = 0.5;

struct Coefficients<F> {
    kr: F,
    kg: F,
    kb: F,
    cb_scale: F,
    cr_scale: F,
    offset: F,
}

impl<F: DenoiseFloat> Coefficients<F> {
    fn new() -> Self {
        Self {
            kr: F::from_f64_c(KR),
            kg: F::from_f64_c(KG),
            kb: F::from_f64_c(KB),
            cb_scale: F::from_f64_c(2.0 * (1.0 - KB)),
            cr_scale: F::from_f64_c(2.0 * (1.0 - KR)),
            offset: F::from_f64_c(CHROMA_OFFSET),
        }
    }
}

fn require_three_channels<F: DenoiseFloat>(image: &ImageBuffer<F>) -> Result<()> {
    if image.channels() != 3 {
        return Err(DenoiseError::ShapeMismatch(format!(
            "color conversion needs 3 channels, got {}",
            image.channels()
        )));
    }
    Ok(())
}

/// Convert an RGB image to YCbCr.
pub fn rgb_to_ycbcr<F: DenoiseFloat>(image: &ImageBuffer<F>) -> Result<ImageBuffer<F>> {
    require_three_channels(image)?;
    let k = Coefficients::<F>::new();
    let src = image.view();
    let mut out = Array3::zeros(image.dim());

    Zip::from(out.rows_mut()).and(src.rows()).for_each(|mut dst, rgb| {
        let (r, g, b) = (rgb[0], rgb[1], rgb[2]);
        let y = k.kr * r + k.kg * g + k.kb * b;
        dst[0] = y;
        dst[1] = (b - y) / k.cb_scale + k.offset;
        dst[2] = (r - y) / k.cr_scale + k.offset;
    });

    ImageBuffer::new(out)
}

/// Convert a YCbCr image (as produced by [`rgb_to_ycbcr`]) back to RGB.
pub fn ycbcr_to_rgb<F: DenoiseFloat>(image: &ImageBuffer<F>) -> Result<ImageBuffer<F>> {
    require_three_channels(image)?;
    let k = Coefficients::<F>::new();
    let src = image.view();
    let mut out = Array3::zeros(image.dim());

    Zip::from(out.rows_mut()).and(src.rows()).for_each(|mut dst, ycc| {
        let y = ycc[0];
        let r = y + k.cr_scale * (ycc[2] - k.offset);
        let b = y + k.cb_scale * (ycc[1] - k.offset);
        dst[0] = r;
        dst[1] = (y - k.kr * r - k.kb * b) / k.kg;
        dst[2] = b;
    });

    ImageBuffer::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn random_rgb(h: usize, w: usize, seed: u64) -> ImageBuffer<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        ImageBuffer::new(Array3::from_shape_fn((h, w, 3), |_| rng.gen::<f64>())).unwrap()
    }

    #[test]
    fn test_round_trip_rgb_ycbcr_rgb() {
        let img = random_rgb(17, 23, 7);
        let back = ycbcr_to_rgb(&rgb_to_ycbcr(&img).unwrap()).unwrap();
        let max_err = img
            .view()
            .iter()
            .zip(back.view().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(max_err < 1e-6, "round trip error {}", max_err);
    }

    #[test]
    fn test_round_trip_f32() {
        let img64 = random_rgb(8, 8, 11);
        let img = ImageBuffer::new(img64.view().mapv(|x| x as f32)).unwrap();
        let back = ycbcr_to_rgb(&rgb_to_ycbcr(&img).unwrap()).unwrap();
        for (a, b) in img.view().iter().zip(back.view().iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_known_values() {
        let mut data = Array3::zeros((1, 3, 3));
        // white, pure red, mid gray
        data[[0, 0, 0]] = 1.0;
        data[[0, 0, 1]] = 1.0;
        data[[0, 0, 2]] = 1.0;
        data[[0, 1, 0]] = 1.0;
        for ch in 0..3 {
            data[[0, 2, ch]] = 0.5;
        }
        let ycc = rgb_to_ycbcr(&ImageBuffer::new(data).unwrap()).unwrap();

        assert!((ycc.get(0, 0, 0).unwrap() - 1.0f64).abs() < 1e-12);
        assert!((ycc.get(0, 0, 1).unwrap() - 0.5).abs() < 1e-12);
        assert!((ycc.get(0, 0, 2).unwrap() - 0.5).abs() < 1e-12);

        assert!((ycc.get(0, 1, 0).unwrap() - 0.299).abs() < 1e-12);
        assert!((ycc.get(0, 1, 2).unwrap() - 1.0).abs() < 1e-12);

        for ch in 0..3 {
            assert!((ycc.get(0, 2, ch).unwrap() - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_gray_input_rejected() {
        let gray = ImageBuffer::<f32>::zeros(4, 4, 1).unwrap();
        assert!(matches!(
            rgb_to_ycbcr(&gray),
            Err(DenoiseError::ShapeMismatch(_))
        ));
        assert!(ycbcr_to_rgb(&gray).is_err());
    }
}
