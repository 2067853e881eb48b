//! Saturating pixel transforms over interleaved 8-bit images.

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, ByteLanes, Lanes};
use crate::buffer::LaneBuffer;
use crate::element::{round_to_u8, saturate_u8, Element};

/// Grayscale weights (ITU-R BT.601 luma).
pub const WEIGHT_R: f32 = 0.299;
pub const WEIGHT_G: f32 = 0.587;
pub const WEIGHT_B: f32 = 0.114;

/// Pixels per vector step of the contrast and grayscale kernels (one per f32
/// lane). Brightness works on 32 bytes per step.
pub const PIXEL_GROUP: usize = 8;

/// Channel layout of an interleaved image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Gray,
    #[default]
    Rgb,
    Rgba,
    Bgr,
    Bgra,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub const fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
        }
    }

    /// Byte offsets of the red, green and blue channels within a pixel.
    pub const fn rgb_offsets(self) -> (usize, usize, usize) {
        match self {
            PixelFormat::Gray => (0, 0, 0),
            PixelFormat::Rgb | PixelFormat::Rgba => (0, 1, 2),
            PixelFormat::Bgr | PixelFormat::Bgra => (2, 1, 0),
        }
    }

    /// Offset of the alpha channel, if any.
    pub const fn alpha_offset(self) -> Option<usize> {
        match self {
            PixelFormat::Rgba | PixelFormat::Bgra => Some(3),
            _ => None,
        }
    }
}

/// An interleaved 8-bit image, rows packed without padding.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: LaneBuffer<u8>,
}

impl PixelBuffer {
    /// Panics unless `data.len() == width * height * format.channels()`.
    #[track_caller]
    pub fn new(width: usize, height: usize, format: PixelFormat, data: LaneBuffer<u8>) -> Self {
        let expected = width * height * format.channels();
        assert_eq!(
            data.len(),
            expected,
            "PixelBuffer: {} bytes do not match {}x{} {:?}",
            data.len(),
            width,
            height,
            format
        );
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// All-zero image.
    pub fn blank(width: usize, height: usize, format: PixelFormat) -> Self {
        let data = LaneBuffer::zeroed(width * height * format.channels());
        Self::new(width, height, format, data)
    }

    /// Test pattern: red ramps left to right, green top to bottom, blue is
    /// fixed at 128 and alpha is opaque. Gray images carry the red ramp.
    pub fn gradient(width: usize, height: usize, format: PixelFormat) -> Self {
        let mut image = Self::blank(width, height, format);
        let (ro, go, bo) = format.rgb_offsets();
        let channels = format.channels();
        for y in 0..height {
            for x in 0..width {
                let px = &mut image.data[(y * width + x) * channels..][..channels];
                let red = (x * 255 / width) as u8;
                if format == PixelFormat::Gray {
                    px[0] = red;
                    continue;
                }
                px[ro] = red;
                px[go] = (y * 255 / height) as u8;
                px[bo] = 128;
                if let Some(ao) = format.alpha_offset() {
                    px[ao] = u8::MAX;
                }
            }
        }
        image
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes of the pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let channels = self.format.channels();
        &self.data[(y * self.width + x) * channels..][..channels]
    }

    fn row(&self, y: usize) -> &[u8] {
        let stride = self.width * self.format.channels();
        &self.data[y * stride..][..stride]
    }
}

// ============================================================================
// Scalar reference
// ============================================================================

#[inline(always)]
fn brightness_one(p: u8, delta: i32) -> u8 {
    saturate_u8((p as i32).saturating_add(delta))
}

#[inline(always)]
fn contrast_one(p: u8, factor: f32) -> u8 {
    let v = (p as f32 - 128.0) * factor + 128.0;
    round_to_u8(v.lane_max(0.0).lane_min(255.0))
}

#[inline(always)]
fn gray_one(r: u8, g: u8, b: u8) -> u8 {
    round_to_u8(r as f32 * WEIGHT_R + g as f32 * WEIGHT_G + b as f32 * WEIGHT_B)
}

pub(crate) fn brightness_scalar(pixels: &mut [u8], delta: i32) {
    for p in pixels.iter_mut() {
        *p = brightness_one(*p, delta);
    }
}

pub(crate) fn contrast_scalar(pixels: &mut [u8], factor: f32) {
    for p in pixels.iter_mut() {
        *p = contrast_one(*p, factor);
    }
}

pub(crate) fn grayscale_scalar(image: &PixelBuffer) -> PixelBuffer {
    if image.format == PixelFormat::Gray {
        return image.clone();
    }
    let (ro, go, bo) = image.format.rgb_offsets();
    let channels = image.format.channels();
    let mut out = PixelBuffer::blank(image.width, image.height, PixelFormat::Gray);
    for (src, dst) in image.data.chunks_exact(channels).zip(out.data.iter_mut()) {
        *dst = gray_one(src[ro], src[go], src[bo]);
    }
    out
}

// ============================================================================
// Vectorized
// ============================================================================

/// 32 bytes per step with a true saturating add (or subtract for negative
/// deltas).
pub(crate) fn brightness_vector<U: ByteLanes>(pixels: &mut [u8], delta: i32) {
    let step = U::splat(delta.unsigned_abs().min(u8::MAX as u32) as u8);
    let end = super::block_end(pixels.len(), U::LANES);

    for i in (0..end).step_by(U::LANES) {
        let p = U::load(&pixels[i..]);
        let shifted = if delta >= 0 {
            p.saturating_add(step)
        } else {
            p.saturating_sub(step)
        };
        shifted.store(&mut pixels[i..]);
    }
    brightness_scalar(&mut pixels[end..], delta);
}

/// u8 → f32, scale around 128, clamp, round and narrow back, 8 pixels per
/// step.
pub(crate) fn contrast_vector<B: Backend>(pixels: &mut [u8], factor: f32) {
    let end = super::block_end(pixels.len(), PIXEL_GROUP);
    let f = B::F32::splat(factor);
    let mid = B::F32::splat(128.0);
    let (lo, hi) = (B::F32::splat(0.0), B::F32::splat(255.0));

    for i in (0..end).step_by(PIXEL_GROUP) {
        let v = B::widen_u8(&pixels[i..]);
        let scaled = ((v - mid) * f + mid).simd_max(lo).simd_min(hi);
        B::narrow_u8(scaled, &mut pixels[i..]);
    }
    contrast_scalar(&mut pixels[end..], factor);
}

/// Row by row, [`PIXEL_GROUP`] pixels per step; the pixels left over at the
/// end of each row go through the scalar formula.
pub(crate) fn grayscale_vector<B: Backend>(image: &PixelBuffer) -> PixelBuffer {
    if image.format == PixelFormat::Gray {
        return image.clone();
    }
    let (ro, go, bo) = image.format.rgb_offsets();
    let channels = image.format.channels();
    let (wr, wg, wb) = (
        B::F32::splat(WEIGHT_R),
        B::F32::splat(WEIGHT_G),
        B::F32::splat(WEIGHT_B),
    );
    let width = image.width;
    let end = super::block_end(width, PIXEL_GROUP);
    let mut out = PixelBuffer::blank(width, image.height, PixelFormat::Gray);

    for y in 0..image.height {
        let src = image.row(y);
        let dst = &mut out.data[y * width..][..width];

        for x in (0..end).step_by(PIXEL_GROUP) {
            let group = &src[x * channels..][..PIXEL_GROUP * channels];
            let plane = |offset: usize| -> [u8; PIXEL_GROUP] {
                core::array::from_fn(|k| group[k * channels + offset])
            };
            let r = B::widen_u8(&plane(ro));
            let g = B::widen_u8(&plane(go));
            let b = B::widen_u8(&plane(bo));
            B::narrow_u8(r * wr + g * wg + b * wb, &mut dst[x..]);
        }
        for x in end..width {
            let px = &src[x * channels..][..channels];
            dst[x] = gray_one(px[ro], px[go], px[bo]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::portable::Portable;

    type U = <Portable as Backend>::U8;

    #[test]
    fn test_brightness_saturates() {
        let mut up = [250u8, 0, 128, 255];
        brightness_scalar(&mut up, 50);
        assert_eq!(up, [255, 50, 178, 255]);

        let mut down = [0u8, 49, 50, 255];
        brightness_scalar(&mut down, -50);
        assert_eq!(down, [0, 0, 0, 205]);
    }

    #[test]
    fn test_brightness_vector_matches_scalar() {
        let src: Vec<u8> = (0..=255u8).chain(0..=40).collect();
        for delta in [-300, -255, -128, -1, 0, 1, 50, 127, 255, 1000, i32::MAX, i32::MIN] {
            let mut want = src.clone();
            brightness_scalar(&mut want, delta);
            let mut got = src.clone();
            brightness_vector::<U>(&mut got, delta);
            assert_eq!(got, want, "delta {delta}");
        }
    }

    #[test]
    fn test_contrast_vector_matches_scalar() {
        let src: Vec<u8> = (0..=255u8).rev().chain(3..9).collect();
        for factor in [0.0f32, 0.5, 1.0, 1.2, 1.5, 2.0, -1.0, 100.0, f32::NAN] {
            let mut want = src.clone();
            contrast_scalar(&mut want, factor);
            let mut got = src.clone();
            contrast_vector::<Portable>(&mut got, factor);
            assert_eq!(got, want, "factor {factor}");
        }
    }

    #[test]
    fn test_contrast_rounds_to_nearest() {
        // 129.5 and 132.5 both round to even
        let mut px = [129u8, 131];
        contrast_scalar(&mut px, 1.5);
        assert_eq!(px, [130, 132]);
    }

    #[test]
    fn test_gradient_layout() {
        let img = PixelBuffer::gradient(4, 2, PixelFormat::Bgra);
        assert_eq!(img.data().len(), 4 * 2 * 4);
        assert_eq!(img.pixel(2, 1), &[128, 127, 127, 255]);
        let gray = PixelBuffer::gradient(4, 1, PixelFormat::Gray);
        assert_eq!(gray.data(), &[0, 63, 127, 191]);
    }

    #[test]
    fn test_grayscale_widths() {
        for width in [1, 7, 8, 9, 16, 21] {
            for format in [PixelFormat::Rgb, PixelFormat::Rgba, PixelFormat::Bgr] {
                let img = PixelBuffer::gradient(width, 3, format);
                let want = grayscale_scalar(&img);
                let got = grayscale_vector::<Portable>(&img);
                assert_eq!(got, want, "width {width} {:?}", format);
                assert_eq!(got.format(), PixelFormat::Gray);
                assert_eq!(got.data().len(), width * 3);
            }
        }
    }

    #[test]
    fn test_grayscale_white_and_black() {
        let white = PixelBuffer::new(2, 1, PixelFormat::Rgb, LaneBuffer::filled(6, 255));
        assert_eq!(grayscale_scalar(&white).data(), &[255, 255]);
        let black = PixelBuffer::blank(9, 1, PixelFormat::Rgba);
        assert!(grayscale_vector::<Portable>(&black).data().iter().all(|&p| p == 0));
    }

    #[test]
    #[should_panic(expected = "do not match")]
    fn test_pixel_buffer_rejects_bad_length() {
        let _ = PixelBuffer::new(2, 2, PixelFormat::Rgb, LaneBuffer::zeroed(11));
    }
}
