//! Kernel strategy trait and its two implementations.
//!
//! [`Scalar`] is the reference: a straight loop over the per-lane semantics
//! defined on [`Element`]. [`Vectorized`] processes full 256-bit blocks
//! through a [`Backend`] and finishes any remainder with the same scalar code,
//! so both strategies agree lane for lane wherever the result is defined to
//! be exact.
//!
//! ```
//! use laneflow::kernels::{Kernels, Scalar, Vector};
//! use laneflow::Predicate;
//!
//! let v = [-1.0f32, 4.0, 9.0, -16.0, 25.0, -36.0, 49.0, -64.0];
//! let zero = [0.0f32; 8];
//! assert_eq!(Scalar::compare(&v, &zero, Predicate::Gt).to_bitfield(), 0b0101_0110);
//! assert_eq!(Vector::compare(&v, &zero, Predicate::Gt).to_bitfield(), 0b0101_0110);
//! ```

use core::marker::PhantomData;

use crate::backend::{Backend, Native};
use crate::buffer::{LaneBuffer, Vector3SoA};
use crate::element::{Element, FloatElement, Predicate};

pub mod convert;
pub mod elementwise;
pub mod mask;
pub mod pixel;
pub mod quadratic;
pub mod reduce;

pub use elementwise::{BinaryOp, BitwiseOp};
pub use mask::Mask;
pub use pixel::{PixelBuffer, PixelFormat};
pub use quadratic::QuadraticBatch;

/// Start of the scalar tail: the largest multiple of `lanes` not above `len`.
#[inline(always)]
pub(crate) fn block_end(len: usize, lanes: usize) -> usize {
    len - len % lanes
}

/// Contract check shared by every kernel taking two or more inputs.
#[inline(always)]
#[track_caller]
pub(crate) fn assert_same_len(kernel: &str, a: usize, b: usize) {
    assert_eq!(a, b, "{kernel}: input lengths differ ({a} vs {b})");
}

/// A complete set of kernels.
///
/// All functions are associated (no receiver): the implementing type only
/// selects a strategy. Inputs are borrowed, results are freshly allocated
/// [`LaneBuffer`]s, except for the in-place pixel kernels.
pub trait Kernels {
    /// Strategy name used in harness labels.
    const NAME: &'static str;

    // ------------------------------------------------------------------
    // Elementwise
    // ------------------------------------------------------------------

    /// `op(a[i], b[i])` for every lane. Panics if the lengths differ.
    fn binary<T: Element>(op: BinaryOp, a: &[T], b: &[T]) -> LaneBuffer<T>;

    /// Raw-bit operations on integer lanes.
    fn bitwise(op: BitwiseOp, a: &[i32], b: &[i32]) -> LaneBuffer<i32>;

    fn sqrt<T: FloatElement>(a: &[T]) -> LaneBuffer<T>;

    /// Fused `a * b + c`, one rounding per lane.
    fn fma<T: FloatElement>(a: &[T], b: &[T], c: &[T]) -> LaneBuffer<T>;

    /// Unfused `a * b + c`, two roundings per lane. May differ from
    /// [`Kernels::fma`] in the last bit.
    fn mul_then_add<T: FloatElement>(a: &[T], b: &[T], c: &[T]) -> LaneBuffer<T>;

    /// `min(max(v, lo), hi)` using the lane min/max rule.
    fn clamp<T: Element>(v: &[T], lo: T, hi: T) -> LaneBuffer<T>;

    // ------------------------------------------------------------------
    // Reduction
    // ------------------------------------------------------------------

    /// Sum of the per-vector dot products of two batches. Panics if the batch
    /// lengths differ; an empty batch yields `0.0`.
    fn dot(v1: &Vector3SoA, v2: &Vector3SoA) -> f64;

    /// Dot product of a single pair of 3-vectors.
    fn dot3(a: [f32; 3], b: [f32; 3]) -> f32;

    /// Horizontal sum of an arbitrarily long array.
    fn sum(v: &[f32]) -> f64;

    /// [`Kernels::sum`] over a lane-aligned buffer; the vectorized strategy
    /// uses aligned loads.
    fn sum_aligned(v: &LaneBuffer<f32>) -> f64;

    // ------------------------------------------------------------------
    // Masking
    // ------------------------------------------------------------------

    fn compare<T: Element>(a: &[T], b: &[T], pred: Predicate) -> Mask<T>;
    fn logical_and<T: Element>(m1: &Mask<T>, m2: &Mask<T>) -> Mask<T>;
    fn logical_or<T: Element>(m1: &Mask<T>, m2: &Mask<T>) -> Mask<T>;
    fn logical_not<T: Element>(m: &Mask<T>) -> Mask<T>;

    /// `if_true[i]` where `mask` is set, else `if_false[i]`. Branch-free in
    /// both strategies.
    fn select<T: Element>(mask: &Mask<T>, if_true: &[T], if_false: &[T]) -> LaneBuffer<T>;

    /// `src[i]` where `mask` is set, zero elsewhere. Cleared lanes of `src`
    /// are never read by the vectorized strategy.
    fn masked_load<T: Element>(src: &[T], mask: &Mask<T>) -> LaneBuffer<T>;

    /// Write `src[i]` into `dst[i]` where `mask` is set; other lanes of
    /// `dst` keep their value. Panics if the lengths differ.
    fn masked_store<T: Element>(src: &[T], mask: &Mask<T>, dst: &mut [T]);

    /// Keep positive values, zero the rest.
    fn filter_positive<T: Element>(v: &[T]) -> LaneBuffer<T> {
        let zero = LaneBuffer::<T>::zeroed(v.len());
        Self::select(&Self::compare(v, &zero, Predicate::Gt), v, &zero)
    }

    /// Keep `v[i]` when it is positive and greater than `w[i]`, zero the rest.
    fn filter_greater<T: Element>(v: &[T], w: &[T]) -> LaneBuffer<T> {
        assert_same_len("filter_greater", v.len(), w.len());
        let zero = LaneBuffer::<T>::zeroed(v.len());
        let keep = Self::logical_and(
            &Self::compare(v, &zero, Predicate::Gt),
            &Self::compare(v, w, Predicate::Gt),
        );
        Self::select(&keep, v, &zero)
    }

    // ------------------------------------------------------------------
    // Quadratic solver
    // ------------------------------------------------------------------

    /// Smaller real root per equation, NaN where the roots are complex.
    fn solve_quadratic(batch: &QuadraticBatch) -> LaneBuffer<f32>;

    // ------------------------------------------------------------------
    // Pixels
    // ------------------------------------------------------------------

    /// Saturating `pixels[i] + delta`, in place.
    fn brightness(pixels: &mut [u8], delta: i32);

    /// `clamp((p - 128) * factor + 128, 0, 255)` rounded to nearest, in place.
    fn contrast(pixels: &mut [u8], factor: f32);

    /// Weighted single-channel reduction of an interleaved image.
    fn grayscale(image: &PixelBuffer) -> PixelBuffer;

    // ------------------------------------------------------------------
    // Conversions
    // ------------------------------------------------------------------

    fn f32_to_i32_trunc(v: &[f32]) -> LaneBuffer<i32>;
    fn i32_to_f32(v: &[i32]) -> LaneBuffer<f32>;
    fn f32_to_f64(v: &[f32]) -> LaneBuffer<f64>;
}

/// Reference strategy: one lane at a time.
#[derive(Copy, Clone, Debug, Default)]
pub struct Scalar;

/// Vectorized strategy over backend `B`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Vectorized<B: Backend>(PhantomData<B>);

/// The vectorized strategy on the backend selected at compile time.
pub type Vector = Vectorized<Native>;

impl Kernels for Scalar {
    const NAME: &'static str = "scalar";

    fn binary<T: Element>(op: BinaryOp, a: &[T], b: &[T]) -> LaneBuffer<T> {
        elementwise::binary_scalar(op, a, b)
    }

    fn bitwise(op: BitwiseOp, a: &[i32], b: &[i32]) -> LaneBuffer<i32> {
        elementwise::bitwise_scalar(op, a, b)
    }

    fn sqrt<T: FloatElement>(a: &[T]) -> LaneBuffer<T> {
        elementwise::sqrt_scalar(a)
    }

    fn fma<T: FloatElement>(a: &[T], b: &[T], c: &[T]) -> LaneBuffer<T> {
        elementwise::fma_scalar(a, b, c)
    }

    fn mul_then_add<T: FloatElement>(a: &[T], b: &[T], c: &[T]) -> LaneBuffer<T> {
        elementwise::mul_then_add_scalar(a, b, c)
    }

    fn clamp<T: Element>(v: &[T], lo: T, hi: T) -> LaneBuffer<T> {
        elementwise::clamp_scalar(v, lo, hi)
    }

    fn dot(v1: &Vector3SoA, v2: &Vector3SoA) -> f64 {
        reduce::dot_scalar(v1, v2)
    }

    fn dot3(a: [f32; 3], b: [f32; 3]) -> f32 {
        reduce::dot3_scalar(a, b)
    }

    fn sum(v: &[f32]) -> f64 {
        reduce::sum_scalar(v)
    }

    fn sum_aligned(v: &LaneBuffer<f32>) -> f64 {
        reduce::sum_scalar(v)
    }

    fn compare<T: Element>(a: &[T], b: &[T], pred: Predicate) -> Mask<T> {
        mask::compare_scalar(a, b, pred)
    }

    fn logical_and<T: Element>(m1: &Mask<T>, m2: &Mask<T>) -> Mask<T> {
        mask::and_scalar(m1, m2)
    }

    fn logical_or<T: Element>(m1: &Mask<T>, m2: &Mask<T>) -> Mask<T> {
        mask::or_scalar(m1, m2)
    }

    fn logical_not<T: Element>(m: &Mask<T>) -> Mask<T> {
        mask::not_scalar(m)
    }

    fn select<T: Element>(mask: &Mask<T>, if_true: &[T], if_false: &[T]) -> LaneBuffer<T> {
        mask::select_scalar(mask, if_true, if_false)
    }

    fn masked_load<T: Element>(src: &[T], mask: &Mask<T>) -> LaneBuffer<T> {
        mask::masked_load_scalar(src, mask)
    }

    fn masked_store<T: Element>(src: &[T], mask: &Mask<T>, dst: &mut [T]) {
        mask::masked_store_scalar(src, mask, dst)
    }

    fn solve_quadratic(batch: &QuadraticBatch) -> LaneBuffer<f32> {
        quadratic::solve_scalar(batch)
    }

    fn brightness(pixels: &mut [u8], delta: i32) {
        pixel::brightness_scalar(pixels, delta)
    }

    fn contrast(pixels: &mut [u8], factor: f32) {
        pixel::contrast_scalar(pixels, factor)
    }

    fn grayscale(image: &PixelBuffer) -> PixelBuffer {
        pixel::grayscale_scalar(image)
    }

    fn f32_to_i32_trunc(v: &[f32]) -> LaneBuffer<i32> {
        convert::f32_to_i32_trunc_scalar(v)
    }

    fn i32_to_f32(v: &[i32]) -> LaneBuffer<f32> {
        convert::i32_to_f32_scalar(v)
    }

    fn f32_to_f64(v: &[f32]) -> LaneBuffer<f64> {
        convert::f32_to_f64_scalar(v)
    }
}

impl<B: Backend> Kernels for Vectorized<B> {
    const NAME: &'static str = B::NAME;

    fn binary<T: Element>(op: BinaryOp, a: &[T], b: &[T]) -> LaneBuffer<T> {
        elementwise::binary_vector::<T::Lanes<B>>(op, a, b)
    }

    fn bitwise(op: BitwiseOp, a: &[i32], b: &[i32]) -> LaneBuffer<i32> {
        elementwise::bitwise_vector::<B::I32>(op, a, b)
    }

    fn sqrt<T: FloatElement>(a: &[T]) -> LaneBuffer<T> {
        elementwise::sqrt_vector::<T::FloatLanes<B>>(a)
    }

    fn fma<T: FloatElement>(a: &[T], b: &[T], c: &[T]) -> LaneBuffer<T> {
        elementwise::fma_vector::<T::FloatLanes<B>>(a, b, c)
    }

    fn mul_then_add<T: FloatElement>(a: &[T], b: &[T], c: &[T]) -> LaneBuffer<T> {
        elementwise::mul_then_add_vector::<T::FloatLanes<B>>(a, b, c)
    }

    fn clamp<T: Element>(v: &[T], lo: T, hi: T) -> LaneBuffer<T> {
        elementwise::clamp_vector::<T::Lanes<B>>(v, lo, hi)
    }

    fn dot(v1: &Vector3SoA, v2: &Vector3SoA) -> f64 {
        reduce::dot_vector::<B::F32>(v1, v2)
    }

    fn dot3(a: [f32; 3], b: [f32; 3]) -> f32 {
        reduce::dot3_vector::<B::F32>(a, b)
    }

    fn sum(v: &[f32]) -> f64 {
        reduce::sum_vector::<B::F32>(v)
    }

    fn sum_aligned(v: &LaneBuffer<f32>) -> f64 {
        reduce::sum_aligned_vector::<B::F32>(v)
    }

    fn compare<T: Element>(a: &[T], b: &[T], pred: Predicate) -> Mask<T> {
        mask::compare_vector::<T::Lanes<B>>(a, b, pred)
    }

    fn logical_and<T: Element>(m1: &Mask<T>, m2: &Mask<T>) -> Mask<T> {
        mask::and_vector::<T::Lanes<B>>(m1, m2)
    }

    fn logical_or<T: Element>(m1: &Mask<T>, m2: &Mask<T>) -> Mask<T> {
        mask::or_vector::<T::Lanes<B>>(m1, m2)
    }

    fn logical_not<T: Element>(m: &Mask<T>) -> Mask<T> {
        mask::not_vector::<T::Lanes<B>>(m)
    }

    fn select<T: Element>(mask: &Mask<T>, if_true: &[T], if_false: &[T]) -> LaneBuffer<T> {
        mask::select_vector::<T::Lanes<B>>(mask, if_true, if_false)
    }

    fn masked_load<T: Element>(src: &[T], mask: &Mask<T>) -> LaneBuffer<T> {
        mask::masked_load_vector::<T::Lanes<B>>(src, mask)
    }

    fn masked_store<T: Element>(src: &[T], mask: &Mask<T>, dst: &mut [T]) {
        mask::masked_store_vector::<T::Lanes<B>>(src, mask, dst)
    }

    fn solve_quadratic(batch: &QuadraticBatch) -> LaneBuffer<f32> {
        quadratic::solve_vector::<B::F32>(batch)
    }

    fn brightness(pixels: &mut [u8], delta: i32) {
        pixel::brightness_vector::<B::U8>(pixels, delta)
    }

    fn contrast(pixels: &mut [u8], factor: f32) {
        pixel::contrast_vector::<B>(pixels, factor)
    }

    fn grayscale(image: &PixelBuffer) -> PixelBuffer {
        pixel::grayscale_vector::<B>(image)
    }

    fn f32_to_i32_trunc(v: &[f32]) -> LaneBuffer<i32> {
        convert::f32_to_i32_trunc_vector::<B>(v)
    }

    fn i32_to_f32(v: &[i32]) -> LaneBuffer<f32> {
        convert::i32_to_f32_vector::<B>(v)
    }

    fn f32_to_f64(v: &[f32]) -> LaneBuffer<f64> {
        convert::f32_to_f64_vector::<B>(v)
    }
}
