//! Backend trait and 256-bit lane operations.
//!
//! This module defines the lane capability the vectorized kernels are written
//! against. Implementations:
//!
//! - [`portable`]: lane arrays, available on every target. Used as the native
//!   backend when AVX2+FMA is not enabled at compile time, and always
//!   available to tests.
//! - [`x86`]: AVX2+FMA intrinsics, compiled only when both target features
//!   are enabled (the repository's cargo config builds with
//!   `target-cpu=native`).
//!
//! There is no runtime feature detection: [`Native`] is fixed when the crate
//! is compiled.
//!
//! # Lane semantics
//!
//! Every operation must match the per-lane definition on
//! [`Element`](crate::Element) exactly. Masks are all-ones or all-zeros per
//! lane, and [`LaneMask::bitmask`] maps lane `i` to bit `i`.

use core::fmt::Debug;
use core::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Not, Sub};

use crate::element::{Element, FloatElement, MaskWord, Predicate};

pub mod portable;

#[cfg(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))]
pub mod x86;

/// The backend selected at compile time.
#[cfg(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma"))]
pub type Native = x86::Avx2;

/// The backend selected at compile time.
#[cfg(not(all(target_arch = "x86_64", target_feature = "avx2", target_feature = "fma")))]
pub type Native = portable::Portable;

/// A backend provides the 256-bit lane types for one platform.
pub trait Backend: 'static + Copy + Clone + Send + Sync + Debug + Default {
    /// Human-readable backend name.
    const NAME: &'static str;

    /// 8 × f32.
    type F32: FloatLanes<Elem = f32>;
    /// 4 × f64.
    type F64: FloatLanes<Elem = f64>;
    /// 8 × i32.
    type I32: Lanes<Elem = i32>;
    /// 32 × u8.
    type U8: ByteLanes;

    /// Widen the first 8 bytes of `src` to f32 lanes.
    fn widen_u8(src: &[u8]) -> Self::F32;

    /// Round to nearest (ties to even), saturate to `[0, 255]` and store the
    /// 8 resulting bytes into `dst`. NaN and out-of-range lanes become 0.
    fn narrow_u8(v: Self::F32, dst: &mut [u8]);

    /// Truncating f32 → i32; NaN and out-of-range lanes become `i32::MIN`.
    fn f32_to_i32_trunc(v: Self::F32) -> Self::I32;

    /// i32 → f32, rounding to nearest.
    fn i32_to_f32(v: Self::I32) -> Self::F32;

    /// Widen f32 lanes 0..4 and 4..8 to f64.
    fn f32_to_f64(v: Self::F32) -> (Self::F64, Self::F64);
}

/// Per-lane boolean mask.
pub trait LaneMask:
    Copy
    + Clone
    + Debug
    + Send
    + Sync
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
{
    /// Raw word stored per lane.
    type Word: MaskWord;

    /// Number of lanes.
    const LANES: usize;

    /// One bit per lane, lane 0 in bit 0.
    fn bitmask(self) -> u32;

    /// Load mask words. `src` must hold at least `LANES` words.
    fn load_words(src: &[Self::Word]) -> Self;

    /// Store mask words. `dst` must hold at least `LANES` words.
    fn store_words(self, dst: &mut [Self::Word]);

    /// Check if any lane is set.
    #[inline(always)]
    fn any(self) -> bool {
        self.bitmask() != 0
    }

    /// Check if all lanes are set.
    #[inline(always)]
    fn all(self) -> bool {
        self.bitmask() == (1u32 << Self::LANES) - 1
    }
}

/// Operations shared by every numeric lane vector.
pub trait Lanes:
    Copy
    + Clone
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
{
    /// Element type of one lane.
    type Elem: Element;

    /// Native mask type for this lane width.
    type Mask: LaneMask<Word = <Self::Elem as Element>::Bits>;

    /// Number of lanes.
    const LANES: usize;

    /// Splat a scalar across all lanes.
    fn splat(val: Self::Elem) -> Self;

    /// Load from a slice (any alignment). Panics if `src` is shorter than
    /// `LANES`.
    fn load(src: &[Self::Elem]) -> Self;

    /// Load from a slice that must start on a 32-byte boundary. Panics if it
    /// does not, or if it is shorter than `LANES`.
    fn load_aligned(src: &[Self::Elem]) -> Self;

    /// Store to a slice. Panics if `dst` is shorter than `LANES`.
    fn store(self, dst: &mut [Self::Elem]);

    /// Load the lanes whose mask bit is set; cleared lanes read as zero and
    /// their memory is never touched, so `src` only has to reach the highest
    /// set lane. Panics if a set lane lies past the end of `src`.
    fn load_masked(src: &[Self::Elem], mask: Self::Mask) -> Self;

    /// Store the lanes whose mask bit is set, leaving the rest of `dst`
    /// untouched. Panics if a set lane lies past the end of `dst`.
    fn store_masked(self, dst: &mut [Self::Elem], mask: Self::Mask);

    /// Bounds-checked lane extraction.
    fn lane(self, i: usize) -> Self::Elem;

    /// Copy of `self` with lane `i` replaced by `val`. Panics if `i` is out
    /// of range.
    fn with_lane(self, i: usize, val: Self::Elem) -> Self;

    /// Element-wise minimum ([`Element::lane_min`]).
    fn simd_min(self, rhs: Self) -> Self;

    /// Element-wise maximum ([`Element::lane_max`]).
    fn simd_max(self, rhs: Self) -> Self;

    /// Compare lanes (returns native mask).
    fn cmp(self, rhs: Self, pred: Predicate) -> Self::Mask;

    /// Conditional select using native mask. Branch-free.
    fn select(mask: Self::Mask, if_true: Self, if_false: Self) -> Self;

    /// `!self & rhs` on raw bits.
    fn and_not(self, rhs: Self) -> Self;
}

/// Floating-point lane operations.
pub trait FloatLanes: Lanes<Elem: FloatElement> {
    /// Square root, correctly rounded.
    fn simd_sqrt(self) -> Self;

    /// Fused multiply-add: `(self * b) + c` with one rounding.
    fn mul_add(self, b: Self, c: Self) -> Self;

    /// Flip the sign bit.
    fn neg(self) -> Self;

    /// Pairwise add of adjacent lanes, per 128-bit half: the low half holds
    /// the sums of `self`'s pairs then `rhs`'s pairs from the low halves, the
    /// high half likewise from the high halves. For 8 lanes:
    /// `[a0+a1, a2+a3, b0+b1, b2+b3, a4+a5, a6+a7, b4+b5, b6+b7]`.
    fn hadd(self, rhs: Self) -> Self;

    /// Pairwise subtract (`even - odd`) in the same lane order as
    /// [`FloatLanes::hadd`].
    fn hsub(self, rhs: Self) -> Self;

    /// Sum of all lanes, accumulated in f64 in lane order.
    #[inline(always)]
    fn hsum(self) -> f64 {
        let mut total = 0.0f64;
        for i in 0..Self::LANES {
            total += self.lane(i).to_f64();
        }
        total
    }
}

/// Unsigned byte lanes for pixel data.
pub trait ByteLanes: Copy + Clone + Debug + Send + Sync + 'static {
    /// Number of lanes.
    const LANES: usize;

    fn splat(val: u8) -> Self;
    fn load(src: &[u8]) -> Self;
    fn store(self, dst: &mut [u8]);

    /// Unsigned saturating add: results clamp at 255.
    fn saturating_add(self, rhs: Self) -> Self;

    /// Unsigned saturating subtract: results clamp at 0.
    fn saturating_sub(self, rhs: Self) -> Self;
}

/// Panics unless every set lane in `bits` is below `len`.
#[inline(always)]
#[track_caller]
pub(crate) fn assert_mask_in_bounds(bits: u32, len: usize) {
    let reach = (u32::BITS - bits.leading_zeros()) as usize;
    assert!(
        reach <= len,
        "masked access reaches lane {} of a {}-element slice",
        reach.saturating_sub(1),
        len
    );
}
