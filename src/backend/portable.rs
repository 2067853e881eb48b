//! Portable backend: 256-bit lanes as plain arrays.
//!
//! Every lane operation defers to the per-lane definition on
//! [`Element`]/[`FloatElement`], so this backend is correct by construction
//! and serves as the reference the AVX2 backend is tested against.

use super::{assert_mask_in_bounds, Backend, ByteLanes, FloatLanes, LaneMask, Lanes};
use crate::buffer::assert_lane_aligned;
use crate::element::{
    cvt_trunc_i32, round_to_u8, Element, FloatElement, MaskWord, Predicate,
};
use core::fmt::{Debug, Formatter};
use core::ops::*;

/// Lane-array backend, available on every target.
#[derive(Copy, Clone, Debug, Default)]
pub struct Portable;

impl Backend for Portable {
    const NAME: &'static str = "portable";

    type F32 = LaneArray<f32, 8>;
    type F64 = LaneArray<f64, 4>;
    type I32 = LaneArray<i32, 8>;
    type U8 = ByteArray;

    #[inline(always)]
    fn widen_u8(src: &[u8]) -> LaneArray<f32, 8> {
        assert!(src.len() >= 8, "widen_u8 needs 8 bytes, got {}", src.len());
        LaneArray(core::array::from_fn(|i| src[i] as f32))
    }

    #[inline(always)]
    fn narrow_u8(v: LaneArray<f32, 8>, dst: &mut [u8]) {
        assert!(dst.len() >= 8, "narrow_u8 needs 8 bytes, got {}", dst.len());
        for (out, &x) in dst.iter_mut().zip(v.0.iter()) {
            *out = round_to_u8(x);
        }
    }

    #[inline(always)]
    fn f32_to_i32_trunc(v: LaneArray<f32, 8>) -> LaneArray<i32, 8> {
        LaneArray(v.0.map(cvt_trunc_i32))
    }

    #[inline(always)]
    fn i32_to_f32(v: LaneArray<i32, 8>) -> LaneArray<f32, 8> {
        LaneArray(v.0.map(|x| x as f32))
    }

    #[inline(always)]
    fn f32_to_f64(v: LaneArray<f32, 8>) -> (LaneArray<f64, 4>, LaneArray<f64, 4>) {
        (
            LaneArray(core::array::from_fn(|i| v.0[i] as f64)),
            LaneArray(core::array::from_fn(|i| v.0[i + 4] as f64)),
        )
    }
}

// ============================================================================
// MaskArray
// ============================================================================

/// One mask word per lane.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct MaskArray<W: MaskWord, const N: usize>(pub(crate) [W; N]);

impl<W: MaskWord, const N: usize> Debug for MaskArray<W, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "MaskArray({:0width$b})", self.bitmask(), width = N)
    }
}

impl<W: MaskWord, const N: usize> LaneMask for MaskArray<W, N> {
    type Word = W;
    const LANES: usize = N;

    #[inline(always)]
    fn bitmask(self) -> u32 {
        self.0
            .iter()
            .enumerate()
            .fold(0u32, |bits, (i, w)| bits | ((w.is_set() as u32) << i))
    }

    #[inline(always)]
    fn load_words(src: &[W]) -> Self {
        assert!(src.len() >= N);
        Self(core::array::from_fn(|i| src[i]))
    }

    #[inline(always)]
    fn store_words(self, dst: &mut [W]) {
        dst[..N].copy_from_slice(&self.0);
    }
}

impl<W: MaskWord, const N: usize> BitAnd for MaskArray<W, N> {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        Self(core::array::from_fn(|i| self.0[i] & rhs.0[i]))
    }
}

impl<W: MaskWord, const N: usize> BitOr for MaskArray<W, N> {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        Self(core::array::from_fn(|i| self.0[i] | rhs.0[i]))
    }
}

impl<W: MaskWord, const N: usize> Not for MaskArray<W, N> {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self {
        Self(self.0.map(|w| !w))
    }
}

// ============================================================================
// LaneArray
// ============================================================================

/// `N` lanes of `T`.
#[derive(Copy, Clone, PartialEq)]
pub struct LaneArray<T: Element, const N: usize>(pub(crate) [T; N]);

impl<T: Element, const N: usize> Debug for LaneArray<T, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "LaneArray<{}, {}>({:?})", T::NAME, N, self.0)
    }
}

impl<T: Element, const N: usize> LaneArray<T, N> {
    #[inline(always)]
    fn zip(self, rhs: Self, f: impl Fn(T, T) -> T) -> Self {
        Self(core::array::from_fn(|i| f(self.0[i], rhs.0[i])))
    }

    /// Adjacent-pair reduction in the AVX 128-bit-half order.
    #[inline(always)]
    fn pairwise(self, rhs: Self, f: impl Fn(T, T) -> T) -> Self {
        let half = N / 2;
        let per_source = half / 2;
        Self(core::array::from_fn(|i| {
            let (base, j) = (i - i % half, i % half);
            let (src, k) = if j < per_source {
                (&self.0, j)
            } else {
                (&rhs.0, j - per_source)
            };
            f(src[base + 2 * k], src[base + 2 * k + 1])
        }))
    }

    #[inline(always)]
    fn zip_bits(self, rhs: Self, f: impl Fn(T::Bits, T::Bits) -> T::Bits) -> Self {
        self.zip(rhs, |a, b| T::from_bits(f(a.to_bits(), b.to_bits())))
    }
}

macro_rules! impl_lane_op {
    ($trait:ident, $method:ident, $lane:ident) => {
        impl<T: Element, const N: usize> $trait for LaneArray<T, N> {
            type Output = Self;
            #[inline(always)]
            fn $method(self, rhs: Self) -> Self {
                self.zip(rhs, T::$lane)
            }
        }
    };
}

impl_lane_op!(Add, add, lane_add);
impl_lane_op!(Sub, sub, lane_sub);
impl_lane_op!(Mul, mul, lane_mul);
impl_lane_op!(Div, div, lane_div);

impl<T: Element, const N: usize> BitAnd for LaneArray<T, N> {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        self.zip_bits(rhs, |a, b| a & b)
    }
}

impl<T: Element, const N: usize> BitOr for LaneArray<T, N> {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        self.zip_bits(rhs, |a, b| a | b)
    }
}

impl<T: Element, const N: usize> BitXor for LaneArray<T, N> {
    type Output = Self;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self {
        self.zip_bits(rhs, |a, b| a ^ b)
    }
}

impl<T: Element, const N: usize> Lanes for LaneArray<T, N> {
    type Elem = T;
    type Mask = MaskArray<T::Bits, N>;
    const LANES: usize = N;

    #[inline(always)]
    fn splat(val: T) -> Self {
        Self([val; N])
    }

    #[inline(always)]
    fn load(src: &[T]) -> Self {
        assert!(src.len() >= N);
        Self(core::array::from_fn(|i| src[i]))
    }

    #[inline(always)]
    #[track_caller]
    fn load_aligned(src: &[T]) -> Self {
        assert_lane_aligned(src);
        Self::load(src)
    }

    #[inline(always)]
    fn store(self, dst: &mut [T]) {
        dst[..N].copy_from_slice(&self.0);
    }

    #[inline(always)]
    #[track_caller]
    fn load_masked(src: &[T], mask: Self::Mask) -> Self {
        assert_mask_in_bounds(mask.bitmask(), src.len());
        Self(core::array::from_fn(|i| {
            if mask.0[i].is_set() {
                src[i]
            } else {
                T::ZERO
            }
        }))
    }

    #[inline(always)]
    #[track_caller]
    fn store_masked(self, dst: &mut [T], mask: Self::Mask) {
        assert_mask_in_bounds(mask.bitmask(), dst.len());
        for (i, w) in mask.0.iter().enumerate() {
            if w.is_set() {
                dst[i] = self.0[i];
            }
        }
    }

    #[inline(always)]
    fn lane(self, i: usize) -> T {
        self.0[i]
    }

    #[inline(always)]
    fn with_lane(mut self, i: usize, val: T) -> Self {
        self.0[i] = val;
        self
    }

    #[inline(always)]
    fn simd_min(self, rhs: Self) -> Self {
        self.zip(rhs, T::lane_min)
    }

    #[inline(always)]
    fn simd_max(self, rhs: Self) -> Self {
        self.zip(rhs, T::lane_max)
    }

    #[inline(always)]
    fn cmp(self, rhs: Self, pred: Predicate) -> Self::Mask {
        MaskArray(core::array::from_fn(|i| {
            T::Bits::from_bool(self.0[i].compare(rhs.0[i], pred))
        }))
    }

    #[inline(always)]
    fn select(mask: Self::Mask, if_true: Self, if_false: Self) -> Self {
        // (mask & if_true) | (!mask & if_false), on raw bits
        Self(core::array::from_fn(|i| {
            let m = mask.0[i];
            T::from_bits((m & if_true.0[i].to_bits()) | (!m & if_false.0[i].to_bits()))
        }))
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        self.zip_bits(rhs, |a, b| !a & b)
    }
}

impl<T: FloatElement, const N: usize> FloatLanes for LaneArray<T, N> {
    #[inline(always)]
    fn simd_sqrt(self) -> Self {
        Self(self.0.map(T::lane_sqrt))
    }

    #[inline(always)]
    fn mul_add(self, b: Self, c: Self) -> Self {
        Self(core::array::from_fn(|i| self.0[i].lane_mul_add(b.0[i], c.0[i])))
    }

    #[inline(always)]
    fn neg(self) -> Self {
        Self(self.0.map(T::lane_neg))
    }

    #[inline(always)]
    fn hadd(self, rhs: Self) -> Self {
        self.pairwise(rhs, T::lane_add)
    }

    #[inline(always)]
    fn hsub(self, rhs: Self) -> Self {
        self.pairwise(rhs, T::lane_sub)
    }
}

// ============================================================================
// ByteArray
// ============================================================================

/// 32 unsigned byte lanes.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct ByteArray(pub(crate) [u8; 32]);

impl Debug for ByteArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "ByteArray({:?})", self.0)
    }
}

impl ByteLanes for ByteArray {
    const LANES: usize = 32;

    #[inline(always)]
    fn splat(val: u8) -> Self {
        Self([val; 32])
    }

    #[inline(always)]
    fn load(src: &[u8]) -> Self {
        assert!(src.len() >= 32);
        Self(core::array::from_fn(|i| src[i]))
    }

    #[inline(always)]
    fn store(self, dst: &mut [u8]) {
        dst[..32].copy_from_slice(&self.0);
    }

    #[inline(always)]
    fn saturating_add(self, rhs: Self) -> Self {
        Self(core::array::from_fn(|i| self.0[i].saturating_add(rhs.0[i])))
    }

    #[inline(always)]
    fn saturating_sub(self, rhs: Self) -> Self {
        Self(core::array::from_fn(|i| self.0[i].saturating_sub(rhs.0[i])))
    }
}
