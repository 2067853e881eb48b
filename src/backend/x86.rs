//! x86_64 AVX2+FMA backend.
//!
//! Compiled only when both `avx2` and `fma` are enabled at compile time, so
//! every intrinsic here is available unconditionally.

use super::{assert_mask_in_bounds, Backend, ByteLanes, FloatLanes, LaneMask, Lanes};
use crate::buffer::assert_lane_aligned;
use crate::element::{Element, Predicate};
use core::arch::x86_64::*;
use core::fmt::{Debug, Formatter};
use core::ops::*;

/// AVX2 Backend (8 × f32, 4 × f64, 8 × i32, 32 × u8).
#[derive(Copy, Clone, Debug, Default)]
pub struct Avx2;

impl Backend for Avx2 {
    const NAME: &'static str = "avx2+fma";

    type F32 = F32x8;
    type F64 = F64x4;
    type I32 = I32x8;
    type U8 = U8x32;

    #[inline(always)]
    fn widen_u8(src: &[u8]) -> F32x8 {
        assert!(src.len() >= 8, "widen_u8 needs 8 bytes, got {}", src.len());
        unsafe {
            let bytes = _mm_loadl_epi64(src.as_ptr() as *const __m128i);
            F32x8(_mm256_cvtepi32_ps(_mm256_cvtepu8_epi32(bytes)))
        }
    }

    #[inline(always)]
    fn narrow_u8(v: F32x8, dst: &mut [u8]) {
        assert!(dst.len() >= 8, "narrow_u8 needs 8 bytes, got {}", dst.len());
        unsafe {
            // cvtps rounds to nearest-even; NaN and overflow become i32::MIN,
            // which the unsigned packs saturate to 0.
            let ints = _mm256_cvtps_epi32(v.0);
            let lo = _mm256_castsi256_si128(ints);
            let hi = _mm256_extracti128_si256(ints, 1);
            let words = _mm_packus_epi32(lo, hi);
            let bytes = _mm_packus_epi16(words, words);
            _mm_storel_epi64(dst.as_mut_ptr() as *mut __m128i, bytes);
        }
    }

    #[inline(always)]
    fn f32_to_i32_trunc(v: F32x8) -> I32x8 {
        unsafe { I32x8(_mm256_cvttps_epi32(v.0)) }
    }

    #[inline(always)]
    fn i32_to_f32(v: I32x8) -> F32x8 {
        unsafe { F32x8(_mm256_cvtepi32_ps(v.0)) }
    }

    #[inline(always)]
    fn f32_to_f64(v: F32x8) -> (F64x4, F64x4) {
        unsafe {
            let lo = _mm256_castps256_ps128(v.0);
            let hi = _mm256_extractf128_ps(v.0, 1);
            (F64x4(_mm256_cvtps_pd(lo)), F64x4(_mm256_cvtps_pd(hi)))
        }
    }
}

// ============================================================================
// Mask8 - 8-lane mask shared by f32 and i32 lanes
// ============================================================================

/// 8-lane mask for AVX2.
///
/// Stored as a float vector where each lane is all-1s (true) or all-0s
/// (false), so it feeds `blendvps` directly. Integer lanes cast in and out.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct Mask8(__m256);

impl Debug for Mask8 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Mask8({:08b})", self.bitmask())
    }
}

impl LaneMask for Mask8 {
    type Word = u32;
    const LANES: usize = 8;

    #[inline(always)]
    fn bitmask(self) -> u32 {
        unsafe { _mm256_movemask_ps(self.0) as u32 }
    }

    #[inline(always)]
    fn load_words(src: &[u32]) -> Self {
        assert!(src.len() >= 8);
        unsafe {
            let raw = _mm256_loadu_si256(src.as_ptr() as *const __m256i);
            Self(_mm256_castsi256_ps(raw))
        }
    }

    #[inline(always)]
    fn store_words(self, dst: &mut [u32]) {
        assert!(dst.len() >= 8);
        unsafe {
            _mm256_storeu_si256(dst.as_mut_ptr() as *mut __m256i, _mm256_castps_si256(self.0))
        }
    }
}

impl BitAnd for Mask8 {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_and_ps(self.0, rhs.0)) }
    }
}

impl BitOr for Mask8 {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_or_ps(self.0, rhs.0)) }
    }
}

impl Not for Mask8 {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self {
        unsafe {
            let all_ones = _mm256_castsi256_ps(_mm256_set1_epi32(-1));
            Self(_mm256_xor_ps(self.0, all_ones))
        }
    }
}

// ============================================================================
// Mask4d - 4-lane mask for f64 lanes
// ============================================================================

/// 4-lane mask with 64-bit lane words.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct Mask4d(__m256d);

impl Debug for Mask4d {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Mask4d({:04b})", self.bitmask())
    }
}

impl LaneMask for Mask4d {
    type Word = u64;
    const LANES: usize = 4;

    #[inline(always)]
    fn bitmask(self) -> u32 {
        unsafe { _mm256_movemask_pd(self.0) as u32 }
    }

    #[inline(always)]
    fn load_words(src: &[u64]) -> Self {
        assert!(src.len() >= 4);
        unsafe {
            let raw = _mm256_loadu_si256(src.as_ptr() as *const __m256i);
            Self(_mm256_castsi256_pd(raw))
        }
    }

    #[inline(always)]
    fn store_words(self, dst: &mut [u64]) {
        assert!(dst.len() >= 4);
        unsafe {
            _mm256_storeu_si256(dst.as_mut_ptr() as *mut __m256i, _mm256_castpd_si256(self.0))
        }
    }
}

impl BitAnd for Mask4d {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_and_pd(self.0, rhs.0)) }
    }
}

impl BitOr for Mask4d {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_or_pd(self.0, rhs.0)) }
    }
}

impl Not for Mask4d {
    type Output = Self;
    #[inline(always)]
    fn not(self) -> Self {
        unsafe {
            let all_ones = _mm256_castsi256_pd(_mm256_set1_epi32(-1));
            Self(_mm256_xor_pd(self.0, all_ones))
        }
    }
}

// ============================================================================
// F32x8
// ============================================================================

/// 8-lane f32 SIMD vector for AVX2.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct F32x8(__m256);

impl F32x8 {
    #[inline(always)]
    fn to_array(self) -> [f32; 8] {
        let mut arr = [0.0f32; 8];
        unsafe { _mm256_storeu_ps(arr.as_mut_ptr(), self.0) };
        arr
    }
}

impl Debug for F32x8 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "F32x8({:?})", self.to_array())
    }
}

impl Lanes for F32x8 {
    type Elem = f32;
    type Mask = Mask8;
    const LANES: usize = 8;

    #[inline(always)]
    fn splat(val: f32) -> Self {
        unsafe { Self(_mm256_set1_ps(val)) }
    }

    #[inline(always)]
    fn load(src: &[f32]) -> Self {
        assert!(src.len() >= Self::LANES);
        unsafe { Self(_mm256_loadu_ps(src.as_ptr())) }
    }

    #[inline(always)]
    #[track_caller]
    fn load_aligned(src: &[f32]) -> Self {
        assert_lane_aligned(src);
        assert!(src.len() >= Self::LANES);
        unsafe { Self(_mm256_load_ps(src.as_ptr())) }
    }

    #[inline(always)]
    fn store(self, dst: &mut [f32]) {
        assert!(dst.len() >= Self::LANES);
        unsafe { _mm256_storeu_ps(dst.as_mut_ptr(), self.0) }
    }

    #[inline(always)]
    #[track_caller]
    fn load_masked(src: &[f32], mask: Mask8) -> Self {
        assert_mask_in_bounds(mask.bitmask(), src.len());
        // Cleared lanes are not accessed, so reading short of LANES is sound.
        unsafe { Self(_mm256_maskload_ps(src.as_ptr(), _mm256_castps_si256(mask.0))) }
    }

    #[inline(always)]
    #[track_caller]
    fn store_masked(self, dst: &mut [f32], mask: Mask8) {
        assert_mask_in_bounds(mask.bitmask(), dst.len());
        unsafe { _mm256_maskstore_ps(dst.as_mut_ptr(), _mm256_castps_si256(mask.0), self.0) }
    }

    #[inline(always)]
    fn lane(self, i: usize) -> f32 {
        self.to_array()[i]
    }

    #[inline(always)]
    fn with_lane(self, i: usize, val: f32) -> Self {
        let mut arr = self.to_array();
        arr[i] = val;
        Self::load(&arr)
    }

    #[inline(always)]
    fn simd_min(self, rhs: Self) -> Self {
        unsafe {
            // minps already yields rhs when self is NaN; patch rhs-is-NaN to self.
            let rhs_nan = _mm256_cmp_ps(rhs.0, rhs.0, _CMP_UNORD_Q);
            Self(_mm256_blendv_ps(_mm256_min_ps(self.0, rhs.0), self.0, rhs_nan))
        }
    }

    #[inline(always)]
    fn simd_max(self, rhs: Self) -> Self {
        unsafe {
            let rhs_nan = _mm256_cmp_ps(rhs.0, rhs.0, _CMP_UNORD_Q);
            Self(_mm256_blendv_ps(_mm256_max_ps(self.0, rhs.0), self.0, rhs_nan))
        }
    }

    #[inline(always)]
    fn cmp(self, rhs: Self, pred: Predicate) -> Mask8 {
        unsafe {
            Mask8(match pred {
                Predicate::Gt => _mm256_cmp_ps(self.0, rhs.0, _CMP_GT_OQ),
                Predicate::Ge => _mm256_cmp_ps(self.0, rhs.0, _CMP_GE_OQ),
                Predicate::Lt => _mm256_cmp_ps(self.0, rhs.0, _CMP_LT_OQ),
                Predicate::Le => _mm256_cmp_ps(self.0, rhs.0, _CMP_LE_OQ),
                Predicate::Eq => _mm256_cmp_ps(self.0, rhs.0, _CMP_EQ_OQ),
                Predicate::Ne => _mm256_cmp_ps(self.0, rhs.0, _CMP_NEQ_UQ),
            })
        }
    }

    #[inline(always)]
    fn select(mask: Mask8, if_true: Self, if_false: Self) -> Self {
        unsafe { Self(_mm256_blendv_ps(if_false.0, if_true.0, mask.0)) }
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_andnot_ps(self.0, rhs.0)) }
    }
}

impl FloatLanes for F32x8 {
    #[inline(always)]
    fn simd_sqrt(self) -> Self {
        unsafe { Self(_mm256_sqrt_ps(self.0)) }
    }

    #[inline(always)]
    fn mul_add(self, b: Self, c: Self) -> Self {
        unsafe { Self(_mm256_fmadd_ps(self.0, b.0, c.0)) }
    }

    #[inline(always)]
    fn neg(self) -> Self {
        unsafe { Self(_mm256_xor_ps(self.0, _mm256_set1_ps(-0.0))) }
    }

    #[inline(always)]
    fn hadd(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_hadd_ps(self.0, rhs.0)) }
    }

    #[inline(always)]
    fn hsub(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_hsub_ps(self.0, rhs.0)) }
    }
}

impl Add for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_add_ps(self.0, rhs.0)) }
    }
}

impl Sub for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_sub_ps(self.0, rhs.0)) }
    }
}

impl Mul for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_mul_ps(self.0, rhs.0)) }
    }
}

impl Div for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_div_ps(self.0, rhs.0)) }
    }
}

impl BitAnd for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_and_ps(self.0, rhs.0)) }
    }
}

impl BitOr for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_or_ps(self.0, rhs.0)) }
    }
}

impl BitXor for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_xor_ps(self.0, rhs.0)) }
    }
}

// ============================================================================
// F64x4
// ============================================================================

/// 4-lane f64 SIMD vector for AVX2.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct F64x4(__m256d);

impl F64x4 {
    #[inline(always)]
    fn to_array(self) -> [f64; 4] {
        let mut arr = [0.0f64; 4];
        unsafe { _mm256_storeu_pd(arr.as_mut_ptr(), self.0) };
        arr
    }
}

impl Debug for F64x4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "F64x4({:?})", self.to_array())
    }
}

impl Lanes for F64x4 {
    type Elem = f64;
    type Mask = Mask4d;
    const LANES: usize = 4;

    #[inline(always)]
    fn splat(val: f64) -> Self {
        unsafe { Self(_mm256_set1_pd(val)) }
    }

    #[inline(always)]
    fn load(src: &[f64]) -> Self {
        assert!(src.len() >= Self::LANES);
        unsafe { Self(_mm256_loadu_pd(src.as_ptr())) }
    }

    #[inline(always)]
    #[track_caller]
    fn load_aligned(src: &[f64]) -> Self {
        assert_lane_aligned(src);
        assert!(src.len() >= Self::LANES);
        unsafe { Self(_mm256_load_pd(src.as_ptr())) }
    }

    #[inline(always)]
    fn store(self, dst: &mut [f64]) {
        assert!(dst.len() >= Self::LANES);
        unsafe { _mm256_storeu_pd(dst.as_mut_ptr(), self.0) }
    }

    #[inline(always)]
    #[track_caller]
    fn load_masked(src: &[f64], mask: Mask4d) -> Self {
        assert_mask_in_bounds(mask.bitmask(), src.len());
        unsafe { Self(_mm256_maskload_pd(src.as_ptr(), _mm256_castpd_si256(mask.0))) }
    }

    #[inline(always)]
    #[track_caller]
    fn store_masked(self, dst: &mut [f64], mask: Mask4d) {
        assert_mask_in_bounds(mask.bitmask(), dst.len());
        unsafe { _mm256_maskstore_pd(dst.as_mut_ptr(), _mm256_castpd_si256(mask.0), self.0) }
    }

    #[inline(always)]
    fn lane(self, i: usize) -> f64 {
        self.to_array()[i]
    }

    #[inline(always)]
    fn with_lane(self, i: usize, val: f64) -> Self {
        let mut arr = self.to_array();
        arr[i] = val;
        Self::load(&arr)
    }

    #[inline(always)]
    fn simd_min(self, rhs: Self) -> Self {
        unsafe {
            let rhs_nan = _mm256_cmp_pd(rhs.0, rhs.0, _CMP_UNORD_Q);
            Self(_mm256_blendv_pd(_mm256_min_pd(self.0, rhs.0), self.0, rhs_nan))
        }
    }

    #[inline(always)]
    fn simd_max(self, rhs: Self) -> Self {
        unsafe {
            let rhs_nan = _mm256_cmp_pd(rhs.0, rhs.0, _CMP_UNORD_Q);
            Self(_mm256_blendv_pd(_mm256_max_pd(self.0, rhs.0), self.0, rhs_nan))
        }
    }

    #[inline(always)]
    fn cmp(self, rhs: Self, pred: Predicate) -> Mask4d {
        unsafe {
            Mask4d(match pred {
                Predicate::Gt => _mm256_cmp_pd(self.0, rhs.0, _CMP_GT_OQ),
                Predicate::Ge => _mm256_cmp_pd(self.0, rhs.0, _CMP_GE_OQ),
                Predicate::Lt => _mm256_cmp_pd(self.0, rhs.0, _CMP_LT_OQ),
                Predicate::Le => _mm256_cmp_pd(self.0, rhs.0, _CMP_LE_OQ),
                Predicate::Eq => _mm256_cmp_pd(self.0, rhs.0, _CMP_EQ_OQ),
                Predicate::Ne => _mm256_cmp_pd(self.0, rhs.0, _CMP_NEQ_UQ),
            })
        }
    }

    #[inline(always)]
    fn select(mask: Mask4d, if_true: Self, if_false: Self) -> Self {
        unsafe { Self(_mm256_blendv_pd(if_false.0, if_true.0, mask.0)) }
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_andnot_pd(self.0, rhs.0)) }
    }
}

impl FloatLanes for F64x4 {
    #[inline(always)]
    fn simd_sqrt(self) -> Self {
        unsafe { Self(_mm256_sqrt_pd(self.0)) }
    }

    #[inline(always)]
    fn mul_add(self, b: Self, c: Self) -> Self {
        unsafe { Self(_mm256_fmadd_pd(self.0, b.0, c.0)) }
    }

    #[inline(always)]
    fn neg(self) -> Self {
        unsafe { Self(_mm256_xor_pd(self.0, _mm256_set1_pd(-0.0))) }
    }

    #[inline(always)]
    fn hadd(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_hadd_pd(self.0, rhs.0)) }
    }

    #[inline(always)]
    fn hsub(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_hsub_pd(self.0, rhs.0)) }
    }
}

impl Add for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_add_pd(self.0, rhs.0)) }
    }
}

impl Sub for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_sub_pd(self.0, rhs.0)) }
    }
}

impl Mul for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_mul_pd(self.0, rhs.0)) }
    }
}

impl Div for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_div_pd(self.0, rhs.0)) }
    }
}

impl BitAnd for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_and_pd(self.0, rhs.0)) }
    }
}

impl BitOr for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_or_pd(self.0, rhs.0)) }
    }
}

impl BitXor for F64x4 {
    type Output = Self;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_xor_pd(self.0, rhs.0)) }
    }
}

// ============================================================================
// I32x8
// ============================================================================

/// 8-lane i32 SIMD vector for AVX2.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct I32x8(__m256i);

impl I32x8 {
    #[inline(always)]
    fn to_array(self) -> [i32; 8] {
        let mut arr = [0i32; 8];
        unsafe { _mm256_storeu_si256(arr.as_mut_ptr() as *mut __m256i, self.0) };
        arr
    }

    #[inline(always)]
    fn from_array(arr: [i32; 8]) -> Self {
        Self::load(&arr)
    }

    #[inline(always)]
    fn all_ones() -> __m256i {
        unsafe { _mm256_set1_epi32(-1) }
    }
}

impl Debug for I32x8 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "I32x8({:?})", self.to_array())
    }
}

impl Lanes for I32x8 {
    type Elem = i32;
    type Mask = Mask8;
    const LANES: usize = 8;

    #[inline(always)]
    fn splat(val: i32) -> Self {
        unsafe { Self(_mm256_set1_epi32(val)) }
    }

    #[inline(always)]
    fn load(src: &[i32]) -> Self {
        assert!(src.len() >= Self::LANES);
        unsafe { Self(_mm256_loadu_si256(src.as_ptr() as *const __m256i)) }
    }

    #[inline(always)]
    #[track_caller]
    fn load_aligned(src: &[i32]) -> Self {
        assert_lane_aligned(src);
        assert!(src.len() >= Self::LANES);
        unsafe { Self(_mm256_load_si256(src.as_ptr() as *const __m256i)) }
    }

    #[inline(always)]
    fn store(self, dst: &mut [i32]) {
        assert!(dst.len() >= Self::LANES);
        unsafe { _mm256_storeu_si256(dst.as_mut_ptr() as *mut __m256i, self.0) }
    }

    #[inline(always)]
    #[track_caller]
    fn load_masked(src: &[i32], mask: Mask8) -> Self {
        assert_mask_in_bounds(mask.bitmask(), src.len());
        unsafe { Self(_mm256_maskload_epi32(src.as_ptr(), _mm256_castps_si256(mask.0))) }
    }

    #[inline(always)]
    #[track_caller]
    fn store_masked(self, dst: &mut [i32], mask: Mask8) {
        assert_mask_in_bounds(mask.bitmask(), dst.len());
        unsafe { _mm256_maskstore_epi32(dst.as_mut_ptr(), _mm256_castps_si256(mask.0), self.0) }
    }

    #[inline(always)]
    fn lane(self, i: usize) -> i32 {
        self.to_array()[i]
    }

    #[inline(always)]
    fn with_lane(self, i: usize, val: i32) -> Self {
        let mut arr = self.to_array();
        arr[i] = val;
        Self::from_array(arr)
    }

    #[inline(always)]
    fn simd_min(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_min_epi32(self.0, rhs.0)) }
    }

    #[inline(always)]
    fn simd_max(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_max_epi32(self.0, rhs.0)) }
    }

    #[inline(always)]
    fn cmp(self, rhs: Self, pred: Predicate) -> Mask8 {
        unsafe {
            let (a, b) = (self.0, rhs.0);
            // AVX2 only has signed gt/eq; the rest are swaps and inversions.
            let bits = match pred {
                Predicate::Gt => _mm256_cmpgt_epi32(a, b),
                Predicate::Lt => _mm256_cmpgt_epi32(b, a),
                Predicate::Ge => _mm256_xor_si256(_mm256_cmpgt_epi32(b, a), Self::all_ones()),
                Predicate::Le => _mm256_xor_si256(_mm256_cmpgt_epi32(a, b), Self::all_ones()),
                Predicate::Eq => _mm256_cmpeq_epi32(a, b),
                Predicate::Ne => _mm256_xor_si256(_mm256_cmpeq_epi32(a, b), Self::all_ones()),
            };
            Mask8(_mm256_castsi256_ps(bits))
        }
    }

    #[inline(always)]
    fn select(mask: Mask8, if_true: Self, if_false: Self) -> Self {
        unsafe {
            let m = _mm256_castps_si256(mask.0);
            Self(_mm256_blendv_epi8(if_false.0, if_true.0, m))
        }
    }

    #[inline(always)]
    fn and_not(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_andnot_si256(self.0, rhs.0)) }
    }
}

impl Add for I32x8 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_add_epi32(self.0, rhs.0)) }
    }
}

impl Sub for I32x8 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_sub_epi32(self.0, rhs.0)) }
    }
}

impl Mul for I32x8 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_mullo_epi32(self.0, rhs.0)) }
    }
}

impl Div for I32x8 {
    type Output = Self;
    /// No integer divide instruction; divides lane by lane.
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        let (a, b) = (self.to_array(), rhs.to_array());
        Self::from_array(core::array::from_fn(|i| a[i].lane_div(b[i])))
    }
}

impl BitAnd for I32x8 {
    type Output = Self;
    #[inline(always)]
    fn bitand(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_and_si256(self.0, rhs.0)) }
    }
}

impl BitOr for I32x8 {
    type Output = Self;
    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_or_si256(self.0, rhs.0)) }
    }
}

impl BitXor for I32x8 {
    type Output = Self;
    #[inline(always)]
    fn bitxor(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_xor_si256(self.0, rhs.0)) }
    }
}

// ============================================================================
// U8x32 - byte lanes for pixel data
// ============================================================================

/// 32-lane u8 SIMD vector for AVX2.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct U8x32(__m256i);

impl Debug for U8x32 {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let mut arr = [0u8; 32];
        self.store(&mut arr);
        write!(f, "U8x32({:?})", arr)
    }
}

impl ByteLanes for U8x32 {
    const LANES: usize = 32;

    #[inline(always)]
    fn splat(val: u8) -> Self {
        unsafe { Self(_mm256_set1_epi8(val as i8)) }
    }

    #[inline(always)]
    fn load(src: &[u8]) -> Self {
        assert!(src.len() >= Self::LANES);
        unsafe { Self(_mm256_loadu_si256(src.as_ptr() as *const __m256i)) }
    }

    #[inline(always)]
    fn store(self, dst: &mut [u8]) {
        assert!(dst.len() >= Self::LANES);
        unsafe { _mm256_storeu_si256(dst.as_mut_ptr() as *mut __m256i, self.0) }
    }

    #[inline(always)]
    fn saturating_add(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_adds_epu8(self.0, rhs.0)) }
    }

    #[inline(always)]
    fn saturating_sub(self, rhs: Self) -> Self {
        unsafe { Self(_mm256_subs_epu8(self.0, rhs.0)) }
    }
}
