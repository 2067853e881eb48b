//! Lane element types and their per-lane semantics.
//!
//! The scalar reference kernels call these methods directly and the portable
//! backend applies them lane by lane. The AVX2 backend must reproduce them
//! bit for bit, which is what the equivalence tests check.

use core::fmt::Debug;
use core::ops::{BitAnd, BitOr, BitXor, Not};

use crate::backend::{Backend, FloatLanes, Lanes};

/// Comparison predicate used by the compare kernels.
///
/// `Gt`, `Ge`, `Lt`, `Le` and `Eq` are ordered: any NaN operand yields false.
/// `Ne` is unordered: any NaN operand yields true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Predicate {
    /// Every predicate, in declaration order.
    pub const ALL: [Predicate; 6] = [
        Predicate::Gt,
        Predicate::Ge,
        Predicate::Lt,
        Predicate::Le,
        Predicate::Eq,
        Predicate::Ne,
    ];
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for i32 {}
    impl Sealed for u8 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
}

/// Types whose all-zero bit pattern is a valid value.
///
/// [`LaneBuffer`](crate::LaneBuffer) hands out zeroed memory, so it only
/// stores these.
pub trait Plain: Copy + Default + Debug + Send + Sync + 'static + sealed::Sealed {}

impl Plain for f32 {}
impl Plain for f64 {}
impl Plain for i32 {}
impl Plain for u8 {}
impl Plain for u32 {}
impl Plain for u64 {}

/// One lane of a mask: all bits set or all bits clear.
pub trait MaskWord:
    Plain
    + Eq
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
{
    /// All bits set (lane selected).
    const SET: Self;
    /// All bits clear (lane not selected).
    const CLEAR: Self;

    /// Branch-free conversion from a predicate result.
    fn from_bool(b: bool) -> Self;

    /// True when the word is [`MaskWord::SET`].
    #[inline(always)]
    fn is_set(self) -> bool {
        self == Self::SET
    }
}

impl MaskWord for u32 {
    const SET: Self = u32::MAX;
    const CLEAR: Self = 0;

    #[inline(always)]
    fn from_bool(b: bool) -> Self {
        (b as u32).wrapping_neg()
    }
}

impl MaskWord for u64 {
    const SET: Self = u64::MAX;
    const CLEAR: Self = 0;

    #[inline(always)]
    fn from_bool(b: bool) -> Self {
        (b as u64).wrapping_neg()
    }
}

/// A numeric lane element.
pub trait Element: Plain + PartialEq + PartialOrd {
    /// Raw bit pattern of one lane; also the mask word for this width.
    type Bits: MaskWord;

    /// Lane vector holding this element on backend `B`.
    type Lanes<B: Backend>: Lanes<Elem = Self>;

    /// Short type name used in harness labels.
    const NAME: &'static str;

    /// Additive identity.
    const ZERO: Self;

    fn to_bits(self) -> Self::Bits;
    fn from_bits(bits: Self::Bits) -> Self;

    fn lane_add(self, rhs: Self) -> Self;
    fn lane_sub(self, rhs: Self) -> Self;
    fn lane_mul(self, rhs: Self) -> Self;
    fn lane_div(self, rhs: Self) -> Self;

    /// Minimum. For floats, when exactly one operand is NaN the other operand
    /// is returned; when `rhs` is NaN the result is `self`.
    fn lane_min(self, rhs: Self) -> Self;

    /// Maximum, with the same NaN rule as [`Element::lane_min`].
    fn lane_max(self, rhs: Self) -> Self;

    /// Evaluate `pred` on `(self, rhs)`.
    #[inline(always)]
    fn compare(self, rhs: Self, pred: Predicate) -> bool {
        match pred {
            Predicate::Gt => self > rhs,
            Predicate::Ge => self >= rhs,
            Predicate::Lt => self < rhs,
            Predicate::Le => self <= rhs,
            Predicate::Eq => self == rhs,
            Predicate::Ne => self != rhs,
        }
    }

    /// Bit-exact equality, treating any two NaNs as equal.
    #[inline(always)]
    fn same_as(self, other: Self) -> bool {
        (self.is_nan_lane() && other.is_nan_lane()) || self.to_bits() == other.to_bits()
    }

    /// True for floating-point NaN; always false for integers.
    fn is_nan_lane(self) -> bool;
}

/// A floating-point lane element.
pub trait FloatElement: Element {
    /// Lane vector holding this element on backend `B`, with float operations.
    type FloatLanes<B: Backend>: FloatLanes<Elem = Self>;

    const NAN: Self;

    fn lane_sqrt(self) -> Self;

    /// `self * b + c` with a single rounding.
    fn lane_mul_add(self, b: Self, c: Self) -> Self;

    fn lane_neg(self) -> Self;

    fn to_f64(self) -> f64;
}

macro_rules! impl_float_element {
    ($t:ty, $bits:ty, $lanes:ident, $name:literal) => {
        impl Element for $t {
            type Bits = $bits;
            type Lanes<B: Backend> = B::$lanes;

            const NAME: &'static str = $name;
            const ZERO: Self = 0.0;

            #[inline(always)]
            fn to_bits(self) -> $bits {
                <$t>::to_bits(self)
            }

            #[inline(always)]
            fn from_bits(bits: $bits) -> Self {
                <$t>::from_bits(bits)
            }

            #[inline(always)]
            fn lane_add(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline(always)]
            fn lane_sub(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline(always)]
            fn lane_mul(self, rhs: Self) -> Self {
                self * rhs
            }

            #[inline(always)]
            fn lane_div(self, rhs: Self) -> Self {
                self / rhs
            }

            #[inline(always)]
            fn lane_min(self, rhs: Self) -> Self {
                // Hardware min returns rhs whenever the compare is false; the
                // rhs-is-NaN case is patched back to self.
                if rhs.is_nan() {
                    self
                } else if self < rhs {
                    self
                } else {
                    rhs
                }
            }

            #[inline(always)]
            fn lane_max(self, rhs: Self) -> Self {
                if rhs.is_nan() {
                    self
                } else if self > rhs {
                    self
                } else {
                    rhs
                }
            }

            #[inline(always)]
            fn is_nan_lane(self) -> bool {
                self.is_nan()
            }
        }

        impl FloatElement for $t {
            type FloatLanes<B: Backend> = B::$lanes;

            const NAN: Self = <$t>::NAN;

            #[inline(always)]
            fn lane_sqrt(self) -> Self {
                self.sqrt()
            }

            #[inline(always)]
            fn lane_mul_add(self, b: Self, c: Self) -> Self {
                self.mul_add(b, c)
            }

            #[inline(always)]
            fn lane_neg(self) -> Self {
                -self
            }

            #[inline(always)]
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_float_element!(f32, u32, F32, "f32");
impl_float_element!(f64, u64, F64, "f64");

impl Element for i32 {
    type Bits = u32;
    type Lanes<B: Backend> = B::I32;

    const NAME: &'static str = "i32";
    const ZERO: Self = 0;

    #[inline(always)]
    fn to_bits(self) -> u32 {
        self as u32
    }

    #[inline(always)]
    fn from_bits(bits: u32) -> Self {
        bits as i32
    }

    #[inline(always)]
    fn lane_add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    #[inline(always)]
    fn lane_sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }

    #[inline(always)]
    fn lane_mul(self, rhs: Self) -> Self {
        self.wrapping_mul(rhs)
    }

    /// Panics when `rhs == 0`; `i32::MIN / -1` wraps to `i32::MIN`.
    #[inline(always)]
    fn lane_div(self, rhs: Self) -> Self {
        assert!(rhs != 0, "i32 lane division by zero");
        self.wrapping_div(rhs)
    }

    #[inline(always)]
    fn lane_min(self, rhs: Self) -> Self {
        Ord::min(self, rhs)
    }

    #[inline(always)]
    fn lane_max(self, rhs: Self) -> Self {
        Ord::max(self, rhs)
    }

    #[inline(always)]
    fn is_nan_lane(self) -> bool {
        false
    }
}

// ============================================================================
// Conversion semantics shared by the scalar path and the portable backend
// ============================================================================

const I32_RANGE_HI: f32 = 2_147_483_648.0;
const I32_RANGE_LO: f32 = -2_147_483_648.0;

/// f32 → i32 with truncation. NaN and out-of-range inputs produce
/// `i32::MIN`, the x86 "integer indefinite" value.
#[inline(always)]
pub fn cvt_trunc_i32(v: f32) -> i32 {
    if v >= I32_RANGE_LO && v < I32_RANGE_HI {
        v as i32
    } else {
        i32::MIN
    }
}

/// f32 → i32 rounding to nearest, ties to even. NaN and out-of-range inputs
/// produce `i32::MIN`.
#[inline(always)]
pub fn cvt_round_i32(v: f32) -> i32 {
    if v >= I32_RANGE_LO && v < I32_RANGE_HI {
        v.round_ties_even() as i32
    } else {
        i32::MIN
    }
}

/// Saturating narrow of an i32 lane to a byte.
#[inline(always)]
pub fn saturate_u8(v: i32) -> u8 {
    v.clamp(0, u8::MAX as i32) as u8
}

/// Round-to-nearest-even, then saturate to a byte. This is the store step of
/// the pixel kernels.
#[inline(always)]
pub fn round_to_u8(v: f32) -> u8 {
    saturate_u8(cvt_round_i32(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_nan_returns_other_operand() {
        assert_eq!(f32::NAN.lane_min(3.0), 3.0);
        assert_eq!(3.0f32.lane_min(f32::NAN), 3.0);
        assert_eq!(f32::NAN.lane_max(-3.0), -3.0);
        assert_eq!((-3.0f64).lane_max(f64::NAN), -3.0);
        assert!(f32::NAN.lane_min(f32::NAN).is_nan());
    }

    #[test]
    fn test_min_signed_zero_takes_rhs() {
        // The compare is false for equal operands, so rhs wins.
        assert!(0.0f32.lane_min(-0.0).is_sign_negative());
        assert!((-0.0f32).lane_min(0.0).is_sign_positive());
    }

    #[test]
    fn test_predicates_on_nan() {
        for pred in Predicate::ALL {
            let expected = pred == Predicate::Ne;
            assert_eq!(f32::NAN.compare(1.0, pred), expected, "{:?}", pred);
        }
    }

    #[test]
    fn test_i32_wrapping() {
        assert_eq!(i32::MAX.lane_add(1), i32::MIN);
        assert_eq!(i32::MIN.lane_div(-1), i32::MIN);
        assert_eq!(7i32.lane_div(-2), -3);
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn test_i32_div_by_zero_panics() {
        let _ = 1i32.lane_div(0);
    }

    #[test]
    fn test_conversion_edges() {
        assert_eq!(cvt_trunc_i32(-1.9), -1);
        assert_eq!(cvt_trunc_i32(f32::NAN), i32::MIN);
        assert_eq!(cvt_trunc_i32(3.0e9), i32::MIN);
        assert_eq!(cvt_round_i32(2.5), 2);
        assert_eq!(cvt_round_i32(3.5), 4);
        assert_eq!(round_to_u8(254.6), 255);
        assert_eq!(round_to_u8(-4.0), 0);
        assert_eq!(round_to_u8(f32::NAN), 0);
    }

    #[test]
    fn test_mask_word_from_bool() {
        assert_eq!(<u32 as MaskWord>::from_bool(true), u32::MAX);
        assert_eq!(<u64 as MaskWord>::from_bool(false), 0);
        assert!(<u64 as MaskWord>::SET.is_set());
    }
}
