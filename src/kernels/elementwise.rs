//! Elementwise arithmetic, bitwise operations and clamping.

use super::{assert_same_len, block_end};
use crate::backend::{FloatLanes, Lanes};
use crate::buffer::LaneBuffer;
use crate::element::{Element, FloatElement};

/// Binary arithmetic operations over numeric lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// Integer division by zero panics.
    Div,
    /// Lane minimum; for floats a NaN `rhs` yields `lhs`.
    Min,
    Max,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 6] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Min,
        BinaryOp::Max,
    ];

    /// Apply to a single pair of lanes.
    #[inline(always)]
    pub fn apply<T: Element>(self, a: T, b: T) -> T {
        match self {
            BinaryOp::Add => a.lane_add(b),
            BinaryOp::Sub => a.lane_sub(b),
            BinaryOp::Mul => a.lane_mul(b),
            BinaryOp::Div => a.lane_div(b),
            BinaryOp::Min => a.lane_min(b),
            BinaryOp::Max => a.lane_max(b),
        }
    }

    #[inline(always)]
    fn apply_lanes<V: Lanes>(self, a: V, b: V) -> V {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Min => a.simd_min(b),
            BinaryOp::Max => a.simd_max(b),
        }
    }
}

/// Raw-bit operations over i32 lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
    /// `!a & b`.
    AndNot,
}

impl BitwiseOp {
    pub const ALL: [BitwiseOp; 4] = [
        BitwiseOp::And,
        BitwiseOp::Or,
        BitwiseOp::Xor,
        BitwiseOp::AndNot,
    ];

    #[inline(always)]
    pub fn apply(self, a: i32, b: i32) -> i32 {
        match self {
            BitwiseOp::And => a & b,
            BitwiseOp::Or => a | b,
            BitwiseOp::Xor => a ^ b,
            BitwiseOp::AndNot => !a & b,
        }
    }

    #[inline(always)]
    fn apply_lanes<V: Lanes<Elem = i32>>(self, a: V, b: V) -> V {
        match self {
            BitwiseOp::And => a & b,
            BitwiseOp::Or => a | b,
            BitwiseOp::Xor => a ^ b,
            BitwiseOp::AndNot => a.and_not(b),
        }
    }
}

// ============================================================================
// Scalar reference
// ============================================================================

fn map2<T: Element>(kernel: &str, a: &[T], b: &[T], f: impl Fn(T, T) -> T) -> LaneBuffer<T> {
    assert_same_len(kernel, a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

fn map3<T: Element>(
    kernel: &str,
    a: &[T],
    b: &[T],
    c: &[T],
    f: impl Fn(T, T, T) -> T,
) -> LaneBuffer<T> {
    assert_same_len(kernel, a.len(), b.len());
    assert_same_len(kernel, a.len(), c.len());
    let mut out = LaneBuffer::zeroed(a.len());
    for i in 0..a.len() {
        out[i] = f(a[i], b[i], c[i]);
    }
    out
}

pub(crate) fn binary_scalar<T: Element>(op: BinaryOp, a: &[T], b: &[T]) -> LaneBuffer<T> {
    map2("binary", a, b, |x, y| op.apply(x, y))
}

pub(crate) fn bitwise_scalar(op: BitwiseOp, a: &[i32], b: &[i32]) -> LaneBuffer<i32> {
    map2("bitwise", a, b, |x, y| op.apply(x, y))
}

pub(crate) fn sqrt_scalar<T: FloatElement>(a: &[T]) -> LaneBuffer<T> {
    a.iter().map(|&x| x.lane_sqrt()).collect()
}

pub(crate) fn fma_scalar<T: FloatElement>(a: &[T], b: &[T], c: &[T]) -> LaneBuffer<T> {
    map3("fma", a, b, c, |x, y, z| x.lane_mul_add(y, z))
}

pub(crate) fn mul_then_add_scalar<T: FloatElement>(a: &[T], b: &[T], c: &[T]) -> LaneBuffer<T> {
    map3("mul_then_add", a, b, c, |x, y, z| x.lane_mul(y).lane_add(z))
}

pub(crate) fn clamp_scalar<T: Element>(v: &[T], lo: T, hi: T) -> LaneBuffer<T> {
    v.iter().map(|&x| x.lane_max(lo).lane_min(hi)).collect()
}

// ============================================================================
// Vectorized
// ============================================================================

/// Full blocks through `block`, the tail through `tail`.
#[inline(always)]
fn blocks2<V: Lanes>(
    kernel: &str,
    a: &[V::Elem],
    b: &[V::Elem],
    block: impl Fn(V, V) -> V,
    tail: impl Fn(V::Elem, V::Elem) -> V::Elem,
) -> LaneBuffer<V::Elem> {
    assert_same_len(kernel, a.len(), b.len());
    let mut out = LaneBuffer::zeroed(a.len());
    let end = block_end(a.len(), V::LANES);

    for i in (0..end).step_by(V::LANES) {
        block(V::load(&a[i..]), V::load(&b[i..])).store(&mut out[i..]);
    }
    for i in end..a.len() {
        out[i] = tail(a[i], b[i]);
    }
    out
}

#[inline(always)]
fn blocks3<V: FloatLanes>(
    kernel: &str,
    a: &[V::Elem],
    b: &[V::Elem],
    c: &[V::Elem],
    block: impl Fn(V, V, V) -> V,
    tail: impl Fn(V::Elem, V::Elem, V::Elem) -> V::Elem,
) -> LaneBuffer<V::Elem>
where
    V::Elem: FloatElement,
{
    assert_same_len(kernel, a.len(), b.len());
    assert_same_len(kernel, a.len(), c.len());
    let mut out = LaneBuffer::zeroed(a.len());
    let end = block_end(a.len(), V::LANES);

    for i in (0..end).step_by(V::LANES) {
        block(V::load(&a[i..]), V::load(&b[i..]), V::load(&c[i..])).store(&mut out[i..]);
    }
    for i in end..a.len() {
        out[i] = tail(a[i], b[i], c[i]);
    }
    out
}

pub(crate) fn binary_vector<V: Lanes>(
    op: BinaryOp,
    a: &[V::Elem],
    b: &[V::Elem],
) -> LaneBuffer<V::Elem> {
    blocks2::<V>("binary", a, b, |x, y| op.apply_lanes(x, y), |x, y| op.apply(x, y))
}

pub(crate) fn bitwise_vector<V: Lanes<Elem = i32>>(
    op: BitwiseOp,
    a: &[i32],
    b: &[i32],
) -> LaneBuffer<i32> {
    blocks2::<V>("bitwise", a, b, |x, y| op.apply_lanes(x, y), |x, y| op.apply(x, y))
}

pub(crate) fn sqrt_vector<V: FloatLanes>(a: &[V::Elem]) -> LaneBuffer<V::Elem>
where
    V::Elem: FloatElement,
{
    let mut out = LaneBuffer::zeroed(a.len());
    let end = block_end(a.len(), V::LANES);

    for i in (0..end).step_by(V::LANES) {
        V::load(&a[i..]).simd_sqrt().store(&mut out[i..]);
    }
    for i in end..a.len() {
        out[i] = a[i].lane_sqrt();
    }
    out
}

pub(crate) fn fma_vector<V: FloatLanes>(
    a: &[V::Elem],
    b: &[V::Elem],
    c: &[V::Elem],
) -> LaneBuffer<V::Elem>
where
    V::Elem: FloatElement,
{
    blocks3::<V>("fma", a, b, c, |x, y, z| x.mul_add(y, z), |x, y, z| x.lane_mul_add(y, z))
}

pub(crate) fn mul_then_add_vector<V: FloatLanes>(
    a: &[V::Elem],
    b: &[V::Elem],
    c: &[V::Elem],
) -> LaneBuffer<V::Elem>
where
    V::Elem: FloatElement,
{
    blocks3::<V>(
        "mul_then_add",
        a,
        b,
        c,
        |x, y, z| x * y + z,
        |x, y, z| x.lane_mul(y).lane_add(z),
    )
}

pub(crate) fn clamp_vector<V: Lanes>(
    v: &[V::Elem],
    lo: V::Elem,
    hi: V::Elem,
) -> LaneBuffer<V::Elem> {
    let mut out = LaneBuffer::zeroed(v.len());
    let end = block_end(v.len(), V::LANES);
    let (vlo, vhi) = (V::splat(lo), V::splat(hi));

    for i in (0..end).step_by(V::LANES) {
        V::load(&v[i..]).simd_max(vlo).simd_min(vhi).store(&mut out[i..]);
    }
    for i in end..v.len() {
        out[i] = v[i].lane_max(lo).lane_min(hi);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::portable::Portable;
    use crate::backend::Backend;

    type P = Portable;

    fn assert_same<T: Element>(got: &[T], want: &[T]) {
        assert_eq!(got.len(), want.len());
        for (i, (g, w)) in got.iter().zip(want).enumerate() {
            assert!(g.same_as(*w), "lane {i}: got {:?}, want {:?}", g, w);
        }
    }

    #[test]
    fn test_binary_f32_with_tail() {
        let a: Vec<f32> = (0..19).map(|i| i as f32 * 1.25 - 7.0).collect();
        let b: Vec<f32> = (0..19).map(|i| 3.5 - i as f32 * 0.5).collect();
        for op in BinaryOp::ALL {
            let want = binary_scalar(op, &a, &b);
            let got = binary_vector::<<P as Backend>::F32>(op, &a, &b);
            assert_same(&got, &want);
        }
    }

    #[test]
    fn test_binary_min_nan_rule() {
        let a = [f32::NAN, 1.0, f32::NAN, 2.0];
        let b = [5.0, f32::NAN, f32::NAN, 3.0];
        let got = binary_scalar(BinaryOp::Min, &a, &b);
        assert_eq!(got[0], 5.0);
        assert_eq!(got[1], 1.0);
        assert!(got[2].is_nan());
        assert_eq!(got[3], 2.0);
    }

    #[test]
    fn test_binary_i32_wraps() {
        let a = [i32::MAX, i32::MIN, 5, 6, 7, 8, 9, 10, 11];
        let b = [1, 1, 2, 2, 2, 2, 2, 2, 2];
        let got = binary_vector::<<P as Backend>::I32>(BinaryOp::Add, &a, &b);
        assert_eq!(got[0], i32::MIN);
        assert_eq!(got[1], i32::MIN + 1);
        assert_eq!(got[8], 13);
    }

    #[test]
    fn test_bitwise() {
        let a = [0b1100, -1, 0, 7, 1, 2, 3, 4, 0x0F0F];
        let b = [0b1010, 0, -1, 7, 1, 2, 3, 4, 0x00FF];
        for op in BitwiseOp::ALL {
            let want = bitwise_scalar(op, &a, &b);
            let got = bitwise_vector::<<P as Backend>::I32>(op, &a, &b);
            assert_eq!(&got[..], &want[..], "{:?}", op);
        }
        assert_eq!(bitwise_scalar(BitwiseOp::AndNot, &a, &b)[8], 0x00F0);
    }

    #[test]
    fn test_fma_matches_fused_scalar() {
        let a = [0.1f32; 11];
        let b = [10.0f32; 11];
        let c = [-1.0f32; 11];
        let fused = fma_vector::<<P as Backend>::F32>(&a, &b, &c);
        for &x in fused.iter() {
            assert_eq!(x, 0.1f32.mul_add(10.0, -1.0));
        }
        let unfused = mul_then_add_scalar(&a, &b, &c);
        assert_eq!(unfused[0], 0.1f32 * 10.0 - 1.0);
    }

    #[test]
    fn test_sqrt_f64() {
        let a = [4.0f64, 9.0, 2.0, -1.0, 0.0];
        let got = sqrt_vector::<<P as Backend>::F64>(&a);
        assert_same(&got, &sqrt_scalar(&a));
        assert!(got[3].is_nan());
    }

    #[test]
    fn test_clamp() {
        let v = [-5.0f32, 0.5, 3.0, f32::NAN, 1.0, 2.0, -0.0, 9.0, 10.0];
        let want = clamp_scalar(&v, 0.0, 2.0);
        let got = clamp_vector::<<P as Backend>::F32>(&v, 0.0, 2.0);
        assert_same(&got, &want);
        assert_eq!(want[0], 0.0);
        assert_eq!(want[2], 2.0);
    }

    #[test]
    fn test_empty_inputs() {
        let got = binary_vector::<<P as Backend>::F64>(BinaryOp::Mul, &[], &[]);
        assert!(got.is_empty());
    }

    #[test]
    #[should_panic(expected = "input lengths differ")]
    fn test_length_mismatch_panics() {
        let _ = binary_scalar(BinaryOp::Add, &[1.0f32, 2.0], &[1.0f32]);
    }
}
