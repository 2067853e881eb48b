//! Comparison masks, mask logic and branch-free selection.

use core::fmt::{Debug, Formatter};

use super::{assert_same_len, block_end};
use crate::backend::{LaneMask, Lanes};
use crate::buffer::LaneBuffer;
use crate::element::{Element, MaskWord, Predicate};

/// One all-ones or all-zeros word per lane of `T`.
///
/// Masks are produced by [`Kernels::compare`](super::Kernels::compare) and
/// the logical combinators; there is no public constructor, so a mask never
/// holds a partial bit pattern.
pub struct Mask<T: Element> {
    words: LaneBuffer<T::Bits>,
}

impl<T: Element> Mask<T> {
    pub(crate) fn from_words(words: LaneBuffer<T::Bits>) -> Self {
        debug_assert!(words
            .iter()
            .all(|&w| w == T::Bits::SET || w == T::Bits::CLEAR));
        Self { words }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Raw lane words.
    #[inline]
    pub fn words(&self) -> &[T::Bits] {
        &self.words
    }

    #[inline]
    pub fn is_set(&self, lane: usize) -> bool {
        self.words[lane].is_set()
    }

    pub fn count_set(&self) -> usize {
        self.words.iter().filter(|w| w.is_set()).count()
    }

    pub fn any(&self) -> bool {
        self.words.iter().any(|w| w.is_set())
    }

    /// True for every lane set; vacuously true for an empty mask.
    pub fn all(&self) -> bool {
        self.words.iter().all(|w| w.is_set())
    }

    /// One bit per lane, lane 0 in bit 0. Panics above 64 lanes; use
    /// [`Mask::to_bitfield_words`] for longer masks.
    #[track_caller]
    pub fn to_bitfield(&self) -> u64 {
        assert!(
            self.len() <= 64,
            "to_bitfield: {} lanes do not fit in 64 bits",
            self.len()
        );
        self.to_bitfield_words().first().copied().unwrap_or(0)
    }

    /// Bitfield split into 64-lane words; word `k` holds lanes `64k..64k+64`.
    pub fn to_bitfield_words(&self) -> Vec<u64> {
        self.words
            .chunks(64)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .fold(0u64, |bits, (i, w)| bits | ((w.is_set() as u64) << i))
            })
            .collect()
    }
}

impl<T: Element> Clone for Mask<T> {
    fn clone(&self) -> Self {
        Self {
            words: self.words.clone(),
        }
    }
}

impl<T: Element> PartialEq for Mask<T> {
    fn eq(&self, other: &Self) -> bool {
        self.words == other.words
    }
}

impl<T: Element> Debug for Mask<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "Mask<{}>(", T::NAME)?;
        for w in self.words.iter() {
            f.write_str(if w.is_set() { "1" } else { "0" })?;
        }
        f.write_str(")")
    }
}

// ============================================================================
// Scalar reference
// ============================================================================

pub(crate) fn compare_scalar<T: Element>(a: &[T], b: &[T], pred: Predicate) -> Mask<T> {
    assert_same_len("compare", a.len(), b.len());
    let words = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| T::Bits::from_bool(x.compare(y, pred)))
        .collect();
    Mask::from_words(words)
}

fn combine_scalar<T: Element>(
    kernel: &str,
    m1: &Mask<T>,
    m2: &Mask<T>,
    f: impl Fn(T::Bits, T::Bits) -> T::Bits,
) -> Mask<T> {
    assert_same_len(kernel, m1.len(), m2.len());
    let words = m1.words.iter().zip(m2.words.iter()).map(|(&x, &y)| f(x, y)).collect();
    Mask::from_words(words)
}

pub(crate) fn and_scalar<T: Element>(m1: &Mask<T>, m2: &Mask<T>) -> Mask<T> {
    combine_scalar("logical_and", m1, m2, |x, y| x & y)
}

pub(crate) fn or_scalar<T: Element>(m1: &Mask<T>, m2: &Mask<T>) -> Mask<T> {
    combine_scalar("logical_or", m1, m2, |x, y| x | y)
}

pub(crate) fn not_scalar<T: Element>(m: &Mask<T>) -> Mask<T> {
    Mask::from_words(m.words.iter().map(|&w| !w).collect())
}

/// `(m & t) | (!m & f)` on raw bits; no branch on the mask.
pub(crate) fn select_scalar<T: Element>(
    mask: &Mask<T>,
    if_true: &[T],
    if_false: &[T],
) -> LaneBuffer<T> {
    assert_same_len("select", mask.len(), if_true.len());
    assert_same_len("select", mask.len(), if_false.len());
    let mut out = LaneBuffer::zeroed(mask.len());
    for i in 0..mask.len() {
        let m = mask.words[i];
        out[i] = T::from_bits((m & if_true[i].to_bits()) | (!m & if_false[i].to_bits()));
    }
    out
}

pub(crate) fn masked_load_scalar<T: Element>(src: &[T], mask: &Mask<T>) -> LaneBuffer<T> {
    assert_same_len("masked_load", mask.len(), src.len());
    let mut out = LaneBuffer::zeroed(src.len());
    for (i, w) in mask.words.iter().enumerate() {
        if w.is_set() {
            out[i] = src[i];
        }
    }
    out
}

pub(crate) fn masked_store_scalar<T: Element>(src: &[T], mask: &Mask<T>, dst: &mut [T]) {
    assert_same_len("masked_store", mask.len(), src.len());
    assert_same_len("masked_store", mask.len(), dst.len());
    for (i, w) in mask.words.iter().enumerate() {
        if w.is_set() {
            dst[i] = src[i];
        }
    }
}

// ============================================================================
// Vectorized
// ============================================================================

pub(crate) fn compare_vector<V: Lanes>(
    a: &[V::Elem],
    b: &[V::Elem],
    pred: Predicate,
) -> Mask<V::Elem> {
    assert_same_len("compare", a.len(), b.len());
    let mut words = LaneBuffer::<MaskBits<V>>::zeroed(a.len());
    let end = block_end(a.len(), V::LANES);

    for i in (0..end).step_by(V::LANES) {
        V::load(&a[i..])
            .cmp(V::load(&b[i..]), pred)
            .store_words(&mut words[i..]);
    }
    for i in end..a.len() {
        words[i] = MaskWord::from_bool(a[i].compare(b[i], pred));
    }
    Mask::from_words(words)
}

type MaskBits<V> = <<V as Lanes>::Elem as Element>::Bits;

fn combine_vector<V: Lanes>(
    kernel: &str,
    m1: &Mask<V::Elem>,
    m2: &Mask<V::Elem>,
    block: impl Fn(V::Mask, V::Mask) -> V::Mask,
    tail: impl Fn(MaskBits<V>, MaskBits<V>) -> MaskBits<V>,
) -> Mask<V::Elem> {
    assert_same_len(kernel, m1.len(), m2.len());
    let (w1, w2) = (m1.words(), m2.words());
    let mut words = LaneBuffer::<MaskBits<V>>::zeroed(w1.len());
    let end = block_end(w1.len(), V::LANES);

    for i in (0..end).step_by(V::LANES) {
        let m = block(V::Mask::load_words(&w1[i..]), V::Mask::load_words(&w2[i..]));
        m.store_words(&mut words[i..]);
    }
    for i in end..w1.len() {
        words[i] = tail(w1[i], w2[i]);
    }
    Mask::from_words(words)
}

pub(crate) fn and_vector<V: Lanes>(m1: &Mask<V::Elem>, m2: &Mask<V::Elem>) -> Mask<V::Elem> {
    combine_vector::<V>("logical_and", m1, m2, |x, y| x & y, |x, y| x & y)
}

pub(crate) fn or_vector<V: Lanes>(m1: &Mask<V::Elem>, m2: &Mask<V::Elem>) -> Mask<V::Elem> {
    combine_vector::<V>("logical_or", m1, m2, |x, y| x | y, |x, y| x | y)
}

pub(crate) fn not_vector<V: Lanes>(m: &Mask<V::Elem>) -> Mask<V::Elem> {
    let w = m.words();
    let mut words = LaneBuffer::<MaskBits<V>>::zeroed(w.len());
    let end = block_end(w.len(), V::LANES);

    for i in (0..end).step_by(V::LANES) {
        (!V::Mask::load_words(&w[i..])).store_words(&mut words[i..]);
    }
    for i in end..w.len() {
        words[i] = !w[i];
    }
    Mask::from_words(words)
}

pub(crate) fn select_vector<V: Lanes>(
    mask: &Mask<V::Elem>,
    if_true: &[V::Elem],
    if_false: &[V::Elem],
) -> LaneBuffer<V::Elem> {
    assert_same_len("select", mask.len(), if_true.len());
    assert_same_len("select", mask.len(), if_false.len());
    let w = mask.words();
    let mut out = LaneBuffer::zeroed(w.len());
    let end = block_end(w.len(), V::LANES);

    for i in (0..end).step_by(V::LANES) {
        let m = V::Mask::load_words(&w[i..]);
        V::select(m, V::load(&if_true[i..]), V::load(&if_false[i..])).store(&mut out[i..]);
    }
    for i in end..w.len() {
        let m = w[i];
        out[i] = V::Elem::from_bits((m & if_true[i].to_bits()) | (!m & if_false[i].to_bits()));
    }
    out
}

pub(crate) fn masked_load_vector<V: Lanes>(
    src: &[V::Elem],
    mask: &Mask<V::Elem>,
) -> LaneBuffer<V::Elem> {
    assert_same_len("masked_load", mask.len(), src.len());
    let w = mask.words();
    let mut out = LaneBuffer::zeroed(src.len());
    let end = block_end(src.len(), V::LANES);

    for i in (0..end).step_by(V::LANES) {
        V::load_masked(&src[i..], V::Mask::load_words(&w[i..])).store(&mut out[i..]);
    }
    for i in end..src.len() {
        if w[i].is_set() {
            out[i] = src[i];
        }
    }
    out
}

pub(crate) fn masked_store_vector<V: Lanes>(
    src: &[V::Elem],
    mask: &Mask<V::Elem>,
    dst: &mut [V::Elem],
) {
    assert_same_len("masked_store", mask.len(), src.len());
    assert_same_len("masked_store", mask.len(), dst.len());
    let w = mask.words();
    let end = block_end(src.len(), V::LANES);

    for i in (0..end).step_by(V::LANES) {
        V::load(&src[i..]).store_masked(&mut dst[i..], V::Mask::load_words(&w[i..]));
    }
    for i in end..src.len() {
        if w[i].is_set() {
            dst[i] = src[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::portable::Portable;
    use crate::backend::Backend;

    type F = <Portable as Backend>::F32;
    type D = <Portable as Backend>::F64;
    type I = <Portable as Backend>::I32;

    #[test]
    fn test_bitfield_lane_order() {
        let v = [-1.0f32, 4.0, 9.0, -16.0, 25.0, -36.0, 49.0, -64.0];
        let zero = [0.0f32; 8];
        let m = compare_vector::<F>(&v, &zero, Predicate::Gt);
        assert_eq!(m.to_bitfield(), 0b0101_0110);
        assert_eq!(m, compare_scalar(&v, &zero, Predicate::Gt));
        assert_eq!(m.count_set(), 4);
        assert!(m.is_set(1));
        assert!(!m.is_set(0));
        assert_eq!(format!("{:?}", m), "Mask<f32>(01101010)");
    }

    #[test]
    fn test_bitfield_words() {
        let v: Vec<i32> = (0..130).collect();
        let m = compare_scalar(&v, &vec![64; 130], Predicate::Ge);
        let words = m.to_bitfield_words();
        assert_eq!(words, vec![0, u64::MAX, 0b11]);
    }

    #[test]
    #[should_panic(expected = "do not fit in 64 bits")]
    fn test_bitfield_overflow_panics() {
        let v = vec![1i32; 65];
        let _ = compare_scalar(&v, &v, Predicate::Eq).to_bitfield();
    }

    #[test]
    fn test_compare_predicates_with_tail() {
        let a = [1.0f64, f64::NAN, 3.0, -0.0, 5.0, 2.0, f64::INFINITY];
        let b = [1.0f64, 1.0, 4.0, 0.0, f64::NAN, 1.0, f64::INFINITY];
        for pred in Predicate::ALL {
            assert_eq!(
                compare_vector::<D>(&a, &b, pred),
                compare_scalar(&a, &b, pred),
                "{:?}",
                pred
            );
        }
        // -0.0 == 0.0
        assert!(compare_scalar(&a, &b, Predicate::Eq).is_set(3));
    }

    #[test]
    fn test_logic_matches_scalar() {
        let a: Vec<i32> = (0..21).map(|i| (i * 7) % 11 - 5).collect();
        let zero = vec![0; 21];
        let pos = compare_scalar(&a, &zero, Predicate::Gt);
        let odd_pos: Vec<i32> = (0..21).map(|i| i % 2).collect();
        let odd = compare_scalar(&odd_pos, &zero, Predicate::Ne);

        assert_eq!(and_vector::<I>(&pos, &odd), and_scalar(&pos, &odd));
        assert_eq!(or_vector::<I>(&pos, &odd), or_scalar(&pos, &odd));
        assert_eq!(not_vector::<I>(&pos), not_scalar(&pos));
        assert_eq!(not_scalar(&not_scalar(&pos)), pos);
    }

    #[test]
    fn test_select() {
        let v = [3.0f32, -1.0, 0.0, 2.5, -7.0, 8.0, f32::NAN, -0.5, 4.0, -2.0];
        let zero = [0.0f32; 10];
        let keep = compare_scalar(&v, &zero, Predicate::Gt);
        let want = select_scalar(&keep, &v, &zero);
        let got = select_vector::<F>(&keep, &v, &zero);
        assert_eq!(&want[..], &[3.0, 0.0, 0.0, 2.5, 0.0, 8.0, 0.0, 0.0, 4.0, 0.0]);
        assert_eq!(&got[..], &want[..]);
    }

    #[test]
    fn test_masked_load_zeroes_cleared_lanes() {
        let src: Vec<f32> = (1..=11).map(|i| i as f32).collect();
        let parity: Vec<f32> = (0..11).map(|i| (i % 2) as f32).collect();
        let even = compare_scalar(&parity, &[0.0; 11], Predicate::Eq);

        let want = masked_load_scalar(&src, &even);
        assert_eq!(
            &want[..],
            &[1.0, 0.0, 3.0, 0.0, 5.0, 0.0, 7.0, 0.0, 9.0, 0.0, 11.0]
        );
        assert_eq!(&masked_load_vector::<F>(&src, &even)[..], &want[..]);
    }

    #[test]
    fn test_masked_store_keeps_cleared_lanes() {
        let src = [2.0f64, 4.0, 6.0, 8.0, 10.0, 12.0];
        let pos = compare_scalar(&[1.0f64, -1.0, 1.0, 1.0, -1.0, 1.0], &[0.0; 6], Predicate::Gt);
        let mut want = [-1.0f64; 6];
        masked_store_scalar(&src, &pos, &mut want);
        assert_eq!(want, [2.0, -1.0, 6.0, 8.0, -1.0, 12.0]);

        let mut got = [-1.0f64; 6];
        masked_store_vector::<D>(&src, &pos, &mut got);
        assert_eq!(got, want);
    }

    #[test]
    #[should_panic(expected = "masked_store: input lengths differ")]
    fn test_masked_store_length_mismatch_panics() {
        let m = compare_scalar(&[1i32, 2], &[0, 0], Predicate::Gt);
        masked_store_vector::<I>(&[1, 2], &m, &mut [0; 3]);
    }

    #[test]
    fn test_empty_mask() {
        let m = compare_scalar::<f32>(&[], &[], Predicate::Lt);
        assert!(m.is_empty());
        assert!(!m.any());
        assert!(m.all());
        assert_eq!(m.to_bitfield(), 0);
        assert!(m.to_bitfield_words().is_empty());
    }
}
