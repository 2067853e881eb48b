//! Batched quadratic solver.
//!
//! For each equation `a·x² + b·x + c = 0` the solver returns the minus-branch
//! root `(-b - √(b² - 4ac)) / 2a`, or NaN when the discriminant is negative.
//! The minus branch is taken unconditionally, so results lose precision when
//! `b² ≫ 4ac`. Degenerate equations (`a == 0`) follow IEEE division.

use super::assert_same_len;
use crate::backend::{FloatLanes, Lanes};
use crate::buffer::LaneBuffer;
use crate::element::Predicate;

/// Lanes per vector step; batches handed to the vectorized solver must be a
/// multiple of this.
pub const QUADRATIC_LANES: usize = 8;

/// Coefficients of `len` independent equations.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadraticBatch {
    a: LaneBuffer<f32>,
    b: LaneBuffer<f32>,
    c: LaneBuffer<f32>,
}

impl QuadraticBatch {
    /// Panics unless `a`, `b` and `c` have the same length.
    #[track_caller]
    pub fn new(a: LaneBuffer<f32>, b: LaneBuffer<f32>, c: LaneBuffer<f32>) -> Self {
        assert_same_len("QuadraticBatch", a.len(), b.len());
        assert_same_len("QuadraticBatch", a.len(), c.len());
        Self { a, b, c }
    }

    /// Build from `(a, b, c)` triples.
    pub fn from_triples(equations: &[[f32; 3]]) -> Self {
        Self::new(
            equations.iter().map(|e| e[0]).collect(),
            equations.iter().map(|e| e[1]).collect(),
            equations.iter().map(|e| e[2]).collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.a.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn a(&self) -> &[f32] {
        &self.a
    }

    pub fn b(&self) -> &[f32] {
        &self.b
    }

    pub fn c(&self) -> &[f32] {
        &self.c
    }

    /// Copy padded with `x² = 0` up to a multiple of [`QUADRATIC_LANES`],
    /// plus the unpadded length so callers can truncate the result.
    pub fn padded(&self) -> (Self, usize) {
        let len = self.len();
        let padded_len = len.div_ceil(QUADRATIC_LANES) * QUADRATIC_LANES;
        let pad = |src: &[f32], fill: f32| -> LaneBuffer<f32> {
            let mut out = LaneBuffer::filled(padded_len, fill);
            out[..len].copy_from_slice(src);
            out
        };
        let batch = Self::new(pad(&self.a, 1.0), pad(&self.b, 0.0), pad(&self.c, 0.0));
        (batch, len)
    }
}

/// One equation, scalar reference.
#[inline(always)]
pub fn solve_one(a: f32, b: f32, c: f32) -> f32 {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant >= 0.0 {
        (-b - discriminant.sqrt()) / (2.0 * a)
    } else {
        f32::NAN
    }
}

pub(crate) fn solve_scalar(batch: &QuadraticBatch) -> LaneBuffer<f32> {
    let mut out = LaneBuffer::zeroed(batch.len());
    for i in 0..batch.len() {
        out[i] = solve_one(batch.a[i], batch.b[i], batch.c[i]);
    }
    out
}

/// Vector path. Owns no tail: the batch length must be a multiple of
/// [`QUADRATIC_LANES`] (see [`QuadraticBatch::padded`]).
pub(crate) fn solve_vector<V: FloatLanes<Elem = f32>>(batch: &QuadraticBatch) -> LaneBuffer<f32> {
    assert!(
        batch.len() % V::LANES == 0,
        "solve_quadratic: batch length {} is not a multiple of {}",
        batch.len(),
        V::LANES
    );
    let mut out = LaneBuffer::zeroed(batch.len());
    let (four, two, zero, nan) = (V::splat(4.0), V::splat(2.0), V::splat(0.0), V::splat(f32::NAN));

    for i in (0..batch.len()).step_by(V::LANES) {
        let a = V::load(&batch.a[i..]);
        let b = V::load(&batch.b[i..]);
        let c = V::load(&batch.c[i..]);

        let discriminant = b * b - four * a * c;
        let real = discriminant.cmp(zero, Predicate::Ge);
        let root = (b.neg() - discriminant.simd_sqrt()) / (two * a);
        V::select(real, root, nan).store(&mut out[i..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::portable::Portable;
    use crate::backend::Backend;
    use crate::element::Element;

    type F = <Portable as Backend>::F32;

    fn sample() -> QuadraticBatch {
        QuadraticBatch::from_triples(&[
            [5.0, 3.0, -1.0],
            [12.0, 1.0, -5.0],
            [6.0, 4.0, -6.0],
            [7.0, -2.0, -6.0],
            [1.0, 2.0, 5.0],
            [1.0, 1.0, 30.0],
            [1.0, 1.0, 35.0],
            [1.0, 1.0, -40.0],
        ])
    }

    #[test]
    fn test_sample_batch_agrees() {
        let batch = sample();
        let want = solve_scalar(&batch);
        let got = solve_vector::<F>(&batch);
        for i in 0..8 {
            assert!(got[i].same_as(want[i]), "lane {i}: {} vs {}", got[i], want[i]);
        }
        assert_eq!(
            (0..8).filter(|&i| want[i].is_nan()).collect::<Vec<_>>(),
            vec![4, 5, 6]
        );
        assert_eq!(want[7], (-1.0 - 161.0f32.sqrt()) / 2.0);
    }

    #[test]
    fn test_zero_discriminant_single_root() {
        // x² - 4x + 4 = (x - 2)², 4x² + 4x + 1 = (2x + 1)²
        let batch = QuadraticBatch::from_triples(&[[1.0, -4.0, 4.0], [4.0, 4.0, 1.0]]);
        let (padded, len) = batch.padded();
        let got = solve_vector::<F>(&padded);
        assert_eq!(len, 2);
        assert_eq!(got[0], 2.0);
        assert_eq!(got[1], -0.5);
        assert_eq!(solve_scalar(&batch)[0], 2.0);
    }

    #[test]
    fn test_padded() {
        let batch = QuadraticBatch::from_triples(&[[2.0, 1.0, -1.0]; 9]);
        let (padded, len) = batch.padded();
        assert_eq!(len, 9);
        assert_eq!(padded.len(), 16);
        assert_eq!(&padded.a()[..9], batch.a());
        assert_eq!(padded.a()[15], 1.0);
        assert_eq!(padded.c()[15], 0.0);
        assert_eq!(solve_vector::<F>(&padded)[15], 0.0);

        let (empty, len) = QuadraticBatch::from_triples(&[]).padded();
        assert!(empty.is_empty());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_new_from_columns() {
        let batch = QuadraticBatch::new(
            LaneBuffer::from_slice(&[1.0, 1.0]),
            LaneBuffer::from_slice(&[-3.0, 0.0]),
            LaneBuffer::from_slice(&[2.0, 1.0]),
        );
        assert_eq!(batch, QuadraticBatch::from_triples(&[[1.0, -3.0, 2.0], [1.0, 0.0, 1.0]]));
        let roots = solve_scalar(&batch);
        assert_eq!(roots[0], 1.0);
        assert!(roots[1].is_nan());
    }

    #[test]
    #[should_panic(expected = "QuadraticBatch: input lengths differ (3 vs 2)")]
    fn test_new_rejects_ragged_columns() {
        let _ = QuadraticBatch::new(
            LaneBuffer::zeroed(3),
            LaneBuffer::zeroed(3),
            LaneBuffer::zeroed(2),
        );
    }

    #[test]
    #[should_panic(expected = "not a multiple of 8")]
    fn test_vector_rejects_ragged_batch() {
        let _ = solve_vector::<F>(&QuadraticBatch::from_triples(&[[1.0, 0.0, 0.0]; 5]));
    }

    #[test]
    fn test_scalar_accepts_ragged_batch() {
        let out = solve_scalar(&QuadraticBatch::from_triples(&[[1.0, 0.0, -1.0]; 5]));
        assert_eq!(&out[..], &[-1.0; 5]);
    }
}
