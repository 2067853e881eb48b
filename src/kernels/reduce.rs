//! Dot products and horizontal sums.
//!
//! The scalar reference accumulates left to right into one `f64` running sum.
//! The vectorized path keeps eight `f32` partial sums, folding them into an
//! `f64` total every [`FLUSH_BLOCKS`] blocks, so the two agree only within a
//! relative tolerance.

use super::{assert_same_len, block_end};
use crate::backend::{FloatLanes, Lanes};
use crate::buffer::{LaneBuffer, Vector3SoA};

/// Blocks accumulated in `f32` lanes before the partial sums are folded into
/// the `f64` total. Bounds the rounding error of the lane accumulators
/// independently of the input length.
pub(crate) const FLUSH_BLOCKS: usize = 256;

// ============================================================================
// Scalar reference
// ============================================================================

pub(crate) fn dot3_scalar(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn dot_scalar(v1: &Vector3SoA, v2: &Vector3SoA) -> f64 {
    assert_same_len("dot", v1.len(), v2.len());
    let mut total = 0.0f64;
    for i in 0..v1.len() {
        total += dot3_scalar(v1.get(i), v2.get(i)) as f64;
    }
    total
}

pub(crate) fn sum_scalar(v: &[f32]) -> f64 {
    v.iter().fold(0.0f64, |acc, &x| acc + x as f64)
}

// ============================================================================
// Vectorized
// ============================================================================

pub(crate) fn dot_vector<V: FloatLanes<Elem = f32>>(v1: &Vector3SoA, v2: &Vector3SoA) -> f64 {
    assert_same_len("dot", v1.len(), v2.len());
    let len = v1.len();
    let end = block_end(len, V::LANES);
    let (x1, y1, z1) = (v1.x(), v1.y(), v1.z());
    let (x2, y2, z2) = (v2.x(), v2.y(), v2.z());

    let mut total = 0.0f64;
    let mut acc = V::splat(0.0);
    for (block, i) in (0..end).step_by(V::LANES).enumerate() {
        let xx = V::load(&x1[i..]) * V::load(&x2[i..]);
        let xy = V::load(&y1[i..]).mul_add(V::load(&y2[i..]), xx);
        let xyz = V::load(&z1[i..]).mul_add(V::load(&z2[i..]), xy);
        acc = acc + xyz;
        if (block + 1) % FLUSH_BLOCKS == 0 {
            total += acc.hsum();
            acc = V::splat(0.0);
        }
    }

    total += acc.hsum();
    for i in end..len {
        total += dot3_scalar(v1.get(i), v2.get(i)) as f64;
    }
    total
}

/// Single-pair dot product: one multiply across the lanes, then one
/// pairwise add giving `p0 + p1` in lane 0 and `p2 + p3` in lane 1.
pub(crate) fn dot3_vector<V: FloatLanes<Elem = f32>>(a: [f32; 3], b: [f32; 3]) -> f32 {
    // Padding products are -0.0, the identity of addition, so p2 + p3 == p2.
    let mut pa = [0.0f32; 8];
    let mut pb = [-0.0f32; 8];
    pa[..3].copy_from_slice(&a);
    pb[..3].copy_from_slice(&b);
    let products = V::load(&pa) * V::load(&pb);
    let pairs = products.hadd(products);
    pairs.lane(0) + pairs.lane(1)
}

fn sum_blocks<V: FloatLanes<Elem = f32>>(v: &[f32], load: impl Fn(&[f32]) -> V) -> f64 {
    let end = block_end(v.len(), V::LANES);

    let mut total = 0.0f64;
    let mut acc = V::splat(0.0);
    for (block, i) in (0..end).step_by(V::LANES).enumerate() {
        acc = acc + load(&v[i..]);
        if (block + 1) % FLUSH_BLOCKS == 0 {
            total += acc.hsum();
            acc = V::splat(0.0);
        }
    }

    total += acc.hsum();
    for &x in &v[end..] {
        total += x as f64;
    }
    total
}

pub(crate) fn sum_vector<V: FloatLanes<Elem = f32>>(v: &[f32]) -> f64 {
    sum_blocks::<V>(v, V::load)
}

/// [`sum_vector`] through aligned loads. Panics unless `v` starts on a lane
/// boundary, which a [`LaneBuffer`] always does.
pub(crate) fn sum_aligned_vector<V: FloatLanes<Elem = f32>>(v: &LaneBuffer<f32>) -> f64 {
    v.assert_lane_aligned();
    sum_blocks::<V>(v, V::load_aligned)
}
