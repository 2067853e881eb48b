//! Lane type conversions.

use super::block_end;
use crate::backend::{Backend, Lanes};
use crate::buffer::LaneBuffer;
use crate::element::cvt_trunc_i32;

pub(crate) fn f32_to_i32_trunc_scalar(v: &[f32]) -> LaneBuffer<i32> {
    v.iter().map(|&x| cvt_trunc_i32(x)).collect()
}

pub(crate) fn i32_to_f32_scalar(v: &[i32]) -> LaneBuffer<f32> {
    v.iter().map(|&x| x as f32).collect()
}

pub(crate) fn f32_to_f64_scalar(v: &[f32]) -> LaneBuffer<f64> {
    v.iter().map(|&x| x as f64).collect()
}

pub(crate) fn f32_to_i32_trunc_vector<B: Backend>(v: &[f32]) -> LaneBuffer<i32> {
    let lanes = <B::F32 as Lanes>::LANES;
    let end = block_end(v.len(), lanes);
    let mut out = LaneBuffer::zeroed(v.len());

    for i in (0..end).step_by(lanes) {
        B::f32_to_i32_trunc(B::F32::load(&v[i..])).store(&mut out[i..]);
    }
    for i in end..v.len() {
        out[i] = cvt_trunc_i32(v[i]);
    }
    out
}

pub(crate) fn i32_to_f32_vector<B: Backend>(v: &[i32]) -> LaneBuffer<f32> {
    let lanes = <B::I32 as Lanes>::LANES;
    let end = block_end(v.len(), lanes);
    let mut out = LaneBuffer::zeroed(v.len());

    for i in (0..end).step_by(lanes) {
        B::i32_to_f32(B::I32::load(&v[i..])).store(&mut out[i..]);
    }
    for i in end..v.len() {
        out[i] = v[i] as f32;
    }
    out
}

/// Each block of 8 f32 lanes widens into two f64 vectors.
pub(crate) fn f32_to_f64_vector<B: Backend>(v: &[f32]) -> LaneBuffer<f64> {
    let lanes = <B::F32 as Lanes>::LANES;
    let half = <B::F64 as Lanes>::LANES;
    let end = block_end(v.len(), lanes);
    let mut out = LaneBuffer::zeroed(v.len());

    for i in (0..end).step_by(lanes) {
        let (lo, hi) = B::f32_to_f64(B::F32::load(&v[i..]));
        lo.store(&mut out[i..]);
        hi.store(&mut out[i + half..]);
    }
    for i in end..v.len() {
        out[i] = v[i] as f64;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::portable::Portable;

    #[test]
    fn test_trunc_edge_values() {
        let v = [
            1.9f32, -1.9, 2.5, f32::NAN, 3e9, -0.5, 255.5, 256.4, -2_147_483_648.0, 7.99,
        ];
        let want = [1, -1, 2, i32::MIN, i32::MIN, 0, 255, 256, i32::MIN, 7];
        assert_eq!(&f32_to_i32_trunc_scalar(&v)[..], &want);
        assert_eq!(&f32_to_i32_trunc_vector::<Portable>(&v)[..], &want);
    }

    #[test]
    fn test_i32_to_f32_rounds() {
        let v: Vec<i32> = vec![0, 1, -1, i32::MAX, i32::MIN, 16_777_217, -16_777_217, 42, 7];
        let want = i32_to_f32_scalar(&v);
        assert_eq!(want[3], 2_147_483_648.0);
        assert_eq!(want[5], 16_777_216.0);
        assert_eq!(i32_to_f32_vector::<Portable>(&v), want);
    }

    #[test]
    fn test_f32_to_f64_is_exact() {
        let v: Vec<f32> = (0..19).map(|i| i as f32 * 0.1 - 0.7).collect();
        let got = f32_to_f64_vector::<Portable>(&v);
        assert_eq!(got, f32_to_f64_scalar(&v));
        for (w, n) in got.iter().zip(&v) {
            assert_eq!(*w as f32, *n);
        }
    }
}
