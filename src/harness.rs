//! Equivalence checks and timing for scalar/vector kernel pairs.
//!
//! [`run_suite`] drives every kernel through both strategies on seeded random
//! inputs, fails on the first disagreement, and times the pair with
//! [`benchmark_comparison`].

use std::hint::black_box;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Serializer};

use crate::backend::{Backend, Native};
use crate::buffer::{LaneBuffer, Vector3SoA};
use crate::config::Config;
use crate::element::{Element, Plain, Predicate};
use crate::error::LaneError;
use crate::kernels::{
    BinaryOp, BitwiseOp, Kernels, PixelBuffer, QuadraticBatch, Scalar, Vector,
};
use crate::LANE_BYTES;

// ============================================================================
// Timing
// ============================================================================

/// Scoped timer: logs the elapsed time when dropped.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "{} took {} microseconds",
            self.label,
            self.start.elapsed().as_micros()
        );
    }
}

fn micros<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_micros())
}

/// Timing of one baseline/candidate pair. The baseline is the scalar kernel,
/// except for the load-alignment entry where it is the unaligned load path.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub label: String,
    #[serde(rename = "scalar_us", serialize_with = "micros")]
    pub scalar: Duration,
    #[serde(rename = "vector_us", serialize_with = "micros")]
    pub vector: Duration,
    /// `scalar / vector`; infinite when the vector loop was too fast to
    /// measure.
    pub speedup: f64,
}

/// Run each closure once untimed per warmup round, then `iterations` times
/// each under the clock.
pub fn benchmark_comparison<R1, R2>(
    label: &str,
    iterations: u32,
    warmup: u32,
    mut scalar_fn: impl FnMut() -> R1,
    mut vector_fn: impl FnMut() -> R2,
) -> Comparison {
    for _ in 0..warmup {
        black_box(scalar_fn());
        black_box(vector_fn());
    }

    let start = Instant::now();
    for _ in 0..iterations {
        black_box(scalar_fn());
    }
    let scalar = start.elapsed();

    let start = Instant::now();
    for _ in 0..iterations {
        black_box(vector_fn());
    }
    let vector = start.elapsed();

    let speedup = if vector.is_zero() {
        f64::INFINITY
    } else {
        scalar.as_secs_f64() / vector.as_secs_f64()
    };
    Comparison {
        label: label.to_string(),
        scalar,
        vector,
        speedup,
    }
}

// ============================================================================
// Equivalence
// ============================================================================

/// Lane-for-lane equality. NaN matches NaN.
pub fn verify_exact<T: Plain + PartialEq>(
    kernel: &str,
    scalar: &[T],
    vector: &[T],
) -> Result<(), LaneError> {
    if scalar.len() != vector.len() {
        return Err(LaneError::Mismatch {
            kernel: kernel.to_string(),
            lane: scalar.len().min(vector.len()),
            detail: format!("length {} vs {}", scalar.len(), vector.len()),
        });
    }
    #[allow(clippy::eq_op)]
    let same = |a: T, b: T| a == b || (a != a && b != b);
    match scalar.iter().zip(vector).position(|(&s, &v)| !same(s, v)) {
        Some(lane) => Err(LaneError::Mismatch {
            kernel: kernel.to_string(),
            lane,
            detail: format!("scalar {:?}, vector {:?}", scalar[lane], vector[lane]),
        }),
        None => Ok(()),
    }
}

/// `|vector - scalar| <= epsilon * max(1, |scalar|)`.
pub fn verify_within(
    kernel: &str,
    scalar: f64,
    vector: f64,
    epsilon: f64,
) -> Result<(), LaneError> {
    let bound = epsilon * scalar.abs().max(1.0);
    if (vector - scalar).abs() <= bound {
        Ok(())
    } else {
        Err(LaneError::Mismatch {
            kernel: kernel.to_string(),
            lane: 0,
            detail: format!("scalar {scalar}, vector {vector}, bound {bound}"),
        })
    }
}

// ============================================================================
// Suite
// ============================================================================

/// Result of [`run_suite`].
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub backend: &'static str,
    pub lane_bytes: usize,
    pub comparisons: Vec<Comparison>,
}

struct Suite<'a> {
    config: &'a Config,
    comparisons: Vec<Comparison>,
}

impl Suite<'_> {
    fn check<T: Plain + PartialEq>(
        &self,
        kernel: &str,
        scalar: &[T],
        vector: &[T],
    ) -> Result<(), LaneError> {
        debug!("Verifying {} over {} lanes", kernel, scalar.len());
        verify_exact(kernel, scalar, vector).inspect_err(|err| warn!("{}", err))
    }

    fn check_within(&self, kernel: &str, scalar: f64, vector: f64) -> Result<(), LaneError> {
        debug!("Verifying {}: scalar {}, vector {}", kernel, scalar, vector);
        verify_within(kernel, scalar, vector, self.config.harness.epsilon)
            .inspect_err(|err| warn!("{}", err))
    }

    fn bench<R1, R2>(
        &mut self,
        label: &str,
        scalar_fn: impl FnMut() -> R1,
        vector_fn: impl FnMut() -> R2,
    ) {
        let harness = &self.config.harness;
        let result =
            benchmark_comparison(label, harness.iterations, harness.warmup, scalar_fn, vector_fn);
        info!(
            "{}: scalar {} us, vector {} us, speedup {:.2}x",
            result.label,
            result.scalar.as_micros(),
            result.vector.as_micros(),
            result.speedup
        );
        self.comparisons.push(result);
    }

    fn binary<T: Element>(&mut self, a: &[T], b: &[T]) -> Result<(), LaneError> {
        for op in BinaryOp::ALL {
            let label = format!("{} {:?}", T::NAME, op);
            self.check(
                &label,
                &Scalar::binary(op, a, b),
                &Vector::binary(op, a, b),
            )?;
            self.bench(&label, || Scalar::binary(op, a, b), || Vector::binary(op, a, b));
        }
        Ok(())
    }
}

fn random_f32(rng: &mut StdRng, len: usize, lo: f32, hi: f32) -> LaneBuffer<f32> {
    (0..len).map(|_| rng.gen_range(lo..hi)).collect()
}

fn random_vectors(rng: &mut StdRng, len: usize) -> Vector3SoA {
    Vector3SoA::new(
        random_f32(rng, len, 0.0, 1.0),
        random_f32(rng, len, 0.0, 1.0),
        random_f32(rng, len, 0.0, 1.0),
    )
}

/// Verify and time every kernel pair.
pub fn run_suite(config: &Config) -> Result<Report, LaneError> {
    debug!("Backend selected: {}", Native::NAME);
    let _total = Timer::new("Suite");
    let mut rng = StdRng::seed_from_u64(config.data.seed);
    let mut suite = Suite {
        config,
        comparisons: Vec::new(),
    };
    let n = config.data.array_len;

    info!("Elementwise kernels over {} lanes", n);
    let a = random_f32(&mut rng, n, -100.0, 100.0);
    let b = random_f32(&mut rng, n, -100.0, 100.0);
    let c = random_f32(&mut rng, n, -100.0, 100.0);
    suite.binary(&a, &b)?;

    let wide_a: LaneBuffer<f64> = a.iter().map(|&x| x as f64 * 1.5).collect();
    let wide_b: LaneBuffer<f64> = b.iter().map(|&x| x as f64 - 0.25).collect();
    suite.binary(&wide_a, &wide_b)?;

    let ints_a: LaneBuffer<i32> = (0..n).map(|_| rng.gen_range(-10_000..10_000)).collect();
    let ints_b: LaneBuffer<i32> = (0..n)
        .map(|_| {
            let d = rng.gen_range(1..1_000);
            if rng.gen_bool(0.5) {
                d
            } else {
                -d
            }
        })
        .collect();
    suite.binary(&ints_a, &ints_b)?;

    for op in BitwiseOp::ALL {
        let label = format!("i32 {:?}", op);
        suite.check(
            &label,
            &Scalar::bitwise(op, &ints_a, &ints_b),
            &Vector::bitwise(op, &ints_a, &ints_b),
        )?;
    }

    let magnitudes: LaneBuffer<f32> = a.iter().map(|x| x.abs()).collect();
    suite.check("f32 sqrt", &Scalar::sqrt(&magnitudes), &Vector::sqrt(&magnitudes))?;
    suite.bench(
        "f32 sqrt",
        || Scalar::sqrt(&magnitudes),
        || Vector::sqrt(&magnitudes),
    );
    suite.check("f32 fma", &Scalar::fma(&a, &b, &c), &Vector::fma(&a, &b, &c))?;
    suite.bench("f32 fma", || Scalar::fma(&a, &b, &c), || Vector::fma(&a, &b, &c));
    suite.check(
        "f32 clamp",
        &Scalar::clamp(&a, -50.0, 50.0),
        &Vector::clamp(&a, -50.0, 50.0),
    )?;

    info!("Reductions");
    let v1 = random_vectors(&mut rng, config.data.vector_count);
    let v2 = random_vectors(&mut rng, config.data.vector_count);
    suite.check_within("dot", Scalar::dot(&v1, &v2), Vector::dot(&v1, &v2))?;
    suite.bench("dot", || Scalar::dot(&v1, &v2), || Vector::dot(&v1, &v2));
    suite.check_within("sum", Scalar::sum(&magnitudes), Vector::sum(&magnitudes))?;
    suite.bench("sum", || Scalar::sum(&magnitudes), || Vector::sum(&magnitudes));
    suite.check_within(
        "sum_aligned",
        Scalar::sum_aligned(&magnitudes),
        Vector::sum_aligned(&magnitudes),
    )?;

    // The same values one element past a lane boundary, so no block load is
    // aligned.
    let mut shifted = LaneBuffer::<f32>::zeroed(n + 1);
    shifted[1..].copy_from_slice(&magnitudes);
    let unaligned = &shifted[1..];
    suite.check_within(
        "sum unaligned",
        Vector::sum_aligned(&magnitudes),
        Vector::sum(unaligned),
    )?;
    suite.bench(
        "sum loads (unaligned vs aligned)",
        || Vector::sum(unaligned),
        || Vector::sum_aligned(&magnitudes),
    );
    let (p, q) = ([1.0f32, 2.0, 3.0], [4.0f32, 5.0, 6.0]);
    suite.check("dot3", &[Scalar::dot3(p, q)], &[Vector::dot3(p, q)])?;

    info!("Masking");
    for pred in Predicate::ALL {
        let label = format!("compare {:?}", pred);
        let (ms, mv) = (Scalar::compare(&a, &b, pred), Vector::compare(&a, &b, pred));
        suite.check(&label, ms.words(), mv.words())?;
    }
    let m1 = Scalar::compare(&a, &b, Predicate::Gt);
    let m2 = Scalar::compare(&a, &c, Predicate::Lt);
    suite.check(
        "logical_and",
        Scalar::logical_and(&m1, &m2).words(),
        Vector::logical_and(&m1, &m2).words(),
    )?;
    suite.check(
        "logical_or",
        Scalar::logical_or(&m1, &m2).words(),
        Vector::logical_or(&m1, &m2).words(),
    )?;
    suite.check(
        "logical_not",
        Scalar::logical_not(&m1).words(),
        Vector::logical_not(&m1).words(),
    )?;
    suite.check(
        "select",
        &Scalar::select(&m1, &a, &b),
        &Vector::select(&m1, &a, &b),
    )?;
    suite.check(
        "masked_load",
        &Scalar::masked_load(&a, &m1),
        &Vector::masked_load(&a, &m1),
    )?;
    let (mut scalar_dst, mut vector_dst) = (b.clone(), b.clone());
    Scalar::masked_store(&a, &m1, &mut scalar_dst[..]);
    Vector::masked_store(&a, &m1, &mut vector_dst[..]);
    suite.check("masked_store", &scalar_dst, &vector_dst)?;
    suite.check(
        "filter_positive",
        &Scalar::filter_positive(&a),
        &Vector::filter_positive(&a),
    )?;
    suite.bench(
        "filter_positive",
        || Scalar::filter_positive(&a),
        || Vector::filter_positive(&a),
    );
    suite.check(
        "filter_greater",
        &Scalar::filter_greater(&a, &b),
        &Vector::filter_greater(&a, &b),
    )?;

    info!("Quadratic solver");
    let coeffs: Vec<[f32; 3]> = (0..n)
        .map(|_| {
            [
                rng.gen_range(0.5..10.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            ]
        })
        .collect();
    let (batch, len) = QuadraticBatch::from_triples(&coeffs).padded();
    let roots = Vector::solve_quadratic(&batch);
    suite.check(
        "solve_quadratic",
        &Scalar::solve_quadratic(&batch)[..len],
        &roots[..len],
    )?;
    suite.bench(
        "solve_quadratic",
        || Scalar::solve_quadratic(&batch),
        || Vector::solve_quadratic(&batch),
    );

    info!(
        "Pixel kernels on a {}x{} {:?} image",
        config.image.width, config.image.height, config.image.format
    );
    let image = PixelBuffer::gradient(config.image.width, config.image.height, config.image.format);
    let (delta, factor) = (config.image.brightness, config.image.contrast);

    let (mut scalar_px, mut vector_px) = (image.clone(), image.clone());
    Scalar::brightness(scalar_px.data_mut(), delta);
    Vector::brightness(vector_px.data_mut(), delta);
    suite.check("brightness", scalar_px.data(), vector_px.data())?;
    suite.bench(
        "brightness",
        || Scalar::brightness(scalar_px.data_mut(), delta),
        || Vector::brightness(vector_px.data_mut(), delta),
    );

    let (mut scalar_px, mut vector_px) = (image.clone(), image.clone());
    Scalar::contrast(scalar_px.data_mut(), factor);
    Vector::contrast(vector_px.data_mut(), factor);
    suite.check("contrast", scalar_px.data(), vector_px.data())?;
    suite.bench(
        "contrast",
        || Scalar::contrast(scalar_px.data_mut(), factor),
        || Vector::contrast(vector_px.data_mut(), factor),
    );

    suite.check(
        "grayscale",
        Scalar::grayscale(&image).data(),
        Vector::grayscale(&image).data(),
    )?;
    suite.bench(
        "grayscale",
        || Scalar::grayscale(&image),
        || Vector::grayscale(&image),
    );

    info!("Conversions");
    suite.check(
        "f32_to_i32_trunc",
        &Scalar::f32_to_i32_trunc(&a),
        &Vector::f32_to_i32_trunc(&a),
    )?;
    suite.check("i32_to_f32", &Scalar::i32_to_f32(&ints_a), &Vector::i32_to_f32(&ints_a))?;
    suite.check("f32_to_f64", &Scalar::f32_to_f64(&a), &Vector::f32_to_f64(&a))?;

    Ok(Report {
        backend: Native::NAME,
        lane_bytes: LANE_BYTES,
        comparisons: suite.comparisons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, HarnessConfig, ImageConfig};
    use crate::kernels::PixelFormat;

    fn small_config() -> Config {
        Config {
            harness: HarnessConfig {
                iterations: 2,
                warmup: 1,
                epsilon: 1e-4,
            },
            data: DataConfig {
                vector_count: 1003,
                seed: 7,
                array_len: 517,
            },
            image: ImageConfig {
                width: 37,
                height: 5,
                format: PixelFormat::Bgra,
                brightness: -40,
                contrast: 1.25,
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_verify_exact_reports_first_lane() {
        let err = verify_exact("add", &[1.0f32, 2.0, 3.0], &[1.0, 2.5, 3.5]).unwrap_err();
        match err {
            LaneError::Mismatch { kernel, lane, .. } => {
                assert_eq!(kernel, "add");
                assert_eq!(lane, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_verify_exact_nan_matches_nan() {
        assert!(verify_exact("div", &[f32::NAN, 1.0], &[f32::NAN, 1.0]).is_ok());
        assert!(verify_exact("div", &[f32::NAN], &[0.0]).is_err());
        assert!(verify_exact("bytes", &[1u8, 2], &[1u8]).is_err());
    }

    #[test]
    fn test_verify_within_scales_with_magnitude() {
        assert!(verify_within("dot", 1e6, 1e6 + 50.0, 1e-4).is_ok());
        assert!(verify_within("dot", 1e6, 1e6 + 200.0, 1e-4).is_err());
        assert!(verify_within("dot", 0.0, 5e-5, 1e-4).is_ok());
    }

    #[test]
    fn test_benchmark_comparison_counts_calls() {
        let (mut s, mut v) = (0, 0);
        let result = benchmark_comparison("count", 5, 2, || s += 1, || v += 1);
        assert_eq!((s, v), (7, 7));
        assert_eq!(result.label, "count");
        assert!(!result.speedup.is_nan());
    }

    #[test]
    fn test_run_suite_small() {
        let report = run_suite(&small_config()).unwrap();
        assert_eq!(report.backend, Native::NAME);
        assert!(report.comparisons.iter().any(|c| c.label == "grayscale"));
        assert!(report.comparisons.iter().any(|c| c.label == "f32 Add"));
        assert!(report
            .comparisons
            .iter()
            .any(|c| c.label == "sum loads (unaligned vs aligned)"));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["comparisons"][0]["scalar_us"].is_u64());
    }
}
