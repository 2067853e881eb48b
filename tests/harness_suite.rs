use laneflow::config::{Config, DataConfig, HarnessConfig, ImageConfig};
use laneflow::harness::{run_suite, verify_exact, Timer};
use laneflow::kernels::PixelFormat;
use laneflow::{Backend, LaneError, Native};
use test_log::test; // For logging within tests

fn tiny() -> Config {
    Config {
        harness: HarnessConfig {
            iterations: 1,
            warmup: 0,
            epsilon: 1e-4,
        },
        data: DataConfig {
            vector_count: 257,
            seed: 1234,
            array_len: 129,
        },
        image: ImageConfig {
            width: 13,
            height: 3,
            format: PixelFormat::Rgb,
            brightness: 300,
            contrast: 0.75,
        },
        ..Config::default()
    }
}

#[test]
fn suite_passes_on_native_backend() {
    let report = run_suite(&tiny()).expect("kernels agree");
    assert_eq!(report.backend, Native::NAME);
    assert_eq!(report.lane_bytes, 32);
    for label in ["f32 Div", "i32 Mul", "f64 Min", "dot", "solve_quadratic", "contrast"] {
        assert!(
            report.comparisons.iter().any(|c| c.label == label),
            "missing {label}"
        );
    }
}

#[test]
fn suite_is_deterministic_for_a_seed() {
    let first = run_suite(&tiny()).unwrap();
    let second = run_suite(&tiny()).unwrap();
    let labels = |r: &laneflow::harness::Report| -> Vec<String> {
        r.comparisons.iter().map(|c| c.label.clone()).collect()
    };
    assert_eq!(labels(&first), labels(&second));
}

#[test]
fn suite_runs_every_pixel_format() {
    for format in [PixelFormat::Gray, PixelFormat::Bgra, PixelFormat::Rgba] {
        let mut config = tiny();
        config.image.format = format;
        config.image.brightness = -20;
        run_suite(&config).unwrap();
    }
}

#[test]
fn mismatch_names_kernel_and_lane() {
    let err = verify_exact("grayscale", &[1u8, 2, 3], &[1u8, 2, 4]).unwrap_err();
    assert!(matches!(err, LaneError::Mismatch { lane: 2, .. }));
    assert_eq!(err.to_string(), "grayscale: lane 2 differs (scalar 3, vector 4)");
}

#[test]
fn timer_reports_elapsed() {
    let timer = Timer::new("noop");
    assert!(timer.elapsed() <= timer.elapsed());
}
