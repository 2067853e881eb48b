//! # laneflow
//!
//! Fixed-width numeric kernels over 256-bit lanes, each implemented twice:
//! a scalar reference that serves as the test oracle, and a vectorized fast
//! path that must agree with it.
//!
//! ## Layout
//!
//! - [`element`]: lane element types (f32, f64, i32) and their per-lane
//!   semantics. Both paths are defined in terms of these.
//! - [`buffer`]: aligned, owned lane buffers and the structure-of-arrays
//!   vector batch.
//! - [`backend`]: the lane capability (`Backend`, `Lanes`, `FloatLanes`,
//!   `ByteLanes`, `LaneMask`) with a portable lane-array backend and an
//!   AVX2+FMA backend. [`backend::Native`] is picked at compile time.
//! - [`kernels`]: the `Kernels` strategy trait with the [`kernels::Scalar`]
//!   and [`kernels::Vector`] implementations, plus one module per kernel
//!   family.
//! - [`harness`]: equivalence checks, timing and the suite runner driven by
//!   the `laneflow` binary.
//!
//! ## Example
//!
//! ```
//! use laneflow::kernels::{BinaryOp, Kernels, Scalar, Vector};
//!
//! let a = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
//! let b = [8.0f32, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.5];
//!
//! let reference = Scalar::binary(BinaryOp::Add, &a, &b);
//! let fast = Vector::binary(BinaryOp::Add, &a, &b);
//! assert_eq!(&reference[..], &fast[..]);
//! ```

pub mod backend;
pub mod buffer;
pub mod config;
pub mod element;
pub mod error;
pub mod harness;
pub mod kernels;

pub use backend::{Backend, Native};
pub use buffer::{LaneBuffer, Vector3SoA};
pub use element::{Element, FloatElement, Predicate};
pub use error::LaneError;
pub use kernels::{Kernels, Scalar, Vector, Vectorized};

/// Width of one vector register in bytes (256-bit lanes).
pub const LANE_BYTES: usize = 32;
