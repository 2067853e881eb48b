//! Owned lane buffers.
//!
//! [`LaneBuffer`] is a zeroed, aligned heap allocation that dereferences to a
//! slice. Kernels return results in one and the harness allocates inputs in
//! them so aligned-only kernels can take the aligned load path.
//!
//! [`Vector3SoA`] is a batch of independent 3-vectors laid out as three
//! parallel `f32` buffers.

use core::fmt::{Debug, Formatter};
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use std::alloc::{self, Layout};

use crate::element::Plain;
use crate::error::LaneError;
use crate::LANE_BYTES;

/// A contiguous, aligned, exclusively owned run of `T`.
pub struct LaneBuffer<T: Plain> {
    ptr: NonNull<T>,
    len: usize,
    align: usize,
}

// The buffer owns its allocation outright; `T: Plain` is Send + Sync.
unsafe impl<T: Plain> Send for LaneBuffer<T> {}
unsafe impl<T: Plain> Sync for LaneBuffer<T> {}

impl<T: Plain> LaneBuffer<T> {
    /// Allocate `count` zeroed elements aligned to `align` bytes.
    ///
    /// `align` must be a power of two and at least `align_of::<T>()`;
    /// anything else is a [`LaneError::Layout`]. Returns
    /// [`LaneError::Alloc`] if the allocator refuses.
    pub fn with_alignment(count: usize, align: usize) -> Result<Self, LaneError> {
        if align < core::mem::align_of::<T>() {
            return Err(LaneError::Layout { count, align });
        }
        let layout = Self::layout(count, align)?;
        if layout.size() == 0 {
            return Ok(Self {
                ptr: dangling(align),
                len: count,
                align,
            });
        }

        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw as *mut T).ok_or(LaneError::Alloc {
            bytes: layout.size(),
            align,
        })?;
        Ok(Self {
            ptr,
            len: count,
            align,
        })
    }

    /// Allocate `count` zeroed elements at the lane alignment.
    pub fn try_zeroed(count: usize) -> Result<Self, LaneError> {
        Self::with_alignment(count, LANE_BYTES)
    }

    /// Allocate `count` zeroed elements at the lane alignment, diverging
    /// through [`alloc::handle_alloc_error`] on exhaustion like `Vec` does.
    pub fn zeroed(count: usize) -> Self {
        match Self::try_zeroed(count) {
            Ok(buf) => buf,
            Err(LaneError::Alloc { bytes, align }) => {
                let layout = Layout::from_size_align(bytes, align)
                    .unwrap_or_else(|_| Layout::new::<T>());
                alloc::handle_alloc_error(layout)
            }
            Err(e) => panic!("LaneBuffer::zeroed({count}): {e}"),
        }
    }

    /// Copy `src` into a fresh lane-aligned buffer.
    pub fn from_slice(src: &[T]) -> Self {
        let mut buf = Self::zeroed(src.len());
        buf.copy_from_slice(src);
        buf
    }

    /// Buffer of `count` copies of `value`.
    pub fn filled(count: usize, value: T) -> Self {
        let mut buf = Self::zeroed(count);
        buf.fill(value);
        buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Alignment the buffer was allocated with, in bytes.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.align
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// True when the data pointer is a multiple of `bytes`.
    #[inline]
    pub fn is_aligned_to(&self, bytes: usize) -> bool {
        is_aligned(self.as_ptr(), bytes)
    }

    /// Fail fast unless the buffer is aligned to [`LANE_BYTES`].
    #[track_caller]
    pub fn assert_lane_aligned(&self) {
        assert_lane_aligned(self);
    }

    fn layout(count: usize, align: usize) -> Result<Layout, LaneError> {
        let bytes = count
            .checked_mul(core::mem::size_of::<T>())
            .ok_or(LaneError::Layout { count, align })?;
        Layout::from_size_align(bytes, align).map_err(|_| LaneError::Layout { count, align })
    }
}

/// True when `ptr` is a multiple of `bytes`.
#[inline(always)]
pub fn is_aligned<T>(ptr: *const T, bytes: usize) -> bool {
    (ptr as usize) % bytes == 0
}

/// Fail fast unless `slice` starts on a [`LANE_BYTES`] boundary.
#[inline]
#[track_caller]
pub fn assert_lane_aligned<T>(slice: &[T]) {
    assert!(
        is_aligned(slice.as_ptr(), LANE_BYTES),
        "buffer at {:p} is not aligned to {} bytes",
        slice.as_ptr(),
        LANE_BYTES
    );
}

fn dangling<T>(align: usize) -> NonNull<T> {
    // A non-null, suitably aligned address for zero-sized allocations.
    NonNull::new(align as *mut T).unwrap_or(NonNull::dangling())
}

impl<T: Plain> Drop for LaneBuffer<T> {
    fn drop(&mut self) {
        let bytes = self.len * core::mem::size_of::<T>();
        if bytes == 0 {
            return;
        }
        // Same size/align pair that succeeded in `with_alignment`.
        if let Ok(layout) = Layout::from_size_align(bytes, self.align) {
            unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, layout) };
        }
    }
}

impl<T: Plain> Deref for LaneBuffer<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Plain> DerefMut for LaneBuffer<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Plain> Clone for LaneBuffer<T> {
    fn clone(&self) -> Self {
        let mut buf = match Self::with_alignment(self.len, self.align) {
            Ok(buf) => buf,
            Err(_) => alloc::handle_alloc_error(Layout::new::<T>()),
        };
        buf.copy_from_slice(self);
        buf
    }
}

impl<T: Plain> Debug for LaneBuffer<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Plain + PartialEq> PartialEq for LaneBuffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self[..] == other[..]
    }
}

impl<T: Plain + PartialEq> PartialEq<[T]> for LaneBuffer<T> {
    fn eq(&self, other: &[T]) -> bool {
        self[..] == *other
    }
}

impl<T: Plain> FromIterator<T> for LaneBuffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        Self::from_slice(&items)
    }
}

impl<T: Plain> From<&[T]> for LaneBuffer<T> {
    fn from(src: &[T]) -> Self {
        Self::from_slice(src)
    }
}

impl<T: Plain> From<Vec<T>> for LaneBuffer<T> {
    fn from(src: Vec<T>) -> Self {
        Self::from_slice(&src)
    }
}

// ============================================================================
// Vector3SoA
// ============================================================================

/// `N` independent 3-vectors stored as three parallel buffers.
#[derive(Clone, Debug, PartialEq)]
pub struct Vector3SoA {
    x: LaneBuffer<f32>,
    y: LaneBuffer<f32>,
    z: LaneBuffer<f32>,
}

impl Vector3SoA {
    /// Panics unless `x`, `y` and `z` have the same length.
    #[track_caller]
    pub fn new(x: LaneBuffer<f32>, y: LaneBuffer<f32>, z: LaneBuffer<f32>) -> Self {
        assert!(
            x.len() == y.len() && y.len() == z.len(),
            "Vector3SoA components differ in length: x={}, y={}, z={}",
            x.len(),
            y.len(),
            z.len()
        );
        Self { x, y, z }
    }

    /// Transpose array-of-structures input.
    pub fn from_aos(vectors: &[[f32; 3]]) -> Self {
        let mut x = LaneBuffer::zeroed(vectors.len());
        let mut y = LaneBuffer::zeroed(vectors.len());
        let mut z = LaneBuffer::zeroed(vectors.len());
        for (i, v) in vectors.iter().enumerate() {
            x[i] = v[0];
            y[i] = v[1];
            z[i] = v[2];
        }
        Self { x, y, z }
    }

    /// A zero-length batch.
    pub fn empty() -> Self {
        Self::from_aos(&[])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    #[inline]
    pub fn x(&self) -> &[f32] {
        &self.x
    }

    #[inline]
    pub fn y(&self) -> &[f32] {
        &self.y
    }

    #[inline]
    pub fn z(&self) -> &[f32] {
        &self.z
    }

    /// The `i`-th vector.
    #[inline]
    pub fn get(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_is_lane_aligned() {
        let buf = LaneBuffer::<f32>::zeroed(1024);
        assert_eq!(buf.len(), 1024);
        assert!(buf.is_aligned_to(LANE_BYTES));
        assert!(buf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_with_alignment_64() {
        let buf = LaneBuffer::<f64>::with_alignment(7, 64).unwrap();
        assert_eq!(buf.alignment(), 64);
        assert!(buf.is_aligned_to(64));
    }

    #[test]
    fn test_bad_alignment_is_layout_error() {
        let err = LaneBuffer::<f32>::with_alignment(8, 24).unwrap_err();
        assert!(matches!(err, LaneError::Layout { count: 8, align: 24 }));
    }

    #[test]
    fn test_alignment_below_element_is_layout_error() {
        let err = LaneBuffer::<f64>::with_alignment(4, 4).unwrap_err();
        assert!(matches!(err, LaneError::Layout { count: 4, align: 4 }));
        assert!(LaneBuffer::<f64>::with_alignment(4, 8).is_ok());
    }

    #[test]
    fn test_overflowing_count_is_layout_error() {
        let err = LaneBuffer::<f64>::with_alignment(usize::MAX, 32).unwrap_err();
        assert!(matches!(err, LaneError::Layout { .. }));
    }

    #[test]
    fn test_zero_length() {
        let buf = LaneBuffer::<i32>::zeroed(0);
        assert!(buf.is_empty());
        assert!(buf.is_aligned_to(LANE_BYTES));
        let copy = buf.clone();
        assert_eq!(copy.len(), 0);
    }

    #[test]
    fn test_from_slice_and_clone() {
        let buf = LaneBuffer::from_slice(&[1u8, 2, 3]);
        let copy = buf.clone();
        assert_eq!(copy, buf);
        assert_eq!(&copy[..], &[1u8, 2, 3]);
    }

    #[test]
    fn test_buffer_passes_its_own_alignment_check() {
        LaneBuffer::<f32>::zeroed(9).assert_lane_aligned();
        LaneBuffer::<u8>::zeroed(0).assert_lane_aligned();
    }

    #[test]
    #[should_panic(expected = "not aligned")]
    fn test_assert_lane_aligned_rejects_offset_slice() {
        let buf = LaneBuffer::<f32>::zeroed(16);
        assert_lane_aligned(&buf[1..]);
    }

    #[test]
    fn test_soa_from_aos() {
        let soa = Vector3SoA::from_aos(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(soa.len(), 2);
        assert_eq!(soa.x(), &[1.0, 4.0]);
        assert_eq!(soa.get(1), [4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "differ in length")]
    fn test_soa_length_mismatch_panics() {
        let _ = Vector3SoA::new(
            LaneBuffer::zeroed(3),
            LaneBuffer::zeroed(3),
            LaneBuffer::zeroed(2),
        );
    }
}
