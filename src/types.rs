//! Core type definitions.
//!
//! This module contains the fundamental type aliases and traits used throughout the library.

use num_traits::NumCast;

/// Index type for points in a corpus.
/// Matches the `int32` neighbor tables the pipeline stores; u32 covers 4 billion points.
pub type PointIndex = u32;

/// Element type of the working corpus. Inputs are converted once on load.
pub type Element = f32;

/// Byte width of [`Element`], fed to the batch planner.
pub const ELEMENT_SIZE: usize = std::mem::size_of::<Element>();

/// Alignment of corpus storage in bytes (one cache line).
pub const CORPUS_ALIGNMENT: usize = 64;

/// Largest corpus the index type can address.
pub const MAX_POINTS: usize = PointIndex::MAX as usize;

/// Trait for numeric types that can be used as input coordinates.
///
/// Partitions of any of these types are converted to [`Element`] when a
/// corpus is built.
pub trait DatapointValue: Copy + Default + PartialOrd + NumCast + Send + Sync + 'static {
    /// Convert to the working element type.
    fn to_f32(self) -> f32;

    /// Check if this is a floating-point type.
    fn is_floating() -> bool;
}

macro_rules! impl_datapoint_value {
    ($($t:ty => $floating:expr),* $(,)?) => {
        $(
            impl DatapointValue for $t {
                #[inline]
                fn to_f32(self) -> f32 {
                    self as f32
                }

                #[inline]
                fn is_floating() -> bool {
                    $floating
                }
            }
        )*
    };
}

impl_datapoint_value!(
    f32 => true,
    f64 => true,
    i8 => false,
    u8 => false,
    i16 => false,
    u16 => false,
    i32 => false,
    u32 => false,
);

/// Convert a corpus position to a [`PointIndex`].
///
/// Callers guarantee `index <= MAX_POINTS`, which corpus construction enforces.
#[inline]
pub(crate) fn point_index(index: usize) -> PointIndex {
    debug_assert!(index <= MAX_POINTS);
    index as PointIndex
}
