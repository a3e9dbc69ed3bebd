//! Error types for cellflow operations.
//!
//! # Overview
//!
//! The [`Error`] enum covers the failure modes of the engine:
//! - Buffer/grid dimension disagreements
//! - Tile indices outside a grid's tile range
//! - Rejected constructions: zero-dimension grids, mis-sized raw cell
//!   vectors, bad engine parameters
//!
//! All errors are reported synchronously from the call that caused them;
//! streaming never starts on a failed submission.
//!
//! # Usage
//!
//! ```
//! use cellflow_core::{Error, Extent, Result};
//!
//! fn check_extents(grid: Extent, buffer: Extent) -> Result<()> {
//!     if grid != buffer {
//!         return Err(Error::size_mismatch(grid, buffer));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation

use crate::coords::Extent;
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
///
/// Convenience alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during cellflow grid and update operations.
///
/// This enum uses [`thiserror`] for automatic [`std::error::Error`] and
/// [`std::fmt::Display`] implementations.
#[derive(Debug, Error)]
pub enum Error {
    /// An external buffer's dimensions do not equal the grid's.
    ///
    /// Returned by `copy_from_buffer`, `copy_to_buffer` and the
    /// buffer-consuming constructors. The caller must supply a buffer of
    /// exactly the grid's dimensions.
    #[error("size mismatch: grid is {expected}, buffer is {got}")]
    SizeMismatch {
        /// The dimensions of the grid.
        expected: Extent,
        /// The dimensions of the offending buffer.
        got: Extent,
    },

    /// A tile index lies outside the grid's tile range.
    ///
    /// Returned synchronously by `submit_read` and `submit_write` before
    /// any streaming starts.
    #[error("tile index {tile} out of range {range}")]
    TileOutOfRange {
        /// The requested tile index.
        tile: Extent,
        /// The grid's tile range.
        range: Extent,
    },

    /// Invalid grid or buffer dimensions.
    ///
    /// Returned when a width or height of zero is requested, or when a raw
    /// cell vector does not match the requested dimensions.
    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
        /// Why the dimensions were rejected.
        reason: String,
    },

    /// Invalid engine configuration.
    ///
    /// Returned at update-driver construction or at `update()` entry, for
    /// example when the pipeline depth is not a multiple of the
    /// sub-iteration count or the tile is too small for its halo.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },
}

impl Error {
    /// Creates an [`Error::SizeMismatch`] error.
    #[inline]
    pub fn size_mismatch(expected: Extent, got: Extent) -> Self {
        Self::SizeMismatch { expected, got }
    }

    /// Creates an [`Error::TileOutOfRange`] error.
    #[inline]
    pub fn tile_out_of_range(tile: Extent, range: Extent) -> Self {
        Self::TileOutOfRange { tile, range }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: usize, height: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidConfig`] error.
    #[inline]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a size-mismatch error.
    #[inline]
    pub fn is_size_mismatch(&self) -> bool {
        matches!(self, Self::SizeMismatch { .. })
    }

    /// Returns `true` if this is a tile-out-of-range error.
    #[inline]
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::TileOutOfRange { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[inline]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}
