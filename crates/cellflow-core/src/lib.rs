//! # cellflow-core
//!
//! Core types for iterative stencil computations on two-dimensional cell
//! grids.
//!
//! This crate provides the foundational types used throughout the cellflow
//! ecosystem:
//!
//! - [`Cell`] - Marker trait for cell value types
//! - [`Coord`], [`CellId`], [`Extent`] - Coordinate and dimension types
//! - [`CellBuffer`] - Owned column-major 2-D cell buffer for host exchange
//! - [`Stencil`] - The neighborhood view passed to transition functions
//! - [`TransitionFunction`] - The contract a stencil code implements
//!
//! ## Design Philosophy
//!
//! The engine is parameterized by the transition-function *type*, not by a
//! function pointer. A transition function carries its cell type, its
//! stencil radius and its sub-iteration count as associated items, so the
//! update machinery can be monomorphized for each stencil code:
//!
//! ```ignore
//! struct Heat;
//! impl TransitionFunction for Heat {
//!     type Cell = f32;
//!     type TimeDependentValue = ();
//!     const STENCIL_RADIUS: usize = 1;
//!     fn apply(&self, s: &Stencil<'_, f32, ()>) -> f32 { /* ... */ }
//!     fn time_dependent_value(&self, _: u64) {}
//! }
//! ```
//!
//! ## Crate Structure
//!
//! This crate is the foundation of cellflow and has no internal
//! dependencies. All other cellflow crates depend on `cellflow-core`:
//!
//! ```text
//! cellflow-core (this crate)
//!    ^
//!    |
//!    +-- cellflow-runtime (task queues, cell streams)
//!    +-- cellflow-grid (grid stores)
//!    +-- cellflow-engine (update kernel and drivers)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod cell;
pub mod coords;
pub mod error;
pub mod stencil;
pub mod transition;

// Re-exports for convenience
pub use buffer::CellBuffer;
pub use cell::Cell;
pub use coords::{CellId, Coord, Extent};
pub use error::{Error, Result};
pub use stencil::Stencil;
pub use transition::{validate, TransitionFunction};

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use cellflow_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::buffer::CellBuffer;
    pub use crate::cell::Cell;
    pub use crate::coords::{CellId, Coord, Extent};
    pub use crate::error::{Error, Result};
    pub use crate::stencil::Stencil;
    pub use crate::transition::TransitionFunction;
}
