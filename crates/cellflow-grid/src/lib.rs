//! # cellflow-grid
//!
//! Grid stores for cellflow: the cell storage half of the stencil engine.
//!
//! Two stores are provided:
//!
//! - [`Grid`] - A plain shared 2-D cell store, used by the direct per-cell
//!   update backend and for host-side setup.
//! - [`TiledGrid`] - The same storage plus a static tile partition and the
//!   FIFO streaming endpoints ([`TiledGrid::submit_read`],
//!   [`TiledGrid::submit_write`]) the pipelined update kernel consumes.
//!
//! ## Sharing Semantics
//!
//! Both stores are **shared handles**: cloning a grid clones a
//! reference-counted pointer to the same cells, not the cells themselves.
//! Writes through any handle are visible through every other handle. Use
//! [`Grid::make_similar`] / [`TiledGrid::make_similar`] to allocate fresh
//! storage of the same dimensions.
//!
//! ## Example
//!
//! ```
//! use cellflow_core::CellBuffer;
//! use cellflow_grid::Grid;
//!
//! let buffer = CellBuffer::from_fn(8, 8, |c, r| (c * 8 + r) as u32);
//! let grid = Grid::from_buffer(&buffer).unwrap();
//!
//! let mut readback = CellBuffer::new(8, 8);
//! grid.copy_to_buffer(&mut readback).unwrap();
//! assert_eq!(buffer, readback);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod grid;
pub mod tiled;

pub use grid::Grid;
pub use tiled::TiledGrid;
