//! The plain shared 2-D cell store.
//!
//! # Overview
//!
//! [`Grid`] owns a column-major cell array behind a reference-counted
//! lock. It provides construction from and exchange with [`CellBuffer`]s,
//! and random host-side access for inspection between updates.
//!
//! # Sharing Semantics
//!
//! Cloning a `Grid` is cheap and **shares** the underlying cells; this is
//! how the update drivers hand storage to their worker tasks and how a
//! finished update returns its result. Mutating operations therefore take
//! `&self`: a write through one handle is visible through all of them.
//!
//! # Used By
//!
//! - `cellflow-engine` - The direct per-cell update backend
//! - `cellflow-tests` - Input setup and output inspection

use std::sync::{Arc, RwLock};

use cellflow_core::{Cell, CellBuffer, Error, Extent, Result};

/// A shared, column-major 2-D cell store.
///
/// See the [module documentation](self) for the sharing semantics.
#[derive(Clone)]
pub struct Grid<C: Cell> {
    cells: Arc<RwLock<Vec<C>>>,
    width: usize,
    height: usize,
}

impl<C: Cell> Grid<C> {
    /// Creates a grid of the given dimensions with unspecified contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if either dimension is zero.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(
                width,
                height,
                "grid dimensions must be non-zero",
            ));
        }
        Ok(Self {
            cells: Arc::new(RwLock::new(vec![C::default(); width * height])),
            width,
            height,
        })
    }

    /// Creates a grid with the dimensions and contents of the given buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if the buffer has zero area.
    pub fn from_buffer(buffer: &CellBuffer<C>) -> Result<Self> {
        let grid = Self::new(buffer.width(), buffer.height())?;
        grid.copy_from_buffer(buffer)?;
        Ok(grid)
    }

    /// Overwrites the grid contents from the given buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeMismatch`] if the buffer dimensions differ from
    /// the grid's.
    pub fn copy_from_buffer(&self, buffer: &CellBuffer<C>) -> Result<()> {
        if buffer.extent() != self.extent() {
            return Err(Error::size_mismatch(self.extent(), buffer.extent()));
        }
        self.cells
            .write()
            .expect("grid lock poisoned")
            .copy_from_slice(buffer.as_slice());
        Ok(())
    }

    /// Reads the grid contents into the given buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeMismatch`] if the buffer dimensions differ from
    /// the grid's.
    pub fn copy_to_buffer(&self, buffer: &mut CellBuffer<C>) -> Result<()> {
        if buffer.extent() != self.extent() {
            return Err(Error::size_mismatch(self.extent(), buffer.extent()));
        }
        buffer
            .as_mut_slice()
            .copy_from_slice(&self.cells.read().expect("grid lock poisoned"));
        Ok(())
    }

    /// Creates a new grid of identical dimensions with unspecified
    /// contents and fresh storage.
    pub fn make_similar(&self) -> Self {
        Self {
            cells: Arc::new(RwLock::new(vec![C::default(); self.width * self.height])),
            width: self.width,
            height: self.height,
        }
    }

    /// Returns the grid width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the grid height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the grid dimensions.
    #[inline]
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// Returns the cell at `(c, r)`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `(c, r)` is out of bounds.
    #[inline]
    pub fn cell(&self, c: usize, r: usize) -> C {
        debug_assert!(c < self.width && r < self.height, "cell out of bounds");
        self.cells.read().expect("grid lock poisoned")[c * self.height + r]
    }

    /// Returns the cell at `(c, r)`, or `None` if out of bounds.
    #[inline]
    pub fn get_cell(&self, c: usize, r: usize) -> Option<C> {
        if c < self.width && r < self.height {
            Some(self.cell(c, r))
        } else {
            None
        }
    }

    /// Sets the cell at `(c, r)`.
    ///
    /// The write is visible through every handle sharing this grid's
    /// storage.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `(c, r)` is out of bounds.
    #[inline]
    pub fn set_cell(&self, c: usize, r: usize, cell: C) {
        debug_assert!(c < self.width && r < self.height, "cell out of bounds");
        self.cells.write().expect("grid lock poisoned")[c * self.height + r] = cell;
    }

    /// Returns `true` if `other` shares this grid's storage.
    #[inline]
    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cells, &other.cells)
    }

    pub(crate) fn storage(&self) -> Arc<RwLock<Vec<C>>> {
        Arc::clone(&self.cells)
    }
}

impl<C: Cell> std::fmt::Debug for Grid<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
