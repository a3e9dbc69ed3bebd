//! Owned 2-D cell buffers for host-side exchange.
//!
//! A [`CellBuffer`] is the type the engine uses to exchange cells with the
//! outside world: grids are created from buffers and copied back into
//! buffers. It is also convenient for setting up test inputs and expected
//! outputs.
//!
//! # Memory Layout
//!
//! Cells are stored in **column-major** order, the canonical streaming
//! order of the engine: the column index varies slowest, the row index
//! varies fastest.
//!
//! ```text
//! Memory: [c0r0 c0r1 c0r2 ...]  <- Column 0
//!         [c1r0 c1r1 c1r2 ...]  <- Column 1
//!         ...
//! ```
//!
//! # Usage
//!
//! ```
//! use cellflow_core::CellBuffer;
//!
//! let mut buffer: CellBuffer<u32> = CellBuffer::new(4, 3);
//! buffer.set_cell(2, 1, 42);
//! assert_eq!(buffer.cell(2, 1), 42);
//! assert_eq!(buffer.cell(0, 0), 0);
//! ```
//!
//! # Used By
//!
//! - `cellflow-grid` - Grid constructors and copy operations
//! - `cellflow-tests` - Input setup and output inspection

use crate::cell::Cell;
use crate::coords::Extent;
use crate::error::{Error, Result};

/// An owned, column-major 2-D buffer of cells.
///
/// Unlike a grid, a `CellBuffer` is plain owned data: cloning it clones the
/// cells. Buffer dimensions must equal grid dimensions exactly when
/// exchanging contents; otherwise a size-mismatch error is raised by the
/// grid operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CellBuffer<C: Cell> {
    cells: Vec<C>,
    width: usize,
    height: usize,
}

impl<C: Cell> CellBuffer<C> {
    /// Creates a new buffer with all cells set to the default value.
    ///
    /// A buffer is plain data, so zero dimensions are permitted here; the
    /// grid constructors reject them when a buffer is handed to the
    /// engine.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![C::default(); width * height],
            width,
            height,
        }
    }

    /// Creates a buffer with every cell set to `cell`.
    ///
    /// # Example
    ///
    /// ```
    /// use cellflow_core::CellBuffer;
    ///
    /// let ones: CellBuffer<u64> = CellBuffer::filled(8, 8, 1);
    /// assert_eq!(ones.cell(3, 3), 1);
    /// ```
    pub fn filled(width: usize, height: usize, cell: C) -> Self {
        Self {
            cells: vec![cell; width * height],
            width,
            height,
        }
    }

    /// Creates a buffer by evaluating `f` at every coordinate.
    ///
    /// # Example
    ///
    /// ```
    /// use cellflow_core::CellBuffer;
    ///
    /// let ramp = CellBuffer::from_fn(4, 4, |c, r| (c + r) as u32);
    /// assert_eq!(ramp.cell(1, 2), 3);
    /// ```
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> C) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for c in 0..width {
            for r in 0..height {
                cells.push(f(c, r));
            }
        }
        Self {
            cells,
            width,
            height,
        }
    }

    /// Creates a buffer from existing column-major cell data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `cells.len()` does not equal
    /// `width * height`.
    pub fn from_vec(width: usize, height: usize, cells: Vec<C>) -> Result<Self> {
        let expected = width * height;
        if cells.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} cells, got {}", expected, cells.len()),
            ));
        }
        Ok(Self {
            cells,
            width,
            height,
        })
    }

    /// Returns the buffer width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the buffer height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the buffer dimensions.
    #[inline]
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// Returns `true` if the buffer has zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    fn index(&self, c: usize, r: usize) -> usize {
        c * self.height + r
    }

    /// Returns the cell at `(c, r)`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `(c, r)` is out of bounds.
    #[inline]
    pub fn cell(&self, c: usize, r: usize) -> C {
        debug_assert!(c < self.width && r < self.height, "cell out of bounds");
        self.cells[self.index(c, r)]
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
    /// # Panics
    ///
    /// Panics in debug builds if `(c, r)` is out of bounds.
    #[inline]
    pub fn set_cell(&mut self, c: usize, r: usize, cell: C) {
        debug_assert!(c < self.width && r < self.height, "cell out of bounds");
        let index = self.index(c, r);
        self.cells[index] = cell;
    }

    /// Fills the entire buffer with a cell value.
    pub fn fill(&mut self, cell: C) {
        self.cells.fill(cell);
    }

    /// Returns the raw column-major cell data.
    #[inline]
    pub fn as_slice(&self) -> &[C] {
        &self.cells
    }

    /// Returns the raw column-major cell data mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [C] {
        &mut self.cells
    }

    /// Returns column `c` as a contiguous slice of `height` cells.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `c >= width`.
    #[inline]
    pub fn column(&self, c: usize) -> &[C] {
        debug_assert!(c < self.width, "column out of bounds");
        let start = c * self.height;
        &self.cells[start..start + self.height]
    }

    /// Returns column `c` as a mutable contiguous slice of `height` cells.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `c >= width`.
    #[inline]
    pub fn column_mut(&mut self, c: usize) -> &mut [C] {
        debug_assert!(c < self.width, "column out of bounds");
        let start = c * self.height;
        let height = self.height;
        &mut self.cells[start..start + height]
    }

    /// Iterates over all cells with their coordinates, in streaming order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, C)> + '_ {
        (0..self.width)
            .flat_map(move |c| (0..self.height).map(move |r| (c, r, self.cell(c, r))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_new() {
        let buffer: CellBuffer<u32> = CellBuffer::new(5, 3);
        assert_eq!(buffer.width(), 5);
        assert_eq!(buffer.height(), 3);
        assert_eq!(buffer.extent(), Extent::new(5, 3));
        assert_eq!(buffer.cell(4, 2), 0);
    }

    #[test]
    fn test_buffer_filled() {
        let buffer = CellBuffer::filled(4, 4, 7u64);
        for (_, _, cell) in buffer.cells() {
            assert_eq!(cell, 7);
        }
    }

    #[test]
    fn test_buffer_from_fn() {
        let buffer = CellBuffer::from_fn(3, 2, |c, r| (10 * c + r) as u32);
        assert_eq!(buffer.cell(0, 0), 0);
        assert_eq!(buffer.cell(2, 1), 21);
    }

    #[test]
    fn test_buffer_from_vec() {
        let buffer = CellBuffer::from_vec(2, 2, vec![1u8, 2, 3, 4]).unwrap();
        // Column-major: column 0 is [1, 2], column 1 is [3, 4].
        assert_eq!(buffer.cell(0, 0), 1);
        assert_eq!(buffer.cell(0, 1), 2);
        assert_eq!(buffer.cell(1, 0), 3);
        assert_eq!(buffer.cell(1, 1), 4);
    }

    #[test]
    fn test_buffer_from_vec_wrong_size() {
        let result = CellBuffer::from_vec(2, 2, vec![1u8, 2, 3]);
        assert!(result.is_err());
    }

    #[test]
    fn test_buffer_set_get() {
        let mut buffer: CellBuffer<bool> = CellBuffer::new(4, 4);
        buffer.set_cell(1, 3, true);
        assert!(buffer.cell(1, 3));
        assert_eq!(buffer.get_cell(1, 3), Some(true));
        assert_eq!(buffer.get_cell(4, 0), None);
        assert_eq!(buffer.get_cell(0, 4), None);
    }

    #[test]
    fn test_buffer_column_contiguous() {
        let buffer = CellBuffer::from_fn(3, 4, |c, r| (c * 100 + r) as u32);
        assert_eq!(buffer.column(1), &[100, 101, 102, 103]);
    }

    #[test]
    fn test_buffer_streaming_order() {
        let buffer = CellBuffer::from_fn(2, 2, |c, r| (c, r));
        let order: Vec<_> = buffer.cells().map(|(c, r, _)| (c, r)).collect();
        // Row index varies fastest.
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_buffer_column_mut() {
        let mut buffer: CellBuffer<u32> = CellBuffer::new(3, 4);
        buffer.column_mut(2).fill(5);
        assert_eq!(buffer.cell(2, 0), 5);
        assert_eq!(buffer.cell(2, 3), 5);
        assert_eq!(buffer.cell(1, 0), 0);
    }

    #[test]
    fn test_buffer_fill() {
        let mut buffer: CellBuffer<u8> = CellBuffer::new(3, 3);
        buffer.fill(9);
        assert!(buffer.as_slice().iter().all(|&cell| cell == 9));
    }
}
