//! The tiled grid store with streaming endpoints.
//!
//! # Overview
//!
//! [`TiledGrid`] partitions its cell array into static `TILE_WIDTH` x
//! `TILE_HEIGHT` tiles and offers the two streaming operations the
//! pipelined update kernel is built around:
//!
//! - [`submit_read`](TiledGrid::submit_read) streams one tile **plus its
//!   halo** into a cell stream, substituting the caller's halo cell for
//!   every position outside the grid.
//! - [`submit_write`](TiledGrid::submit_write) consumes one tile's worth
//!   of updated cells from a stream and writes them into the store.
//!
//! Both enqueue a task on an in-order [`Queue`] and return immediately.
//!
//! # Streaming Contract
//!
//! Cells are streamed in column-major order (row index fastest) over the
//! halo-extended tile region; boundary tiles are clipped to the grid
//! before the halo is applied. For a tile of clipped dimensions
//! `Tw' x Th'` and halo radius `hr`, a read produces exactly
//! `(Tw' + 2 * hr) * (Th' + 2 * hr)` cells and a write consumes exactly
//! `Tw' * Th'` cells.
//!
//! # Type Parameters
//!
//! Tile geometry is part of the grid type so that the update kernel's
//! line buffers can be sized at compile time. `HALO_RADIUS` must equal
//! `stencil_radius * pipeline_depth` of the kernel that will process the
//! tiles; the update driver validates this at construction.

use cellflow_core::{Cell, CellBuffer, Error, Extent, Result};
use cellflow_runtime::stream::{Receiver, Sender};
use cellflow_runtime::{Event, Queue};

use crate::grid::Grid;

/// A shared 2-D cell store partitioned into static tiles, with FIFO
/// streaming endpoints for the update kernel.
///
/// All [`Grid`] operations are available; cloning shares the cells. See
/// the [module documentation](self) for the streaming contract.
#[derive(Clone)]
pub struct TiledGrid<
    C: Cell,
    const TILE_WIDTH: usize,
    const TILE_HEIGHT: usize,
    const HALO_RADIUS: usize,
> {
    inner: Grid<C>,
}

impl<C: Cell, const TILE_WIDTH: usize, const TILE_HEIGHT: usize, const HALO_RADIUS: usize>
    TiledGrid<C, TILE_WIDTH, TILE_HEIGHT, HALO_RADIUS>
{
    /// Creates a grid of the given dimensions with unspecified contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if either dimension is zero,
    /// or [`Error::InvalidConfig`] if the tile is not strictly larger than
    /// twice the halo radius in both dimensions (the temporal-blocking
    /// viability bound).
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if TILE_WIDTH <= 2 * HALO_RADIUS || TILE_HEIGHT <= 2 * HALO_RADIUS {
            return Err(Error::invalid_config(format!(
                "tile {}x{} is too small for halo radius {}",
                TILE_WIDTH, TILE_HEIGHT, HALO_RADIUS
            )));
        }
        Ok(Self {
            inner: Grid::new(width, height)?,
        })
    }

    /// Creates a grid with the dimensions and contents of the given buffer.
    ///
    /// # Errors
    ///
    /// As for [`new`](Self::new), plus [`Error::InvalidDimensions`] if the
    /// buffer has zero area.
    pub fn from_buffer(buffer: &CellBuffer<C>) -> Result<Self> {
        let grid = Self::new(buffer.width(), buffer.height())?;
        grid.copy_from_buffer(buffer)?;
        Ok(grid)
    }

    /// Overwrites the grid contents from the given buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeMismatch`] if the buffer dimensions differ
    /// from the grid's.
    pub fn copy_from_buffer(&self, buffer: &CellBuffer<C>) -> Result<()> {
        self.inner.copy_from_buffer(buffer)
    }

    /// Reads the grid contents into the given buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeMismatch`] if the buffer dimensions differ
    /// from the grid's.
    pub fn copy_to_buffer(&self, buffer: &mut CellBuffer<C>) -> Result<()> {
        self.inner.copy_to_buffer(buffer)
    }

    /// Creates a new grid of identical dimensions with unspecified
    /// contents and fresh storage.
    pub fn make_similar(&self) -> Self {
        Self {
            inner: self.inner.make_similar(),
        }
    }

    /// Returns the grid width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.inner.width()
    }

    /// Returns the grid height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.inner.height()
    }

    /// Returns the grid dimensions.
    #[inline]
    pub fn extent(&self) -> Extent {
        self.inner.extent()
    }

    /// Returns the cell at `(c, r)`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `(c, r)` is out of bounds.
    #[inline]
    pub fn cell(&self, c: usize, r: usize) -> C {
        self.inner.cell(c, r)
    }

    /// Returns the cell at `(c, r)`, or `None` if out of bounds.
    #[inline]
    pub fn get_cell(&self, c: usize, r: usize) -> Option<C> {
        self.inner.get_cell(c, r)
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
        self.inner.set_cell(c, r, cell);
    }

    /// Returns `true` if `other` shares this grid's storage.
    #[inline]
    pub fn shares_storage(&self, other: &Self) -> bool {
        self.inner.shares_storage(&other.inner)
    }

    /// Returns the number of tiles covering the grid in each direction.
    ///
    /// Boundary tiles may be partially outside the grid; they are clipped
    /// by the streaming operations.
    #[inline]
    pub fn tile_range(&self) -> Extent {
        Extent::new(
            self.width().div_ceil(TILE_WIDTH),
            self.height().div_ceil(TILE_HEIGHT),
        )
    }

    fn check_tile(&self, tile_c: usize, tile_r: usize) -> Result<()> {
        let range = self.tile_range();
        if tile_c >= range.c || tile_r >= range.r {
            return Err(Error::tile_out_of_range(Extent::new(tile_c, tile_r), range));
        }
        Ok(())
    }

    /// Enqueues streaming of one tile plus its halo into `output`.
    ///
    /// Cells are emitted in column-major order over the halo-extended
    /// clipped tile region; every position outside the grid produces
    /// `halo`. The task is submitted to `queue` and this method returns
    /// immediately with the task's [`Event`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::TileOutOfRange`] before any streaming starts if
    /// the tile index is outside [`tile_range`](Self::tile_range).
    pub fn submit_read(
        &self,
        queue: &Queue,
        tile_c: usize,
        tile_r: usize,
        halo: C,
        output: Sender<C>,
    ) -> Result<Event> {
        self.check_tile(tile_c, tile_r)?;

        let storage = self.inner.storage();
        let width = self.width();
        let height = self.height();
        Ok(queue.submit(move || {
            let cells = storage.read().expect("grid lock poisoned");
            let start_c = (tile_c * TILE_WIDTH) as i64 - HALO_RADIUS as i64;
            let end_c = (((tile_c + 1) * TILE_WIDTH).min(width) + HALO_RADIUS) as i64;
            let start_r = (tile_r * TILE_HEIGHT) as i64 - HALO_RADIUS as i64;
            let end_r = (((tile_r + 1) * TILE_HEIGHT).min(height) + HALO_RADIUS) as i64;

            for c in start_c..end_c {
                for r in start_r..end_r {
                    let inside =
                        c >= 0 && r >= 0 && (c as usize) < width && (r as usize) < height;
                    let cell = if inside {
                        cells[c as usize * height + r as usize]
                    } else {
                        halo
                    };
                    if output.send(cell).is_err() {
                        return;
                    }
                }
            }
        }))
    }

    /// Enqueues consumption of one tile's worth of cells from `input`.
    ///
    /// Cells are consumed in column-major order over the clipped tile
    /// interior and written into the store. If the stream runs dry the
    /// remaining cells are left untouched. The task is submitted to
    /// `queue` and this method returns immediately with the task's
    /// [`Event`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::TileOutOfRange`] before any streaming starts if
    /// the tile index is outside [`tile_range`](Self::tile_range).
    pub fn submit_write(
        &self,
        queue: &Queue,
        tile_c: usize,
        tile_r: usize,
        input: Receiver<C>,
    ) -> Result<Event> {
        self.check_tile(tile_c, tile_r)?;

        let storage = self.inner.storage();
        let width = self.width();
        let height = self.height();
        Ok(queue.submit(move || {
            let mut cells = storage.write().expect("grid lock poisoned");
            let start_c = tile_c * TILE_WIDTH;
            let end_c = ((tile_c + 1) * TILE_WIDTH).min(width);
            let start_r = tile_r * TILE_HEIGHT;
            let end_r = ((tile_r + 1) * TILE_HEIGHT).min(height);

            for c in start_c..end_c {
                for r in start_r..end_r {
                    match input.recv() {
                        Ok(cell) => cells[c * height + r] = cell,
                        Err(_) => return,
                    }
                }
            }
        }))
    }
}

impl<C: Cell, const TILE_WIDTH: usize, const TILE_HEIGHT: usize, const HALO_RADIUS: usize>
    std::fmt::Debug for TiledGrid<C, TILE_WIDTH, TILE_HEIGHT, HALO_RADIUS>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiledGrid")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("tile_width", &TILE_WIDTH)
            .field("tile_height", &TILE_HEIGHT)
            .field("halo_radius", &HALO_RADIUS)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellflow_runtime::{stream, Device};

    type SmallGrid = TiledGrid<u32, 4, 4, 1>;

    fn ramp_grid(width: usize, height: usize) -> SmallGrid {
        let buffer = CellBuffer::from_fn(width, height, |c, r| (c * 100 + r) as u32);
        SmallGrid::from_buffer(&buffer).unwrap()
    }

    #[test]
    fn test_tile_range() {
        assert_eq!(ramp_grid(4, 4).tile_range(), Extent::new(1, 1));
        assert_eq!(ramp_grid(5, 4).tile_range(), Extent::new(2, 1));
        assert_eq!(ramp_grid(8, 9).tile_range(), Extent::new(2, 3));
    }

    #[test]
    fn test_tile_too_small_for_halo() {
        let err = TiledGrid::<u32, 4, 4, 2>::new(8, 8).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_submit_read_out_of_range() {
        let grid = ramp_grid(4, 4);
        let queue = Device::cpu().create_queue();
        let (tx, _rx) = stream::channel();
        let err = grid.submit_read(&queue, 1, 0, 0, tx).unwrap_err();
        assert!(err.is_out_of_range());
    }

    #[test]
    fn test_submit_write_out_of_range() {
        let grid = ramp_grid(4, 4);
        let queue = Device::cpu().create_queue();
        let (_tx, rx) = stream::channel();
        let err = grid.submit_write(&queue, 0, 1, rx).unwrap_err();
        assert!(err.is_out_of_range());
    }

    #[test]
    fn test_submit_read_streams_halo_extended_tile() {
        let grid = ramp_grid(4, 4);
        let queue = Device::cpu().create_queue();
        let (tx, rx) = stream::channel();
        let halo = 9999u32;
        grid.submit_read(&queue, 0, 0, halo, tx).unwrap().wait();

        let cells: Vec<u32> = rx.iter().collect();
        // (4 + 2) * (4 + 2) cells, column-major from (-1, -1) to (4, 4).
        assert_eq!(cells.len(), 36);
        let expected = |c: i64, r: i64| -> u32 {
            if c >= 0 && r >= 0 && c < 4 && r < 4 {
                (c * 100 + r) as u32
            } else {
                halo
            }
        };
        let mut i = 0;
        for c in -1..5 {
            for r in -1..5 {
                assert_eq!(cells[i], expected(c, r), "at ({}, {})", c, r);
                i += 1;
            }
        }
    }

    #[test]
    fn test_submit_read_clips_boundary_tile() {
        // 6x4 grid with 4x4 tiles: tile (1, 0) covers columns 4..6 only.
        let grid = ramp_grid(6, 4);
        let queue = Device::cpu().create_queue();
        let (tx, rx) = stream::channel();
        grid.submit_read(&queue, 1, 0, 7777, tx).unwrap().wait();

        let cells: Vec<u32> = rx.iter().collect();
        // (2 + 2) * (4 + 2) cells: columns 3..7, rows -1..5.
        assert_eq!(cells.len(), 24);
        assert_eq!(cells[0], 7777); // (3, -1) is above the grid
        assert_eq!(cells[1], 300); // (3, 0)
    }

    #[test]
    fn test_submit_write_fills_tile_interior() {
        let grid = SmallGrid::new(6, 4).unwrap();
        let queue = Device::cpu().create_queue();
        let (tx, rx) = stream::channel();
        // Tile (1, 0) is clipped to 2x4 cells.
        for value in 0..8u32 {
            tx.send(value + 50).unwrap();
        }
        drop(tx);
        grid.submit_write(&queue, 1, 0, rx).unwrap().wait();

        // Column-major: (4,0) (4,1) (4,2) (4,3) (5,0) ...
        assert_eq!(grid.cell(4, 0), 50);
        assert_eq!(grid.cell(4, 3), 53);
        assert_eq!(grid.cell(5, 0), 54);
        assert_eq!(grid.cell(5, 3), 57);
        // Cells outside the tile are untouched.
        assert_eq!(grid.cell(0, 0), 0);
    }

    #[test]
    fn test_read_write_roundtrip_through_streams() {
        let source = ramp_grid(4, 4);
        let target = source.make_similar();
        let queue = Device::cpu().create_queue();

        let (read_tx, read_rx) = stream::channel();
        let (write_tx, write_rx) = stream::channel();
        source.submit_read(&queue, 0, 0, 0, read_tx).unwrap();
        // Drop the halo ring, forward the 4x4 interior.
        queue.submit(move || {
            for c in -1..5i64 {
                for r in -1..5i64 {
                    let cell = read_rx.recv().unwrap_or(0);
                    let inside = c >= 0 && r >= 0 && c < 4 && r < 4;
                    if inside {
                        write_tx.send(cell).ok();
                    }
                }
            }
        });
        target.submit_write(&queue, 0, 0, write_rx).unwrap().wait();

        let mut expected = CellBuffer::new(4, 4);
        let mut actual = CellBuffer::new(4, 4);
        source.copy_to_buffer(&mut expected).unwrap();
        target.copy_to_buffer(&mut actual).unwrap();
        assert_eq!(expected, actual);
    }
}
