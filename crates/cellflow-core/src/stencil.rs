//! The neighborhood view passed to transition functions.
//!
//! A [`Stencil`] exposes the extended Moore neighborhood of one central
//! cell together with the invocation context: the center's global
//! position, the grid dimensions, the iteration and sub-iteration indices
//! and the precomputed time-dependent value.
//!
//! # Indexing
//!
//! Two index schemes are provided:
//!
//! - [`rel`](Stencil::rel) - signed offsets relative to the center, within
//!   `[-radius, radius]`; `rel(0, 0)` is the center cell.
//! - [`at`](Stencil::at) - unsigned coordinates with the north-western
//!   corner as origin, within `[0, 2 * radius]`.
//!
//! # Usage
//!
//! ```
//! use cellflow_core::{CellId, Extent, Stencil};
//!
//! // A radius-1 neighborhood of u32 cells, column-major.
//! let cells = [1u32, 2, 3, 4, 5, 6, 7, 8, 9];
//! let stencil = Stencil::new(
//!     CellId::new(10, 10),
//!     Extent::new(64, 64),
//!     0,
//!     0,
//!     (),
//!     1,
//!     &cells,
//! );
//! assert_eq!(stencil.center(), 5);
//! assert_eq!(stencil.rel(-1, -1), 1);
//! assert_eq!(stencil.at(2, 0), 7);
//! ```

use crate::cell::Cell;
use crate::coords::{CellId, Extent};

/// A borrowed view of one `(2 * radius + 1)^2` cell neighborhood plus its
/// invocation context.
///
/// The cells are stored column-major with the row index varying fastest,
/// matching the engine's streaming order. Positions outside the grid have
/// already been substituted with the halo cell by the time a transition
/// function sees the stencil.
#[derive(Debug)]
pub struct Stencil<'a, C, V> {
    /// The global position of the central cell.
    ///
    /// May be negative or exceed the grid dimensions while the pipeline
    /// processes halo positions; transition-function output for such
    /// positions is discarded.
    pub id: CellId,
    /// The dimensions of the grid being updated.
    pub grid_range: Extent,
    /// The iteration index of this invocation.
    pub iteration: u64,
    /// The sub-iteration index of this invocation.
    pub subiteration: u64,
    /// The time-dependent value for [`iteration`](Self::iteration).
    pub time_dependent_value: V,
    radius: usize,
    cells: &'a [C],
}

impl<'a, C: Cell, V> Stencil<'a, C, V> {
    /// Creates a stencil view over a column-major neighborhood patch.
    ///
    /// `cells` must hold exactly `(2 * radius + 1)^2` cells.
    #[inline]
    pub fn new(
        id: CellId,
        grid_range: Extent,
        iteration: u64,
        subiteration: u64,
        time_dependent_value: V,
        radius: usize,
        cells: &'a [C],
    ) -> Self {
        let diameter = 2 * radius + 1;
        debug_assert_eq!(cells.len(), diameter * diameter, "stencil patch size");
        Self {
            id,
            grid_range,
            iteration,
            subiteration,
            time_dependent_value,
            radius,
            cells,
        }
    }

    /// Returns the stencil radius.
    #[inline]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Returns the stencil diameter, `2 * radius + 1`.
    #[inline]
    pub fn diameter(&self) -> usize {
        2 * self.radius + 1
    }

    /// Returns the cell at unsigned coordinates with the north-western
    /// corner as origin.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if either coordinate exceeds `2 * radius`.
    #[inline]
    pub fn at(&self, uc: usize, ur: usize) -> C {
        let diameter = self.diameter();
        debug_assert!(uc < diameter && ur < diameter, "stencil index out of range");
        self.cells[uc * diameter + ur]
    }

    /// Returns the cell at signed offsets relative to the center.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if either offset lies outside
    /// `[-radius, radius]`.
    #[inline]
    pub fn rel(&self, dc: i64, dr: i64) -> C {
        let radius = self.radius as i64;
        debug_assert!(
            dc >= -radius && dc <= radius && dr >= -radius && dr <= radius,
            "stencil offset out of range"
        );
        self.at((dc + radius) as usize, (dr + radius) as usize)
    }

    /// Returns the central cell, `rel(0, 0)`.
    #[inline]
    pub fn center(&self) -> C {
        self.rel(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stencil(cells: &[u32]) -> Stencil<'_, u32, u64> {
        Stencil::new(CellId::new(5, 6), Extent::new(32, 16), 3, 1, 99, 1, cells)
    }

    #[test]
    fn test_stencil_context() {
        let cells = [0u32; 9];
        let stencil = stencil(&cells);
        assert_eq!(stencil.id, CellId::new(5, 6));
        assert_eq!(stencil.grid_range, Extent::new(32, 16));
        assert_eq!(stencil.iteration, 3);
        assert_eq!(stencil.subiteration, 1);
        assert_eq!(stencil.time_dependent_value, 99);
        assert_eq!(stencil.radius(), 1);
        assert_eq!(stencil.diameter(), 3);
    }

    #[test]
    fn test_stencil_indexing() {
        // Column-major: columns are [1,2,3], [4,5,6], [7,8,9].
        let cells = [1u32, 2, 3, 4, 5, 6, 7, 8, 9];
        let stencil = stencil(&cells);
        assert_eq!(stencil.center(), 5);
        assert_eq!(stencil.at(0, 0), 1);
        assert_eq!(stencil.at(2, 2), 9);
        assert_eq!(stencil.rel(-1, 0), 2);
        assert_eq!(stencil.rel(1, 0), 8);
        assert_eq!(stencil.rel(0, -1), 4);
        assert_eq!(stencil.rel(0, 1), 6);
    }

    #[test]
    fn test_stencil_radius_two() {
        let cells: Vec<u32> = (0..25).collect();
        let stencil = Stencil::new(
            CellId::new(0, 0),
            Extent::new(8, 8),
            0,
            0,
            (),
            2,
            &cells,
        );
        assert_eq!(stencil.diameter(), 5);
        assert_eq!(stencil.center(), 12);
        assert_eq!(stencil.rel(-2, -2), 0);
        assert_eq!(stencil.rel(2, 2), 24);
    }
}
