//! The direct per-cell update backend.
//!
//! [`DirectStencilUpdate`] applies the transition function cell by cell
//! with explicit neighborhood reads into a double-buffered grid, one
//! sub-iteration per sweep, parallelized over grid columns with rayon.
//! No tiling, no pipeline: correctness is identical to the streaming
//! engine, the temporal-blocking memory-bandwidth multiplier is not.
//!
//! It serves as the portable fallback backend and as the oracle the
//! pipelined engine is tested against.

use std::time::{Duration, Instant};

use cellflow_core::{validate, CellBuffer, CellId, Result, Stencil, TransitionFunction};
use cellflow_grid::Grid;
use rayon::prelude::*;
use tracing::debug;

use crate::update::UpdateParams;

/// A grid updater that applies an iterative stencil code one cell at a
/// time.
///
/// Uses the same [`UpdateParams`] record as the pipelined updater. The
/// device and TDV-strategy fields are accepted for interface parity but
/// have no effect here: sweeps run on the host thread pool and
/// time-dependent values are computed once per sweep.
pub struct DirectStencilUpdate<F: TransitionFunction> {
    params: UpdateParams<F>,
    n_processed_cells: u64,
    walltime: Duration,
}

impl<F: TransitionFunction> DirectStencilUpdate<F> {
    /// Creates a new updater.
    ///
    /// # Errors
    ///
    /// Returns [`cellflow_core::Error::InvalidConfig`] if the transition
    /// function's constants are invalid.
    pub fn new(params: UpdateParams<F>) -> Result<Self> {
        validate::<F>()?;
        Ok(Self {
            params,
            n_processed_cells: 0,
            walltime: Duration::ZERO,
        })
    }

    /// Returns the parameters.
    pub fn params(&self) -> &UpdateParams<F> {
        &self.params
    }

    /// Returns the parameters mutably. Changes apply to the next call to
    /// [`update`](Self::update).
    pub fn params_mut(&mut self) -> &mut UpdateParams<F> {
        &mut self.params
    }

    /// Computes a new grid from `source` by applying the transition
    /// function `n_iterations` times.
    ///
    /// Like the pipelined updater, the computation ping-pongs two scratch
    /// grids and never writes the source; with `n_iterations == 0` a
    /// handle sharing the source's storage is returned. This backend
    /// always blocks: the grid it returns is complete.
    ///
    /// # Errors
    ///
    /// Propagates buffer exchange errors from the underlying grids.
    pub fn update(&mut self, source: &Grid<F::Cell>) -> Result<Grid<F::Cell>> {
        if self.params.n_iterations == 0 {
            return Ok(source.clone());
        }

        let walltime_start = Instant::now();

        let swap_grid_a = source.make_similar();
        let swap_grid_b = source.make_similar();
        let mut pass_source: &Grid<F::Cell> = source;
        let mut pass_target: &Grid<F::Cell> = &swap_grid_b;

        for i_iter in 0..self.params.n_iterations {
            for i_subiter in 0..F::N_SUBITERATIONS as u64 {
                self.run_sweep(
                    pass_source,
                    pass_target,
                    self.params.iteration_offset + i_iter,
                    i_subiter,
                )?;
                if i_iter == 0 && i_subiter == 0 {
                    pass_source = &swap_grid_b;
                    pass_target = &swap_grid_a;
                } else {
                    std::mem::swap(&mut pass_source, &mut pass_target);
                }
            }
        }

        self.walltime += walltime_start.elapsed();
        self.n_processed_cells +=
            self.params.n_iterations * (source.width() as u64) * (source.height() as u64);

        Ok(pass_source.clone())
    }

    /// Advances the grid by one sub-iteration, reading from `pass_source`
    /// and writing to `pass_target`.
    fn run_sweep(
        &self,
        pass_source: &Grid<F::Cell>,
        pass_target: &Grid<F::Cell>,
        i_iter: u64,
        i_subiter: u64,
    ) -> Result<()> {
        let width = pass_source.width();
        let height = pass_source.height();
        let extent = pass_source.extent();
        let radius = F::STENCIL_RADIUS as i64;
        let diameter = (2 * radius + 1) as usize;

        debug!(i_iter, i_subiter, "direct sweep");

        let mut source_cells = CellBuffer::new(width, height);
        pass_source.copy_to_buffer(&mut source_cells)?;
        let mut target_cells = CellBuffer::new(width, height);

        let func = &self.params.transition_function;
        let halo = self.params.halo_value;
        let tdv = func.time_dependent_value(i_iter);

        target_cells
            .as_mut_slice()
            .par_chunks_mut(height)
            .enumerate()
            .for_each(|(c, column)| {
                let mut patch = vec![halo; diameter * diameter];
                for (r, target) in column.iter_mut().enumerate() {
                    for dc in -radius..=radius {
                        for dr in -radius..=radius {
                            let id = CellId::new(c as i64 + dc, r as i64 + dr);
                            patch[(dc + radius) as usize * diameter + (dr + radius) as usize] =
                                if extent.contains(id) {
                                    source_cells.cell(id.c as usize, id.r as usize)
                                } else {
                                    halo
                                };
                        }
                    }
                    let stencil = Stencil::new(
                        CellId::new(c as i64, r as i64),
                        extent,
                        i_iter,
                        i_subiter,
                        tdv,
                        radius as usize,
                        &patch,
                    );
                    *target = func.apply(&stencil);
                }
            });

        pass_target.copy_from_buffer(&target_cells)
    }

    /// Returns the accumulated total number of cells processed by this
    /// updater.
    pub fn n_processed_cells(&self) -> u64 {
        self.n_processed_cells
    }

    /// Returns the accumulated host-side runtime of all `update` calls.
    pub fn walltime(&self) -> Duration {
        self.walltime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Counter;

    impl TransitionFunction for Counter {
        type Cell = u64;
        type TimeDependentValue = ();
        const STENCIL_RADIUS: usize = 1;

        fn apply(&self, stencil: &Stencil<'_, u64, ()>) -> u64 {
            stencil.center() + 1
        }

        fn time_dependent_value(&self, _i_iteration: u64) {}
    }

    #[derive(Clone)]
    struct NeighborSum;

    impl TransitionFunction for NeighborSum {
        type Cell = u64;
        type TimeDependentValue = ();
        const STENCIL_RADIUS: usize = 1;

        fn apply(&self, stencil: &Stencil<'_, u64, ()>) -> u64 {
            let mut sum = 0;
            for dc in -1..=1 {
                for dr in -1..=1 {
                    sum += stencil.rel(dc, dr);
                }
            }
            sum
        }

        fn time_dependent_value(&self, _i_iteration: u64) {}
    }

    #[test]
    fn test_counter() {
        let source = Grid::from_buffer(&CellBuffer::new(16, 16)).unwrap();
        let mut params = UpdateParams::new(Counter);
        params.n_iterations = 10;
        let mut update = DirectStencilUpdate::new(params).unwrap();
        let result = update.update(&source).unwrap();
        assert_eq!(result.cell(8, 8), 10);
        assert_eq!(update.n_processed_cells(), 10 * 16 * 16);
    }

    #[test]
    fn test_neighbor_sum_with_halo() {
        // All ones, halo zero: corners see 4 live cells, edges 6,
        // interior 9.
        let source = Grid::from_buffer(&CellBuffer::filled(16, 16, 1u64)).unwrap();
        let mut update = DirectStencilUpdate::new(UpdateParams::new(NeighborSum)).unwrap();
        let result = update.update(&source).unwrap();
        assert_eq!(result.cell(0, 0), 4);
        assert_eq!(result.cell(8, 0), 6);
        assert_eq!(result.cell(0, 8), 6);
        assert_eq!(result.cell(8, 8), 9);
        assert_eq!(result.cell(15, 15), 4);
    }

    #[test]
    fn test_source_unmodified() {
        let buffer = CellBuffer::from_fn(8, 8, |c, r| (c + r) as u64);
        let source = Grid::from_buffer(&buffer).unwrap();
        let mut params = UpdateParams::new(Counter);
        params.n_iterations = 3;
        let mut update = DirectStencilUpdate::new(params).unwrap();
        let _ = update.update(&source).unwrap();

        let mut readback = CellBuffer::new(8, 8);
        source.copy_to_buffer(&mut readback).unwrap();
        assert_eq!(buffer, readback);
    }

    #[test]
    fn test_zero_iterations_shares_source() {
        let source = Grid::from_buffer(&CellBuffer::filled(8, 8, 5u64)).unwrap();
        let mut params = UpdateParams::new(Counter);
        params.n_iterations = 0;
        let mut update = DirectStencilUpdate::new(params).unwrap();
        let result = update.update(&source).unwrap();
        assert!(result.shares_storage(&source));
    }
}
