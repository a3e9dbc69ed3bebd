//! The temporally-blocked streaming update kernel.
//!
//! [`PipelineKernel`] consumes one tile plus halo from a cell stream,
//! applies up to `PIPELINE_DEPTH` chained applications of the transition
//! function in a single scan, and emits the updated tile core. It is the
//! streaming half of the engine; the update driver schedules it across
//! tiles and passes.
//!
//! # Pipeline Structure
//!
//! Conceptually the kernel is `PIPELINE_DEPTH` processing stages in a
//! systolic chain. Stage `s` advances cells from iteration
//! `i + s / n_subiterations`, sub-iteration `s % n_subiterations`. Each
//! stage owns:
//!
//! - a `(2 * radius + 1)^2` shift-register stencil buffer holding the
//!   cells currently centered under the stage, and
//! - a line buffer of `2 * radius` cached columns per row, double-buffered
//!   on the parity of the input column, supplying the cells the stage
//!   produced earlier in the scan.
//!
//! Every cycle one cell enters stage 0 from the input stream; each stage
//! shifts its stencil buffer up a row, refills the bottom row from its
//! line buffer plus the cell carried from the previous stage, and either
//! applies the transition function or, once its logical iteration reaches
//! the target, passes the center cell through unchanged. After the warm-up
//! phase every cycle also emits one updated cell from the last stage.
//!
//! The stage count is fixed at compile time so the per-stage state can be
//! laid out contiguously; the line buffer is banked at the next power of
//! two above `PIPELINE_DEPTH`, matching the layout the design was derived
//! from.

use cellflow_core::{validate, CellId, Error, Extent, Result, Stencil, TransitionFunction};
use cellflow_runtime::stream::{Receiver, Sender};
use tracing::trace;

use crate::tdv::TdvKernelArgument;

/// One configured invocation of the pipelined update kernel: a fixed tile
/// position, iteration window and halo cell.
///
/// `run` reads exactly `(Tw' + 2 * hr) * (Th' + 2 * hr)` cells and writes
/// exactly `Tw' * Th'` cells, where `Tw' x Th'` is the tile clipped to the
/// grid and `hr = STENCIL_RADIUS * PIPELINE_DEPTH`. It has no other side
/// effects and never fails dynamically: a stream that runs dry substitutes
/// the halo cell, producing undefined cell values but no error.
pub struct PipelineKernel<
    F: TransitionFunction,
    const PIPELINE_DEPTH: usize,
    const TILE_WIDTH: usize,
    const TILE_HEIGHT: usize,
> {
    func: F,
    i_iteration: u64,
    target_i_iteration: u64,
    grid_c_offset: usize,
    grid_r_offset: usize,
    grid_width: usize,
    grid_height: usize,
    halo: F::Cell,
    tdv: TdvKernelArgument<F>,
}

impl<
        F: TransitionFunction,
        const PIPELINE_DEPTH: usize,
        const TILE_WIDTH: usize,
        const TILE_HEIGHT: usize,
    > std::fmt::Debug for PipelineKernel<F, PIPELINE_DEPTH, TILE_WIDTH, TILE_HEIGHT>
where
    F: std::fmt::Debug,
    F::Cell: std::fmt::Debug,
    F::TimeDependentValue: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineKernel")
            .field("func", &self.func)
            .field("i_iteration", &self.i_iteration)
            .field("target_i_iteration", &self.target_i_iteration)
            .field("grid_c_offset", &self.grid_c_offset)
            .field("grid_r_offset", &self.grid_r_offset)
            .field("grid_width", &self.grid_width)
            .field("grid_height", &self.grid_height)
            .field("halo", &self.halo)
            .field("tdv", &self.tdv)
            .finish()
    }
}

impl<
        F: TransitionFunction,
        const PIPELINE_DEPTH: usize,
        const TILE_WIDTH: usize,
        const TILE_HEIGHT: usize,
    > PipelineKernel<F, PIPELINE_DEPTH, TILE_WIDTH, TILE_HEIGHT>
{
    /// The halo radius implied by this kernel's depth and stencil radius.
    pub const HALO_RADIUS: usize = F::STENCIL_RADIUS * PIPELINE_DEPTH;

    /// Creates a kernel that recomputes time-dependent values inline.
    ///
    /// `i_iteration` is the iteration index of the input cells;
    /// `target_i_iteration` caps how far the pipeline advances them (stages
    /// beyond the cap pass cells through unchanged). The tile offsets are
    /// the north-western corner of the tile core in grid coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the transition function's
    /// constants are invalid, if `PIPELINE_DEPTH` is zero or not a
    /// multiple of `N_SUBITERATIONS`, or if the tile is not strictly
    /// larger than twice the halo radius.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        func: F,
        i_iteration: u64,
        target_i_iteration: u64,
        grid_c_offset: usize,
        grid_r_offset: usize,
        grid_width: usize,
        grid_height: usize,
        halo: F::Cell,
    ) -> Result<Self> {
        validate::<F>()?;
        if PIPELINE_DEPTH == 0 {
            return Err(Error::invalid_config("pipeline depth must be at least 1"));
        }
        if PIPELINE_DEPTH % F::N_SUBITERATIONS != 0 {
            return Err(Error::invalid_config(format!(
                "pipeline depth {} is not a multiple of {} sub-iterations",
                PIPELINE_DEPTH,
                F::N_SUBITERATIONS
            )));
        }
        if TILE_WIDTH <= 2 * Self::HALO_RADIUS || TILE_HEIGHT <= 2 * Self::HALO_RADIUS {
            return Err(Error::invalid_config(format!(
                "tile {}x{} is too small for halo radius {}",
                TILE_WIDTH,
                TILE_HEIGHT,
                Self::HALO_RADIUS
            )));
        }
        let tdv = TdvKernelArgument::Inline {
            func: func.clone(),
            pass_offset: i_iteration,
        };
        Ok(Self::with_tdv(
            func,
            i_iteration,
            target_i_iteration,
            grid_c_offset,
            grid_r_offset,
            grid_width,
            grid_height,
            halo,
            tdv,
        ))
    }

    /// Creates a kernel with an explicit time-dependent-value argument.
    /// The caller has already validated the configuration.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn with_tdv(
        func: F,
        i_iteration: u64,
        target_i_iteration: u64,
        grid_c_offset: usize,
        grid_r_offset: usize,
        grid_width: usize,
        grid_height: usize,
        halo: F::Cell,
        tdv: TdvKernelArgument<F>,
    ) -> Self {
        debug_assert_eq!(grid_c_offset % TILE_WIDTH, 0, "tile column offset");
        debug_assert_eq!(grid_r_offset % TILE_HEIGHT, 0, "tile row offset");
        Self {
            func,
            i_iteration,
            target_i_iteration,
            grid_c_offset,
            grid_r_offset,
            grid_width,
            grid_height,
            halo,
            tdv,
        }
    }

    /// Streams one tile through the pipeline.
    ///
    /// Consumes the halo-extended tile from `input` in column-major order
    /// and emits the updated tile core to `output` in the same order.
    pub fn run(&self, input: &Receiver<F::Cell>, output: &Sender<F::Cell>) {
        let radius = F::STENCIL_RADIUS;
        let diameter = 2 * radius + 1;
        let halo_radius = Self::HALO_RADIUS;

        trace!(
            tile_c = self.grid_c_offset / TILE_WIDTH,
            tile_r = self.grid_r_offset / TILE_HEIGHT,
            i_iteration = self.i_iteration,
            "pipeline kernel entry"
        );

        let tdv = self.tdv.local_state();

        let tile_section_width = TILE_WIDTH.min(self.grid_width - self.grid_c_offset);
        let tile_section_height = TILE_HEIGHT.min(self.grid_height - self.grid_r_offset);
        let input_section_width = tile_section_width + 2 * halo_radius;
        let input_section_height = tile_section_height + 2 * halo_radius;
        let n_cycles = input_section_width * input_section_height;

        // Line buffer: [parity][row][bank][column]. Rows are sized for a
        // full (unclipped) tile; banks at the next power of two above the
        // stage count.
        let input_tile_height = TILE_HEIGHT + 2 * halo_radius;
        let n_banks = PIPELINE_DEPTH.next_power_of_two();
        let cache_stride = n_banks * (diameter - 1);
        let mut cache = vec![self.halo; 2 * input_tile_height * cache_stride];
        let cache_index = |parity: usize, row: usize, stage: usize, column: usize| {
            (parity * input_tile_height + row) * cache_stride + stage * (diameter - 1) + column
        };

        // Per-stage shift-register stencil buffers, column-major.
        let patch_len = diameter * diameter;
        let mut stencil_buffer = vec![self.halo; PIPELINE_DEPTH * patch_len];

        let mut input_tile_c: usize = 0;
        let mut input_tile_r: usize = 0;

        for _ in 0..n_cycles {
            let mut carry = input.recv().unwrap_or(self.halo);

            for stage in 0..PIPELINE_DEPTH {
                let base = stage * patch_len;

                // Shift every stencil column up by one row; the bottom row
                // is refilled below.
                for c in 0..diameter {
                    for r in 0..diameter - 1 {
                        stencil_buffer[base + c * diameter + r] =
                            stencil_buffer[base + c * diameter + r + 1];
                    }
                }

                // The stage's view lags the input counters by one stencil
                // row per upstream stage plus its own warm-up.
                let lag = (diameter - 1) as i64
                    + (PIPELINE_DEPTH as i64 + stage as i64 - 2) * radius as i64;
                let rel_input_c = input_tile_c as i64 - lag;
                let rel_input_r = input_tile_r as i64 - lag;
                let input_grid_c = self.grid_c_offset as i64 + rel_input_c;
                let input_grid_r = self.grid_r_offset as i64 + rel_input_r;

                // Refill the bottom row from the line buffer and the newly
                // carried cell, and retire the row into the other parity.
                let parity = input_tile_c & 1;
                for cache_c in 0..diameter {
                    let new_value = if cache_c == diameter - 1 {
                        let is_halo = (self.grid_c_offset == 0 && rel_input_c < 0)
                            || (self.grid_r_offset == 0 && rel_input_r < 0)
                            || input_grid_c >= self.grid_width as i64
                            || input_grid_r >= self.grid_height as i64;
                        if is_halo { self.halo } else { carry }
                    } else {
                        cache[cache_index(parity, input_tile_r, stage, cache_c)]
                    };

                    stencil_buffer[base + cache_c * diameter + (diameter - 1)] = new_value;
                    if cache_c > 0 {
                        cache[cache_index(1 - parity, input_tile_r, stage, cache_c - 1)] =
                            new_value;
                    }
                }

                let rel_iteration = stage / F::N_SUBITERATIONS;
                let stage_iteration = self.i_iteration + rel_iteration as u64;
                let stage_subiteration = (stage % F::N_SUBITERATIONS) as u64;

                carry = if stage_iteration < self.target_i_iteration {
                    let output_grid_c = input_grid_c - radius as i64;
                    let output_grid_r = input_grid_r - radius as i64;
                    let stencil = Stencil::new(
                        CellId::new(output_grid_c, output_grid_r),
                        Extent::new(self.grid_width, self.grid_height),
                        stage_iteration,
                        stage_subiteration,
                        tdv.value(rel_iteration),
                        radius,
                        &stencil_buffer[base..base + patch_len],
                    );
                    self.func.apply(&stencil)
                } else {
                    stencil_buffer[base + radius * diameter + radius]
                };
            }

            let warm_up = (diameter - 1) * PIPELINE_DEPTH;
            if input_tile_c >= warm_up && input_tile_r >= warm_up && output.send(carry).is_err() {
                return;
            }

            if input_tile_r == input_section_height - 1 {
                input_tile_r = 0;
                input_tile_c += 1;
            } else {
                input_tile_r += 1;
            }
        }
    }
}
