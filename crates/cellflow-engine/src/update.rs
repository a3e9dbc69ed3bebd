//! The update driver: multi-iteration scheduling of the pipelined kernel.
//!
//! [`StencilUpdate`] advances a whole grid by a requested number of
//! iterations. Each **pass** streams every tile of the grid through a
//! [`PipelineKernel`](crate::PipelineKernel), advancing the grid by
//! `PIPELINE_DEPTH / N_SUBITERATIONS` iterations per pass; two scratch
//! grids are ping-ponged between passes so the caller's source grid is
//! never written.
//!
//! # Scheduling
//!
//! Per pass, the driver submits one read task, one kernel task and one
//! write task per tile to three in-order queues, then moves on; only the
//! final synchronization (when [`UpdateParams::blocking`] is set) waits.
//! Within a tile, ordering is enforced by the stream dataflow; across
//! passes, an event barrier makes every read of pass `k + 1` wait for all
//! writes of pass `k`.
//!
//! # Example
//!
//! ```
//! use cellflow_core::{CellBuffer, Stencil, TransitionFunction};
//! use cellflow_engine::{StencilUpdate, UpdateParams};
//! use cellflow_grid::TiledGrid;
//!
//! #[derive(Clone)]
//! struct Increment;
//!
//! impl TransitionFunction for Increment {
//!     type Cell = u64;
//!     type TimeDependentValue = ();
//!     const STENCIL_RADIUS: usize = 1;
//!
//!     fn apply(&self, stencil: &Stencil<'_, u64, ()>) -> u64 {
//!         stencil.center() + 1
//!     }
//!
//!     fn time_dependent_value(&self, _i_iteration: u64) {}
//! }
//!
//! let source = TiledGrid::<u64, 32, 32, 4>::from_buffer(
//!     &CellBuffer::new(16, 16),
//! ).unwrap();
//!
//! let mut params = UpdateParams::new(Increment);
//! params.n_iterations = 10;
//! let mut update = StencilUpdate::<Increment, 4, 32, 32, 4>::new(params).unwrap();
//!
//! let result = update.update(&source).unwrap();
//! assert_eq!(result.cell(7, 7), 10);
//! ```

use std::time::{Duration, Instant};

use cellflow_core::{validate, Error, Result, TransitionFunction};
use cellflow_grid::TiledGrid;
use cellflow_runtime::{stream, Device, Event, Queue};
use tracing::{debug, trace};

use crate::kernel::PipelineKernel;
use crate::tdv::{TdvGlobalState, TdvStrategy};

/// Configuration for an update driver.
///
/// The struct is plain data; mutate it between `update` calls through
/// [`StencilUpdate::params_mut`] to resume a simulation with a different
/// iteration window.
#[derive(Clone)]
pub struct UpdateParams<F: TransitionFunction> {
    /// The transition-function instance. Runtime parameters of the stencil
    /// code live here.
    pub transition_function: F,
    /// The cell value presented for positions outside the grid.
    pub halo_value: F::Cell,
    /// Added to every iteration index, so a simulation can resume where a
    /// previous update left off.
    pub iteration_offset: u64,
    /// The number of iterations to compute.
    pub n_iterations: u64,
    /// The device that runs the read/update/write tasks.
    pub device: Device,
    /// Whether `update` waits for completion before returning.
    ///
    /// Defaults to `true`: grid accessors do not synchronize with pending
    /// tasks, so with `blocking = false` the returned grid must not be
    /// inspected before [`StencilUpdate::synchronize`] (or the next
    /// `update` call, or dropping the updater) has drained the work.
    pub blocking: bool,
    /// Whether to record per-kernel runtimes, retrievable through
    /// [`StencilUpdate::kernel_runtime`].
    pub profiling: bool,
    /// How time-dependent values are delivered to the kernel. All
    /// strategies produce bit-identical results.
    pub tdv_strategy: TdvStrategy,
}

impl<F: TransitionFunction> std::fmt::Debug for UpdateParams<F>
where
    F: std::fmt::Debug,
    F::Cell: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateParams")
            .field("transition_function", &self.transition_function)
            .field("halo_value", &self.halo_value)
            .field("iteration_offset", &self.iteration_offset)
            .field("n_iterations", &self.n_iterations)
            .field("device", &self.device)
            .field("blocking", &self.blocking)
            .field("profiling", &self.profiling)
            .field("tdv_strategy", &self.tdv_strategy)
            .finish()
    }
}

impl<F: TransitionFunction> UpdateParams<F> {
    /// Creates parameters with the given transition function and defaults:
    /// default halo cell, no iteration offset, one iteration, CPU device,
    /// blocking, no profiling, inline TDV.
    pub fn new(transition_function: F) -> Self {
        Self {
            transition_function,
            halo_value: F::Cell::default(),
            iteration_offset: 0,
            n_iterations: 1,
            device: Device::cpu(),
            blocking: true,
            profiling: false,
            tdv_strategy: TdvStrategy::default(),
        }
    }
}

/// A grid updater that applies an iterative stencil code to tiled grids.
///
/// The const parameters fix the engine geometry: `PIPELINE_DEPTH` stages
/// per pass over `TILE_WIDTH x TILE_HEIGHT` tiles, with `HALO_RADIUS ==
/// F::STENCIL_RADIUS * PIPELINE_DEPTH` (validated at construction, since
/// the grid type carries the halo radius separately).
pub struct StencilUpdate<
    F: TransitionFunction,
    const PIPELINE_DEPTH: usize,
    const TILE_WIDTH: usize,
    const TILE_HEIGHT: usize,
    const HALO_RADIUS: usize,
> {
    params: UpdateParams<F>,
    n_processed_cells: u64,
    walltime: Duration,
    work_events: Vec<Event>,
    parked_queues: Vec<Queue>,
}

impl<
        F: TransitionFunction,
        const PIPELINE_DEPTH: usize,
        const TILE_WIDTH: usize,
        const TILE_HEIGHT: usize,
        const HALO_RADIUS: usize,
    > std::fmt::Debug for StencilUpdate<F, PIPELINE_DEPTH, TILE_WIDTH, TILE_HEIGHT, HALO_RADIUS>
where
    F: std::fmt::Debug,
    F::Cell: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StencilUpdate")
            .field("params", &self.params)
            .field("n_processed_cells", &self.n_processed_cells)
            .field("walltime", &self.walltime)
            .field("work_events", &self.work_events)
            .field("parked_queues", &self.parked_queues)
            .finish()
    }
}

impl<
        F: TransitionFunction,
        const PIPELINE_DEPTH: usize,
        const TILE_WIDTH: usize,
        const TILE_HEIGHT: usize,
        const HALO_RADIUS: usize,
    > StencilUpdate<F, PIPELINE_DEPTH, TILE_WIDTH, TILE_HEIGHT, HALO_RADIUS>
{
    /// Creates a new updater.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the transition function's
    /// constants are invalid, `PIPELINE_DEPTH` is zero or not a multiple
    /// of `N_SUBITERATIONS`, `HALO_RADIUS` does not equal
    /// `STENCIL_RADIUS * PIPELINE_DEPTH`, or the tile is not strictly
    /// larger than twice the halo radius.
    pub fn new(params: UpdateParams<F>) -> Result<Self> {
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
        if HALO_RADIUS != F::STENCIL_RADIUS * PIPELINE_DEPTH {
            return Err(Error::invalid_config(format!(
                "grid halo radius {} does not match stencil radius {} x pipeline depth {}",
                HALO_RADIUS,
                F::STENCIL_RADIUS,
                PIPELINE_DEPTH
            )));
        }
        if TILE_WIDTH <= 2 * HALO_RADIUS || TILE_HEIGHT <= 2 * HALO_RADIUS {
            return Err(Error::invalid_config(format!(
                "tile {}x{} is too small for halo radius {}",
                TILE_WIDTH, TILE_HEIGHT, HALO_RADIUS
            )));
        }
        Ok(Self {
            params,
            n_processed_cells: 0,
            walltime: Duration::ZERO,
            work_events: Vec::new(),
            parked_queues: Vec::new(),
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
    /// The computation is not in place: two scratch grids of the source's
    /// dimensions are allocated and ping-ponged, and the final one is
    /// returned. The source grid is never written. With
    /// `n_iterations == 0` a handle sharing the source's storage is
    /// returned.
    ///
    /// # Errors
    ///
    /// Propagates tile submission errors; the scratch grids are discarded
    /// on the failure path.
    pub fn update(
        &mut self,
        source: &TiledGrid<F::Cell, TILE_WIDTH, TILE_HEIGHT, HALO_RADIUS>,
    ) -> Result<TiledGrid<F::Cell, TILE_WIDTH, TILE_HEIGHT, HALO_RADIUS>> {
        // Any work still running from a previous non-blocking call must
        // settle before its output may be read as this call's source.
        self.synchronize();

        if self.params.n_iterations == 0 {
            return Ok(source.clone());
        }

        let halo = self.params.halo_value;
        let profiling = self.params.profiling;
        let blocking = self.params.blocking;
        let iteration_offset = self.params.iteration_offset;
        let n_iterations = self.params.n_iterations;
        let func = self.params.transition_function.clone();

        let walltime_start = Instant::now();

        let input_queue = self.params.device.create_queue();
        let work_queue = self.params.device.create_queue();
        let output_queue = self.params.device.create_queue();

        let swap_grid_a = source.make_similar();
        let swap_grid_b = source.make_similar();
        let mut pass_source: &TiledGrid<F::Cell, TILE_WIDTH, TILE_HEIGHT, HALO_RADIUS> = source;
        let mut pass_target: &TiledGrid<F::Cell, TILE_WIDTH, TILE_HEIGHT, HALO_RADIUS> =
            &swap_grid_b;

        let tile_range = source.tile_range();
        let grid_width = source.width();
        let grid_height = source.height();
        let iters_per_pass = (PIPELINE_DEPTH / F::N_SUBITERATIONS) as u64;
        let target_n_iterations = iteration_offset + n_iterations;

        let tdv_global_state = TdvGlobalState::new(
            self.params.tdv_strategy,
            func.clone(),
            iteration_offset,
            n_iterations,
        );

        let mut pass_events: Vec<Event> = Vec::new();
        let mut pass_work_events: Vec<Event> = Vec::new();

        let mut i = iteration_offset;
        while i < target_n_iterations {
            let iters_this_pass = iters_per_pass.min(target_n_iterations - i);
            debug!(
                i_iteration = i,
                iters_this_pass,
                tiles = tile_range.cell_count(),
                "submitting update pass"
            );

            // Barrier: reads of this pass wait for all writes of the
            // previous pass before touching the swapped buffer.
            if !pass_events.is_empty() {
                input_queue.submit_after(&pass_events, || {});
                pass_events.clear();
            }

            let (in_tx, in_rx) = stream::channel();
            let (out_tx, out_rx) = stream::channel();
            let tdv_argument = tdv_global_state.kernel_argument(i, iters_this_pass as usize);

            for tile_c in 0..tile_range.c {
                for tile_r in 0..tile_range.r {
                    trace!(tile_c, tile_r, "submitting tile");
                    pass_source.submit_read(&input_queue, tile_c, tile_r, halo, in_tx.clone())?;

                    let kernel = PipelineKernel::<F, PIPELINE_DEPTH, TILE_WIDTH, TILE_HEIGHT>::with_tdv(
                        func.clone(),
                        i,
                        target_n_iterations,
                        tile_c * TILE_WIDTH,
                        tile_r * TILE_HEIGHT,
                        grid_width,
                        grid_height,
                        halo,
                        tdv_argument.clone(),
                    );
                    let kernel_input = in_rx.clone();
                    let kernel_output = out_tx.clone();
                    let work_event =
                        work_queue.submit(move || kernel.run(&kernel_input, &kernel_output));
                    if profiling {
                        pass_work_events.push(work_event);
                    }

                    let write_event =
                        pass_target.submit_write(&output_queue, tile_c, tile_r, out_rx.clone())?;
                    pass_events.push(write_event);
                }
            }

            // The first pass reads the caller's grid; afterwards the two
            // scratch grids alternate so the source is never written.
            if i == iteration_offset {
                pass_source = &swap_grid_b;
                pass_target = &swap_grid_a;
            } else {
                std::mem::swap(&mut pass_source, &mut pass_target);
            }

            i += iters_per_pass;
        }

        let result = pass_source.clone();

        if blocking {
            output_queue.wait();
        } else {
            self.parked_queues
                .extend([input_queue, work_queue, output_queue]);
        }

        self.work_events.append(&mut pass_work_events);
        self.walltime += walltime_start.elapsed();
        self.n_processed_cells += n_iterations * (grid_width as u64) * (grid_height as u64);

        Ok(result)
    }

    /// Waits for all tasks of previous non-blocking updates to finish.
    pub fn synchronize(&mut self) {
        // Dropping a queue drains it and joins its worker.
        self.parked_queues.clear();
    }

    /// Returns the accumulated total number of cells processed by this
    /// updater: grid area times iterations, summed over all `update`
    /// calls.
    pub fn n_processed_cells(&self) -> u64 {
        self.n_processed_cells
    }

    /// Returns the accumulated host-side runtime of all `update` calls:
    /// submission time, plus completion time for blocking calls.
    pub fn walltime(&self) -> Duration {
        self.walltime
    }

    /// Returns the accumulated execution time of all kernel tasks.
    ///
    /// Only populated when [`UpdateParams::profiling`] is set; kernels
    /// still in flight contribute nothing until they finish.
    pub fn kernel_runtime(&self) -> Duration {
        self.work_events.iter().filter_map(Event::duration).sum()
    }
}
