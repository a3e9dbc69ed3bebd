//! Shared fixtures for the cellflow integration tests.
//!
//! This crate collects the transition functions the test suites are built
//! on, from trivial (identity, counter) to self-validating (the
//! [`Tracer`], whose cells carry their own coordinates and iteration
//! indices so the function can check everything the engine promised about
//! its neighborhood), plus helpers for driving both update backends from
//! plain cell buffers.

use cellflow_core::{CellBuffer, Stencil, TransitionFunction};
use cellflow_engine::{DirectStencilUpdate, StencilUpdate, UpdateParams};
use cellflow_grid::{Grid, TiledGrid};

/// Passes the center cell through unchanged.
#[derive(Clone)]
pub struct Identity;

impl TransitionFunction for Identity {
    type Cell = u64;
    type TimeDependentValue = ();
    const STENCIL_RADIUS: usize = 1;

    fn apply(&self, stencil: &Stencil<'_, u64, ()>) -> u64 {
        stencil.center()
    }

    fn time_dependent_value(&self, _i_iteration: u64) {}
}

/// Increments the center cell by one per iteration.
#[derive(Clone)]
pub struct Counter;

impl TransitionFunction for Counter {
    type Cell = u64;
    type TimeDependentValue = ();
    const STENCIL_RADIUS: usize = 1;

    fn apply(&self, stencil: &Stencil<'_, u64, ()>) -> u64 {
        stencil.center() + 1
    }

    fn time_dependent_value(&self, _i_iteration: u64) {}
}

/// Sums the nine neighborhood cells.
#[derive(Clone)]
pub struct NeighborSum;

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

/// Conway's Game of Life.
#[derive(Clone)]
pub struct Life;

impl TransitionFunction for Life {
    type Cell = bool;
    type TimeDependentValue = ();
    const STENCIL_RADIUS: usize = 1;

    fn apply(&self, stencil: &Stencil<'_, bool, ()>) -> bool {
        let mut alive = 0;
        for dc in -1..=1 {
            for dr in -1..=1 {
                if (dc, dr) != (0, 0) && stencil.rel(dc, dr) {
                    alive += 1;
                }
            }
        }
        alive == 3 || (stencil.center() && alive == 2)
    }

    fn time_dependent_value(&self, _i_iteration: u64) {}
}

/// Writes the invocation's iteration index into every cell.
#[derive(Clone)]
pub struct IterationRecorder;

impl TransitionFunction for IterationRecorder {
    type Cell = u64;
    type TimeDependentValue = ();
    const STENCIL_RADIUS: usize = 1;

    fn apply(&self, stencil: &Stencil<'_, u64, ()>) -> u64 {
        stencil.iteration
    }

    fn time_dependent_value(&self, _i_iteration: u64) {}
}

/// Adds the time-dependent value (`tdv(i) = i`) to the center cell.
#[derive(Clone)]
pub struct TdvSum;

impl TransitionFunction for TdvSum {
    type Cell = u64;
    type TimeDependentValue = u64;
    const STENCIL_RADIUS: usize = 1;

    fn apply(&self, stencil: &Stencil<'_, u64, u64>) -> u64 {
        stencil.center() + stencil.time_dependent_value
    }

    fn time_dependent_value(&self, i_iteration: u64) -> u64 {
        i_iteration
    }
}

/// A spatial function with a configurable sub-iteration count: the first
/// sub-step sums the four cross neighbors plus the center, every further
/// sub-step increments, so fused ordering and sub-step mix-ups show up in
/// the result.
#[derive(Clone)]
pub struct CrossSum<const NSUB: usize>;

impl<const NSUB: usize> TransitionFunction for CrossSum<NSUB> {
    type Cell = u64;
    type TimeDependentValue = ();
    const STENCIL_RADIUS: usize = 1;
    const N_SUBITERATIONS: usize = NSUB;

    fn apply(&self, stencil: &Stencil<'_, u64, ()>) -> u64 {
        if stencil.subiteration == 0 {
            stencil.center()
                + stencil.rel(-1, 0)
                + stencil.rel(1, 0)
                + stencil.rel(0, -1)
                + stencil.rel(0, 1)
        } else {
            stencil.center() + 1
        }
    }

    fn time_dependent_value(&self, _i_iteration: u64) {}
}

/// Averages the cross neighborhood; a float stencil in the mold of a heat
/// diffusion step.
#[derive(Clone)]
pub struct HeatSpread;

impl TransitionFunction for HeatSpread {
    type Cell = f32;
    type TimeDependentValue = ();
    const STENCIL_RADIUS: usize = 1;

    fn apply(&self, stencil: &Stencil<'_, f32, ()>) -> f32 {
        let neighbors = stencil.rel(-1, 0) + stencil.rel(1, 0) + stencil.rel(0, -1)
            + stencil.rel(0, 1);
        0.5 * stencil.center() + 0.125 * neighbors
    }

    fn time_dependent_value(&self, _i_iteration: u64) {}
}

/// The life-cycle state a [`TracerCell`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracerStatus {
    /// The cell and everything it has seen were consistent.
    #[default]
    Normal,
    /// The cell observed an inconsistent neighborhood.
    Invalid,
    /// The cell stands in for a position outside the grid.
    Halo,
}

/// A self-describing cell: it records where it is and how far it has been
/// advanced, so [`Tracer`] can verify every promise the engine makes
/// about a neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TracerCell {
    /// Column of this cell in the grid.
    pub c: i64,
    /// Row of this cell in the grid.
    pub r: i64,
    /// The iteration this cell has been advanced to.
    pub i_iteration: u64,
    /// The sub-iteration this cell has been advanced to.
    pub i_subiteration: u64,
    /// Consistency verdict accumulated so far.
    pub status: TracerStatus,
}

impl TracerCell {
    /// The cell value used for positions outside the grid.
    pub fn halo() -> Self {
        Self {
            status: TracerStatus::Halo,
            ..Self::default()
        }
    }

    /// The initial cell for position `(c, r)` at iteration
    /// `iteration_offset`.
    pub fn start(c: usize, r: usize, iteration_offset: u64) -> Self {
        Self {
            c: c as i64,
            r: r as i64,
            i_iteration: iteration_offset,
            i_subiteration: 0,
            status: TracerStatus::Normal,
        }
    }
}

/// A transition function that checks, for every invocation, that each
/// neighborhood cell is exactly what the engine contract says it must be:
/// in-grid neighbors carry their own coordinates and the invocation's
/// iteration indices, out-of-grid neighbors equal the halo cell, and the
/// time-dependent value equals the iteration index. Violations are
/// recorded in the output cell's status rather than asserted, because the
/// pipeline legitimately invokes the function on warm-up garbage whose
/// output never becomes visible.
///
/// Two sub-iterations per iteration, radius configurable.
#[derive(Clone)]
pub struct Tracer<const RADIUS: usize>;

impl<const RADIUS: usize> TransitionFunction for Tracer<RADIUS> {
    type Cell = TracerCell;
    type TimeDependentValue = u64;
    const STENCIL_RADIUS: usize = RADIUS;
    const N_SUBITERATIONS: usize = 2;

    fn apply(&self, stencil: &Stencil<'_, TracerCell, u64>) -> TracerCell {
        let mut new_cell = stencil.center();
        let radius = RADIUS as i64;

        let mut is_valid = true;
        for dc in -radius..=radius {
            for dr in -radius..=radius {
                let old_cell = stencil.rel(dc, dr);
                let cell_c = stencil.id.c + dc;
                let cell_r = stencil.id.r + dr;
                let in_grid = cell_c >= 0
                    && cell_r >= 0
                    && cell_c < stencil.grid_range.c as i64
                    && cell_r < stencil.grid_range.r as i64;
                if in_grid {
                    is_valid &= old_cell.c == cell_c;
                    is_valid &= old_cell.r == cell_r;
                    is_valid &= old_cell.i_iteration == stencil.iteration;
                    is_valid &= old_cell.i_subiteration == stencil.subiteration;
                    is_valid &= old_cell.status == TracerStatus::Normal;
                } else {
                    is_valid &= old_cell == TracerCell::halo();
                }
            }
        }
        is_valid &= stencil.time_dependent_value == stencil.iteration;

        new_cell.status = if is_valid {
            TracerStatus::Normal
        } else {
            TracerStatus::Invalid
        };
        if new_cell.i_subiteration == Self::N_SUBITERATIONS as u64 - 1 {
            new_cell.i_iteration += 1;
            new_cell.i_subiteration = 0;
        } else {
            new_cell.i_subiteration += 1;
        }
        new_cell
    }

    fn time_dependent_value(&self, i_iteration: u64) -> u64 {
        i_iteration
    }
}

/// Builds the initial grid buffer for a [`Tracer`] run.
pub fn tracer_buffer(width: usize, height: usize, iteration_offset: u64) -> CellBuffer<TracerCell> {
    CellBuffer::from_fn(width, height, |c, r| TracerCell::start(c, r, iteration_offset))
}

/// Builds a Life buffer with the given cells alive.
pub fn life_buffer(width: usize, height: usize, alive: &[(usize, usize)]) -> CellBuffer<bool> {
    let mut buffer = CellBuffer::new(width, height);
    for &(c, r) in alive {
        buffer.set_cell(c, r, true);
    }
    buffer
}

/// A small deterministic generator for pseudo-random test grids.
pub fn ramp_cell(c: usize, r: usize, seed: u64) -> u64 {
    let mut x = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add((c as u64) << 32 | r as u64);
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51afd7ed558ccd);
    x ^= x >> 33;
    x
}

/// Runs the pipelined engine over a buffer and returns the result buffer.
pub fn run_tiled<
    F: TransitionFunction,
    const P: usize,
    const TW: usize,
    const TH: usize,
    const HR: usize,
>(
    params: UpdateParams<F>,
    input: &CellBuffer<F::Cell>,
) -> CellBuffer<F::Cell> {
    let source = TiledGrid::<F::Cell, TW, TH, HR>::from_buffer(input).unwrap();
    let mut update = StencilUpdate::<F, P, TW, TH, HR>::new(params).unwrap();
    let result = update.update(&source).unwrap();
    let mut output = CellBuffer::new(input.width(), input.height());
    result.copy_to_buffer(&mut output).unwrap();
    output
}

/// Runs the direct backend over a buffer and returns the result buffer.
pub fn run_direct<F: TransitionFunction>(
    params: UpdateParams<F>,
    input: &CellBuffer<F::Cell>,
) -> CellBuffer<F::Cell> {
    let source = Grid::from_buffer(input).unwrap();
    let mut update = DirectStencilUpdate::new(params).unwrap();
    let result = update.update(&source).unwrap();
    let mut output = CellBuffer::new(input.width(), input.height());
    result.copy_to_buffer(&mut output).unwrap();
    output
}
