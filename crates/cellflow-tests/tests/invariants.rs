//! Universal invariants of the update engine: properties that must hold
//! for any transition function and any grid.

use cellflow_core::{CellBuffer, Stencil, TransitionFunction};
use cellflow_engine::{StencilUpdate, UpdateParams};
use cellflow_grid::{Grid, TiledGrid};
use cellflow_tests::{ramp_cell, run_direct, run_tiled, Identity, Life, NeighborSum, TdvSum};

#[test]
fn identity_function_preserves_any_grid() {
    let input = CellBuffer::from_fn(20, 13, |c, r| ramp_cell(c, r, 1));
    let mut params = UpdateParams::new(Identity);
    params.iteration_offset = 7;
    params.n_iterations = 5;
    let output = run_tiled::<Identity, 2, 16, 16, 2>(params, &input);
    assert_eq!(output, input);
}

#[test]
fn iteration_counts_compose() {
    // n_iterations = a + b in one call must equal a then b with the
    // offset advanced, bit for bit. TdvSum is offset-sensitive, so a
    // mishandled offset shows up immediately.
    let input = CellBuffer::from_fn(20, 20, |c, r| ramp_cell(c, r, 2) % 97);
    let (a, b) = (3u64, 5u64);

    let mut params = UpdateParams::new(TdvSum);
    params.n_iterations = a + b;
    let whole = run_tiled::<TdvSum, 4, 16, 16, 4>(params, &input);

    let mut params = UpdateParams::new(TdvSum);
    params.n_iterations = a;
    let first = run_tiled::<TdvSum, 4, 16, 16, 4>(params, &input);
    let mut params = UpdateParams::new(TdvSum);
    params.iteration_offset = a;
    params.n_iterations = b;
    let second = run_tiled::<TdvSum, 4, 16, 16, 4>(params, &first);

    assert_eq!(whole, second);
}

#[test]
fn iteration_counts_compose_spatially() {
    let input = CellBuffer::from_fn(24, 17, |c, r| ramp_cell(c, r, 3) % 7);
    let (a, b) = (2u64, 6u64);

    let mut params = UpdateParams::new(NeighborSum);
    params.n_iterations = a + b;
    let whole = run_tiled::<NeighborSum, 4, 16, 16, 4>(params, &input);

    let mut params = UpdateParams::new(NeighborSum);
    params.n_iterations = a;
    let first = run_tiled::<NeighborSum, 4, 16, 16, 4>(params, &input);
    let mut params = UpdateParams::new(NeighborSum);
    params.iteration_offset = a;
    params.n_iterations = b;
    let second = run_tiled::<NeighborSum, 4, 16, 16, 4>(params, &first);

    assert_eq!(whole, second);
}

#[test]
fn source_grid_is_never_written() {
    let input = CellBuffer::from_fn(20, 20, |c, r| ramp_cell(c, r, 4) % 2 == 0);
    let source = TiledGrid::<bool, 16, 16, 4>::from_buffer(&input).unwrap();

    let mut params = UpdateParams::new(Life);
    params.n_iterations = 9;
    let mut update = StencilUpdate::<Life, 4, 16, 16, 4>::new(params).unwrap();
    let _ = update.update(&source).unwrap();

    let mut readback = CellBuffer::new(20, 20);
    source.copy_to_buffer(&mut readback).unwrap();
    assert_eq!(readback, input);
}

#[test]
fn buffer_roundtrip_is_lossless() {
    let input = CellBuffer::from_fn(19, 11, |c, r| ramp_cell(c, r, 5));

    let grid = Grid::from_buffer(&input).unwrap();
    let mut readback = CellBuffer::new(19, 11);
    grid.copy_to_buffer(&mut readback).unwrap();
    assert_eq!(readback, input);

    let tiled = TiledGrid::<u64, 16, 16, 2>::from_buffer(&input).unwrap();
    let mut readback = CellBuffer::new(19, 11);
    tiled.copy_to_buffer(&mut readback).unwrap();
    assert_eq!(readback, input);
}

/// A cell that records whether its neighborhood contained the halo cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Probe {
    is_halo: bool,
    saw_halo: bool,
}

#[derive(Clone)]
struct HaloProbe;

impl TransitionFunction for HaloProbe {
    type Cell = Probe;
    type TimeDependentValue = ();
    const STENCIL_RADIUS: usize = 1;

    fn apply(&self, stencil: &Stencil<'_, Probe, ()>) -> Probe {
        let mut saw_halo = false;
        for dc in -1..=1 {
            for dr in -1..=1 {
                saw_halo |= stencil.rel(dc, dr).is_halo;
            }
        }
        Probe {
            is_halo: false,
            saw_halo,
        }
    }

    fn time_dependent_value(&self, _i_iteration: u64) {}
}

#[test]
fn only_border_cells_see_the_halo() {
    let (width, height) = (10, 7);
    let input = CellBuffer::filled(width, height, Probe::default());
    let halo = Probe {
        is_halo: true,
        saw_halo: false,
    };

    let mut params = UpdateParams::new(HaloProbe);
    params.halo_value = halo;
    params.n_iterations = 1;
    let tiled = run_tiled::<HaloProbe, 1, 16, 16, 1>(params.clone(), &input);
    let direct = run_direct(params, &input);
    assert_eq!(tiled, direct);

    for (c, r, cell) in tiled.cells() {
        let on_border = c == 0 || r == 0 || c == width - 1 || r == height - 1;
        assert_eq!(cell.saw_halo, on_border, "at ({}, {})", c, r);
    }
}

#[test]
fn tiles_are_independent() {
    // Two grids that agree on tile (0, 0) plus its halo region must
    // produce identical cells for that tile after one pass, no matter how
    // the rest of the grid differs.
    const HALO: usize = 2;
    let base = CellBuffer::from_fn(24, 24, |c, r| ramp_cell(c, r, 6) % 11);
    let mut tampered = base.clone();
    for (c, r, cell) in base.cells() {
        if c >= 16 + HALO || r >= 16 + HALO {
            tampered.set_cell(c, r, cell + 1000);
        }
    }

    // Depth 2 at radius 1: one pass, two fused iterations.
    let mut params = UpdateParams::new(NeighborSum);
    params.n_iterations = 2;
    let out_base = run_tiled::<NeighborSum, 2, 16, 16, 2>(params.clone(), &base);
    let out_tampered = run_tiled::<NeighborSum, 2, 16, 16, 2>(params, &tampered);

    for c in 0..16 {
        for r in 0..16 {
            assert_eq!(
                out_base.cell(c, r),
                out_tampered.cell(c, r),
                "at ({}, {})",
                c,
                r
            );
        }
    }
}
