//! The pipelined engine against the direct per-cell oracle, across grid
//! shapes, pipeline depths and sub-iteration counts.

use approx::assert_relative_eq;
use cellflow_core::CellBuffer;
use cellflow_engine::UpdateParams;
use cellflow_tests::{
    ramp_cell, run_direct, run_tiled, tracer_buffer, Counter, CrossSum, HeatSpread, Life, Tracer,
    TracerStatus,
};

#[test]
fn life_matches_direct_across_grid_shapes() {
    for (width, height) in [
        (1, 1),
        (1, 5),
        (5, 1),
        (3, 3),
        (7, 7),
        (16, 16),
        (17, 5),
        (33, 9),
    ] {
        let input = CellBuffer::from_fn(width, height, |c, r| ramp_cell(c, r, 11) % 2 == 0);
        for n_iterations in [1, 2, 5] {
            let mut params = UpdateParams::new(Life);
            params.n_iterations = n_iterations;
            let tiled = run_tiled::<Life, 4, 16, 16, 4>(params.clone(), &input);
            let direct = run_direct(params, &input);
            assert_eq!(
                tiled, direct,
                "{}x{} grid, {} iterations",
                width, height, n_iterations
            );
        }
    }
}

#[test]
fn depth_and_subiteration_combinations_match_direct() {
    let input = CellBuffer::from_fn(21, 13, |c, r| ramp_cell(c, r, 12) % 17);

    fn check<F, const P: usize>(func: F, input: &CellBuffer<u64>)
    where
        F: cellflow_core::TransitionFunction<Cell = u64>,
    {
        for n_iterations in [1, 2, 3] {
            let mut params = UpdateParams::new(func.clone());
            params.n_iterations = n_iterations;
            let tiled = run_tiled::<F, P, 16, 16, P>(params.clone(), input);
            let direct = run_direct(params, input);
            assert_eq!(
                tiled, direct,
                "depth {}, {} sub-iterations, {} iterations",
                P,
                F::N_SUBITERATIONS,
                n_iterations
            );
        }
    }

    check::<CrossSum<1>, 1>(CrossSum, &input);
    check::<CrossSum<1>, 4>(CrossSum, &input);
    check::<CrossSum<2>, 2>(CrossSum, &input);
    check::<CrossSum<2>, 4>(CrossSum, &input);
    check::<CrossSum<3>, 3>(CrossSum, &input);
    check::<CrossSum<3>, 6>(CrossSum, &input);
}

#[test]
fn update_terminates_with_correct_dimensions() {
    for width in 1..=8 {
        for height in 1..=8 {
            let input = CellBuffer::filled(width, height, 0u64);
            let mut params = UpdateParams::new(Counter);
            params.n_iterations = 4;
            let output = run_tiled::<Counter, 4, 16, 16, 4>(params, &input);
            assert_eq!(output.extent(), input.extent());
            for (_, _, cell) in output.cells() {
                assert_eq!(cell, 4, "{}x{} grid", width, height);
            }
        }
    }
    for (width, height) in [(15, 33), (16, 32), (17, 31), (40, 3)] {
        let input = CellBuffer::filled(width, height, 0u64);
        let mut params = UpdateParams::new(Counter);
        params.n_iterations = 3;
        let output = run_tiled::<Counter, 4, 16, 16, 4>(params, &input);
        assert_eq!(output.extent(), input.extent());
        for (_, _, cell) in output.cells() {
            assert_eq!(cell, 3, "{}x{} grid", width, height);
        }
    }
}

#[test]
fn tracer_validates_every_neighborhood() {
    // Cells carry their own position and iteration indices; the tracer
    // flags any neighborhood the engine assembled incorrectly. 40x24 with
    // 16x16 tiles exercises interior, edge and corner tiles; three
    // iterations at two iterations per pass exercise a partial pass.
    let iteration_offset = 5;
    let input = tracer_buffer(40, 24, iteration_offset);
    let mut params = UpdateParams::new(Tracer::<1>);
    params.halo_value = cellflow_tests::TracerCell::halo();
    params.iteration_offset = iteration_offset;
    params.n_iterations = 3;
    let output = run_tiled::<Tracer<1>, 4, 16, 16, 4>(params, &input);

    for (c, r, cell) in output.cells() {
        assert_eq!(cell.status, TracerStatus::Normal, "at ({}, {})", c, r);
        assert_eq!(cell.c, c as i64);
        assert_eq!(cell.r, r as i64);
        assert_eq!(cell.i_iteration, iteration_offset + 3);
        assert_eq!(cell.i_subiteration, 0);
    }
}

#[test]
fn tracer_validates_radius_two() {
    let input = tracer_buffer(20, 20, 0);
    let mut params = UpdateParams::new(Tracer::<2>);
    params.halo_value = cellflow_tests::TracerCell::halo();
    params.n_iterations = 2;
    let output = run_tiled::<Tracer<2>, 2, 16, 16, 4>(params, &input);

    for (c, r, cell) in output.cells() {
        assert_eq!(cell.status, TracerStatus::Normal, "at ({}, {})", c, r);
        assert_eq!(cell.i_iteration, 2);
    }
}

#[test]
fn float_stencil_matches_direct() {
    let input = CellBuffer::from_fn(18, 12, |c, r| (ramp_cell(c, r, 13) % 1000) as f32 / 1000.0);
    let mut params = UpdateParams::new(HeatSpread);
    params.n_iterations = 3;
    let tiled = run_tiled::<HeatSpread, 2, 16, 16, 2>(params.clone(), &input);
    let direct = run_direct(params, &input);
    for (c, r, cell) in tiled.cells() {
        assert_relative_eq!(cell, direct.cell(c, r), max_relative = 1e-6);
    }
}
