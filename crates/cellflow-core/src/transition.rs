//! The transition-function contract.
//!
//! A transition function is the stencil code itself: a pure mapping from a
//! cell's neighborhood to the cell's next value. The engine is generic
//! over the transition-function type so that radius, sub-iteration count
//! and cell type are fixed at compile time.
//!
//! # Usage
//!
//! ```
//! use cellflow_core::{Stencil, TransitionFunction};
//!
//! /// Conway's Game of Life.
//! #[derive(Clone)]
//! struct Life;
//!
//! impl TransitionFunction for Life {
//!     type Cell = bool;
//!     type TimeDependentValue = ();
//!     const STENCIL_RADIUS: usize = 1;
//!
//!     fn apply(&self, stencil: &Stencil<'_, bool, ()>) -> bool {
//!         let mut alive = 0;
//!         for dc in -1..=1 {
//!             for dr in -1..=1 {
//!                 if (dc, dr) != (0, 0) && stencil.rel(dc, dr) {
//!                     alive += 1;
//!                 }
//!             }
//!         }
//!         alive == 3 || (stencil.center() && alive == 2)
//!     }
//!
//!     fn time_dependent_value(&self, _i_iteration: u64) {}
//! }
//! ```

use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::stencil::Stencil;

/// A user-supplied stencil code.
///
/// Implementations carry their runtime parameters as fields (the engine
/// clones the instance into its worker tasks) and their structural
/// parameters as associated items.
///
/// # Purity
///
/// Both [`apply`](Self::apply) and
/// [`time_dependent_value`](Self::time_dependent_value) must be pure:
/// the engine is free to call them in any order, from any thread, and any
/// number of times per logical invocation.
pub trait TransitionFunction: Clone + Send + Sync + 'static {
    /// The cell type the function operates on.
    type Cell: Cell;

    /// The value computed per iteration and injected into every stencil of
    /// that iteration. Use `()` for codes without time dependence.
    type TimeDependentValue: Copy + Send + Sync + 'static;

    /// The radius of the stencil. Must be at least 1.
    const STENCIL_RADIUS: usize;

    /// How many sub-steps make up one logical iteration. Must be at
    /// least 1.
    const N_SUBITERATIONS: usize = 1;

    /// Computes the next value of the stencil's central cell.
    fn apply(&self, stencil: &Stencil<'_, Self::Cell, Self::TimeDependentValue>) -> Self::Cell;

    /// Computes the time-dependent value for the given iteration.
    fn time_dependent_value(&self, i_iteration: u64) -> Self::TimeDependentValue;
}

/// Checks the structural constants of a transition-function type.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `STENCIL_RADIUS` or
/// `N_SUBITERATIONS` is zero.
pub fn validate<F: TransitionFunction>() -> Result<()> {
    if F::STENCIL_RADIUS < 1 {
        return Err(Error::invalid_config("stencil radius must be at least 1"));
    }
    if F::N_SUBITERATIONS < 1 {
        return Err(Error::invalid_config(
            "sub-iteration count must be at least 1",
        ));
    }
    Ok(())
}
