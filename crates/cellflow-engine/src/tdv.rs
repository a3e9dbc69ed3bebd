//! Time-dependent value precomputation strategies.
//!
//! A transition function may derive a scalar from the iteration index (a
//! source term, a coefficient schedule) that every stencil invocation of
//! that iteration receives. The engine supports three ways of getting
//! those values to the kernel, selected by [`TdvStrategy`]; their outputs
//! are bit-identical and only their resource trade-offs differ.
//!
//! Internally the values travel through three stages, mirroring the pass
//! structure of the update driver:
//!
//! 1. [`TdvGlobalState`] - built once per `update` call,
//! 2. [`TdvKernelArgument`] - derived once per pass,
//! 3. [`TdvLocalState`] - materialized at kernel entry; the only stage the
//!    kernel reads from.
//!
//! When the value type is zero-sized (`()`), the precomputed tables are
//! `Vec<()>`s and never allocate, so all three strategies collapse to
//! no-ops.

use cellflow_core::TransitionFunction;

/// How time-dependent values reach the update kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TdvStrategy {
    /// The kernel recomputes each value on demand from the transition
    /// function it already carries. No tables, repeated computation.
    #[default]
    Inline,
    /// The kernel fills a small per-invocation table (one entry per
    /// iteration of the pass) at kernel entry.
    PrecomputeOnDevice,
    /// The host fills one table for the whole update call up front; each
    /// pass receives its slice.
    PrecomputeOnHost,
}

/// Per-update-call state of the chosen strategy.
pub(crate) enum TdvGlobalState<F: TransitionFunction> {
    Inline { func: F },
    OnDevice { func: F },
    OnHost {
        values: Vec<F::TimeDependentValue>,
        offset: u64,
    },
}

impl<F: TransitionFunction> TdvGlobalState<F> {
    /// Builds the global state for one update call covering the iteration
    /// range `[iteration_offset, iteration_offset + n_iterations)`.
    pub(crate) fn new(
        strategy: TdvStrategy,
        func: F,
        iteration_offset: u64,
        n_iterations: u64,
    ) -> Self {
        match strategy {
            TdvStrategy::Inline => Self::Inline { func },
            TdvStrategy::PrecomputeOnDevice => Self::OnDevice { func },
            TdvStrategy::PrecomputeOnHost => {
                let values = (0..n_iterations)
                    .map(|i| func.time_dependent_value(iteration_offset + i))
                    .collect();
                Self::OnHost {
                    values,
                    offset: iteration_offset,
                }
            }
        }
    }

    /// Derives the argument for one pass starting at iteration
    /// `pass_offset` and computing `iters_this_pass` iterations.
    pub(crate) fn kernel_argument(
        &self,
        pass_offset: u64,
        iters_this_pass: usize,
    ) -> TdvKernelArgument<F> {
        match self {
            Self::Inline { func } => TdvKernelArgument::Inline {
                func: func.clone(),
                pass_offset,
            },
            Self::OnDevice { func } => TdvKernelArgument::OnDevice {
                func: func.clone(),
                pass_offset,
                iters_this_pass,
            },
            Self::OnHost { values, offset } => {
                let start = (pass_offset - offset) as usize;
                let end = (start + iters_this_pass).min(values.len());
                TdvKernelArgument::Precomputed {
                    values: values[start..end].to_vec(),
                }
            }
        }
    }
}

/// Per-pass state handed to each kernel invocation of the pass.
pub(crate) enum TdvKernelArgument<F: TransitionFunction> {
    Inline { func: F, pass_offset: u64 },
    OnDevice {
        func: F,
        pass_offset: u64,
        iters_this_pass: usize,
    },
    Precomputed { values: Vec<F::TimeDependentValue> },
}

impl<F: TransitionFunction> std::fmt::Debug for TdvKernelArgument<F>
where
    F: std::fmt::Debug,
    F::TimeDependentValue: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline { func, pass_offset } => f
                .debug_struct("Inline")
                .field("func", func)
                .field("pass_offset", pass_offset)
                .finish(),
            Self::OnDevice {
                func,
                pass_offset,
                iters_this_pass,
            } => f
                .debug_struct("OnDevice")
                .field("func", func)
                .field("pass_offset", pass_offset)
                .field("iters_this_pass", iters_this_pass)
                .finish(),
            Self::Precomputed { values } => {
                f.debug_struct("Precomputed").field("values", values).finish()
            }
        }
    }
}

impl<F: TransitionFunction> Clone for TdvKernelArgument<F> {
    fn clone(&self) -> Self {
        match self {
            Self::Inline { func, pass_offset } => Self::Inline {
                func: func.clone(),
                pass_offset: *pass_offset,
            },
            Self::OnDevice {
                func,
                pass_offset,
                iters_this_pass,
            } => Self::OnDevice {
                func: func.clone(),
                pass_offset: *pass_offset,
                iters_this_pass: *iters_this_pass,
            },
            Self::Precomputed { values } => Self::Precomputed {
                values: values.clone(),
            },
        }
    }
}

impl<F: TransitionFunction> TdvKernelArgument<F> {
    /// Materializes the per-invocation state. For
    /// [`TdvStrategy::PrecomputeOnDevice`] this is where the table is
    /// filled.
    pub(crate) fn local_state(&self) -> TdvLocalState<F> {
        match self {
            Self::Inline { func, pass_offset } => TdvLocalState::Inline {
                func: func.clone(),
                pass_offset: *pass_offset,
            },
            Self::OnDevice {
                func,
                pass_offset,
                iters_this_pass,
            } => {
                let values = (0..*iters_this_pass as u64)
                    .map(|i| func.time_dependent_value(pass_offset + i))
                    .collect();
                TdvLocalState::Table { values }
            }
            Self::Precomputed { values } => TdvLocalState::Table {
                values: values.clone(),
            },
        }
    }
}

/// Per-invocation state; the kernel asks it for the value of each pass
/// iteration.
pub(crate) enum TdvLocalState<F: TransitionFunction> {
    Inline { func: F, pass_offset: u64 },
    Table { values: Vec<F::TimeDependentValue> },
}

impl<F: TransitionFunction> TdvLocalState<F> {
    /// Returns the value for the `rel_iteration`-th iteration of the pass.
    ///
    /// Callers only ask for iterations the pass actually computes, so a
    /// table access is always in range.
    pub(crate) fn value(&self, rel_iteration: usize) -> F::TimeDependentValue {
        match self {
            Self::Inline { func, pass_offset } => {
                func.time_dependent_value(pass_offset + rel_iteration as u64)
            }
            Self::Table { values } => values[rel_iteration],
        }
    }
}
