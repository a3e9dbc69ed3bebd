//! # cellflow-engine
//!
//! The update engine of cellflow: everything that turns a grid of
//! iteration `i` into a grid of iteration `i + n`.
//!
//! Two backends share one parameter record ([`UpdateParams`]):
//!
//! - [`StencilUpdate`] - The spatially-tiled, temporally-pipelined
//!   engine. Each streaming pass over a tile performs up to
//!   `PIPELINE_DEPTH` applications of the transition function through the
//!   systolic [`PipelineKernel`], so one read-write cycle of the grid
//!   advances it by several iterations.
//! - [`DirectStencilUpdate`] - The per-cell backend: no tiling, no
//!   pipeline, rayon-parallel sweeps. Same results, simpler machinery.
//!
//! Time-dependent values reach the kernel through one of three
//! [`TdvStrategy`] variants with bit-identical outputs.
//!
//! ## Choosing Parameters
//!
//! - `PIPELINE_DEPTH` must be a multiple of the transition function's
//!   `N_SUBITERATIONS`; one pass advances the grid by
//!   `PIPELINE_DEPTH / N_SUBITERATIONS` iterations.
//! - The grid's `HALO_RADIUS` must equal
//!   `STENCIL_RADIUS * PIPELINE_DEPTH`.
//! - Tiles must be strictly larger than twice the halo radius in both
//!   dimensions.
//!
//! All three constraints are checked at driver construction.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod direct;
pub mod kernel;
pub mod tdv;
pub mod update;

pub use direct::DirectStencilUpdate;
pub use kernel::PipelineKernel;
pub use tdv::TdvStrategy;
pub use update::{StencilUpdate, UpdateParams};
