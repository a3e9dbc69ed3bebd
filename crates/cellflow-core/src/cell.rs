//! The cell value contract.
//!
//! The engine treats cells opaquely: it copies them, stores them
//! contiguously, compares them in tests and substitutes a caller-provided
//! halo cell for positions outside the grid. Everything a cell must support
//! is captured by the [`Cell`] marker trait.

/// Marker trait for cell value types.
///
/// A cell is a plain value: it is copied freely between buffers, streamed
/// through channels and moved across worker threads. `Default` stands in
/// for the "unspecified contents" of freshly allocated grids.
///
/// The trait is blanket-implemented; any `Copy + PartialEq + Default`
/// type that is thread-safe qualifies:
///
/// ```
/// use cellflow_core::Cell;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Default)]
/// struct Heat {
///     temperature: f32,
/// }
///
/// fn assert_cell<C: Cell>() {}
/// assert_cell::<bool>();
/// assert_cell::<u64>();
/// assert_cell::<Heat>();
/// ```
pub trait Cell: Copy + PartialEq + Default + Send + Sync + 'static {}

impl<T> Cell for T where T: Copy + PartialEq + Default + Send + Sync + 'static {}
