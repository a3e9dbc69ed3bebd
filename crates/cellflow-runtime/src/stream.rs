//! FIFO cell streams connecting grid stores and update kernels.
//!
//! Streams are point-to-point, typed and unbounded: one producer task
//! (a grid read) feeds one consumer task (a kernel stage chain), and a
//! second stream carries the kernel's output to the grid write task. The
//! update driver creates a fresh pair per pass; streams are never reused
//! across passes.
//!
//! The implementation is a thin veneer over [`crossbeam_channel`], which
//! also feeds the worker threads of [`crate::queue`].
//!
//! # Usage
//!
//! ```
//! use cellflow_runtime::stream;
//!
//! let (tx, rx) = stream::channel();
//! tx.send(1u8).ok();
//! tx.send(2u8).ok();
//! assert_eq!(rx.recv(), Ok(1));
//! assert_eq!(rx.recv(), Ok(2));
//! ```

pub use crossbeam_channel::{Receiver, Sender};

/// Creates an unbounded FIFO stream of cells.
///
/// The sender never blocks. The receiver blocks until a cell is available
/// or every sender has been dropped.
pub fn channel<C>() -> (Sender<C>, Receiver<C>) {
    crossbeam_channel::unbounded()
}
