//! # cellflow-runtime
//!
//! The task-graph runtime the cellflow engine is built on.
//!
//! Every grid read, kernel invocation and grid write is a task submitted to
//! an in-order [`Queue`] owned by a [`Device`]. Tasks on one queue execute
//! strictly in submission order; ordering across queues is expressed with
//! completion [`Event`]s and with the dataflow of the cell
//! [`stream`](crate::stream)s connecting producer and consumer tasks.
//!
//! ## Example
//!
//! ```
//! use cellflow_runtime::{stream, Device};
//!
//! let device = Device::cpu();
//! let queue = device.create_queue();
//!
//! let (tx, rx) = stream::channel();
//! queue.submit(move || {
//!     for cell in 0..4u32 {
//!         tx.send(cell).ok();
//!     }
//! });
//! let event = queue.submit(move || {
//!     let cells: Vec<u32> = rx.iter().take(4).collect();
//!     assert_eq!(cells, [0, 1, 2, 3]);
//! });
//! event.wait();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod queue;
pub mod stream;

pub use queue::{Device, Event, Queue};
