//! Core plumbing for Horizon Grid.
//!
//! This crate provides the observer and scheduling primitives that the grid
//! crate is built on:
//!
//! - **Signal/Slot System**: Type-safe, synchronous change notification
//! - **Property System**: Change-detecting values and lazily computed caches
//! - **Serial Queue**: FIFO application of async operations, one at a time
//! - **Logging**: `tracing` target names for every subsystem
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_grid_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//!
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```
//!
//! # Cache Example
//!
//! ```
//! use horizon_grid_core::{Cached, Signal};
//!
//! let input_changed = Signal::<()>::new();
//! let cache: Cached<u32> = Cached::new();
//!
//! let invalidator = cache.invalidator();
//! let _guard = input_changed.connect_scoped(move |_| {
//!     invalidator.invalidate();
//! });
//!
//! assert_eq!(cache.get_or_compute(|| Some(1)).as_deref(), Some(&1));
//! input_changed.emit(());
//! assert!(cache.is_dirty());
//! ```

pub mod logging;
pub mod property;
pub mod signal;
pub mod task_queue;

pub use logging::PerfSpan;
pub use property::{Cached, Invalidator, Property};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use task_queue::SerialQueue;
