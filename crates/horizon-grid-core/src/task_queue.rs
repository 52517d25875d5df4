//! Serialized async operation queue.
//!
//! [`SerialQueue`] is a first-in, first-out queue of operations that are
//! applied one at a time by an async handler. Operations are enqueued
//! synchronously with [`SerialQueue::push`]; [`SerialQueue::drain`] applies
//! everything that is queued, including operations pushed while draining.
//!
//! Only one drain runs at a time. A second caller of `drain` waits for the
//! first to finish and then drains whatever is left, which makes `drain` the
//! "wait for quiescence" primitive: once it returns, every operation pushed
//! before the call has been applied.
//!
//! # Example
//!
//! ```
//! use horizon_grid_core::SerialQueue;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let queue = SerialQueue::new();
//! queue.push(1);
//! queue.push(2);
//!
//! let mut seen = Vec::new();
//! queue.drain(|op| {
//!     seen.push(op);
//!     async {}
//! }).await;
//!
//! assert_eq!(seen, vec![1, 2]);
//! assert!(queue.is_idle());
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex as AsyncMutex, mpsc};

use crate::logging::targets;

/// A FIFO queue of operations applied one at a time.
pub struct SerialQueue<Op> {
    sender: mpsc::UnboundedSender<Op>,
    receiver: AsyncMutex<mpsc::UnboundedReceiver<Op>>,
    pending: AtomicUsize,
}

impl<Op> SerialQueue<Op> {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: AsyncMutex::new(receiver),
            pending: AtomicUsize::new(0),
        }
    }

    /// Enqueue an operation. It runs on the next (or current) drain.
    pub fn push(&self, op: Op) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        // The receiver lives as long as `self`, so sending cannot fail.
        if self.sender.send(op).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::error!(target: targets::TASK_QUEUE, "serial queue receiver closed");
        }
    }

    /// Number of operations pushed but not yet applied.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Whether every pushed operation has been applied.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Apply queued operations in order until the queue is empty.
    ///
    /// Each operation's future is awaited to completion before the next
    /// operation is taken. Returns the number of operations applied by this
    /// call.
    pub async fn drain<F, Fut>(&self, mut handler: F) -> usize
    where
        F: FnMut(Op) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut receiver = self.receiver.lock().await;
        let mut applied = 0;
        while let Ok(op) = receiver.try_recv() {
            handler(op).await;
            self.pending.fetch_sub(1, Ordering::SeqCst);
            applied += 1;
        }
        if applied > 0 {
            tracing::trace!(target: targets::TASK_QUEUE, applied, "serial queue drained");
        }
        applied
    }
}

impl<Op> Default for SerialQueue<Op> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Op> fmt::Debug for SerialQueue<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_drain_applies_in_order() {
        let queue = SerialQueue::new();
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.pending(), 5);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let applied = queue
            .drain(|op| {
                let seen = seen.clone();
                async move {
                    tokio::task::yield_now().await;
                    seen.lock().push(op);
                }
            })
            .await;

        assert_eq!(applied, 5);
        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
        assert!(queue.is_idle());
    }

    #[tokio::test]
    async fn test_concurrent_drains_do_not_interleave() {
        let queue = SerialQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.push("a");
        queue.push("b");

        let handler = |op: &'static str| {
            let log = log.clone();
            async move {
                log.lock().push(format!("start {op}"));
                tokio::task::yield_now().await;
                log.lock().push(format!("end {op}"));
            }
        };

        let (first, second) = tokio::join!(queue.drain(handler), queue.drain(handler));

        assert_eq!(first + second, 2);
        assert_eq!(
            *log.lock(),
            vec!["start a", "end a", "start b", "end b"]
        );
    }

    #[tokio::test]
    async fn test_push_during_drain_is_applied() {
        let queue = Arc::new(SerialQueue::new());
        queue.push(1u32);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let queue_clone = queue.clone();
        queue
            .drain(|op| {
                if op == 1 {
                    queue_clone.push(2);
                }
                seen.lock().push(op);
                async {}
            })
            .await;

        assert_eq!(*seen.lock(), vec![1, 2]);
        assert!(queue.is_idle());
    }
}
