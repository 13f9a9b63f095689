//! In-process FIFO work queue shared by the worker pool.
//!
//! Unbounded: intake never blocks and depth is limited only by memory.
//! Load shedding happens downstream, when a worker finds a request older
//! than the expiry threshold.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Multi-producer, multi-consumer FIFO.
///
/// Consumers take turns holding the receiver, so each item goes to exactly
/// one consumer.
pub struct WorkQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
    depth: Arc<AtomicUsize>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: Arc::clone(&self.rx),
            depth: Arc::clone(&self.depth),
        }
    }
}

impl<T: Send> WorkQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enqueue an item. Returns the queue depth including it.
    pub fn push(&self, item: T) -> usize {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        // The queue owns its receiver, so the channel cannot be closed here.
        let _ = self.tx.send(item);
        depth
    }

    /// Wait for the next item.
    pub async fn pop(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;
        let item = rx.recv().await;
        if item.is_some() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        item
    }

    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = WorkQueue::new();
        assert!(queue.is_empty());

        assert_eq!(queue.push(1), 1);
        assert_eq!(queue.push(2), 2);
        assert_eq!(queue.push(3), 3);

        assert_eq!(queue.pop().await, Some(1));
        assert_eq!(queue.pop().await, Some(2));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().await, Some(3));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_each_item_goes_to_one_consumer() {
        let queue: WorkQueue<u32> = WorkQueue::new();
        for i in 0..100 {
            queue.push(i);
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..25 {
                    if let Some(item) = queue.pop().await {
                        seen.push(item);
                    }
                }
                seen
            }));
        }

        let mut all = HashSet::new();
        for handle in handles {
            for item in handle.await.unwrap() {
                assert!(all.insert(item), "item {} delivered twice", item);
            }
        }
        assert_eq!(all.len(), 100);
        assert!(queue.is_empty());
    }
}
