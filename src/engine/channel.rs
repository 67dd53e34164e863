//! Task distribution channel.
//!
//! Producers hand items to whichever worker is waiting. The mpsc buffer holds
//! at most one envelope, and a submission only completes once a worker has
//! acknowledged it, so producers block until an item is actually claimed.

use super::stats::AggregatorStats;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};

struct Envelope<T> {
    item: T,
    accepted: oneshot::Sender<()>,
}

/// Producer side of the distribution channel. Cheap to clone.
pub struct TaskSender<T> {
    tx: mpsc::Sender<Envelope<T>>,
}

impl<T> Clone for TaskSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> TaskSender<T> {
    /// Hand `item` to a worker, waiting until one claims it.
    ///
    /// Fails with [`Error::Closed`] if the worker pool stops before the item
    /// is claimed. Dropping the returned future after the item was queued does
    /// not withdraw it.
    pub async fn submit(&self, item: T) -> Result<()> {
        let (accepted, ack) = oneshot::channel();
        self.tx
            .send(Envelope { item, accepted })
            .await
            .map_err(|_| Error::Closed)?;
        ack.await.map_err(|_| Error::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Worker side of the distribution channel, shared by the whole pool.
pub(crate) struct TaskReceiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<Envelope<T>>>>,
    stats: Arc<AggregatorStats>,
}

impl<T> Clone for TaskReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T> TaskReceiver<T> {
    /// Claim the next item. `None` once every sender is gone.
    ///
    /// Cancel-safe: an item is acknowledged only in the same poll that
    /// returns it.
    pub(crate) async fn recv(&self) -> Option<T> {
        let mut rx = self.rx.lock().await;
        let envelope = rx.recv().await?;
        // The producer may have stopped waiting; the item is still ours.
        let _ = envelope.accepted.send(());
        self.stats.record_accepted();
        Some(envelope.item)
    }
}

pub(crate) fn channel<T>(stats: Arc<AggregatorStats>) -> (TaskSender<T>, TaskReceiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    (
        TaskSender { tx },
        TaskReceiver {
            rx: Arc::new(Mutex::new(rx)),
            stats,
        },
    )
}
