//! Live receipt snapshots.
//!
//! The engine republishes the whole receipt collection after each committed
//! mutation. Subscribers receive immutable snapshots and derive their views
//! from scratch with the pure functions in [`crate::views`].

use std::sync::Arc;

use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};

use crate::{Receipt, ReceiptFilter, ReceiptView};

pub(crate) type Snapshot = Arc<Vec<Receipt>>;

#[derive(Debug)]
pub(crate) struct ReceiptFeed {
    sender: watch::Sender<Snapshot>,
    /// Serializes reload-and-publish so snapshots are published in commit order.
    pub(crate) refresh: Mutex<()>,
}

impl ReceiptFeed {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            sender,
            refresh: Mutex::new(()),
        }
    }

    pub(crate) fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }

    pub(crate) fn publish(&self, receipts: Vec<Receipt>) {
        self.sender.send_replace(Arc::new(receipts));
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.sender.subscribe()
    }
}

/// A live view of the receipts a principal may see.
///
/// Members only ever observe their own receipts.
#[derive(Debug)]
pub struct ReceiptSubscription {
    receiver: Option<watch::Receiver<Snapshot>>,
    owner_scope: Option<String>,
}

impl ReceiptSubscription {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>, owner_scope: Option<String>) -> Self {
        Self {
            receiver: Some(receiver),
            owner_scope,
        }
    }

    fn visible(&self, snapshot: &[Receipt]) -> Vec<Receipt> {
        match &self.owner_scope {
            Some(owner) => snapshot
                .iter()
                .filter(|r| &r.owner_user_id == owner)
                .cloned()
                .collect(),
            None => snapshot.to_vec(),
        }
    }

    /// The latest snapshot; empty once cancelled.
    pub fn current(&self) -> Vec<Receipt> {
        match &self.receiver {
            Some(receiver) => {
                let snapshot = receiver.borrow().clone();
                self.visible(&snapshot)
            }
            None => Vec::new(),
        }
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once cancelled or when the engine has been dropped.
    pub async fn changed(&mut self) -> Option<Vec<Receipt>> {
        let receiver = self.receiver.as_mut()?;
        if receiver.changed().await.is_err() {
            self.receiver = None;
            return None;
        }
        let snapshot = receiver.borrow_and_update().clone();
        Some(self.visible(&snapshot))
    }

    pub fn cancel(&mut self) {
        self.receiver = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.receiver.is_none()
    }
}

/// Stops listener delivery when cancelled or dropped.
#[derive(Debug)]
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub(crate) fn spawn<F>(mut subscription: ReceiptSubscription, filter: ReceiptFilter, listener: F) -> Self
    where
        F: Fn(ReceiptView) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            listener(ReceiptView::compute(&subscription.current(), &filter));
            while let Some(receipts) = subscription.changed().await {
                listener(ReceiptView::compute(&receipts, &filter));
            }
        });
        Self { task }
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
