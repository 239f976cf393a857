use tracing::warn;

use crate::{
    Action, EngineError, Receipt, ReceiptFilter, ReceiptSubscription, ReceiptView, ResultEngine,
    SubscriptionHandle, can_perform, receipts,
};
use sea_orm::prelude::*;

use super::Engine;

impl Engine {
    /// Subscribes to live receipt snapshots.
    ///
    /// Members observe their own receipts only; staff and owners observe all.
    pub async fn subscribe_receipts(&self, user_id: &str) -> ResultEngine<ReceiptSubscription> {
        let actor = self.require_principal(&self.database, user_id).await?;
        let owner_scope = if can_perform(&actor.principal(), Action::ViewAllReceipts) {
            None
        } else {
            Some(actor.id)
        };
        let subscription = ReceiptSubscription::new(self.feed.subscribe(), owner_scope);
        self.publish_receipts().await;
        Ok(subscription)
    }

    /// Calls `listener` with a freshly computed view for every snapshot
    /// until the returned handle is cancelled or dropped.
    pub async fn watch_receipts<F>(
        &self,
        user_id: &str,
        filter: ReceiptFilter,
        listener: F,
    ) -> ResultEngine<SubscriptionHandle>
    where
        F: Fn(ReceiptView) + Send + 'static,
    {
        let subscription = self.subscribe_receipts(user_id).await?;
        Ok(SubscriptionHandle::spawn(subscription, filter, listener))
    }

    /// Reloads all receipts and hands them to subscribers. Does nothing when
    /// nobody listens. Failures are logged: the mutation has already
    /// committed.
    pub(super) async fn publish_receipts(&self) {
        if !self.feed.has_subscribers() {
            return;
        }
        let _guard = self.feed.refresh.lock().await;
        let loaded = receipts::Entity::find()
            .all(&self.database)
            .await
            .map_err(EngineError::from)
            .and_then(|models| {
                models
                    .into_iter()
                    .map(Receipt::try_from)
                    .collect::<ResultEngine<Vec<_>>>()
            });
        match loaded {
            Ok(all) => self.feed.publish(all),
            Err(err) => warn!("failed to refresh receipt subscribers: {err}"),
        }
    }
}
