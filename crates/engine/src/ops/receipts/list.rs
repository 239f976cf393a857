use std::collections::HashMap;

use sea_orm::{QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    Action, EngineError, Receipt, ReceiptExportRow, ReceiptFilter, ReceiptView, ResultEngine,
    User, can_perform,
    export::{export_rows, to_delimited_text},
    receipts, users,
    views::filter_receipts,
};

use super::super::Engine;

/// Members only ever see their own receipts, whatever owner they ask for.
fn scoped_filter(actor: &User, filter: &ReceiptFilter) -> ReceiptFilter {
    let mut scoped = filter.clone();
    if !can_perform(&actor.principal(), Action::ViewAllReceipts) {
        scoped.owner_user_id = Some(actor.id.clone());
    }
    scoped
}

fn render_export(
    receipts: &[&Receipt],
    owner_names: &HashMap<String, String>,
) -> ResultEngine<String> {
    let rows = export_rows(receipts, owner_names);
    to_delimited_text(&rows, &ReceiptExportRow::summary(receipts.iter().copied()))
}

impl Engine {
    /// Returns a receipt its owner or staff may see.
    pub async fn receipt(&self, receipt_id: Uuid, user_id: &str) -> ResultEngine<Receipt> {
        let actor = self.require_principal(&self.database, user_id).await?;
        let receipt = receipts::Entity::find_by_id(receipt_id)
            .one(&self.database)
            .await?
            .map(Receipt::try_from)
            .transpose()?
            .ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;
        if !can_perform(
            &actor.principal(),
            Action::ViewReceipt {
                owner_user_id: &receipt.owner_user_id,
            },
        ) {
            return Err(EngineError::KeyNotFound("receipt not exists".to_string()));
        }
        Ok(receipt)
    }

    /// Loads the receipts the store can narrow down by column; dates, search
    /// and ordering are left to [`filter_receipts`].
    async fn load_receipts(&self, filter: &ReceiptFilter) -> ResultEngine<Vec<Receipt>> {
        let mut query = receipts::Entity::find();
        if let Some(owner) = &filter.owner_user_id {
            query = query.filter(receipts::Column::OwnerUserId.eq(owner.clone()));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(receipts::Column::CategoryId.eq(category_id));
        }
        if !filter.include_deleted {
            query = query.filter(receipts::Column::DeletedAt.is_null());
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Receipt::try_from)
            .collect()
    }

    /// Receipts matching `filter`, newest receipt date first.
    pub async fn list_receipts(
        &self,
        user_id: &str,
        filter: &ReceiptFilter,
    ) -> ResultEngine<Vec<Receipt>> {
        let actor = self.require_principal(&self.database, user_id).await?;
        let filter = scoped_filter(&actor, filter);
        let loaded = self.load_receipts(&filter).await?;
        Ok(filter_receipts(&loaded, &filter)
            .into_iter()
            .cloned()
            .collect())
    }

    /// The filtered list together with its total and its groupings.
    pub async fn receipt_view(
        &self,
        user_id: &str,
        filter: &ReceiptFilter,
    ) -> ResultEngine<ReceiptView> {
        let actor = self.require_principal(&self.database, user_id).await?;
        let filter = scoped_filter(&actor, filter);
        let loaded = self.load_receipts(&filter).await?;
        Ok(ReceiptView::compute(&loaded, &filter))
    }

    /// CSV export of the filtered receipts with a leading `SUMMARY` row.
    ///
    /// Owner names are the owners' current display names.
    pub async fn export_receipts(
        &self,
        user_id: &str,
        filter: &ReceiptFilter,
    ) -> ResultEngine<String> {
        let listed = self.list_receipts(user_id, filter).await?;
        let mut owner_ids: Vec<String> = listed.iter().map(|r| r.owner_user_id.clone()).collect();
        owner_ids.sort();
        owner_ids.dedup();

        let owner_names: HashMap<String, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(owner_ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|u| (u.id, u.display_name))
            .collect();

        let refs: Vec<&Receipt> = listed.iter().collect();
        render_export(&refs, &owner_names)
    }

    /// Administrative export that skips the principal check.
    pub async fn export_all_receipts(&self, filter: &ReceiptFilter) -> ResultEngine<String> {
        let loaded = self.load_receipts(filter).await?;
        let refs = filter_receipts(&loaded, filter);
        let names: HashMap<String, String> = users::Entity::find()
            .all(&self.database)
            .await?
            .into_iter()
            .map(|u| (u.id, u.display_name))
            .collect();
        render_export(&refs, &names)
    }
}
