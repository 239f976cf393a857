use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Action, EngineError, Receipt, ReceiptPatch, ResultEngine, Revision, RevisionAction,
    UpdateReceiptCmd, commands::ValidatedUpdate, receipts,
};

use super::super::{Engine, access::receipt_not_accessible, access::require, with_tx};
use super::{append_revision, editor_ref};

impl Engine {
    /// Applies a partial update to a receipt and appends an `update` revision.
    ///
    /// Inside one transaction this re-reads the receipt, re-checks the edit
    /// permission against its current owner, writes the merged state with
    /// `edit_count + 1` and appends the revision. Either both land or
    /// neither does.
    ///
    /// Edits on soft-deleted receipts are rejected.
    pub async fn update_receipt(&self, cmd: UpdateReceiptCmd) -> ResultEngine<Receipt> {
        let input = cmd.validate()?;

        let receipt = self
            .retry_on_conflict("update receipt", || {
                self.update_receipt_once(cmd.receipt_id, &cmd.user_id, &input)
            })
            .await?;

        info!(
            receipt_id = %receipt.id,
            user_id = %cmd.user_id,
            edit_count = receipt.edit_count,
            "receipt updated"
        );
        self.publish_receipts().await;
        Ok(receipt)
    }

    async fn update_receipt_once(
        &self,
        receipt_id: Uuid,
        user_id: &str,
        input: &ValidatedUpdate,
    ) -> ResultEngine<Receipt> {
        with_tx!(self, |db_tx| {
            let editor = self.require_principal(&db_tx, user_id).await?;
            let Some(model) = receipts::Entity::find_by_id(receipt_id).one(&db_tx).await? else {
                return Err(receipt_not_accessible());
            };
            let version = model.version;
            let current = Receipt::try_from(model)?;
            require(
                &editor.principal(),
                Action::EditReceipt {
                    owner_user_id: &current.owner_user_id,
                },
                "receipt not found or not accessible",
            )?;
            if current.is_deleted() {
                return Err(EngineError::InvalidState(
                    "cannot update a deleted receipt".to_string(),
                ));
            }

            let mut patch = ReceiptPatch {
                amount_cents: input.amount_cents,
                receipt_date: input.receipt_date.clone(),
                currency: input.currency,
                ..Default::default()
            };
            if let Some(category_id) = input.category_id {
                let category = self.require_active_category(&db_tx, category_id).await?;
                patch.category_id = Some(category.id);
                patch.category_name = Some(category.name);
            }

            let before = current.state();
            let after = before.merged(&patch);
            let now = Utc::now();
            let editor = editor_ref(&editor);

            let changes = receipts::ActiveModel {
                category_id: ActiveValue::Set(after.category_id),
                category_name: ActiveValue::Set(after.category_name.clone()),
                amount_cents: ActiveValue::Set(after.amount_cents.cents()),
                currency: ActiveValue::Set(after.currency.code().to_string()),
                receipt_date: ActiveValue::Set(after.receipt_date.clone()),
                updated_at: ActiveValue::Set(Some(now)),
                updated_by_user_id: ActiveValue::Set(Some(editor.user_id.clone())),
                updated_by_name: ActiveValue::Set(Some(editor.name.clone())),
                updated_by_email: ActiveValue::Set(Some(editor.email.clone())),
                edit_count: ActiveValue::Set(current.edit_count + 1),
                version: ActiveValue::Set(version + 1),
                ..Default::default()
            };
            let written = receipts::Entity::update_many()
                .set(changes)
                .filter(receipts::Column::Id.eq(receipt_id))
                .filter(receipts::Column::Version.eq(version))
                .exec(&db_tx)
                .await?;
            if written.rows_affected == 0 {
                return Err(EngineError::Conflict(
                    "receipt changed concurrently".to_string(),
                ));
            }

            append_revision(
                &db_tx,
                &Revision {
                    id: Uuid::new_v4(),
                    receipt_id,
                    action: RevisionAction::Update,
                    edited_at: now,
                    edited_by_user_id: editor.user_id.clone(),
                    edited_by_name: editor.name.clone(),
                    edited_by_email: editor.email.clone(),
                    before: Some(before),
                    after: Some(after.clone()),
                    patch: Some(patch),
                },
            )
            .await?;

            Ok(Receipt {
                category_id: after.category_id,
                category_name: after.category_name,
                amount_cents: after.amount_cents,
                currency: after.currency,
                receipt_date: after.receipt_date,
                updated_at: Some(now),
                updated_by: Some(editor),
                edit_count: current.edit_count + 1,
                ..current
            })
        })
    }
}
