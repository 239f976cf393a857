use chrono::Utc;
use sea_orm::{ActiveModelTrait, TransactionTrait};
use tracing::info;
use uuid::Uuid;

use crate::{
    Action, CreateReceiptCmd, EngineError, FileMeta, Receipt, ResultEngine, Revision,
    RevisionAction, receipts,
};

use super::super::{Engine, access::require, with_tx};
use super::{append_revision, editor_ref};

impl Engine {
    /// Submits a new receipt.
    ///
    /// Input is validated before the transaction starts. The file's storage
    /// location stays empty until [`Engine::attach_receipt_file`] completes.
    pub async fn create_receipt(&self, cmd: CreateReceiptCmd) -> ResultEngine<Receipt> {
        let input = cmd.validate(self.policy.max_file_bytes)?;

        let receipt = with_tx!(self, |db_tx| {
            let actor = self.require_principal(&db_tx, &cmd.user_id).await?;
            require(
                &actor.principal(),
                Action::SubmitReceipt {
                    owner_user_id: &input.owner_user_id,
                },
                "not allowed to submit receipts for this user",
            )?;
            if input.owner_user_id != actor.id {
                self.load_user(&db_tx, &input.owner_user_id)
                    .await
                    .map_err(|_| EngineError::KeyNotFound("owner user not exists".to_string()))?;
            }
            let category = self.require_active_category(&db_tx, cmd.category_id).await?;

            let now = Utc::now();
            let receipt = Receipt {
                id: Uuid::new_v4(),
                owner_user_id: input.owner_user_id.clone(),
                uploaded_by_user_id: actor.id.clone(),
                category_id: category.id,
                category_name: category.name,
                amount_cents: input.amount_cents,
                currency: input.currency,
                receipt_date: input.receipt_date.clone(),
                submitted_at: now,
                updated_at: None,
                updated_by: None,
                edit_count: 0,
                deleted_at: None,
                deleted_by_user_id: None,
                file: FileMeta {
                    name: input.file.name.clone(),
                    content_type: input.file.content_type.clone(),
                    size: input.file.size,
                    ..Default::default()
                },
            };
            receipts::ActiveModel::from(&receipt).insert(&db_tx).await?;

            if self.policy.create_revisions {
                let editor = editor_ref(&actor);
                append_revision(
                    &db_tx,
                    &Revision {
                        id: Uuid::new_v4(),
                        receipt_id: receipt.id,
                        action: RevisionAction::Create,
                        edited_at: now,
                        edited_by_user_id: editor.user_id,
                        edited_by_name: editor.name,
                        edited_by_email: editor.email,
                        before: None,
                        after: Some(receipt.state()),
                        patch: None,
                    },
                )
                .await?;
            }
            Ok(receipt)
        })?;

        info!(
            receipt_id = %receipt.id,
            owner_user_id = %receipt.owner_user_id,
            amount_cents = receipt.amount_cents.cents(),
            "receipt submitted"
        );
        self.publish_receipts().await;
        Ok(receipt)
    }
}
