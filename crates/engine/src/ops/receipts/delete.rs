use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Action, EngineError, Receipt, ResultEngine, Revision, RevisionAction, receipts};

use super::super::{Engine, access::receipt_not_accessible, access::require, with_tx};
use super::{append_revision, editor_ref};

impl Engine {
    /// Soft deletes a receipt (sets `deleted_at`/`deleted_by_user_id`).
    ///
    /// Deleting an already deleted receipt is a silent no-op and appends no
    /// revision. Deleted receipts are hidden by default in lists and views.
    pub async fn soft_delete_receipt(&self, receipt_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let deleted = self
            .retry_on_conflict("delete receipt", || {
                self.soft_delete_receipt_once(receipt_id, user_id)
            })
            .await?;

        if deleted {
            info!(%receipt_id, user_id, "receipt deleted");
            self.publish_receipts().await;
        } else {
            debug!(%receipt_id, user_id, "receipt already deleted");
        }
        Ok(())
    }

    async fn soft_delete_receipt_once(&self, receipt_id: Uuid, user_id: &str) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let editor = self.require_principal(&db_tx, user_id).await?;
            let Some(model) = receipts::Entity::find_by_id(receipt_id).one(&db_tx).await? else {
                return Err(receipt_not_accessible());
            };
            let version = model.version;
            let current = Receipt::try_from(model)?;
            require(
                &editor.principal(),
                Action::DeleteReceipt {
                    owner_user_id: &current.owner_user_id,
                },
                "receipt not found or not accessible",
            )?;
            if current.is_deleted() {
                return Ok(false);
            }

            let now = Utc::now();
            let changes = receipts::ActiveModel {
                deleted_at: ActiveValue::Set(Some(now)),
                deleted_by_user_id: ActiveValue::Set(Some(editor.id.clone())),
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

            let editor = editor_ref(&editor);
            append_revision(
                &db_tx,
                &Revision {
                    id: Uuid::new_v4(),
                    receipt_id,
                    action: RevisionAction::Delete,
                    edited_at: now,
                    edited_by_user_id: editor.user_id,
                    edited_by_name: editor.name,
                    edited_by_email: editor.email,
                    before: Some(current.state()),
                    after: None,
                    patch: None,
                },
            )
            .await?;
            Ok(true)
        })
    }
}
