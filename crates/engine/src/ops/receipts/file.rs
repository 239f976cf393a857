use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Action, EngineError, FileMeta, Receipt, ResultEngine, blob::receipt_file_path, receipts,
    util::normalize_required_name,
};

use super::super::{Engine, access::receipt_not_accessible, access::require, with_tx};

impl Engine {
    /// Uploads the receipt's file and records where it landed.
    ///
    /// Until this succeeds the receipt carries an empty `download_url`, which
    /// is a valid pending state. The location is not revision-tracked.
    pub async fn attach_receipt_file(
        &self,
        receipt_id: Uuid,
        user_id: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ResultEngine<FileMeta> {
        self.check_file_size(&bytes)?;
        let file_name = normalize_required_name(file_name, "file")
            .map_err(|_| EngineError::InvalidFile("file name must not be empty".to_string()))?;

        let (receipt, _) = self
            .editable_receipt(&self.database, receipt_id, user_id)
            .await?;
        let path = receipt_file_path(&receipt.owner_user_id, &receipt.id.to_string(), &file_name)?;
        let size = bytes.len() as i64;
        let download_url = self.blobs.put(&path, content_type, bytes).await?;

        let file = FileMeta {
            name: file_name,
            content_type: content_type.to_string(),
            size,
            storage_path: path,
            download_url,
        };
        self.retry_on_conflict("attach file", || {
            self.store_file_meta_once(receipt_id, user_id, &file)
        })
        .await?;

        info!(%receipt_id, storage_path = %file.storage_path, "receipt file attached");
        self.publish_receipts().await;
        Ok(file)
    }

    async fn editable_receipt<C: ConnectionTrait>(
        &self,
        db: &C,
        receipt_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<(Receipt, i64)> {
        let editor = self.require_principal(db, user_id).await?;
        let Some(model) = receipts::Entity::find_by_id(receipt_id).one(db).await? else {
            return Err(receipt_not_accessible());
        };
        let version = model.version;
        let receipt = Receipt::try_from(model)?;
        require(
            &editor.principal(),
            Action::EditReceipt {
                owner_user_id: &receipt.owner_user_id,
            },
            "receipt not found or not accessible",
        )?;
        if receipt.is_deleted() {
            return Err(EngineError::InvalidState(
                "cannot attach a file to a deleted receipt".to_string(),
            ));
        }
        Ok((receipt, version))
    }

    async fn store_file_meta_once(
        &self,
        receipt_id: Uuid,
        user_id: &str,
        file: &FileMeta,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let (_, version) = self.editable_receipt(&db_tx, receipt_id, user_id).await?;
            let changes = receipts::ActiveModel {
                file_name: ActiveValue::Set(file.name.clone()),
                file_type: ActiveValue::Set(file.content_type.clone()),
                file_size: ActiveValue::Set(file.size),
                file_storage_path: ActiveValue::Set(file.storage_path.clone()),
                file_download_url: ActiveValue::Set(file.download_url.clone()),
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
            Ok(())
        })
    }
}
