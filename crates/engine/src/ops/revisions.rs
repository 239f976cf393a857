use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Action, EngineError, ResultEngine, Revision, can_perform, receipts, revisions};

use super::{Engine, access::require};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RevisionsCursor {
    edited_at: DateTime<Utc>,
    revision_id: Uuid,
}

impl RevisionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid revisions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid revisions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid revisions cursor".to_string()))
    }
}

impl Engine {
    /// Audit trail of one receipt, newest first.
    pub async fn receipt_history(
        &self,
        receipt_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Vec<Revision>> {
        let actor = self.require_principal(&self.database, user_id).await?;
        let receipt = receipts::Entity::find_by_id(receipt_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("receipt not exists".to_string()))?;
        if !can_perform(
            &actor.principal(),
            Action::ViewReceipt {
                owner_user_id: &receipt.owner_user_id,
            },
        ) {
            return Err(EngineError::KeyNotFound("receipt not exists".to_string()));
        }

        revisions::Entity::find()
            .filter(revisions::Column::ReceiptId.eq(receipt_id))
            .order_by_desc(revisions::Column::EditedAt)
            .order_by_desc(revisions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Revision::try_from)
            .collect()
    }

    /// Revisions across all receipts, with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(edited_at DESC, id DESC)`.
    pub async fn audit_log_page(
        &self,
        user_id: &str,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<Revision>, Option<String>)> {
        let actor = self.require_principal(&self.database, user_id).await?;
        require(&actor.principal(), Action::ViewAuditLog, "not allowed to read the audit log")?;

        let mut query = revisions::Entity::find()
            .order_by_desc(revisions::Column::EditedAt)
            .order_by_desc(revisions::Column::Id);
        if let Some(cursor) = cursor {
            let cursor = RevisionsCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(revisions::Column::EditedAt.lt(cursor.edited_at))
                    .add(
                        Condition::all()
                            .add(revisions::Column::EditedAt.eq(cursor.edited_at))
                            .add(revisions::Column::Id.lt(cursor.revision_id)),
                    ),
            );
        }

        let limit = limit.max(1);
        let mut page: Vec<Revision> = query
            .limit(limit.saturating_add(1))
            .all(&self.database)
            .await?
            .into_iter()
            .map(Revision::try_from)
            .collect::<ResultEngine<_>>()?;

        let next = if page.len() as u64 > limit {
            page.truncate(limit as usize);
            match page.last() {
                Some(last) => Some(
                    RevisionsCursor {
                        edited_at: last.edited_at,
                        revision_id: last.id,
                    }
                    .encode()?,
                ),
                None => None,
            }
        } else {
            None
        };
        Ok((page, next))
    }
}
