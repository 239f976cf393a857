use chrono::Utc;
use sea_orm::{ActiveValue, QueryOrder, prelude::*, sea_query::OnConflict};
use tracing::info;

use crate::{
    Action, EngineError, ResultEngine, WhitelistEntry,
    util::{normalize_email, normalize_optional_text},
    whitelist,
};

use super::{Engine, access::require};

impl Engine {
    /// Adds or replaces a whitelist entry. Owner only.
    pub async fn add_whitelist_entry(
        &self,
        actor_id: &str,
        email: &str,
        note: Option<&str>,
    ) -> ResultEngine<WhitelistEntry> {
        let actor = self.require_principal(&self.database, actor_id).await?;
        require(&actor.principal(), Action::ManageWhitelist, "only the owner manages the whitelist")?;
        let email = normalize_email(email)?;

        let entry = whitelist::ActiveModel {
            email: ActiveValue::Set(email.clone()),
            note: ActiveValue::Set(normalize_optional_text(note).unwrap_or_default()),
            created_at: ActiveValue::Set(Utc::now()),
            created_by: ActiveValue::Set(actor.id.clone()),
        };
        whitelist::Entity::insert(entry)
            .on_conflict(
                OnConflict::column(whitelist::Column::Email)
                    .update_columns([
                        whitelist::Column::Note,
                        whitelist::Column::CreatedAt,
                        whitelist::Column::CreatedBy,
                    ])
                    .to_owned(),
            )
            .exec(&self.database)
            .await?;
        info!(actor_id, email = %email, "whitelist entry saved");

        whitelist::Entity::find_by_id(email)
            .one(&self.database)
            .await?
            .map(WhitelistEntry::from)
            .ok_or_else(|| EngineError::KeyNotFound("whitelist entry not exists".to_string()))
    }

    pub async fn remove_whitelist_entry(&self, actor_id: &str, email: &str) -> ResultEngine<()> {
        let actor = self.require_principal(&self.database, actor_id).await?;
        require(&actor.principal(), Action::ManageWhitelist, "only the owner manages the whitelist")?;
        let email = normalize_email(email)?;

        let result = whitelist::Entity::delete_by_id(email.clone())
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(
                "whitelist entry not exists".to_string(),
            ));
        }
        info!(actor_id, email = %email, "whitelist entry removed");
        Ok(())
    }

    /// Newest entries first.
    pub async fn list_whitelist(&self, actor_id: &str) -> ResultEngine<Vec<WhitelistEntry>> {
        let actor = self.require_principal(&self.database, actor_id).await?;
        require(&actor.principal(), Action::ManageWhitelist, "only the owner manages the whitelist")?;
        Ok(whitelist::Entity::find()
            .order_by_desc(whitelist::Column::CreatedAt)
            .order_by_asc(whitelist::Column::Email)
            .all(&self.database)
            .await?
            .into_iter()
            .map(WhitelistEntry::from)
            .collect())
    }

    /// Whether `email` is pre-approved. Administrative, no principal check.
    pub async fn is_whitelisted(&self, email: &str) -> ResultEngine<bool> {
        let email = normalize_email(email)?;
        Ok(whitelist::Entity::find_by_id(email)
            .one(&self.database)
            .await?
            .is_some())
    }
}
