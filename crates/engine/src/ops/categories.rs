use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Action, Category, EngineError, ResultEngine, categories,
    util::{category_name_key, normalize_required_name},
};

use super::{Engine, access::require};

impl Engine {
    async fn ensure_category_name_free<C: ConnectionTrait>(
        &self,
        db: &C,
        name_norm: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = categories::Entity::find()
            .filter(categories::Column::NameNorm.eq(name_norm.to_string()));
        if let Some(id) = except {
            query = query.filter(categories::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(name_norm.to_string()));
        }
        Ok(())
    }

    pub async fn create_category(&self, actor_id: &str, name: &str) -> ResultEngine<Category> {
        let actor = self.require_principal(&self.database, actor_id).await?;
        require(&actor.principal(), Action::ManageCategories, "not allowed to manage categories")?;
        let name = normalize_required_name(name, "category")?;
        let name_norm = category_name_key(&name);
        self.ensure_category_name_free(&self.database, &name_norm, None)
            .await?;

        let model = categories::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            name: ActiveValue::Set(name),
            name_norm: ActiveValue::Set(name_norm),
            is_active: ActiveValue::Set(true),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await?;
        info!(actor_id, category_id = %model.id, "category created");
        Ok(model.into())
    }

    /// Renames a category. Receipts keep the name they were filed under.
    pub async fn rename_category(
        &self,
        actor_id: &str,
        category_id: Uuid,
        name: &str,
    ) -> ResultEngine<Category> {
        let actor = self.require_principal(&self.database, actor_id).await?;
        require(&actor.principal(), Action::ManageCategories, "not allowed to manage categories")?;
        let name = normalize_required_name(name, "category")?;
        let name_norm = category_name_key(&name);
        self.require_category(&self.database, category_id).await?;
        self.ensure_category_name_free(&self.database, &name_norm, Some(category_id))
            .await?;

        let model = categories::ActiveModel {
            id: ActiveValue::Set(category_id),
            name: ActiveValue::Set(name),
            name_norm: ActiveValue::Set(name_norm),
            ..Default::default()
        }
        .update(&self.database)
        .await?;
        Ok(model.into())
    }

    pub async fn set_category_active(
        &self,
        actor_id: &str,
        category_id: Uuid,
        active: bool,
    ) -> ResultEngine<Category> {
        let actor = self.require_principal(&self.database, actor_id).await?;
        require(&actor.principal(), Action::ManageCategories, "not allowed to manage categories")?;
        self.require_category(&self.database, category_id).await?;

        let model = categories::ActiveModel {
            id: ActiveValue::Set(category_id),
            is_active: ActiveValue::Set(active),
            ..Default::default()
        }
        .update(&self.database)
        .await?;
        Ok(model.into())
    }

    /// Removes a category for good. Receipts filed under it are untouched.
    pub async fn delete_category(&self, actor_id: &str, category_id: Uuid) -> ResultEngine<()> {
        let actor = self.require_principal(&self.database, actor_id).await?;
        require(&actor.principal(), Action::ManageCategories, "not allowed to manage categories")?;
        let result = categories::Entity::delete_by_id(category_id)
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("category not exists".to_string()));
        }
        info!(actor_id, %category_id, "category deleted");
        Ok(())
    }

    /// Categories sorted by name. Inactive ones are for staff only.
    pub async fn list_categories(
        &self,
        actor_id: &str,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Category>> {
        let actor = self.require_principal(&self.database, actor_id).await?;
        let action = if include_inactive {
            Action::ManageCategories
        } else {
            Action::ViewCategories
        };
        require(&actor.principal(), action, "not allowed to list categories")?;

        let mut query = categories::Entity::find();
        if !include_inactive {
            query = query.filter(categories::Column::IsActive.eq(true));
        }
        Ok(query
            .order_by_asc(categories::Column::NameNorm)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Category::from)
            .collect())
    }
}
