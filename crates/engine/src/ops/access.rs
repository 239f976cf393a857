use sea_orm::{ConnectionTrait, PaginatorTrait, QueryFilter, prelude::*};
use tracing::warn;
use uuid::Uuid;

use crate::{
    Action, EngineError, Principal, ResultEngine, Role, User, UserStatus, can_perform, categories,
    users,
};

use super::Engine;

/// Receipt mutations report missing and foreign receipts the same way.
pub(super) fn receipt_not_accessible() -> EngineError {
    EngineError::Forbidden("receipt not found or not accessible".to_string())
}

/// Fails with `Forbidden(message)` unless `principal` may perform `action`.
pub(super) fn require(principal: &Principal, action: Action<'_>, message: &str) -> ResultEngine<()> {
    if can_perform(principal, action) {
        return Ok(());
    }
    warn!(user_id = %principal.user_id, ?action, "access denied");
    Err(EngineError::Forbidden(message.to_string()))
}

impl Engine {
    pub(super) async fn load_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
        User::try_from(model)
    }

    /// Resolves `user_id` against live data and requires an approved account.
    pub(super) async fn require_principal<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<User> {
        let user = match self.load_user(db, user_id).await {
            Ok(user) => user,
            Err(EngineError::KeyNotFound(_)) => {
                return Err(EngineError::Forbidden("unknown principal".to_string()));
            }
            Err(err) => return Err(err),
        };
        if user.status != UserStatus::Approved {
            return Err(EngineError::Forbidden(format!(
                "account is {}",
                user.status.as_str()
            )));
        }
        Ok(user)
    }

    pub(super) async fn approved_owner_count<C: ConnectionTrait>(&self, db: &C) -> ResultEngine<u64> {
        users::Entity::find()
            .filter(users::Column::Role.eq(Role::Owner.as_str()))
            .filter(users::Column::Status.eq(UserStatus::Approved.as_str()))
            .count(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_category<C: ConnectionTrait>(
        &self,
        db: &C,
        category_id: Uuid,
    ) -> ResultEngine<categories::Model> {
        categories::Entity::find_by_id(category_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))
    }

    /// New receipts and category changes only accept active categories.
    pub(super) async fn require_active_category<C: ConnectionTrait>(
        &self,
        db: &C,
        category_id: Uuid,
    ) -> ResultEngine<categories::Model> {
        let category = self.require_category(db, category_id).await?;
        if !category.is_active {
            return Err(EngineError::InvalidState(format!(
                "category '{}' is inactive",
                category.name
            )));
        }
        Ok(category)
    }
}
