use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use tracing::info;

use crate::{
    Action, EngineError, Identity, Principal, ResultEngine, Role, User, UserStatus, blob,
    users, util::normalize_email, util::normalize_optional_text, util::normalize_required_name,
    whitelist,
};

use super::{Engine, LastOwnerPolicy, access::require, with_tx};

impl Engine {
    /// Resolves a freshly authenticated identity to a stored user.
    ///
    /// First sign-in creates a `member`. A whitelisted email is approved
    /// unless an explicit approve/deny decision already exists. A customised
    /// display name or avatar is never overwritten.
    pub async fn sign_in(&self, identity: &Identity) -> ResultEngine<User> {
        let principal_id = identity.principal_id.trim();
        if principal_id.is_empty() {
            return Err(EngineError::InvalidName(
                "principal id must not be empty".to_string(),
            ));
        }
        let email = normalize_email(&identity.email)?;
        let display_name = normalize_optional_text(Some(&identity.display_name));
        let avatar_url = normalize_optional_text(identity.avatar_url.as_deref());
        let now = Utc::now();

        let user = with_tx!(self, |db_tx| {
            let whitelisted = whitelist::Entity::find_by_id(email.clone())
                .one(&db_tx)
                .await?
                .is_some();
            let existing = users::Entity::find_by_id(principal_id.to_string())
                .one(&db_tx)
                .await?;

            let model = match existing {
                None => {
                    let status = if whitelisted {
                        UserStatus::Approved
                    } else {
                        UserStatus::Pending
                    };
                    info!(user_id = principal_id, status = status.as_str(), "new user");
                    users::ActiveModel {
                        id: ActiveValue::Set(principal_id.to_string()),
                        email: ActiveValue::Set(email.clone()),
                        role: ActiveValue::Set(Role::Member.as_str().to_string()),
                        status: ActiveValue::Set(status.as_str().to_string()),
                        display_name: ActiveValue::Set(display_name.clone().unwrap_or_default()),
                        avatar_url: ActiveValue::Set(avatar_url.clone()),
                        created_at: ActiveValue::Set(now),
                        last_login_at: ActiveValue::Set(now),
                        role_updated_at: ActiveValue::Set(None),
                        role_updated_by: ActiveValue::Set(None),
                    }
                    .insert(&db_tx)
                    .await?
                }
                Some(model) => {
                    let status = UserStatus::try_from(model.status.as_str())?;
                    let mut active: users::ActiveModel = model.clone().into();
                    active.email = ActiveValue::Set(email.clone());
                    active.last_login_at = ActiveValue::Set(now);
                    if status == UserStatus::Pending && whitelisted {
                        info!(user_id = principal_id, "approved by whitelist");
                        active.status = ActiveValue::Set(UserStatus::Approved.as_str().to_string());
                    }
                    if model.display_name.trim().is_empty()
                        && let Some(name) = &display_name
                    {
                        active.display_name = ActiveValue::Set(name.clone());
                    }
                    if model.avatar_url.is_none()
                        && let Some(url) = &avatar_url
                    {
                        active.avatar_url = ActiveValue::Set(Some(url.clone()));
                    }
                    active.update(&db_tx).await?
                }
            };
            User::try_from(model)
        })?;
        Ok(user)
    }

    pub async fn user(&self, user_id: &str) -> ResultEngine<User> {
        self.load_user(&self.database, user_id).await
    }

    /// Role and status of `user_id`, as stored right now.
    pub async fn principal(&self, user_id: &str) -> ResultEngine<Principal> {
        Ok(self.user(user_id).await?.principal())
    }

    /// Lists users, most recently active first.
    pub async fn list_users(
        &self,
        actor_id: &str,
        status: Option<UserStatus>,
    ) -> ResultEngine<Vec<User>> {
        let actor = self.require_principal(&self.database, actor_id).await?;
        require(&actor.principal(), Action::ListUsers, "not allowed to list users")?;

        let mut query = users::Entity::find();
        if let Some(status) = status {
            query = query.filter(users::Column::Status.eq(status.as_str()));
        }
        query
            .order_by_desc(users::Column::LastLoginAt)
            .order_by_asc(users::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    /// Approves or denies `target_id`.
    pub async fn set_user_status(
        &self,
        actor_id: &str,
        target_id: &str,
        status: UserStatus,
    ) -> ResultEngine<User> {
        if status == UserStatus::Pending {
            return Err(EngineError::InvalidState(
                "status must be approved or denied".to_string(),
            ));
        }

        let user = with_tx!(self, |db_tx| {
            let actor = self.require_principal(&db_tx, actor_id).await?;
            let target = self.load_user(&db_tx, target_id).await?;
            require(
                &actor.principal(),
                Action::ReviewUser {
                    target_user_id: &target.id,
                    target_role: target.role,
                },
                "not allowed to review this user",
            )?;

            let user = self.write_user_status(&db_tx, &target, status).await?;
            info!(actor_id, target_id, status = status.as_str(), "user reviewed");
            Ok(user)
        })?;
        Ok(user)
    }

    /// Sets the status of `target_id` without a principal check.
    ///
    /// Administrative; still subject to the last-owner policy.
    pub async fn force_user_status(
        &self,
        target_id: &str,
        status: UserStatus,
    ) -> ResultEngine<User> {
        let user = with_tx!(self, |db_tx| {
            let target = self.load_user(&db_tx, target_id).await?;
            self.write_user_status(&db_tx, &target, status).await
        })?;
        info!(target_id, status = status.as_str(), "user status forced");
        Ok(user)
    }

    async fn write_user_status(
        &self,
        db_tx: &DatabaseTransaction,
        target: &User,
        status: UserStatus,
    ) -> ResultEngine<User> {
        if self.policy.last_owner == LastOwnerPolicy::Protect
            && target.role == Role::Owner
            && target.status == UserStatus::Approved
            && status != UserStatus::Approved
            && self.approved_owner_count(db_tx).await? <= 1
        {
            return Err(EngineError::InvalidState(
                "cannot lock out the last owner".to_string(),
            ));
        }

        let model = users::ActiveModel {
            id: ActiveValue::Set(target.id.clone()),
            status: ActiveValue::Set(status.as_str().to_string()),
            ..Default::default()
        }
        .update(db_tx)
        .await?;
        User::try_from(model)
    }

    /// Promotes a `member` to `staff`. Owner only.
    pub async fn promote_to_staff(&self, actor_id: &str, target_id: &str) -> ResultEngine<User> {
        self.change_role(actor_id, target_id, Role::Staff).await
    }

    /// Demotes a `staff` user to `member`. Owner only, never themself.
    pub async fn demote_to_member(&self, actor_id: &str, target_id: &str) -> ResultEngine<User> {
        self.change_role(actor_id, target_id, Role::Member).await
    }

    async fn change_role(&self, actor_id: &str, target_id: &str, to: Role) -> ResultEngine<User> {
        let user = with_tx!(self, |db_tx| {
            let actor = self.require_principal(&db_tx, actor_id).await?;
            let target = self.load_user(&db_tx, target_id).await?;
            let action = match to {
                Role::Staff => Action::PromoteToStaff {
                    target_role: target.role,
                },
                _ => Action::DemoteToMember {
                    target_user_id: &target.id,
                    target_role: target.role,
                },
            };
            require(
                &actor.principal(),
                action,
                "not allowed to change this user's role",
            )?;

            let model = users::ActiveModel {
                id: ActiveValue::Set(target.id.clone()),
                role: ActiveValue::Set(to.as_str().to_string()),
                role_updated_at: ActiveValue::Set(Some(Utc::now())),
                role_updated_by: ActiveValue::Set(Some(actor.id.clone())),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            info!(actor_id, target_id, role = to.as_str(), "role changed");
            User::try_from(model)
        })?;
        Ok(user)
    }

    pub async fn update_profile(&self, user_id: &str, display_name: &str) -> ResultEngine<User> {
        let display_name = normalize_required_name(display_name, "display")?;
        self.load_user(&self.database, user_id).await?;
        let model = users::ActiveModel {
            id: ActiveValue::Set(user_id.to_string()),
            display_name: ActiveValue::Set(display_name),
            ..Default::default()
        }
        .update(&self.database)
        .await?;
        User::try_from(model)
    }

    /// Uploads a profile picture and returns its public URL.
    pub async fn upload_avatar(
        &self,
        user_id: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> ResultEngine<String> {
        self.check_file_size(&bytes)?;
        self.load_user(&self.database, user_id).await?;
        let path = blob::avatar_path(user_id, file_name)?;
        let url = self.blobs.put(&path, content_type, bytes).await?;
        users::ActiveModel {
            id: ActiveValue::Set(user_id.to_string()),
            avatar_url: ActiveValue::Set(Some(url.clone())),
            ..Default::default()
        }
        .update(&self.database)
        .await?;
        Ok(url)
    }

    /// Makes the signed-in user with `email` an approved owner.
    ///
    /// Administrative: no principal is checked.
    pub async fn bootstrap_owner(&self, email: &str) -> ResultEngine<User> {
        let email = normalize_email(email)?;
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email.clone()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("no user signed in as {email}")))?;
        let model = users::ActiveModel {
            id: ActiveValue::Set(model.id),
            role: ActiveValue::Set(Role::Owner.as_str().to_string()),
            status: ActiveValue::Set(UserStatus::Approved.as_str().to_string()),
            role_updated_at: ActiveValue::Set(Some(Utc::now())),
            role_updated_by: ActiveValue::Set(Some("bootstrap".to_string())),
            ..Default::default()
        }
        .update(&self.database)
        .await?;
        info!(user_id = %model.id, "owner bootstrapped");
        User::try_from(model)
    }
}
