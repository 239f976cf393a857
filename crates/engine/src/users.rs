//! Users table and the identity handed over by the identity provider.
//!
//! `id` is the opaque principal id issued by the identity provider.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Principal, Role, UserStatus};

/// What the identity provider tells us after a successful sign-in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub principal_id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal::new(self.id.clone(), self.role, self.status)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTimeUtc,
    pub last_login_at: DateTimeUtc,
    pub role_updated_at: Option<DateTimeUtc>,
    pub role_updated_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            role: Role::try_from(model.role.as_str())?,
            status: UserStatus::try_from(model.status.as_str())?,
            id: model.id,
            email: model.email,
            display_name: model.display_name,
            avatar_url: model.avatar_url,
            created_at: model.created_at,
            last_login_at: model.last_login_at,
        })
    }
}
