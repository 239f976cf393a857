//! Immutable audit records.
//!
//! A revision is written in the same database transaction as the receipt
//! mutation it describes and is never updated or deleted afterwards.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ReceiptPatch, ReceiptState, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionAction {
    Create,
    Update,
    Delete,
}

impl RevisionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl TryFrom<&str> for RevisionAction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(EngineError::InvalidState(format!(
                "invalid revision action: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub action: RevisionAction,
    pub edited_at: DateTime<Utc>,
    pub edited_by_user_id: String,
    pub edited_by_name: String,
    pub edited_by_email: String,
    pub before: Option<ReceiptState>,
    pub after: Option<ReceiptState>,
    pub patch: Option<ReceiptPatch>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "revisions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub receipt_id: Uuid,
    pub action: String,
    pub edited_at: DateTimeUtc,
    pub edited_by_user_id: String,
    pub edited_by_name: String,
    pub edited_by_email: String,
    pub before: Option<Json>,
    pub after: Option<Json>,
    pub patch: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::receipts::Entity",
        from = "Column::ReceiptId",
        to = "super::receipts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Receipt,
}

impl Related<super::receipts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipt.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn to_json<T: Serialize>(value: Option<&T>) -> ResultEngine<Option<Json>> {
    value
        .map(serde_json::to_value)
        .transpose()
        .map_err(|err| EngineError::InvalidState(format!("unserializable revision: {err}")))
}

fn from_json<T: for<'de> Deserialize<'de>>(value: Option<Json>) -> ResultEngine<Option<T>> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(|err| EngineError::InvalidState(format!("corrupt revision: {err}")))
}

impl TryFrom<&Revision> for ActiveModel {
    type Error = EngineError;

    fn try_from(revision: &Revision) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(revision.id),
            receipt_id: ActiveValue::Set(revision.receipt_id),
            action: ActiveValue::Set(revision.action.as_str().to_string()),
            edited_at: ActiveValue::Set(revision.edited_at),
            edited_by_user_id: ActiveValue::Set(revision.edited_by_user_id.clone()),
            edited_by_name: ActiveValue::Set(revision.edited_by_name.clone()),
            edited_by_email: ActiveValue::Set(revision.edited_by_email.clone()),
            before: ActiveValue::Set(to_json(revision.before.as_ref())?),
            after: ActiveValue::Set(to_json(revision.after.as_ref())?),
            patch: ActiveValue::Set(to_json(revision.patch.as_ref())?),
        })
    }
}

impl TryFrom<Model> for Revision {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            receipt_id: model.receipt_id,
            action: RevisionAction::try_from(model.action.as_str())?,
            edited_at: model.edited_at,
            edited_by_user_id: model.edited_by_user_id,
            edited_by_name: model.edited_by_name,
            edited_by_email: model.edited_by_email,
            before: from_json(model.before)?,
            after: from_json(model.after)?,
            patch: from_json(model.patch)?,
        })
    }
}
