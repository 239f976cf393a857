//! Receipt primitives.
//!
//! A `Receipt` is the central mutable record. It is never physically removed:
//! `deleted_at` marks a soft delete. Every committed mutation is paired with a
//! `Revision` (see [`crate::revisions`]).

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AmountCents, Currency, EngineError, ResultEngine};

/// Metadata of the uploaded file.
///
/// `storage_path` and `download_url` stay empty until the upload completes;
/// that is a valid pending state, not an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub content_type: String,
    pub size: i64,
    pub storage_path: String,
    pub download_url: String,
}

impl FileMeta {
    pub fn is_uploaded(&self) -> bool {
        !self.download_url.is_empty()
    }
}

/// Snapshot of who performed an edit, frozen at edit time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorRef {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub owner_user_id: String,
    pub uploaded_by_user_id: String,
    pub category_id: Uuid,
    /// Category name at submit/edit time.
    pub category_name: String,
    pub amount_cents: AmountCents,
    pub currency: Currency,
    /// Calendar date as entered (`YYYY-MM-DD`), no time of day.
    pub receipt_date: String,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<EditorRef>,
    pub edit_count: i64,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by_user_id: Option<String>,
    pub file: FileMeta,
}

impl Receipt {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Parsed calendar date, `None` when the stored string is malformed.
    pub fn date(&self) -> Option<NaiveDate> {
        parse_receipt_date(&self.receipt_date)
    }

    /// The mutable fields tracked by revisions.
    pub fn state(&self) -> ReceiptState {
        ReceiptState {
            category_id: self.category_id,
            category_name: self.category_name.clone(),
            amount_cents: self.amount_cents,
            receipt_date: self.receipt_date.clone(),
            currency: self.currency,
        }
    }
}

/// Full snapshot of the mutable receipt fields, as stored in revisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptState {
    pub category_id: Uuid,
    pub category_name: String,
    pub amount_cents: AmountCents,
    pub receipt_date: String,
    pub currency: Currency,
}

impl ReceiptState {
    /// Returns `self` with every field present in `patch` replaced.
    pub fn merged(&self, patch: &ReceiptPatch) -> ReceiptState {
        ReceiptState {
            category_id: patch.category_id.unwrap_or(self.category_id),
            category_name: patch
                .category_name
                .clone()
                .unwrap_or_else(|| self.category_name.clone()),
            amount_cents: patch.amount_cents.unwrap_or(self.amount_cents),
            receipt_date: patch
                .receipt_date
                .clone()
                .unwrap_or_else(|| self.receipt_date.clone()),
            currency: patch.currency.unwrap_or(self.currency),
        }
    }
}

/// The exact set of fields changed by one update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<AmountCents>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
}

impl ReceiptPatch {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.category_name.is_none()
            && self.amount_cents.is_none()
            && self.receipt_date.is_none()
            && self.currency.is_none()
    }
}

/// Parses a strict `YYYY-MM-DD` calendar date.
///
/// The result is a date, not an instant: comparing two of them never shifts a
/// receipt onto the neighbouring day the way a midnight-UTC timestamp would.
pub fn parse_receipt_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub(crate) fn validate_receipt_date(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidDate("receipt date is required".to_string()));
    }
    parse_receipt_date(trimmed)
        .map(|_| trimmed.to_string())
        .ok_or_else(|| EngineError::InvalidDate(format!("invalid receipt date: {trimmed}")))
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_user_id: String,
    pub uploaded_by_user_id: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub amount_cents: i64,
    pub currency: String,
    pub receipt_date: String,
    pub submitted_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
    pub updated_by_user_id: Option<String>,
    pub updated_by_name: Option<String>,
    pub updated_by_email: Option<String>,
    pub edit_count: i64,
    /// Compare-and-swap token, bumped by every committed mutation.
    pub version: i64,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by_user_id: Option<String>,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_storage_path: String,
    pub file_download_url: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::revisions::Entity")]
    Revisions,
}

impl Related<super::revisions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Revisions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Receipt> for ActiveModel {
    fn from(receipt: &Receipt) -> Self {
        Self {
            id: ActiveValue::Set(receipt.id),
            owner_user_id: ActiveValue::Set(receipt.owner_user_id.clone()),
            uploaded_by_user_id: ActiveValue::Set(receipt.uploaded_by_user_id.clone()),
            category_id: ActiveValue::Set(receipt.category_id),
            category_name: ActiveValue::Set(receipt.category_name.clone()),
            amount_cents: ActiveValue::Set(receipt.amount_cents.cents()),
            currency: ActiveValue::Set(receipt.currency.code().to_string()),
            receipt_date: ActiveValue::Set(receipt.receipt_date.clone()),
            submitted_at: ActiveValue::Set(receipt.submitted_at),
            updated_at: ActiveValue::Set(receipt.updated_at),
            updated_by_user_id: ActiveValue::Set(
                receipt.updated_by.as_ref().map(|e| e.user_id.clone()),
            ),
            updated_by_name: ActiveValue::Set(receipt.updated_by.as_ref().map(|e| e.name.clone())),
            updated_by_email: ActiveValue::Set(
                receipt.updated_by.as_ref().map(|e| e.email.clone()),
            ),
            edit_count: ActiveValue::Set(receipt.edit_count),
            version: ActiveValue::Set(0),
            deleted_at: ActiveValue::Set(receipt.deleted_at),
            deleted_by_user_id: ActiveValue::Set(receipt.deleted_by_user_id.clone()),
            file_name: ActiveValue::Set(receipt.file.name.clone()),
            file_type: ActiveValue::Set(receipt.file.content_type.clone()),
            file_size: ActiveValue::Set(receipt.file.size),
            file_storage_path: ActiveValue::Set(receipt.file.storage_path.clone()),
            file_download_url: ActiveValue::Set(receipt.file.download_url.clone()),
        }
    }
}

impl TryFrom<Model> for Receipt {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let updated_by = model.updated_by_user_id.map(|user_id| EditorRef {
            user_id,
            name: model.updated_by_name.unwrap_or_default(),
            email: model.updated_by_email.unwrap_or_default(),
        });
        Ok(Self {
            id: model.id,
            owner_user_id: model.owner_user_id,
            uploaded_by_user_id: model.uploaded_by_user_id,
            category_id: model.category_id,
            category_name: model.category_name,
            amount_cents: AmountCents::try_new(model.amount_cents)?,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            receipt_date: model.receipt_date,
            submitted_at: model.submitted_at,
            updated_at: model.updated_at,
            updated_by,
            edit_count: model.edit_count,
            deleted_at: model.deleted_at,
            deleted_by_user_id: model.deleted_by_user_id,
            file: FileMeta {
                name: model.file_name,
                content_type: model.file_type,
                size: model.file_size,
                storage_path: model.file_storage_path,
                download_url: model.file_download_url,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_strict_calendar_dates() {
        assert_eq!(
            parse_receipt_date("2024-02-29"),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(parse_receipt_date("2023-02-29"), None);
        assert_eq!(parse_receipt_date("2024-1-05"), None);
        assert_eq!(parse_receipt_date("05.01.2024"), None);
        assert_eq!(parse_receipt_date(""), None);
    }

    #[test]
    fn merge_replaces_only_patched_fields() {
        let before = ReceiptState {
            category_id: Uuid::nil(),
            category_name: "Travel".to_string(),
            amount_cents: AmountCents::try_new(1234).unwrap(),
            receipt_date: "2024-03-01".to_string(),
            currency: Currency::Eur,
        };
        let patch = ReceiptPatch {
            amount_cents: Some(AmountCents::try_new(2000).unwrap()),
            ..Default::default()
        };
        let after = before.merged(&patch);
        assert_eq!(after.amount_cents.cents(), 2000);
        assert_eq!(after.category_name, "Travel");
        assert_eq!(after.receipt_date, "2024-03-01");
    }

    #[test]
    fn patch_serializes_changed_fields_only() {
        let patch = ReceiptPatch {
            amount_cents: Some(AmountCents::try_new(2000).unwrap()),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "amountCents": 2000 }));
    }
}
