use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub mod user {
    use super::*;

    /// Role of a user on the desk.
    ///
    /// - `member`: submits and manages their own receipts.
    /// - `staff`: sees and edits every receipt, reviews members.
    /// - `owner`: everything staff can do, plus role changes and the whitelist.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Role {
        Member,
        Staff,
        Owner,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum UserStatus {
        Pending,
        Approved,
        Denied,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: String,
        pub email: String,
        pub role: Role,
        pub status: UserStatus,
        pub display_name: String,
        pub avatar_url: Option<String>,
        pub created_at: DateTime<Utc>,
        pub last_login_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserList {
        pub status: Option<UserStatus>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserListResponse {
        pub users: Vec<UserView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfileUpdate {
        pub display_name: String,
    }

    /// Review decision: only `approved` or `denied` are accepted.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatusUpdate {
        pub status: UserStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AvatarUploaded {
        pub avatar_url: String,
    }
}

pub mod whitelist {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WhitelistNew {
        pub email: String,
        pub note: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WhitelistEntryView {
        pub email: String,
        pub note: String,
        pub created_at: DateTime<Utc>,
        pub created_by: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WhitelistResponse {
        pub entries: Vec<WhitelistEntryView>,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryList {
        pub include_inactive: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryCreate {
        pub name: String,
    }

    /// At least one of `name` or `is_active` must be present.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        pub is_active: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub is_active: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryListResponse {
        pub categories: Vec<CategoryView>,
    }
}

pub mod receipt {
    use super::*;

    /// Query string of `GET /receipts` and `GET /export`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReceiptQuery {
        pub owner_user_id: Option<String>,
        pub category_id: Option<Uuid>,
        pub date_from: Option<NaiveDate>,
        pub date_to: Option<NaiveDate>,
        pub include_deleted: Option<bool>,
        pub search: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FileNew {
        pub name: String,
        pub content_type: String,
        pub size: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptNew {
        /// Defaults to the caller. Staff may submit for someone else.
        pub owner_user_id: Option<String>,
        pub category_id: Uuid,
        /// Decimal string, e.g. `"12.34"` or `"12,34"`.
        pub amount: String,
        /// `YYYY-MM-DD`.
        pub receipt_date: String,
        pub currency: Option<Currency>,
        pub file: Option<FileNew>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptUpdate {
        pub category_id: Option<Uuid>,
        pub amount: Option<String>,
        pub receipt_date: Option<String>,
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FileView {
        pub name: String,
        pub content_type: String,
        pub size: i64,
        pub storage_path: String,
        /// Empty while the upload is pending.
        pub download_url: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EditorView {
        pub user_id: String,
        pub name: String,
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptView {
        pub id: Uuid,
        pub owner_user_id: String,
        pub uploaded_by_user_id: String,
        pub category_id: Uuid,
        pub category_name: String,
        pub amount_cents: i64,
        pub currency: Currency,
        pub receipt_date: String,
        pub submitted_at: DateTime<Utc>,
        pub updated_at: Option<DateTime<Utc>>,
        pub updated_by: Option<EditorView>,
        pub edit_count: i64,
        pub deleted_at: Option<DateTime<Utc>>,
        pub deleted_by_user_id: Option<String>,
        pub file: FileView,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryTotalView {
        pub category_id: Uuid,
        pub category_name: String,
        /// Display label, truncated for charts.
        pub label: String,
        pub total_cents: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthTotalView {
        pub year_month: String,
        pub total_cents: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptListResponse {
        pub receipts: Vec<ReceiptView>,
        pub total_cents: i64,
        pub by_category: Vec<CategoryTotalView>,
        pub by_month: Vec<MonthTotalView>,
    }
}

pub mod revision {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RevisionAction {
        Create,
        Update,
        Delete,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptStateView {
        pub category_id: Uuid,
        pub category_name: String,
        pub amount_cents: i64,
        pub receipt_date: String,
        pub currency: Currency,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReceiptPatchView {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category_id: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub amount_cents: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub receipt_date: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RevisionView {
        pub id: Uuid,
        pub receipt_id: Uuid,
        pub action: RevisionAction,
        pub edited_at: DateTime<Utc>,
        pub edited_by_user_id: String,
        pub edited_by_name: String,
        pub edited_by_email: String,
        pub before: Option<ReceiptStateView>,
        pub after: Option<ReceiptStateView>,
        pub patch: Option<ReceiptPatchView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RevisionList {
        pub limit: Option<u64>,
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RevisionListResponse {
        pub revisions: Vec<RevisionView>,
        /// Pass back as `cursor` to fetch the next, older page.
        pub next_cursor: Option<String>,
    }
}
