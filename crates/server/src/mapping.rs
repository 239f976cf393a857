//! Conversions between engine types and their wire representation.

use api_types::{
    category::CategoryView,
    receipt::{
        CategoryTotalView, EditorView, FileView, MonthTotalView, ReceiptListResponse, ReceiptQuery,
        ReceiptView,
    },
    revision::{ReceiptPatchView, ReceiptStateView, RevisionAction, RevisionView},
    user::{Role, UserStatus, UserView},
    whitelist::WhitelistEntryView,
};

pub fn currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Eur => api_types::Currency::Eur,
    }
}

pub fn currency_code(currency: api_types::Currency) -> &'static str {
    match currency {
        api_types::Currency::Eur => engine::Currency::Eur.code(),
    }
}

pub fn role(role: engine::Role) -> Role {
    match role {
        engine::Role::Member => Role::Member,
        engine::Role::Staff => Role::Staff,
        engine::Role::Owner => Role::Owner,
    }
}

pub fn status(status: engine::UserStatus) -> UserStatus {
    match status {
        engine::UserStatus::Pending => UserStatus::Pending,
        engine::UserStatus::Approved => UserStatus::Approved,
        engine::UserStatus::Denied => UserStatus::Denied,
    }
}

pub fn engine_status(status: UserStatus) -> engine::UserStatus {
    match status {
        UserStatus::Pending => engine::UserStatus::Pending,
        UserStatus::Approved => engine::UserStatus::Approved,
        UserStatus::Denied => engine::UserStatus::Denied,
    }
}

pub fn user(user: engine::User) -> UserView {
    UserView {
        role: role(user.role),
        status: status(user.status),
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        avatar_url: user.avatar_url,
        created_at: user.created_at,
        last_login_at: user.last_login_at,
    }
}

pub fn whitelist_entry(entry: engine::WhitelistEntry) -> WhitelistEntryView {
    WhitelistEntryView {
        email: entry.email,
        note: entry.note,
        created_at: entry.created_at,
        created_by: entry.created_by,
    }
}

pub fn category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        is_active: category.is_active,
    }
}

pub fn file(file: engine::FileMeta) -> FileView {
    FileView {
        name: file.name,
        content_type: file.content_type,
        size: file.size,
        storage_path: file.storage_path,
        download_url: file.download_url,
    }
}

pub fn receipt(receipt: engine::Receipt) -> ReceiptView {
    ReceiptView {
        id: receipt.id,
        owner_user_id: receipt.owner_user_id,
        uploaded_by_user_id: receipt.uploaded_by_user_id,
        category_id: receipt.category_id,
        category_name: receipt.category_name,
        amount_cents: receipt.amount_cents.cents(),
        currency: currency(receipt.currency),
        receipt_date: receipt.receipt_date,
        submitted_at: receipt.submitted_at,
        updated_at: receipt.updated_at,
        updated_by: receipt.updated_by.map(|editor| EditorView {
            user_id: editor.user_id,
            name: editor.name,
            email: editor.email,
        }),
        edit_count: receipt.edit_count,
        deleted_at: receipt.deleted_at,
        deleted_by_user_id: receipt.deleted_by_user_id,
        file: file(receipt.file),
    }
}

pub fn receipt_list(view: engine::ReceiptView) -> ReceiptListResponse {
    ReceiptListResponse {
        by_category: view
            .by_category
            .into_iter()
            .map(|total| CategoryTotalView {
                label: total.label(),
                category_id: total.category_id,
                category_name: total.category_name,
                total_cents: total.total_cents,
            })
            .collect(),
        by_month: view
            .by_month
            .into_iter()
            .map(|total| MonthTotalView {
                year_month: total.year_month,
                total_cents: total.total_cents,
            })
            .collect(),
        total_cents: view.total_cents,
        receipts: view.receipts.into_iter().map(receipt).collect(),
    }
}

pub fn filter(query: ReceiptQuery) -> engine::ReceiptFilter {
    engine::ReceiptFilter {
        owner_user_id: query.owner_user_id,
        category_id: query.category_id,
        date_from: query.date_from,
        date_to: query.date_to,
        include_deleted: query.include_deleted.unwrap_or(false),
        search: query.search,
    }
}

fn state(state: engine::ReceiptState) -> ReceiptStateView {
    ReceiptStateView {
        category_id: state.category_id,
        category_name: state.category_name,
        amount_cents: state.amount_cents.cents(),
        receipt_date: state.receipt_date,
        currency: currency(state.currency),
    }
}

fn patch(patch: engine::ReceiptPatch) -> ReceiptPatchView {
    ReceiptPatchView {
        category_id: patch.category_id,
        category_name: patch.category_name,
        amount_cents: patch.amount_cents.map(|amount| amount.cents()),
        receipt_date: patch.receipt_date,
        currency: patch.currency.map(currency),
    }
}

pub fn revision(revision: engine::Revision) -> RevisionView {
    RevisionView {
        id: revision.id,
        receipt_id: revision.receipt_id,
        action: match revision.action {
            engine::RevisionAction::Create => RevisionAction::Create,
            engine::RevisionAction::Update => RevisionAction::Update,
            engine::RevisionAction::Delete => RevisionAction::Delete,
        },
        edited_at: revision.edited_at,
        edited_by_user_id: revision.edited_by_user_id,
        edited_by_name: revision.edited_by_name,
        edited_by_email: revision.edited_by_email,
        before: revision.before.map(state),
        after: revision.after.map(state),
        patch: revision.patch.map(patch),
    }
}
