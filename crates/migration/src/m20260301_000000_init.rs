//! Initial schema migration - creates all tables from scratch.
//!
//! - `users`: principals known to the desk, with role and status
//! - `whitelist`: pre-approved email addresses
//! - `categories`: expense categories
//! - `receipts`: submitted receipts, soft deleted via `deleted_at`
//! - `revisions`: append-only audit trail of receipt mutations

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    Role,
    Status,
    DisplayName,
    AvatarUrl,
    CreatedAt,
    LastLoginAt,
    RoleUpdatedAt,
    RoleUpdatedBy,
}

#[derive(Iden)]
enum Whitelist {
    Table,
    Email,
    Note,
    CreatedAt,
    CreatedBy,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    Name,
    NameNorm,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum Receipts {
    Table,
    Id,
    OwnerUserId,
    UploadedByUserId,
    CategoryId,
    CategoryName,
    AmountCents,
    Currency,
    ReceiptDate,
    SubmittedAt,
    UpdatedAt,
    UpdatedByUserId,
    UpdatedByName,
    UpdatedByEmail,
    EditCount,
    Version,
    DeletedAt,
    DeletedByUserId,
    FileName,
    FileType,
    FileSize,
    FileStoragePath,
    FileDownloadUrl,
}

#[derive(Iden)]
enum Revisions {
    Table,
    Id,
    ReceiptId,
    Action,
    EditedAt,
    EditedByUserId,
    EditedByName,
    EditedByEmail,
    Before,
    After,
    Patch,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(Users::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Users::DisplayName)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Users::AvatarUrl).string())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::LastLoginAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Users::RoleUpdatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::RoleUpdatedBy).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-status")
                    .table(Users::Table)
                    .col(Users::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Whitelist
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Whitelist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Whitelist::Email)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Whitelist::Note)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Whitelist::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Whitelist::CreatedBy).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(Categories::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Categories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-name_norm-unique")
                    .table(Categories::Table)
                    .col(Categories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Receipts
        // ───────────────────────────────────────────────────────────────────
        // No foreign key to categories: receipts keep their category snapshot
        // after the category is deleted.
        manager
            .create_table(
                Table::create()
                    .table(Receipts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Receipts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Receipts::OwnerUserId).string().not_null())
                    .col(
                        ColumnDef::new(Receipts::UploadedByUserId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Receipts::CategoryId).uuid().not_null())
                    .col(ColumnDef::new(Receipts::CategoryName).string().not_null())
                    .col(
                        ColumnDef::new(Receipts::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Receipts::Currency)
                            .string()
                            .not_null()
                            .default("EUR"),
                    )
                    .col(ColumnDef::new(Receipts::ReceiptDate).string().not_null())
                    .col(
                        ColumnDef::new(Receipts::SubmittedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Receipts::UpdatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Receipts::UpdatedByUserId).string())
                    .col(ColumnDef::new(Receipts::UpdatedByName).string())
                    .col(ColumnDef::new(Receipts::UpdatedByEmail).string())
                    .col(
                        ColumnDef::new(Receipts::EditCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Receipts::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Receipts::DeletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Receipts::DeletedByUserId).string())
                    .col(
                        ColumnDef::new(Receipts::FileName)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Receipts::FileType)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Receipts::FileSize)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Receipts::FileStoragePath)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Receipts::FileDownloadUrl)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-receipts-owner_user_id")
                            .from(Receipts::Table, Receipts::OwnerUserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-owner_user_id")
                    .table(Receipts::Table)
                    .col(Receipts::OwnerUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-receipt_date")
                    .table(Receipts::Table)
                    .col(Receipts::ReceiptDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Revisions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Revisions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Revisions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Revisions::ReceiptId).uuid().not_null())
                    .col(ColumnDef::new(Revisions::Action).string().not_null())
                    .col(
                        ColumnDef::new(Revisions::EditedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Revisions::EditedByUserId).string().not_null())
                    .col(ColumnDef::new(Revisions::EditedByName).string().not_null())
                    .col(ColumnDef::new(Revisions::EditedByEmail).string().not_null())
                    .col(ColumnDef::new(Revisions::Before).json())
                    .col(ColumnDef::new(Revisions::After).json())
                    .col(ColumnDef::new(Revisions::Patch).json())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-revisions-receipt_id")
                            .from(Revisions::Table, Revisions::ReceiptId)
                            .to(Receipts::Table, Receipts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-revisions-receipt_id")
                    .table(Revisions::Table)
                    .col(Revisions::ReceiptId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-revisions-edited_at")
                    .table(Revisions::Table)
                    .col(Revisions::EditedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Revisions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Receipts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Whitelist::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
