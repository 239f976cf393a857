//! Command structs for receipt writes.
//!
//! These types group parameters for create/update, keeping call sites readable
//! and avoiding long argument lists. Amounts arrive as the string the user
//! typed; [`CreateReceiptCmd::validate`] and [`UpdateReceiptCmd::validate`]
//! turn them into typed values before any transaction starts.

use uuid::Uuid;

use crate::{AmountCents, Currency, EngineError, ResultEngine, receipts::validate_receipt_date};

/// File metadata known at submit time. Storage location is filled in by the
/// upload.
#[derive(Clone, Debug, Default)]
pub struct FileInput {
    pub name: String,
    pub content_type: String,
    pub size: i64,
}

/// Submit a new receipt.
#[derive(Clone, Debug)]
pub struct CreateReceiptCmd {
    /// The acting principal.
    pub user_id: String,
    /// Owner of the receipt; defaults to `user_id`.
    pub owner_user_id: Option<String>,
    pub category_id: Uuid,
    pub amount: String,
    pub receipt_date: String,
    pub currency: Option<String>,
    pub file: Option<FileInput>,
}

impl CreateReceiptCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        category_id: Uuid,
        amount: impl Into<String>,
        receipt_date: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            owner_user_id: None,
            category_id,
            amount: amount.into(),
            receipt_date: receipt_date.into(),
            currency: None,
            file: None,
        }
    }

    #[must_use]
    pub fn owner_user_id(mut self, owner_user_id: impl Into<String>) -> Self {
        self.owner_user_id = Some(owner_user_id.into());
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        content_type: impl Into<String>,
        size: i64,
    ) -> Self {
        self.file = Some(FileInput {
            name: name.into(),
            content_type: content_type.into(),
            size,
        });
        self
    }

    /// Every receipt is submitted with the scan it documents; the upload
    /// itself may complete later.
    pub(crate) fn validate(&self, max_file_bytes: u64) -> ResultEngine<ValidatedCreate> {
        let amount_cents = self.amount.parse::<AmountCents>()?;
        let receipt_date = validate_receipt_date(&self.receipt_date)?;
        let currency = parse_currency(self.currency.as_deref())?.unwrap_or_default();
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| EngineError::InvalidFile("a receipt file is required".to_string()))?;
        if file.name.trim().is_empty() {
            return Err(EngineError::InvalidFile("file name is required".to_string()));
        }
        if file.size <= 0 {
            return Err(EngineError::InvalidFile("file is empty".to_string()));
        }
        if file.size as u64 > max_file_bytes {
            return Err(EngineError::InvalidFile(format!(
                "file exceeds {max_file_bytes} bytes"
            )));
        }
        Ok(ValidatedCreate {
            file: FileInput {
                name: file.name.trim().to_string(),
                content_type: file.content_type.trim().to_string(),
                size: file.size,
            },
            owner_user_id: self
                .owner_user_id
                .clone()
                .unwrap_or_else(|| self.user_id.clone()),
            amount_cents,
            receipt_date,
            currency,
        })
    }
}

#[derive(Debug)]
pub(crate) struct ValidatedCreate {
    pub(crate) owner_user_id: String,
    pub(crate) amount_cents: AmountCents,
    pub(crate) receipt_date: String,
    pub(crate) currency: Currency,
    pub(crate) file: FileInput,
}

/// Change some of the mutable fields of a receipt.
///
/// Only the fields that are set end up in the revision patch.
#[derive(Clone, Debug)]
pub struct UpdateReceiptCmd {
    pub receipt_id: Uuid,
    pub user_id: String,
    pub category_id: Option<Uuid>,
    pub amount: Option<String>,
    pub receipt_date: Option<String>,
    pub currency: Option<String>,
}

impl UpdateReceiptCmd {
    #[must_use]
    pub fn new(receipt_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            receipt_id,
            user_id: user_id.into(),
            category_id: None,
            amount: None,
            receipt_date: None,
            currency: None,
        }
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    #[must_use]
    pub fn receipt_date(mut self, receipt_date: impl Into<String>) -> Self {
        self.receipt_date = Some(receipt_date.into());
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub(crate) fn validate(&self) -> ResultEngine<ValidatedUpdate> {
        let amount_cents = self
            .amount
            .as_deref()
            .map(str::parse::<AmountCents>)
            .transpose()?;
        let receipt_date = self
            .receipt_date
            .as_deref()
            .map(validate_receipt_date)
            .transpose()?;
        let currency = parse_currency(self.currency.as_deref())?;
        if self.category_id.is_none()
            && amount_cents.is_none()
            && receipt_date.is_none()
            && currency.is_none()
        {
            return Err(EngineError::InvalidState(
                "update must change at least one field".to_string(),
            ));
        }
        Ok(ValidatedUpdate {
            category_id: self.category_id,
            amount_cents,
            receipt_date,
            currency,
        })
    }
}

pub(crate) struct ValidatedUpdate {
    pub(crate) category_id: Option<Uuid>,
    pub(crate) amount_cents: Option<AmountCents>,
    pub(crate) receipt_date: Option<String>,
    pub(crate) currency: Option<Currency>,
}

fn parse_currency(value: Option<&str>) -> ResultEngine<Option<Currency>> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Currency::try_from)
        .transpose()
}
