//! Export formatter.
//!
//! Renders a filtered receipt set as comma separated text: one header line
//! taken from the row's field names, the summary row, then one line per row.

use std::collections::HashMap;

use csv::{Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Receipt, ResultEngine, views::sum_cents};

/// Returned instead of an empty document.
pub const NO_DATA: &str = "no_data\n";
pub const SUMMARY_ID: &str = "SUMMARY";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptExportRow {
    pub receipt_id: String,
    pub receipt_date: String,
    /// `dd.mm.yyyy`
    pub receipt_date_pretty: String,
    pub category: String,
    pub owner_user_id: String,
    pub owner_name: String,
    pub amount_cents: i64,
    #[serde(rename = "amountEUR")]
    pub amount_eur: String,
    /// `yes` or `no`; empty on the summary row.
    pub deleted: String,
}

impl ReceiptExportRow {
    pub fn from_receipt(receipt: &Receipt, owner_name: &str) -> Self {
        Self {
            receipt_id: receipt.id.to_string(),
            receipt_date: receipt.receipt_date.clone(),
            receipt_date_pretty: receipt
                .date()
                .map(|d| d.format("%d.%m.%Y").to_string())
                .unwrap_or_default(),
            category: receipt.category_name.clone(),
            owner_user_id: receipt.owner_user_id.clone(),
            owner_name: owner_name.to_string(),
            amount_cents: receipt.amount_cents.cents(),
            amount_eur: receipt.amount_cents.to_major_string(),
            deleted: if receipt.is_deleted() { "yes" } else { "no" }.to_string(),
        }
    }

    /// The `SUMMARY` row carrying the total of `receipts`.
    pub fn summary<'a>(receipts: impl IntoIterator<Item = &'a Receipt>) -> Self {
        let total = sum_cents(receipts);
        Self {
            receipt_id: SUMMARY_ID.to_string(),
            receipt_date: String::new(),
            receipt_date_pretty: String::new(),
            category: String::new(),
            owner_user_id: String::new(),
            owner_name: String::new(),
            amount_cents: total,
            amount_eur: format!("{}.{:02}", total / 100, total % 100),
            deleted: String::new(),
        }
    }
}

/// Rows for `receipts` in input order. Owners missing from `owner_names` get
/// an empty name.
pub fn export_rows(
    receipts: &[&Receipt],
    owner_names: &HashMap<String, String>,
) -> Vec<ReceiptExportRow> {
    receipts
        .iter()
        .map(|r| {
            let name = owner_names
                .get(&r.owner_user_id)
                .map(String::as_str)
                .unwrap_or_default();
            ReceiptExportRow::from_receipt(r, name)
        })
        .collect()
}

/// Serializes `summary` followed by `rows`.
///
/// Fields containing a comma, a quote or a newline are quoted with doubled
/// inner quotes. An empty `rows` yields [`NO_DATA`].
pub fn to_delimited_text<T: Serialize>(rows: &[T], summary: &T) -> ResultEngine<String> {
    if rows.is_empty() {
        return Ok(NO_DATA.to_string());
    }

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(vec![]);
    for row in std::iter::once(summary).chain(rows) {
        writer
            .serialize(row)
            .map_err(|err| EngineError::Export(err.to_string()))?;
    }
    let data = writer
        .into_inner()
        .map_err(|err| EngineError::Export(err.to_string()))?;
    String::from_utf8(data).map_err(|err| EngineError::Export(err.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::{AmountCents, Currency, FileMeta};

    fn receipt(category: &str, cents: i64, date: &str) -> Receipt {
        Receipt {
            id: Uuid::from_u128(7),
            owner_user_id: "alice".to_string(),
            uploaded_by_user_id: "alice".to_string(),
            category_id: Uuid::nil(),
            category_name: category.to_string(),
            amount_cents: AmountCents::try_new(cents).unwrap(),
            currency: Currency::Eur,
            receipt_date: date.to_string(),
            submitted_at: Utc::now(),
            updated_at: None,
            updated_by: None,
            edit_count: 0,
            deleted_at: None,
            deleted_by_user_id: None,
            file: FileMeta::default(),
        }
    }

    #[test]
    fn empty_rows_yield_sentinel() {
        let summary = ReceiptExportRow::summary([]);
        let out = to_delimited_text::<ReceiptExportRow>(&[], &summary).unwrap();
        assert_eq!(out, NO_DATA);
    }

    #[test]
    fn header_summary_then_rows() {
        let receipts = [receipt("Travel", 1234, "2024-03-05")];
        let refs: Vec<&Receipt> = receipts.iter().collect();
        let names = HashMap::from([("alice".to_string(), "Alice".to_string())]);
        let rows = export_rows(&refs, &names);
        let out = to_delimited_text(&rows, &ReceiptExportRow::summary(refs.iter().copied())).unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "receiptId,receiptDate,receiptDatePretty,category,ownerUserId,ownerName,amountCents,amountEUR,deleted"
        );
        assert_eq!(lines[1], "SUMMARY,,,,,,1234,12.34,");
        assert_eq!(
            lines[2],
            "00000000-0000-0000-0000-000000000007,2024-03-05,05.03.2024,Travel,alice,Alice,1234,12.34,no"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn quoted_fields_survive_a_reader_round_trip() {
        let receipts = [receipt("Food, \"fancy\"\ndinner", 500, "2024-01-01")];
        let refs: Vec<&Receipt> = receipts.iter().collect();
        let rows = export_rows(&refs, &HashMap::new());
        let out = to_delimited_text(&rows, &ReceiptExportRow::summary(refs.iter().copied())).unwrap();
        assert!(out.contains("\"Food, \"\"fancy\"\"\ndinner\""));

        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let parsed: Vec<ReceiptExportRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1], rows[0]);
        assert_eq!(parsed[1].category, "Food, \"fancy\"\ndinner");
        assert_eq!(parsed[1].owner_name, "");
    }
}
