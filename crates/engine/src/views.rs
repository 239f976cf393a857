//! Aggregation & filter engine.
//!
//! Pure functions deriving read-only views from a snapshot of receipts. They
//! are recomputed from scratch whenever a new snapshot arrives and never
//! mutate their input.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Receipt;

/// How many category groups a breakdown keeps.
pub const TOP_CATEGORIES: usize = 12;
/// Category labels longer than this are shortened for display.
pub const CATEGORY_LABEL_MAX_CHARS: usize = 18;
const UNKNOWN_CATEGORY_NAME: &str = "Unknown";

/// Filters for receipt views.
///
/// Date bounds are inclusive calendar dates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFilter {
    pub owner_user_id: Option<String>,
    pub category_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// If true, includes soft-deleted receipts (default: false).
    pub include_deleted: bool,
    /// Case-insensitive substring over category, date, owner and file name.
    pub search: Option<String>,
}

impl ReceiptFilter {
    fn has_date_bounds(&self) -> bool {
        self.date_from.is_some() || self.date_to.is_some()
    }

    /// Returns whether `receipt` satisfies every set criterion.
    pub fn matches(&self, receipt: &Receipt) -> bool {
        if !self.include_deleted && receipt.is_deleted() {
            return false;
        }
        if let Some(owner) = &self.owner_user_id
            && &receipt.owner_user_id != owner
        {
            return false;
        }
        if let Some(category_id) = self.category_id
            && receipt.category_id != category_id
        {
            return false;
        }
        if self.has_date_bounds() {
            let Some(date) = receipt.date() else {
                return false;
            };
            if self.date_from.is_some_and(|from| date < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| date > to) {
                return false;
            }
        }
        if let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let haystack = format!(
                "{} {} {} {}",
                receipt.category_name, receipt.receipt_date, receipt.owner_user_id, receipt.file.name
            )
            .to_lowercase();
            if !haystack.contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Receipts matching `filter`, newest receipt date first.
///
/// Ties keep their input order. Receipts with an unparseable date sort last.
pub fn filter_receipts<'a>(
    receipts: impl IntoIterator<Item = &'a Receipt>,
    filter: &ReceiptFilter,
) -> Vec<&'a Receipt> {
    let mut out: Vec<&Receipt> = receipts.into_iter().filter(|r| filter.matches(r)).collect();
    out.sort_by(|a, b| b.date().cmp(&a.date()));
    out
}

/// Exact integer sum of the amounts, in cents.
///
/// Amounts are capped at [`AmountCents::MAX`], so the sum stays exact for any
/// realistic ledger; it saturates instead of wrapping beyond that.
///
/// [`AmountCents::MAX`]: crate::AmountCents::MAX
pub fn sum_cents<'a>(receipts: impl IntoIterator<Item = &'a Receipt>) -> i64 {
    receipts
        .into_iter()
        .fold(0, |total, r| total.saturating_add(r.amount_cents.cents()))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category_id: Uuid,
    pub category_name: String,
    pub total_cents: i64,
}

impl CategoryTotal {
    /// Display label; the totals are unaffected by truncation.
    pub fn label(&self) -> String {
        truncate_label(&self.category_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthTotal {
    /// `YYYY-MM`.
    pub year_month: String,
    pub total_cents: i64,
}

pub fn truncate_label(name: &str) -> String {
    if name.chars().count() <= CATEGORY_LABEL_MAX_CHARS {
        return name.to_string();
    }
    let mut out: String = name.chars().take(CATEGORY_LABEL_MAX_CHARS).collect();
    out.push('…');
    out
}

/// Every category group, largest total first.
///
/// Groups are keyed by category id; the name comes from the first receipt
/// seen for that id.
pub fn category_totals<'a>(receipts: impl IntoIterator<Item = &'a Receipt>) -> Vec<CategoryTotal> {
    let mut groups: Vec<CategoryTotal> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();

    for receipt in receipts {
        let slot = *index.entry(receipt.category_id).or_insert_with(|| {
            let name = if receipt.category_name.trim().is_empty() {
                UNKNOWN_CATEGORY_NAME.to_string()
            } else {
                receipt.category_name.clone()
            };
            groups.push(CategoryTotal {
                category_id: receipt.category_id,
                category_name: name,
                total_cents: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total_cents = group.total_cents.saturating_add(receipt.amount_cents.cents());
    }

    groups.sort_by(|a, b| b.total_cents.cmp(&a.total_cents));
    groups
}

/// The [`TOP_CATEGORIES`] largest category groups.
pub fn group_by_category<'a>(
    receipts: impl IntoIterator<Item = &'a Receipt>,
) -> Vec<CategoryTotal> {
    let mut groups = category_totals(receipts);
    groups.truncate(TOP_CATEGORIES);
    groups
}

/// Totals per `YYYY-MM`, ascending. Receipts with unparseable dates are left
/// out.
pub fn group_by_month<'a>(receipts: impl IntoIterator<Item = &'a Receipt>) -> Vec<MonthTotal> {
    let mut months: BTreeMap<String, i64> = BTreeMap::new();
    for receipt in receipts {
        let Some(date) = receipt.date() else {
            continue;
        };
        let key = format!("{:04}-{:02}", date.year(), date.month());
        let total = months.entry(key).or_insert(0);
        *total = total.saturating_add(receipt.amount_cents.cents());
    }
    months
        .into_iter()
        .map(|(year_month, total_cents)| MonthTotal {
            year_month,
            total_cents,
        })
        .collect()
}

/// Everything a dashboard shows for one filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptView {
    pub receipts: Vec<Receipt>,
    pub total_cents: i64,
    pub by_category: Vec<CategoryTotal>,
    pub by_month: Vec<MonthTotal>,
}

impl ReceiptView {
    pub fn compute(receipts: &[Receipt], filter: &ReceiptFilter) -> Self {
        let filtered = filter_receipts(receipts, filter);
        Self {
            total_cents: sum_cents(filtered.iter().copied()),
            by_category: group_by_category(filtered.iter().copied()),
            by_month: group_by_month(filtered.iter().copied()),
            receipts: filtered.into_iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{AmountCents, Currency, FileMeta};

    fn category(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn receipt(owner: &str, cat: u128, name: &str, cents: i64, date: &str) -> Receipt {
        Receipt {
            id: Uuid::new_v4(),
            owner_user_id: owner.to_string(),
            uploaded_by_user_id: owner.to_string(),
            category_id: category(cat),
            category_name: name.to_string(),
            amount_cents: AmountCents::try_new(cents).unwrap(),
            currency: Currency::Eur,
            receipt_date: date.to_string(),
            submitted_at: Utc::now(),
            updated_at: None,
            updated_by: None,
            edit_count: 0,
            deleted_at: None,
            deleted_by_user_id: None,
            file: FileMeta {
                name: format!("{name}.pdf"),
                ..Default::default()
            },
        }
    }

    fn deleted(mut r: Receipt) -> Receipt {
        r.deleted_at = Some(Utc::now());
        r
    }

    fn day(s: &str) -> NaiveDate {
        crate::parse_receipt_date(s).unwrap()
    }

    fn sample() -> Vec<Receipt> {
        vec![
            receipt("alice", 1, "Travel", 1000, "2024-01-15"),
            receipt("bob", 2, "Food", 250, "2024-02-01"),
            deleted(receipt("alice", 2, "Food", 999, "2024-02-10")),
            receipt("alice", 1, "Travel", 500, "2024-03-31"),
            receipt("bob", 3, "Office", 75, "not-a-date"),
        ]
    }

    #[test]
    fn excludes_deleted_by_default() {
        let data = sample();
        let out = filter_receipts(&data, &ReceiptFilter::default());
        assert_eq!(out.len(), 4);
        assert_eq!(sum_cents(out), 1825);

        let with_deleted = ReceiptFilter {
            include_deleted: true,
            ..Default::default()
        };
        assert_eq!(sum_cents(filter_receipts(&data, &with_deleted)), 2824);
    }

    #[test]
    fn totals_of_maximal_amounts_stay_exact() {
        let max = AmountCents::MAX.cents();
        let data: Vec<Receipt> = (0..1_000)
            .map(|_| receipt("alice", 1, "Travel", max, "2024-05-02"))
            .collect();
        let view = ReceiptView::compute(&data, &ReceiptFilter::default());
        assert_eq!(view.total_cents, max * 1_000);
        assert_eq!(view.by_category[0].total_cents, max * 1_000);
        assert_eq!(view.by_month[0].total_cents, max * 1_000);
    }

    #[test]
    fn sorts_by_date_descending_with_unparseable_last() {
        let data = sample();
        let dates: Vec<&str> = filter_receipts(&data, &ReceiptFilter::default())
            .into_iter()
            .map(|r| r.receipt_date.as_str())
            .collect();
        assert_eq!(dates, ["2024-03-31", "2024-02-01", "2024-01-15", "not-a-date"]);
    }

    #[test]
    fn date_bounds_are_inclusive_and_drop_unparseable() {
        let data = sample();
        let filter = ReceiptFilter {
            date_from: Some(day("2024-02-01")),
            date_to: Some(day("2024-03-31")),
            ..Default::default()
        };
        let out = filter_receipts(&data, &filter);
        assert_eq!(out.len(), 2);
        assert_eq!(sum_cents(out), 750);

        let only_to = ReceiptFilter {
            date_to: Some(day("2024-01-15")),
            ..Default::default()
        };
        assert_eq!(sum_cents(filter_receipts(&data, &only_to)), 1000);
    }

    #[test]
    fn sum_matches_predicate_for_combined_filters() {
        let data = sample();
        let filters = [
            ReceiptFilter {
                owner_user_id: Some("alice".to_string()),
                ..Default::default()
            },
            ReceiptFilter {
                owner_user_id: Some("alice".to_string()),
                include_deleted: true,
                ..Default::default()
            },
            ReceiptFilter {
                category_id: Some(category(2)),
                include_deleted: true,
                date_from: Some(day("2024-02-05")),
                ..Default::default()
            },
            ReceiptFilter {
                search: Some("TRAV".to_string()),
                ..Default::default()
            },
        ];
        for filter in filters {
            let expected: i64 = data
                .iter()
                .filter(|r| filter.matches(r))
                .map(|r| r.amount_cents.cents())
                .sum();
            assert_eq!(sum_cents(filter_receipts(&data, &filter)), expected);
        }
    }

    #[test]
    fn groups_by_category_descending() {
        let data = sample();
        let filtered = filter_receipts(&data, &ReceiptFilter::default());
        let groups = group_by_category(filtered);
        let names: Vec<&str> = groups.iter().map(|g| g.category_name.as_str()).collect();
        assert_eq!(names, ["Travel", "Food", "Office"]);
        assert_eq!(groups[0].total_cents, 1500);
    }

    #[test]
    fn category_breakdown_keeps_top_twelve_and_totals_reconcile() {
        let data: Vec<Receipt> = (0..15)
            .map(|i| receipt("alice", i as u128, &format!("Category {i}"), 100 + i, "2024-05-05"))
            .collect();
        let all = category_totals(&data);
        let top = group_by_category(&data);
        assert_eq!(top.len(), TOP_CATEGORIES);
        assert_eq!(top[0].total_cents, 114);

        let beyond: i64 = all[TOP_CATEGORIES..].iter().map(|g| g.total_cents).sum();
        let shown: i64 = top.iter().map(|g| g.total_cents).sum();
        assert_eq!(shown + beyond, sum_cents(&data));
    }

    #[test]
    fn long_labels_are_truncated_for_display_only() {
        let data = vec![receipt("a", 1, "Very long category name indeed", 4200, "2024-01-01")];
        let groups = group_by_category(&data);
        assert_eq!(groups[0].label(), "Very long category…");
        assert_eq!(groups[0].category_name, "Very long category name indeed");
        assert_eq!(groups[0].total_cents, 4200);
        assert_eq!(truncate_label("Short"), "Short");
    }

    #[test]
    fn groups_by_month_ascending_skipping_bad_dates() {
        let data = sample();
        let months = group_by_month(filter_receipts(&data, &ReceiptFilter::default()));
        assert_eq!(
            months,
            vec![
                MonthTotal { year_month: "2024-01".to_string(), total_cents: 1000 },
                MonthTotal { year_month: "2024-02".to_string(), total_cents: 250 },
                MonthTotal { year_month: "2024-03".to_string(), total_cents: 500 },
            ]
        );
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let view = ReceiptView::compute(&[], &ReceiptFilter::default());
        assert_eq!(view.total_cents, 0);
        assert!(view.by_category.is_empty());
        assert!(view.by_month.is_empty());
        assert!(view.receipts.is_empty());
    }
}
