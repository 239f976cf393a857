//! Receipt desk engine.
//!
//! Owns the receipt ledger: the identity resolver and whitelist gate, the
//! access policy, the revisioned mutation engine (every committed receipt
//! change is paired with an immutable [`Revision`] in the same database
//! transaction), the aggregation & filter functions and the CSV export.

pub use blob::{BlobStore, LocalBlobStore, MemoryBlobStore};
pub use categories::Category;
pub use commands::{CreateReceiptCmd, FileInput, UpdateReceiptCmd};
pub use currency::Currency;
pub use error::EngineError;
pub use export::{NO_DATA, ReceiptExportRow, SUMMARY_ID, export_rows, to_delimited_text};
pub use live::{ReceiptSubscription, SubscriptionHandle};
pub use money::AmountCents;
pub use ops::{Engine, EngineBuilder, EnginePolicy, LastOwnerPolicy};
pub use policy::{Action, Principal, Role, UserStatus, can_perform, role_transition_allowed};
pub use receipts::{
    EditorRef, FileMeta, Receipt, ReceiptPatch, ReceiptState, parse_receipt_date,
};
pub use revisions::{Revision, RevisionAction};
pub use users::{Identity, User};
pub use views::{
    CategoryTotal, MonthTotal, ReceiptFilter, ReceiptView, category_totals, filter_receipts,
    group_by_category, group_by_month, sum_cents,
};
pub use whitelist::WhitelistEntry;

pub mod blob;
mod categories;
mod commands;
mod currency;
mod error;
pub mod export;
mod live;
mod money;
mod ops;
mod policy;
mod receipts;
mod revisions;
mod users;
mod util;
pub mod views;
mod whitelist;

pub type ResultEngine<T> = Result<T, EngineError>;
