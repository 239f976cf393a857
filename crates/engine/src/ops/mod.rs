use std::{future::Future, sync::Arc};

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BlobStore, EngineError, MemoryBlobStore, ResultEngine, live::ReceiptFeed};

mod access;
mod categories;
mod live;
mod receipts;
mod revisions;
mod users;
mod whitelist;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// What happens when a status change would leave no approved owner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastOwnerPolicy {
    /// Reject the change.
    #[default]
    Protect,
    Allow,
}

/// Tunables of the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginePolicy {
    /// Optimistic attempts per receipt mutation before giving up with
    /// [`EngineError::Conflict`].
    pub max_tx_attempts: u32,
    pub last_owner: LastOwnerPolicy,
    /// Append a `create` revision when a receipt is submitted.
    pub create_revisions: bool,
    pub max_file_bytes: u64,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            max_tx_attempts: 5,
            last_owner: LastOwnerPolicy::Protect,
            create_revisions: true,
            max_file_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    blobs: Arc<dyn BlobStore>,
    feed: ReceiptFeed,
    policy: EnginePolicy,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    /// Runs `op` until it stops failing with [`EngineError::Conflict`], at
    /// most `max_tx_attempts` times.
    async fn retry_on_conflict<T, F, Fut>(&self, label: &str, mut op: F) -> ResultEngine<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ResultEngine<T>>,
    {
        let attempts = self.policy.max_tx_attempts.max(1);
        for attempt in 1..=attempts {
            match op().await {
                Err(EngineError::Conflict(reason)) => {
                    debug!(attempt, attempts, "{label}: {reason}, retrying");
                }
                other => return other,
            }
        }
        Err(EngineError::Conflict(format!(
            "{label}: gave up after {attempts} attempts"
        )))
    }

    fn check_file_size(&self, bytes: &[u8]) -> ResultEngine<()> {
        if bytes.is_empty() {
            return Err(EngineError::InvalidFile("file is empty".to_string()));
        }
        if bytes.len() as u64 > self.policy.max_file_bytes {
            return Err(EngineError::InvalidFile(format!(
                "file exceeds {} bytes",
                self.policy.max_file_bytes
            )));
        }
        Ok(())
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    blobs: Option<Arc<dyn BlobStore>>,
    policy: EnginePolicy,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Where uploaded files go. Defaults to an in-memory store.
    pub fn blob_store(mut self, blobs: Arc<dyn BlobStore>) -> EngineBuilder {
        self.blobs = Some(blobs);
        self
    }

    pub fn policy(mut self, policy: EnginePolicy) -> EngineBuilder {
        self.policy = policy;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            blobs: self
                .blobs
                .unwrap_or_else(|| Arc::new(MemoryBlobStore::new())),
            feed: ReceiptFeed::new(),
            policy: self.policy,
        })
    }
}
