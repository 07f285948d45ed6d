//! Per-user history of completed analyses.
//!
//! [`HistoryLedger`] is the append-only view the rest of the core uses. Entries are listed
//! newest first; there is no deduplication and no eviction. Persistence is delegated to a
//! [`HistoryStore`], of which two are provided:
//!
//! - [`InMemoryHistoryStore`] for tests and single-process use
//! - [`FileHistoryStore`] writing one JSON file per user under a sharded directory
//!
//! Stores must make concurrent appends for the same user safe: no append may be lost.

mod file;
mod memory;

pub use file::FileHistoryStore;
pub use memory::InMemoryHistoryStore;

use crate::analysis::AnalysisResult;
use crate::error::{AbgResult, StoreError};
use abg_types::Identity;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Storage backend keyed by the opaque user id.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// All entries for `user_id`, newest first. Unknown users have an empty history.
    async fn load(&self, user_id: &str) -> Result<Vec<AnalysisResult>, StoreError>;

    /// Adds `result` as the newest entry for `user_id`.
    async fn prepend(&self, user_id: &str, result: AnalysisResult) -> Result<(), StoreError>;
}

/// Append-only, newest-first record of analyses per identity.
#[derive(Clone)]
pub struct HistoryLedger {
    store: Arc<dyn HistoryStore>,
}

impl HistoryLedger {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// A ledger backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryHistoryStore::default()))
    }

    /// Records `result` as the newest entry for `identity`.
    ///
    /// # Errors
    ///
    /// Returns `AbgError::Store` if the backend cannot persist the entry.
    pub async fn append(&self, identity: &Identity, result: AnalysisResult) -> AbgResult<()> {
        let id = result.id;
        self.store.prepend(identity.id.as_str(), result).await?;
        tracing::debug!(entry = %id, "history entry appended");
        Ok(())
    }

    /// Every entry for `identity`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AbgError::Store` if the backend cannot be read.
    pub async fn list(&self, identity: &Identity) -> AbgResult<Vec<AnalysisResult>> {
        Ok(self.store.load(identity.id.as_str()).await?)
    }

    /// The entry with the given id, if `identity` has one.
    pub async fn get(&self, identity: &Identity, id: Uuid) -> AbgResult<Option<AnalysisResult>> {
        Ok(self.list(identity).await?.into_iter().find(|r| r.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{validate, RawAbgInput};
    use abg_types::NonEmptyText;

    pub(crate) fn sample_result(tag: &str) -> AnalysisResult {
        AnalysisResult::new(
            validate(&RawAbgInput::default()).unwrap(),
            format!("interpretation {tag}"),
            "conditions".into(),
            "treatment".into(),
        )
    }

    fn identity(id: &str) -> Identity {
        Identity::persistent(NonEmptyText::new(id).unwrap())
    }

    #[tokio::test]
    async fn test_ledger_lists_newest_first() {
        let ledger = HistoryLedger::in_memory();
        let alice = identity("alice");

        for tag in ["1", "2", "3"] {
            ledger.append(&alice, sample_result(tag)).await.unwrap();
        }

        let entries = ledger.list(&alice).await.unwrap();
        let texts: Vec<_> = entries.iter().map(|r| r.interpretation.as_str()).collect();
        assert_eq!(
            texts,
            vec!["interpretation 3", "interpretation 2", "interpretation 1"]
        );
    }

    #[tokio::test]
    async fn test_ledger_is_scoped_per_identity() {
        let ledger = HistoryLedger::in_memory();
        ledger
            .append(&identity("alice"), sample_result("a"))
            .await
            .unwrap();

        assert!(ledger.list(&identity("bob")).await.unwrap().is_empty());
        assert_eq!(ledger.list(&identity("alice")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ledger_get_by_id() {
        let ledger = HistoryLedger::in_memory();
        let alice = identity("alice");
        let result = sample_result("x");
        let id = result.id;
        ledger.append(&alice, result.clone()).await.unwrap();

        assert_eq!(ledger.get(&alice, id).await.unwrap(), Some(result));
        assert_eq!(ledger.get(&alice, Uuid::new_v4()).await.unwrap(), None);
    }
}
