use super::HistoryStore;
use crate::analysis::AnalysisResult;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// Process-local history. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: RwLock<HashMap<String, VecDeque<AnalysisResult>>>,
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn load(&self, user_id: &str) -> Result<Vec<AnalysisResult>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(user_id)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn prepend(&self, user_id: &str, result: AnalysisResult) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries
            .entry(user_id.to_string())
            .or_default()
            .push_front(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::sample_result;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unknown_user_has_empty_history() {
        let store = InMemoryHistoryStore::default();
        assert!(store.load("nobody").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_prepends_are_not_lost() {
        let store = Arc::new(InMemoryHistoryStore::default());

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .prepend("alice", sample_result(&i.to_string()))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.load("alice").await.unwrap().len(), 50);
    }
}
