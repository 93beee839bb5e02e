use crate::error::Result;
use crate::indexer::Indexer;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named indexers shared by a process, e.g. one per language server session.
#[derive(Default)]
pub struct IndexRegistry {
    indexers: RwLock<BTreeMap<String, Arc<Indexer>>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the indexer registered as `name`, creating it with `make` if absent.
    pub fn init(&self, name: &str, make: impl FnOnce() -> Result<Indexer>) -> Result<Arc<Indexer>> {
        if let Some(existing) = self.get(name) {
            return Ok(existing);
        }
        let mut indexers = self.indexers.write();
        if let Some(existing) = indexers.get(name) {
            return Ok(existing.clone());
        }
        let indexer = Arc::new(make()?);
        indexers.insert(name.to_string(), indexer.clone());
        tracing::debug!(target = "boot.index", name, "indexer registered");
        Ok(indexer)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Indexer>> {
        self.indexers.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.indexers.read().keys().cloned().collect()
    }

    /// Unregisters `name`, waits for its queued operations and closes its queue.
    pub async fn teardown(&self, name: &str) -> Result<bool> {
        let Some(indexer) = self.indexers.write().remove(name) else {
            return Ok(false);
        };
        let drained = indexer.wait_operation().join().await;
        indexer.close();
        drained?;
        tracing::debug!(target = "boot.index", name, "indexer torn down");
        Ok(true)
    }

    pub async fn teardown_all(&self) -> Result<()> {
        for name in self.names() {
            self.teardown(&name).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for IndexRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexRegistry")
            .field("indexers", &self.names())
            .finish()
    }
}
