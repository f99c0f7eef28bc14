use crate::models::{Assignment, Item};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Failure reported by an item store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The existence condition of a conditional write was not met
    #[error("The conditional request failed")]
    ConditionFailed,
    /// Any other backend failure, passed through with the store's own naming
    #[error("{name}: {message}")]
    Backend { name: String, message: String },
}

impl StoreError {
    pub fn backend(name: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Backend {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Error kind reported to clients
    pub fn name(&self) -> &str {
        match self {
            StoreError::ConditionFailed => "ConditionalCheckFailed",
            StoreError::Backend { name, .. } => name,
        }
    }

    pub fn message(&self) -> String {
        match self {
            StoreError::ConditionFailed => self.to_string(),
            StoreError::Backend { message, .. } => message.clone(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Single-item operations the router needs from a key-value table.
///
/// Each call is one atomic store operation; implementations never retry on
/// the router's behalf.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Unconditionally write the item under its id
    async fn put(&self, item: &Item) -> StoreResult<()>;

    /// Return up to `limit` items in store order
    async fn scan(&self, limit: usize) -> StoreResult<Vec<Item>>;

    /// Point lookup by id
    async fn get(&self, id: &str) -> StoreResult<Option<Item>>;

    /// Apply assignments to an existing item and return the updated item.
    ///
    /// Fails with [`StoreError::ConditionFailed`] when the item does not exist.
    async fn update_existing(&self, id: &str, assignments: &[Assignment]) -> StoreResult<Item>;

    /// Remove an existing item and return its prior value.
    ///
    /// Fails with [`StoreError::ConditionFailed`] when the item does not exist.
    async fn delete_existing(&self, id: &str) -> StoreResult<Item>;
}

/// Process-local store backed by a mutex-guarded map
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, Item>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, Item>>> {
        self.items
            .lock()
            .map_err(|e| StoreError::backend("InternalError", e.to_string()))
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn put(&self, item: &Item) -> StoreResult<()> {
        self.lock()?.insert(item.id.clone(), item.clone());
        tracing::debug!("Stored item with id: {}", item.id);
        Ok(())
    }

    async fn scan(&self, limit: usize) -> StoreResult<Vec<Item>> {
        let items = self.lock()?;
        Ok(items.values().take(limit).cloned().collect())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Item>> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn update_existing(&self, id: &str, assignments: &[Assignment]) -> StoreResult<Item> {
        let mut items = self.lock()?;
        let item = items.get_mut(id).ok_or(StoreError::ConditionFailed)?;
        item.apply(assignments);
        Ok(item.clone())
    }

    async fn delete_existing(&self, id: &str) -> StoreResult<Item> {
        self.lock()?.remove(id).ok_or(StoreError::ConditionFailed)
    }
}
