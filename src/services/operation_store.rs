//! Operation store contract
//!
//! Lifecycle managers depend only on [`Repository`], a repository per
//! operation kind resolved at compile time. Two backends implement it: the
//! SeaORM store for PostgreSQL and an in-process store.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::models::injection::Injection;
use crate::models::movement::Movement;
use crate::models::operation::{Operation, OperationKind};
use crate::models::scan::Scan;
use crate::services::memory_store::MemoryStore;
use crate::services::sea_store::SeaOrmStore;

/// Error types for the operation store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("{kind} operation {id} does not exist")]
    Missing { kind: &'static str, id: i32 },
    #[error("Corrupt {kind} row {id}: {reason}")]
    Corrupt {
        kind: &'static str,
        id: i32,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filter, ordering and pagination for [`Repository::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSpec {
    pub owner: Option<String>,
    /// Status in its stored string form
    pub status: Option<String>,
    pub order: SortOrder,
    pub skip: u64,
    pub take: Option<u64>,
}

impl ListSpec {
    pub fn owned_by(user_id: impl Into<String>) -> Self {
        Self {
            owner: Some(user_id.into()),
            ..Default::default()
        }
    }

    /// Most recent `limit` operations of one user
    pub fn recent_for(user_id: impl Into<String>, limit: u64) -> Self {
        Self::owned_by(user_id).take(limit)
    }

    pub fn with_status(mut self, status: impl ToString) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.order = SortOrder::OldestFirst;
        self
    }

    pub fn skip(mut self, count: u64) -> Self {
        self.skip = count;
        self
    }

    pub fn take(mut self, count: u64) -> Self {
        self.take = Some(count);
        self
    }

    /// Whether `op` passes the owner and status filters
    pub fn matches<K: OperationKind>(&self, op: &Operation<K>) -> bool {
        let owner_ok = self
            .owner
            .as_deref()
            .is_none_or(|owner| op.is_owned_by(owner));
        let status_ok = self
            .status
            .as_deref()
            .is_none_or(|status| op.status.to_string() == status);
        owner_ok && status_ok
    }
}

/// Durable storage for one operation kind
#[async_trait]
pub trait Repository<K: OperationKind>: Send + Sync {
    async fn get_by_id(&self, id: i32) -> Result<Option<Operation<K>>, StoreError>;

    async fn list(&self, spec: &ListSpec) -> Result<Vec<Operation<K>>, StoreError>;

    /// Persist a new operation and return it with its assigned id
    async fn add(&self, op: Operation<K>) -> Result<Operation<K>, StoreError>;

    /// Overwrite an existing operation (last write wins)
    async fn update(&self, op: &Operation<K>) -> Result<(), StoreError>;

    /// Returns false when nothing was deleted
    async fn delete(&self, id: i32) -> Result<bool, StoreError>;
}

/// The three repositories the lifecycle managers work against
#[derive(Clone)]
pub struct Stores {
    pub scans: Arc<dyn Repository<Scan>>,
    pub injections: Arc<dyn Repository<Injection>>,
    pub movements: Arc<dyn Repository<Movement>>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            scans: Arc::new(MemoryStore::<Scan>::new()),
            injections: Arc::new(MemoryStore::<Injection>::new()),
            movements: Arc::new(MemoryStore::<Movement>::new()),
        }
    }

    pub fn sea_orm(db: DatabaseConnection) -> Self {
        let store = Arc::new(SeaOrmStore::new(db));
        Self {
            scans: store.clone(),
            injections: store.clone(),
            movements: store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scan::ScanStatus;
    use chrono::Utc;

    #[test]
    fn test_list_spec_builders() {
        let spec = ListSpec::recent_for("alice", 10)
            .with_status(ScanStatus::Success)
            .skip(5);
        assert_eq!(spec.owner.as_deref(), Some("alice"));
        assert_eq!(spec.status.as_deref(), Some("success"));
        assert_eq!(spec.order, SortOrder::NewestFirst);
        assert_eq!(spec.skip, 5);
        assert_eq!(spec.take, Some(10));
        assert_eq!(ListSpec::default().oldest_first().order, SortOrder::OldestFirst);
    }

    #[test]
    fn test_list_spec_matches_owner_and_status() {
        let op = Operation::new("alice", ScanStatus::InProgress, Scan::default(), Utc::now());

        assert!(ListSpec::default().matches(&op));
        assert!(ListSpec::owned_by("alice").matches(&op));
        assert!(!ListSpec::owned_by("bob").matches(&op));
        assert!(ListSpec::owned_by("alice")
            .with_status(ScanStatus::InProgress)
            .matches(&op));
        assert!(!ListSpec::owned_by("alice")
            .with_status(ScanStatus::Failed)
            .matches(&op));
    }
}
