//! In-process operation store
//!
//! Used when no database is configured and by the test suites. Rows live in
//! a `BTreeMap` behind a `parking_lot` mutex; ids are assigned sequentially.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::models::operation::{Operation, OperationKind};
use crate::services::operation_store::{ListSpec, Repository, SortOrder, StoreError};

struct MemoryState<K: OperationKind> {
    rows: BTreeMap<i32, Operation<K>>,
    next_id: i32,
}

pub struct MemoryStore<K: OperationKind> {
    state: Mutex<MemoryState<K>>,
}

impl<K: OperationKind> MemoryStore<K> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: OperationKind> Default for MemoryStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: OperationKind> Repository<K> for MemoryStore<K> {
    async fn get_by_id(&self, id: i32) -> Result<Option<Operation<K>>, StoreError> {
        Ok(self.state.lock().rows.get(&id).cloned())
    }

    async fn list(&self, spec: &ListSpec) -> Result<Vec<Operation<K>>, StoreError> {
        let state = self.state.lock();
        let mut rows: Vec<Operation<K>> = state
            .rows
            .values()
            .filter(|op| spec.matches(*op))
            .cloned()
            .collect();

        rows.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        if spec.order == SortOrder::NewestFirst {
            rows.reverse();
        }

        let take = spec.take.map(|t| t as usize).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(spec.skip as usize)
            .take(take)
            .collect())
    }

    async fn add(&self, mut op: Operation<K>) -> Result<Operation<K>, StoreError> {
        let mut state = self.state.lock();
        op.id = state.next_id;
        state.next_id += 1;
        state.rows.insert(op.id, op.clone());
        Ok(op)
    }

    async fn update(&self, op: &Operation<K>) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        match state.rows.get_mut(&op.id) {
            Some(row) => {
                *row = op.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                kind: K::LABEL,
                id: op.id,
            }),
        }
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.state.lock().rows.remove(&id).is_some())
    }
}
