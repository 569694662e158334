//! In-memory stores for exercising the deletion protocol without Postgres or S3
//!
//! Both fakes record every call and support injected failures and delays.

use async_trait::async_trait;
use labelhub_common::types::DatasetId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use super::cleanup::ObjectStore;
use super::error::StoreError;
use super::executor::RelationalStore;
use super::graph::DependentKind;

/// Relational operations, as recorded by [`MemoryRelationalStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    DeleteDependents(DependentKind),
    FindFilePath,
    DeleteDataset,
}

/// Blocks one operation until the test lets it continue
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub resume: Arc<Notify>,
}

#[derive(Default)]
struct RelationalState {
    /// Dataset id -> stored file path
    datasets: HashMap<DatasetId, Option<String>>,
    rows: Vec<(DependentKind, DatasetId)>,
    calls: Vec<StoreOp>,
    failures: HashMap<StoreOp, StoreError>,
    delays: HashMap<StoreOp, Duration>,
    gates: HashMap<StoreOp, Gate>,
}

#[derive(Clone, Default)]
pub struct MemoryRelationalStore {
    state: Arc<Mutex<RelationalState>>,
}

impl MemoryRelationalStore {
    /// Insert a dataset with `labels`, `entries` and `progress` dependent rows
    pub fn seed(
        &self,
        file_path: Option<&str>,
        labels: usize,
        entries: usize,
        progress: usize,
    ) -> DatasetId {
        let id = DatasetId::new();
        let mut state = self.state.lock();
        state.datasets.insert(id, file_path.map(str::to_string));
        for (kind, count) in [
            (DependentKind::Label, labels),
            (DependentKind::Entry, entries),
            (DependentKind::Progress, progress),
        ] {
            state.rows.extend(std::iter::repeat((kind, id)).take(count));
        }
        id
    }

    pub fn dataset_exists(&self, id: DatasetId) -> bool {
        self.state.lock().datasets.contains_key(&id)
    }

    pub fn count(&self, kind: DependentKind, id: DatasetId) -> usize {
        self.state
            .lock()
            .rows
            .iter()
            .filter(|(k, d)| *k == kind && *d == id)
            .count()
    }

    /// Dependent rows whose dataset no longer exists
    pub fn orphans(&self) -> usize {
        let state = self.state.lock();
        let live: HashSet<_> = state.datasets.keys().copied().collect();
        state.rows.iter().filter(|(_, d)| !live.contains(d)).count()
    }

    pub fn calls(&self) -> Vec<StoreOp> {
        self.state.lock().calls.clone()
    }

    /// Operations that changed state, in order
    pub fn mutations(&self) -> Vec<StoreOp> {
        self.calls()
            .into_iter()
            .filter(|op| *op != StoreOp::FindFilePath)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn fail(&self, op: StoreOp, err: StoreError) {
        self.state.lock().failures.insert(op, err);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    pub fn delay(&self, op: StoreOp, delay: Duration) {
        self.state.lock().delays.insert(op, delay);
    }

    pub fn gate(&self, op: StoreOp) -> Gate {
        let gate = Gate::default();
        self.state.lock().gates.insert(op, gate.clone());
        gate
    }

    /// Remove a dataset row behind the protocol's back
    pub fn remove_dataset_row(&self, id: DatasetId) {
        self.state.lock().datasets.remove(&id);
    }

    async fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        let (failure, delay, gate) = {
            let mut state = self.state.lock();
            state.calls.push(op);
            (
                state.failures.get(&op).cloned(),
                state.delays.get(&op).copied(),
                state.gates.remove(&op),
            )
        };

        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.resume.notified().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RelationalStore for MemoryRelationalStore {
    async fn delete_dependents(
        &self,
        kind: DependentKind,
        dataset_id: DatasetId,
    ) -> Result<u64, StoreError> {
        self.enter(StoreOp::DeleteDependents(kind)).await?;
        let mut state = self.state.lock();
        let before = state.rows.len();
        state.rows.retain(|(k, d)| !(*k == kind && *d == dataset_id));
        Ok((before - state.rows.len()) as u64)
    }

    async fn find_file_path(
        &self,
        dataset_id: DatasetId,
    ) -> Result<Option<Option<String>>, StoreError> {
        self.enter(StoreOp::FindFilePath).await?;
        Ok(self.state.lock().datasets.get(&dataset_id).cloned())
    }

    async fn delete_dataset(&self, dataset_id: DatasetId) -> Result<u64, StoreError> {
        self.enter(StoreOp::DeleteDataset).await?;
        let mut state = self.state.lock();
        if state.rows.iter().any(|(_, d)| *d == dataset_id) {
            return Err(StoreError::Constraint(format!(
                "dependent rows still reference dataset {}",
                dataset_id
            )));
        }
        Ok(state.datasets.remove(&dataset_id).map_or(0, |_| 1))
    }
}

#[derive(Default)]
struct ObjectState {
    objects: HashSet<String>,
    deleted: Vec<String>,
    failure: Option<StoreError>,
    delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<ObjectState>>,
}

impl MemoryObjectStore {
    pub fn with_objects<const N: usize>(keys: [&str; N]) -> Self {
        let store = Self::default();
        store
            .state
            .lock()
            .objects
            .extend(keys.iter().map(|k| k.to_string()));
        store
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().objects.contains(key)
    }

    /// Keys passed to successful deletes, in order
    pub fn deleted_keys(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    pub fn fail_deletes(&self, err: StoreError) {
        self.state.lock().failure = Some(err);
    }

    pub fn delay_deletes(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        let (failure, delay) = {
            let state = self.state.lock();
            (state.failure.clone(), state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }
        let mut state = self.state.lock();
        state.objects.remove(key);
        state.deleted.push(key.to_string());
        Ok(())
    }
}
