use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tgstore_core::BackendClass;
use tracing::{debug, info};

use crate::{Backend, StorageError, StorageResult};

/// Backends of one class with their round-robin cursor
struct Lane {
    backends: Vec<Arc<dyn Backend>>,
    cursor: AtomicUsize,
}

impl Lane {
    fn new() -> Self {
        Self {
            backends: Vec::new(),
            cursor: AtomicUsize::new(0),
        }
    }
}

/// Registry of all configured backends, partitioned by class.
///
/// Built once and immutable afterwards; only the cursors move. Concurrent
/// callers may interleave on a cursor, which skews fairness slightly but
/// always yields a valid index.
pub struct BackendPool {
    lanes: HashMap<BackendClass, Lane>,
    ready: AtomicBool,
}

impl BackendPool {
    /// Partition `backends` by their class, keeping configuration order.
    pub fn new<I>(backends: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Backend>>,
    {
        let mut lanes: HashMap<BackendClass, Lane> = BackendClass::UPLOAD_ORDER
            .iter()
            .map(|class| (*class, Lane::new()))
            .collect();

        for backend in backends {
            lanes
                .entry(backend.class())
                .or_insert_with(Lane::new)
                .backends
                .push(backend);
        }

        Self {
            lanes,
            ready: AtomicBool::new(false),
        }
    }

    /// Pool with no backends at all
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self, class: BackendClass) -> usize {
        self.lanes.get(&class).map_or(0, |lane| lane.backends.len())
    }

    pub fn has(&self, class: BackendClass) -> bool {
        self.len(class) > 0
    }

    /// True when no class has a backend
    pub fn is_empty(&self) -> bool {
        self.lanes.values().all(|lane| lane.backends.is_empty())
    }

    /// Next backend of `class` in round-robin order.
    pub fn next(&self, class: BackendClass) -> StorageResult<Arc<dyn Backend>> {
        let lane = self
            .lanes
            .get(&class)
            .filter(|lane| !lane.backends.is_empty())
            .ok_or(StorageError::NoBackendAvailable { class })?;

        let previous = lane.cursor.fetch_add(1, Ordering::Relaxed);
        let index = previous.wrapping_add(1) % lane.backends.len();
        Ok(Arc::clone(&lane.backends[index]))
    }

    /// Prepare every backend of every class.
    ///
    /// All backends are prepared concurrently; the first failure is returned
    /// and the pool stays not-ready. Calling again after success is a no-op.
    pub async fn prepare(&self) -> StorageResult<()> {
        if self.is_ready() {
            return Ok(());
        }

        let backends: Vec<&Arc<dyn Backend>> =
            self.lanes.values().flat_map(|lane| lane.backends.iter()).collect();

        let results = join_all(backends.iter().map(|backend| async move {
            debug!(backend = backend.name(), class = %backend.class(), "Preparing backend");
            backend.prepare().await
        }))
        .await;

        for result in results {
            result?;
        }

        self.ready.store(true, Ordering::Release);
        info!(
            primary = self.len(BackendClass::Primary),
            secondary = self.len(BackendClass::Secondary),
            "Storage backends ready"
        );
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Reject traffic until [`BackendPool::prepare`] has succeeded.
    pub fn ensure_ready(&self) -> StorageResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(StorageError::NotReady)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBackend, MemoryChannel};
    use std::collections::HashSet;

    fn pool_of(primary: usize, secondary: usize) -> (BackendPool, Vec<Arc<MemoryBackend>>) {
        let channel = MemoryChannel::new(-100);
        let mut all = Vec::new();
        for i in 0..primary {
            all.push(Arc::new(MemoryBackend::new(format!("bot-{}", i), BackendClass::Primary, channel.clone())));
        }
        for i in 0..secondary {
            all.push(Arc::new(MemoryBackend::new(format!("user-{}", i), BackendClass::Secondary, channel.clone())));
        }
        let pool = BackendPool::new(all.iter().map(|b| Arc::clone(b) as Arc<dyn Backend>));
        (pool, all)
    }

    #[test]
    fn round_robin_visits_each_backend_once_per_cycle() {
        let (pool, _) = pool_of(3, 0);

        for _cycle in 0..2 {
            let names: HashSet<String> = (0..3)
                .map(|_| pool.next(BackendClass::Primary).unwrap().name().to_string())
                .collect();
            assert_eq!(names.len(), 3);
        }
    }

    #[test]
    fn single_backend_is_always_selected() {
        let (pool, _) = pool_of(0, 1);
        for _ in 0..5 {
            assert_eq!(pool.next(BackendClass::Secondary).unwrap().name(), "user-0");
        }
    }

    #[test]
    fn empty_class_has_no_backend() {
        let (pool, _) = pool_of(2, 0);
        assert!(matches!(
            pool.next(BackendClass::Secondary),
            Err(StorageError::NoBackendAvailable { class: BackendClass::Secondary })
        ));
        assert!(!pool.is_empty());
        assert!(BackendPool::empty().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_selection_always_returns_a_backend() {
        let (pool, _) = pool_of(3, 0);
        let pool = Arc::new(pool);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    let mut picked = HashSet::new();
                    for _ in 0..1000 {
                        let backend = pool.next(BackendClass::Primary).unwrap();
                        picked.insert(backend.name().to_string());
                    }
                    picked
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for task in tasks {
            seen.extend(task.await.unwrap());
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn pool_is_not_ready_until_prepared() {
        let (pool, backends) = pool_of(1, 1);
        assert!(matches!(pool.ensure_ready(), Err(StorageError::NotReady)));

        pool.prepare().await.unwrap();
        assert!(pool.ensure_ready().is_ok());
        assert!(backends.iter().all(|b| b.is_ready()));

        // Idempotent
        pool.prepare().await.unwrap();
    }

    #[tokio::test]
    async fn prepare_failure_is_fatal() {
        let channel = MemoryChannel::new(-100);
        let broken = Arc::new(MemoryBackend::new("bot-x", BackendClass::Primary, channel).failing_prepare());
        let pool = BackendPool::new(vec![broken as Arc<dyn Backend>]);

        assert!(matches!(pool.prepare().await, Err(StorageError::Prepare { .. })));
        assert!(!pool.is_ready());
    }
}
