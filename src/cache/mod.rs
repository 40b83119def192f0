//! # Query Cache
//!
//! Client-side store of query results, keyed by [`QueryKey`] and held as JSON
//! exactly as the services returned them.
//!
//! The cache is a service like any other: one task owns the entries and
//! processes requests in order, so a snapshot-and-write ([`CacheClient::update_where`])
//! or a rollback ([`CacheClient::restore`]) is atomic with respect to every
//! other cache operation. Subscribers receive a [`CacheEvent`] whenever an
//! entry changes or goes stale.

mod error;
mod keys;

pub use error::*;
pub use keys::*;

use std::collections::HashMap;
use std::future::Future;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

pub type KeyPredicate = Box<dyn Fn(&QueryKey) -> bool + Send + Sync>;
/// Rewrites an entry in place and reports whether anything changed.
pub type Updater = Box<dyn Fn(&mut Value) -> bool + Send + Sync>;
/// Undoes an optimistic write on an entry that others have written since;
/// receives the current value and the value captured before the write.
pub type Reverter = Box<dyn Fn(&mut Value, &Value) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    pub stale: bool,
    pub updated_at: DateTime<Utc>,
}

/// One entry's value before and after an optimistic write.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub key: QueryKey,
    pub before: Value,
    pub after: Value,
}

/// The pre-write state of every entry an optimistic write touched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CacheSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl CacheSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.iter().map(|entry| &entry.key)
    }

    pub fn before(&self, key: &QueryKey) -> Option<&Value> {
        self.entries.iter().find(|entry| entry.key == *key).map(|entry| &entry.before)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Updated(QueryKey),
    Invalidated(QueryKey),
}

enum CacheRequest {
    Get {
        key: QueryKey,
        respond_to: oneshot::Sender<Option<CacheEntry>>,
    },
    Set {
        key: QueryKey,
        value: Value,
        respond_to: oneshot::Sender<()>,
    },
    Entries {
        predicate: KeyPredicate,
        respond_to: oneshot::Sender<Vec<(QueryKey, Value)>>,
    },
    UpdateWhere {
        predicate: KeyPredicate,
        updater: Updater,
        respond_to: oneshot::Sender<CacheSnapshot>,
    },
    Restore {
        snapshot: CacheSnapshot,
        revert: Reverter,
        respond_to: oneshot::Sender<usize>,
    },
    Invalidate {
        predicate: KeyPredicate,
        respond_to: oneshot::Sender<Vec<QueryKey>>,
    },
    StaleKeys {
        respond_to: oneshot::Sender<Vec<QueryKey>>,
    },
    Subscribe {
        respond_to: oneshot::Sender<broadcast::Receiver<CacheEvent>>,
    },
    Shutdown,
}

pub struct CacheService {
    receiver: mpsc::Receiver<CacheRequest>,
    entries: HashMap<QueryKey, CacheEntry>,
    events: broadcast::Sender<CacheEvent>,
}

impl CacheService {
    pub fn new(buffer_size: usize) -> (Self, CacheClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (events, _) = broadcast::channel(buffer_size.max(16));
        let service = Self {
            receiver,
            entries: HashMap::new(),
            events,
        };
        (service, CacheClient { sender })
    }

    #[instrument(name = "cache_service", skip(self))]
    pub async fn run(mut self) {
        info!("CacheService starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CacheRequest::Get { key, respond_to } => {
                    let _ = respond_to.send(self.entries.get(&key).cloned());
                }
                CacheRequest::Set { key, value, respond_to } => {
                    self.write(key.clone(), value);
                    self.publish(CacheEvent::Updated(key));
                    let _ = respond_to.send(());
                }
                CacheRequest::Entries { predicate, respond_to } => {
                    let entries = self.entries.iter()
                        .filter(|(key, _)| predicate(key))
                        .map(|(key, entry)| (key.clone(), entry.value.clone()))
                        .collect();
                    let _ = respond_to.send(entries);
                }
                CacheRequest::UpdateWhere { predicate, updater, respond_to } => {
                    let snapshot = self.handle_update_where(predicate, updater);
                    let _ = respond_to.send(snapshot);
                }
                CacheRequest::Restore { snapshot, revert, respond_to } => {
                    let restored = self.handle_restore(snapshot, revert);
                    let _ = respond_to.send(restored);
                }
                CacheRequest::Invalidate { predicate, respond_to } => {
                    let keys = self.handle_invalidate(predicate);
                    let _ = respond_to.send(keys);
                }
                CacheRequest::StaleKeys { respond_to } => {
                    let keys = self.entries.iter()
                        .filter(|(_, entry)| entry.stale)
                        .map(|(key, _)| key.clone())
                        .collect();
                    let _ = respond_to.send(keys);
                }
                CacheRequest::Subscribe { respond_to } => {
                    let _ = respond_to.send(self.events.subscribe());
                }
                CacheRequest::Shutdown => {
                    info!("CacheService shutting down");
                    break;
                }
            }
        }
        info!("CacheService stopped");
    }

    fn write(&mut self, key: QueryKey, value: Value) {
        self.entries.insert(key, CacheEntry {
            value,
            stale: false,
            updated_at: Utc::now(),
        });
    }

    fn publish(&self, event: CacheEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn handle_update_where(&mut self, predicate: KeyPredicate, updater: Updater) -> CacheSnapshot {
        let mut snapshot = CacheSnapshot::default();
        for (key, entry) in self.entries.iter_mut().filter(|(key, _)| predicate(key)) {
            let before = entry.value.clone();
            if updater(&mut entry.value) {
                entry.updated_at = Utc::now();
                snapshot.entries.push(SnapshotEntry {
                    key: key.clone(),
                    before,
                    after: entry.value.clone(),
                });
            }
        }
        debug!(modified = snapshot.entries.len(), "Applied optimistic write");
        for key in snapshot.keys() {
            self.publish(CacheEvent::Updated(key.clone()));
        }
        snapshot
    }

    fn handle_restore(&mut self, snapshot: CacheSnapshot, revert: Reverter) -> usize {
        let restored = snapshot.entries.len();
        for SnapshotEntry { key, before, after } in snapshot.entries {
            match self.entries.get_mut(&key) {
                // Nobody wrote the entry since: put the captured value back verbatim.
                Some(entry) if entry.value == after => entry.value = before,
                Some(entry) => {
                    debug!(key = %key, "Entry changed since snapshot, reverting selectively");
                    revert(&mut entry.value, &before);
                }
                None => {
                    self.write(key.clone(), before);
                }
            }
            self.publish(CacheEvent::Updated(key));
        }
        restored
    }

    fn handle_invalidate(&mut self, predicate: KeyPredicate) -> Vec<QueryKey> {
        let keys: Vec<QueryKey> = self.entries.iter_mut()
            .filter(|(key, _)| predicate(key))
            .map(|(key, entry)| {
                entry.stale = true;
                key.clone()
            })
            .collect();
        for key in &keys {
            self.publish(CacheEvent::Invalidated(key.clone()));
        }
        keys
    }
}

/// Handle to the [`CacheService`].
#[derive(Clone)]
pub struct CacheClient {
    sender: mpsc::Sender<CacheRequest>,
}

impl CacheClient {
    async fn request<R>(&self, build: impl FnOnce(oneshot::Sender<R>) -> CacheRequest) -> Result<R, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender.send(build(respond_to)).await.map_err(|_| CacheError::ServiceClosed)?;
        response.await.map_err(|_| CacheError::ServiceDropped)
    }

    pub async fn get(&self, key: QueryKey) -> Result<Option<CacheEntry>, CacheError> {
        self.request(|respond_to| CacheRequest::Get { key, respond_to }).await
    }

    pub async fn set(&self, key: QueryKey, value: Value) -> Result<(), CacheError> {
        self.request(|respond_to| CacheRequest::Set { key, value, respond_to }).await
    }

    /// Current values of every entry whose key matches.
    pub async fn entries(
        &self,
        predicate: impl Fn(&QueryKey) -> bool + Send + Sync + 'static,
    ) -> Result<Vec<(QueryKey, Value)>, CacheError> {
        let predicate: KeyPredicate = Box::new(predicate);
        self.request(|respond_to| CacheRequest::Entries { predicate, respond_to }).await
    }

    /// Runs `updater` over every matching entry and returns the prior values of
    /// the entries it changed.
    pub async fn update_where(
        &self,
        predicate: impl Fn(&QueryKey) -> bool + Send + Sync + 'static,
        updater: impl Fn(&mut Value) -> bool + Send + Sync + 'static,
    ) -> Result<CacheSnapshot, CacheError> {
        let predicate: KeyPredicate = Box::new(predicate);
        let updater: Updater = Box::new(updater);
        self.request(|respond_to| CacheRequest::UpdateWhere { predicate, updater, respond_to }).await
    }

    /// Rolls the entries in `snapshot` back; returns how many entries were restored.
    pub async fn restore(
        &self,
        snapshot: CacheSnapshot,
        revert: impl Fn(&mut Value, &Value) + Send + Sync + 'static,
    ) -> Result<usize, CacheError> {
        let revert: Reverter = Box::new(revert);
        self.request(|respond_to| CacheRequest::Restore { snapshot, revert, respond_to }).await
    }

    /// Marks matching entries stale and notifies subscribers so they refetch.
    pub async fn invalidate(
        &self,
        predicate: impl Fn(&QueryKey) -> bool + Send + Sync + 'static,
    ) -> Result<Vec<QueryKey>, CacheError> {
        let predicate: KeyPredicate = Box::new(predicate);
        self.request(|respond_to| CacheRequest::Invalidate { predicate, respond_to }).await
    }

    pub async fn stale_keys(&self) -> Result<Vec<QueryKey>, CacheError> {
        self.request(|respond_to| CacheRequest::StaleKeys { respond_to }).await
    }

    pub async fn subscribe(&self) -> Result<broadcast::Receiver<CacheEvent>, CacheError> {
        self.request(|respond_to| CacheRequest::Subscribe { respond_to }).await
    }

    /// Applies `apply` to the matching entries, then awaits `request`.
    ///
    /// On success the optimistic values stay in place. On failure every entry
    /// `apply` changed is rolled back before the request's error is returned:
    /// verbatim if the entry is untouched since, otherwise through `revert`.
    pub async fn with_optimistic_update<T, E, Fut>(
        &self,
        predicate: impl Fn(&QueryKey) -> bool + Send + Sync + 'static,
        apply: impl Fn(&mut Value) -> bool + Send + Sync + 'static,
        revert: impl Fn(&mut Value, &Value) + Send + Sync + 'static,
        request: Fut,
    ) -> Result<T, OptimisticError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let snapshot = self.update_where(predicate, apply).await?;
        match request.await {
            Ok(value) => Ok(value),
            Err(error) => {
                if let Err(cache_error) = self.restore(snapshot, revert).await {
                    warn!(error = %cache_error, "Rollback could not reach the cache");
                }
                Err(OptimisticError::Request(error))
            }
        }
    }

    pub async fn shutdown(&self) -> Result<(), CacheError> {
        self.sender.send(CacheRequest::Shutdown).await.map_err(|_| CacheError::ServiceClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn start() -> CacheClient {
        let (service, client) = CacheService::new(16);
        tokio::spawn(service.run());
        client
    }

    fn list_key(restaurant: &str) -> QueryKey {
        QueryKey::orders(restaurant)
    }

    fn mark_all_ready(value: &mut Value) -> bool {
        match value.get_mut("orders").and_then(Value::as_array_mut) {
            Some(orders) => {
                for order in orders.iter_mut() {
                    order["status"] = json!("READY");
                }
                !orders.is_empty()
            }
            None => false,
        }
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = start();
        cache.set(list_key("r1"), json!({"orders": []})).await.unwrap();
        let entry = cache.get(list_key("r1")).await.unwrap().unwrap();
        assert_eq!(entry.value, json!({"orders": []}));
        assert!(!entry.stale);
        assert_eq!(cache.get(list_key("r2")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_where_snapshots_only_changed_entries() {
        let cache = start();
        let list = json!({"orders": [{"id": "o1", "status": "RECEIVED"}]});
        cache.set(list_key("r1"), list.clone()).await.unwrap();
        cache.set(QueryKey::order("o1"), json!({"order": {"id": "o1"}})).await.unwrap();

        let snapshot = cache.update_where(|_| true, mark_all_ready).await.unwrap();

        assert_eq!(snapshot.keys().cloned().collect::<Vec<_>>(), vec![list_key("r1")]);
        assert_eq!(snapshot.before(&list_key("r1")), Some(&list));
        let detail = cache.get(QueryKey::order("o1")).await.unwrap().unwrap();
        assert_eq!(detail.value, json!({"order": {"id": "o1"}}));
    }

    #[tokio::test]
    async fn test_restore_is_exact_when_untouched() {
        let cache = start();
        let list = json!({"orders": [{"id": "o1", "status": "RECEIVED", "extra": [1, 2, 3]}]});
        cache.set(list_key("r1"), list.clone()).await.unwrap();

        let snapshot = cache.update_where(|_| true, mark_all_ready).await.unwrap();
        let restored = cache.restore(snapshot, |_, _| panic!("revert must not run")).await.unwrap();

        assert_eq!(restored, 1);
        let entry = cache.get(list_key("r1")).await.unwrap().unwrap();
        assert_eq!(serde_json::to_vec(&entry.value).unwrap(), serde_json::to_vec(&list).unwrap());
    }

    #[tokio::test]
    async fn test_restore_uses_revert_after_concurrent_write() {
        let cache = start();
        cache.set(list_key("r1"), json!({"orders": [{"id": "o1", "status": "RECEIVED"}]})).await.unwrap();

        let snapshot = cache.update_where(|_| true, mark_all_ready).await.unwrap();
        cache.set(list_key("r1"), json!({"orders": [{"id": "o1", "status": "READY"}, {"id": "o2"}]})).await.unwrap();

        cache.restore(snapshot, |current, before| {
            current["orders"][0] = before["orders"][0].clone();
        }).await.unwrap();

        let entry = cache.get(list_key("r1")).await.unwrap().unwrap();
        assert_eq!(entry.value, json!({"orders": [{"id": "o1", "status": "RECEIVED"}, {"id": "o2"}]}));
    }

    #[tokio::test]
    async fn test_invalidate_marks_stale_and_notifies() {
        let cache = start();
        let mut events = cache.subscribe().await.unwrap();
        cache.set(list_key("r1"), json!({"orders": []})).await.unwrap();
        cache.set(list_key("r2"), json!({"orders": []})).await.unwrap();

        let keys = cache.invalidate(|key| key.restaurant_id() == Some("r1")).await.unwrap();
        assert_eq!(keys, vec![list_key("r1")]);
        assert_eq!(cache.stale_keys().await.unwrap(), vec![list_key("r1")]);

        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(list_key("r1")));
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(list_key("r2")));
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Invalidated(list_key("r1")));

        cache.set(list_key("r1"), json!({"orders": []})).await.unwrap();
        assert!(cache.stale_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_with_optimistic_update_rolls_back_on_error() {
        let cache = start();
        let list = json!({"orders": [{"id": "o1", "status": "RECEIVED"}]});
        cache.set(list_key("r1"), list.clone()).await.unwrap();

        let reader = cache.clone();
        let result: Result<(), OptimisticError<String>> = cache.with_optimistic_update(
            |_| true,
            mark_all_ready,
            |_, _| {},
            async move {
                let during = reader.get(list_key("r1")).await.unwrap().unwrap();
                assert_eq!(during.value["orders"][0]["status"], "READY");
                Err("boom".to_string())
            },
        ).await;

        assert_eq!(result, Err(OptimisticError::Request("boom".to_string())));
        assert_eq!(cache.get(list_key("r1")).await.unwrap().unwrap().value, list);
    }
}
