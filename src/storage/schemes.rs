//! Scheme store
//!
//! Durable, observable storage of the saved scheme list. The whole list is
//! serialized as one JSON array under a single key of the storage port.
//! Every mutation is a read-modify-write transaction on that key, and every
//! read decodes the persisted value anew; nothing is cached here.

use std::sync::Arc;

use tokio::sync::watch;

use crate::storage::kv::KeyValueStore;
use crate::storage::StorageError;
use crate::types::scheme::Scheme;

/// Storage key holding the serialized scheme list.
pub const SCHEMES_KEY: &str = "schemes_json";

/// Decode a persisted scheme list.
pub fn decode_schemes(raw: &str) -> Result<Vec<Scheme>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Decode a raw stored value, mapping absence, blank content, and decode
/// failures all to an empty list. A corrupt preset file must never take
/// the application down.
fn decode_or_empty(raw: Option<&str>) -> Vec<Scheme> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match decode_schemes(raw) {
        Ok(schemes) => schemes,
        Err(e) => {
            tracing::warn!("Ignoring unreadable scheme list: {}", e);
            Vec::new()
        }
    }
}

fn encode_schemes(schemes: &[Scheme]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(schemes)?)
}

/// Repository for saved schemes, backed by an injected [`KeyValueStore`].
#[derive(Clone)]
pub struct SchemeStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SchemeStore {
    /// Create a store over the given storage port.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Subscribe to the scheme collection.
    ///
    /// The subscription yields the current collection immediately, then a
    /// fresh snapshot after every successful mutation.
    pub async fn observe_schemes(&self) -> Result<SchemeSubscription, StorageError> {
        let rx = self.kv.observe(SCHEMES_KEY).await?;
        Ok(SchemeSubscription::new(rx))
    }

    /// Append `scheme` to the end of the collection and persist it.
    ///
    /// Bounds are saved exactly as given; whether `min <= max` holds is the
    /// caller's business, checked only at generation time.
    pub async fn add_scheme(&self, scheme: Scheme) -> Result<(), StorageError> {
        self.kv
            .transact(
                SCHEMES_KEY,
                Box::new(move |raw| {
                    let mut schemes = decode_or_empty(raw.as_deref());
                    schemes.push(scheme);
                    encode_schemes(&schemes).map(Some)
                }),
            )
            .await
    }

    /// Remove every scheme structurally equal to `scheme` and persist the
    /// result. Removing an absent scheme commits the list unchanged.
    pub async fn remove_scheme(&self, scheme: &Scheme) -> Result<(), StorageError> {
        let scheme = scheme.clone();
        self.kv
            .transact(
                SCHEMES_KEY,
                Box::new(move |raw| {
                    let mut schemes = decode_or_empty(raw.as_deref());
                    schemes.retain(|s| *s != scheme);
                    encode_schemes(&schemes).map(Some)
                }),
            )
            .await
    }
}

/// Live view of the scheme collection.
///
/// The first [`next`](Self::next) resolves immediately with the collection
/// as of subscription; later calls resolve once per committed mutation.
pub struct SchemeSubscription {
    rx: watch::Receiver<Option<String>>,
}

impl SchemeSubscription {
    fn new(mut rx: watch::Receiver<Option<String>>) -> Self {
        // The snapshot present at subscription time counts as unseen so the
        // first next() yields it.
        rx.mark_changed();
        Self { rx }
    }

    /// Decode the collection as of the latest snapshot.
    pub fn current(&self) -> Vec<Scheme> {
        decode_or_empty(self.rx.borrow().as_deref())
    }

    /// Wait for the next snapshot. Returns `None` once the backing store
    /// is gone.
    pub async fn next(&mut self) -> Option<Vec<Scheme>> {
        self.rx.changed().await.ok()?;
        Some(decode_or_empty(self.rx.borrow_and_update().as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::MemoryKvStore;

    fn dice() -> Scheme {
        Scheme::new("Dice", 1, 6)
    }

    fn store() -> SchemeStore {
        SchemeStore::new(Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn test_empty_store_observes_empty_collection() {
        let store = store();
        let sub = store.observe_schemes().await.unwrap();
        assert!(sub.current().is_empty());
    }

    #[tokio::test]
    async fn test_add_then_observe() {
        let store = store();
        store.add_scheme(dice()).await.unwrap();
        let sub = store.observe_schemes().await.unwrap();
        assert_eq!(sub.current(), vec![dice()]);
    }

    #[tokio::test]
    async fn test_add_then_remove_leaves_empty() {
        let store = store();
        store.add_scheme(dice()).await.unwrap();
        store.remove_scheme(&dice()).await.unwrap();
        assert!(store.observe_schemes().await.unwrap().current().is_empty());
    }

    #[tokio::test]
    async fn test_insertion_order_is_preserved() {
        let store = store();
        store.add_scheme(Scheme::new("a", 1, 2)).await.unwrap();
        store.add_scheme(Scheme::new("b", 3, 4)).await.unwrap();
        store.add_scheme(Scheme::new("c", 5, 6)).await.unwrap();

        let names: Vec<String> = store
            .observe_schemes()
            .await
            .unwrap()
            .current()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept_and_removed_together() {
        let store = store();
        store.add_scheme(dice()).await.unwrap();
        store.add_scheme(Scheme::new("Coin", 0, 1)).await.unwrap();
        store.add_scheme(dice()).await.unwrap();
        assert_eq!(store.observe_schemes().await.unwrap().current().len(), 3);

        store.remove_scheme(&dice()).await.unwrap();
        assert_eq!(
            store.observe_schemes().await.unwrap().current(),
            vec![Scheme::new("Coin", 0, 1)]
        );
    }

    #[tokio::test]
    async fn test_same_name_different_bounds_are_distinct() {
        let store = store();
        store.add_scheme(Scheme::new("Dice", 1, 6)).await.unwrap();
        store.add_scheme(Scheme::new("Dice", 1, 20)).await.unwrap();

        store.remove_scheme(&Scheme::new("Dice", 1, 6)).await.unwrap();
        assert_eq!(
            store.observe_schemes().await.unwrap().current(),
            vec![Scheme::new("Dice", 1, 20)]
        );
    }

    #[tokio::test]
    async fn test_remove_from_empty_store_commits_empty() {
        let store = store();
        store.remove_scheme(&dice()).await.unwrap();
        assert!(store.observe_schemes().await.unwrap().current().is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_scheme_changes_nothing() {
        let store = store();
        store.add_scheme(dice()).await.unwrap();
        store.remove_scheme(&Scheme::new("Nope", 1, 2)).await.unwrap();
        assert_eq!(store.observe_schemes().await.unwrap().current(), vec![dice()]);
    }

    #[tokio::test]
    async fn test_add_then_remove_restores_prior_state() {
        let store = store();
        store.add_scheme(Scheme::new("Keep", 1, 10)).await.unwrap();
        let before = store.observe_schemes().await.unwrap().current();

        store.add_scheme(dice()).await.unwrap();
        store.remove_scheme(&dice()).await.unwrap();
        assert_eq!(store.observe_schemes().await.unwrap().current(), before);
    }

    #[tokio::test]
    async fn test_first_next_resolves_immediately() {
        let store = store();
        store.add_scheme(dice()).await.unwrap();
        let mut sub = store.observe_schemes().await.unwrap();
        assert_eq!(sub.next().await, Some(vec![dice()]));
    }

    #[tokio::test]
    async fn test_subscription_sees_each_mutation() {
        let store = store();
        let mut sub = store.observe_schemes().await.unwrap();
        assert_eq!(sub.next().await, Some(Vec::new()));

        store.add_scheme(dice()).await.unwrap();
        assert_eq!(sub.next().await, Some(vec![dice()]));

        store.remove_scheme(&dice()).await.unwrap();
        assert_eq!(sub.next().await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_corrupt_value_observes_as_empty() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.transact(SCHEMES_KEY, Box::new(|_| Ok(Some("###".to_string()))))
            .await
            .unwrap();

        let store = SchemeStore::new(kv);
        assert!(store.observe_schemes().await.unwrap().current().is_empty());
    }

    #[tokio::test]
    async fn test_non_array_value_observes_as_empty() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.transact(
            SCHEMES_KEY,
            Box::new(|_| Ok(Some(r#"{"name":"Dice","min":1,"max":6}"#.to_string()))),
        )
        .await
        .unwrap();

        let store = SchemeStore::new(kv);
        assert!(store.observe_schemes().await.unwrap().current().is_empty());
    }

    #[tokio::test]
    async fn test_ill_typed_records_observe_as_empty() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.transact(
            SCHEMES_KEY,
            Box::new(|_| Ok(Some(r#"[{"name":"Dice"}]"#.to_string()))),
        )
        .await
        .unwrap();

        let store = SchemeStore::new(kv);
        assert!(store.observe_schemes().await.unwrap().current().is_empty());
    }

    #[tokio::test]
    async fn test_blank_value_observes_as_empty() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.transact(SCHEMES_KEY, Box::new(|_| Ok(Some("   ".to_string()))))
            .await
            .unwrap();

        let store = SchemeStore::new(kv);
        assert!(store.observe_schemes().await.unwrap().current().is_empty());
    }

    #[tokio::test]
    async fn test_add_after_corruption_starts_fresh() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.transact(SCHEMES_KEY, Box::new(|_| Ok(Some("not json".to_string()))))
            .await
            .unwrap();

        let store = SchemeStore::new(kv);
        store.add_scheme(dice()).await.unwrap();
        assert_eq!(store.observe_schemes().await.unwrap().current(), vec![dice()]);
    }

    #[tokio::test]
    async fn test_unvalidated_bounds_are_persisted_as_given() {
        let store = store();
        store.add_scheme(Scheme::new("Backwards", 9, 2)).await.unwrap();
        assert_eq!(
            store.observe_schemes().await.unwrap().current(),
            vec![Scheme::new("Backwards", 9, 2)]
        );
    }

    #[test]
    fn test_decode_tolerates_unknown_fields() {
        let decoded = decode_schemes(r#"[{"name":"Dice","min":1,"max":6,"color":"red"}]"#).unwrap();
        assert_eq!(decoded, vec![Scheme::new("Dice", 1, 6)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_lose_nothing() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..16i64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add_scheme(Scheme::new(format!("s{}", i), 0, i))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.observe_schemes().await.unwrap().current().len(), 16);
    }
}
