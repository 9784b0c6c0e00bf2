use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::RwLock;

use dashmap::DashMap;

use crate::api::PathHandle;

use super::route::EvpnRouteKey;

/// Correspondence from a source route key to the synthetic path it
/// produced. Lock-striped; point operations stay cheap while reload-time
/// sweeps iterate concurrently with event handling.
#[derive(Debug)]
pub struct RouteMap<K: Eq + Hash>(DashMap<K, PathHandle>);

impl<K: Eq + Hash + Clone> RouteMap<K> {
    pub fn new() -> Self {
        Self(DashMap::new())
    }

    pub fn load(&self, key: &K) -> Option<PathHandle> {
        self.0.get(key).map(|entry| entry.value().clone())
    }

    /// Overwrite, returning the superseded handle if any.
    pub fn insert(&self, key: K, handle: PathHandle) -> Option<PathHandle> {
        self.0.insert(key, handle)
    }

    /// Remove and return in one step.
    pub fn take(&self, key: &K) -> Option<PathHandle> {
        self.0.remove(key).map(|(_, handle)| handle)
    }

    /// Remove every entry whose key matches, returning the removed pairs.
    pub fn take_matching(&self, pred: impl Fn(&K) -> bool) -> Vec<(K, PathHandle)> {
        let keys: Vec<K> = self
            .0
            .iter()
            .filter(|entry| pred(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.into_iter()
            .filter_map(|key| self.0.remove(&key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for RouteMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct RtEntry {
    handle: PathHandle,
    targets: HashSet<String>,
}

#[derive(Debug, Default)]
struct RtIndexInner {
    forward: HashMap<EvpnRouteKey, RtEntry>,
    reverse: HashMap<String, HashSet<EvpnRouteKey>>,
}

impl RtIndexInner {
    /// Remove a key's forward entry and drop it from every bucket it was
    /// recorded under. Returns the handle.
    fn detach(&mut self, key: &EvpnRouteKey) -> Option<PathHandle> {
        let entry = self.forward.remove(key)?;
        for rt in &entry.targets {
            if let Some(bucket) = self.reverse.get_mut(rt) {
                bucket.remove(key);
                if bucket.is_empty() {
                    self.reverse.remove(rt);
                }
            }
        }
        Some(entry.handle)
    }
}

/// Correspondence store for the EVPN→VPN direction, indexed both by route
/// key and by route-target. One lock covers both indices so they are never
/// observed inconsistent; the event-path `get` takes the read side.
#[derive(Debug, Default)]
pub struct RtIndexMap {
    inner: RwLock<RtIndexInner>,
}

impl RtIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &EvpnRouteKey) -> Option<PathHandle> {
        let inner = self.inner.read().unwrap();
        inner.forward.get(key).map(|entry| entry.handle.clone())
    }

    /// Insert or replace. A replaced key leaves all of its previous buckets
    /// first; the superseded handle is returned.
    pub fn store(
        &self,
        key: EvpnRouteKey,
        targets: &[String],
        handle: PathHandle,
    ) -> Option<PathHandle> {
        let mut inner = self.inner.write().unwrap();
        let prior = inner.detach(&key);
        let targets: HashSet<String> = targets.iter().cloned().collect();
        for rt in &targets {
            inner
                .reverse
                .entry(rt.clone())
                .or_default()
                .insert(key.clone());
        }
        inner.forward.insert(key, RtEntry { handle, targets });
        prior
    }

    /// Remove the key from the forward index and from every bucket it is
    /// recorded under, returning its handle.
    pub fn delete(&self, key: &EvpnRouteKey) -> Option<PathHandle> {
        let mut inner = self.inner.write().unwrap();
        inner.detach(key)
    }

    /// Atomically drain every bucket named in `targets`: each affected
    /// key's forward entry is removed and its handle collected. A key that
    /// sat in several drained buckets is returned exactly once.
    pub fn pop_by_rt(&self, targets: &[String]) -> Vec<PathHandle> {
        let mut inner = self.inner.write().unwrap();
        let mut handles = Vec::new();
        for rt in targets {
            let Some(keys) = inner.reverse.remove(rt) else {
                continue;
            };
            for key in keys {
                if let Some(handle) = inner.detach(&key) {
                    handles.push(handle);
                }
            }
        }
        handles
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let inner = self.inner.read().unwrap();
        for (key, entry) in &inner.forward {
            for rt in &entry.targets {
                let bucket = inner.reverse.get(rt).expect("bucket for recorded target");
                assert!(bucket.contains(key), "key missing from bucket {rt}");
            }
        }
        for (rt, bucket) in &inner.reverse {
            assert!(!bucket.is_empty(), "empty bucket {rt} retained");
            for key in bucket {
                let entry = inner.forward.get(key).expect("forward entry for bucket key");
                assert!(entry.targets.contains(rt), "bucket {rt} not recorded on key");
            }
        }
    }
}
