use dashmap::DashMap;

use super::Cancel;
use super::CancelHandle;
use super::ScopeHandle;
use crate::ResourceKey;

/// Concurrent map of resource key to the stop handle of its live watch task.
///
/// Each key lives in one DashMap shard, so operations on a key are
/// linearizable while keys in other shards proceed without contention.
/// The registry never invokes handles itself: whoever receives a handle from
/// [`store`](Self::store), [`remove`](Self::remove) or
/// [`drain`](Self::drain) owns it and must cancel it.
#[derive(Debug)]
pub struct WatchRegistry<T = CancelHandle>
where
    T: Cancel,
{
    entries: DashMap<ResourceKey, T>,
}

impl<T> Default for WatchRegistry<T>
where
    T: Cancel,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T> WatchRegistry<T>
where
    T: Cancel,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `token` for `key`, returning the handle it displaced.
    ///
    /// Of any number of concurrent stores for the same key, exactly one
    /// observes `None`.
    pub fn store(
        &self,
        key: ResourceKey,
        token: T,
    ) -> Option<T> {
        self.entries.insert(key, token)
    }

    /// Deletes the entry for `key`, returning its handle if there was one.
    pub fn remove(
        &self,
        key: &ResourceKey,
    ) -> Option<T> {
        self.entries.remove(key).map(|(_, token)| token)
    }

    /// Removes every entry, handing back the handles.
    ///
    /// Entries stored concurrently with a drain may survive it.
    pub fn drain(&self) -> Vec<(ResourceKey, T)> {
        let keys: Vec<ResourceKey> = self.entries.iter().map(|entry| entry.key().clone()).collect();

        keys.into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }

    pub fn contains(
        &self,
        key: &ResourceKey,
    ) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the tracked keys in sorted order.
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl<T> WatchRegistry<T>
where
    T: ScopeHandle,
{
    /// Generation of the handle currently installed for `key`.
    pub fn generation_of(
        &self,
        key: &ResourceKey,
    ) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.value().generation())
    }
}
