//! Per-declaration instance cache.
//!
//! Buckets are keyed by a content hash of the deduced arguments plus the
//! enclosing context. Identity is decided by structural equality inside the
//! bucket, so colliding hashes only cost a scan.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;

use crate::argument::Argument;
use crate::ids::{InstanceId, ScopeId};


/// Hash of an instance's identity.
pub fn content_hash(args: &[Argument], enclosing: Option<ScopeId>) -> u64 {
    let mut hasher = FxHasher::default();
    args.hash(&mut hasher);
    enclosing.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Default)]
pub struct InstanceCache {
    buckets: FxHashMap<u64, SmallVec<[InstanceId; 1]>>,
    len: usize,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// First instance in the `hash` bucket accepted by `same`.
    pub fn find(&self, hash: u64, mut same: impl FnMut(InstanceId) -> bool) -> Option<InstanceId> {
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|&id| same(id))
    }

    pub fn insert(&mut self, hash: u64, id: InstanceId) {
        self.buckets.entry(hash).or_default().push(id);
        self.len += 1;
    }

    /// Remove `id` from the `hash` bucket. Returns whether it was present.
    pub fn remove(&mut self, hash: u64, id: InstanceId) -> bool {
        let Some(bucket) = self.buckets.get_mut(&hash) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|&e| e == id) else {
            return false;
        };
        bucket.remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&hash);
        }
        self.len -= 1;
        true
    }

    pub fn bucket_len(&self, hash: u64) -> usize {
        self.buckets.get(&hash).map_or(0, SmallVec::len)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.buckets.values().flat_map(|b| b.iter().copied())
    }
}
