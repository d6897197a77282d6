//! Bucketed server collections.
//!
//! One map keyed by load bucket replaces four separately named lists; the
//! invariant stays the same: a server lives in at most one collection at
//! any instant. All access happens under the controller's lock.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use surge_core::types::LoadBucket;
use surge_sim::Server;

pub(crate) struct BucketMap {
    buckets: HashMap<LoadBucket, VecDeque<Arc<Server>>>,
}

impl BucketMap {
    pub fn new() -> Self {
        let buckets = LoadBucket::PLACEABLE
            .iter()
            .map(|&b| (b, VecDeque::new()))
            .collect();
        Self { buckets }
    }

    fn collection(&self, bucket: LoadBucket) -> &VecDeque<Arc<Server>> {
        &self.buckets[&bucket]
    }

    /// Insert at the front of the bucket's collection.
    pub fn push_front(&mut self, bucket: LoadBucket, server: Arc<Server>) {
        self.buckets
            .get_mut(&bucket)
            .expect("placeable bucket collections are fixed at construction")
            .push_front(server);
    }

    /// The bucket currently holding `server`, if any.
    pub fn locate(&self, server: &Server) -> Option<LoadBucket> {
        LoadBucket::PLACEABLE
            .into_iter()
            .find(|&b| self.collection(b).iter().any(|s| s.id() == server.id()))
    }

    /// Remove `server` from whichever collection holds it.
    pub fn remove(&mut self, server: &Server) -> Option<LoadBucket> {
        for bucket in LoadBucket::PLACEABLE {
            let collection = self.buckets.get_mut(&bucket).expect("fixed buckets");
            if let Some(pos) = collection.iter().position(|s| s.id() == server.id()) {
                collection.remove(pos);
                return Some(bucket);
            }
        }
        None
    }

    /// The foremost server of the first non-empty bucket in `order`.
    pub fn select(&self, order: &[LoadBucket]) -> Option<Arc<Server>> {
        order
            .iter()
            .find_map(|&b| self.collection(b).front().cloned())
    }

    pub fn front(&self, bucket: LoadBucket) -> Option<Arc<Server>> {
        self.collection(bucket).front().cloned()
    }

    pub fn len(&self, bucket: LoadBucket) -> usize {
        self.collection(bucket).len()
    }

    pub fn is_empty(&self, bucket: LoadBucket) -> bool {
        self.collection(bucket).is_empty()
    }

    pub fn servers_in(&self, bucket: LoadBucket) -> Vec<Arc<Server>> {
        self.collection(bucket).iter().cloned().collect()
    }
}
