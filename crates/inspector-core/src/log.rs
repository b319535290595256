//! The shared request log.

use crate::record::RequestRecord;
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default number of records kept by [`RequestLog::default`].
pub const DEFAULT_MAX_RECORDS: usize = 1000;

/// Newest-first log of recorded requests.
///
/// Insertion takes the write lock for a single push (plus at most one
/// eviction), so readers see a record either completely or not at all.
/// Share it between the recorder and readers with an `Arc`.
#[derive(Debug)]
pub struct RequestLog {
    records: RwLock<VecDeque<Arc<RequestRecord>>>,
    capacity: Option<usize>,
}

impl RequestLog {
    /// Create a log without a size limit.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: None,
        }
    }

    /// Create a log that keeps at most `max_records` entries, evicting the
    /// oldest on insert. A capacity of zero is treated as one.
    pub fn bounded(max_records: usize) -> Self {
        let capacity = max_records.max(1);
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: Some(capacity),
        }
    }

    /// Maximum number of retained records, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Insert a record at the head of the log.
    ///
    /// Returns the shared handle that was stored.
    pub fn insert(&self, record: RequestRecord) -> Arc<RequestRecord> {
        let record = Arc::new(record);
        let mut records = self.write();

        if let Some(capacity) = self.capacity {
            while records.len() >= capacity {
                records.pop_back();
            }
        }
        records.push_front(record.clone());

        record
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of every record handle, newest first.
    pub fn snapshot(&self) -> Vec<Arc<RequestRecord>> {
        self.read().iter().cloned().collect()
    }

    /// Total count plus up to `len` records starting at `offset`, read under
    /// one lock acquisition.
    pub fn slice(&self, offset: usize, len: usize) -> (usize, Vec<Arc<RequestRecord>>) {
        let records = self.read();
        let total = records.len();
        let page = records.iter().skip(offset).take(len).cloned().collect();
        (total, page)
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.write().clear();
    }

    // Every critical section is a single push, pop or clone, so a panic
    // elsewhere cannot leave the deque half-updated.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<Arc<RequestRecord>>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<Arc<RequestRecord>>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::bounded(DEFAULT_MAX_RECORDS)
    }
}
