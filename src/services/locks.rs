use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// One exclusive editing claim on one file. The lock id is chosen by the
/// client and is opaque to us; we only ever compare it for equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WopiLock {
    pub lock_id: String,
    pub expires: DateTime<Utc>,
}

impl WopiLock {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AcquireResult {
    Created,
    Refreshed,
    Conflict { current: String },
}

/// Outcome of refresh/release. On conflict, `current` carries the present
/// holder (None when the file is simply unlocked) so the protocol layer can
/// fill the X-WOPI-Lock response header.
#[derive(Debug, PartialEq, Eq)]
pub enum LockResult {
    Ok,
    Conflict { current: Option<String> },
}

/// Process-wide lock table, keyed by file id.
///
/// All transitions go through the dashmap entry API, which holds the shard
/// write lock for the duration of the closure, so two concurrent LOCK calls
/// on the same file can never both observe "no lock". Expiry is lazy: a
/// stale entry is removed by whichever operation touches it next.
pub struct LockRegistry {
    locks: DashMap<String, WopiLock>,
    ttl: Duration,
}

impl LockRegistry {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            locks: DashMap::new(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Current live lock for a file, purging a stale one on the way.
    pub fn get(&self, file_id: &str) -> Option<WopiLock> {
        match self.locks.entry(file_id.to_string()) {
            Entry::Occupied(entry) => {
                if entry.get().is_live(Utc::now()) {
                    Some(entry.get().clone())
                } else {
                    entry.remove();
                    None
                }
            }
            Entry::Vacant(_) => None,
        }
    }

    /// LOCK: create when absent, re-arm the TTL when the same id already
    /// holds the lock, otherwise report the conflicting holder untouched.
    pub fn acquire(&self, file_id: &str, lock_id: &str) -> AcquireResult {
        let now = Utc::now();
        match self.locks.entry(file_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_live(now) {
                    entry.insert(self.new_lock(lock_id, now));
                    AcquireResult::Created
                } else if entry.get().lock_id == lock_id {
                    entry.get_mut().expires = now + self.ttl;
                    AcquireResult::Refreshed
                } else {
                    AcquireResult::Conflict {
                        current: entry.get().lock_id.clone(),
                    }
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(self.new_lock(lock_id, now));
                AcquireResult::Created
            }
        }
    }

    /// REFRESH_LOCK: extend only a live, matching lock.
    pub fn refresh(&self, file_id: &str, lock_id: &str) -> LockResult {
        let now = Utc::now();
        match self.locks.entry(file_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_live(now) {
                    entry.remove();
                    LockResult::Conflict { current: None }
                } else if entry.get().lock_id == lock_id {
                    entry.get_mut().expires = now + self.ttl;
                    LockResult::Ok
                } else {
                    LockResult::Conflict {
                        current: Some(entry.get().lock_id.clone()),
                    }
                }
            }
            Entry::Vacant(_) => LockResult::Conflict { current: None },
        }
    }

    /// UNLOCK: remove only a live, matching lock.
    pub fn release(&self, file_id: &str, lock_id: &str) -> LockResult {
        let now = Utc::now();
        match self.locks.entry(file_id.to_string()) {
            Entry::Occupied(entry) => {
                if !entry.get().is_live(now) {
                    entry.remove();
                    LockResult::Conflict { current: None }
                } else if entry.get().lock_id == lock_id {
                    entry.remove();
                    LockResult::Ok
                } else {
                    LockResult::Conflict {
                        current: Some(entry.get().lock_id.clone()),
                    }
                }
            }
            Entry::Vacant(_) => LockResult::Conflict { current: None },
        }
    }

    fn new_lock(&self, lock_id: &str, now: DateTime<Utc>) -> WopiLock {
        WopiLock {
            lock_id: lock_id.to_string(),
            expires: now + self.ttl,
        }
    }
}
