pub mod entry;

use crate::glob::glob_match;
use entry::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Result of a mutating command's first touch of a key: whether it was
/// found live, found but past its deadline (and now physically purged),
/// or never present. Callers that get `Purged` are responsible for
/// emitting the `DEL` log record the purge represents (see spec §4.C,
/// §9 "Lazy purge in read paths").
pub enum Touch<'a> {
    Found(&'a mut Entry),
    Purged,
    Missing,
}

impl<'a> Touch<'a> {
    /// Narrow a live touch down to its list value, if it has one.
    pub fn into_list(self) -> Option<&'a mut crate::types::list::LineList> {
        match self {
            Touch::Found(entry) => entry.value.as_list_mut(),
            _ => None,
        }
    }
}

/// A single logical database (one of 16).
#[derive(Debug, Default)]
pub struct Database {
    data: HashMap<String, Entry>,
}

impl Database {
    pub fn new() -> Self {
        Database { data: HashMap::new() }
    }

    /// Read-only lookup: absent if missing or past its deadline. Never
    /// mutates — used by GET/EXISTS/TTL/LRANGE/TYPE/KEYS, which in this
    /// design acquire only the read lock and therefore must not purge.
    pub fn peek(&self, key: &str) -> Option<&Entry> {
        self.data.get(key).filter(|e| !e.is_expired())
    }

    /// Touch a key under the write lock, purging it if its deadline has
    /// passed. Used by mutating commands that need to know whether a key
    /// is live before deciding what to do.
    pub fn touch_mut(&mut self, key: &str) -> Touch<'_> {
        match self.data.get(key) {
            None => Touch::Missing,
            Some(entry) if entry.is_expired() => {
                self.data.remove(key);
                Touch::Purged
            }
            Some(_) => Touch::Found(self.data.get_mut(key).expect("just checked present")),
        }
    }

    /// Unconditional overwrite. The caller decides the new entry's
    /// `expires_at`; any previous entry (live, stale, or absent) is
    /// replaced in one step, so no separate purge/log is needed here.
    pub fn set(&mut self, key: String, entry: Entry) {
        self.data.insert(key, entry);
    }

    /// Remove a key unconditionally. Returns true if a live entry was
    /// removed — a stale (already-expired) entry purged here is not
    /// counted, since it was already logically absent.
    pub fn del(&mut self, key: &str) -> bool {
        match self.data.get(key) {
            Some(entry) if entry.is_expired() => {
                self.data.remove(key);
                false
            }
            Some(_) => self.data.remove(key).is_some(),
            None => false,
        }
    }

    /// Move `old`'s value to `new`, overwriting whatever `new` held. The
    /// source's expiration is not carried over (spec §9 open question 2) —
    /// the renamed entry starts with no deadline, same as a fresh `SET`.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        if let Some(mut entry) = self.data.remove(old) {
            entry.expires_at = None;
            self.data.insert(new.to_string(), entry);
            true
        } else {
            false
        }
    }

    /// Keys matching a glob pattern, excluding expired ones. Read-only.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        self.data
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Set expiry on a key. Returns true if the key exists (and is live).
    pub fn set_expiry(&mut self, key: &str, expires_at: u64) -> bool {
        if let Some(entry) = self.data.get_mut(key) {
            entry.expires_at = Some(expires_at);
            true
        } else {
            false
        }
    }

    pub fn flush(&mut self) {
        self.data.clear();
    }

    /// Iterate all entries as stored, including stale ones not yet
    /// purged — used by the snapshotter, which accepts a short window of
    /// inconsistency per spec §4.F rather than purging under a read lock.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The complete data store: 16 independent logical databases.
#[derive(Debug)]
pub struct DataStore {
    pub databases: Vec<Database>,
    /// Mutations applied since the process started. Diagnostics only — no
    /// command surfaces it, there's no INFO-style introspection in this
    /// protocol — logged alongside each snapshot write.
    pub dirty: u64,
}

impl DataStore {
    pub fn new(num_databases: usize) -> Self {
        let databases = (0..num_databases).map(|_| Database::new()).collect();
        DataStore { databases, dirty: 0 }
    }

    pub fn db(&mut self, index: usize) -> &mut Database {
        &mut self.databases[index]
    }

    pub fn flush_all(&mut self) {
        for db in &mut self.databases {
            db.flush();
        }
        self.dirty += 1;
    }
}

pub type SharedStore = Arc<RwLock<DataStore>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use crate::types::rstring::LineString;

    #[test]
    fn del_is_idempotent() {
        let mut db = Database::new();
        db.set("k".to_string(), Entry::new(Value::String(LineString::new("v".to_string()))));
        assert!(db.del("k"));
        assert!(!db.del("k"));
    }

    #[test]
    fn peek_treats_expired_as_absent_without_mutating() {
        let mut db = Database::new();
        db.set(
            "k".to_string(),
            Entry::with_expiry(Value::String(LineString::new("v".to_string())), 1),
        );
        assert!(db.peek("k").is_none());
        // still physically present — peek must not purge
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn touch_mut_purges_expired_entry() {
        let mut db = Database::new();
        db.set(
            "k".to_string(),
            Entry::with_expiry(Value::String(LineString::new("v".to_string())), 1),
        );
        match db.touch_mut("k") {
            Touch::Purged => {}
            _ => panic!("expected Purged"),
        }
        assert_eq!(db.len(), 0);
    }

    #[test]
    fn keys_glob_star() {
        let mut db = Database::new();
        for k in ["user:1", "user:2", "order:1"] {
            db.set(k.to_string(), Entry::new(Value::String(LineString::new("v".to_string()))));
        }
        let mut matched = db.keys("user:*");
        matched.sort();
        assert_eq!(matched, vec!["user:1", "user:2"]);
    }
}
