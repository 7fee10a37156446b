use dashmap::DashSet;

/// Run-scoped set of keys already written. Shared by reference across workers.
#[derive(Debug, Default)]
pub struct Deduplicator {
    keys: DashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true exactly once per distinct key, no matter how many workers
    /// race on it.
    pub fn check_and_insert(&self, key: &str) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        self.keys.insert(key.to_owned())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
