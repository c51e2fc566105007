use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Key-value store whose entries expire after a TTL.
/// Used for one-time codes; implementations must be shareable across workers.
pub trait ExpiringStore: Send + Sync {
    fn save(&self, key: &str, value: &str, ttl: Duration);
    fn get(&self, key: &str) -> Option<String>;
    fn delete(&self, key: &str);
}

/// Process-local implementation for single-instance deployments and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ExpiringStore for MemoryStore {
    fn save(&self, key: &str, value: &str, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        let mut entries = self.lock();
        // opportunistic cleanup so abandoned codes do not pile up
        let now = Instant::now();
        entries.retain(|_, (_, exp)| *exp > now);
        entries.insert(key.to_string(), (value.to_string(), expires_at));
    }

    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn delete(&self, key: &str) {
        self.lock().remove(key);
    }
}
