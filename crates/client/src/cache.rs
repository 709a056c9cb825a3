use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// GET response bodies keyed by path and query string.
///
/// Entries expire after `ttl`. Mutations drop whole resource families by
/// path prefix, so `/api/lots` also clears `/api/lots/{id}/encaissements`.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh body for `key`, if any. Expired entries are evicted on read.
    pub fn get(&self, key: &str) -> Option<String> {
        if self.ttl.is_zero() {
            return None;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((stored, body)) if stored.elapsed() < self.ttl => Some(body.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `body` under `key`. Entries that have already expired are
    /// dropped first so keys that are never read again do not pile up.
    pub fn put(&self, key: impl Into<String>, body: String) {
        if self.ttl.is_zero() {
            return;
        }
        let ttl = self.ttl;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
        entries.insert(key.into(), (Instant::now(), body));
    }

    /// Drop every entry whose key starts with one of `prefixes`.
    /// Returns the number of entries removed.
    pub fn invalidate(&self, prefixes: &[&str]) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|key, _| !prefixes.iter().any(|p| matches_prefix(key, p)));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `/api/lots` matches `/api/lots`, `/api/lots?page=2` and `/api/lots/x`,
/// not `/api/lotsx`.
fn matches_prefix(key: &str, prefix: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_whole_segments() {
        assert!(matches_prefix("/api/lots", "/api/lots"));
        assert!(matches_prefix("/api/lots?page=2", "/api/lots"));
        assert!(matches_prefix("/api/lots/abc/encaissements", "/api/lots"));
        assert!(!matches_prefix("/api/lotsx", "/api/lots"));
        assert!(!matches_prefix("/api/immeubles", "/api/lots"));
    }

    #[test]
    fn invalidation_drops_only_matching_families() {
        let cache = ResponseCache::new(Duration::from_secs(30));
        cache.put("/api/lots?page=1", "a".into());
        cache.put("/api/lots/1/encaissements", "b".into());
        cache.put("/api/affaires", "c".into());

        assert_eq!(cache.invalidate(&["/api/lots", "/api/encaissements"]), 2);
        assert_eq!(cache.get("/api/affaires").as_deref(), Some("c"));
        assert_eq!(cache.get("/api/lots?page=1"), None);
    }

    #[test]
    fn entries_expire() {
        let cache = ResponseCache::new(Duration::from_millis(20));
        cache.put("/api/affaires", "x".into());
        assert!(cache.get("/api/affaires").is_some());
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("/api/affaires"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn put_evicts_expired_entries() {
        let cache = ResponseCache::new(Duration::from_millis(20));
        cache.put("/api/affaires?page=1", "x".into());
        cache.put("/api/affaires?page=2", "y".into());
        std::thread::sleep(Duration::from_millis(40));
        cache.put("/api/lots", "z".into());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("/api/lots").as_deref(), Some("z"));
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.put("/api/affaires", "x".into());
        assert_eq!(cache.get("/api/affaires"), None);
        assert_eq!(cache.len(), 0);
    }
}
