//! Verified key → WebID cache.
//!
//! One entry per public key that has been matched against a profile.
//! With [`KeyCachePolicy::Forever`] an entry is never refreshed: if the
//! profile later drops the key, the cached resolution stays valid until
//! the process restarts.

use super::cert::PublicKeyId;
use crate::debug;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCachePolicy {
    Forever,
    Ttl(Duration),
}

impl KeyCachePolicy {
    /// `0` seconds means forever.
    pub fn from_secs(secs: u64) -> Self {
        match secs {
            0 => Self::Forever,
            secs => Self::Ttl(Duration::from_secs(secs)),
        }
    }
}

struct Entry {
    webid: String,
    verified_at: Instant,
}

pub struct KeyCache {
    policy: KeyCachePolicy,
    entries: Mutex<FxHashMap<PublicKeyId, Entry>>,
}

impl KeyCache {
    pub fn new(policy: KeyCachePolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// WebID previously verified for `key`, if still fresh.
    pub fn get(&self, key: &PublicKeyId) -> Option<String> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if let KeyCachePolicy::Ttl(ttl) = self.policy
            && entry.verified_at.elapsed() > ttl
        {
            debug!("webid"; "cached key for {} expired", entry.webid);
            entries.remove(key);
            return None;
        }
        Some(entry.webid.clone())
    }

    pub fn insert(&self, key: PublicKeyId, webid: &str) {
        self.entries.lock().insert(
            key,
            Entry {
                webid: webid.to_string(),
                verified_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(modulus: u8) -> PublicKeyId {
        PublicKeyId::rsa(&[modulus], &[3])
    }

    #[test]
    fn test_forever_policy_keeps_entries() {
        let cache = KeyCache::new(KeyCachePolicy::Forever);
        assert!(cache.get(&key(1)).is_none());

        cache.insert(key(1), "https://a.example/#me");
        assert_eq!(cache.get(&key(1)).as_deref(), Some("https://a.example/#me"));
        assert!(cache.get(&key(2)).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_policy_expires_entries() {
        let cache = KeyCache::new(KeyCachePolicy::Ttl(Duration::ZERO));
        cache.insert(key(1), "https://a.example/#me");
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get(&key(1)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_replaces_webid() {
        let cache = KeyCache::new(KeyCachePolicy::Forever);
        cache.insert(key(1), "https://a.example/#me");
        cache.insert(key(1), "https://b.example/#me");
        assert_eq!(cache.get(&key(1)).as_deref(), Some("https://b.example/#me"));
    }

    #[test]
    fn test_policy_from_secs() {
        assert_eq!(KeyCachePolicy::from_secs(0), KeyCachePolicy::Forever);
        assert_eq!(
            KeyCachePolicy::from_secs(60),
            KeyCachePolicy::Ttl(Duration::from_secs(60))
        );
    }
}
