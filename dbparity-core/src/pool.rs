//! Connection pooling keyed by connection fingerprint.
//!
//! The pool caches opaque backend handles (engines, clients, sessions) so
//! that comparison sessions hitting the same backend share them instead of
//! reconnecting. Discipline is **shared handle, backend-safe for
//! concurrent use**: the pool serializes handle creation and registration
//! under one lock, but never serializes handle *use* -- after `acquire`
//! returns, concurrency is whatever contract the backend handle itself
//! provides.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ParityError, Result};

/// Stable identity of a backend connection target.
///
/// Derived from host, port, username, and database-or-service name; two
/// requests with identical fingerprints share pooled handles. Credentials
/// are deliberately not part of the fingerprint and never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionFingerprint {
    host: String,
    port: u16,
    username: String,
    database: String,
}

impl ConnectionFingerprint {
    /// Creates a fingerprint from connection parameters.
    ///
    /// Fields are trimmed and lowercased so that `DB1` and `db1` pool
    /// together.
    pub fn new(
        host: impl AsRef<str>,
        port: u16,
        username: impl AsRef<str>,
        database: impl AsRef<str>,
    ) -> Self {
        Self {
            host: host.as_ref().trim().to_lowercase(),
            port,
            username: username.as_ref().trim().to_lowercase(),
            database: database.as_ref().trim().to_lowercase(),
        }
    }

    /// Stable content-hash cache key (FNV-1a over the canonical fields).
    ///
    /// Suitable as a map key in external caches and stable across runs and
    /// processes, unlike `std` hasher output.
    pub fn cache_key(&self) -> String {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

        let mut hash = FNV_OFFSET;
        for part in [
            self.host.as_bytes(),
            &self.port.to_be_bytes(),
            self.username.as_bytes(),
            self.database.as_bytes(),
        ] {
            for &byte in part {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
            hash ^= u64::from(b'/');
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        format!("{:016x}", hash)
    }
}

impl std::fmt::Display for ConnectionFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Intentionally omits the username
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

struct PoolEntry<H> {
    handles: Vec<Arc<H>>,
    next: usize,
}

impl<H> PoolEntry<H> {
    fn new() -> Self {
        Self {
            handles: Vec::new(),
            next: 0,
        }
    }
}

/// Thread-safe cache of backend handles keyed by fingerprint.
///
/// Entries are created lazily on first `acquire` and capped per
/// fingerprint by a configured maximum. The internal map is guarded by a
/// single async mutex held across factory invocation, so concurrent
/// acquires for the same fingerprint cannot race-construct two handles.
pub struct ConnectionPool<H> {
    entries: Mutex<HashMap<ConnectionFingerprint, PoolEntry<H>>>,
    max_handles_per_fingerprint: usize,
}

impl<H> Default for ConnectionPool<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ConnectionPool<H> {
    /// Creates a pool with one shared handle per fingerprint.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_handles_per_fingerprint: 1,
        }
    }

    /// Creates a pool allowing up to `max_handles` concurrent handles per
    /// fingerprint, handed out round-robin once the cap is reached.
    ///
    /// # Errors
    /// Returns a configuration error if `max_handles` is zero.
    pub fn with_max_handles(max_handles: usize) -> Result<Self> {
        if max_handles == 0 {
            return Err(ParityError::configuration(
                "max_handles_per_fingerprint must be greater than 0",
            ));
        }
        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            max_handles_per_fingerprint: max_handles,
        })
    }

    /// Returns a pooled handle for the fingerprint, invoking `factory`
    /// only while the fingerprint is below its handle cap.
    ///
    /// At the cap, cached handles are returned round-robin. A factory
    /// failure leaves nothing cached for the fingerprint and is not
    /// retried here; retry policy belongs to the caller.
    ///
    /// # Errors
    /// Returns [`ParityError::Connection`] carrying the fingerprint and
    /// the factory's error as source.
    pub async fn acquire<F, Fut, E>(
        &self,
        fingerprint: &ConnectionFingerprint,
        factory: F,
    ) -> Result<Arc<H>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<H, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(fingerprint.clone())
            .or_insert_with(PoolEntry::new);

        if entry.handles.len() < self.max_handles_per_fingerprint {
            // Factory runs under the map lock: slower, but no two callers
            // can construct a handle for the same fingerprint at once.
            match factory().await {
                Ok(handle) => {
                    let handle = Arc::new(handle);
                    entry.handles.push(Arc::clone(&handle));
                    info!(
                        "Pooled new handle for {} ({} of {})",
                        fingerprint,
                        entry.handles.len(),
                        self.max_handles_per_fingerprint
                    );
                    Ok(handle)
                }
                Err(e) => {
                    if entry.handles.is_empty() {
                        entries.remove(fingerprint);
                    }
                    Err(ParityError::connection_failed(fingerprint.to_string(), e))
                }
            }
        } else {
            let index = entry.next % entry.handles.len();
            entry.next = entry.next.wrapping_add(1);
            debug!("Reusing pooled handle {} for {}", index, fingerprint);
            Ok(Arc::clone(&entry.handles[index]))
        }
    }

    /// Releases every cached handle and clears the cache.
    ///
    /// Handles are opaque to the pool; each one closes when its last
    /// `Arc` drops, including clones still held by callers.
    pub async fn release_all(&self) {
        let mut entries = self.entries.lock().await;
        let handle_count: usize = entries.values().map(|e| e.handles.len()).sum();
        entries.clear();
        info!("Released {} pooled handle(s)", handle_count);
    }

    /// Number of fingerprints with at least one cached handle.
    pub async fn fingerprint_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Number of cached handles for one fingerprint.
    pub async fn handle_count(&self, fingerprint: &ConnectionFingerprint) -> usize {
        self.entries
            .lock()
            .await
            .get(fingerprint)
            .map_or(0, |e| e.handles.len())
    }
}
