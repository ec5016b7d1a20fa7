//! VCEK certificate caches.
//!
//! A VCEK certificate is immutable for a given chip and TCB, and its URL
//! names both, so entries are keyed by URL and never invalidated.
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::{info, warn};

use crate::{
    config::Config,
    error::{CombineError, Result},
};

/// Table holding certificates by VCEK URL.
const VCEK_CERTS: TableDefinition<&str, &[u8]> = TableDefinition::new("vcek_certs");

pub trait CertificateCache: Send + Sync {
    fn get(&self, url: &str) -> Option<Vec<u8>>;

    /// Store a certificate. Overwriting an existing entry is harmless.
    fn put(&self, url: &str, certificate: &[u8]);
}

impl<C: CertificateCache + ?Sized> CertificateCache for Arc<C> {
    fn get(&self, url: &str) -> Option<Vec<u8>> {
        (**self).get(url)
    }

    fn put(&self, url: &str, certificate: &[u8]) {
        (**self).put(url, certificate)
    }
}

/// Certificates kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCertificateCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCertificateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CertificateCache for MemoryCertificateCache {
    fn get(&self, url: &str) -> Option<Vec<u8>> {
        // A poisoned lock still holds complete entries.
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(url).cloned()
    }

    fn put(&self, url: &str, certificate: &[u8]) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(url.to_string(), certificate.to_vec());
    }
}

/// Certificates persisted in a redb file, surviving restarts.
///
/// Storage errors after opening are logged and behave like a miss.
pub struct RedbCertificateCache {
    db: Database,
}

impl RedbCertificateCache {
    /// Open (or create) the cache at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let cache_error = |e: redb::Error| CombineError::Cache(e.to_string());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CombineError::Cache(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let db = Database::create(path).map_err(|e| cache_error(e.into()))?;

        // Pre-create the table so read transactions don't fail
        let write_txn = db.begin_write().map_err(|e| cache_error(e.into()))?;
        write_txn
            .open_table(VCEK_CERTS)
            .map_err(|e| cache_error(e.into()))?;
        write_txn.commit().map_err(|e| cache_error(e.into()))?;

        Ok(Self { db })
    }

    fn read(&self, url: &str) -> std::result::Result<Option<Vec<u8>>, redb::Error> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VCEK_CERTS)?;
        Ok(table.get(url)?.map(|v| v.value().to_vec()))
    }

    fn write(&self, url: &str, certificate: &[u8]) -> std::result::Result<(), redb::Error> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(VCEK_CERTS)?;
            table.insert(url, certificate)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl CertificateCache for RedbCertificateCache {
    fn get(&self, url: &str) -> Option<Vec<u8>> {
        match self.read(url) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, url, "failed to read cached certificate");
                None
            }
        }
    }

    fn put(&self, url: &str, certificate: &[u8]) {
        if let Err(e) = self.write(url, certificate) {
            warn!(error = %e, url, "failed to cache certificate");
        }
    }
}

/// The process-wide cache for `config`.
///
/// Uses redb when a cache path is configured and opens cleanly, memory
/// otherwise.
pub fn open_certificate_cache(config: &Config) -> Arc<dyn CertificateCache> {
    if let Some(path) = &config.cert_cache_path {
        match RedbCertificateCache::open(path) {
            Ok(cache) => {
                info!(path = %path.display(), "using persistent VCEK certificate cache");
                return Arc::new(cache);
            }
            Err(e) => {
                warn!(
                    error = %e,
                    path = %path.display(),
                    "falling back to in-memory VCEK certificate cache"
                );
            }
        }
    }
    Arc::new(MemoryCertificateCache::new())
}
