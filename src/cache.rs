//! Content-addressed audio cache
//!
//! One file per fingerprint: Opus-compressed entries are primary,
//! raw PCM entries are the legacy/fallback format. The cache is a pure
//! optimization; every failure here degrades to a network fetch, never
//! to a failed request.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::audio::OpusCodec;
use crate::Result;

/// Deterministic fingerprint identifying previously synthesized audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey(String);

impl CacheKey {
    /// Digest arbitrary bytes into a key
    #[must_use]
    pub fn digest(data: impl AsRef<[u8]>) -> Self {
        let hash = Sha256::digest(data.as_ref());
        Self(hex::encode(hash))
    }

    /// Hex rendering, used as the on-disk file stem
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-disk audio cache rooted at a single directory
pub struct AudioCache {
    dir: PathBuf,
    codec: OpusCodec,
}

impl AudioCache {
    /// Open a cache rooted at `dir`, detecting the transcoder
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            codec: OpusCodec::detect(),
        }
    }

    /// Open a cache with an explicit codec (used to force the raw path)
    #[must_use]
    pub fn with_codec(dir: PathBuf, codec: OpusCodec) -> Self {
        Self { dir, codec }
    }

    /// Look up cached PCM for a key
    ///
    /// Tries the compressed entry first; if it is missing or does not
    /// decode, falls back to the legacy raw entry. Returns `None` on a
    /// miss - callers treat that identically to "never synthesized".
    pub async fn lookup(&self, key: &CacheKey) -> Option<Vec<u8>> {
        if let Ok(opus) = std::fs::read(self.entry_path(key, "opus")) {
            match self.codec.decode(&opus).await {
                Ok(pcm) if !pcm.is_empty() => return Some(pcm),
                Ok(_) => tracing::debug!(key = %key, "cached entry decoded empty"),
                Err(e) => tracing::debug!(key = %key, error = %e, "cached entry undecodable"),
            }
        }
        std::fs::read(self.entry_path(key, "pcm")).ok()
    }

    /// Store synthesized PCM under a key, best-effort
    ///
    /// Compresses via the transcoder when available, otherwise writes
    /// the raw entry. Write failures are swallowed.
    pub async fn store(&self, key: &CacheKey, pcm: &[u8]) {
        if pcm.is_empty() {
            return;
        }

        match self.codec.encode(pcm).await {
            Ok(opus) => self.write_entry(&self.entry_path(key, "opus"), &opus),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "falling back to raw cache entry");
                self.write_entry(&self.entry_path(key, "pcm"), pcm);
            }
        }
    }

    /// Look up a cached transcript
    #[must_use]
    pub fn lookup_transcript(&self, key: &CacheKey) -> Option<String> {
        std::fs::read_to_string(self.dir.join(format!("asr-{}.txt", key.hex()))).ok()
    }

    /// Store a transcript, best-effort
    pub fn store_transcript(&self, key: &CacheKey, text: &str) {
        self.write_entry(&self.dir.join(format!("asr-{}.txt", key.hex())), text.as_bytes());
    }

    /// Number of entries and total size in bytes
    ///
    /// # Errors
    ///
    /// Returns error if the cache directory cannot be read
    pub fn status(&self) -> Result<(usize, u64)> {
        let mut count = 0;
        let mut total = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Ok(meta) = entry.metadata()
                && meta.is_file()
            {
                count += 1;
                total += meta.len();
            }
        }
        Ok((count, total))
    }

    /// Delete every cache entry, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns error if the cache directory cannot be read
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if std::fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Root directory of this cache
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{ext}", key.hex()))
    }

    fn write_entry(&self, path: &Path, data: &[u8]) {
        if let Err(e) = std::fs::write(path, data) {
            tracing::debug!(path = %path.display(), error = %e, "cache write failed");
        }
    }
}
