//! Write-once artifact cache.
//!
//! Generated images are stored under `<cache_dir>/<slug>/<relative_path>`,
//! mirroring the layout of the originals. An entry is written the first time
//! a (format, image) pair is requested and served from disk from then on.
//!
//! # Design
//!
//! The cache trusts its entries unconditionally. There is no manifest, no
//! hashing of the original and no expiry: if an original changes, its
//! artifacts are stale until someone deletes them. Keeping the lookup to a
//! single `stat` is what makes a hit cheap.
//!
//! ## Keys
//!
//! A [`CacheKey`] is the `(slug, relative_path)` pair. Because the slug is
//! always the first path component, two formats can never share a location.
//!
//! ## Writes
//!
//! [`DiskCache::write`] creates missing directories, writes the bytes to a
//! temporary file next to the target and renames it into place. A reader
//! therefore sees either no file or the complete file, and two requests that
//! race to generate the same artifact each replace it atomically with
//! identical bytes.
//!
//! The [`CacheStore`] trait abstracts these three operations so the resolver
//! can be tested against an in-memory store.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("no cached artifact for {0}")]
    NotFound(CacheKey),
    #[error("cache I/O error for {key}: {source}")]
    Io { key: CacheKey, source: io::Error },
}

impl CacheError {
    fn io(key: &CacheKey, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            CacheError::NotFound(key.clone())
        } else {
            CacheError::Io {
                key: key.clone(),
                source,
            }
        }
    }
}

/// Location of one artifact: the format slug plus the original's relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    slug: String,
    relative_path: PathBuf,
}

impl CacheKey {
    pub fn new(slug: impl Into<String>, relative_path: impl Into<PathBuf>) -> Self {
        Self {
            slug: slug.into(),
            relative_path: relative_path.into(),
        }
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// `<slug>/<relative_path>`, relative to the cache root.
    pub fn location(&self) -> PathBuf {
        Path::new(&self.slug).join(&self.relative_path)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location().display())
    }
}

/// Whether `segment` can name a single directory level below the cache root
/// without aliasing or escaping it.
pub fn is_plain_segment(segment: &str) -> bool {
    !matches!(segment, "" | "." | "..") && !segment.contains(['/', '\\', '\0'])
}

/// Storage for generated artifacts.
///
/// `exists` answers `Ok(false)` for a missing entry and reserves `Err` for
/// real I/O failures, so callers can tell the two apart.
pub trait CacheStore: Send + Sync {
    fn exists(&self, key: &CacheKey) -> Result<bool, CacheError>;

    fn read(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError>;

    fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError>;
}

/// Filesystem-backed [`CacheStore`] rooted at the configured cache directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute (or cwd-relative) path of an entry.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.location())
    }
}

impl CacheStore for DiskCache {
    fn exists(&self, key: &CacheKey) -> Result<bool, CacheError> {
        match std::fs::metadata(self.path_for(key)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(key, e)),
        }
    }

    fn read(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError> {
        std::fs::read(self.path_for(key)).map_err(|e| CacheError::io(key, e))
    }

    fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let dir = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir).map_err(|e| CacheError::io(key, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(dir)
            .map_err(|e| CacheError::io(key, e))?;
        tmp.write_all(bytes).map_err(|e| CacheError::io(key, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| CacheError::io(key, e))?;
        tmp.persist(&path)
            .map_err(|e| CacheError::io(key, e.error))?;
        Ok(())
    }
}

/// Outcome counts for a warm-up run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub generated: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn generate(&mut self) {
        self.generated += 1;
    }

    pub fn fail(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.generated + self.failed
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.hits += other.hits;
        self.generated += other.generated;
        self.failed += other.failed;
        self
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed > 0 {
            write!(
                f,
                "{} cached, {} generated, {} failed ({} total)",
                self.hits,
                self.generated,
                self.failed,
                self.total()
            )
        } else if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.generated,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.generated)
        }
    }
}
