//! Request-to-artifact resolution.
//!
//! Every request path has the shape `/<slug>/<relative_path>`. The resolver
//! turns it into artifact bytes:
//!
//! ```text
//! parse path ──malformed──────────────────────────────► MalformedRequest
//!     │
//! lookup slug ──unknown───────────────────────────────► UnknownFormat
//!     │
//! cache exists? ──yes──► read ──ok──────────────────► Artifact (Cached)
//!     │ no / I/O error        └─err─┐
//!     ▼                             ▼
//! claim key ─► re-check cache ─► read original ─► convert ─► write ─► Artifact (Generated)
//!                                   │               │          │
//!                                   └───────────────┴──────────┴──► generation error
//! ```
//!
//! Errors are returned, never panicked; the HTTP layer turns every
//! [`ResolveError`] into the 404 placeholder. Cache I/O failures while
//! *looking up* an entry are logged and treated as a miss. A failure while
//! *storing* one fails the request, so a client never gets bytes that were
//! not persisted and a failed generation leaves nothing behind at the key.
//!
//! Concurrent misses on the same key are serialised by [`InFlight`]: the
//! first request generates, the others wait and then find the entry in the
//! cache. Requests for different keys never wait on each other.

use crate::cache::{CacheError, CacheKey, CacheStore, DiskCache, is_plain_segment};
use crate::config::{Config, ConfigError};
use crate::imaging::{
    BackendError, ConvertParams, ImageBackend, Quality, RustBackend, content_type, output_format,
};
use crate::registry::{ConversionProfile, ConversionRegistry};
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("malformed request path '{0}'")]
    MalformedRequest(String),
    #[error("unknown format '{0}'")]
    UnknownFormat(String),
    #[error("original not found: {0}")]
    OriginalNotFound(PathBuf),
    #[error("cannot read original {path}: {source}")]
    OriginalUnreadable { path: PathBuf, source: io::Error },
    #[error("no encoder for output path {0}")]
    UnsupportedOutput(PathBuf),
    #[error("cannot convert {key}: {source}")]
    Conversion {
        key: CacheKey,
        #[source]
        source: BackendError,
    },
    #[error("cannot store artifact: {0}")]
    CacheWrite(#[source] CacheError),
}

impl ResolveError {
    /// True for failures while producing an artifact, as opposed to requests
    /// that never named a servable artifact in the first place.
    pub fn is_generation_failure(&self) -> bool {
        !matches!(
            self,
            ResolveError::MalformedRequest(_) | ResolveError::UnknownFormat(_)
        )
    }
}

/// Where a served artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cached,
    Generated,
}

/// Encoded artifact ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub origin: Origin,
}

/// Split `/<slug>/<relative_path>` into its two parts.
///
/// The relative path must name something below the base directory: empty
/// segments and `.` are dropped, `..` and backslashes are rejected.
pub fn parse_request_path(path: &str) -> Result<(&str, PathBuf), ResolveError> {
    let malformed = || ResolveError::MalformedRequest(path.to_string());

    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let (slug, rest) = trimmed.split_once('/').ok_or_else(malformed)?;
    if !is_plain_segment(slug) {
        return Err(malformed());
    }

    let mut relative = PathBuf::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => continue,
            s if is_plain_segment(s) => relative.push(s),
            _ => return Err(malformed()),
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(malformed());
    }
    Ok((slug, relative))
}

/// Keys currently being generated.
#[derive(Default)]
struct InFlight {
    keys: Mutex<HashSet<CacheKey>>,
    released: Condvar,
}

/// Exclusive right to generate one key; released on drop.
struct Claim<'a> {
    in_flight: &'a InFlight,
    key: CacheKey,
}

impl InFlight {
    fn claim(&self, key: &CacheKey) -> Claim<'_> {
        let mut keys = self.keys.lock();
        while keys.contains(key) {
            self.released.wait(&mut keys);
        }
        keys.insert(key.clone());
        Claim {
            in_flight: self,
            key: key.clone(),
        }
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.in_flight.keys.lock().remove(&self.key);
        self.in_flight.released.notify_all();
    }
}

/// Resolves request paths to artifacts, generating and caching on a miss.
///
/// Holds everything a request needs; nothing here is mutated after
/// construction except the in-flight set. Share it behind an `Arc`.
pub struct Resolver<C = DiskCache, B = RustBackend> {
    registry: ConversionRegistry,
    base_dir: PathBuf,
    cache: C,
    backend: B,
    quality: Quality,
    in_flight: InFlight,
}

impl Resolver<DiskCache, RustBackend> {
    /// Production resolver: disk cache at `server.cache_dir`, pure-Rust backend.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Resolver::new(
            config.registry()?,
            &config.server.base_dir,
            DiskCache::new(&config.server.cache_dir),
            RustBackend::new(),
        )
        .with_quality(Quality::new(config.processing.quality)))
    }
}

impl<C: CacheStore, B: ImageBackend> Resolver<C, B> {
    pub fn new(registry: ConversionRegistry, base_dir: &Path, cache: C, backend: B) -> Self {
        Self {
            registry,
            base_dir: base_dir.to_path_buf(),
            cache,
            backend,
            quality: Quality::default(),
            in_flight: InFlight::default(),
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn registry(&self) -> &ConversionRegistry {
        &self.registry
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Resolve a request path such as `/thumb/albums/cat.jpg`.
    pub fn resolve(&self, request_path: &str) -> Result<Artifact, ResolveError> {
        let (slug, relative_path) = parse_request_path(request_path)?;
        let profile = self
            .registry
            .lookup(slug)
            .ok_or_else(|| ResolveError::UnknownFormat(slug.to_string()))?;
        let key = CacheKey::new(slug, relative_path);
        self.artifact(profile, &key)
    }

    /// Serve `key` from cache, generating it with `profile` on a miss.
    pub fn artifact(
        &self,
        profile: &ConversionProfile,
        key: &CacheKey,
    ) -> Result<Artifact, ResolveError> {
        let content_type = content_type(key.relative_path());

        if let Some(bytes) = self.cached(key) {
            debug!(%key, "cache hit");
            return Ok(Artifact {
                bytes,
                content_type,
                origin: Origin::Cached,
            });
        }

        let _claim = self.in_flight.claim(key);
        // Another request may have stored it while we waited for the claim.
        if let Some(bytes) = self.cached(key) {
            debug!(%key, "generated by concurrent request");
            return Ok(Artifact {
                bytes,
                content_type,
                origin: Origin::Cached,
            });
        }

        let bytes = self.generate(profile, key)?;
        Ok(Artifact {
            bytes,
            content_type,
            origin: Origin::Generated,
        })
    }

    /// Whether `key` has a cached entry. I/O errors count as "no".
    pub fn is_cached(&self, key: &CacheKey) -> bool {
        match self.cache.exists(key) {
            Ok(exists) => exists,
            Err(e) => {
                warn!(%key, error = %e, "cache lookup failed, regenerating");
                false
            }
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<Vec<u8>> {
        if !self.is_cached(key) {
            return None;
        }
        match self.cache.read(key) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(%key, error = %e, "cache read failed, regenerating");
                None
            }
        }
    }

    fn generate(&self, profile: &ConversionProfile, key: &CacheKey) -> Result<Vec<u8>, ResolveError> {
        let format = output_format(key.relative_path())
            .ok_or_else(|| ResolveError::UnsupportedOutput(key.relative_path().to_path_buf()))?;
        let original = self.base_dir.join(key.relative_path());

        info!(
            src = %original.display(),
            %key,
            operation = %profile.operation,
            width = profile.width,
            height = profile.height,
            "converting"
        );
        let started = Instant::now();

        let source = std::fs::read(&original).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ResolveError::OriginalNotFound(original.clone()),
            _ => ResolveError::OriginalUnreadable {
                path: original.clone(),
                source: e,
            },
        })?;

        let params = ConvertParams::for_profile(profile, format, self.quality);
        let bytes = self
            .backend
            .convert(&source, &params)
            .map_err(|source| ResolveError::Conversion {
                key: key.clone(),
                source,
            })?;

        self.cache
            .write(key, &bytes)
            .map_err(ResolveError::CacheWrite)?;

        info!(
            %key,
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stored artifact"
        );
        Ok(bytes)
    }
}
