//! Cache warm-up.
//!
//! Walks the base directory and generates every (format, original) artifact
//! that is not cached yet, so the first visitor does not pay for encoding.
//! Work is spread over the rayon pool; each item goes through
//! [`Resolver::artifact`], so warm-up and live requests share the same cache
//! layout and per-key claims and can safely run at the same time.

use crate::cache::{CacheKey, CacheStats, CacheStore};
use crate::imaging::{ImageBackend, output_format};
use crate::registry::ConversionProfile;
use crate::resolver::{Origin, ResolveError, Resolver};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// One failed (format, original) pair.
#[derive(Debug)]
pub struct WarmFailure {
    pub key: CacheKey,
    pub error: ResolveError,
}

/// Result of a warm-up run.
#[derive(Debug, Default)]
pub struct WarmReport {
    pub stats: CacheStats,
    pub failures: Vec<WarmFailure>,
}

/// Relative paths of every file under `base_dir` that we can re-encode.
///
/// Hidden files and directories (leading `.`) are skipped. The result is
/// sorted for stable output.
pub fn collect_originals(base_dir: &Path) -> Vec<PathBuf> {
    let mut originals: Vec<PathBuf> = WalkDir::new(base_dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(base_dir).ok().map(Path::to_path_buf))
        .filter(|rel| output_format(rel).is_some())
        .collect();
    originals.sort();
    originals
}

/// Generate every missing artifact for `profiles` × originals under the base dir.
///
/// `progress` is called once per item, from worker threads, with the key and
/// its outcome.
pub fn warm<C, B, F>(
    resolver: &Resolver<C, B>,
    profiles: &[&ConversionProfile],
    progress: F,
) -> WarmReport
where
    C: CacheStore,
    B: ImageBackend,
    F: Fn(&CacheKey, &Result<Origin, ResolveError>) + Sync,
{
    let originals = collect_originals(resolver.base_dir());
    let jobs: Vec<(&ConversionProfile, CacheKey)> = profiles
        .iter()
        .flat_map(|profile| {
            originals
                .iter()
                .map(move |rel| (*profile, CacheKey::new(profile.name.clone(), rel.clone())))
        })
        .collect();

    jobs.into_par_iter()
        .map(|(profile, key)| {
            let outcome = if resolver.is_cached(&key) {
                Ok(Origin::Cached)
            } else {
                resolver.artifact(profile, &key).map(|a| a.origin)
            };
            progress(&key, &outcome);
            (key, outcome)
        })
        .fold(WarmReport::default, |mut report, (key, outcome)| {
            match outcome {
                Ok(Origin::Cached) => report.stats.hit(),
                Ok(Origin::Generated) => report.stats.generate(),
                Err(error) => {
                    report.stats.fail();
                    report.failures.push(WarmFailure { key, error });
                }
            }
            report
        })
        .reduce(WarmReport::default, |mut a, b| {
            a.stats = a.stats.merge(b.stats);
            a.failures.extend(b.failures);
            a
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DiskCache;
    use crate::imaging::RustBackend;
    use crate::registry::{ConversionRegistry, Operation};
    use crate::test_helpers::write_png;
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> ConversionRegistry {
        ConversionRegistry::from_profiles([
            ConversionProfile {
                name: "thumb".into(),
                operation: Operation::Thumbnail,
                width: 16,
                height: 16,
            },
            ConversionProfile {
                name: "small".into(),
                operation: Operation::Fit,
                width: 32,
                height: 32,
            },
        ])
    }

    #[test]
    fn collect_originals_finds_nested_images_only() {
        let tmp = TempDir::new().unwrap();
        write_png(&tmp.path().join("a.png"), 4, 4);
        write_png(&tmp.path().join("album/b.png"), 4, 4);
        write_png(&tmp.path().join(".hidden/c.png"), 4, 4);
        fs::write(tmp.path().join("notes.txt"), "text").unwrap();

        let found = collect_originals(tmp.path());
        assert_eq!(
            found,
            vec![PathBuf::from("a.png"), PathBuf::from("album/b.png")]
        );
    }

    #[test]
    fn warm_generates_then_hits() {
        let base = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        write_png(&base.path().join("a.png"), 64, 32);
        write_png(&base.path().join("album/b.png"), 32, 64);

        let resolver = Resolver::new(
            registry(),
            base.path(),
            DiskCache::new(cache_dir.path()),
            RustBackend::new(),
        );
        let registry = registry();
        let profiles = registry.profiles();

        let first = warm(&resolver, &profiles, |_, _| {});
        assert_eq!(first.stats.generated, 4);
        assert_eq!(first.stats.failed, 0);
        assert!(cache_dir.path().join("thumb/album/b.png").is_file());
        assert!(cache_dir.path().join("small/a.png").is_file());

        let second = warm(&resolver, &profiles, |_, _| {});
        assert_eq!(second.stats.hits, 4);
        assert_eq!(second.stats.generated, 0);
    }

    #[test]
    fn warm_reports_failures() {
        let base = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        write_png(&base.path().join("good.png"), 8, 8);
        fs::write(base.path().join("broken.png"), b"not a png").unwrap();

        let resolver = Resolver::new(
            registry(),
            base.path(),
            DiskCache::new(cache_dir.path()),
            RustBackend::new(),
        );
        let registry = registry();
        let thumb = registry.lookup("thumb").unwrap();

        let report = warm(&resolver, &[thumb], |_, _| {});
        assert_eq!(report.stats.generated, 1);
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.failures[0].key, CacheKey::new("thumb", "broken.png"));
        assert!(!cache_dir.path().join("thumb/broken.png").exists());
    }
}
