//! # picsizer
//!
//! An HTTP server that serves resized, cropped and re-encoded variants of a
//! directory of original images. Variants are produced on the first request
//! and kept in a disk cache, so every later request is a plain file read.
//!
//! # Request Pipeline
//!
//! ```text
//! GET /thumb/albums/cat.jpg
//!      │     └──────────── relative path below server.base_dir
//!      └────────────────── format slug → [format.thumb] profile
//!
//! cache_dir/thumb/albums/cat.jpg exists?  ── yes ─► 200 cached bytes
//!      │ no
//!      ▼
//! decode base_dir/albums/cat.jpg → apply profile → encode as .jpg
//!      → store at cache_dir/thumb/albums/cat.jpg → 200 fresh bytes
//!
//! anything fails ─► 404 + 1×1 transparent GIF
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `picsizer.toml` loading, defaults and validation |
//! | [`registry`] | Conversion profiles (`copy`, `thumbnail`, `resize`, `fit`) keyed by slug |
//! | [`cache`] | Write-once artifact store behind the [`cache::CacheStore`] trait |
//! | [`imaging`] | Pure-Rust decode / transform / encode behind [`imaging::ImageBackend`] |
//! | [`resolver`] | Request path → artifact: lookup, cache check, generation, persistence |
//! | [`server`] | axum transport: catch-all route, placeholder responses |
//! | [`warm`] | Parallel cache pre-generation for a whole base directory |
//!
//! # Design Decisions
//!
//! ## The Cache Is Trusted
//!
//! An artifact on disk is served as-is, without comparing it to the
//! original. Updating an original therefore requires deleting its cached
//! variants. In exchange a hit costs one `stat` and one read.
//!
//! ## Failures Are Images
//!
//! Browsers render whatever comes back in an `<img>` tag. Every failure
//! (unknown format, missing original, broken file) answers 404 with a
//! transparent pixel instead of an error page, and the reason goes to the log.
//!
//! ## Operations Are a Closed Set
//!
//! Profiles name their operation as a string in the config file, but it is
//! parsed into [`registry::Operation`] at startup. A typo stops the server
//! from starting rather than surfacing on the first request for that format.
//!
//! ## Configuration Is Passed, Not Global
//!
//! The config is read once, turned into a [`resolver::Resolver`] and shared
//! behind an `Arc`. Nothing reads global state after startup.

pub mod cache;
pub mod config;
pub mod imaging;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod warm;

#[cfg(test)]
pub(crate) mod test_helpers;
