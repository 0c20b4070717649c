//! HTTP transport.
//!
//! A single catch-all `GET` route hands the request path to the
//! [`Resolver`]. Resolution is blocking work (file I/O and pixel pushing), so
//! each request runs it on tokio's blocking pool; a slow conversion holds up
//! only its own request.
//!
//! | Outcome | Status | Body |
//! |---|---|---|
//! | Artifact (cached or generated) | 200 | artifact bytes, `ETag` = SHA-256 |
//! | `If-None-Match` matches | 304 | empty |
//! | Any [`ResolveError`] | 404 | 1×1 transparent GIF |

use crate::cache::CacheStore;
use crate::imaging::ImageBackend;
use crate::resolver::{Artifact, ResolveError, Resolver};
use axum::Router;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// 1×1 transparent GIF served with every 404.
pub const PLACEHOLDER_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// Build the application router around a shared resolver.
pub fn router<C, B>(resolver: Arc<Resolver<C, B>>) -> Router
where
    C: CacheStore + 'static,
    B: ImageBackend + 'static,
{
    Router::new()
        .route("/", get(serve_root))
        .route("/{*path}", get(serve_image::<C, B>))
        .layer(TraceLayer::new_for_http())
        .with_state(resolver)
}

async fn serve_root() -> Response {
    placeholder()
}

async fn serve_image<C, B>(
    State(resolver): State<Arc<Resolver<C, B>>>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
) -> Response
where
    C: CacheStore + 'static,
    B: ImageBackend + 'static,
{
    let Path(path) = match path {
        Ok(path) => path,
        Err(rejection) => {
            debug!(error = %rejection, "malformed request path");
            return placeholder();
        }
    };
    let request_path = format!("/{path}");
    let task_path = request_path.clone();
    let outcome =
        tokio::task::spawn_blocking(move || resolver.resolve(&task_path)).await;

    match outcome {
        Ok(Ok(artifact)) => artifact_response(artifact, &headers),
        Ok(Err(e)) => {
            log_failure(&request_path, &e);
            placeholder()
        }
        Err(join_error) => {
            error!(path = %request_path, error = %join_error, "resolver task failed");
            placeholder()
        }
    }
}

fn log_failure(path: &str, e: &ResolveError) {
    if e.is_generation_failure() {
        warn!(%path, error = %e, "generation failed");
    } else if matches!(e, ResolveError::UnknownFormat(_)) {
        info!(%path, "{e}");
    } else {
        debug!(%path, "{e}");
    }
}

/// Strong validator for an artifact body.
pub fn etag(bytes: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(bytes))
}

fn artifact_response(artifact: Artifact, headers: &HeaderMap) -> Response {
    let tag = etag(&artifact.bytes);
    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|candidate| candidate.trim() == tag));

    let mut response = if not_modified {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, artifact.content_type)],
            artifact.bytes,
        )
            .into_response()
    };
    if let Ok(value) = HeaderValue::from_str(&tag) {
        response.headers_mut().insert(header::ETAG, value);
    }
    response
}

/// 404 with the inline placeholder image.
pub fn placeholder() -> Response {
    (
        StatusCode::NOT_FOUND,
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        PLACEHOLDER_GIF,
    )
        .into_response()
}

/// Bind `address` and serve until Ctrl-C.
pub async fn serve<C, B>(resolver: Arc<Resolver<C, B>>, address: &str) -> std::io::Result<()>
where
    C: CacheStore + 'static,
    B: ImageBackend + 'static,
{
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(resolver))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(e) => error!(error = %e, "cannot listen for shutdown signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn placeholder_is_a_1x1_gif() {
        let img =
            image::load_from_memory_with_format(PLACEHOLDER_GIF, image::ImageFormat::Gif).unwrap();
        assert_eq!(img.dimensions(), (1, 1));
    }

    #[test]
    fn placeholder_response_is_404_gif() {
        let response = placeholder();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/gif"
        );
    }

    #[test]
    fn etag_is_quoted_sha256() {
        let tag = etag(b"hello");
        assert_eq!(tag.len(), 66);
        assert!(tag.starts_with('"') && tag.ends_with('"'));
        assert_eq!(tag, etag(b"hello"));
        assert_ne!(tag, etag(b"hello!"));
    }

    #[test]
    fn matching_if_none_match_is_304() {
        let artifact = Artifact {
            bytes: b"img".to_vec(),
            content_type: "image/png",
            origin: crate::resolver::Origin::Cached,
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_str(&format!("\"other\", {}", etag(b"img"))).unwrap(),
        );
        let response = artifact_response(artifact, &headers);
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(response.headers().contains_key(header::ETAG));
    }
}
