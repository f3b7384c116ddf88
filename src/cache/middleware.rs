//! Response caching middleware.
//!
//! Sits in the middleware chain in front of the real handler. Per request:
//!
//! 1. Uncacheable request → passthrough, no cache interaction at all.
//! 2. Cacheable → derive the key and look it up in the store.
//! 3. Hit → decode the envelope, apply the conditional-request check, and
//!    return either `304 Not Modified` or the decoded response. A corrupt
//!    envelope is logged and treated as a miss.
//! 4. Miss → run the downstream chain, then capture the response body —
//!    buffered bodies synchronously, streamed bodies through a passive
//!    [`observe`](crate::http::StreamBody::observe) tap that accumulates
//!    chunks until end-of-stream — and write the envelope to the store.
//!
//! Store writes are fire-and-forget: the response is returned without
//! awaiting write completion, and write failures are logged, never surfaced
//! to the caller. Concurrent misses for the same key are not coalesced; the
//! last write to complete wins.

use std::{future::Future, pin::Pin, sync::Arc};

use bytes::BytesMut;

use crate::cache::policy::CachePolicy;
use crate::cache::store::{CacheStore, MemoryStore};
use crate::http::{Body, Request, Response, StatusCode};
use crate::middleware::{Middleware, Next};

/// Middleware that serves cacheable requests from a [`CacheStore`] and
/// captures cacheable downstream responses into it.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use recap::cache::{CacheMiddleware, CachePolicy};
/// use recap::middleware::from_middleware;
///
/// let policy = CachePolicy::new(["/status", "/report***"])
///     .persist_header("Content-Type");
/// let handler = from_middleware(Arc::new(CacheMiddleware::new(policy)));
/// ```
pub struct CacheMiddleware {
    policy: Arc<CachePolicy>,
    store: Arc<dyn CacheStore>,
}

impl CacheMiddleware {
    /// Creates the middleware with the default in-memory store.
    pub fn new(policy: CachePolicy) -> Self {
        Self::with_store(policy, Arc::new(MemoryStore::new()))
    }

    /// Creates the middleware with an injected store.
    pub fn with_store(policy: CachePolicy, store: Arc<dyn CacheStore>) -> Self {
        Self {
            policy: Arc::new(policy),
            store,
        }
    }

    /// The policy this middleware consults.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }
}

/// The conditional-request check applied on cache hits.
///
/// True iff the cached response carries a non-empty `Last-Modified` and the
/// request's `If-Modified-Since` is exactly string-equal to it. Deliberately
/// not a date-semantic comparison.
fn not_modified(request: &Request, cached: &Response) -> bool {
    match cached.headers().get("last-modified") {
        Some(last_modified) if !last_modified.is_empty() => {
            request.headers().get("if-modified-since") == Some(last_modified)
        }
        _ => false,
    }
}

impl Middleware for CacheMiddleware {
    fn handle(
        &self,
        request: Request,
        next: Next,
    ) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let policy = Arc::clone(&self.policy);
        let store = Arc::clone(&self.store);

        Box::pin(async move {
            if !policy.request_is_cacheable(&request) {
                return next.run(request).await;
            }

            let key = policy.cache_key(&request);

            match store.get(&key).await {
                Ok(Some(raw)) => match policy.decode(&raw) {
                    Ok(cached) => {
                        if not_modified(&request, &cached) {
                            tracing::debug!(key = %key, "conditional cache hit");
                            return Response::new(StatusCode::NotModified);
                        }
                        tracing::debug!(key = %key, "cache hit");
                        return cached;
                    }
                    Err(error) => {
                        // Forced miss: fall through to the downstream handler.
                        tracing::warn!(key = %key, error = %error, "corrupt cache envelope");
                    }
                },
                Ok(None) => {}
                Err(error) => {
                    tracing::error!(key = %key, error = %error, "cache lookup failed");
                    return Response::new(StatusCode::InternalServerError)
                        .body("cache lookup failed");
                }
            }

            // The request outlives the downstream dispatch so the TTL
            // strategy can see both sides of the exchange.
            let captured_request = request.clone();
            let response = next.run(request).await;

            if response.is_streamed() && !policy.supports_streams() {
                return response;
            }
            if !policy.response_is_cacheable(&captured_request, &response) {
                return response;
            }

            if let Some(stream) = response.body_stream() {
                let mut tap = stream.observe();
                let status = response.status();
                let headers = response.headers().clone();
                tokio::spawn(async move {
                    let mut buffer = BytesMut::new();
                    while let Some(chunk) = tap.chunk().await {
                        buffer.extend_from_slice(&chunk);
                    }
                    let view = Response::from_parts(status, headers, Body::Full(buffer.freeze()));
                    let ttl = policy.cache_ttl(&captured_request, &view);
                    match policy.encode(&view) {
                        Ok(encoded) => {
                            if let Err(error) = store.set(&key, encoded, ttl).await {
                                tracing::warn!(key = %key, error = %error, "cache write failed");
                            }
                        }
                        Err(error) => {
                            tracing::warn!(key = %key, error = %error, "cache encode failed");
                        }
                    }
                });
                return response;
            }

            // Buffered body: the Bytes clone shares the same allocation, so
            // the returned response stays fully consumable.
            let body = response.body_bytes().cloned().unwrap_or_default();
            let view =
                Response::from_parts(response.status(), response.headers().clone(), Body::Full(body));
            let ttl = policy.cache_ttl(&captured_request, &view);
            match policy.encode(&view) {
                Ok(encoded) => {
                    tokio::spawn(async move {
                        if let Err(error) = store.set(&key, encoded, ttl).await {
                            tracing::warn!(key = %key, error = %error, "cache write failed");
                        }
                    });
                }
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "cache encode failed");
                }
            }

            response
        })
    }
}
