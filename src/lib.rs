//! # recap
//!
//! Response caching middleware for async HTTP/1.1 services, with
//! streamed-body capture.
//!
//! The [`cache`] module is the heart of the crate: a [`CachePolicy`] decides
//! which requests are cacheable and under which key, a [`CacheStore`] holds
//! the encoded envelopes, and [`CacheMiddleware`] orchestrates lookups,
//! conditional `304` short-circuits, and capture of downstream responses —
//! including bodies that arrive as an open-ended chunk stream, which are
//! observed passively while the original caller keeps receiving them live.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use recap::cache::{CacheMiddleware, CachePolicy, FixedTtl};
//! use recap::middleware::from_middleware;
//! use recap::server::Server;
//! use recap::{Response, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policy = CachePolicy::new(["/status", "/report***"])
//!         .persist_header("Content-Type")
//!         .ttl(FixedTtl::secs(60));
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     println!("Listening on http://127.0.0.1:8080");
//!     server.run_with(
//!         vec![from_middleware(Arc::new(CacheMiddleware::new(policy)))],
//!         |_req| async { Response::new(StatusCode::Ok).body("Hello, World!") },
//!     ).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod http;
pub mod middleware;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheMiddleware, CachePolicy, CacheStore, MemoryStore};
pub use http::{Body, Headers, Method, Request, Response, StatusCode, StreamBody};
pub use server::{Server, ServerError};
