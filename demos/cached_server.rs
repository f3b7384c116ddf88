//! Runnable demo: a small server with logging and response caching.
//!
//! ```text
//! cargo run --example cached_server
//! curl -i http://127.0.0.1:8080/status
//! curl -i http://127.0.0.1:8080/report?day=mon
//! curl -i --no-buffer http://127.0.0.1:8080/stream
//! ```
//!
//! Repeat a request and watch the second response come back with an `Age`
//! header instead of re-running the handler.

use std::sync::Arc;
use std::time::Duration;

use recap::cache::{CacheMiddleware, CachePolicy, FixedTtl};
use recap::http::{Response, StatusCode, StreamBody};
use recap::middleware::{LoggerMiddleware, from_middleware};
use recap::server::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let policy = CachePolicy::new(["/status", "/report***", "/stream***"])
        .persist_headers(["Content-Type", "Last-Modified"])
        .ttl(FixedTtl::secs(60))
        .stream_support(true);

    let server = Server::bind("127.0.0.1:8080").await?;
    println!("listening on http://{}", server.local_addr());

    server
        .run_with(
            vec![
                from_middleware(Arc::new(LoggerMiddleware)),
                from_middleware(Arc::new(CacheMiddleware::new(policy))),
            ],
            |req| async move {
                match req.path() {
                    "/status" => Response::new(StatusCode::Ok)
                        .header("Content-Type", "application/json")
                        .body(r#"{"status":"ok"}"#),
                    "/report" => Response::new(StatusCode::Ok)
                        .header("Last-Modified", "Tue, 05 Aug 2025 10:00:00 GMT")
                        .body(format!(
                            "report for {}\n",
                            req.query_param("day").unwrap_or("today")
                        )),
                    path if path.starts_with("/stream") => {
                        let (sender, body) = StreamBody::channel();
                        tokio::spawn(async move {
                            for part in ["chunk one\n", "chunk two\n", "chunk three\n"] {
                                sender.send(part);
                                tokio::time::sleep(Duration::from_millis(250)).await;
                            }
                        });
                        Response::new(StatusCode::Ok).body(body)
                    }
                    _ => Response::new(StatusCode::NotFound).body("not found\n"),
                }
            },
        )
        .await?;

    Ok(())
}
