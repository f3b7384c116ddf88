//! HTTP/1.1 response builder.
//!
//! Provides a fluent builder API for constructing HTTP responses and
//! serializing them for transmission over TCP. A response body is a [`Body`]:
//! either fully materialized (written with `Content-Length`) or stream-typed
//! (written with `Transfer-Encoding: chunked` as chunks arrive).

use bytes::{BufMut, Bytes, BytesMut};

use super::{Body, Headers, StatusCode, StreamBody};

/// An HTTP/1.1 response.
///
/// # Examples
///
/// ```
/// use recap::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Body,
    keep_alive: bool,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::empty(),
            keep_alive: true,
        }
    }

    /// Assembles a response from already-known parts. Used when rebuilding a
    /// response from a stored cache envelope or materializing a captured
    /// stream.
    pub fn from_parts(status: StatusCode, headers: Headers, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
            keep_alive: true,
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header in-place. Intended for middleware pipelines that receive
    /// a `Response` from downstream and need to decorate it without consuming it.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets the response body. Accepts strings, byte buffers, and
    /// [`StreamBody`] via the [`Body`] conversions.
    ///
    /// For materialized bodies the `Content-Length` header is written
    /// automatically at serialization time; stream bodies get
    /// `Transfer-Encoding: chunked` instead.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Controls whether the `Connection: keep-alive` or `Connection: close` header is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the materialized body bytes, or `None` for a stream-typed body.
    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.bytes()
    }

    /// Returns the stream body, or `None` for a materialized body.
    pub fn body_stream(&self) -> Option<&StreamBody> {
        self.body.stream()
    }

    /// Returns `true` if the body is stream-typed.
    pub fn is_streamed(&self) -> bool {
        self.body.is_stream()
    }

    /// Splits the response into its serialized head and its body.
    ///
    /// The head ends with the blank line separating headers from the body.
    /// Automatically added:
    ///
    /// - `Connection: keep-alive` or `Connection: close`.
    /// - Materialized body: `Content-Type: text/plain; charset=utf-8` if the
    ///   body is non-empty and no `Content-Type` was set, and
    ///   `Content-Length: <n>` (always, as the last header).
    /// - Stream body: `Transfer-Encoding: chunked` unless already present;
    ///   the caller writes each chunk in chunked framing as it arrives.
    pub fn into_wire_parts(mut self) -> (BytesMut, Body) {
        let connection = if self.keep_alive {
            "keep-alive"
        } else {
            "close"
        };
        self.headers.insert("Connection", connection);

        let content_length = self.body.bytes().map(Bytes::len);
        match content_length {
            Some(len) => {
                if len > 0 && !self.headers.contains("content-type") {
                    self.headers
                        .insert("Content-Type", "text/plain; charset=utf-8");
                }
            }
            None => {
                if !self.headers.contains("transfer-encoding") {
                    self.headers.insert("Transfer-Encoding", "chunked");
                }
            }
        }

        let estimated_size = 128 + self.headers.len() * 64;
        let mut buf = BytesMut::with_capacity(estimated_size);

        // Status line
        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        // Headers
        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        // Content-Length is always the last header before the blank line
        if let Some(len) = content_length {
            buf.put(format!("Content-Length: {len}\r\n").as_bytes());
        }

        // Header/body separator
        buf.put(&b"\r\n"[..]);

        (buf, self.body)
    }

    /// Serializes a materialized response into a single buffer using HTTP/1.1
    /// wire format.
    ///
    /// Stream-typed bodies are not drained here — only the head is returned
    /// for them; the serving path uses [`into_wire_parts`](Self::into_wire_parts)
    /// and writes chunks as they arrive.
    pub fn into_bytes(self) -> BytesMut {
        let (mut buf, body) = self.into_wire_parts();
        if let Body::Full(bytes) = body {
            if !bytes.is_empty() {
                buf.put(&bytes[..]);
            }
        }
        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StreamBody;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn simple_ok_response() {
        let r = Response::new(StatusCode::Ok).body("Hello");
        let s = to_string(r.into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn custom_header() {
        let r = Response::new(StatusCode::Ok)
            .header("X-Request-Id", "abc-123")
            .body("ok");
        let s = to_string(r.into_bytes());
        assert!(s.contains("X-Request-Id: abc-123\r\n"));
    }

    #[test]
    fn no_body_no_content_type() {
        let r = Response::new(StatusCode::NoContent);
        let s = to_string(r.into_bytes());
        assert!(!s.contains("Content-Type"));
        assert!(s.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn connection_close() {
        let r = Response::new(StatusCode::Ok).keep_alive(false);
        let s = to_string(r.into_bytes());
        assert!(s.contains("Connection: close\r\n"));
    }

    #[test]
    fn not_found() {
        let r = Response::new(StatusCode::NotFound).body("Not Found");
        let s = to_string(r.into_bytes());
        assert!(s.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn stream_head_uses_chunked_encoding() {
        let (_sender, body) = StreamBody::channel();
        let r = Response::new(StatusCode::Ok).body(body);
        assert!(r.is_streamed());

        let (head, body) = r.into_wire_parts();
        let s = to_string(head);
        assert!(s.contains("Transfer-Encoding: chunked\r\n"));
        assert!(!s.contains("Content-Length"));
        assert!(s.ends_with("\r\n\r\n"));
        assert!(body.is_stream());
    }

    #[test]
    fn from_parts_keeps_headers_and_body() {
        let mut headers = Headers::new();
        headers.insert("Age", "12");
        let r = Response::from_parts(StatusCode::Ok, headers, Body::from("cached"));
        assert_eq!(r.headers().get("age"), Some("12"));
        assert_eq!(r.body_bytes().map(|b| &b[..]), Some(&b"cached"[..]));
    }
}
