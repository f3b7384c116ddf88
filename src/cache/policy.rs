//! The caching policy: cacheability decisions, key derivation, TTL
//! resolution, and the serialization envelope.
//!
//! A [`CachePolicy`] is constructed once and treated as immutable for the
//! process lifetime (swap the whole policy to reconfigure, never mutate in
//! place).

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::rules::UrlRules;
use crate::cache::ttl::{NoTtl, TtlStrategy};
use crate::http::{Body, Headers, Method, Request, Response, StatusCode};

/// Errors produced while encoding or decoding cache envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("failed to serialize cache envelope: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed cache envelope: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("envelope carries unknown status code {0}")]
    UnknownStatus(u16),

    #[error("stream-typed bodies cannot be encoded; materialize the body first")]
    StreamedBody,
}

/// The serialized unit stored per cache key: status code, the epoch-seconds
/// timestamp stamped at encode time, the whitelisted headers (one collapsed
/// value per name, in whitelist order), and the body bytes.
///
/// A store write always replaces the prior value wholesale.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    code: u16,
    time: u64,
    headers: Vec<(String, String)>,
    #[serde(with = "base64_bytes")]
    body: Vec<u8>,
}

// Body bytes travel inside the JSON envelope as a base64 string.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Decides what is cacheable, under which key, for how long, and how cached
/// responses are persisted and reconstructed.
///
/// # Examples
///
/// ```
/// use recap::cache::{CachePolicy, FixedTtl};
///
/// let policy = CachePolicy::new(["/status", "/report***", "/feed???"])
///     .persist_headers(["Content-Type", "Last-Modified"])
///     .ttl(FixedTtl::secs(60))
///     .stream_support(true);
/// # let _ = policy;
/// ```
pub struct CachePolicy {
    rules: UrlRules,
    headers: Vec<String>,
    clock: Arc<dyn Clock>,
    ttl: Arc<dyn TtlStrategy>,
    stream_support: bool,
}

impl CachePolicy {
    /// Creates a policy from a flat list of URL specifiers (see
    /// [`UrlRules`](crate::cache::rules::UrlRules) for the marker convention).
    ///
    /// Defaults: empty header whitelist, [`SystemClock`], no explicit TTL,
    /// stream capture disabled.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: UrlRules::classify(urls),
            headers: Vec::new(),
            clock: Arc::new(SystemClock),
            ttl: Arc::new(NoTtl),
            stream_support: false,
        }
    }

    /// Adds one header name to the persistence whitelist.
    #[must_use]
    pub fn persist_header(mut self, name: impl Into<String>) -> Self {
        self.headers.push(name.into());
        self
    }

    /// Adds several header names to the persistence whitelist, in order.
    #[must_use]
    pub fn persist_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers.extend(names.into_iter().map(Into::into));
        self
    }

    /// Replaces the time source used for envelope timestamps and `Age`.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the TTL strategy applied to cache writes.
    #[must_use]
    pub fn ttl(mut self, ttl: impl TtlStrategy + 'static) -> Self {
        self.ttl = Arc::new(ttl);
        self
    }

    /// Enables or disables capture of stream-typed response bodies.
    #[must_use]
    pub fn stream_support(mut self, enabled: bool) -> Self {
        self.stream_support = enabled;
        self
    }

    /// Whether stream-typed response bodies are captured.
    pub fn supports_streams(&self) -> bool {
        self.stream_support
    }

    /// A request is cacheable iff its method is exactly `GET` and its path
    /// matches a configured rule.
    pub fn request_is_cacheable(&self, request: &Request) -> bool {
        request.method() == &Method::Get && self.rules.matches(request.path())
    }

    /// A response is cacheable iff its status code is exactly 200. No other
    /// status is ever written to the store.
    pub fn response_is_cacheable(&self, _request: &Request, response: &Response) -> bool {
        response.status() == StatusCode::Ok
    }

    /// Derives the cache key: the request path, with `"?" + query` appended
    /// iff the raw query string is non-empty and the path matches a
    /// keep-query prefix rule.
    ///
    /// Query inclusion is decided independently of which rule made the
    /// request cacheable.
    pub fn cache_key(&self, request: &Request) -> String {
        let mut key = request.path().to_owned();
        if let Some(query) = request.query_string() {
            if !query.is_empty() && self.rules.query_in_key(request.path()) {
                key.push('?');
                key.push_str(query);
            }
        }
        key
    }

    /// Resolves the retention period for a cache write. `None` means the
    /// store applies its own default retention.
    pub fn cache_ttl(&self, request: &Request, response: &Response) -> Option<Duration> {
        self.ttl.resolve(request, response)
    }

    /// Encodes a materialized response into envelope bytes.
    ///
    /// The `time` field is stamped exactly once, here, from the injected
    /// clock; it is never recomputed on read. Only whitelisted headers
    /// present on the response are persisted, each as its single collapsed
    /// line.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::StreamedBody`] if the body is stream-typed;
    /// [`EnvelopeError::Encode`] on serialization failure.
    pub fn encode(&self, response: &Response) -> Result<Bytes, EnvelopeError> {
        let body = response.body_bytes().ok_or(EnvelopeError::StreamedBody)?;

        let mut headers = Vec::new();
        for name in &self.headers {
            if let Some(line) = response.headers().line(name) {
                headers.push((name.clone(), line));
            }
        }

        let envelope = CacheEnvelope {
            code: response.status().as_u16(),
            time: self.clock.epoch_secs(),
            headers,
            body: body.to_vec(),
        };
        serde_json::to_vec(&envelope)
            .map(Bytes::from)
            .map_err(EnvelopeError::Encode)
    }

    /// Decodes envelope bytes back into a response.
    ///
    /// The reconstructed response carries the stored status and whitelisted
    /// headers plus a freshly computed `Age` header (`now - time`, whole
    /// seconds, saturating) that overwrites any `Age` value baked into the
    /// envelope. The body is always fully materialized, never a stream.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::Decode`] on malformed bytes;
    /// [`EnvelopeError::UnknownStatus`] if the stored code has no
    /// [`StatusCode`] mapping.
    pub fn decode(&self, raw: &[u8]) -> Result<Response, EnvelopeError> {
        let envelope: CacheEnvelope =
            serde_json::from_slice(raw).map_err(EnvelopeError::Decode)?;
        let status = StatusCode::from_u16(envelope.code)
            .ok_or(EnvelopeError::UnknownStatus(envelope.code))?;
        let age = self.clock.epoch_secs().saturating_sub(envelope.time);

        let mut headers = Headers::with_capacity(envelope.headers.len() + 1);
        for (name, value) in envelope.headers {
            if !name.eq_ignore_ascii_case("age") {
                headers.insert(name, value);
            }
        }
        headers.insert("Age", age.to_string());

        Ok(Response::from_parts(
            status,
            headers,
            Body::Full(Bytes::from(envelope.body)),
        ))
    }
}
