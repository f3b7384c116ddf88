//! Pluggable time-to-live strategies for cache writes.

use std::time::Duration;

use crate::http::{Request, Response};

/// Resolves the retention period for a cacheable response.
///
/// Returning `None` means "no explicit expiry" — the store applies its own
/// default retention.
///
/// Any `Fn(&Request, &Response) -> Option<Duration>` closure is a strategy:
///
/// ```
/// use std::time::Duration;
/// use recap::cache::TtlStrategy;
/// use recap::http::{Request, Response};
///
/// let per_path = |request: &Request, _response: &Response| {
///     if request.path().starts_with("/feed") {
///         Some(Duration::from_secs(30))
///     } else {
///         None
///     }
/// };
/// let _strategy: &dyn TtlStrategy = &per_path;
/// ```
pub trait TtlStrategy: Send + Sync {
    /// The retention period for this request/response pair, or `None` for
    /// store-default retention.
    fn resolve(&self, request: &Request, response: &Response) -> Option<Duration>;
}

impl<F> TtlStrategy for F
where
    F: Fn(&Request, &Response) -> Option<Duration> + Send + Sync,
{
    fn resolve(&self, request: &Request, response: &Response) -> Option<Duration> {
        self(request, response)
    }
}

/// The default strategy: never request an explicit expiry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTtl;

impl TtlStrategy for NoTtl {
    fn resolve(&self, _request: &Request, _response: &Response) -> Option<Duration> {
        None
    }
}

/// A strategy that applies the same retention to every cached response.
#[derive(Debug, Clone, Copy)]
pub struct FixedTtl(pub Duration);

impl FixedTtl {
    /// A fixed retention of `secs` seconds.
    pub fn secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }
}

impl TtlStrategy for FixedTtl {
    fn resolve(&self, _request: &Request, _response: &Response) -> Option<Duration> {
        Some(self.0)
    }
}
