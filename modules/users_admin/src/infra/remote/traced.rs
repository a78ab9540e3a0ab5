//! HTTP client wrapper that opens a span per outgoing request and stamps
//! it with a W3C `traceparent` header.

use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::{Instrument, Level};

pub const TRACEPARENT: &str = "traceparent";

#[derive(Clone, Default)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.inner.request(method, url)
    }

    /// Execute a built request inside an `outgoing_http` span.
    pub async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::span!(
            Level::INFO, "outgoing_http",
            http.method = %req.method(),
            http.url = %req.url(),
            http.status_code = tracing::field::Empty,
            otel.kind = "client",
        );

        inject_traceparent(req.headers_mut());

        let inner = self.inner.clone();
        async move {
            let response = inner.execute(req).await?;
            tracing::Span::current().record("http.status_code", response.status().as_u16());
            if !response.status().is_success() {
                tracing::debug!(status = %response.status(), "Non-success response");
            }
            Ok(response)
        }
        .instrument(span)
        .await
    }
}

impl From<reqwest::Client> for TracedClient {
    fn from(c: reqwest::Client) -> Self {
        Self::new(c)
    }
}

/// Fresh `00-<trace>-<span>-01` header; an existing one is left alone.
fn inject_traceparent(headers: &mut HeaderMap) {
    if headers.contains_key(TRACEPARENT) {
        return;
    }
    let trace_id = format!("{:032x}", rand::random::<u128>());
    let span_id = format!("{:016x}", rand::random::<u64>());
    if let Ok(value) = HeaderValue::from_str(&format!("00-{trace_id}-{span_id}-01")) {
        headers.insert(HeaderName::from_static(TRACEPARENT), value);
    }
}
