//! HTTP middleware: CORS and per-client rate limiting.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app::errors;

// -------------------------
// CORS
// -------------------------

const PREFLIGHT_MAX_AGE_SECS: &str = "600";
const DEFAULT_ALLOW_METHODS: &str = "GET, POST, OPTIONS";

#[derive(Debug, Clone)]
pub struct CorsState {
    allowed_origins: Arc<Vec<String>>,
}

impl CorsState {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins: Arc::new(allowed_origins),
        }
    }

    /// Explicitly listed origins get credentials; a `*` entry admits any
    /// origin without them.
    fn grant(&self, origin: &str) -> Option<OriginGrant> {
        if self.allowed_origins.iter().any(|o| o == origin) {
            Some(OriginGrant::Listed)
        } else if self.allowed_origins.iter().any(|o| o == "*") {
            Some(OriginGrant::Wildcard)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OriginGrant {
    Listed,
    Wildcard,
}

/// Echo allowed origins; answer preflights directly.
pub async fn cors(State(state): State<CorsState>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .and_then(|o| Some((HeaderValue::from_str(o).ok()?, state.grant(o)?)));

    let preflight = req.method() == Method::OPTIONS
        && req
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);
    if preflight {
        let mut response = StatusCode::NO_CONTENT.into_response();
        if let Some((origin, grant)) = origin {
            let request_headers = req.headers();
            let headers = response.headers_mut();
            apply_origin(headers, origin, grant);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                request_headers
                    .get(header::ACCESS_CONTROL_REQUEST_METHOD)
                    .cloned()
                    .unwrap_or(HeaderValue::from_static(DEFAULT_ALLOW_METHODS)),
            );
            if let Some(requested) = request_headers.get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
            }
            headers.insert(
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static(PREFLIGHT_MAX_AGE_SECS),
            );
        }
        return response;
    }

    let mut response = next.run(req).await;
    if let Some((origin, grant)) = origin {
        apply_origin(response.headers_mut(), origin, grant);
    }
    response
}

fn apply_origin(headers: &mut HeaderMap, origin: HeaderValue, grant: OriginGrant) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    if grant == OriginGrant::Listed {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
}

// -------------------------
// Rate limiting
// -------------------------

/// Fixed-window request counter keyed by client.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    trust_forwarded_for: bool,
    windows: Mutex<HashMap<String, Window>>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            trust_forwarded_for: false,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Key clients on the first `X-Forwarded-For` entry. Only safe behind a
    /// proxy that overwrites the header.
    pub fn trusting_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Count a request for `key` at `now`.
    ///
    /// Returns the time until the window resets when the limit is exceeded.
    pub fn check(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Drop expired windows so idle clients do not accumulate.
        if windows.len() > 1024 {
            windows.retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.limit {
            return Err(self.window.saturating_sub(now.duration_since(entry.started)));
        }
        entry.count += 1;
        Ok(())
    }
}

/// Rate-limit key: the peer address, or the first `X-Forwarded-For` entry
/// when the deployment trusts its proxy.
fn client_key(req: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req, limiter.trust_forwarded_for);
    match limiter.check(&key, Instant::now()) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            let secs = retry_after.as_secs().max(1);
            warn!(
                client = %key,
                path = %req.uri().path(),
                retry_after_secs = secs,
                "rate limit exceeded"
            );
            let mut response = errors::json_error(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                format!("Rate limit exceeded: {} per minute", limiter.limit),
            );
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_limit_then_rejects_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let t0 = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1", t0).is_ok());
        }
        let retry = limiter.check("10.0.0.1", t0 + Duration::from_secs(20)).unwrap_err();
        assert_eq!(retry, Duration::from_secs(40));

        // Other clients have their own window.
        assert!(limiter.check("10.0.0.2", t0).is_ok());
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.check("k", t0).is_ok());
        assert!(limiter.check("k", t0 + Duration::from_secs(59)).is_err());
        assert!(limiter.check("k", t0 + Duration::from_secs(60)).is_ok());
    }

    fn request_from_peer(forwarded_for: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/invoke-ai");
        if let Some(value) = forwarded_for {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut req = builder.body(axum::body::Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 5000))));
        req
    }

    #[test]
    fn peer_address_is_the_key_by_default() {
        let req = request_from_peer(Some("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_key(&req, false), "127.0.0.1");
    }

    #[test]
    fn forwarded_for_is_honoured_only_when_trusted() {
        let req = request_from_peer(Some("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_key(&req, true), "203.0.113.7");

        let req = request_from_peer(None);
        assert_eq!(client_key(&req, true), "127.0.0.1");
    }

    #[test]
    fn cors_matches_listed_origins_only() {
        let state = CorsState::new(vec!["http://localhost:8501".into()]);
        assert_eq!(state.grant("http://localhost:8501"), Some(OriginGrant::Listed));
        assert_eq!(state.grant("http://evil.test"), None);
    }

    #[test]
    fn wildcard_origin_never_carries_credentials() {
        let state = CorsState::new(vec!["*".into(), "http://localhost:8501".into()]);
        assert_eq!(state.grant("http://any.test"), Some(OriginGrant::Wildcard));
        assert_eq!(state.grant("http://localhost:8501"), Some(OriginGrant::Listed));

        let mut headers = HeaderMap::new();
        apply_origin(
            &mut headers,
            HeaderValue::from_static("http://any.test"),
            OriginGrant::Wildcard,
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://any.test");
        assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));

        let mut headers = HeaderMap::new();
        apply_origin(
            &mut headers,
            HeaderValue::from_static("http://localhost:8501"),
            OriginGrant::Listed,
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
