//! Request identification.
//!
//! # Responsibilities
//! - Generate a UUID request ID as early as possible for tracing
//! - Echo the request ID on the response
//! - Determine the client address used to key anonymous rate limits

use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::{HeaderName, Request},
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer assigning `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Request ID assigned by [`set_request_id_layer`], or "unknown".
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// The client's address.
///
/// With `trust_forwarded_for`, the first `X-Forwarded-For` entry wins; only
/// enable that behind a reverse proxy that overwrites the header. Otherwise
/// the TCP peer address is used.
pub fn client_addr<B>(request: &Request<B>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn prefers_peer_address_by_default() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "9.9.9.9")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));

        assert_eq!(client_addr(&req, false), "10.0.0.1");
        assert_eq!(client_addr(&req, true), "9.9.9.9");
    }

    #[test]
    fn first_forwarded_entry_wins() {
        let req = Request::builder()
            .header("x-forwarded-for", " 1.1.1.1 , 2.2.2.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_addr(&req, true), "1.1.1.1");
        assert_eq!(client_addr(&req, false), "unknown");
    }
}
