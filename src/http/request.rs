//! Request identity.
//!
//! # Responsibilities
//! - Stamp every request with a UUID as early as possible
//! - Propagate the ID onto the response for correlation
//!
//! # Design Decisions
//! - The ID rides the standard `x-request-id` header so upstream
//!   proxies and log collectors pick it up unchanged

use axum::http::{HeaderName, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates a fresh UUIDv4 per request.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// Read the request ID stamped by the middleware, for log fields.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn generates_distinct_ids() {
        let mut maker = MakeRequestUuid;
        let req = Request::new(Body::empty());
        let a = maker.make_request_id(&req).unwrap();
        let b = maker.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }

    #[test]
    fn missing_id_reads_as_unknown() {
        let req = Request::new(Body::empty());
        assert_eq!(request_id(&req), "unknown");
    }
}
