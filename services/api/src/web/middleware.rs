//! services/api/src/web/middleware.rs
//!
//! Caller identification middleware.

use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use hafiz_core::domain::CallerIdentity;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const PREMIUM_HEADER: &str = "x-premium";

/// Who is calling, as declared by request headers. There is no authentication;
/// a missing user id maps to the shared anonymous identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub identity: CallerIdentity,
    pub premium: bool,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let identity = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(CallerIdentity::new)
            .unwrap_or_else(CallerIdentity::anonymous);

        let premium = headers
            .get(PREMIUM_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self { identity, premium }
    }
}

/// Middleware that derives the `Caller` from headers.
///
/// The caller is inserted into request extensions for handlers to use.
pub async fn identify_caller(mut req: Request, next: Next) -> Response {
    let caller = Caller::from_headers(req.headers());
    req.extensions_mut().insert(caller);
    next.run(req).await
}
