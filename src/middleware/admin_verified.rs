use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::services::challenge::ADMIN_COOKIE;

use super::current_user::CurrentUser;

/// Middleware for elevated routes: the caller must be an admin holding the
/// `adminVerified` cookie issued by a completed email challenge
pub async fn admin_verified_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let CurrentUser(user) = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("User validation required before admin check"))?;

    if !user.is_admin {
        tracing::warn!("Non-admin {} attempted an elevated route", user.id);
        return Err(ApiError::forbidden("Admin access required"));
    }

    if !has_admin_cookie(&headers) {
        tracing::warn!("Admin {} has not completed the email challenge", user.id);
        return Err(ApiError::forbidden("Admin verification required"));
    }

    Ok(next.run(request).await)
}

fn has_admin_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, value)| name == ADMIN_COOKIE && value == "true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_admin_cookie_detection() {
        assert!(has_admin_cookie(&with_cookie("adminVerified=true")));
        assert!(has_admin_cookie(&with_cookie("theme=dark; adminVerified=true")));
        assert!(!has_admin_cookie(&with_cookie("adminVerified=false")));
        assert!(!has_admin_cookie(&with_cookie("notadminVerified=true")));
        assert!(!has_admin_cookie(&HeaderMap::new()));
    }
}
