//! Admin authorization.
//!
//! A caller is an admin if either check passes, tried in order:
//! 1. the `x-admin-secret` header matches the configured shared secret;
//! 2. the bearer token belongs to a user whose stored role is `admin`.
//!
//! The role is read from the database on every request, so a demotion takes
//! effect before the caller's token expires.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use sacred_types::models::Role;

use crate::error::ApiError;
use crate::middleware::bearer_claims;
use crate::state::{AppState, run_db};

pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Who passed the admin check; inserted as a request extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminIdentity {
    SharedSecret,
    User(Uuid),
}

impl AdminIdentity {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AdminIdentity::SharedSecret => None,
            AdminIdentity::User(id) => Some(*id),
        }
    }
}

/// Compares digests so the comparison time does not depend on where the
/// strings first differ.
fn secret_matches(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}

pub fn has_admin_secret(headers: &HeaderMap, configured: Option<&str>) -> bool {
    let Some(expected) = configured.filter(|s| !s.is_empty()) else {
        return false;
    };
    headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| secret_matches(provided, expected))
}

/// The authorization decision. `None` means not an admin.
pub async fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Option<AdminIdentity> {
    if has_admin_secret(headers, state.admin_secret.as_deref()) {
        return Some(AdminIdentity::SharedSecret);
    }

    let claims = bearer_claims(headers, &state.jwt_secret).ok().flatten()?;
    let uid = claims.sub.to_string();
    match run_db(state, move |db| db.get_user_role(&uid)).await {
        Ok(Some(Role::Admin)) => Some(AdminIdentity::User(claims.sub)),
        Ok(_) => {
            debug!("User {} is not an admin", claims.sub);
            None
        }
        Err(e) => {
            warn!("Admin role lookup failed for {}: {}", claims.sub, e);
            None
        }
    }
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authorize_admin(&state, req.headers())
        .await
        .ok_or(ApiError::Unauthorized)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn with_secret(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_SECRET_HEADER, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn secret_must_match_exactly() {
        assert!(has_admin_secret(&with_secret("s3cret"), Some("s3cret")));
        assert!(!has_admin_secret(&with_secret("s3cret "), Some("s3cret")));
        assert!(!has_admin_secret(&with_secret("guess"), Some("s3cret")));
        assert!(!has_admin_secret(&HeaderMap::new(), Some("s3cret")));
    }

    #[test]
    fn unset_or_empty_secret_never_matches() {
        assert!(!has_admin_secret(&with_secret(""), Some("")));
        assert!(!has_admin_secret(&with_secret("anything"), None));
    }
}
