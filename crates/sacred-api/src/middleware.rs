use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

pub use sacred_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Reads the bearer token, if any. `Ok(None)` means no Authorization header;
/// a present but invalid token is an error.
pub fn bearer_claims(headers: &HeaderMap, secret: &str) -> Result<Option<Claims>, ApiError> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    Ok(Some(token_data.claims))
}

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = bearer_claims(req.headers(), &state.jwt_secret)?.ok_or(ApiError::Unauthorized)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Caller identity on routes that also accept anonymous requests.
pub struct MaybeUser(pub Option<Claims>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(bearer_claims(&parts.headers, &state.jwt_secret)?))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use sacred_types::models::Role;
    use uuid::Uuid;

    use super::*;
    use crate::auth::create_token;

    #[test]
    fn missing_header_is_anonymous() {
        assert!(bearer_claims(&HeaderMap::new(), "s").unwrap().is_none());
    }

    #[test]
    fn valid_token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = create_token("s", user_id, "a@b.org", Role::Member).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let claims = bearer_claims(&headers, "s").unwrap().unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Member);

        assert!(matches!(bearer_claims(&headers, "other"), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn malformed_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_claims(&headers, "s"), Err(ApiError::Unauthorized)));
    }
}
