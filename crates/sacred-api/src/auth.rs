use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use sacred_types::api::{AuthResponse, LoginRequest, RegisterRequest};
use sacred_types::models::{Role, User};
use sacred_types::validate::{Validate, normalize_email, optional_text};

use crate::error::{ApiError, ApiResult};
use crate::middleware::Claims;
use crate::state::{AppState, run_db};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let email = normalize_email(&req.email);
    let display_name = req.display_name.trim().to_string();
    let organization = optional_text(req.organization.as_deref());
    let role = if state.admin_emails.contains(&email) {
        Role::Admin
    } else {
        Role::Member
    };

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();

    let created = {
        let (email, display_name) = (email.clone(), display_name.clone());
        run_db(&state, move |db| {
            db.create_user(
                &user_id.to_string(),
                &email,
                &display_name,
                &password_hash,
                organization.as_deref(),
                role,
            )
        })
        .await?
    };
    if !created {
        return Err(ApiError::Conflict("Email is already registered".into()));
    }

    info!("Registered {} as {}", email, role);

    let token = create_token(&state.jwt_secret, user_id, &email, role)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id,
            display_name,
            role,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = normalize_email(&req.email);
    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Stored password hash is corrupt: {}", e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user = user.into_model()?;
    let token = create_token(&state.jwt_secret, user.id, &user.email, user.role)?;

    Ok(Json(AuthResponse {
        user_id: user.id,
        display_name: user.display_name,
        role: user.role,
        token,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<User>> {
    let uid = claims.sub.to_string();
    let user = run_db(&state, move |db| db.get_user_by_id(&uid))
        .await?
        .ok_or_else(|| ApiError::NotFound("User no longer exists".into()))?;
    Ok(Json(user.into_model()?))
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
