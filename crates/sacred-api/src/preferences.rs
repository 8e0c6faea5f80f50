use axum::{
    Extension, Json,
    extract::{Path, State},
};

use sacred_types::api::{PreferenceUpdate, Preferences, validate_preference_key};

use crate::error::ApiResult;
use crate::middleware::Claims;
use crate::state::{AppState, run_db};

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Preferences>> {
    let uid = claims.sub.to_string();
    let pairs = run_db(&state, move |db| db.get_preferences(&uid)).await?;
    Ok(Json(pairs.into_iter().collect()))
}

/// PUT /preferences/{key}
///
/// Returns the caller's full preference map after the write.
pub async fn set(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(key): Path<String>,
    Json(update): Json<PreferenceUpdate>,
) -> ApiResult<Json<Preferences>> {
    validate_preference_key(&key)?;

    let uid = claims.sub.to_string();
    let pairs = run_db(&state, move |db| {
        db.set_preference(&uid, &key, update.value)?;
        db.get_preferences(&uid)
    })
    .await?;
    Ok(Json(pairs.into_iter().collect()))
}
