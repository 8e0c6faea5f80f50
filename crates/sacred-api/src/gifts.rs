use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use sacred_types::api::CreateGiftRequest;
use sacred_types::events::NotificationEvent;
use sacred_types::models::{GiftStatus, GiftedSubscription};
use sacred_types::validate::{Validate, normalize_email, optional_text};

use crate::admin::AdminIdentity;
use crate::error::{ApiError, ApiResult};
use crate::middleware::Claims;
use crate::state::{AppState, run_db};

async fn load_gift(state: &AppState, id: Uuid) -> ApiResult<GiftedSubscription> {
    let row = run_db(state, move |db| db.get_gift(&id.to_string()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Gift {} not found", id)))?;
    Ok(row.into_model()?)
}

/// POST /admin/gifts
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Json(req): Json<CreateGiftRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let id = Uuid::new_v4();
    let recipient_email = normalize_email(&req.recipient_email);
    let message = optional_text(req.message.as_deref());
    let months = req.months;
    let gifted_by = identity.user_id().map(|u| u.to_string());

    {
        let (recipient_email, message) = (recipient_email.clone(), message.clone());
        run_db(&state, move |db| {
            db.insert_gift(
                &id.to_string(),
                &recipient_email,
                gifted_by.as_deref(),
                months,
                message.as_deref(),
            )
        })
        .await?;
    }

    info!("Gifted {} months to {} ({})", months, recipient_email, id);

    state.notifier.notify(NotificationEvent::GiftCreated {
        gift_id: id,
        recipient_email,
        months,
        message,
    });

    Ok((StatusCode::CREATED, Json(load_gift(&state, id).await?)))
}

/// GET /admin/gifts
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<GiftedSubscription>>> {
    let rows = run_db(&state, |db| db.list_gifts()).await?;
    let gifts = rows
        .into_iter()
        .map(|row| row.into_model())
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(gifts))
}

/// POST /admin/gifts/{id}/revoke
pub async fn revoke(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<GiftedSubscription>> {
    let revoked = run_db(&state, move |db| db.revoke_gift(&id.to_string())).await?;
    if !revoked {
        let gift = load_gift(&state, id).await?;
        return Err(ApiError::Conflict(format!("Gift is already {}", gift.status)));
    }

    info!("Gift {} revoked", id);
    Ok(Json(load_gift(&state, id).await?))
}

/// POST /gifts/{id}/redeem
///
/// Only the recipient can redeem; to anyone else the gift does not exist.
pub async fn redeem(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GiftedSubscription>> {
    let email = normalize_email(&claims.email);

    let gift = load_gift(&state, id).await?;
    if gift.recipient_email != email {
        return Err(ApiError::NotFound(format!("Gift {} not found", id)));
    }
    if gift.status != GiftStatus::Pending {
        return Err(ApiError::Conflict(format!("Gift is already {}", gift.status)));
    }

    let redeemed = run_db(&state, move |db| db.redeem_gift(&id.to_string(), &email)).await?;
    if !redeemed {
        // Lost a race with a concurrent redeem or revoke.
        return Err(ApiError::Conflict("Gift is no longer pending".into()));
    }

    info!("Gift {} redeemed by {}", id, claims.sub);
    Ok(Json(load_gift(&state, id).await?))
}
