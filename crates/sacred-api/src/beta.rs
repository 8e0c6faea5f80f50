use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use sacred_db::RedeemOutcome;
use sacred_types::api::{BetaReviewRequest, BetaSignupRequest, BetaSignupResponse, StatusFilter};
use sacred_types::events::NotificationEvent;
use sacred_types::models::{BetaStatus, BetaTester};
use sacred_types::validate::{Validate, normalize_email, optional_text};

use crate::error::{ApiError, ApiResult};
use crate::referrals::{apply_code, normalize_code};
use crate::state::{AppState, run_db};

/// POST /beta/signup
///
/// Joins the waitlist. A referral code, if given, is redeemed for the new
/// tester; a code that does not exist is ignored rather than failing the
/// signup.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<BetaSignupRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let id = Uuid::new_v4();
    let email = normalize_email(&req.email);
    let name = req.name.trim().to_string();
    let organization = optional_text(req.organization.as_deref());
    let referral_code = optional_text(req.referral_code.as_deref()).map(|c| normalize_code(&c));

    let inserted = {
        let (email, name, organization, referral_code) =
            (email.clone(), name.clone(), organization.clone(), referral_code.clone());
        run_db(&state, move |db| {
            db.insert_beta_tester(
                &id.to_string(),
                &email,
                &name,
                organization.as_deref(),
                referral_code.as_deref(),
            )
        })
        .await?
    };
    if !inserted {
        return Err(ApiError::Conflict("This email is already on the beta list".into()));
    }

    info!("Beta signup from {}", email);

    let mut referral_applied = false;
    if let Some(code) = &referral_code {
        // The signup is already stored, so a failed redemption must not fail the request.
        match apply_code(&state, code, &email).await {
            Ok(Some((_, RedeemOutcome::Redeemed { referral_id }))) => {
                info!("Beta signup {} redeemed referral {}", email, referral_id);
                referral_applied = true;
            }
            Ok(Some((_, outcome))) => warn!("Referral {} not applied for {}: {:?}", code, email, outcome),
            Ok(None) => warn!("Beta signup {} used unknown referral code {}", email, code),
            Err(e) => error!("Referral {} for beta signup {} failed: {}", code, email, e),
        }
    }

    state.notifier.notify(NotificationEvent::BetaSignup {
        email,
        name,
        organization,
    });

    Ok((StatusCode::CREATED, Json(BetaSignupResponse { id, referral_applied })))
}

/// GET /admin/beta
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter<BetaStatus>>,
) -> ApiResult<Json<Vec<BetaTester>>> {
    let rows = run_db(&state, move |db| db.list_beta_testers(filter.status.map(|s| s.as_str()))).await?;
    let testers = rows
        .into_iter()
        .map(|row| row.into_model())
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(testers))
}

/// POST /admin/beta/{id}/review
pub async fn review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<BetaReviewRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;

    let status = req.status;
    let changed = run_db(&state, move |db| db.set_beta_status(&id.to_string(), status.as_str())).await?;
    if !changed {
        return Err(ApiError::NotFound(format!("Beta tester {} not found", id)));
    }

    info!("Beta tester {} marked {}", id, status);
    Ok(StatusCode::NO_CONTENT)
}
