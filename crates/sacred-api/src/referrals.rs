use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use sacred_db::RedeemOutcome;
use sacred_types::api::{
    RedeemReferralRequest, RedeemReferralResponse, ReferralCodeResponse, ReferralStats,
};
use sacred_types::validate::{Validate, normalize_email};

use crate::error::{ApiError, ApiResult};
use crate::middleware::Claims;
use crate::state::{AppState, run_db};

/// No 0/O or 1/I, so codes survive being read aloud or copied by hand.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 8;
const MAX_CODE_ATTEMPTS: usize = 5;

/// Reward recorded for every successful redemption.
pub const REFERRAL_REWARD: &str = "one_month_free";

pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Canonical form of a code typed by a user.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// POST /referrals
///
/// Returns the caller's referral code, creating it on first use.
pub async fn get_or_create_code(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ReferralCodeResponse>> {
    let uid = claims.sub.to_string();
    let code = run_db(&state, move |db| {
        if let Some(existing) = db.get_referral_for_user(&uid)? {
            return Ok(Some(existing.code));
        }
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code();
            if db.create_referral(&Uuid::new_v4().to_string(), &uid, &code)? {
                return Ok(Some(code));
            }
            // Either the code collided or a concurrent request created ours.
            if let Some(existing) = db.get_referral_for_user(&uid)? {
                return Ok(Some(existing.code));
            }
        }
        Ok(None)
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("Could not allocate a unique referral code"))?;

    Ok(Json(ReferralCodeResponse { code }))
}

/// Records a redemption. `Ok(None)` when the code does not exist.
pub async fn apply_code(
    state: &AppState,
    code: &str,
    email: &str,
) -> ApiResult<Option<(Uuid, RedeemOutcome)>> {
    let reward_id = Uuid::new_v4();
    let (code, email) = (normalize_code(code), normalize_email(email));
    let outcome = run_db(state, move |db| {
        db.redeem_referral(&reward_id.to_string(), &code, &email, REFERRAL_REWARD)
    })
    .await?;

    match outcome {
        RedeemOutcome::UnknownCode => Ok(None),
        other => Ok(Some((reward_id, other))),
    }
}

/// POST /referrals/redeem
pub async fn redeem(
    State(state): State<AppState>,
    Json(req): Json<RedeemReferralRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let (reward_id, outcome) = apply_code(&state, &req.code, &req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("Unknown referral code".into()))?;

    match outcome {
        RedeemOutcome::Redeemed { referral_id } => {
            info!("Referral {} redeemed by {}", referral_id, normalize_email(&req.email));
            Ok((
                StatusCode::CREATED,
                Json(RedeemReferralResponse {
                    reward_id,
                    reward: REFERRAL_REWARD.to_string(),
                }),
            ))
        }
        RedeemOutcome::AlreadyRedeemed => Err(ApiError::Conflict(
            "This email has already redeemed that code".into(),
        )),
        RedeemOutcome::SelfReferral => {
            warn!("Self-referral attempt with code {}", normalize_code(&req.code));
            Err(ApiError::BadRequest("You cannot redeem your own referral code".into()))
        }
        RedeemOutcome::UnknownCode => Err(ApiError::NotFound("Unknown referral code".into())),
    }
}

/// GET /referrals/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ReferralStats>> {
    let uid = claims.sub.to_string();
    let stats = run_db(&state, move |db| {
        let code = db.get_referral_for_user(&uid)?.map(|r| r.code);
        let rewards = db.count_rewards_for_user(&uid)?;
        Ok(ReferralStats { code, rewards })
    })
    .await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_use_the_unambiguous_alphabet() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)), "{}", code);
            assert!(!code.contains(['0', 'O', '1', 'I']));
        }
    }

    #[test]
    fn typed_codes_are_normalized() {
        assert_eq!(normalize_code("  abcd2345 "), "ABCD2345");
    }
}
