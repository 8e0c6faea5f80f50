//! Healing stories and video suggestions: member submissions that an admin
//! approves or rejects. Only approved stories are ever shown publicly.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use sacred_types::api::{ReviewRequest, StatusFilter, SubmitStoryRequest, SubmitSuggestionRequest};
use sacred_types::events::NotificationEvent;
use sacred_types::models::{HealingStory, ReviewStatus, VideoSuggestion};
use sacred_types::validate::{Validate, normalize_email, optional_text};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{Claims, MaybeUser};
use crate::state::{AppState, run_db};

// -- Healing stories --

/// POST /stories
pub async fn submit_story(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(req): Json<SubmitStoryRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let id = Uuid::new_v4();
    let user_id = user.map(|c| c.sub.to_string());
    let title = req.title.trim().to_string();
    let story = req.story.trim().to_string();
    let anonymous = req.anonymous;

    run_db(&state, move |db| {
        db.insert_story(&id.to_string(), user_id.as_deref(), &title, &story, anonymous)
    })
    .await?;

    info!("Healing story {} submitted for review", id);
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn stories_with_status(
    state: &AppState,
    status: Option<ReviewStatus>,
) -> ApiResult<Vec<HealingStory>> {
    let rows = run_db(state, move |db| db.list_stories(status.map(|s| s.as_str()))).await?;
    let stories = rows
        .into_iter()
        .map(|row| row.into_model())
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(stories)
}

/// GET /stories
pub async fn approved_stories(State(state): State<AppState>) -> ApiResult<Json<Vec<HealingStory>>> {
    Ok(Json(stories_with_status(&state, Some(ReviewStatus::Approved)).await?))
}

/// GET /admin/stories
pub async fn list_stories(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter<ReviewStatus>>,
) -> ApiResult<Json<Vec<HealingStory>>> {
    Ok(Json(stories_with_status(&state, filter.status).await?))
}

/// POST /admin/stories/{id}/review
pub async fn review_story(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;

    let status = req.status;
    let changed = run_db(&state, move |db| db.review_story(&id.to_string(), status.as_str())).await?;
    if !changed {
        return Err(ApiError::NotFound(format!("Story {} not found", id)));
    }

    info!("Story {} {}", id, status);
    Ok(StatusCode::NO_CONTENT)
}

// -- Video suggestions --

/// POST /suggestions
pub async fn submit_suggestion(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitSuggestionRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let id = Uuid::new_v4();
    let user_id = claims.sub.to_string();
    let email = normalize_email(&req.email);
    let title = req.title.trim().to_string();
    let url = req.url.trim().to_string();
    let reason = optional_text(req.reason.as_deref());

    run_db(&state, move |db| {
        db.insert_suggestion(
            &id.to_string(),
            Some(user_id.as_str()),
            &email,
            &title,
            &url,
            reason.as_deref(),
        )
    })
    .await?;

    info!("Video suggestion {} submitted by {}", id, claims.sub);
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// GET /admin/suggestions
pub async fn list_suggestions(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter<ReviewStatus>>,
) -> ApiResult<Json<Vec<VideoSuggestion>>> {
    let rows = run_db(&state, move |db| db.list_suggestions(filter.status.map(|s| s.as_str()))).await?;
    let suggestions = rows
        .into_iter()
        .map(|row| row.into_model())
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(suggestions))
}

/// POST /admin/suggestions/{id}/review
///
/// The submitter is notified of the decision.
pub async fn review_suggestion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<VideoSuggestion>> {
    req.validate()?;

    let status = req.status;
    let notes = optional_text(req.admin_notes.as_deref());
    let suggestion = run_db(&state, move |db| {
        db.review_suggestion(&id.to_string(), status.as_str(), notes.as_deref())
    })
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Suggestion {} not found", id)))?
    .into_model()?;

    info!("Suggestion {} {}", id, status);

    state.notifier.notify(NotificationEvent::SuggestionReviewed {
        suggestion_id: suggestion.id,
        email: suggestion.email.clone(),
        title: suggestion.title.clone(),
        status: suggestion.status,
        admin_notes: suggestion.admin_notes.clone(),
    });

    Ok(Json(suggestion))
}
