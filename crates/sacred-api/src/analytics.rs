use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use sacred_db::EventRange;
use sacred_db::models::parse_date;
use sacred_types::api::{AnalyticsEventRequest, AnalyticsSummary, DayCount, KeyCount, TableCounts};
use sacred_types::models::ReviewStatus;
use sacred_types::validate::{Validate, optional_text};

use crate::error::{ApiError, ApiResult};
use crate::middleware::MaybeUser;
use crate::state::{AppState, run_db};

/// Window used when the summary query omits `from`.
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// POST /analytics/events
pub async fn record_event(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(req): Json<AnalyticsEventRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;

    let id = Uuid::new_v4().to_string();
    let user_id = user.map(|c| c.sub.to_string());
    let event_type = req.event_type.trim().to_string();
    let page = optional_text(req.page.as_deref());
    let metadata = req
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(anyhow::Error::from)?;

    debug!("Analytics event {} from {:?}", event_type, user_id);

    run_db(&state, move |db| {
        db.insert_event(
            &id,
            user_id.as_deref(),
            &event_type,
            page.as_deref(),
            metadata.as_deref(),
        )
    })
    .await?;

    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SummaryQuery {
    /// Defaults to the last 30 days ending today (UTC).
    fn range(&self, today: NaiveDate) -> ApiResult<EventRange> {
        let to = self.to.unwrap_or(today);
        let from = match self.from {
            Some(from) => from,
            None => to
                .checked_sub_signed(Duration::days(DEFAULT_WINDOW_DAYS - 1))
                .ok_or_else(|| ApiError::BadRequest("`to` is out of range".into()))?,
        };
        if to < from {
            return Err(ApiError::BadRequest("`to` is before `from`".into()));
        }
        Ok(EventRange { from, to })
    }
}

/// GET /admin/analytics/summary
pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<AnalyticsSummary>> {
    let range = query.range(Utc::now().date_naive())?;

    let summary = run_db(&state, move |db| {
        let by_type = db.event_counts_by_type(range)?;
        let by_day = db
            .event_counts_by_day(range)?
            .into_iter()
            .map(|(day, count)| Ok(DayCount { date: parse_date(&day)?, count }))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let totals = TableCounts {
            users: db.count_users()?,
            devotionals: db.count_devotionals()?,
            prayers: db.count_prayers()?,
            beta_testers: db.count_beta_testers()?,
            pending_stories: db.count_stories_with_status(ReviewStatus::Pending.as_str())?,
            pending_suggestions: db.count_suggestions_with_status(ReviewStatus::Pending.as_str())?,
        };

        Ok(AnalyticsSummary {
            from: range.from,
            to: range.to,
            total_events: by_type.iter().map(|(_, n)| n).sum(),
            distinct_users: db.distinct_event_users(range)?,
            by_event_type: by_type
                .into_iter()
                .map(|(key, count)| KeyCount { key, count })
                .collect(),
            by_day,
            totals,
        })
    })
    .await?;

    Ok(Json(summary))
}
