use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use sacred_types::models::Devotional;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_db};

/// Longest range a single listing may span.
const MAX_RANGE_DAYS: i64 = 366;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

pub async fn today(State(state): State<AppState>) -> ApiResult<Json<Devotional>> {
    by_date(State(state), Path(Utc::now().date_naive())).await
}

pub async fn by_date(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<Devotional>> {
    let row = run_db(&state, move |db| db.get_devotional_by_date(date))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No devotional for {}", date)))?;
    Ok(Json(row.into_model()?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<Devotional>>> {
    if range.to < range.from {
        return Err(ApiError::BadRequest("`to` is before `from`".into()));
    }
    if (range.to - range.from).num_days() >= MAX_RANGE_DAYS {
        return Err(ApiError::BadRequest(format!(
            "Range may span at most {} days",
            MAX_RANGE_DAYS
        )));
    }

    let rows = run_db(&state, move |db| db.list_devotionals(range.from, range.to)).await?;
    let devotionals = rows
        .into_iter()
        .map(|row| row.into_model())
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(devotionals))
}
