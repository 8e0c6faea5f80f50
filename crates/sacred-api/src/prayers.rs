use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use sacred_types::api::{JournalExport, MarkAnsweredRequest, PrayerRequest};
use sacred_types::models::{Prayer, PrayerStatus};
use sacred_types::validate::{Validate, optional_text};

use crate::error::{ApiError, ApiResult};
use crate::middleware::Claims;
use crate::state::{AppState, run_db};

/// Hex SHA-256 of the export body, so a client can verify a saved copy.
pub const CONTENT_SHA256_HEADER: &str = "x-content-sha256";

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Prayer {} not found", id))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Prayer>>> {
    Ok(Json(load_journal(&state, claims.sub).await?))
}

async fn load_journal(state: &AppState, user_id: Uuid) -> ApiResult<Vec<Prayer>> {
    let uid = user_id.to_string();
    let rows = run_db(state, move |db| db.list_prayers(&uid)).await?;
    let prayers = rows
        .into_iter()
        .map(|row| row.into_model())
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(prayers)
}

async fn load_prayer(state: &AppState, id: Uuid, user_id: Uuid) -> ApiResult<Prayer> {
    let (pid, uid) = (id.to_string(), user_id.to_string());
    let row = run_db(state, move |db| db.get_prayer(&pid, &uid))
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(row.into_model()?)
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PrayerRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let id = Uuid::new_v4();
    {
        let (pid, uid) = (id.to_string(), claims.sub.to_string());
        let title = req.title.trim().to_string();
        let content = req.content.trim().to_string();
        let category = optional_text(req.category.as_deref());
        run_db(&state, move |db| {
            db.insert_prayer(&pid, &uid, &title, &content, category.as_deref())
        })
        .await?;
    }

    debug!("User {} added prayer {}", claims.sub, id);

    let prayer = load_prayer(&state, id, claims.sub).await?;
    Ok((StatusCode::CREATED, Json(prayer)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<PrayerRequest>,
) -> ApiResult<Json<Prayer>> {
    req.validate()?;

    let changed = {
        let (pid, uid) = (id.to_string(), claims.sub.to_string());
        let title = req.title.trim().to_string();
        let content = req.content.trim().to_string();
        let category = optional_text(req.category.as_deref());
        run_db(&state, move |db| {
            db.update_prayer(&pid, &uid, &title, &content, category.as_deref())
        })
        .await?
    };
    if !changed {
        return Err(not_found(id));
    }

    Ok(Json(load_prayer(&state, id, claims.sub).await?))
}

pub async fn mark_answered(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Json<Prayer>> {
    // The body is optional; an empty one marks the prayer answered without a note.
    let req: MarkAnsweredRequest = if body.is_empty() {
        MarkAnsweredRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let note = optional_text(req.note.as_deref());
    if let Some(note) = &note {
        sacred_types::validate::max_len("note", note, 2_000)?;
    }

    let changed = {
        let (pid, uid) = (id.to_string(), claims.sub.to_string());
        run_db(&state, move |db| db.mark_prayer_answered(&pid, &uid, note.as_deref())).await?
    };
    if !changed {
        return Err(not_found(id));
    }

    info!("User {} marked prayer {} answered", claims.sub, id);
    Ok(Json(load_prayer(&state, id, claims.sub).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let (pid, uid) = (id.to_string(), claims.sub.to_string());
    let deleted = run_db(&state, move |db| db.delete_prayer(&pid, &uid)).await?;
    if !deleted {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// GET /prayers/export
///
/// Downloads the caller's whole journal as an attachment.
pub async fn export(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let prayers = load_journal(&state, claims.sub).await?;
    let document = JournalExport {
        exported_at: Utc::now(),
        count: prayers.len(),
        prayers,
    };

    let stamp = document.exported_at.format("%Y-%m-%d");
    let (body, content_type, filename) = match query.format {
        ExportFormat::Json => (
            serde_json::to_vec_pretty(&document).map_err(anyhow::Error::from)?,
            "application/json",
            format!("prayer-journal-{}.json", stamp),
        ),
        ExportFormat::Text => (
            render_text(&document).into_bytes(),
            "text/plain; charset=utf-8",
            format!("prayer-journal-{}.txt", stamp),
        ),
    };

    info!(
        "User {} exported {} prayers as {:?}",
        claims.sub, document.count, query.format
    );

    let digest = hex::encode(Sha256::digest(&body));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(anyhow::Error::from)?;

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(
        CONTENT_SHA256_HEADER,
        HeaderValue::from_str(&digest).map_err(anyhow::Error::from)?,
    );
    Ok(response)
}

const TEXT_SEPARATOR: &str = "----------------------------------------";

/// Plain-text rendering for printing or pasting into a notes app.
pub fn render_text(document: &JournalExport) -> String {
    let mut out = format!(
        "Prayer Journal\nExported {}\n{} prayers\n",
        document.exported_at.format("%B %-d, %Y"),
        document.count
    );

    for prayer in &document.prayers {
        out.push('\n');
        out.push_str(TEXT_SEPARATOR);
        out.push('\n');
        out.push_str(&prayer.title);
        out.push('\n');
        if let Some(category) = &prayer.category {
            out.push_str(&format!("Category: {}\n", category));
        }
        out.push_str(&format!("Written: {}\n", prayer.created_at.format("%Y-%m-%d")));
        match prayer.status {
            PrayerStatus::Active => out.push_str("Status: still praying\n"),
            PrayerStatus::Answered => out.push_str("Status: answered\n"),
        }
        out.push('\n');
        out.push_str(&prayer.content);
        out.push('\n');
        if let Some(note) = &prayer.answered_note {
            out.push_str(&format!("\nHow it was answered: {}\n", note));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn prayer(title: &str, status: PrayerStatus, note: Option<&str>) -> Prayer {
        let at = Utc.with_ymd_and_hms(2025, 4, 2, 7, 30, 0).unwrap();
        Prayer {
            id: Uuid::new_v4(),
            title: title.into(),
            content: "Give our chapter unity.".into(),
            category: Some("chapter".into()),
            status,
            answered_note: note.map(str::to_string),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn text_export_lists_every_prayer() {
        let document = JournalExport {
            exported_at: Utc.with_ymd_and_hms(2025, 4, 9, 12, 0, 0).unwrap(),
            count: 2,
            prayers: vec![
                prayer("Unity", PrayerStatus::Active, None),
                prayer("Recruitment", PrayerStatus::Answered, Some("Twelve new members")),
            ],
        };

        let text = render_text(&document);
        assert!(text.starts_with("Prayer Journal\nExported April 9, 2025\n2 prayers\n"));
        assert!(text.contains("Unity\nCategory: chapter\n"));
        assert!(text.contains("Status: still praying"));
        assert!(text.contains("How it was answered: Twelve new members"));
        assert_eq!(text.matches(TEXT_SEPARATOR).count(), 2);
    }

    #[test]
    fn format_defaults_to_json() {
        let q: ExportQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.format, ExportFormat::Json);
        let q: ExportQuery = serde_json::from_str(r#"{"format":"text"}"#).unwrap();
        assert_eq!(q.format, ExportFormat::Text);
    }
}
