use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BetaStatus, Prayer, ReviewStatus, Role};
use crate::validate::{self, Validate, ValidationError};

/// Upper bound on the number of days one generation request may cover.
pub const MAX_GENERATION_DAYS: u32 = 31;

/// Longest gift a single admin action can grant.
pub const MAX_GIFT_MONTHS: u32 = 24;

// -- JWT Claims --

/// JWT claims issued at login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    #[serde(default)]
    pub organization: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::email("email", &self.email)?;
        validate::required("display_name", &self.display_name)?;
        validate::max_len("display_name", &self.display_name, 64)?;
        if self.password.len() < 8 {
            return Err(ValidationError::new("password", "must be at least 8 characters"));
        }
        if let Some(org) = &self.organization {
            validate::max_len("organization", org, 120)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub role: Role,
    pub token: String,
}

// -- Devotionals --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateDevotionalsRequest {
    pub start_date: NaiveDate,
    pub days: u32,
}

impl Validate for GenerateDevotionalsRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.days == 0 || self.days > MAX_GENERATION_DAYS {
            return Err(ValidationError::new(
                "days",
                format!("must be between 1 and {}", MAX_GENERATION_DAYS),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationFailure {
    pub date: NaiveDate,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateDevotionalsResponse {
    pub generated: Vec<NaiveDate>,
    pub skipped: Vec<NaiveDate>,
    pub errors: Vec<GenerationFailure>,
}

// -- Prayer journal --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrayerRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl Validate for PrayerRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::required("title", &self.title)?;
        validate::max_len("title", &self.title, 200)?;
        validate::required("content", &self.content)?;
        validate::max_len("content", &self.content, 10_000)?;
        if let Some(category) = &self.category {
            validate::max_len("category", category, 64)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkAnsweredRequest {
    #[serde(default)]
    pub note: Option<String>,
}

/// Document produced by the journal export. Parsing an export back yields
/// the journal exactly as it was when exported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalExport {
    pub exported_at: DateTime<Utc>,
    pub count: usize,
    pub prayers: Vec<Prayer>,
}

// -- Beta signup --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BetaSignupRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub referral_code: Option<String>,
}

impl Validate for BetaSignupRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::email("email", &self.email)?;
        validate::required("name", &self.name)?;
        validate::max_len("name", &self.name, 120)?;
        if let Some(org) = &self.organization {
            validate::max_len("organization", org, 120)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BetaSignupResponse {
    pub id: Uuid,
    pub referral_applied: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BetaReviewRequest {
    pub status: BetaStatus,
}

impl Validate for BetaReviewRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.status == BetaStatus::Pending {
            return Err(ValidationError::new("status", "must be approved or declined"));
        }
        Ok(())
    }
}

// -- Referrals --

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferralCodeResponse {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedeemReferralRequest {
    pub code: String,
    pub email: String,
}

impl Validate for RedeemReferralRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::required("code", &self.code)?;
        validate::max_len("code", &self.code, 32)?;
        validate::email("email", &self.email)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemReferralResponse {
    pub reward_id: Uuid,
    pub reward: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferralStats {
    pub code: Option<String>,
    pub rewards: u64,
}

// -- Community submissions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitStoryRequest {
    pub title: String,
    pub story: String,
    #[serde(default)]
    pub anonymous: bool,
}

impl Validate for SubmitStoryRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::required("title", &self.title)?;
        validate::max_len("title", &self.title, 200)?;
        validate::required("story", &self.story)?;
        validate::max_len("story", &self.story, 20_000)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitSuggestionRequest {
    pub email: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Validate for SubmitSuggestionRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::email("email", &self.email)?;
        validate::required("title", &self.title)?;
        validate::max_len("title", &self.title, 200)?;
        validate::http_url("url", &self.url)?;
        if let Some(reason) = &self.reason {
            validate::max_len("reason", reason, 2_000)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewRequest {
    pub status: ReviewStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

impl Validate for ReviewRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.status == ReviewStatus::Pending {
            return Err(ValidationError::new("status", "must be approved or rejected"));
        }
        if let Some(notes) = &self.admin_notes {
            validate::max_len("admin_notes", notes, 2_000)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter<S> {
    pub status: Option<S>,
}

// -- Gifted subscriptions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGiftRequest {
    pub recipient_email: String,
    pub months: u32,
    #[serde(default)]
    pub message: Option<String>,
}

impl Validate for CreateGiftRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::email("recipient_email", &self.recipient_email)?;
        if self.months == 0 || self.months > MAX_GIFT_MONTHS {
            return Err(ValidationError::new(
                "months",
                format!("must be between 1 and {}", MAX_GIFT_MONTHS),
            ));
        }
        if let Some(message) = &self.message {
            validate::max_len("message", message, 1_000)?;
        }
        Ok(())
    }
}

// -- Analytics --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsEventRequest {
    pub event_type: String,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl Validate for AnalyticsEventRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::required("event_type", &self.event_type)?;
        validate::max_len("event_type", &self.event_type, 64)?;
        if let Some(page) = &self.page {
            validate::max_len("page", page, 512)?;
        }
        if let Some(metadata) = &self.metadata {
            if !metadata.is_object() {
                return Err(ValidationError::new("metadata", "must be a JSON object"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyCount {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableCounts {
    pub users: u64,
    pub devotionals: u64,
    pub prayers: u64,
    pub beta_testers: u64,
    pub pending_stories: u64,
    pub pending_suggestions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_events: u64,
    pub distinct_users: u64,
    pub by_event_type: Vec<KeyCount>,
    pub by_day: Vec<DayCount>,
    pub totals: TableCounts,
}

// -- Preferences --

pub type Preferences = BTreeMap<String, bool>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreferenceUpdate {
    pub value: bool,
}

pub fn validate_preference_key(key: &str) -> Result<(), ValidationError> {
    let valid = !key.is_empty()
        && key.len() <= 64
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if !valid {
        return Err(ValidationError::new(
            "key",
            "must be 1-64 characters of a-z, 0-9 or _",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_days_are_bounded() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        for (days, ok) in [(0, false), (1, true), (MAX_GENERATION_DAYS, true), (MAX_GENERATION_DAYS + 1, false)] {
            let req = GenerateDevotionalsRequest { start_date: start, days };
            assert_eq!(req.validate().is_ok(), ok, "days = {}", days);
        }
    }

    #[test]
    fn prayer_requires_title_and_content() {
        let blank_title = PrayerRequest {
            title: "  ".into(),
            content: "Lord, guide my chapter.".into(),
            category: None,
        };
        assert_eq!(blank_title.validate().unwrap_err().field, "title");

        let blank_content = PrayerRequest {
            title: "Chapter".into(),
            content: "".into(),
            category: None,
        };
        assert_eq!(blank_content.validate().unwrap_err().field, "content");
    }

    #[test]
    fn review_cannot_target_pending() {
        let req: ReviewRequest = serde_json::from_str(r#"{"status":"pending"}"#).unwrap();
        assert!(req.validate().is_err());
        let req: ReviewRequest =
            serde_json::from_str(r#"{"status":"approved","admin_notes":"great"}"#).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn analytics_metadata_must_be_object() {
        let req: AnalyticsEventRequest =
            serde_json::from_str(r#"{"event_type":"page_view","metadata":[1,2]}"#).unwrap();
        assert_eq!(req.validate().unwrap_err().field, "metadata");
    }

    #[test]
    fn preference_keys() {
        assert!(validate_preference_key("daily_reminder").is_ok());
        assert!(validate_preference_key("").is_err());
        assert!(validate_preference_key("Dark-Mode").is_err());
        assert!(validate_preference_key(&"a".repeat(65)).is_err());
    }
}
