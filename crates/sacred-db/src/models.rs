//! Database row types. These map directly to SQLite rows.
//! Distinct from sacred-types API models to keep the DB layer independent;
//! `into_model` does the parsing and fails loudly on corrupt rows.
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use sacred_types::models::{
    BetaTester, Devotional, GiftedSubscription, HealingStory, Prayer, User, VideoSuggestion,
};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub organization: Option<String>,
    pub role: String,
    pub created_at: String,
}

pub struct DevotionalRow {
    pub id: String,
    pub date: String,
    pub title: String,
    pub scripture_reference: String,
    pub scripture_text: String,
    pub reflection: String,
    pub prayer: String,
    pub application: String,
    pub proof_pillar: String,
    pub created_at: String,
}

/// Fields of a devotional about to be inserted.
#[derive(Debug, Clone)]
pub struct NewDevotional<'a> {
    pub id: &'a str,
    pub date: NaiveDate,
    pub title: &'a str,
    pub scripture_reference: &'a str,
    pub scripture_text: &'a str,
    pub reflection: &'a str,
    pub prayer: &'a str,
    pub application: &'a str,
    pub proof_pillar: &'a str,
}

pub struct PrayerRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub status: String,
    pub answered_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct BetaTesterRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub organization: Option<String>,
    pub referral_code: Option<String>,
    pub status: String,
    pub created_at: String,
}

pub struct GiftRow {
    pub id: String,
    pub recipient_email: String,
    pub gifted_by: Option<String>,
    pub months: i64,
    pub message: Option<String>,
    pub status: String,
    pub created_at: String,
    pub redeemed_at: Option<String>,
}

pub struct StoryRow {
    pub id: String,
    pub user_id: Option<String>,
    pub title: String,
    pub story: String,
    pub anonymous: bool,
    pub status: String,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

pub struct SuggestionRow {
    pub id: String,
    pub user_id: Option<String>,
    pub email: String,
    pub title: String,
    pub url: String,
    pub reason: Option<String>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: String,
    pub reviewed_at: Option<String>,
}

pub struct ReferralRow {
    pub id: String,
    pub referrer_id: String,
    pub code: String,
    pub created_at: String,
}

/// Parses a timestamp written by SQLite's `datetime('now')`
/// ("YYYY-MM-DD HH:MM:SS", implicitly UTC) or an RFC 3339 string.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("Corrupt timestamp '{}'", value))
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| format!("Corrupt date '{}'", value))
}

fn parse_id(value: &str) -> Result<Uuid> {
    value.parse().with_context(|| format!("Corrupt id '{}'", value))
}

fn parse_opt_id(value: Option<&str>) -> Result<Option<Uuid>> {
    value.map(parse_id).transpose()
}

fn parse_opt_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value.map(parse_timestamp).transpose()
}

impl UserRow {
    pub fn into_model(self) -> Result<User> {
        Ok(User {
            id: parse_id(&self.id)?,
            role: self.role.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
            email: self.email,
            display_name: self.display_name,
            organization: self.organization,
        })
    }
}

impl DevotionalRow {
    pub fn into_model(self) -> Result<Devotional> {
        Ok(Devotional {
            id: parse_id(&self.id)?,
            date: parse_date(&self.date)?,
            proof_pillar: self.proof_pillar.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
            title: self.title,
            scripture_reference: self.scripture_reference,
            scripture_text: self.scripture_text,
            reflection: self.reflection,
            prayer: self.prayer,
            application: self.application,
        })
    }
}

impl PrayerRow {
    pub fn into_model(self) -> Result<Prayer> {
        Ok(Prayer {
            id: parse_id(&self.id)?,
            status: self.status.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            title: self.title,
            content: self.content,
            category: self.category,
            answered_note: self.answered_note,
        })
    }
}

impl BetaTesterRow {
    pub fn into_model(self) -> Result<BetaTester> {
        Ok(BetaTester {
            id: parse_id(&self.id)?,
            status: self.status.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
            email: self.email,
            name: self.name,
            organization: self.organization,
            referral_code: self.referral_code,
        })
    }
}

impl GiftRow {
    pub fn into_model(self) -> Result<GiftedSubscription> {
        Ok(GiftedSubscription {
            id: parse_id(&self.id)?,
            gifted_by: parse_opt_id(self.gifted_by.as_deref())?,
            months: u32::try_from(self.months).context("Corrupt gift months")?,
            status: self.status.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
            redeemed_at: parse_opt_timestamp(self.redeemed_at.as_deref())?,
            recipient_email: self.recipient_email,
            message: self.message,
        })
    }
}

impl StoryRow {
    pub fn into_model(self) -> Result<HealingStory> {
        // Anonymous stories never expose who wrote them.
        let author_id = if self.anonymous {
            None
        } else {
            parse_opt_id(self.user_id.as_deref())?
        };

        Ok(HealingStory {
            id: parse_id(&self.id)?,
            author_id,
            status: self.status.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
            reviewed_at: parse_opt_timestamp(self.reviewed_at.as_deref())?,
            title: self.title,
            story: self.story,
            anonymous: self.anonymous,
        })
    }
}

impl SuggestionRow {
    pub fn into_model(self) -> Result<VideoSuggestion> {
        Ok(VideoSuggestion {
            id: parse_id(&self.id)?,
            user_id: parse_opt_id(self.user_id.as_deref())?,
            status: self.status.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
            reviewed_at: parse_opt_timestamp(self.reviewed_at.as_deref())?,
            email: self.email,
            title: self.title,
            url: self.url,
            reason: self.reason,
            admin_notes: self.admin_notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_and_rfc3339_timestamps_parse() {
        let a = parse_timestamp("2025-02-03 04:05:06").unwrap();
        let b = parse_timestamp("2025-02-03T04:05:06Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn anonymous_story_hides_author() {
        let row = StoryRow {
            id: Uuid::new_v4().to_string(),
            user_id: Some(Uuid::new_v4().to_string()),
            title: "Restored".into(),
            story: "Line sisters prayed with me.".into(),
            anonymous: true,
            status: "approved".into(),
            created_at: "2025-01-01 00:00:00".into(),
            reviewed_at: None,
        };
        assert_eq!(row.into_model().unwrap().author_id, None);
    }
}
