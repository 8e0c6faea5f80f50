use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when a stored or submitted status string is not a member
/// of its enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum that is
/// stored as lowercase text.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

text_enum!(Role, "role", { Member => "member", Admin => "admin" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerStatus {
    Active,
    Answered,
}

text_enum!(PrayerStatus, "prayer status", { Active => "active", Answered => "answered" });

/// Moderation state shared by healing stories and video suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(ReviewStatus, "review status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetaStatus {
    Pending,
    Approved,
    Declined,
}

text_enum!(BetaStatus, "beta status", {
    Pending => "pending",
    Approved => "approved",
    Declined => "declined",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiftStatus {
    Pending,
    Redeemed,
    Revoked,
}

text_enum!(GiftStatus, "gift status", {
    Pending => "pending",
    Redeemed => "redeemed",
    Revoked => "revoked",
});

/// The five pillars of the P.R.O.O.F. framework used to tag devotionals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofPillar {
    Purpose,
    Relationships,
    Obedience,
    Opportunity,
    Freedom,
}

text_enum!(ProofPillar, "P.R.O.O.F. pillar", {
    Purpose => "purpose",
    Relationships => "relationships",
    Obedience => "obedience",
    Opportunity => "opportunity",
    Freedom => "freedom",
});

impl ProofPillar {
    /// Pillar suggested for a calendar date, rotating through the framework
    /// one pillar per day.
    pub fn for_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        let idx = date.num_days_from_ce().rem_euclid(Self::ALL.len() as i32) as usize;
        Self::ALL[idx]
    }

    /// Lenient parse for model output: accepts any case and the
    /// "Obedience/Obscurity" spelling.
    pub fn parse_loose(s: &str) -> Result<Self, UnknownVariant> {
        let lowered = s.trim().to_ascii_lowercase();
        let head = lowered.split(['/', ' ']).next().unwrap_or_default();
        match head {
            "obscurity" => Ok(ProofPillar::Obedience),
            other => other.parse(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub organization: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Devotional {
    pub id: Uuid,
    pub date: NaiveDate,
    pub title: String,
    pub scripture_reference: String,
    pub scripture_text: String,
    pub reflection: String,
    pub prayer: String,
    pub application: String,
    pub proof_pillar: ProofPillar,
    pub created_at: DateTime<Utc>,
}

/// One prayer journal entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prayer {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub status: PrayerStatus,
    pub answered_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BetaTester {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub organization: Option<String>,
    pub referral_code: Option<String>,
    pub status: BetaStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GiftedSubscription {
    pub id: Uuid,
    pub recipient_email: String,
    pub gifted_by: Option<Uuid>,
    pub months: u32,
    pub message: Option<String>,
    pub status: GiftStatus,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealingStory {
    pub id: Uuid,
    /// `None` when the author asked to stay anonymous.
    pub author_id: Option<Uuid>,
    pub title: String,
    pub story: String,
    pub anonymous: bool,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoSuggestion {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub title: String,
    pub url: String,
    pub reason: Option<String>,
    pub status: ReviewStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}
