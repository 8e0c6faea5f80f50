use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ReviewStatus;

/// Events handed to the outbound notification endpoint, which turns them
/// into emails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NotificationEvent {
    /// Someone joined the beta waitlist
    BetaSignup {
        email: String,
        name: String,
        organization: Option<String>,
    },

    /// An admin approved or rejected a video suggestion
    SuggestionReviewed {
        suggestion_id: Uuid,
        email: String,
        title: String,
        status: ReviewStatus,
        admin_notes: Option<String>,
    },

    /// An admin gifted a subscription
    GiftCreated {
        gift_id: Uuid,
        recipient_email: String,
        months: u32,
        message: Option<String>,
    },
}

impl NotificationEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BetaSignup { .. } => "beta_signup",
            Self::SuggestionReviewed { .. } => "suggestion_reviewed",
            Self::GiftCreated { .. } => "gift_created",
        }
    }

    /// Address the email goes to.
    pub fn recipient(&self) -> &str {
        match self {
            Self::BetaSignup { email, .. } => email,
            Self::SuggestionReviewed { email, .. } => email,
            Self::GiftCreated { recipient_email, .. } => recipient_email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_is_tagged() {
        let event = NotificationEvent::BetaSignup {
            email: "a@b.org".into(),
            name: "Ada".into(),
            organization: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "BetaSignup");
        assert_eq!(value["data"]["email"], "a@b.org");
        assert_eq!(event.kind(), "beta_signup");
        assert_eq!(event.recipient(), "a@b.org");
    }
}
