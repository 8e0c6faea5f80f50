use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use sacred_types::models::ProofPillar;

use crate::client::{ChatMessage, CompletionRequest};

const SYSTEM_PROMPT: &str = "You write short daily devotionals for members of Black Greek-letter \
organizations (BGLOs) who want to live their faith and their oaths together. Every devotional \
is grounded in one scripture passage and tagged with one pillar of the P.R.O.O.F. framework: \
Purpose, Relationships, Obedience/Obscurity, Opportunity, Freedom. Respond with a single JSON \
object and nothing else.";

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("completion is not valid JSON: {0}")]
    Json(String),

    #[error("field '{0}' is missing or blank")]
    MissingField(&'static str),

    #[error("unknown P.R.O.O.F. pillar '{0}'")]
    UnknownPillar(String),
}

/// Devotional content as returned by the model, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDevotional {
    pub title: String,
    pub scripture_reference: String,
    pub scripture_text: String,
    pub reflection: String,
    pub prayer: String,
    pub application: String,
    pub proof_pillar: ProofPillar,
}

#[derive(Debug, Deserialize)]
struct RawDevotional {
    #[serde(default)]
    title: String,
    #[serde(default)]
    scripture_reference: String,
    #[serde(default)]
    scripture_text: String,
    #[serde(default)]
    reflection: String,
    #[serde(default)]
    prayer: String,
    #[serde(default)]
    application: String,
    #[serde(default)]
    proof_pillar: String,
}

/// Builds the completion request for one calendar date.
pub fn build_request(date: NaiveDate, model: &str, temperature: f32) -> CompletionRequest {
    let pillar = ProofPillar::for_date(date);
    let user_prompt = format!(
        "Write the devotional for {date} ({weekday}). Focus on the {pillar} pillar.\n\
         Return JSON with exactly these string fields:\n\
         \"title\" (at most 8 words),\n\
         \"scripture_reference\" (book chapter:verse),\n\
         \"scripture_text\" (the passage, NKJV),\n\
         \"reflection\" (150-250 words connecting the passage to fraternity or sorority life),\n\
         \"prayer\" (3-5 sentences),\n\
         \"application\" (one concrete action for today),\n\
         \"proof_pillar\" (\"{pillar}\").",
        date = date.format("%B %-d, %Y"),
        weekday = date.format("%A"),
        pillar = pillar,
    );

    CompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt)],
        temperature,
    }
}

/// Parses model output into a devotional. A markdown code fence or chatter
/// around the JSON object is tolerated.
pub fn parse(text: &str) -> Result<GeneratedDevotional, ParseError> {
    let json = extract_json_object(text);
    let raw: RawDevotional =
        serde_json::from_str(json).map_err(|e| ParseError::Json(e.to_string()))?;

    let field = |name: &'static str, value: String| -> Result<String, ParseError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ParseError::MissingField(name));
        }
        Ok(trimmed.to_string())
    };

    let pillar_text = field("proof_pillar", raw.proof_pillar)?;
    let proof_pillar = ProofPillar::parse_loose(&pillar_text)
        .map_err(|_| ParseError::UnknownPillar(pillar_text.clone()))?;

    Ok(GeneratedDevotional {
        title: field("title", raw.title)?,
        scripture_reference: field("scripture_reference", raw.scripture_reference)?,
        scripture_text: field("scripture_text", raw.scripture_text)?,
        reflection: field("reflection", raw.reflection)?,
        prayer: field("prayer", raw.prayer)?,
        application: field("application", raw.application)?,
        proof_pillar,
    })
}

fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "title": "Called Before the Letters",
        "scripture_reference": "Jeremiah 1:5",
        "scripture_text": "Before I formed you in the womb I knew you...",
        "reflection": "Your identity was settled before crossing.",
        "prayer": "Father, remind me whose I am.",
        "application": "Write down one calling you sense this week.",
        "proof_pillar": "Purpose"
    }"#;

    #[test]
    fn parses_plain_json() {
        let d = parse(VALID).unwrap();
        assert_eq!(d.scripture_reference, "Jeremiah 1:5");
        assert_eq!(d.proof_pillar, ProofPillar::Purpose);
    }

    #[test]
    fn tolerates_code_fence() {
        let fenced = format!("Here you go:\n```json\n{}\n```", VALID);
        assert_eq!(parse(&fenced).unwrap(), parse(VALID).unwrap());
    }

    #[test]
    fn blank_field_is_rejected() {
        let text = VALID.replace("\"Father, remind me whose I am.\"", "\"  \"");
        assert_eq!(parse(&text).unwrap_err(), ParseError::MissingField("prayer"));
    }

    #[test]
    fn unknown_pillar_is_rejected() {
        let text = VALID.replace("\"Purpose\"", "\"Courage\"");
        assert_eq!(parse(&text).unwrap_err(), ParseError::UnknownPillar("Courage".into()));
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(parse("I cannot help with that."), Err(ParseError::Json(_))));
    }

    #[test]
    fn request_names_date_and_pillar() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        let request = build_request(date, "m", 0.8);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        let prompt = &request.messages[1].content;
        assert!(prompt.contains("July 4, 2025"));
        assert!(prompt.contains(ProofPillar::for_date(date).as_str()));
    }
}
