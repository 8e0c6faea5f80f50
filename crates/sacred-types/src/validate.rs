//! Request validation.
//!
//! Every write request is validated before any database access; a failed
//! check short-circuits the handler with `400 Bad Request`.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

pub fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(())
}

pub fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max),
        ));
    }
    Ok(())
}

pub fn email(field: &'static str, value: &str) -> Result<(), ValidationError> {
    required(field, value)?;
    max_len(field, value, 254)?;

    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::new(field, "is not a valid email address"));
    }
    Ok(())
}

pub fn http_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    required(field, value)?;
    max_len(field, value, 2048)?;
    let value = value.trim();
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        return Err(ValidationError::new(field, "must be an http(s) URL"));
    }
    Ok(())
}

/// Normalized form used for storage and comparison.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// Empty or whitespace-only optional text is stored as NULL.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_required() {
        assert!(required("title", "").is_err());
        assert!(required("title", "   \n").is_err());
        assert!(required("title", "Morning").is_ok());
    }

    #[test]
    fn email_shapes() {
        assert!(email("email", "soror@example.org").is_ok());
        assert!(email("email", " Frat@Example.com ").is_ok());
        assert!(email("email", "no-at-sign").is_err());
        assert!(email("email", "a@b").is_err());
        assert!(email("email", "a@@b.com").is_err());
        assert!(email("email", "a b@c.com").is_err());
        assert!(email("email", "").is_err());
    }

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" Alpha ")), Some("Alpha".to_string()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn error_display_names_field() {
        let err = required("content", "").unwrap_err();
        assert_eq!(err.to_string(), "content: is required");
    }
}
