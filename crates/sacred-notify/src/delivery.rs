use std::time::Duration;

use tracing::debug;

use sacred_types::events::NotificationEvent;

const DELIVERY_TIMEOUT_SECS: u64 = 15;

/// Where notifications go.
pub enum Delivery {
    /// POST each event as JSON to an email-dispatch endpoint.
    Http {
        client: reqwest::Client,
        url: String,
        token: Option<String>,
    },
    /// No endpoint configured: events are logged and dropped.
    Disabled,
}

impl Delivery {
    pub fn http(url: String, token: Option<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DELIVERY_TIMEOUT_SECS))
            .build()?;
        Ok(Self::Http { client, url, token })
    }

    pub async fn deliver(&self, event: &NotificationEvent) -> Result<(), String> {
        match self {
            Self::Http { client, url, token } => {
                let mut request = client.post(url).json(event);
                if let Some(token) = token {
                    request = request.bearer_auth(token);
                }
                let response = request.send().await.map_err(|e| e.to_string())?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(format!("endpoint returned {}: {}", status, body));
                }
                Ok(())
            }
            Self::Disabled => {
                debug!(
                    "Notifications disabled, dropping {}: {}",
                    event.kind(),
                    serde_json::to_string(event).unwrap_or_default()
                );
                Ok(())
            }
        }
    }
}
