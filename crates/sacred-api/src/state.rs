use std::sync::Arc;

use sacred_db::Database;
use sacred_notify::Notifier;

use crate::error::ApiError;
use crate::generate::DevotionalGenerator;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    /// Shared secret accepted in `x-admin-secret`; `None` disables the check.
    pub admin_secret: Option<String>,
    /// Accounts registering with one of these emails become admins.
    pub admin_emails: Vec<String>,
    pub notifier: Notifier,
    /// `None` when no completion endpoint is configured.
    pub generator: Option<DevotionalGenerator>,
}

/// Runs blocking SQLite work off the async runtime.
pub async fn db_task<F, T>(db: Arc<Database>, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
}

/// [`db_task`] for handlers: failures become `500` responses.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    db_task(state.db.clone(), f).await.map_err(ApiError::Internal)
}
