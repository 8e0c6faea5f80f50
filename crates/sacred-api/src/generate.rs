//! Devotional batch generation.
//!
//! Fills one devotional per calendar date from the AI completion service.
//! Dates are handled in fixed-size groups: every date in a group is
//! generated concurrently, and the generator sleeps a fixed delay between
//! groups to stay under the provider's rate limits. A date that already has
//! a devotional is skipped without calling the provider, and rows are only
//! ever inserted, never replaced. A failure on one date is recorded and the
//! rest of the range continues.

use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Json, extract::State};
use chrono::NaiveDate;
use futures_util::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use sacred_ai::{CompletionClient, devotional};
use sacred_db::Database;
use sacred_db::models::NewDevotional;
use sacred_types::api::{GenerateDevotionalsRequest, GenerateDevotionalsResponse, GenerationFailure};
use sacred_types::validate::Validate;

use crate::admin::AdminIdentity;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, db_task};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl GenerationSettings {
    pub fn new(model: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            temperature,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

enum DateOutcome {
    Generated,
    Skipped,
    Failed(String),
}

#[derive(Clone)]
pub struct DevotionalGenerator {
    client: Arc<dyn CompletionClient>,
    settings: GenerationSettings,
}

impl DevotionalGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Generates devotionals for `days` consecutive dates starting at `start`.
    /// The caller is responsible for bounding `days`.
    pub async fn run(&self, db: Arc<Database>, start: NaiveDate, days: u32) -> GenerateDevotionalsResponse {
        let dates: Vec<NaiveDate> = start.iter_days().take(days as usize).collect();
        let mut report = GenerateDevotionalsResponse::default();
        let batch_size = self.settings.batch_size.max(1);

        for (group_idx, group) in dates.chunks(batch_size).enumerate() {
            if group_idx > 0 && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }

            let outcomes = join_all(group.iter().map(|&date| self.generate_date(db.clone(), date))).await;

            for (&date, outcome) in group.iter().zip(outcomes) {
                match outcome {
                    DateOutcome::Generated => report.generated.push(date),
                    DateOutcome::Skipped => report.skipped.push(date),
                    DateOutcome::Failed(error) => {
                        warn!("Devotional generation failed for {}: {}", date, error);
                        report.errors.push(GenerationFailure { date, error });
                    }
                }
            }

            info!(
                "Generation group {}/{} done ({} generated, {} skipped, {} failed so far)",
                group_idx + 1,
                dates.len().div_ceil(batch_size),
                report.generated.len(),
                report.skipped.len(),
                report.errors.len()
            );
        }

        report
    }

    async fn generate_date(&self, db: Arc<Database>, date: NaiveDate) -> DateOutcome {
        match db_task(db.clone(), move |db| db.devotional_exists(date)).await {
            Ok(true) => return DateOutcome::Skipped,
            Ok(false) => {}
            Err(e) => return DateOutcome::Failed(format!("existence check failed: {:#}", e)),
        }

        let request = devotional::build_request(date, &self.settings.model, self.settings.temperature);
        let text = match self.client.complete(&request).await {
            Ok(text) => text,
            Err(e) => return DateOutcome::Failed(e.to_string()),
        };

        let content = match devotional::parse(&text) {
            Ok(content) => content,
            Err(e) => return DateOutcome::Failed(e.to_string()),
        };

        let inserted = db_task(db, move |db| {
            let id = Uuid::new_v4().to_string();
            db.insert_devotional_if_absent(&NewDevotional {
                id: &id,
                date,
                title: &content.title,
                scripture_reference: &content.scripture_reference,
                scripture_text: &content.scripture_text,
                reflection: &content.reflection,
                prayer: &content.prayer,
                application: &content.application,
                proof_pillar: content.proof_pillar.as_str(),
            })
        })
        .await;

        match inserted {
            Ok(true) => DateOutcome::Generated,
            // Another writer filled the date while we were waiting on the model.
            Ok(false) => DateOutcome::Skipped,
            Err(e) => DateOutcome::Failed(format!("insert failed: {:#}", e)),
        }
    }
}

/// POST /admin/devotionals/generate
pub async fn generate_devotionals(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Json(req): Json<GenerateDevotionalsRequest>,
) -> ApiResult<Json<GenerateDevotionalsResponse>> {
    req.validate()?;

    let generator = state
        .generator
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("AI completion is not configured".into()))?;

    info!(
        "Generating {} devotionals from {} (requested by {:?})",
        req.days, req.start_date, identity
    );

    let report = generator.run(state.db.clone(), req.start_date, req.days).await;

    info!(
        "Generation finished: {} generated, {} skipped, {} failed",
        report.generated.len(),
        report.skipped.len(),
        report.errors.len()
    );

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::future::BoxFuture;
    use sacred_ai::{CompletionError, CompletionRequest};

    use super::*;

    /// Answers with a valid devotional unless the prompt mentions one of the
    /// `fail_on` or `garbage_on` strings.
    struct ScriptedClient {
        calls: AtomicUsize,
        fail_on: Vec<String>,
        garbage_on: Vec<String>,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: Vec::new(),
                garbage_on: Vec::new(),
            }
        }
    }

    const VALID_COMPLETION: &str = r#"```json
{"title":"Faithful in Small Things","scripture_reference":"Luke 16:10",
 "scripture_text":"He who is faithful in what is least is faithful also in much.",
 "reflection":"Chapter duties are spiritual formation.","prayer":"Lord, make me faithful.",
 "application":"Finish one overdue chapter task.","proof_pillar":"Obedience"}
```"#;

    impl CompletionClient for ScriptedClient {
        fn complete<'a>(
            &'a self,
            request: &'a CompletionRequest,
        ) -> BoxFuture<'a, Result<String, CompletionError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let prompt = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();

                if self.fail_on.iter().any(|s| prompt.contains(s.as_str())) {
                    return Err(CompletionError::Api(429, "rate limited".into()));
                }
                if self.garbage_on.iter().any(|s| prompt.contains(s.as_str())) {
                    return Ok("Sorry, I can't do that.".into());
                }
                Ok(VALID_COMPLETION.to_string())
            })
        }
    }

    fn generator(client: Arc<ScriptedClient>) -> DevotionalGenerator {
        let mut settings = GenerationSettings::new("test-model", 0.7);
        settings.batch_delay = Duration::ZERO;
        DevotionalGenerator::new(client, settings)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn seed(db: &Database, date: NaiveDate, title: &str) {
        db.insert_devotional_if_absent(&NewDevotional {
            id: &Uuid::new_v4().to_string(),
            date,
            title,
            scripture_reference: "Psalm 23:1",
            scripture_text: "The Lord is my shepherd.",
            reflection: "r",
            prayer: "p",
            application: "a",
            proof_pillar: "freedom",
        })
        .unwrap();
    }

    #[tokio::test]
    async fn fills_every_missing_date() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let client = Arc::new(ScriptedClient::new());

        let report = generator(client.clone()).run(db.clone(), day(1), 12).await;

        assert_eq!(report.generated, (1..=12).map(day).collect::<Vec<_>>());
        assert!(report.skipped.is_empty());
        assert!(report.errors.is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 12);
        assert_eq!(db.count_devotionals().unwrap(), 12);
    }

    #[tokio::test]
    async fn existing_dates_are_skipped_without_calling_the_model() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        seed(&db, day(2), "Hand written");
        let client = Arc::new(ScriptedClient::new());

        let report = generator(client.clone()).run(db.clone(), day(1), 3).await;

        assert_eq!(report.generated, vec![day(1), day(3)]);
        assert_eq!(report.skipped, vec![day(2)]);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);

        let kept = db.get_devotional_by_date(day(2)).unwrap().unwrap();
        assert_eq!(kept.title, "Hand written");
    }

    #[tokio::test]
    async fn rerun_writes_nothing_new() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let client = Arc::new(ScriptedClient::new());
        let generator = generator(client.clone());

        generator.run(db.clone(), day(1), 4).await;
        let second = generator.run(db.clone(), day(1), 4).await;

        assert!(second.generated.is_empty());
        assert_eq!(second.skipped.len(), 4);
        assert_eq!(client.calls.load(Ordering::SeqCst), 4);
        assert_eq!(db.count_devotionals().unwrap(), 4);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_range() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let mut client = ScriptedClient::new();
        client.fail_on.push("March 2, 2025".into());
        client.garbage_on.push("March 4, 2025".into());
        let client = Arc::new(client);

        let report = generator(client.clone()).run(db.clone(), day(1), 6).await;

        assert_eq!(report.generated, vec![day(1), day(3), day(5), day(6)]);
        let failed: Vec<NaiveDate> = report.errors.iter().map(|e| e.date).collect();
        assert_eq!(failed, vec![day(2), day(4)]);
        assert!(report.errors[0].error.contains("429"));
        assert!(report.errors[1].error.contains("JSON"));
        assert!(db.get_devotional_by_date(day(2)).unwrap().is_none());
        assert_eq!(db.count_devotionals().unwrap(), 4);
    }

    /// Writes its own devotional for `date` before answering, as a
    /// concurrent generator run would.
    struct RacingClient {
        db: Arc<Database>,
        date: NaiveDate,
    }

    impl CompletionClient for RacingClient {
        fn complete<'a>(
            &'a self,
            _request: &'a CompletionRequest,
        ) -> BoxFuture<'a, Result<String, CompletionError>> {
            Box::pin(async move {
                seed(&self.db, self.date, "Written elsewhere");
                Ok(VALID_COMPLETION.to_string())
            })
        }
    }

    #[tokio::test]
    async fn date_filled_during_the_call_counts_as_skipped() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let client = Arc::new(RacingClient {
            db: db.clone(),
            date: day(7),
        });
        let mut settings = GenerationSettings::new("test-model", 0.7);
        settings.batch_delay = Duration::ZERO;

        let report = DevotionalGenerator::new(client, settings).run(db.clone(), day(7), 1).await;

        assert!(report.generated.is_empty());
        assert_eq!(report.skipped, vec![day(7)]);
        assert!(report.errors.is_empty());
        let kept = db.get_devotional_by_date(day(7)).unwrap().unwrap();
        assert_eq!(kept.title, "Written elsewhere");
        assert_eq!(db.count_devotionals().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn groups_are_separated_by_the_delay() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let client = Arc::new(ScriptedClient::new());
        let mut settings = GenerationSettings::new("m", 0.7);
        settings.batch_size = 2;
        settings.batch_delay = Duration::from_secs(10);
        let generator = DevotionalGenerator::new(client, settings);

        let started = tokio::time::Instant::now();
        let report = generator.run(db, day(1), 5).await;

        assert_eq!(report.generated.len(), 5);
        // 3 groups -> 2 pauses, none after the last group.
        assert_eq!(started.elapsed().as_secs(), 20);
    }
}
