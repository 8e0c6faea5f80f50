use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::admin::require_admin;
use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{analytics, auth, beta, community, devotionals, generate, gifts, preferences, prayers, referrals};

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/devotionals", get(devotionals::list))
        .route("/devotionals/today", get(devotionals::today))
        .route("/devotionals/{date}", get(devotionals::by_date))
        .route("/beta/signup", post(beta::signup))
        .route("/referrals/redeem", post(referrals::redeem))
        .route("/stories", get(community::approved_stories).post(community::submit_story))
        .route("/analytics/events", post(analytics::record_event));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/auth/me", get(auth::me))
        .route("/prayers", get(prayers::list).post(prayers::create))
        .route("/prayers/export", get(prayers::export))
        .route("/prayers/{id}", put(prayers::update).delete(prayers::delete))
        .route("/prayers/{id}/answered", post(prayers::mark_answered))
        .route("/referrals", post(referrals::get_or_create_code))
        .route("/referrals/stats", get(referrals::stats))
        .route("/suggestions", post(community::submit_suggestion))
        .route("/gifts/{id}/redeem", post(gifts::redeem))
        .route("/preferences", get(preferences::list))
        .route("/preferences/{key}", put(preferences::set))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/admin/devotionals/generate", post(generate::generate_devotionals))
        .route("/admin/beta", get(beta::list))
        .route("/admin/beta/{id}/review", post(beta::review))
        .route("/admin/stories", get(community::list_stories))
        .route("/admin/stories/{id}/review", post(community::review_story))
        .route("/admin/suggestions", get(community::list_suggestions))
        .route("/admin/suggestions/{id}/review", post(community::review_suggestion))
        .route("/admin/gifts", get(gifts::list).post(gifts::create))
        .route("/admin/gifts/{id}/revoke", post(gifts::revoke))
        .route("/admin/analytics/summary", get(analytics::summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
