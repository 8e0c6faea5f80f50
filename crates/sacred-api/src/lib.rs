pub mod admin;
pub mod analytics;
pub mod auth;
pub mod beta;
pub mod community;
pub mod devotionals;
pub mod error;
pub mod generate;
pub mod gifts;
pub mod middleware;
pub mod prayers;
pub mod preferences;
pub mod referrals;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::{AppState, AppStateInner};
