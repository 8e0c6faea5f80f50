//! Query methods on [`crate::Database`], grouped by table.

mod analytics;
mod community;
mod devotionals;
mod preferences;
mod prayers;
mod referrals;
mod users;

pub use analytics::EventRange;
pub use referrals::RedeemOutcome;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::Database;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, email: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.create_user(&id, email, "Test Member", "hash", None, sacred_types::models::Role::Member)
            .unwrap();
        id
    }
}
