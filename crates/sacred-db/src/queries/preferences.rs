use anyhow::Result;

use crate::Database;

impl Database {
    /// All stored preferences of a user, ordered by key.
    pub fn get_preferences(&self, user_id: &str) -> Result<Vec<(String, bool)>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT key, value FROM user_preferences WHERE user_id = ?1 ORDER BY key")?;
            let rows = stmt
                .query_map([user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_preference(&self, user_id: &str, key: &str, value: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_preferences (user_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, key)
                 DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                rusqlite::params![user_id, key, value],
            )?;
            Ok(())
        })
    }
}
