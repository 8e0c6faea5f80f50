use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::PrayerRow;

const PRAYER_COLUMNS: &str =
    "id, user_id, title, content, category, status, answered_note, created_at, updated_at";

// All prayer queries are scoped to the owning user; a prayer id belonging to
// someone else behaves exactly like a missing one.
impl Database {
    pub fn insert_prayer(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        content: &str,
        category: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO prayers (id, user_id, title, content, category) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, user_id, title, content, category],
            )?;
            Ok(())
        })
    }

    /// The user's journal, newest first.
    pub fn list_prayers(&self, user_id: &str) -> Result<Vec<PrayerRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM prayers WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
                PRAYER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_prayer)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_prayer(&self, id: &str, user_id: &str) -> Result<Option<PrayerRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM prayers WHERE id = ?1 AND user_id = ?2", PRAYER_COLUMNS);
            Ok(conn.query_row(&sql, [id, user_id], map_prayer).optional()?)
        })
    }

    pub fn update_prayer(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        content: &str,
        category: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE prayers
                 SET title = ?3, content = ?4, category = ?5, updated_at = datetime('now')
                 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id, title, content, category],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn mark_prayer_answered(&self, id: &str, user_id: &str, note: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE prayers
                 SET status = 'answered', answered_note = ?3, updated_at = datetime('now')
                 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id, note],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn delete_prayer(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("DELETE FROM prayers WHERE id = ?1 AND user_id = ?2", [id, user_id])?;
            Ok(changed == 1)
        })
    }

    pub fn count_prayers(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM prayers", [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }
}

fn map_prayer(row: &Row<'_>) -> rusqlite::Result<PrayerRow> {
    Ok(PrayerRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        category: row.get(4)?,
        status: row.get(5)?,
        answered_note: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::queries::test_support;

    #[test]
    fn prayers_are_private_to_their_owner() {
        let db = test_support::db();
        let owner = test_support::user(&db, "owner@chapter.org");
        let other = test_support::user(&db, "other@chapter.org");

        db.insert_prayer("p1", &owner, "Exams", "Peace during finals", Some("school")).unwrap();

        assert!(db.get_prayer("p1", &other).unwrap().is_none());
        assert!(!db.update_prayer("p1", &other, "x", "y", None).unwrap());
        assert!(!db.delete_prayer("p1", &other).unwrap());
        assert!(db.list_prayers(&other).unwrap().is_empty());

        assert!(db.get_prayer("p1", &owner).unwrap().is_some());
    }

    #[test]
    fn answered_prayer_keeps_note() {
        let db = test_support::db();
        let owner = test_support::user(&db, "owner@chapter.org");
        db.insert_prayer("p1", &owner, "Job", "An offer", None).unwrap();

        assert!(db.mark_prayer_answered("p1", &owner, Some("Started Monday")).unwrap());
        let row = db.get_prayer("p1", &owner).unwrap().unwrap();
        assert_eq!(row.status, "answered");
        assert_eq!(row.answered_note.as_deref(), Some("Started Monday"));
    }

    #[test]
    fn listing_is_newest_first() {
        let db = test_support::db();
        let owner = test_support::user(&db, "owner@chapter.org");
        for id in ["p1", "p2", "p3"] {
            db.insert_prayer(id, &owner, id, "body", None).unwrap();
        }
        let ids: Vec<String> = db.list_prayers(&owner).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["p3", "p2", "p1"]);
    }
}
