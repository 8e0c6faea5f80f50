use anyhow::Result;
use chrono::NaiveDate;

use crate::Database;

/// Inclusive calendar-date window over `created_at`.
#[derive(Debug, Clone, Copy)]
pub struct EventRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl EventRange {
    fn bounds(&self) -> [String; 2] {
        [
            self.from.format("%Y-%m-%d").to_string(),
            self.to.format("%Y-%m-%d").to_string(),
        ]
    }
}

impl Database {
    pub fn insert_event(
        &self,
        id: &str,
        user_id: Option<&str>,
        event_type: &str,
        page: Option<&str>,
        metadata: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO analytics_events (id, user_id, event_type, page, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, user_id, event_type, page, metadata],
            )?;
            Ok(())
        })
    }

    /// Event counts grouped by type, most frequent first.
    pub fn event_counts_by_type(&self, range: EventRange) -> Result<Vec<(String, u64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT event_type, COUNT(*) AS n FROM analytics_events
                 WHERE date(created_at) BETWEEN ?1 AND ?2
                 GROUP BY event_type
                 ORDER BY n DESC, event_type",
            )?;
            let rows = stmt
                .query_map(range.bounds(), |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Event counts per calendar day (`YYYY-MM-DD`), days without events omitted.
    pub fn event_counts_by_day(&self, range: EventRange) -> Result<Vec<(String, u64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT date(created_at) AS day, COUNT(*) FROM analytics_events
                 WHERE date(created_at) BETWEEN ?1 AND ?2
                 GROUP BY day
                 ORDER BY day",
            )?;
            let rows = stmt
                .query_map(range.bounds(), |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn distinct_event_users(&self, range: EventRange) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT user_id) FROM analytics_events
                 WHERE user_id IS NOT NULL AND date(created_at) BETWEEN ?1 AND ?2",
                range.bounds(),
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    pub fn count_users(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::EventRange;
    use crate::queries::test_support;

    fn insert_at(db: &crate::Database, id: &str, user: Option<&str>, kind: &str, at: &str) {
        db.insert_event(id, user, kind, Some("/devotionals"), None).unwrap();
        db.with_conn(|conn| {
            conn.execute("UPDATE analytics_events SET created_at = ?2 WHERE id = ?1", [id, at])?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn summaries_respect_the_range() {
        let db = test_support::db();
        insert_at(&db, "e1", Some("u1"), "page_view", "2025-05-01 10:00:00");
        insert_at(&db, "e2", Some("u1"), "page_view", "2025-05-01 11:00:00");
        insert_at(&db, "e3", Some("u2"), "prayer_created", "2025-05-02 09:00:00");
        insert_at(&db, "e4", None, "page_view", "2025-05-02 12:00:00");
        insert_at(&db, "e5", Some("u3"), "page_view", "2025-06-01 12:00:00");

        let range = EventRange {
            from: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
        };

        assert_eq!(
            db.event_counts_by_type(range).unwrap(),
            vec![("page_view".to_string(), 3), ("prayer_created".to_string(), 1)]
        );
        assert_eq!(
            db.event_counts_by_day(range).unwrap(),
            vec![("2025-05-01".to_string(), 2), ("2025-05-02".to_string(), 2)]
        );
        assert_eq!(db.distinct_event_users(range).unwrap(), 2);
    }
}
