use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::{DevotionalRow, NewDevotional};

const DEVOTIONAL_COLUMNS: &str = "id, date, title, scripture_reference, scripture_text, reflection, \
     prayer, application, proof_pillar, created_at";

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl Database {
    pub fn devotional_exists(&self, date: NaiveDate) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM devotionals WHERE date = ?1", [date_key(date)], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Inserts a devotional unless one already exists for its date.
    /// Returns `false` when the date was already taken; the existing row is
    /// left untouched.
    pub fn insert_devotional_if_absent(&self, new: &NewDevotional<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO devotionals
                    (id, date, title, scripture_reference, scripture_text, reflection,
                     prayer, application, proof_pillar)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(date) DO NOTHING",
                rusqlite::params![
                    new.id,
                    date_key(new.date),
                    new.title,
                    new.scripture_reference,
                    new.scripture_text,
                    new.reflection,
                    new.prayer,
                    new.application,
                    new.proof_pillar,
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_devotional_by_date(&self, date: NaiveDate) -> Result<Option<DevotionalRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM devotionals WHERE date = ?1", DEVOTIONAL_COLUMNS);
            Ok(conn.query_row(&sql, [date_key(date)], map_devotional).optional()?)
        })
    }

    /// Devotionals with `from <= date <= to`, oldest first.
    pub fn list_devotionals(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DevotionalRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM devotionals WHERE date BETWEEN ?1 AND ?2 ORDER BY date",
                DEVOTIONAL_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([date_key(from), date_key(to)], map_devotional)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_devotionals(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM devotionals", [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }
}

fn map_devotional(row: &Row<'_>) -> rusqlite::Result<DevotionalRow> {
    Ok(DevotionalRow {
        id: row.get(0)?,
        date: row.get(1)?,
        title: row.get(2)?,
        scripture_reference: row.get(3)?,
        scripture_text: row.get(4)?,
        reflection: row.get(5)?,
        prayer: row.get(6)?,
        application: row.get(7)?,
        proof_pillar: row.get(8)?,
        created_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::models::NewDevotional;
    use crate::queries::test_support;

    fn sample<'a>(id: &'a str, date: NaiveDate, title: &'a str) -> NewDevotional<'a> {
        NewDevotional {
            id,
            date,
            title,
            scripture_reference: "Micah 6:8",
            scripture_text: "Do justly, love mercy, walk humbly.",
            reflection: "Service is the heart of the oath.",
            prayer: "Lord, make me faithful.",
            application: "Call a line brother today.",
            proof_pillar: "purpose",
        }
    }

    #[test]
    fn existing_date_is_never_overwritten() {
        let db = test_support::db();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        assert!(db.insert_devotional_if_absent(&sample("d1", date, "First")).unwrap());
        assert!(!db.insert_devotional_if_absent(&sample("d2", date, "Second")).unwrap());

        let row = db.get_devotional_by_date(date).unwrap().unwrap();
        assert_eq!(row.id, "d1");
        assert_eq!(row.title, "First");
        assert_eq!(db.count_devotionals().unwrap(), 1);
        assert!(db.devotional_exists(date).unwrap());
    }

    #[test]
    fn range_listing_is_inclusive_and_ordered() {
        let db = test_support::db();
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        for (i, day) in [3, 1, 2, 5].into_iter().enumerate() {
            let id = format!("d{}", i);
            db.insert_devotional_if_absent(&sample(&id, d(day), "T")).unwrap();
        }

        let dates: Vec<String> = db
            .list_devotionals(d(1), d(3))
            .unwrap()
            .into_iter()
            .map(|r| r.date)
            .collect();
        assert_eq!(dates, vec!["2025-06-01", "2025-06-02", "2025-06-03"]);
    }
}
