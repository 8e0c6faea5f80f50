use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Database;
use crate::models::{BetaTesterRow, GiftRow, StoryRow, SuggestionRow};

const BETA_COLUMNS: &str = "id, email, name, organization, referral_code, status, created_at";
const STORY_COLUMNS: &str = "id, user_id, title, story, anonymous, status, created_at, reviewed_at";
const SUGGESTION_COLUMNS: &str =
    "id, user_id, email, title, url, reason, status, admin_notes, created_at, reviewed_at";
const GIFT_COLUMNS: &str =
    "id, recipient_email, gifted_by, months, message, status, created_at, redeemed_at";

impl Database {
    // -- Beta testers --

    /// Returns `false` if the email is already on the waitlist.
    pub fn insert_beta_tester(
        &self,
        id: &str,
        email: &str,
        name: &str,
        organization: Option<&str>,
        referral_code: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO beta_testers (id, email, name, organization, referral_code)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(email) DO NOTHING",
                rusqlite::params![id, email, name, organization, referral_code],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn list_beta_testers(&self, status: Option<&str>) -> Result<Vec<BetaTesterRow>> {
        self.with_conn(|conn| list_filtered(conn, "beta_testers", BETA_COLUMNS, status, map_beta))
    }

    pub fn set_beta_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("UPDATE beta_testers SET status = ?2 WHERE id = ?1", [id, status])?;
            Ok(changed == 1)
        })
    }

    pub fn count_beta_testers(&self) -> Result<u64> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM beta_testers"))
    }

    // -- Healing stories --

    pub fn insert_story(
        &self,
        id: &str,
        user_id: Option<&str>,
        title: &str,
        story: &str,
        anonymous: bool,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO healing_stories (id, user_id, title, story, anonymous)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, user_id, title, story, anonymous],
            )?;
            Ok(())
        })
    }

    pub fn list_stories(&self, status: Option<&str>) -> Result<Vec<StoryRow>> {
        self.with_conn(|conn| list_filtered(conn, "healing_stories", STORY_COLUMNS, status, map_story))
    }

    pub fn review_story(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE healing_stories SET status = ?2, reviewed_at = datetime('now') WHERE id = ?1",
                [id, status],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn count_stories_with_status(&self, status: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM healing_stories WHERE status = ?1",
                [status],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    // -- Video suggestions --

    pub fn insert_suggestion(
        &self,
        id: &str,
        user_id: Option<&str>,
        email: &str,
        title: &str,
        url: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO video_suggestions (id, user_id, email, title, url, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, user_id, email, title, url, reason],
            )?;
            Ok(())
        })
    }

    pub fn list_suggestions(&self, status: Option<&str>) -> Result<Vec<SuggestionRow>> {
        self.with_conn(|conn| {
            list_filtered(conn, "video_suggestions", SUGGESTION_COLUMNS, status, map_suggestion)
        })
    }

    /// Records a moderation decision and returns the updated row, or `None`
    /// for an unknown id.
    pub fn review_suggestion(
        &self,
        id: &str,
        status: &str,
        admin_notes: Option<&str>,
    ) -> Result<Option<SuggestionRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE video_suggestions
                 SET status = ?2, admin_notes = ?3, reviewed_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![id, status, admin_notes],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let sql = format!("SELECT {} FROM video_suggestions WHERE id = ?1", SUGGESTION_COLUMNS);
            Ok(conn.query_row(&sql, [id], map_suggestion).optional()?)
        })
    }

    pub fn count_suggestions_with_status(&self, status: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM video_suggestions WHERE status = ?1",
                [status],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    // -- Gifted subscriptions --

    pub fn insert_gift(
        &self,
        id: &str,
        recipient_email: &str,
        gifted_by: Option<&str>,
        months: u32,
        message: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO gifted_subscriptions (id, recipient_email, gifted_by, months, message)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, recipient_email, gifted_by, months, message],
            )?;
            Ok(())
        })
    }

    pub fn list_gifts(&self) -> Result<Vec<GiftRow>> {
        self.with_conn(|conn| list_filtered(conn, "gifted_subscriptions", GIFT_COLUMNS, None, map_gift))
    }

    pub fn get_gift(&self, id: &str) -> Result<Option<GiftRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM gifted_subscriptions WHERE id = ?1", GIFT_COLUMNS);
            Ok(conn.query_row(&sql, [id], map_gift).optional()?)
        })
    }

    /// Only pending gifts can be revoked.
    pub fn revoke_gift(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE gifted_subscriptions SET status = 'revoked' WHERE id = ?1 AND status = 'pending'",
                [id],
            )?;
            Ok(changed == 1)
        })
    }

    /// Marks a pending gift redeemed if `email` is its recipient.
    pub fn redeem_gift(&self, id: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE gifted_subscriptions
                 SET status = 'redeemed', redeemed_at = datetime('now')
                 WHERE id = ?1 AND recipient_email = ?2 AND status = 'pending'",
                [id, email],
            )?;
            Ok(changed == 1)
        })
    }
}

fn count(conn: &Connection, sql: &str) -> Result<u64> {
    let n: i64 = conn.query_row(sql, [], |r| r.get(0))?;
    Ok(n as u64)
}

/// Newest-first listing with an optional `status = ?` filter.
fn list_filtered<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    status: Option<&str>,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let rows = match status {
        Some(status) => {
            let sql = format!(
                "SELECT {} FROM {} WHERE status = ?1 ORDER BY created_at DESC, rowid DESC",
                columns, table
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([status], map)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let sql = format!("SELECT {} FROM {} ORDER BY created_at DESC, rowid DESC", columns, table);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

fn map_beta(row: &Row<'_>) -> rusqlite::Result<BetaTesterRow> {
    Ok(BetaTesterRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        organization: row.get(3)?,
        referral_code: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_story(row: &Row<'_>) -> rusqlite::Result<StoryRow> {
    Ok(StoryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        story: row.get(3)?,
        anonymous: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        reviewed_at: row.get(7)?,
    })
}

fn map_suggestion(row: &Row<'_>) -> rusqlite::Result<SuggestionRow> {
    Ok(SuggestionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        title: row.get(3)?,
        url: row.get(4)?,
        reason: row.get(5)?,
        status: row.get(6)?,
        admin_notes: row.get(7)?,
        created_at: row.get(8)?,
        reviewed_at: row.get(9)?,
    })
}

fn map_gift(row: &Row<'_>) -> rusqlite::Result<GiftRow> {
    Ok(GiftRow {
        id: row.get(0)?,
        recipient_email: row.get(1)?,
        gifted_by: row.get(2)?,
        months: row.get(3)?,
        message: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        redeemed_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::queries::test_support;

    #[test]
    fn beta_waitlist_rejects_duplicate_email() {
        let db = test_support::db();
        assert!(db.insert_beta_tester("b1", "a@b.org", "Ada", None, None).unwrap());
        assert!(!db.insert_beta_tester("b2", "a@b.org", "Ada", None, None).unwrap());
        assert_eq!(db.count_beta_testers().unwrap(), 1);
    }

    #[test]
    fn status_filter_narrows_listing() {
        let db = test_support::db();
        db.insert_story("s1", None, "One", "Story one", false).unwrap();
        db.insert_story("s2", None, "Two", "Story two", true).unwrap();
        assert!(db.review_story("s1", "approved").unwrap());
        assert!(!db.review_story("missing", "approved").unwrap());

        let approved = db.list_stories(Some("approved")).unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id, "s1");
        assert!(approved[0].reviewed_at.is_some());
        assert_eq!(db.list_stories(None).unwrap().len(), 2);
        assert_eq!(db.count_stories_with_status("pending").unwrap(), 1);
    }

    #[test]
    fn review_suggestion_returns_updated_row() {
        let db = test_support::db();
        db.insert_suggestion("v1", None, "a@b.org", "Sermon", "https://v.example/1", None)
            .unwrap();

        let row = db.review_suggestion("v1", "rejected", Some("Off topic")).unwrap().unwrap();
        assert_eq!(row.status, "rejected");
        assert_eq!(row.admin_notes.as_deref(), Some("Off topic"));
        assert!(db.review_suggestion("nope", "approved", None).unwrap().is_none());
    }

    #[test]
    fn gift_redemption_requires_recipient_and_pending() {
        let db = test_support::db();
        db.insert_gift("g1", "gift@b.org", None, 3, Some("Welcome")).unwrap();

        assert!(!db.redeem_gift("g1", "someone@else.org").unwrap());
        assert!(db.redeem_gift("g1", "gift@b.org").unwrap());
        assert!(!db.redeem_gift("g1", "gift@b.org").unwrap());
        assert!(!db.revoke_gift("g1").unwrap());

        let row = db.get_gift("g1").unwrap().unwrap();
        assert_eq!(row.status, "redeemed");
        assert!(row.redeemed_at.is_some());
    }
}
