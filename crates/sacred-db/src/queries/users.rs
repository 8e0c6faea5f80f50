use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use sacred_types::models::Role;

use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str = "id, email, display_name, password, organization, role, created_at";

impl Database {
    /// Inserts a user. Returns `false` if the email is already registered.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        display_name: &str,
        password_hash: &str,
        organization: Option<&str>,
        role: Role,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, display_name, password, organization, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(email) DO NOTHING",
                rusqlite::params![id, email, display_name, password_hash, organization, role.as_str()],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Current role of a user, `None` if the user does not exist.
    pub fn get_user_role(&self, id: &str) -> Result<Option<Role>> {
        let role: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT role FROM users WHERE id = ?1", [id], |row| row.get(0))
                .optional()?)
        })?;
        Ok(role.map(|r| r.parse::<Role>()).transpose()?)
    }

    /// Grants the admin role to every existing account in `emails`.
    /// Returns the number of accounts changed.
    pub fn promote_admins(&self, emails: &[String]) -> Result<usize> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("UPDATE users SET role = 'admin' WHERE email = ?1 AND role != 'admin'")?;
            let mut changed = 0;
            for email in emails {
                changed += stmt.execute([email])?;
            }
            Ok(changed)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let row = conn.query_row(&sql, [value], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        password: row.get(3)?,
        organization: row.get(4)?,
        role: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::queries::test_support;
    use sacred_types::models::Role;

    #[test]
    fn duplicate_email_is_not_inserted() {
        let db = test_support::db();
        assert!(db.create_user("u1", "a@b.org", "A", "h", None, Role::Member).unwrap());
        assert!(!db.create_user("u2", "a@b.org", "B", "h", None, Role::Member).unwrap());
        assert!(db.get_user_by_id("u2").unwrap().is_none());
    }

    #[test]
    fn promote_admins_only_touches_listed_accounts() {
        let db = test_support::db();
        let admin = test_support::user(&db, "dean@chapter.org");
        let member = test_support::user(&db, "neo@chapter.org");

        let changed = db
            .promote_admins(&["dean@chapter.org".to_string(), "ghost@chapter.org".to_string()])
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(db.get_user_role(&admin).unwrap(), Some(Role::Admin));
        assert_eq!(db.get_user_role(&member).unwrap(), Some(Role::Member));
        assert_eq!(db.get_user_role("missing").unwrap(), None);
    }
}
