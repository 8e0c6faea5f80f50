use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                display_name    TEXT NOT NULL,
                password        TEXT NOT NULL,
                organization    TEXT,
                role            TEXT NOT NULL DEFAULT 'member'
                                CHECK (role IN ('member', 'admin')),
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE devotionals (
                id                  TEXT PRIMARY KEY,
                date                TEXT NOT NULL UNIQUE,
                title               TEXT NOT NULL,
                scripture_reference TEXT NOT NULL,
                scripture_text      TEXT NOT NULL,
                reflection          TEXT NOT NULL,
                prayer              TEXT NOT NULL,
                application         TEXT NOT NULL,
                proof_pillar        TEXT NOT NULL,
                created_at          TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE prayers (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title           TEXT NOT NULL,
                content         TEXT NOT NULL,
                category        TEXT,
                status          TEXT NOT NULL DEFAULT 'active'
                                CHECK (status IN ('active', 'answered')),
                answered_note   TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_prayers_user ON prayers(user_id, created_at);

            CREATE TABLE beta_testers (
                id              TEXT PRIMARY KEY,
                email           TEXT NOT NULL UNIQUE,
                name            TEXT NOT NULL,
                organization    TEXT,
                referral_code   TEXT,
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'approved', 'declined')),
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE gifted_subscriptions (
                id              TEXT PRIMARY KEY,
                recipient_email TEXT NOT NULL,
                gifted_by       TEXT REFERENCES users(id) ON DELETE SET NULL,
                months          INTEGER NOT NULL CHECK (months > 0),
                message         TEXT,
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'redeemed', 'revoked')),
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                redeemed_at     TEXT
            );

            CREATE TABLE healing_stories (
                id              TEXT PRIMARY KEY,
                user_id         TEXT REFERENCES users(id) ON DELETE SET NULL,
                title           TEXT NOT NULL,
                story           TEXT NOT NULL,
                anonymous       INTEGER NOT NULL DEFAULT 0,
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'approved', 'rejected')),
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                reviewed_at     TEXT
            );

            CREATE TABLE video_suggestions (
                id              TEXT PRIMARY KEY,
                user_id         TEXT REFERENCES users(id) ON DELETE SET NULL,
                email           TEXT NOT NULL,
                title           TEXT NOT NULL,
                url             TEXT NOT NULL,
                reason          TEXT,
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'approved', 'rejected')),
                admin_notes     TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                reviewed_at     TEXT
            );

            CREATE TABLE referrals (
                id              TEXT PRIMARY KEY,
                referrer_id     TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                code            TEXT NOT NULL UNIQUE,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE referral_rewards (
                id              TEXT PRIMARY KEY,
                referral_id     TEXT NOT NULL REFERENCES referrals(id) ON DELETE CASCADE,
                referred_email  TEXT NOT NULL,
                reward          TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(referral_id, referred_email)
            );

            CREATE TABLE analytics_events (
                id              TEXT PRIMARY KEY,
                user_id         TEXT,
                event_type      TEXT NOT NULL,
                page            TEXT,
                metadata        TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_analytics_created ON analytics_events(created_at);

            CREATE TABLE user_preferences (
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                key             TEXT NOT NULL,
                value           INTEGER NOT NULL,
                updated_at      TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, key)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
