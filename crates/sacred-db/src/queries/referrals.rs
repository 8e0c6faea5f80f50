use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::ReferralRow;

/// Result of trying to redeem a referral code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// No referral has this code; nothing was written.
    UnknownCode,
    /// The referrer tried to redeem their own code.
    SelfReferral,
    /// This email already redeemed this code.
    AlreadyRedeemed,
    Redeemed { referral_id: String },
}

impl Database {
    pub fn get_referral_for_user(&self, user_id: &str) -> Result<Option<ReferralRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, referrer_id, code, created_at FROM referrals WHERE referrer_id = ?1",
                    [user_id],
                    map_referral,
                )
                .optional()?)
        })
    }

    pub fn find_referral_by_code(&self, code: &str) -> Result<Option<ReferralRow>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, referrer_id, code, created_at FROM referrals WHERE code = ?1",
                    [code],
                    map_referral,
                )
                .optional()?)
        })
    }

    /// Returns `false` if the code is taken or the user already has a code.
    pub fn create_referral(&self, id: &str, user_id: &str, code: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO referrals (id, referrer_id, code) VALUES (?1, ?2, ?3)
                 ON CONFLICT DO NOTHING",
                [id, user_id, code],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Looks up `code` and records a reward for `email`. The lookup and the
    /// insert share one transaction, so an unknown code never leaves a
    /// reward row behind.
    pub fn redeem_referral(
        &self,
        reward_id: &str,
        code: &str,
        email: &str,
        reward: &str,
    ) -> Result<RedeemOutcome> {
        self.with_tx(|tx| {
            let referral: Option<(String, Option<String>)> = tx
                .query_row(
                    "SELECT r.id, u.email FROM referrals r
                     LEFT JOIN users u ON u.id = r.referrer_id
                     WHERE r.code = ?1",
                    [code],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((referral_id, referrer_email)) = referral else {
                return Ok(RedeemOutcome::UnknownCode);
            };

            if referrer_email.as_deref() == Some(email) {
                return Ok(RedeemOutcome::SelfReferral);
            }

            let inserted = tx.execute(
                "INSERT INTO referral_rewards (id, referral_id, referred_email, reward)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(referral_id, referred_email) DO NOTHING",
                [reward_id, referral_id.as_str(), email, reward],
            )?;

            if inserted == 0 {
                return Ok(RedeemOutcome::AlreadyRedeemed);
            }
            Ok(RedeemOutcome::Redeemed { referral_id })
        })
    }

    pub fn count_rewards_for_user(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM referral_rewards rr
                 JOIN referrals r ON r.id = rr.referral_id
                 WHERE r.referrer_id = ?1",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    pub fn count_referral_rewards(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM referral_rewards", [], |r| r.get(0))?;
            Ok(n as u64)
        })
    }
}

fn map_referral(row: &Row<'_>) -> rusqlite::Result<ReferralRow> {
    Ok(ReferralRow {
        id: row.get(0)?,
        referrer_id: row.get(1)?,
        code: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::RedeemOutcome;
    use crate::queries::test_support;

    #[test]
    fn unknown_code_writes_no_reward() {
        let db = test_support::db();
        let outcome = db.redeem_referral("r1", "NOPE1234", "new@b.org", "free_month").unwrap();
        assert_eq!(outcome, RedeemOutcome::UnknownCode);
        assert_eq!(db.count_referral_rewards().unwrap(), 0);
    }

    #[test]
    fn code_redeems_once_per_email() {
        let db = test_support::db();
        let referrer = test_support::user(&db, "sponsor@chapter.org");
        assert!(db.create_referral("ref1", &referrer, "ABCD2345").unwrap());

        let first = db.redeem_referral("r1", "ABCD2345", "new@b.org", "free_month").unwrap();
        assert_eq!(first, RedeemOutcome::Redeemed { referral_id: "ref1".into() });

        let again = db.redeem_referral("r2", "ABCD2345", "new@b.org", "free_month").unwrap();
        assert_eq!(again, RedeemOutcome::AlreadyRedeemed);

        let own = db
            .redeem_referral("r3", "ABCD2345", "sponsor@chapter.org", "free_month")
            .unwrap();
        assert_eq!(own, RedeemOutcome::SelfReferral);

        assert_eq!(db.count_rewards_for_user(&referrer).unwrap(), 1);
    }

    #[test]
    fn one_code_per_user_and_codes_are_unique() {
        let db = test_support::db();
        let a = test_support::user(&db, "a@chapter.org");
        let b = test_support::user(&db, "b@chapter.org");

        assert!(db.create_referral("ref1", &a, "AAAA2222").unwrap());
        assert!(!db.create_referral("ref2", &a, "BBBB3333").unwrap());
        assert!(!db.create_referral("ref3", &b, "AAAA2222").unwrap());
        assert_eq!(db.get_referral_for_user(&a).unwrap().unwrap().code, "AAAA2222");
        assert!(db.find_referral_by_code("BBBB3333").unwrap().is_none());
    }
}
