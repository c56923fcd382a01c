use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::record::{Balance, ReferralRecord, UserId};
use crate::REFERRAL_REWARD;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS referrals (
  user_id INTEGER PRIMARY KEY,
  referred_by INTEGER,
  referral_count INTEGER DEFAULT 0,
  fluff_balance INTEGER DEFAULT 0
);
"#;

/// Referral registry backed by a single SQLite table.
///
/// Every operation runs as one statement or one short transaction on the
/// owned connection. Calls block, so async callers should go through
/// `spawn_blocking`.
pub struct ReferralStore {
    conn: Mutex<Connection>,
}

impl ReferralStore {
    /// Opens (or creates) the database file and makes sure the table exists.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(ReferralStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Statements are atomic on their own, a panic elsewhere leaves nothing half-written.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a row for `user_id` unless one exists. Returns true if a row was created.
    ///
    /// An existing row is left untouched, `referred_by` included.
    pub fn ensure_user(
        &self,
        user_id: UserId,
        referred_by: Option<UserId>,
    ) -> rusqlite::Result<bool> {
        insert_user(&self.lock(), user_id, referred_by)
    }

    /// Adds one referral and [`REFERRAL_REWARD`] Fluffcoins to `user_id`.
    ///
    /// Returns false, without error, when the user has no row.
    pub fn credit_referrer(&self, user_id: UserId) -> rusqlite::Result<bool> {
        credit(&self.lock(), user_id)
    }

    pub fn get_balance(&self, user_id: UserId) -> rusqlite::Result<Option<Balance>> {
        Ok(self.get_record(user_id)?.map(Balance::from))
    }

    pub fn get_record(&self, user_id: UserId) -> rusqlite::Result<Option<ReferralRecord>> {
        self.lock()
            .query_row(
                "SELECT user_id, referred_by, referral_count, fluff_balance \
                 FROM referrals WHERE user_id = ?1",
                params![user_id],
                record_from_row,
            )
            .optional()
    }

    pub fn reset_balance(&self, user_id: UserId) -> rusqlite::Result<()> {
        self.lock().execute(
            "UPDATE referrals SET fluff_balance = 0 WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }

    /// Registers `user_id` as referred by `referrer` and credits the referrer,
    /// both in one transaction. Returns true if the referrer was credited.
    ///
    /// Only a newly created row earns a credit, so resending a referral link
    /// does nothing. A user cannot refer themselves.
    pub fn register_referral(&self, user_id: UserId, referrer: UserId) -> rusqlite::Result<bool> {
        let mut conn = self.lock();
        if referrer == user_id {
            insert_user(&conn, user_id, None)?;
            return Ok(false);
        }

        let tx = conn.transaction()?;
        let credited = insert_user(&tx, user_id, Some(referrer))? && credit(&tx, referrer)?;
        tx.commit()?;
        Ok(credited)
    }

    /// Zeroes the balance of `user_id` and returns the amount that was zeroed.
    ///
    /// Read and reset share a transaction so the returned amount is exactly
    /// what was cleared. Absent users and empty balances return 0 and write nothing.
    pub fn withdraw(&self, user_id: UserId) -> rusqlite::Result<i64> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let amount: i64 = tx
            .query_row(
                "SELECT fluff_balance FROM referrals WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);

        if amount > 0 {
            tx.execute(
                "UPDATE referrals SET fluff_balance = 0 WHERE user_id = ?1",
                params![user_id],
            )?;
        }
        tx.commit()?;
        Ok(amount)
    }
}

fn insert_user(
    conn: &Connection,
    user_id: UserId,
    referred_by: Option<UserId>,
) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO referrals (user_id, referred_by) VALUES (?1, ?2)",
        params![user_id, referred_by],
    )?;
    Ok(inserted > 0)
}

fn credit(conn: &Connection, user_id: UserId) -> rusqlite::Result<bool> {
    let updated = conn.execute(
        "UPDATE referrals \
         SET referral_count = referral_count + 1, fluff_balance = fluff_balance + ?1 \
         WHERE user_id = ?2",
        params![REFERRAL_REWARD, user_id],
    )?;
    Ok(updated > 0)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ReferralRecord> {
    Ok(ReferralRecord {
        user_id: row.get(0)?,
        referred_by: row.get(1)?,
        referral_count: row.get(2)?,
        fluff_balance: row.get(3)?,
    })
}

#[cfg(test)]
impl ReferralStore {
    /// Drops the table so every following statement fails.
    pub(crate) fn break_schema(&self) {
        self.lock().execute_batch("DROP TABLE referrals").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ReferralStore {
        ReferralStore::open_in_memory().unwrap()
    }

    #[test]
    fn ensure_user_creates_once_and_keeps_referrer() {
        let store = store();
        assert!(store.ensure_user(1, Some(7)).unwrap());
        assert!(!store.ensure_user(1, Some(9)).unwrap());
        assert!(!store.ensure_user(1, None).unwrap());

        let record = store.get_record(1).unwrap().unwrap();
        assert_eq!(
            record,
            ReferralRecord {
                user_id: 1,
                referred_by: Some(7),
                referral_count: 0,
                fluff_balance: 0,
            }
        );
    }

    #[test]
    fn credit_referrer_adds_reward_per_call() {
        let store = store();
        store.ensure_user(5, None).unwrap();
        for _ in 0..3 {
            assert!(store.credit_referrer(5).unwrap());
        }

        let balance = store.get_balance(5).unwrap().unwrap();
        assert_eq!(balance.referral_count, 3);
        assert_eq!(balance.fluff_balance, 3 * REFERRAL_REWARD);
    }

    #[test]
    fn credit_referrer_on_missing_user_is_noop() {
        let store = store();
        assert!(!store.credit_referrer(42).unwrap());
        assert_eq!(store.get_record(42).unwrap(), None);
    }

    #[test]
    fn unknown_user_has_no_balance() {
        assert_eq!(store().get_balance(123).unwrap(), None);
    }

    #[test]
    fn reset_balance_keeps_referral_count() {
        let store = store();
        store.ensure_user(2, None).unwrap();
        store.credit_referrer(2).unwrap();
        store.credit_referrer(2).unwrap();

        store.reset_balance(2).unwrap();

        let balance = store.get_balance(2).unwrap().unwrap();
        assert_eq!(
            balance,
            Balance {
                referral_count: 2,
                fluff_balance: 0,
            }
        );
    }

    #[test]
    fn register_referral_credits_only_on_first_contact() {
        let store = store();
        store.ensure_user(100, None).unwrap();

        assert!(store.register_referral(200, 100).unwrap());
        assert!(!store.register_referral(200, 100).unwrap());

        let referrer = store.get_balance(100).unwrap().unwrap();
        assert_eq!(
            referrer,
            Balance {
                referral_count: 1,
                fluff_balance: REFERRAL_REWARD,
            }
        );
        assert_eq!(store.get_record(200).unwrap().unwrap().referred_by, Some(100));
    }

    #[test]
    fn register_referral_with_unknown_referrer_still_records_it() {
        let store = store();
        assert!(!store.register_referral(300, 999).unwrap());
        assert_eq!(store.get_record(300).unwrap().unwrap().referred_by, Some(999));
        assert_eq!(store.get_record(999).unwrap(), None);
    }

    #[test]
    fn self_referral_earns_nothing() {
        let store = store();
        assert!(!store.register_referral(8, 8).unwrap());

        let record = store.get_record(8).unwrap().unwrap();
        assert_eq!(record.referred_by, None);
        assert_eq!(record.fluff_balance, 0);
    }

    #[test]
    fn withdraw_returns_cleared_amount() {
        let store = store();
        store.ensure_user(4, None).unwrap();
        for _ in 0..3 {
            store.credit_referrer(4).unwrap();
        }

        assert_eq!(store.withdraw(4).unwrap(), 30);
        assert_eq!(store.withdraw(4).unwrap(), 0);
        assert_eq!(
            store.get_balance(4).unwrap().unwrap(),
            Balance {
                referral_count: 3,
                fluff_balance: 0,
            }
        );
    }

    #[test]
    fn withdraw_for_absent_user_is_zero() {
        let store = store();
        assert_eq!(store.withdraw(77).unwrap(), 0);
        assert_eq!(store.get_record(77).unwrap(), None);
    }

    #[test]
    fn operations_report_storage_faults() {
        let store = store();
        store.break_schema();

        assert!(store.ensure_user(1, None).is_err());
        assert!(store.get_balance(1).is_err());
        assert!(store.withdraw(1).is_err());
    }
}
