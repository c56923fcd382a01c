/// Telegram user id as stored in SQLite.
pub type UserId = i64;

/// One row of the `referrals` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralRecord {
    pub user_id: UserId,
    /// Set once, when the row is created.
    pub referred_by: Option<UserId>,
    pub referral_count: i64,
    pub fluff_balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balance {
    pub referral_count: i64,
    pub fluff_balance: i64,
}

impl From<ReferralRecord> for Balance {
    fn from(record: ReferralRecord) -> Self {
        Balance {
            referral_count: record.referral_count,
            fluff_balance: record.fluff_balance,
        }
    }
}
