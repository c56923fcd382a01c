//! Fluffcoin Telegram Bot
//!
//! Referral registry and Fluffcoin balances backed by a local SQLite table.
//! https://core.telegram.org/bots/features#deep-linking

pub mod config;
pub mod event;
pub mod handlers;
pub mod record;
pub mod reply;
pub mod store;
pub mod telegram;

pub use config::Config;
pub use event::{CallbackAction, InboundEvent};
pub use record::{Balance, ReferralRecord, UserId};
pub use reply::Reply;
pub use store::ReferralStore;

/// Fluffcoins credited to a referrer for every user they bring in.
pub const REFERRAL_REWARD: i64 = 10;

/// Ope tokens promised for web app tasks. Shown in the welcome text only.
pub const WEBAPP_TASK_REWARD: i64 = 500;
