use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use crate::event::CallbackAction;
use crate::record::UserId;
use crate::{REFERRAL_REWARD, WEBAPP_TASK_REWARD};

/// What a handler wants sent back.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A chat message, optionally with inline buttons.
    Message {
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    /// Text shown as the answer to the pressed button.
    CallbackAnswer(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Message { text, .. } => text,
            Reply::CallbackAnswer(text) => text,
        }
    }

    /// Text and keyboard for delivery as a chat message.
    pub fn into_parts(self) -> (String, Option<InlineKeyboardMarkup>) {
        match self {
            Reply::Message { text, keyboard } => (text, keyboard),
            Reply::CallbackAnswer(text) => (text, None),
        }
    }
}

/// Links the bot hands out.
#[derive(Debug, Clone)]
pub struct Links {
    pub bot_username: String,
    pub webapp_url: Url,
}

impl Links {
    pub fn referral_link(&self, user_id: UserId) -> String {
        format!("https://t.me/{}?start={}", self.bot_username, user_id)
    }
}

pub fn welcome_text(referral_link: &str) -> String {
    format!(
        "Welcome! Here’s your referral link:\n{}\n\n\
         💰 Referral Program:\nIf you refer 1 person, you earn {} Fluffcoins.\n\n\
         🏆 Web App Task Completion:\nComplete tasks on the web app to earn {} Ope tokens.",
        referral_link, REFERRAL_REWARD, WEBAPP_TASK_REWARD
    )
}

pub fn start_keyboard(webapp_url: &Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::url("Go to Fluffcoin Web App", webapp_url.clone())],
        vec![InlineKeyboardButton::callback(
            "Check Referral Balance",
            CallbackAction::CheckBalance.data(),
        )],
        vec![InlineKeyboardButton::callback(
            "Withdraw Fluffcoins",
            CallbackAction::Withdraw.data(),
        )],
    ])
}

pub fn balance_text(referral_count: i64, fluff_balance: i64) -> String {
    format!(
        "You have referred {} people and earned {} Fluffcoins.",
        referral_count, fluff_balance
    )
}

pub const NO_REFERRAL_DATA: &str = "No referral data found.";

pub fn withdrawal_text(amount: i64) -> String {
    format!("Withdrawal of {} Fluffcoins has been requested.", amount)
}

pub const INSUFFICIENT_BALANCE: &str = "You don’t have enough Fluffcoins to withdraw.";
