use crate::record::UserId;

pub const START_COMMAND: &str = "/start";

/// Chat events the bot reacts to, independent of the transport's update types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/start`, with the token that followed the command.
    Start(UserId, Option<String>),
    Callback(UserId, CallbackAction),
    Text(UserId, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    CheckBalance,
    Withdraw,
}

impl CallbackAction {
    pub fn from_data(data: &str) -> Option<Self> {
        match data {
            "check_balance" => Some(CallbackAction::CheckBalance),
            "withdraw" => Some(CallbackAction::Withdraw),
            _ => None,
        }
    }

    pub fn data(self) -> &'static str {
        match self {
            CallbackAction::CheckBalance => "check_balance",
            CallbackAction::Withdraw => "withdraw",
        }
    }
}

impl InboundEvent {
    /// Classifies a text message for the bot named `bot_username`.
    ///
    /// `/start` and `/start@<bot_username>` become [`InboundEvent::Start`],
    /// `/start@<other bot>` is not ours and yields `None`, anything else is
    /// plain text.
    pub fn from_message(user_id: UserId, text: &str, bot_username: &str) -> Option<Self> {
        let head = text.split(' ').next().unwrap_or(text);
        let (command, addressee) = match head.split_once('@') {
            Some((command, addressee)) => (command, Some(addressee)),
            None => (head, None),
        };

        if command != START_COMMAND {
            return Some(InboundEvent::Text(user_id, text.to_string()));
        }
        if let Some(addressee) = addressee {
            if !addressee.eq_ignore_ascii_case(bot_username) {
                return None;
            }
        }

        let payload = start_payload(text).map(str::to_string);
        Some(InboundEvent::Start(user_id, payload))
    }
}

/// The token after `/start`: the second space-separated piece, if non-empty.
///
/// Splits on single spaces, so `/start  42` (two spaces) carries nothing
/// and `/start 12 34` carries `12`.
pub fn start_payload(text: &str) -> Option<&str> {
    text.split(' ').nth(1).filter(|token| !token.is_empty())
}

/// Parses a referral payload. Only plain ASCII digits are accepted.
pub fn parse_referrer(payload: &str) -> Option<UserId> {
    if payload.is_empty() || !payload.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    payload.parse().ok()
}

/// Extracts the referrer from a text message that starts with `/start`.
pub fn referrer_from_text(text: &str) -> Option<UserId> {
    if !text.starts_with(START_COMMAND) {
        return None;
    }
    start_payload(text).and_then(parse_referrer)
}
