//! Event handlers. Storage faults are logged here and never passed on:
//! reads degrade to "no data" and writes to no-ops.

use log::{error, info};

use crate::event::{parse_referrer, referrer_from_text, CallbackAction, InboundEvent};
use crate::record::UserId;
use crate::reply::{self, Links, Reply};
use crate::store::ReferralStore;

/// Runs the handler for `event`. Text messages produce no reply.
pub fn handle(store: &ReferralStore, links: &Links, event: InboundEvent) -> Option<Reply> {
    match event {
        InboundEvent::Start(user_id, payload) => {
            Some(on_start(store, links, user_id, payload.as_deref()))
        }
        InboundEvent::Callback(user_id, CallbackAction::CheckBalance) => {
            Some(on_check_balance(store, user_id))
        }
        InboundEvent::Callback(user_id, CallbackAction::Withdraw) => {
            Some(on_withdraw(store, user_id))
        }
        InboundEvent::Text(user_id, text) => {
            on_text_message(store, user_id, &text);
            None
        }
    }
}

pub fn on_start(
    store: &ReferralStore,
    links: &Links,
    user_id: UserId,
    payload: Option<&str>,
) -> Reply {
    match payload.and_then(parse_referrer) {
        Some(referrer) => attribute(store, user_id, referrer),
        None => ensure_user(store, user_id),
    }

    let link = links.referral_link(user_id);
    info!("Sending welcome message with inline keyboard to {}", user_id);
    Reply::Message {
        text: reply::welcome_text(&link),
        keyboard: Some(reply::start_keyboard(&links.webapp_url)),
    }
}

pub fn on_check_balance(store: &ReferralStore, user_id: UserId) -> Reply {
    ensure_user(store, user_id);

    let balance = store.get_balance(user_id).unwrap_or_else(|e| {
        error!("balance lookup failed for {}: {:?}", user_id, e);
        None
    });
    match balance {
        Some(b) => Reply::CallbackAnswer(reply::balance_text(b.referral_count, b.fluff_balance)),
        None => Reply::CallbackAnswer(reply::NO_REFERRAL_DATA.to_string()),
    }
}

pub fn on_withdraw(store: &ReferralStore, user_id: UserId) -> Reply {
    ensure_user(store, user_id);

    let amount = store.withdraw(user_id).unwrap_or_else(|e| {
        error!("withdrawal failed for {}: {:?}", user_id, e);
        0
    });
    if amount > 0 {
        info!("User {} withdrew {} Fluffcoins", user_id, amount);
        Reply::CallbackAnswer(reply::withdrawal_text(amount))
    } else {
        Reply::CallbackAnswer(reply::INSUFFICIENT_BALANCE.to_string())
    }
}

pub fn on_text_message(store: &ReferralStore, user_id: UserId, text: &str) {
    match referrer_from_text(text) {
        Some(referrer) => attribute(store, user_id, referrer),
        None => ensure_user(store, user_id),
    }
}

fn ensure_user(store: &ReferralStore, user_id: UserId) {
    if let Err(e) = store.ensure_user(user_id, None) {
        error!("could not register user {}: {:?}", user_id, e);
    }
}

fn attribute(store: &ReferralStore, user_id: UserId, referrer: UserId) {
    match store.register_referral(user_id, referrer) {
        Ok(true) => info!("User {} referred by {}, credited referrer", user_id, referrer),
        Ok(false) => {}
        Err(e) => error!("could not register referral {} -> {}: {:?}", referrer, user_id, e),
    }
}
