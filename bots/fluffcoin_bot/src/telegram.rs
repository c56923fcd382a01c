//! teloxide glue: turns updates into [`InboundEvent`]s and sends the replies.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, warn};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::UserId as TelegramUserId;

use crate::event::{CallbackAction, InboundEvent};
use crate::handlers;
use crate::record::UserId;
use crate::reply::{Links, Reply};
use crate::store::ReferralStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReferralStore>,
    pub links: Arc<Links>,
}

impl AppState {
    pub fn new(store: ReferralStore, links: Links) -> Self {
        AppState {
            store: Arc::new(store),
            links: Arc::new(links),
        }
    }
}

/// Telegram ids are `u64`; ids that do not fit the `INTEGER` column are refused.
fn user_id(id: TelegramUserId) -> Option<UserId> {
    match i64::try_from(id.0) {
        Ok(user_id) => Some(user_id),
        Err(_) => {
            warn!("user id {} does not fit in i64, ignoring update", id);
            None
        }
    }
}

fn message_event(from: TelegramUserId, text: &str, bot_username: &str) -> Option<InboundEvent> {
    InboundEvent::from_message(user_id(from)?, text, bot_username)
}

fn callback_event(from: TelegramUserId, data: Option<&str>) -> Option<InboundEvent> {
    let Some(action) = data.and_then(CallbackAction::from_data) else {
        debug!("ignoring callback data {:?} from {}", data, from);
        return None;
    };
    Some(InboundEvent::Callback(user_id(from)?, action))
}

// SQLite work stays off the async executor.
async fn run_handler(state: &AppState, event: InboundEvent) -> Result<Option<Reply>> {
    let state = state.clone();
    tokio::task::spawn_blocking(move || handlers::handle(&state.store, &state.links, event))
        .await
        .context("store task join failed")
}

pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(
            |bot: Bot, state: AppState, msg: Message| async move {
                if let Err(e) = handle_message(bot, state, msg).await {
                    error!("message handler error: {:?}", e);
                }
                Ok::<(), anyhow::Error>(())
            },
        ))
        .branch(Update::filter_callback_query().endpoint(
            |bot: Bot, state: AppState, q: CallbackQuery| async move {
                if let Err(e) = handle_callback(bot, state, q).await {
                    error!("callback handler error: {:?}", e);
                }
                Ok::<(), anyhow::Error>(())
            },
        ))
}

async fn handle_message(bot: Bot, state: AppState, msg: Message) -> Result<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    let Some(event) = message_event(user.id, text, &state.links.bot_username) else {
        return Ok(());
    };
    let Some(reply) = run_handler(&state, event).await? else {
        return Ok(());
    };

    let (text, keyboard) = reply.into_parts();
    let mut request = bot.send_message(msg.chat.id, text);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(keyboard);
    }
    request.await?;
    Ok(())
}

async fn handle_callback(bot: Bot, state: AppState, q: CallbackQuery) -> Result<()> {
    let reply = match callback_event(q.from.id, q.data.as_deref()) {
        Some(event) => run_handler(&state, event).await?,
        None => None,
    };

    match reply {
        Some(reply) => {
            bot.answer_callback_query(q.id).text(reply.text()).await?;
        }
        None => {
            bot.answer_callback_query(q.id).await?;
        }
    }
    Ok(())
}

/// Long-polls Telegram until interrupted with Ctrl-C.
pub async fn run(bot: Bot, state: AppState) {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
