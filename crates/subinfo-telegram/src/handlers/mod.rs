//! Telegram update handlers.
//!
//! One incoming message becomes at most one batch: links are collected from
//! the text (or caption) and from an attached text file, a progress message is
//! posted, and the rendered report replaces it once every link has an outcome.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use subinfo_core::{
    dispatcher::dedupe_urls,
    domain::{ChatId, MessageRef},
    formatting::format_size,
    input::extract_urls,
    messaging::port::deliver,
};

use crate::router::AppState;

mod commands;
mod document;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if commands::handle_command(&msg, &state).await? {
        return Ok(());
    }

    let chat_id = ChatId(msg.chat.id.0);

    let mut urls = msg.text().or(msg.caption()).map(extract_urls).unwrap_or_default();

    if let Some(doc) = msg.document() {
        match document::urls_from_document(&bot, doc, state.cfg.max_attachment_size).await {
            Ok(found) => urls.extend(found),
            Err(document::AttachmentError::TooLarge { size, limit }) => {
                notify(
                    &state,
                    chat_id,
                    &format!(
                        "❌ File too large ({}). Max: {}",
                        format_size(size),
                        format_size(limit)
                    ),
                )
                .await;
                return Ok(());
            }
            Err(document::AttachmentError::Download(e)) => {
                tracing::warn!(chat_id = chat_id.0, error = %e, "attachment download failed");
                notify(&state, chat_id, "❌ Could not read the attached file.").await;
                return Ok(());
            }
        }
    }

    let urls = dedupe_urls(urls);
    if urls.is_empty() {
        return Ok(());
    }

    run_batch(chat_id, urls, &state).await;
    Ok(())
}

async fn run_batch(chat_id: ChatId, urls: Vec<String>, state: &AppState) {
    if state.ctx.is_shutting_down() {
        notify(state, chat_id, SHUTTING_DOWN).await;
        return;
    }

    let count = urls.len();
    let status = match state
        .messenger
        .send_html(chat_id, &format!("🚀 Processing {count} subscriptions..."))
        .await
    {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(chat_id = chat_id.0, error = %e, "failed to post progress message");
            return;
        }
    };

    tracing::info!(chat_id = chat_id.0, urls = count, "batch started");
    let started = std::time::Instant::now();

    let Some((report, output)) = state.ctx.process_batch(urls).await else {
        tracing::info!(chat_id = chat_id.0, "batch abandoned on shutdown");
        shutting_down(state, status).await;
        return;
    };

    tracing::info!(
        chat_id = chat_id.0,
        urls = report.len(),
        ok = report.success_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch finished"
    );

    if let Err(e) = deliver(state.messenger.as_ref(), status, output.into()).await {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to deliver report");
    }
}

const SHUTTING_DOWN: &str = "⚠️ Bot is shutting down; this batch was cancelled.";

async fn shutting_down(state: &AppState, status: MessageRef) {
    if state.messenger.edit_html(status, SHUTTING_DOWN).await.is_err() {
        notify(state, status.chat_id, SHUTTING_DOWN).await;
    }
}

async fn notify(state: &AppState, chat_id: ChatId, text: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, text).await {
        tracing::debug!(chat_id = chat_id.0, error = %e, "failed to send notice");
    }
}
