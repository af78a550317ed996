use std::sync::Arc;

use teloxide::prelude::*;

use subinfo_core::domain::ChatId;

use crate::router::AppState;

const HELP_HTML: &str = "📡 <b>Subscription usage checker</b>\n\n\
Send one or more subscription links (<code>http://</code> or <code>https://</code>), \
or a <code>.txt</code> file with one link per line.\n\n\
For each link you get the traffic used, remaining quota, expiry date and a node summary. \
Large reports are sent back as a text file.";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// Handle `/start` and `/help`. Returns `false` for anything else so the
/// caller can keep looking for links in the message.
pub async fn handle_command(msg: &Message, state: &Arc<AppState>) -> ResponseResult<bool> {
    let Some(text) = msg.text() else {
        return Ok(false);
    };
    let (cmd, _args) = parse_command(text);

    match cmd.as_str() {
        "start" | "help" => {
            if let Err(e) = state
                .messenger
                .send_html(ChatId(msg.chat.id.0), HELP_HTML)
                .await
            {
                tracing::warn!(error = %e, "failed to send help");
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}
