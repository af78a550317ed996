use std::{env, fs, path::Path, sync::OnceLock, time::Duration};

use chrono::FixedOffset;
use regex::Regex;

use crate::{
    dispatcher::DEFAULT_MAX_CONCURRENT,
    errors::Error,
    http::{HttpSettings, DEFAULT_USER_AGENT},
    input::MAX_ATTACHMENT_SIZE,
    report::{RenderOptions, DEFAULT_BAR_SEGMENTS, DEFAULT_INLINE_LIMIT},
    Result,
};

pub const DEFAULT_PROVIDER_MAPPINGS_URL: &str =
    "https://raw.githubusercontent.com/Hyy800/Quantumult-X/refs/heads/Nana/ymys.txt";

/// Typed configuration, read from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub provider_mappings_url: String,

    // Outbound fetches
    pub max_concurrent_fetches: usize,
    pub http: HttpSettings,

    // Report
    pub inline_limit: usize,
    pub bar_segments: usize,
    pub utc_offset_hours: i32,

    // Attachments
    pub max_attachment_size: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;
        validate_bot_token(&telegram_bot_token)?;

        let provider_mappings_url = env_str("PROVIDER_MAPPINGS_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_PROVIDER_MAPPINGS_URL.to_string());

        let max_concurrent_fetches = env_usize("MAX_CONCURRENT_FETCHES")
            .unwrap_or(DEFAULT_MAX_CONCURRENT)
            .max(1);

        let defaults = HttpSettings::default();
        let http = HttpSettings {
            user_agent: env_str("HTTP_USER_AGENT")
                .and_then(non_empty)
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            connect_timeout: env_millis("CONNECT_TIMEOUT_MS").unwrap_or(defaults.connect_timeout),
            request_timeout: env_millis("REQUEST_TIMEOUT_MS").unwrap_or(defaults.request_timeout),
            body_timeout: env_millis("NODE_INFO_TIMEOUT_MS").unwrap_or(defaults.body_timeout),
            pool_max_idle_per_host: env_usize("POOL_MAX_IDLE_PER_HOST")
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout: defaults.pool_idle_timeout,
            max_body_bytes: env_u64("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
        };

        let inline_limit = env_usize("REPORT_INLINE_LIMIT").unwrap_or(DEFAULT_INLINE_LIMIT);
        let bar_segments = env_usize("REPORT_BAR_SEGMENTS").unwrap_or(DEFAULT_BAR_SEGMENTS);
        let utc_offset_hours = env_i32("REPORT_UTC_OFFSET_HOURS")
            .unwrap_or(0)
            .clamp(-23, 23);

        let max_attachment_size = env_u64("MAX_ATTACHMENT_SIZE").unwrap_or(MAX_ATTACHMENT_SIZE);

        Ok(Self {
            telegram_bot_token,
            provider_mappings_url,
            max_concurrent_fetches,
            http,
            inline_limit,
            bar_segments,
            utc_offset_hours,
            max_attachment_size,
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        let defaults = RenderOptions::default();
        RenderOptions {
            inline_limit: self.inline_limit,
            bar_segments: self.bar_segments,
            utc_offset: FixedOffset::east_opt(self.utc_offset_hours * 3600)
                .unwrap_or(defaults.utc_offset),
        }
    }
}

/// Telegram bot tokens look like `123456789:AA...` (35+ chars after the colon).
pub fn validate_bot_token(token: &str) -> Result<()> {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN_RE.get_or_init(|| Regex::new(r"^\d+:[A-Za-z0-9_-]{35,}$").expect("valid regex"));
    if re.is_match(token.trim()) {
        Ok(())
    } else {
        Err(Error::Config(
            "TELEGRAM_BOT_TOKEN is malformed (expected `<bot id>:<secret>`)".to_string(),
        ))
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_i32(key: &str) -> Option<i32> {
    env_str(key).and_then(|s| s.trim().parse::<i32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_u64(key).map(Duration::from_millis)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
