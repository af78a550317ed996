//! Batch report rendering.
//!
//! Reports are rendered as Telegram HTML. When the text is too long for a single
//! message it is converted to plain text and returned as a file instead.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::{
    dispatcher::BatchReport,
    fetcher::FetchResult,
    formatting::{escape_html, format_size, strip_markup},
};

pub const DEFAULT_INLINE_LIMIT: usize = 4000;
pub const DEFAULT_BAR_SEGMENTS: usize = 10;
pub const MIN_BAR_SEGMENTS: usize = 10;
pub const MAX_BAR_SEGMENTS: usize = 15;
pub const ATTACHMENT_FILENAME: &str = "result.txt";
pub const NO_EXPIRY_LABEL: &str = "Permanent";

const BLOCK_SEPARATOR: &str = "\n\n";
const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedOutput {
    Inline(String),
    Attachment { filename: String, bytes: Vec<u8> },
}

#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    /// Maximum inline length, in characters.
    pub inline_limit: usize,
    pub bar_segments: usize,
    /// Offset used to print expiry dates.
    pub utc_offset: FixedOffset,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            inline_limit: DEFAULT_INLINE_LIMIT,
            bar_segments: DEFAULT_BAR_SEGMENTS,
            utc_offset: Utc.fix(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReportRenderer {
    opts: RenderOptions,
}

impl ReportRenderer {
    pub fn new(opts: RenderOptions) -> Self {
        let bar_segments = opts.bar_segments.clamp(MIN_BAR_SEGMENTS, MAX_BAR_SEGMENTS);
        Self {
            opts: RenderOptions {
                bar_segments,
                ..opts
            },
        }
    }

    pub fn render(&self, report: &BatchReport) -> RenderedOutput {
        let html = self.render_html(report);
        if html.chars().count() > self.opts.inline_limit {
            RenderedOutput::Attachment {
                filename: ATTACHMENT_FILENAME.to_string(),
                bytes: strip_markup(&html).into_bytes(),
            }
        } else {
            RenderedOutput::Inline(html)
        }
    }

    pub fn render_html(&self, report: &BatchReport) -> String {
        report
            .iter()
            .map(|r| self.render_block(r))
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }

    pub fn render_block(&self, result: &FetchResult) -> String {
        match result {
            FetchResult::Failure { url, error_kind, .. } => format!(
                "❌ <code>{}</code> | <b>{}</b>",
                escape_html(url),
                escape_html(&error_kind.label())
            ),
            FetchResult::Success {
                url,
                provider_name,
                usage,
                remaining_bytes,
                percent_used,
                node,
            } => {
                let mut out = format!(
                    "📄 <b>{}</b>\n📊 <code>{} {:.2}%</code>\n💾 Remaining: <code>{}</code> | Total: <code>{}</code> | Used: <code>{}</code>\n⬆️ <code>{}</code> ⬇️ <code>{}</code>\n⏳ Expires: <code>{}</code>",
                    escape_html(provider_name),
                    self.progress_bar(*percent_used),
                    percent_used,
                    format_size(*remaining_bytes),
                    format_size(usage.total_bytes),
                    format_size(usage.used_bytes()),
                    format_size(usage.upload_bytes),
                    format_size(usage.download_bytes),
                    self.expiry_label(usage.expire_epoch_seconds),
                );
                if let Some(n) = node {
                    out.push_str(&format!("\n🌐 Nodes: <code>{}</code>", n.count));
                    if !n.detail.is_empty() {
                        out.push_str(&format!(" ({})", escape_html(&n.detail)));
                    }
                }
                out.push_str(&format!("\n🔗 <code>{}</code>", escape_html(url)));
                out
            }
        }
    }

    /// Fixed-width bar; fill is clamped so percentages over 100 stay in bounds.
    pub fn progress_bar(&self, percent: f64) -> String {
        let segments = self.opts.bar_segments;
        let per_segment = 100.0 / segments as f64;
        let raw = (percent / per_segment).floor();
        let filled = if raw.is_finite() && raw > 0.0 {
            (raw as usize).min(segments)
        } else {
            0
        };

        let mut bar = String::with_capacity(segments * 3);
        bar.extend(std::iter::repeat(BAR_FILLED).take(filled));
        bar.extend(std::iter::repeat(BAR_EMPTY).take(segments - filled));
        bar
    }

    pub fn expiry_label(&self, expire_epoch_seconds: u64) -> String {
        if expire_epoch_seconds == 0 {
            return NO_EXPIRY_LABEL.to_string();
        }
        i64::try_from(expire_epoch_seconds)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| {
                dt.with_timezone(&self.opts.utc_offset)
                    .format("%Y-%m-%d")
                    .to_string()
            })
            .unwrap_or_else(|| NO_EXPIRY_LABEL.to_string())
    }
}
