//! Formatting helpers for Telegram HTML output.

use std::sync::OnceLock;

use regex::Regex;

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Inverse of [`escape_html`].
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Remove the markup tags we emit and unescape entities, producing plain text.
pub fn strip_markup(html: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let re = TAG_RE.get_or_init(|| Regex::new(r"</?(?:b|i|code|pre)>").expect("valid regex"));
    unescape_html(&re.replace_all(html, ""))
}

/// Human-readable byte size with two decimals, e.g. `1.50 GB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut level = 0usize;
    while size >= 1024.0 && level < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        level += 1;
    }
    format!("{size:.2} {}", SIZE_UNITS[level])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
        assert_eq!(unescape_html(&escape_html(s)), s);
    }

    #[test]
    fn strips_tags_and_entities() {
        let html = "📄 <b>A &amp; B</b>\n🔗 <code>https://x/?a=1&amp;b=&lt;2&gt;</code>";
        assert_eq!(strip_markup(html), "📄 A & B\n🔗 https://x/?a=1&b=<2>");
    }

    #[test]
    fn escaped_user_text_survives_stripping() {
        // A user-supplied "<b>" is escaped first, so it comes back literally.
        let html = format!("<code>{}</code>", escape_html("https://x/<b>"));
        assert_eq!(strip_markup(&html), "https://x/<b>");
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(0), "0.00 B");
        assert_eq!(format_size(1023), "1023.00 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536 * 1024 * 1024), "1.50 GB");
        assert_eq!(format_size(u64::MAX), "16384.00 PB");
    }
}
