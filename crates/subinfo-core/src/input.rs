//! Batch input: subscription URLs pulled out of chat text and text files.

use std::sync::OnceLock;

use regex::Regex;

pub const MAX_ATTACHMENT_SIZE: u64 = 10 * 1024 * 1024; // 10MB

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("valid regex"))
}

/// All `http(s)://` URLs in `text`, in order of appearance (duplicates kept).
pub fn extract_urls(text: &str) -> Vec<String> {
    url_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Attachments are read only when declared as plain text or named `*.txt`.
pub fn is_text_attachment(file_name: Option<&str>, mime: Option<&str>) -> bool {
    if mime == Some("text/plain") {
        return true;
    }
    file_name
        .map(|n| n.to_lowercase().ends_with(".txt"))
        .unwrap_or(false)
}

/// URLs from an attachment body; invalid UTF-8 is replaced, not rejected.
pub fn extract_urls_from_bytes(bytes: &[u8]) -> Vec<String> {
    extract_urls(&String::from_utf8_lossy(bytes))
}
