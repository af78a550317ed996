use teloxide::{net::Download, prelude::*, types::Document};

use subinfo_core::input::{extract_urls_from_bytes, is_text_attachment};

#[derive(Debug)]
pub enum AttachmentError {
    TooLarge { size: u64, limit: u64 },
    Download(String),
}

/// Subscription URLs from a text attachment.
///
/// Non-text attachments yield no URLs (they are ignored, not rejected).
pub async fn urls_from_document(
    bot: &Bot,
    doc: &Document,
    max_size: u64,
) -> Result<Vec<String>, AttachmentError> {
    let mime = doc.mime_type.as_ref().map(|m| m.essence_str().to_string());
    if !is_text_attachment(doc.file_name.as_deref(), mime.as_deref()) {
        return Ok(Vec::new());
    }

    let size = doc.file.size as u64;
    if size > max_size {
        return Err(AttachmentError::TooLarge {
            size,
            limit: max_size,
        });
    }

    let file = bot
        .get_file(doc.file.id.clone())
        .await
        .map_err(|e| AttachmentError::Download(e.to_string()))?;

    let mut buf: Vec<u8> = Vec::with_capacity(size as usize);
    bot.download_file(&file.path, &mut buf)
        .await
        .map_err(|e| AttachmentError::Download(e.to_string()))?;

    Ok(extract_urls_from_bytes(&buf))
}
