use crate::report::RenderedOutput;

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_edit: bool,
    /// Longest text message, in characters.
    pub max_message_len: usize,
}

/// In-memory file sent as a chat attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

/// What to deliver for a rendered report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Replace the progress message with this HTML.
    EditInline(String),
    /// Send a file, then remove the progress message.
    Document(OutgoingDocument),
}

pub const ATTACHMENT_CAPTION: &str = "✅ Results summarized in file";

impl From<RenderedOutput> for Delivery {
    fn from(out: RenderedOutput) -> Self {
        match out {
            RenderedOutput::Inline(html) => Delivery::EditInline(html),
            RenderedOutput::Attachment { filename, bytes } => Delivery::Document(OutgoingDocument {
                filename,
                bytes,
                caption: Some(ATTACHMENT_CAPTION.to_string()),
            }),
        }
    }
}
