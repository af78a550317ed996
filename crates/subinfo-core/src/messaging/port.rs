use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    formatting::strip_markup,
    messaging::types::{Delivery, MessagingCapabilities, OutgoingDocument},
    report::{RenderedOutput, ATTACHMENT_FILENAME},
    Result,
};

/// Outbound side of a chat platform.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()>;
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;

    async fn send_document(&self, chat_id: ChatId, doc: OutgoingDocument) -> Result<MessageRef>;
}

/// Deliver a rendered report in place of the `status` progress message.
///
/// Inline reports replace the progress text (falling back to a fresh message if
/// the edit fails); attachments are sent as a file and the progress message is
/// removed. Inline text longer than the platform allows is sent as a file.
pub async fn deliver(port: &dyn MessagingPort, status: MessageRef, delivery: Delivery) -> Result<()> {
    let caps = port.capabilities();
    let delivery = match delivery {
        Delivery::EditInline(html) if html.chars().count() > caps.max_message_len => {
            Delivery::from(RenderedOutput::Attachment {
                filename: ATTACHMENT_FILENAME.to_string(),
                bytes: strip_markup(&html).into_bytes(),
            })
        }
        other => other,
    };

    match delivery {
        Delivery::EditInline(html) => {
            if !caps.supports_edit {
                port.send_html(status.chat_id, &html).await?;
                return Ok(());
            }
            if let Err(e) = port.edit_html(status, &html).await {
                tracing::warn!(error = %e, "failed to edit status message; sending a new one");
                port.send_html(status.chat_id, &html).await?;
            }
        }
        Delivery::Document(doc) => {
            port.send_document(status.chat_id, doc).await?;
            if let Err(e) = port.delete_message(status).await {
                tracing::debug!(error = %e, "failed to delete status message");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{domain::MessageId, errors::Error, report::RenderedOutput};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail_edit: bool,
        max_len: Option<usize>,
    }

    impl Recorder {
        fn log(&self, s: String) {
            self.calls.lock().unwrap().push(s);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingPort for Recorder {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_edit: true,
                max_message_len: self.max_len.unwrap_or(4096),
            }
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            self.log(format!("send:{html}"));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(2),
            })
        }

        async fn edit_html(&self, _msg: MessageRef, html: &str) -> Result<()> {
            if self.fail_edit {
                return Err(Error::External("message is not modified".to_string()));
            }
            self.log(format!("edit:{html}"));
            Ok(())
        }

        async fn delete_message(&self, msg: MessageRef) -> Result<()> {
            self.log(format!("delete:{}", msg.message_id.0));
            Ok(())
        }

        async fn send_document(&self, chat_id: ChatId, doc: OutgoingDocument) -> Result<MessageRef> {
            self.log(format!("doc:{}:{}", doc.filename, doc.bytes.len()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(3),
            })
        }
    }

    fn status() -> MessageRef {
        MessageRef {
            chat_id: ChatId(7),
            message_id: MessageId(1),
        }
    }

    #[tokio::test]
    async fn inline_report_edits_status() {
        let r = Recorder::default();
        deliver(&r, status(), RenderedOutput::Inline("<b>ok</b>".into()).into())
            .await
            .unwrap();
        assert_eq!(r.calls(), vec!["edit:<b>ok</b>"]);
    }

    #[tokio::test]
    async fn failed_edit_falls_back_to_send() {
        let r = Recorder {
            fail_edit: true,
            ..Recorder::default()
        };
        deliver(&r, status(), RenderedOutput::Inline("hi".into()).into())
            .await
            .unwrap();
        assert_eq!(r.calls(), vec!["send:hi"]);
    }

    #[tokio::test]
    async fn attachment_replaces_status() {
        let r = Recorder::default();
        let out = RenderedOutput::Attachment {
            filename: "result.txt".into(),
            bytes: b"abc".to_vec(),
        };
        deliver(&r, status(), out.into()).await.unwrap();
        assert_eq!(r.calls(), vec!["doc:result.txt:3", "delete:1"]);
    }

    #[tokio::test]
    async fn inline_report_over_platform_limit_is_sent_as_file() {
        let r = Recorder {
            max_len: Some(5),
            ..Recorder::default()
        };
        deliver(&r, status(), RenderedOutput::Inline("<b>abcdef</b>".into()).into())
            .await
            .unwrap();
        assert_eq!(r.calls(), vec!["doc:result.txt:6", "delete:1"]);
    }
}
