use std::sync::Arc;

use storefront_core::{ChannelId, TicketNumber, Transcript};
use tracing::{debug, info};

use crate::blocks::{transcript_notice, Attachment, MessageTemplate};
use crate::platform::{ChatPlatform, PlatformError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Delivered { filename: String, lines: usize },
    /// The archive channel could not be resolved, so nothing was sent.
    ArchiveUnavailable,
}

pub struct TranscriptExporter {
    platform: Arc<dyn ChatPlatform>,
    archive: ChannelId,
}

impl TranscriptExporter {
    pub fn new(platform: Arc<dyn ChatPlatform>, archive: ChannelId) -> Self {
        Self { platform, archive }
    }

    pub async fn export(
        &self,
        channel: ChannelId,
        channel_name: &str,
        number: Option<TicketNumber>,
        correlation_id: &str,
    ) -> Result<ExportOutcome, PlatformError> {
        if self.platform.resolve_channel(self.archive).await?.is_none() {
            debug!(
                event_name = "discord.transcript.archive_missing",
                correlation_id = %correlation_id,
                archive_channel = %self.archive,
                "transcript archive channel not found; skipping export"
            );
            return Ok(ExportOutcome::ArchiveUnavailable);
        }

        let entries = self.platform.history(channel).await?;
        let transcript = Transcript::render(channel_name, &entries);
        let filename = transcript.filename.clone();

        let message = MessageTemplate {
            embeds: vec![transcript_notice(channel, number)],
            attachment: Some(Attachment { filename: filename.clone(), data: transcript.into_bytes() }),
            ..MessageTemplate::default()
        };
        self.platform.send_message(self.archive, &message).await?;

        info!(
            event_name = "discord.transcript.delivered",
            correlation_id = %correlation_id,
            channel_id = %channel,
            archive_channel = %self.archive,
            lines = entries.len(),
            "ticket transcript archived"
        );
        Ok(ExportOutcome::Delivered { filename, lines: entries.len() })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storefront_core::{ChannelId, TicketNumber};

    use super::{ExportOutcome, TranscriptExporter};
    use crate::platform::memory::InMemoryPlatform;

    #[tokio::test]
    async fn delivers_history_as_attachment_to_archive() {
        let platform = Arc::new(InMemoryPlatform::default());
        platform.add_channel(ChannelId(10), "ticket-001", None).await;
        platform.add_channel(ChannelId(99), "transcripts", None).await;
        platform.post_as(ChannelId(10), "alice", "hello").await;
        platform.post_as(ChannelId(10), "bob", "hi there").await;

        let exporter = TranscriptExporter::new(platform.clone(), ChannelId(99));
        let outcome = exporter
            .export(ChannelId(10), "ticket-001", Some(TicketNumber(1)), "req-1")
            .await
            .expect("export");

        assert_eq!(outcome, ExportOutcome::Delivered { filename: "ticket-001.txt".to_owned(), lines: 2 });

        let archived = platform.messages(ChannelId(99)).await;
        let attachment = archived[0].template.attachment.clone().expect("attachment");
        let body = String::from_utf8(attachment.data).expect("utf8");
        assert!(body.lines().next().is_some_and(|line| line.ends_with("alice: hello")));
        assert_eq!(body.lines().count(), 2);
    }

    #[tokio::test]
    async fn empty_history_sends_placeholder_body() {
        let platform = Arc::new(InMemoryPlatform::default());
        platform.add_channel(ChannelId(10), "ticket-002", None).await;
        platform.add_channel(ChannelId(99), "transcripts", None).await;

        let exporter = TranscriptExporter::new(platform.clone(), ChannelId(99));
        exporter.export(ChannelId(10), "ticket-002", None, "req-2").await.expect("export");

        let archived = platform.messages(ChannelId(99)).await;
        let attachment = archived[0].template.attachment.clone().expect("attachment");
        assert_eq!(attachment.data, b"(No messages logged)".to_vec());
    }

    #[tokio::test]
    async fn missing_archive_skips_without_reading_history() {
        let platform = Arc::new(InMemoryPlatform::default());
        platform.add_channel(ChannelId(10), "ticket-003", None).await;

        let exporter = TranscriptExporter::new(platform.clone(), ChannelId(99));
        let outcome = exporter.export(ChannelId(10), "ticket-003", None, "req-3").await.expect("export");

        assert_eq!(outcome, ExportOutcome::ArchiveUnavailable);
        assert!(platform.operations().await.iter().all(|op| !op.starts_with("history")));
    }
}
