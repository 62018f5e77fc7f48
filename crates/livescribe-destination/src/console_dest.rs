use crate::dest_trait::{bool_option, Destination};
use async_trait::async_trait;
use livescribe_core::{DestinationError, TextMetadata, TranscriptEvent};
use tokio::io::AsyncWriteExt;

/// Prints events to stdout. Partials are marked with a leading `... `.
pub struct ConsoleDestination {
    partials: bool,
}

impl ConsoleDestination {
    pub fn new() -> Self {
        Self { partials: true }
    }

    fn format_line(event: &TranscriptEvent, metadata: &TextMetadata) -> String {
        if event.is_final {
            format!("{}{}\n", metadata.prefix, event.text)
        } else {
            format!("{}... {}\n", metadata.prefix, event.text)
        }
    }
}

impl Default for ConsoleDestination {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Destination for ConsoleDestination {
    fn name(&self) -> &str {
        "console"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), DestinationError> {
        self.partials = bool_option(&config, "partials", true)?;
        Ok(())
    }

    fn accepts_partials(&self) -> bool {
        self.partials
    }

    async fn send_event(
        &self,
        event: &TranscriptEvent,
        metadata: &TextMetadata,
    ) -> Result<(), DestinationError> {
        let line = Self::format_line(event, metadata);
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| DestinationError::SendFailed(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| DestinationError::SendFailed(e.to_string()))
    }

    fn is_healthy(&self) -> bool {
        true
    }

    async fn shutdown(&self) -> Result<(), DestinationError> {
        Ok(())
    }
}
