use crate::dest_trait::{bool_option, Destination};
use async_trait::async_trait;
use livescribe_core::{DestinationError, TextMetadata, TranscriptEvent};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `prefix + text` per final hypothesis.
    Text,
    /// One serialized `TranscriptEvent` per line.
    Jsonl,
}

impl FileFormat {
    fn parse(s: &str) -> Result<Self, DestinationError> {
        match s {
            "text" => Ok(FileFormat::Text),
            "jsonl" => Ok(FileFormat::Jsonl),
            other => Err(DestinationError::InitializationFailed(format!(
                "unknown file format '{other}' (expected \"text\" or \"jsonl\")"
            ))),
        }
    }
}

pub struct FileDestination {
    output_path: Mutex<Option<PathBuf>>,
    format: FileFormat,
    partials: bool,
    send_count: AtomicUsize,
}

impl FileDestination {
    pub fn new() -> Self {
        Self {
            output_path: Mutex::new(None),
            format: FileFormat::Text,
            partials: false,
            send_count: AtomicUsize::new(0),
        }
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn send_count(&self) -> usize {
        self.send_count.load(Ordering::Relaxed)
    }

    fn render(&self, event: &TranscriptEvent, metadata: &TextMetadata) -> Result<String, DestinationError> {
        match self.format {
            FileFormat::Text => Ok(format!("{}{}", metadata.prefix, event.text)),
            FileFormat::Jsonl => {
                serde_json::to_string(event).map_err(|e| DestinationError::SendFailed(e.to_string()))
            }
        }
    }
}

impl Default for FileDestination {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Destination for FileDestination {
    fn name(&self) -> &str {
        "file"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), DestinationError> {
        let path = config
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DestinationError::InitializationFailed("missing 'path' in config".to_string())
            })?;
        let format = match config.get("format") {
            None => FileFormat::Text,
            Some(v) => FileFormat::parse(v.as_str().ok_or_else(|| {
                DestinationError::InitializationFailed("'format' must be a string".to_string())
            })?)?,
        };

        self.format = format;
        self.partials = bool_option(&config, "partials", false)?;
        *self
            .output_path
            .lock()
            .map_err(|e| DestinationError::InitializationFailed(e.to_string()))? =
            Some(PathBuf::from(path));

        if self.partials && format == FileFormat::Text {
            tracing::warn!(path, "'partials' has no effect with the text format");
        }
        Ok(())
    }

    fn accepts_partials(&self) -> bool {
        self.partials && self.format == FileFormat::Jsonl
    }

    async fn send_event(
        &self,
        event: &TranscriptEvent,
        metadata: &TextMetadata,
    ) -> Result<(), DestinationError> {
        let line = self.render(event, metadata)?;
        let guard = self
            .output_path
            .lock()
            .map_err(|e| DestinationError::SendFailed(e.to_string()))?;
        let path = guard.as_ref().ok_or_else(|| {
            DestinationError::SendFailed("not initialized".to_string())
        })?;

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| DestinationError::SendFailed(e.to_string()))?;

        writeln!(file, "{line}").map_err(|e| DestinationError::SendFailed(e.to_string()))?;

        self.send_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.output_path
            .lock()
            .map(|p| p.is_some())
            .unwrap_or(false)
    }

    async fn shutdown(&self) -> Result<(), DestinationError> {
        Ok(())
    }
}
