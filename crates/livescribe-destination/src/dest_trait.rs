use async_trait::async_trait;
use livescribe_core::{DestinationError, TextMetadata, TranscriptEvent};

/// A consumer of transcript events.
///
/// Implementations are registered via [`DestinationRegistry`](crate::DestinationRegistry)
/// and receive events through [`send_event`](Self::send_event) with per-route
/// [`TextMetadata`]. All calls come from the single delivery task owned by
/// [`DestinationHost`](crate::DestinationHost), in emission order.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Returns the destination's plugin name (e.g. `"file"`, `"console"`).
    fn name(&self) -> &str;
    /// One-time initialisation with destination-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), DestinationError>;
    /// Whether partial hypotheses should be delivered. Finals always are.
    fn accepts_partials(&self) -> bool;
    async fn send_event(
        &self,
        event: &TranscriptEvent,
        metadata: &TextMetadata,
    ) -> Result<(), DestinationError>;
    /// Returns `true` if the destination is currently able to accept events.
    fn is_healthy(&self) -> bool;
    async fn shutdown(&self) -> Result<(), DestinationError>;
}

/// Reads an optional boolean option, rejecting values of the wrong type.
pub(crate) fn bool_option(
    config: &toml::Value,
    key: &str,
    default: bool,
) -> Result<bool, DestinationError> {
    match config.get(key) {
        None => Ok(default),
        Some(v) => v.as_bool().ok_or_else(|| {
            DestinationError::InitializationFailed(format!("'{key}' must be a boolean"))
        }),
    }
}
