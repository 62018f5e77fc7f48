use serde::Serialize;

/// One hypothesis emitted by a transcription cycle.
///
/// Within a cycle, any number of partial events (`is_final == false`) precede
/// exactly one final event; nothing is emitted for that cycle afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEvent {
    pub text: String,
    #[serde(rename = "isFinal")]
    pub is_final: bool,
    pub cycle: u64,
}

impl TranscriptEvent {
    pub fn partial(cycle: u64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            cycle,
        }
    }

    pub fn final_result(cycle: u64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            cycle,
        }
    }
}

/// Per-route data handed to a destination alongside each event.
#[derive(Debug, Clone)]
pub struct TextMetadata {
    pub prefix: String,
}
