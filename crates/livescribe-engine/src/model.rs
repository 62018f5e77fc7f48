use livescribe_core::DecodeError;
use std::path::PathBuf;

/// Resolved on-disk locations of a model and its scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAssets {
    pub model_path: PathBuf,
    pub scorer_path: PathBuf,
}

/// A loaded, immutable speech model.
///
/// One model is shared (by `Arc`) between the engine and at most one worker
/// at a time; all per-utterance state lives in the sessions it creates.
pub trait SpeechModel: Send + Sync {
    fn name(&self) -> &str;

    /// Sample rate the model expects, in Hz.
    fn sample_rate(&self) -> u32;

    fn create_session(&self) -> Result<Box<dyn DecoderSession>, DecodeError>;
}

/// A streaming decode context for one transcription cycle.
///
/// Dropping a session without calling [`finish`](Self::finish) releases it
/// and discards any buffered audio.
pub trait DecoderSession {
    fn feed(&mut self, samples: &[i16]) -> Result<(), DecodeError>;

    /// Best-effort hypothesis for the audio fed so far.
    fn intermediate_decode(&mut self) -> Result<String, DecodeError>;

    /// Flush buffered context, return the final hypothesis and release the session.
    fn finish(self: Box<Self>) -> Result<String, DecodeError>;
}
