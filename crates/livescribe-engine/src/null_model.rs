use crate::model::{DecoderSession, ModelAssets, SpeechModel};
use livescribe_core::DecodeError;

const NULL_SAMPLE_RATE: u32 = 16000;

/// Deterministic stand-in model: hypotheses describe how much audio was fed.
pub struct NullModel {
    name: String,
}

impl NullModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn from_assets(assets: &ModelAssets) -> Self {
        let name = assets
            .model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "null".to_string());
        Self::new(&name)
    }
}

impl Default for NullModel {
    fn default() -> Self {
        Self::new("null")
    }
}

impl SpeechModel for NullModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> u32 {
        NULL_SAMPLE_RATE
    }

    fn create_session(&self) -> Result<Box<dyn DecoderSession>, DecodeError> {
        Ok(Box::new(NullSession::default()))
    }
}

#[derive(Default)]
pub struct NullSession {
    frames: usize,
    samples: usize,
}

impl NullSession {
    fn describe(&self) -> String {
        format!("[null] {} frames", self.frames)
    }
}

impl DecoderSession for NullSession {
    fn feed(&mut self, samples: &[i16]) -> Result<(), DecodeError> {
        self.frames += 1;
        self.samples += samples.len();
        tracing::trace!("NullSession fed frame #{}, {} samples", self.frames, samples.len());
        Ok(())
    }

    fn intermediate_decode(&mut self) -> Result<String, DecodeError> {
        Ok(self.describe())
    }

    fn finish(self: Box<Self>) -> Result<String, DecodeError> {
        if self.frames == 0 {
            return Ok(String::new());
        }
        Ok(format!("{}, {} samples", self.describe(), self.samples))
    }
}
