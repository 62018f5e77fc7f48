use crate::model::{DecoderSession, ModelAssets, SpeechModel};
use livescribe_core::{DecodeError, ModelError};
use vosk::{DecodingState, Model, Recognizer};

const VOSK_SAMPLE_RATE: u32 = 16000;

/// Vosk acoustic model, optionally constrained by a phrase grammar.
///
/// The scorer asset is read as a grammar: one phrase per line, blank lines
/// ignored. An empty grammar file means free-form recognition.
pub struct VoskModel {
    model: Model,
    grammar: Vec<String>,
    name: String,
}

impl VoskModel {
    pub fn load(assets: &ModelAssets) -> Result<Self, ModelError> {
        let model_str = assets.model_path.to_str().ok_or_else(|| {
            ModelError::ModelLoadFailed(format!(
                "model path is not valid UTF-8: {}",
                assets.model_path.display()
            ))
        })?;

        let model = Model::new(model_str).ok_or_else(|| {
            ModelError::ModelLoadFailed(format!(
                "vosk rejected model at {}",
                assets.model_path.display()
            ))
        })?;

        let grammar_text = std::fs::read_to_string(&assets.scorer_path)
            .map_err(|e| ModelError::ModelLoadFailed(format!("failed to read scorer: {e}")))?;
        let grammar: Vec<String> = grammar_text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        let name = assets
            .model_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vosk".to_string());

        tracing::info!(
            model = %name,
            grammar_phrases = grammar.len(),
            "vosk model loaded"
        );

        Ok(Self {
            model,
            grammar,
            name,
        })
    }
}

impl SpeechModel for VoskModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> u32 {
        VOSK_SAMPLE_RATE
    }

    fn create_session(&self) -> Result<Box<dyn DecoderSession>, DecodeError> {
        let rate = VOSK_SAMPLE_RATE as f32;
        let recognizer = if self.grammar.is_empty() {
            Recognizer::new(&self.model, rate)
        } else {
            Recognizer::new_with_grammar(&self.model, rate, self.grammar.as_slice())
        }
        .ok_or_else(|| DecodeError::SessionCreate("vosk recognizer creation failed".to_string()))?;

        Ok(Box::new(VoskSession {
            recognizer,
            committed: Vec::new(),
        }))
    }
}

/// Vosk splits audio into utterances on its own; finished utterances are
/// kept in `committed` so hypotheses cover the whole cycle.
pub struct VoskSession {
    recognizer: Recognizer,
    committed: Vec<String>,
}

impl VoskSession {
    fn commit(&mut self, text: &str) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.committed.push(trimmed.to_string());
        }
    }

    fn joined_with(&self, tail: &str) -> String {
        let mut parts: Vec<&str> = self.committed.iter().map(String::as_str).collect();
        let tail = tail.trim();
        if !tail.is_empty() {
            parts.push(tail);
        }
        parts.join(" ")
    }
}

impl DecoderSession for VoskSession {
    fn feed(&mut self, samples: &[i16]) -> Result<(), DecodeError> {
        match self.recognizer.accept_waveform(samples) {
            DecodingState::Finalized => {
                let text = self
                    .recognizer
                    .result()
                    .single()
                    .map(|r| r.text.to_string())
                    .unwrap_or_default();
                self.commit(&text);
                Ok(())
            }
            DecodingState::Running => Ok(()),
            DecodingState::Failed => Err(DecodeError::Feed("vosk failed to decode frame".to_string())),
        }
    }

    fn intermediate_decode(&mut self) -> Result<String, DecodeError> {
        let partial = self.recognizer.partial_result().partial.to_string();
        Ok(self.joined_with(&partial))
    }

    fn finish(mut self: Box<Self>) -> Result<String, DecodeError> {
        let tail = self
            .recognizer
            .final_result()
            .single()
            .map(|r| r.text.to_string())
            .unwrap_or_default();
        Ok(self.joined_with(&tail))
    }
}
