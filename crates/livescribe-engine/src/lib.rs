pub mod engine;
pub mod loader;
pub mod model;
pub mod null_model;
pub mod registry;
pub mod sink;
mod state;
#[cfg(feature = "vosk")]
pub mod vosk_model;
mod worker;

pub use engine::{StartOutcome, TranscriptionEngine};
pub use loader::ModelLoader;
pub use model::{DecoderSession, ModelAssets, SpeechModel};
pub use null_model::NullModel;
pub use registry::{ModelFactory, ModelRegistry};
pub use sink::{ChannelSink, ResultSink};
pub use state::EngineState;
#[cfg(feature = "vosk")]
pub use vosk_model::VoskModel;
pub use worker::CycleReport;
