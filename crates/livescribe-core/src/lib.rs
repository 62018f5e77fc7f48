pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, AudioConfig, DestinationRouteConfig, GeneralConfig, ModelConfig};
pub use error::{
    AudioError, ConfigError, CycleError, DecodeError, DestinationError, EngineError, ModelError,
};
pub use types::{TextMetadata, TranscriptEvent};
