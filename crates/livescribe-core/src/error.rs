use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate devices: {0}")]
    DeviceEnumeration(String),

    #[error("failed to build stream: {0}")]
    StreamBuild(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to open audio file {path}: {reason}")]
    FileOpen { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model and scorer names must not be blank")]
    BlankName,

    #[error("model asset not found: {}", .0.display())]
    AssetNotFound(PathBuf),

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("model backend not found: {0}")]
    BackendNotFound(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to create decoder session: {0}")]
    SessionCreate(String),

    #[error("failed to feed audio: {0}")]
    Feed(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("precondition violated: {0}")]
    PreconditionViolation(&'static str),

    #[error("engine has been disposed")]
    Disposed,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

/// Why a single transcription cycle ended without completing.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(AudioError),

    #[error("capture failed: {0}")]
    Capture(AudioError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("destination initialization failed: {0}")]
    InitializationFailed(String),

    #[error("failed to send text: {0}")]
    SendFailed(String),

    #[error("destination not found: {0}")]
    NotFound(String),
}
