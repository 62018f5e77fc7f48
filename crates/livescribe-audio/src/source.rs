use livescribe_core::AudioError;

/// Outcome of a single [`AudioSource::read_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRead {
    /// The frame buffer was filled completely.
    Full,
    /// The source has no more audio; the frame buffer is untouched.
    EndOfStream,
}

/// A mono 16-bit PCM source that yields fixed-size frames.
///
/// Sources are opened, read, stopped and dropped on a single thread, so
/// implementations do not need to be `Send` (cpal streams are not on every
/// platform). Dropping a source releases the underlying device.
pub trait AudioSource {
    /// Fill `frame` with the next `frame.len()` samples, blocking until
    /// enough audio is available.
    fn read_frame(&mut self, frame: &mut [i16]) -> Result<FrameRead, AudioError>;

    /// Sample rate the source delivers, in Hz.
    fn sample_rate(&self) -> u32;

    /// Stop capturing. The source is released when it is dropped.
    fn stop(&mut self) -> Result<(), AudioError>;
}

/// Opens a fresh [`AudioSource`] for each transcription cycle.
pub trait AudioSourceFactory: Send + Sync {
    /// Human-readable description, used in logs.
    fn describe(&self) -> String;

    fn open(&self, sample_rate: u32, frame_size: usize) -> Result<Box<dyn AudioSource>, AudioError>;
}

/// Convert a normalized f32 sample to 16-bit PCM, clamping out-of-range input.
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}
