use crate::source::{AudioSource, AudioSourceFactory, FrameRead};
use livescribe_core::AudioError;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Replays a mono 16-bit WAV file as if it were a capture device.
///
/// The final short frame is zero-padded; the read after it reports
/// [`FrameRead::EndOfStream`]. With pacing enabled, reads are throttled to
/// real time so partial hypotheses arrive at the same rate as live capture.
pub struct WavSource {
    reader: hound::WavReader<BufReader<File>>,
    sample_rate: u32,
    exhausted: bool,
    paced: bool,
    next_deadline: Option<Instant>,
}

impl WavSource {
    pub fn open(path: &Path, sample_rate: u32, paced: bool) -> Result<Self, AudioError> {
        let reader = hound::WavReader::open(path).map_err(|e| AudioError::FileOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let spec = reader.spec();
        if spec.channels != 1
            || spec.bits_per_sample != 16
            || spec.sample_format != hound::SampleFormat::Int
        {
            return Err(AudioError::UnsupportedFormat(format!(
                "expected mono 16-bit PCM, got {} ch / {} bit {:?}",
                spec.channels, spec.bits_per_sample, spec.sample_format
            )));
        }
        if spec.sample_rate != sample_rate {
            return Err(AudioError::UnsupportedFormat(format!(
                "expected {} Hz, got {} Hz",
                sample_rate, spec.sample_rate
            )));
        }

        Ok(Self {
            reader,
            sample_rate,
            exhausted: false,
            paced,
            next_deadline: None,
        })
    }

    fn pace(&mut self, samples: usize) {
        let frame_period =
            Duration::from_secs_f64(samples as f64 / self.sample_rate as f64);
        let deadline = self.next_deadline.unwrap_or_else(Instant::now) + frame_period;
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        self.next_deadline = Some(deadline);
    }
}

impl AudioSource for WavSource {
    fn read_frame(&mut self, frame: &mut [i16]) -> Result<FrameRead, AudioError> {
        if self.exhausted {
            return Ok(FrameRead::EndOfStream);
        }

        let mut filled = 0;
        for sample in self.reader.samples::<i16>().take(frame.len()) {
            frame[filled] = sample.map_err(|e| AudioError::StreamError(e.to_string()))?;
            filled += 1;
        }

        if filled == 0 {
            self.exhausted = true;
            return Ok(FrameRead::EndOfStream);
        }
        if filled < frame.len() {
            frame[filled..].fill(0);
            self.exhausted = true;
        }

        if self.paced {
            self.pace(frame.len());
        }
        Ok(FrameRead::Full)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.exhausted = true;
        Ok(())
    }
}

pub struct WavSourceFactory {
    path: PathBuf,
    paced: bool,
}

impl WavSourceFactory {
    pub fn new(path: impl Into<PathBuf>, paced: bool) -> Self {
        Self {
            path: path.into(),
            paced,
        }
    }
}

impl AudioSourceFactory for WavSourceFactory {
    fn describe(&self) -> String {
        format!("wav file {}", self.path.display())
    }

    fn open(&self, sample_rate: u32, _frame_size: usize) -> Result<Box<dyn AudioSource>, AudioError> {
        Ok(Box::new(WavSource::open(&self.path, sample_rate, self.paced)?))
    }
}
