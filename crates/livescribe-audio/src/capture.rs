use crate::device::DeviceManager;
use crate::source::{f32_to_i16, AudioSource, AudioSourceFactory, FrameRead};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use livescribe_core::AudioError;
use ringbuf::traits::{Consumer, Producer};
use ringbuf::HeapCons;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(2);

// ── CpalSource ────────────────────────────────────────────────

/// Microphone capture backed by a cpal input stream.
///
/// The stream callback pushes f32 samples into a ring buffer; `read_frame`
/// drains it on the reading thread and converts to i16. Overflow in the
/// callback is silently dropped.
pub struct CpalSource {
    stream: Stream,
    consumer: HeapCons<f32>,
    stream_error: Arc<Mutex<Option<String>>>,
    scratch: Vec<f32>,
    sample_rate: u32,
}

impl CpalSource {
    pub fn open(
        device: &Device,
        sample_rate: u32,
        frame_size: usize,
        ring_capacity: usize,
    ) -> Result<Self, AudioError> {
        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (mut producer, consumer) = crate::create_ring_buffer(ring_capacity.max(frame_size));
        let stream_error = Arc::new(Mutex::new(None));
        let error_slot = Arc::clone(&stream_error);

        let err_callback = move |err: cpal::StreamError| {
            tracing::error!("capture stream error: {}", err);
            if let Ok(mut slot) = error_slot.lock() {
                *slot = Some(err.to_string());
            }
        };

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    producer.push_slice(data);
                },
                err_callback,
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        Ok(Self {
            stream,
            consumer,
            stream_error,
            scratch: vec![0.0; frame_size],
            sample_rate,
        })
    }

    fn take_stream_error(&self) -> Option<String> {
        self.stream_error.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl AudioSource for CpalSource {
    fn read_frame(&mut self, frame: &mut [i16]) -> Result<FrameRead, AudioError> {
        if self.scratch.len() < frame.len() {
            self.scratch.resize(frame.len(), 0.0);
        }

        let mut filled = 0;
        while filled < frame.len() {
            if let Some(reason) = self.take_stream_error() {
                return Err(AudioError::StreamError(reason));
            }

            let wanted = frame.len() - filled;
            let n = self.consumer.pop_slice(&mut self.scratch[..wanted]);
            for (dst, &src) in frame[filled..filled + n].iter_mut().zip(&self.scratch[..n]) {
                *dst = f32_to_i16(src);
            }
            filled += n;

            if filled < frame.len() {
                std::thread::sleep(POLL_INTERVAL);
            }
        }

        Ok(FrameRead::Full)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.stream
            .pause()
            .map_err(|e| AudioError::StreamError(e.to_string()))
    }
}

// ── CpalSourceFactory ─────────────────────────────────────────

/// Opens the named input device (or the host default) once per cycle.
pub struct CpalSourceFactory {
    device_name: String,
    ring_seconds: u32,
}

impl CpalSourceFactory {
    pub fn new(device_name: &str, ring_seconds: u32) -> Self {
        Self {
            device_name: device_name.to_string(),
            ring_seconds: ring_seconds.max(1),
        }
    }
}

impl AudioSourceFactory for CpalSourceFactory {
    fn describe(&self) -> String {
        format!("input device '{}'", self.device_name)
    }

    fn open(&self, sample_rate: u32, frame_size: usize) -> Result<Box<dyn AudioSource>, AudioError> {
        let device = DeviceManager::new().get_input_device(&self.device_name)?;
        let ring_capacity = sample_rate as usize * self.ring_seconds as usize;
        let source = CpalSource::open(&device, sample_rate, frame_size, ring_capacity)?;
        tracing::debug!(
            device = %self.device_name,
            sample_rate,
            frame_size,
            "capture stream opened"
        );
        Ok(Box::new(source))
    }
}
