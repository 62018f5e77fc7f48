use crate::model::{DecoderSession, SpeechModel};
use crate::sink::ResultSink;
use crate::state::{EngineState, StateCell};
use livescribe_audio::{AudioSource, AudioSourceFactory, FrameRead};
use livescribe_core::{CycleError, TranscriptEvent};
use std::sync::Arc;
use std::thread::JoinHandle;

/// What one capture → decode → emit cycle did.
#[derive(Debug)]
pub struct CycleReport {
    pub cycle: u64,
    /// Frames read from the source and fed to the session.
    pub frames: usize,
    /// Partial events emitted.
    pub partials: usize,
    /// Text of the final event, if one was emitted.
    pub final_text: Option<String>,
    pub outcome: Result<(), CycleError>,
}

impl CycleReport {
    fn new(cycle: u64) -> Self {
        Self {
            cycle,
            frames: 0,
            partials: 0,
            final_text: None,
            outcome: Ok(()),
        }
    }

    /// `true` when the cycle ended with a final event.
    pub fn is_complete(&self) -> bool {
        self.outcome.is_ok() && self.final_text.is_some()
    }
}

/// Everything a worker needs for one cycle; moved onto the worker thread.
pub(crate) struct CycleContext {
    pub cycle: u64,
    pub model: Arc<dyn SpeechModel>,
    pub sources: Arc<dyn AudioSourceFactory>,
    pub sink: Arc<dyn ResultSink>,
    pub state: Arc<StateCell>,
    pub frame_size: usize,
}

// ── WorkerHandle ──────────────────────────────────────────────

pub(crate) struct WorkerHandle {
    cycle: u64,
    thread: JoinHandle<CycleReport>,
}

impl WorkerHandle {
    pub(crate) fn spawn(ctx: CycleContext) -> std::io::Result<Self> {
        let cycle = ctx.cycle;
        let thread = std::thread::Builder::new()
            .name("transcription-worker".into())
            .spawn(move || run_cycle(ctx))?;
        Ok(Self { cycle, thread })
    }

    /// Wait for the worker thread to exit.
    pub(crate) fn join(self) -> Option<CycleReport> {
        match self.thread.join() {
            Ok(report) => Some(report),
            Err(_) => {
                tracing::error!(cycle = self.cycle, "transcription worker panicked");
                None
            }
        }
    }
}

/// Stores `Idle` when dropped, including on unwind, so a failed or panicking
/// cycle never leaves the engine stuck.
struct ReturnToIdle(Arc<StateCell>);

impl Drop for ReturnToIdle {
    fn drop(&mut self) {
        self.0.store(EngineState::Idle);
    }
}

// ── Cycle ─────────────────────────────────────────────────────

pub(crate) fn run_cycle(ctx: CycleContext) -> CycleReport {
    let _idle = ReturnToIdle(Arc::clone(&ctx.state));
    let mut report = CycleReport::new(ctx.cycle);

    tracing::info!(
        cycle = ctx.cycle,
        model = %ctx.model.name(),
        source = %ctx.sources.describe(),
        "transcription cycle started"
    );

    report.outcome = capture_and_decode(&ctx, &mut report);

    match &report.outcome {
        Ok(()) => tracing::info!(
            cycle = ctx.cycle,
            frames = report.frames,
            partials = report.partials,
            "transcription cycle finished"
        ),
        Err(e) => tracing::error!(
            cycle = ctx.cycle,
            frames = report.frames,
            "transcription cycle aborted: {e}"
        ),
    }

    report
}

fn capture_and_decode(ctx: &CycleContext, report: &mut CycleReport) -> Result<(), CycleError> {
    let mut session = ctx.model.create_session()?;

    // On failure the session is dropped here, unfinished.
    let mut source = ctx
        .sources
        .open(ctx.model.sample_rate(), ctx.frame_size)
        .map_err(CycleError::DeviceUnavailable)?;

    let streamed = stream_frames(ctx, source.as_mut(), session.as_mut(), report);

    let outcome = match streamed {
        Ok(()) => finalize(ctx, session, report),
        Err(e) => {
            drop(session);
            Err(e)
        }
    };

    release_source(ctx, source);
    outcome
}

/// Read → feed → partial decode → emit, for as long as the engine is `Recording`.
fn stream_frames(
    ctx: &CycleContext,
    source: &mut dyn AudioSource,
    session: &mut dyn DecoderSession,
    report: &mut CycleReport,
) -> Result<(), CycleError> {
    let mut frame = vec![0i16; ctx.frame_size];

    while ctx.state.load() == EngineState::Recording {
        match source.read_frame(&mut frame).map_err(CycleError::Capture)? {
            FrameRead::Full => {}
            FrameRead::EndOfStream => {
                if ctx
                    .state
                    .transition(EngineState::Recording, EngineState::Finalizing)
                    .is_ok()
                {
                    tracing::debug!(cycle = ctx.cycle, "audio source exhausted");
                }
                break;
            }
        }
        report.frames += 1;

        session.feed(&frame)?;
        let text = session.intermediate_decode()?;
        ctx.sink.emit(TranscriptEvent::partial(ctx.cycle, text));
        report.partials += 1;
    }

    Ok(())
}

fn finalize(
    ctx: &CycleContext,
    session: Box<dyn DecoderSession>,
    report: &mut CycleReport,
) -> Result<(), CycleError> {
    let text = session.finish()?;
    tracing::debug!(cycle = ctx.cycle, text = %text, "final hypothesis");
    ctx.sink
        .emit(TranscriptEvent::final_result(ctx.cycle, text.clone()));
    report.final_text = Some(text);
    Ok(())
}

fn release_source(ctx: &CycleContext, mut source: Box<dyn AudioSource>) {
    if let Err(e) = source.stop() {
        tracing::warn!(cycle = ctx.cycle, "failed to stop audio source: {e}");
    }
}
