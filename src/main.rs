use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use livescribe_audio::{AudioSourceFactory, CpalSourceFactory, DeviceManager, WavSourceFactory};
use livescribe_core::AppConfig;
use livescribe_destination::DestinationHost;
use livescribe_engine::{ChannelSink, ModelLoader, NullModel, StartOutcome, TranscriptionEngine};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "livescribe", about = "Streaming speech-to-text from a microphone")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one transcription cycle until Ctrl-C, the duration, or end of input
    Listen {
        /// Replay a 16-bit mono WAV file instead of capturing from a device
        #[arg(long)]
        input: Option<PathBuf>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Read the WAV input as fast as possible instead of in real time
        #[arg(long, requires = "input")]
        fast: bool,
    },
    /// List audio input devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        AppConfig::load_from_file(&cli.config)
            .with_context(|| format!("failed to load config from {:?}", cli.config))?
    } else {
        AppConfig::default()
    };

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    if !cli.config.exists() {
        tracing::warn!("config file {:?} not found, using defaults", cli.config);
    }

    match cli.command {
        Command::Devices => list_devices(),
        Command::Listen {
            input,
            duration,
            fast,
        } => listen(config, input, duration, fast).await,
    }
}

fn list_devices() -> Result<()> {
    let devices = DeviceManager::new()
        .input_device_names()
        .context("failed to enumerate input devices")?;
    if devices.is_empty() {
        println!("no input devices found");
    }
    for (name, is_default) in devices {
        let marker = if is_default { "*" } else { " " };
        println!("{marker} {name}");
    }
    Ok(())
}

async fn listen(
    config: AppConfig,
    input: Option<PathBuf>,
    duration: Option<u64>,
    fast: bool,
) -> Result<()> {
    let sources: Arc<dyn AudioSourceFactory> = match &input {
        Some(path) => Arc::new(WavSourceFactory::new(path, !fast)),
        None => Arc::new(CpalSourceFactory::new(
            &config.audio.device_name,
            config.audio.ring_seconds,
        )),
    };

    // Destinations
    let (sink, event_rx) = ChannelSink::channel();
    let mut dest_host = DestinationHost::new(event_rx);
    if config.destinations.is_empty() {
        tracing::info!("no destinations configured, printing to console");
        dest_host
            .add_route("console", "", toml_table())
            .await
            .context("failed to add console destination")?;
    }
    for route in &config.destinations {
        dest_host
            .add_route(&route.plugin, &route.prefix, route.extra.clone())
            .await
            .with_context(|| format!("failed to add destination '{}'", route.plugin))?;
    }
    dest_host.start();

    // Engine
    let engine = TranscriptionEngine::new(
        ModelLoader::from_config(&config.model),
        sources,
        Arc::new(sink),
        config.audio.frame_size,
    );

    if config.model.backend == "null" && config.model.model.trim().is_empty() {
        tracing::warn!("no model configured, using the null backend");
        engine.install_model(Arc::new(NullModel::default()))?;
    } else {
        engine
            .load(&config.model.model, &config.model.scorer)
            .with_context(|| {
                format!(
                    "failed to load model '{}' with scorer '{}' from {:?}",
                    config.model.model, config.model.scorer, config.model.models_dir
                )
            })?;
    }

    match engine.start()? {
        StartOutcome::Started { cycle } => tracing::info!(cycle, "listening, press Ctrl-C to stop"),
        other => anyhow::bail!("engine refused to start: {other:?}"),
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            tracing::info!("interrupted");
        }
        _ = deadline(duration) => tracing::info!("duration elapsed"),
        _ = cycle_ended(&engine) => tracing::info!("input ended"),
    }

    engine.stop();
    let report = tokio::task::block_in_place(|| engine.wait());
    engine.dispose()?;
    // Dropping the engine drops the last event sender, which ends the delivery task.
    drop(engine);

    let delivered = dest_host.shutdown().await;
    tracing::info!(delivered, "shutting down");

    match report {
        Some(report) => {
            tracing::info!(
                cycle = report.cycle,
                frames = report.frames,
                partials = report.partials,
                "cycle summary"
            );
            report.outcome.context("transcription cycle failed")
        }
        None => anyhow::bail!("transcription worker exited abnormally"),
    }
}

fn toml_table() -> toml::Value {
    toml::Value::Table(Default::default())
}

async fn deadline(seconds: Option<u64>) {
    match seconds {
        Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
        None => std::future::pending().await,
    }
}

/// Resolves once the worker leaves `Recording` on its own (end of input or a
/// capture error).
async fn cycle_ended(engine: &TranscriptionEngine) {
    let mut tick = tokio::time::interval(Duration::from_millis(50));
    while engine.is_recording() {
        tick.tick().await;
    }
}
