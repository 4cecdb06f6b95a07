#![deny(warnings)]

use anyhow::Context;
use clap::Parser;
use speech_worker_core::config::{
    parse_list, resolve_optional_string, resolve_string_with_default, Env, ModelId,
    PlayerPriority, ShutdownTimeout, StdEnv, SynthesisBackend, WorkerConfig,
    DEFAULT_SHUTDOWN_TIMEOUT_MS, DEFAULT_MODEL_ID, DEFAULT_PLAYERS, ENV_MODEL, ENV_PLAYERS,
    ENV_SYNTH_COMMAND,
};
use speech_worker_core::events::{EventSink, JsonLinesEmitter};
use speech_worker_core::pipeline::{Pipeline, PipelineConfig};
use speech_worker_core::playback::{discover_player, Player, SilentPlayer};
use speech_worker_core::protocol::Event;
use speech_worker_core::tts::{CommandSynthesizer, Synthesizer, ToneSynthesizer};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "speech-worker")]
#[command(about = "Persistent text-to-speech worker driven by JSON lines on stdin")]
struct Args {
    /// Model identifier reported in `ready` and passed to the synthesis command.
    #[arg(long, env = ENV_MODEL)]
    model: Option<String>,

    /// Comma separated player programs, tried in order.
    #[arg(long, env = ENV_PLAYERS)]
    players: Option<String>,

    /// External synthesis program; the built-in tone synthesizer is used when unset.
    #[arg(long, env = ENV_SYNTH_COMMAND)]
    synth_command: Option<String>,

    /// Comma separated voice names understood by the synthesis command.
    #[arg(long)]
    voices: Option<String>,

    /// Skip audio output and wait out each clip's duration instead.
    #[arg(long)]
    no_audio: bool,

    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_MS)]
    shutdown_timeout_ms: u64,

    #[arg(long, default_value = "info")]
    log_level: String,
}

type Worker<W> = Pipeline<Arc<dyn Synthesizer>, Arc<dyn Player>, JsonLinesEmitter<W>>;

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Exit {
    Clean,
    StartupFailed,
    InputFailed,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        match exit {
            Exit::Clean => ExitCode::SUCCESS,
            Exit::StartupFailed | Exit::InputFailed => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let events = JsonLinesEmitter::stdout();

    if let Err(e) = init_tracing(&args.log_level) {
        return report_fatal(&events, e).await.into();
    }

    run_worker(args, &StdEnv, events, BufReader::new(tokio::io::stdin()))
        .await
        .into()
}

/// Bootstraps the collaborators and serves `input` until shutdown.
///
/// A startup failure writes exactly one `fatal` event and nothing else.
async fn run_worker<W, R>(
    args: Args,
    env: &impl Env,
    events: JsonLinesEmitter<W>,
    input: R,
) -> Exit
where
    W: AsyncWrite + Unpin + Send + 'static,
    R: AsyncBufRead + Unpin,
{
    let worker = match bootstrap(args, env, events.clone()) {
        Ok(worker) => worker,
        Err(e) => return report_fatal(&events, e).await,
    };

    match worker.run(input).await {
        Ok(()) => Exit::Clean,
        Err(e) => {
            tracing::error!(error = %e, "worker stopped");
            Exit::InputFailed
        }
    }
}

async fn report_fatal<W>(events: &JsonLinesEmitter<W>, error: anyhow::Error) -> Exit
where
    W: AsyncWrite + Unpin + Send,
{
    let message = format!("{error:#}");
    tracing::error!(error = %message, "startup failed");
    events.emit(Event::Fatal { message }).await;
    Exit::StartupFailed
}

fn bootstrap<W>(args: Args, env: &impl Env, events: JsonLinesEmitter<W>) -> anyhow::Result<Worker<W>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let cfg = build_config(args, env)?;
    tracing::info!(
        model = cfg.model.as_str(),
        players = ?cfg.players.as_slice(),
        silent = cfg.silent_playback,
        "config loaded"
    );

    Ok(Pipeline {
        synth: build_synthesizer(&cfg)?,
        player: build_player(&cfg)?,
        events,
        config: PipelineConfig::from_worker(&cfg),
    })
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    // stdout carries the event stream.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: Args, env: &impl Env) -> anyhow::Result<WorkerConfig> {
    let model = ModelId::new(resolve_string_with_default(
        args.model,
        ENV_MODEL,
        env,
        DEFAULT_MODEL_ID,
    ))?;
    let players = PlayerPriority::parse(&resolve_string_with_default(
        args.players,
        ENV_PLAYERS,
        env,
        DEFAULT_PLAYERS,
    ));

    let synthesis = match resolve_optional_string(args.synth_command, ENV_SYNTH_COMMAND, env) {
        Some(program) => SynthesisBackend::Command {
            program,
            voices: args.voices.as_deref().map(parse_list).unwrap_or_default(),
        },
        None => SynthesisBackend::Tone,
    };

    Ok(WorkerConfig {
        model,
        players,
        synthesis,
        silent_playback: args.no_audio,
        artifact_dir: args.artifact_dir,
        shutdown_timeout: ShutdownTimeout::new(args.shutdown_timeout_ms)?,
    })
}

fn build_synthesizer(cfg: &WorkerConfig) -> anyhow::Result<Arc<dyn Synthesizer>> {
    match &cfg.synthesis {
        SynthesisBackend::Tone => Ok(Arc::new(ToneSynthesizer::new())),
        SynthesisBackend::Command { program, voices } => {
            let synth = CommandSynthesizer::locate(program, cfg.model.as_str())
                .context("Failed to load synthesis engine")?
                .with_voices(voices.clone());
            Ok(Arc::new(synth))
        }
    }
}

fn build_player(cfg: &WorkerConfig) -> anyhow::Result<Arc<dyn Player>> {
    if cfg.silent_playback {
        return Ok(Arc::new(SilentPlayer::new()));
    }
    Ok(Arc::new(discover_player(cfg.players.as_slice())?))
}
