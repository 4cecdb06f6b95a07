//! Command loop plus the two stages it feeds.
//!
//! ```text
//! input lines -> decoder -> plan queue -> synthesis stage -> play queue -> playback stage
//! ```
//!
//! `clear` only bumps the [`GenerationCounter`]; each stage compares a job's
//! stamp with the counter when it dequeues the job and silently drops
//! mismatches. Work already inside a collaborator call is never interrupted.

mod artifact;
mod play_stage;
mod synth_stage;


use crate::config::WorkerConfig;
use crate::events::EventSink;
use crate::generation::GenerationCounter;
use crate::jobs::{PlanItem, PlayItem};
use crate::playback::Player;
use crate::protocol::{decode_line, Command, Event, InputError};
use crate::tts::Synthesizer;
use artifact::ArtifactFactory;
use play_stage::PlayStage;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use synth_stage::SynthStage;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "pipeline";

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
    #[error("internal channel closed")]
    ChannelClosed,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Where artifacts are created; the system temp dir when `None`.
    pub artifact_dir: Option<PathBuf>,
    /// How long teardown waits for each stage before abandoning it.
    pub shutdown_timeout: Duration,
}

impl PipelineConfig {
    pub fn from_worker(worker: &WorkerConfig) -> Self {
        Self {
            artifact_dir: worker.artifact_dir.clone(),
            shutdown_timeout: worker.shutdown_timeout.duration(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_worker(&WorkerConfig::default())
    }
}

pub struct Pipeline<S, P, E> {
    pub synth: S,
    pub player: P,
    pub events: E,
    pub config: PipelineConfig,
}

struct Queues {
    generation: GenerationCounter,
    plan_tx: mpsc::UnboundedSender<PlanItem>,
    play_tx: mpsc::UnboundedSender<PlayItem>,
    stop_tx: watch::Sender<bool>,
}

impl<S, P, E> Pipeline<S, P, E>
where
    S: Synthesizer + Clone + 'static,
    P: Player + Clone + 'static,
    E: EventSink + Clone + 'static,
{
    /// Runs until `shutdown` or end of input, then tears both stages down.
    ///
    /// Emits `ready` once both stages are running.
    pub async fn run<R>(&self, input: R) -> Result<(), PipelineError>
    where
        R: AsyncBufRead + Unpin,
    {
        let generation = GenerationCounter::new();
        let (plan_tx, plan_rx) = mpsc::unbounded_channel();
        let (play_tx, play_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let synth_task = tokio::spawn(
            SynthStage {
                synth: self.synth.clone(),
                events: self.events.clone(),
                generation: generation.clone(),
                artifacts: ArtifactFactory::new(self.config.artifact_dir.clone()),
                plan_rx,
                play_tx: play_tx.clone(),
                stop: stop_rx.clone(),
            }
            .run(),
        );
        let play_task = tokio::spawn(
            PlayStage {
                player: self.player.clone(),
                events: self.events.clone(),
                generation: generation.clone(),
                play_rx,
                stop: stop_rx,
            }
            .run(),
        );

        self.events
            .emit(Event::Ready {
                player: self.player.name().to_owned(),
                model: self.synth.model_id().to_owned(),
            })
            .await;
        tracing::info!(
            target: LOG_TARGET,
            player = self.player.name(),
            model = self.synth.model_id(),
            "worker ready"
        );

        let queues = Queues {
            generation,
            plan_tx,
            play_tx,
            stop_tx,
        };
        let result = self.read_commands(input, &queues).await;

        self.teardown(queues, synth_task, play_task).await;
        result
    }

    async fn read_commands<R>(&self, mut input: R, queues: &Queues) -> Result<(), PipelineError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                tracing::info!(target: LOG_TARGET, "end of input; shutting down");
                return Ok(());
            }

            let decoded = std::str::from_utf8(&buf)
                .map_err(|e| InputError::InvalidEncoding(e.to_string()))
                .and_then(decode_line);

            match decoded {
                Ok(None) => {}
                Ok(Some(Command::Shutdown)) => {
                    tracing::info!(target: LOG_TARGET, "shutdown requested");
                    return Ok(());
                }
                Ok(Some(command)) => self.dispatch(command, queues).await?,
                Err(e) => {
                    tracing::debug!(target: LOG_TARGET, error = %e, "rejected input line");
                    self.events.emit(Event::input_error(e.to_string())).await;
                }
            }
        }
    }

    async fn dispatch(&self, command: Command, queues: &Queues) -> Result<(), PipelineError> {
        match command {
            Command::Speak(cmd) => {
                let job = cmd.into_job(queues.generation.read());
                self.events.emit(Event::Ack { id: job.id.clone() }).await;
                queues
                    .plan_tx
                    .send(PlanItem::Speak(job))
                    .map_err(|_| PipelineError::ChannelClosed)
            }
            Command::Pause(cmd) => {
                let job = cmd.into_job(queues.generation.read());
                self.events.emit(Event::Ack { id: job.id.clone() }).await;
                queues
                    .plan_tx
                    .send(PlanItem::Pause(job))
                    .map_err(|_| PipelineError::ChannelClosed)
            }
            Command::Clear => {
                let generation = queues.generation.bump();
                tracing::info!(target: LOG_TARGET, generation, "cleared");
                self.events.emit(Event::Cleared { generation }).await;
                Ok(())
            }
            Command::Shutdown => Ok(()),
        }
    }

    async fn teardown(&self, queues: Queues, synth_task: JoinHandle<()>, play_task: JoinHandle<()>) {
        let Queues {
            plan_tx,
            play_tx,
            stop_tx,
            ..
        } = queues;

        // Receivers may already be gone if a stage panicked.
        let _ = stop_tx.send(true);
        let _ = plan_tx.send(PlanItem::Shutdown);
        let _ = play_tx.send(PlayItem::Shutdown);
        drop(plan_tx);
        drop(play_tx);

        join_stage("synth", synth_task, self.config.shutdown_timeout).await;
        join_stage("play", play_task, self.config.shutdown_timeout).await;
        drop(stop_tx);
    }
}

async fn join_stage(stage: &'static str, mut handle: JoinHandle<()>, timeout: Duration) {
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(target: LOG_TARGET, stage, error = %e, "stage task failed");
        }
        Err(_) => {
            tracing::warn!(
                target: LOG_TARGET,
                stage,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "stage did not stop in time; abandoning it"
            );
            handle.abort();
        }
    }
}

/// Next queue entry, or `None` once the stop flag is raised or the queue closes.
pub(crate) async fn next_item<T>(
    rx: &mut mpsc::UnboundedReceiver<T>,
    stop: &mut watch::Receiver<bool>,
) -> Option<T> {
    loop {
        if *stop.borrow_and_update() {
            return None;
        }
        tokio::select! {
            biased;
            changed = stop.changed() => {
                if changed.is_err() {
                    return None;
                }
            }
            item = rx.recv() => return item,
        }
    }
}

/// True when `stamp` no longer matches the live generation; such jobs are dropped without an event.
pub(crate) fn is_stale(generation: &GenerationCounter, id: &str, stamp: i64) -> bool {
    if generation.is_current(stamp) {
        return false;
    }
    tracing::debug!(
        target: LOG_TARGET,
        id,
        stamp,
        current = generation.read(),
        "dropping stale job"
    );
    true
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
