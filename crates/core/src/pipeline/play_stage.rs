use crate::events::EventSink;
use crate::generation::GenerationCounter;
use crate::jobs::{PauseJob, PlayItem, SynthResult};
use crate::pipeline::artifact::remove_artifact;
use crate::pipeline::{elapsed_ms, is_stale, next_item};
use crate::playback::Player;
use crate::protocol::{ErrorStage, Event};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

const LOG_TARGET: &str = "pipeline::play";

/// Drains the play queue one item at a time. A pause holds back everything
/// queued behind it.
pub(crate) struct PlayStage<P, E> {
    pub(crate) player: P,
    pub(crate) events: E,
    pub(crate) generation: GenerationCounter,
    pub(crate) play_rx: mpsc::UnboundedReceiver<PlayItem>,
    pub(crate) stop: watch::Receiver<bool>,
}

impl<P, E> PlayStage<P, E>
where
    P: Player,
    E: EventSink,
{
    pub(crate) async fn run(mut self) {
        tracing::debug!(target: LOG_TARGET, player = self.player.name(), "playback stage started");

        while let Some(item) = next_item(&mut self.play_rx, &mut self.stop).await {
            match item {
                PlayItem::Shutdown => break,
                PlayItem::Pause(job) => self.pause(job).await,
                PlayItem::Synthesized(result) => self.play(result).await,
            }
        }

        tracing::debug!(target: LOG_TARGET, "playback stage stopped");
    }

    async fn pause(&self, job: PauseJob) {
        if is_stale(&self.generation, &job.id, job.generation) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(job.pause_ms)).await;
        self.events
            .emit(Event::PauseDone {
                id: job.id,
                pause_ms: job.pause_ms,
            })
            .await;
    }

    async fn play(&self, result: SynthResult) {
        let SynthResult {
            job,
            artifact,
            synth_ms,
        } = result;

        if is_stale(&self.generation, &job.id, job.generation) {
            remove_artifact(artifact);
            return;
        }

        let started = Instant::now();
        let outcome = self.player.play(artifact.to_path_buf()).await;
        let play_ms = elapsed_ms(started);
        remove_artifact(artifact);

        let failure = match outcome {
            Ok(outcome) if outcome.is_success() => None,
            Ok(outcome) => Some(outcome.failure_message(self.player.name())),
            Err(e) => Some(e.to_string()),
        };

        let event = match failure {
            None => {
                tracing::debug!(target: LOG_TARGET, id = %job.id, play_ms, "played");
                Event::PlayDone {
                    id: job.id,
                    synth_ms,
                    play_ms,
                }
            }
            Some(message) => {
                tracing::warn!(target: LOG_TARGET, id = %job.id, %message, "playback failed");
                Event::job_error(job.id, ErrorStage::Play, message)
            }
        };
        self.events.emit(event).await;
    }
}
