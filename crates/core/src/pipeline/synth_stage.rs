use crate::events::EventSink;
use crate::generation::GenerationCounter;
use crate::jobs::{PauseJob, PlanItem, PlayItem, SpeakJob, SynthResult};
use crate::pipeline::artifact::{remove_artifact, ArtifactFactory};
use crate::pipeline::{elapsed_ms, is_stale, next_item};
use crate::protocol::{ErrorStage, Event};
use crate::tts::{SynthesisRequest, Synthesizer};
use std::time::Instant;
use tokio::sync::{mpsc, watch};

const LOG_TARGET: &str = "pipeline::synth";

/// Drains the plan queue one item at a time, turning speak jobs into
/// artifacts and forwarding pauses untouched.
pub(crate) struct SynthStage<S, E> {
    pub(crate) synth: S,
    pub(crate) events: E,
    pub(crate) generation: GenerationCounter,
    pub(crate) artifacts: ArtifactFactory,
    pub(crate) plan_rx: mpsc::UnboundedReceiver<PlanItem>,
    pub(crate) play_tx: mpsc::UnboundedSender<PlayItem>,
    pub(crate) stop: watch::Receiver<bool>,
}

impl<S, E> SynthStage<S, E>
where
    S: Synthesizer,
    E: EventSink,
{
    pub(crate) async fn run(mut self) {
        tracing::debug!(target: LOG_TARGET, "synthesis stage started");

        while let Some(item) = next_item(&mut self.plan_rx, &mut self.stop).await {
            match item {
                PlanItem::Shutdown => break,
                PlanItem::Pause(job) => self.forward_pause(job),
                PlanItem::Speak(job) => self.synthesize(job).await,
            }
        }

        tracing::debug!(target: LOG_TARGET, "synthesis stage stopped");
    }

    fn forward_pause(&self, job: PauseJob) {
        if is_stale(&self.generation, &job.id, job.generation) {
            return;
        }
        if self.play_tx.send(PlayItem::Pause(job)).is_err() {
            tracing::warn!(target: LOG_TARGET, "play queue closed; pause discarded");
        }
    }

    async fn synthesize(&self, job: SpeakJob) {
        if is_stale(&self.generation, &job.id, job.generation) {
            return;
        }

        let artifact = match self.artifacts.allocate() {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, id = %job.id, error = %e, "failed to allocate artifact");
                self.events
                    .emit(Event::job_error(
                        job.id,
                        ErrorStage::Synth,
                        format!("failed to allocate artifact: {e}"),
                    ))
                    .await;
                return;
            }
        };

        let request = SynthesisRequest {
            text: job.text.clone(),
            voice: job.voice.clone(),
            speed: job.speed,
        };
        let started = Instant::now();
        let outcome = self.synth.synthesize(request, artifact.to_path_buf()).await;
        let synth_ms = elapsed_ms(started);

        match outcome {
            Ok(()) => {
                tracing::debug!(target: LOG_TARGET, id = %job.id, synth_ms, "synthesized");
                self.events
                    .emit(Event::SynthDone {
                        id: job.id.clone(),
                        synth_ms,
                    })
                    .await;
                let result = SynthResult {
                    job,
                    artifact,
                    synth_ms,
                };
                if self.play_tx.send(PlayItem::Synthesized(result)).is_err() {
                    tracing::warn!(target: LOG_TARGET, "play queue closed; result discarded");
                }
            }
            Err(e) => {
                remove_artifact(artifact);
                tracing::warn!(target: LOG_TARGET, id = %job.id, error = %e, "synthesis failed");
                self.events
                    .emit(Event::job_error(job.id, ErrorStage::Synth, e.to_string()))
                    .await;
            }
        }
    }
}
