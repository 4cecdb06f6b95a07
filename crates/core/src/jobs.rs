use tempfile::TempPath;

pub const DEFAULT_VOICE: &str = "Bella";
pub const DEFAULT_SPEED: f32 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct SpeakJob {
    pub id: String,
    pub text: String,
    pub voice: String,
    pub speed: f32,
    pub generation: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PauseJob {
    pub id: String,
    pub pause_ms: u64,
    pub generation: i64,
}

/// A synthesized utterance waiting for playback.
///
/// The artifact file is removed when the result is dropped, so every path
/// that discards a result (stale drop, shutdown) also cleans up after it.
#[derive(Debug)]
pub struct SynthResult {
    pub job: SpeakJob,
    pub artifact: TempPath,
    pub synth_ms: u64,
}

/// Entry on the plan queue, between the decoder and the synthesis stage.
#[derive(Debug)]
pub enum PlanItem {
    Speak(SpeakJob),
    Pause(PauseJob),
    Shutdown,
}

/// Entry on the play queue, between the synthesis and playback stages.
#[derive(Debug)]
pub enum PlayItem {
    Synthesized(SynthResult),
    Pause(PauseJob),
    Shutdown,
}
