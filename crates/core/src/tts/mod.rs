mod chunker;
mod command;
mod tone;

use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;

pub use chunker::{chunk_text, DEFAULT_MAX_CHUNK_CHARS};
pub use command::CommandSynthesizer;
pub use tone::{ToneSynthesizer, MAX_UTTERANCE_MS, TONE_MODEL_ID, TONE_SAMPLE_RATE};

#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub speed: f32,
}

#[derive(thiserror::Error, Debug)]
pub enum TtsError {
    #[error("Cannot synthesize empty text")]
    EmptyText,

    #[error("Voice '{voice}' not available. Choices: {choices}")]
    UnknownVoice { voice: String, choices: String },

    #[error("speed must be a positive number, got {0}")]
    InvalidSpeed(f32),

    #[error("Utterance too long: exceeds {max_ms} ms at the requested speed")]
    TooLong { max_ms: u32 },

    #[error("failed to write audio: {0}")]
    Wav(#[from] hound::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Renders text into an audio file at a path chosen by the caller.
///
/// On error the file at `output` may be partially written; cleaning it up is
/// the caller's job.
pub trait Synthesizer: Send + Sync {
    /// Identifier reported in the `ready` event.
    fn model_id(&self) -> &str;

    fn synthesize(
        &self,
        request: SynthesisRequest,
        output: PathBuf,
    ) -> BoxFuture<'_, Result<(), TtsError>>;
}

impl<T: Synthesizer + ?Sized> Synthesizer for Arc<T> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn synthesize(
        &self,
        request: SynthesisRequest,
        output: PathBuf,
    ) -> BoxFuture<'_, Result<(), TtsError>> {
        (**self).synthesize(request, output)
    }
}
