use crate::tts::{chunk_text, SynthesisRequest, Synthesizer, TtsError, DEFAULT_MAX_CHUNK_CHARS};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const LOG_TARGET: &str = "tts::command";

/// Delegates synthesis to an external program with a piper-style CLI:
///
/// `<program> [leading args] --model <model> --output_file <path> --length_scale <1/speed> [--speaker <n>]`
///
/// The chunked text is written to stdin, one chunk per line.
#[derive(Clone, Debug)]
pub struct CommandSynthesizer {
    program: PathBuf,
    leading_args: Vec<String>,
    model: String,
    voices: Vec<String>,
    max_chunk_chars: usize,
}

impl CommandSynthesizer {
    #[must_use]
    pub fn new(program: PathBuf, model: impl Into<String>) -> Self {
        Self {
            program,
            leading_args: Vec::new(),
            model: model.into(),
            voices: Vec::new(),
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        }
    }

    /// Resolves `program` on `PATH` (or as a path) before constructing.
    pub fn locate(program: &str, model: impl Into<String>) -> Result<Self, TtsError> {
        let resolved = which::which(program).map_err(|e| {
            TtsError::Other(format!("synthesis program '{program}' not found: {e}"))
        })?;
        Ok(Self::new(resolved, model))
    }

    /// Arguments placed before the generated ones, e.g. a script path for an interpreter.
    #[must_use]
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    /// Voices the engine accepts; a voice's index becomes its `--speaker` id.
    /// With no list configured, every voice is accepted and no speaker is passed.
    #[must_use]
    pub fn with_voices(mut self, voices: Vec<String>) -> Self {
        self.voices = voices;
        self
    }

    fn speaker_for(&self, voice: &str) -> Result<Option<usize>, TtsError> {
        if self.voices.is_empty() {
            return Ok(None);
        }
        self.voices
            .iter()
            .position(|v| v.eq_ignore_ascii_case(voice))
            .map(Some)
            .ok_or_else(|| TtsError::UnknownVoice {
                voice: voice.to_owned(),
                choices: self.voices.join(", "),
            })
    }
}

impl Synthesizer for CommandSynthesizer {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn synthesize(
        &self,
        request: SynthesisRequest,
        output: PathBuf,
    ) -> BoxFuture<'_, Result<(), TtsError>> {
        async move {
            if !(request.speed.is_finite() && request.speed > 0.0) {
                return Err(TtsError::InvalidSpeed(request.speed));
            }
            let chunks = chunk_text(&request.text, self.max_chunk_chars);
            if chunks.is_empty() {
                return Err(TtsError::EmptyText);
            }
            let speaker = self.speaker_for(&request.voice)?;

            let mut command = Command::new(&self.program);
            command
                .args(&self.leading_args)
                .arg("--model")
                .arg(&self.model)
                .arg("--output_file")
                .arg(&output)
                .arg("--length_scale")
                .arg(format!("{:.3}", 1.0 / request.speed));
            if let Some(speaker) = speaker {
                command.arg("--speaker").arg(speaker.to_string());
            }

            let program = self.program.display().to_string();
            tracing::debug!(target: LOG_TARGET, %program, chunks = chunks.len(), "spawning synthesizer");

            let mut child = command
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| TtsError::Other(format!("failed to spawn {program}: {e}")))?;

            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| TtsError::Other(format!("failed to open {program} stdin")))?;
            let mut payload = chunks.join("\n");
            payload.push('\n');
            // The program may exit before reading; its status and stderr say more than EPIPE.
            let written = stdin.write_all(payload.as_bytes()).await;
            drop(stdin);

            let result = child.wait_with_output().await?;
            if let Err(e) = written {
                tracing::debug!(target: LOG_TARGET, %program, error = %e, "failed to feed synthesizer stdin");
                if result.status.success() {
                    return Err(e.into());
                }
            }
            if !result.status.success() {
                return Err(TtsError::CommandFailed {
                    program,
                    status: result.status.to_string(),
                    stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
                });
            }

            let audio_bytes = tokio::fs::metadata(&output).await.map(|m| m.len()).unwrap_or(0);
            if audio_bytes == 0 {
                return Err(TtsError::Other(format!("{program} produced no audio output")));
            }
            Ok(())
        }
        .boxed()
    }
}
