use crate::tts::{chunk_text, SynthesisRequest, Synthesizer, TtsError, DEFAULT_MAX_CHUNK_CHARS};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::f32::consts::PI;
use std::path::{Path, PathBuf};

pub const TONE_MODEL_ID: &str = "tone";
pub const TONE_SAMPLE_RATE: u32 = 24_000;

// Base pitch per voice, in Hz.
const VOICES: [(&str, f32); 8] = [
    ("Bella", 220.0),
    ("Bruno", 110.0),
    ("Hugo", 123.5),
    ("Jasper", 130.8),
    ("Kiki", 261.6),
    ("Leo", 146.8),
    ("Luna", 246.9),
    ("Rosie", 233.1),
];

const MS_PER_WORD: f64 = 180.0;
const MIN_CHUNK_MS: f64 = 250.0;
const GAP_SAMPLES: usize = TONE_SAMPLE_RATE as usize * 120 / 1000;
const FADE_SAMPLES: usize = TONE_SAMPLE_RATE as usize * 10 / 1000;
const AMPLITUDE: f32 = 0.3;

/// Longest utterance the engine will render; slower speeds past it are rejected.
pub const MAX_UTTERANCE_MS: u32 = 10 * 60 * 1000;
const MAX_UTTERANCE_SAMPLES: usize = MAX_UTTERANCE_MS as usize * (TONE_SAMPLE_RATE as usize / 1000);

/// Engine that renders each chunk as a voice-pitched tone.
///
/// Needs no model files, which makes it the fallback when no external
/// synthesizer is configured.
#[derive(Clone, Debug)]
pub struct ToneSynthesizer {
    max_chunk_chars: usize,
}

impl ToneSynthesizer {
    pub fn new() -> Self {
        Self {
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        }
    }

    pub fn voices() -> impl Iterator<Item = &'static str> {
        VOICES.iter().map(|(name, _)| *name)
    }

    fn render(&self, request: &SynthesisRequest) -> Result<Vec<i16>, TtsError> {
        if !(request.speed.is_finite() && request.speed > 0.0) {
            return Err(TtsError::InvalidSpeed(request.speed));
        }
        let chunks = chunk_text(&request.text, self.max_chunk_chars);
        if chunks.is_empty() {
            return Err(TtsError::EmptyText);
        }
        let pitch = resolve_pitch(&request.voice)?;

        let speed = f64::from(request.speed);
        let tone_lengths = chunks
            .iter()
            .map(|chunk| {
                let words = chunk.split_whitespace().count() as f64;
                ms_to_samples((words * MS_PER_WORD).max(MIN_CHUNK_MS) / speed)
            })
            .collect::<Option<Vec<_>>>();
        let total = tone_lengths.as_ref().and_then(|lengths| {
            lengths
                .iter()
                .try_fold(GAP_SAMPLES.saturating_mul(lengths.len() - 1), |acc, len| acc.checked_add(*len))
                .filter(|total| *total <= MAX_UTTERANCE_SAMPLES)
        });
        let (Some(tone_lengths), Some(total)) = (tone_lengths, total) else {
            return Err(TtsError::TooLong {
                max_ms: MAX_UTTERANCE_MS,
            });
        };

        let mut samples = Vec::with_capacity(total);
        for (index, len) in tone_lengths.into_iter().enumerate() {
            if index > 0 {
                samples.resize(samples.len() + GAP_SAMPLES, 0);
            }
            render_tone(&mut samples, pitch, len);
        }
        Ok(samples)
    }
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer for ToneSynthesizer {
    fn model_id(&self) -> &str {
        TONE_MODEL_ID
    }

    fn synthesize(
        &self,
        request: SynthesisRequest,
        output: PathBuf,
    ) -> BoxFuture<'_, Result<(), TtsError>> {
        let this = self.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let samples = this.render(&request)?;
                write_wav(&output, &samples)
            })
            .await
            .map_err(|e| TtsError::Other(format!("tone synthesis task failed: {e}")))?
        }
        .boxed()
    }
}

fn resolve_pitch(voice: &str) -> Result<f32, TtsError> {
    VOICES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(voice))
        .map(|(_, pitch)| *pitch)
        .ok_or_else(|| TtsError::UnknownVoice {
            voice: voice.to_owned(),
            choices: ToneSynthesizer::voices().collect::<Vec<_>>().join(", "),
        })
}

/// `None` when the duration is not finite or longer than the utterance cap.
fn ms_to_samples(ms: f64) -> Option<usize> {
    let samples = (ms * f64::from(TONE_SAMPLE_RATE) / 1000.0).floor();
    if samples.is_finite() && (0.0..=MAX_UTTERANCE_SAMPLES as f64).contains(&samples) {
        Some(samples as usize)
    } else {
        None
    }
}

fn render_tone(out: &mut Vec<i16>, pitch_hz: f32, len: usize) {
    if len == 0 {
        return;
    }
    let fade = FADE_SAMPLES.min(len / 2).max(1);
    for i in 0..len {
        let t = i as f32 / TONE_SAMPLE_RATE as f32;
        let envelope = (i.min(len - 1 - i) as f32 / fade as f32).min(1.0);
        let amplitude = (2.0 * PI * pitch_hz * t).sin() * AMPLITUDE * envelope;
        out.push((amplitude * f32::from(i16::MAX)) as i16);
    }
}

fn write_wav(path: &Path, samples: &[i16]) -> Result<(), TtsError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TONE_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;
    Ok(())
}
