use crate::playback::{PlayOutcome, PlaybackError, Player};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SILENT_PLAYER_NAME: &str = "silent";

/// Player that keeps real-time pacing without touching an audio device:
/// it waits for as long as the artifact would have played.
#[derive(Clone, Debug, Default)]
pub struct SilentPlayer;

impl SilentPlayer {
    pub fn new() -> Self {
        Self
    }
}

fn wav_duration(path: &Path) -> Result<Duration, PlaybackError> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| PlaybackError::Artifact(format!("{}: {e}", path.display())))?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return Err(PlaybackError::Artifact(format!(
            "{}: zero sample rate",
            path.display()
        )));
    }
    let millis = u64::from(reader.duration()) * 1000 / u64::from(sample_rate);
    Ok(Duration::from_millis(millis))
}

impl Player for SilentPlayer {
    fn name(&self) -> &str {
        SILENT_PLAYER_NAME
    }

    fn play(&self, artifact: PathBuf) -> BoxFuture<'_, Result<PlayOutcome, PlaybackError>> {
        async move {
            let duration = wav_duration(&artifact)?;
            tokio::time::sleep(duration).await;
            Ok(PlayOutcome::success())
        }
        .boxed()
    }
}
