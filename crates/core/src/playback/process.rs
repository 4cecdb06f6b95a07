use crate::playback::{PlayOutcome, PlaybackError, Player};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const LOG_TARGET: &str = "playback::process";

/// Plays an artifact by running `<program> [args] <artifact>` to completion.
#[derive(Clone, Debug)]
pub struct ProcessPlayer {
    name: String,
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessPlayer {
    pub fn new(name: impl Into<String>, program: PathBuf, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program,
            args,
        }
    }

    /// Player with the arguments a known program needs to play a file and exit.
    pub fn for_program(name: &str, program: PathBuf) -> Self {
        Self::new(name, program, default_args(name))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

fn default_args(name: &str) -> Vec<String> {
    let args: &[&str] = match name {
        "ffplay" => &["-autoexit", "-nodisp", "-loglevel", "error"],
        "mpv" => &["--no-video", "--really-quiet"],
        _ => &[],
    };
    args.iter().map(|a| (*a).to_owned()).collect()
}

/// First entry of `priority` that resolves to an executable on `PATH`.
pub fn discover_player(priority: &[String]) -> Result<ProcessPlayer, PlaybackError> {
    discover_with(priority, |name| which::which(name).ok())
}

fn discover_with(
    priority: &[String],
    lookup: impl Fn(&str) -> Option<PathBuf>,
) -> Result<ProcessPlayer, PlaybackError> {
    priority
        .iter()
        .find_map(|name| lookup(name).map(|path| ProcessPlayer::for_program(name, path)))
        .ok_or_else(|| PlaybackError::NoPlayerFound {
            tried: priority.to_vec(),
        })
}

impl Player for ProcessPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(&self, artifact: PathBuf) -> BoxFuture<'_, Result<PlayOutcome, PlaybackError>> {
        async move {
            tracing::trace!(target: LOG_TARGET, player = %self.name, artifact = %artifact.display(), "playing");
            let output = Command::new(&self.program)
                .args(&self.args)
                .arg(&artifact)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|source| PlaybackError::Spawn {
                    player: self.name.clone(),
                    source,
                })?;

            Ok(PlayOutcome {
                exit_code: output.status.code(),
                diagnostic: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
        .boxed()
    }
}
