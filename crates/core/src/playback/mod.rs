mod process;
mod silent;

use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;

pub use process::{discover_player, ProcessPlayer};
pub use silent::{SilentPlayer, SILENT_PLAYER_NAME};

/// What the player reported after attempting one artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayOutcome {
    /// `None` when the player was terminated by a signal.
    pub exit_code: Option<i32>,
    pub diagnostic: String,
}

impl PlayOutcome {
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            diagnostic: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Message for a failed outcome: the diagnostic text if there is any.
    pub fn failure_message(&self, player: &str) -> String {
        if !self.diagnostic.is_empty() {
            return self.diagnostic.clone();
        }
        match self.exit_code {
            Some(code) => format!("{player} exited with code {code}"),
            None => format!("{player} was terminated by a signal"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    #[error("No audio player found. Tried: {}", tried.join(", "))]
    NoPlayerFound { tried: Vec<String> },

    #[error("failed to start {player}: {source}")]
    Spawn {
        player: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable artifact: {0}")]
    Artifact(String),
}

pub trait Player: Send + Sync {
    /// Identifier reported in the `ready` event.
    fn name(&self) -> &str;

    fn play(&self, artifact: PathBuf) -> BoxFuture<'_, Result<PlayOutcome, PlaybackError>>;
}

impl<T: Player + ?Sized> Player for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn play(&self, artifact: PathBuf) -> BoxFuture<'_, Result<PlayOutcome, PlaybackError>> {
        (**self).play(artifact)
    }
}
