use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

pub const DEFAULT_MODEL_ID: &str = "KittenML/kitten-tts-micro-0.8";
pub const DEFAULT_PLAYERS: &str = "pw-play,paplay,aplay";
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 2000;
pub const ENV_MODEL: &str = "SPEECH_WORKER_MODEL";
pub const ENV_PLAYERS: &str = "SPEECH_WORKER_PLAYERS";
pub const ENV_SYNTH_COMMAND: &str = "SPEECH_WORKER_SYNTH_COMMAND";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelId(String);

impl ModelId {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyModelId);
        }
        Ok(Self(v.trim().to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self(DEFAULT_MODEL_ID.to_owned())
    }
}

/// Player programs to look for, most preferred first.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerPriority(Vec<String>);

impl PlayerPriority {
    /// Parses a comma separated list. Blank entries are skipped and an
    /// entirely blank list yields the default priority.
    pub fn parse(raw: &str) -> Self {
        let players = parse_list(raw);
        if players.is_empty() {
            return Self::default();
        }
        Self(players)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Default for PlayerPriority {
    fn default() -> Self {
        Self(parse_list(DEFAULT_PLAYERS))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShutdownTimeout {
    pub timeout_ms: u64,
}

impl ShutdownTimeout {
    pub fn new(timeout_ms: u64) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::ZeroShutdownTimeout);
        }
        Ok(Self { timeout_ms })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ShutdownTimeout {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SynthesisBackend {
    #[default]
    Tone,
    Command {
        program: String,
        voices: Vec<String>,
    },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerConfig {
    pub model: ModelId,
    pub players: PlayerPriority,
    pub synthesis: SynthesisBackend,
    pub silent_playback: bool,
    pub artifact_dir: Option<PathBuf>,
    pub shutdown_timeout: ShutdownTimeout,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("model id must not be empty")]
    EmptyModelId,
    #[error("shutdown timeout must be > 0 ms")]
    ZeroShutdownTimeout,
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
    .filter(|v| !v.trim().is_empty())
}

/// Splits a comma separated list, trimming entries and dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
