use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    Synth,
    Play,
    Input,
}

/// One record on the output stream.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Ready {
        player: String,
        model: String,
    },
    Ack {
        id: String,
    },
    SynthDone {
        id: String,
        synth_ms: u64,
    },
    PlayDone {
        id: String,
        synth_ms: u64,
        play_ms: u64,
    },
    PauseDone {
        id: String,
        pause_ms: u64,
    },
    Cleared {
        generation: i64,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        stage: ErrorStage,
        message: String,
    },
    Fatal {
        message: String,
    },
}

impl Event {
    pub fn input_error(message: impl Into<String>) -> Self {
        Self::Error {
            id: None,
            stage: ErrorStage::Input,
            message: message.into(),
        }
    }

    pub fn job_error(id: impl Into<String>, stage: ErrorStage, message: impl Into<String>) -> Self {
        Self::Error {
            id: Some(id.into()),
            stage,
            message: message.into(),
        }
    }

    /// The job id this event reports on, if any.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Ack { id }
            | Self::SynthDone { id, .. }
            | Self::PlayDone { id, .. }
            | Self::PauseDone { id, .. } => Some(id),
            Self::Error { id, .. } => id.as_deref(),
            Self::Ready { .. } | Self::Cleared { .. } | Self::Fatal { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
