#![deny(warnings)]

pub mod config;
pub mod events;
pub mod generation;
pub mod jobs;
pub mod pipeline;
pub mod playback;
pub mod protocol;
pub mod tts;
