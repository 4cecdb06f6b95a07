//! Line-delimited JSON protocol spoken over stdin/stdout.
//!
//! Input records carry an `op` field (`speak`, `pause`, `clear`, `shutdown`);
//! output records carry a `type` field. See [`Command`] and [`Event`].

mod command;
mod event;

pub use command::{decode_line, Command, InputError, PauseCommand, SpeakCommand};
pub use event::{ErrorStage, Event};
