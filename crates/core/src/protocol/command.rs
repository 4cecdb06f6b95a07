use crate::jobs::{PauseJob, SpeakJob, DEFAULT_SPEED, DEFAULT_VOICE};
use serde_json::{Map, Value};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid input encoding: {0}")]
    InvalidEncoding(String),
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Invalid command: expected a JSON object")]
    NotAnObject,
    #[error("Invalid speak payload")]
    InvalidSpeak,
    #[error("Invalid pause payload")]
    InvalidPause,
    #[error("Unknown op: {0}")]
    UnknownOp(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeakCommand {
    pub id: String,
    pub text: String,
    pub voice: String,
    pub speed: f32,
    /// Explicit stamp from the caller; `None` means "whatever is current".
    pub generation: Option<i64>,
}

impl SpeakCommand {
    pub fn into_job(self, current_generation: i64) -> SpeakJob {
        SpeakJob {
            id: self.id,
            text: self.text,
            voice: self.voice,
            speed: self.speed,
            generation: self.generation.unwrap_or(current_generation),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PauseCommand {
    pub id: String,
    pub pause_ms: u64,
    pub generation: Option<i64>,
}

impl PauseCommand {
    pub fn into_job(self, current_generation: i64) -> PauseJob {
        PauseJob {
            id: self.id,
            pause_ms: self.pause_ms,
            generation: self.generation.unwrap_or(current_generation),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Speak(SpeakCommand),
    Pause(PauseCommand),
    Clear,
    Shutdown,
}

/// Decodes one input line. Blank lines decode to `Ok(None)`.
pub fn decode_line(line: &str) -> Result<Option<Command>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_str(line).map_err(|e| InputError::InvalidJson(e.to_string()))?;
    let obj = value.as_object().ok_or(InputError::NotAnObject)?;

    match obj.get("op") {
        Some(Value::String(op)) if op == "speak" => decode_speak(obj).map(Some),
        Some(Value::String(op)) if op == "pause" => decode_pause(obj).map(Some),
        Some(Value::String(op)) if op == "clear" => Ok(Some(Command::Clear)),
        Some(Value::String(op)) if op == "shutdown" => Ok(Some(Command::Shutdown)),
        Some(Value::String(op)) => Err(InputError::UnknownOp(op.clone())),
        Some(other) => Err(InputError::UnknownOp(other.to_string())),
        None => Err(InputError::UnknownOp("null".to_owned())),
    }
}

fn decode_speak(obj: &Map<String, Value>) -> Result<Command, InputError> {
    let id = string_field(obj, "id");
    let text = string_field(obj, "text");
    if id.is_empty() || text.is_empty() {
        return Err(InputError::InvalidSpeak);
    }

    let voice = match string_field(obj, "voice") {
        v if v.is_empty() => DEFAULT_VOICE.to_owned(),
        v => v,
    };
    let speed = obj
        .get("speed")
        .and_then(float_value)
        .map(|s| s as f32)
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(DEFAULT_SPEED);

    Ok(Command::Speak(SpeakCommand {
        id,
        text,
        voice,
        speed,
        generation: generation_field(obj),
    }))
}

fn decode_pause(obj: &Map<String, Value>) -> Result<Command, InputError> {
    let id = string_field(obj, "id");
    if id.is_empty() {
        return Err(InputError::InvalidPause);
    }

    let pause_ms = obj
        .get("pause_ms")
        .and_then(int_value)
        .map_or(0, |ms| u64::try_from(ms).unwrap_or(0));

    Ok(Command::Pause(PauseCommand {
        id,
        pause_ms,
        generation: generation_field(obj),
    }))
}

/// Trimmed string form of a field; numbers are accepted and stringified.
fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Caller stamps are kept as given, negative ones included; a stamp that
/// never matches the live generation just makes the job stale.
fn generation_field(obj: &Map<String, Value>) -> Option<i64> {
    obj.get("generation").and_then(int_value)
}

fn float_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speak(line: &str) -> SpeakCommand {
        match decode_line(line) {
            Ok(Some(Command::Speak(cmd))) => cmd,
            other => panic!("expected speak, got {other:?}"),
        }
    }

    fn pause(line: &str) -> PauseCommand {
        match decode_line(line) {
            Ok(Some(Command::Pause(cmd))) => cmd,
            other => panic!("expected pause, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(decode_line(""), Ok(None));
        assert_eq!(decode_line("   \t"), Ok(None));
    }

    #[test]
    fn speak_applies_defaults() {
        let cmd = speak(r#"{"op":"speak","id":"a","text":"hello"}"#);
        assert_eq!(cmd.id, "a");
        assert_eq!(cmd.text, "hello");
        assert_eq!(cmd.voice, "Bella");
        assert_eq!(cmd.speed, 1.0);
        assert_eq!(cmd.generation, None);
        assert_eq!(cmd.into_job(4).generation, 4);
    }

    #[test]
    fn speak_keeps_explicit_fields() {
        let cmd = speak(
            r#"{"op":"speak","id":"c1","text":" hi ","voice":"Luna","speed":1.5,"generation":7}"#,
        );
        assert_eq!(cmd.text, "hi");
        assert_eq!(cmd.voice, "Luna");
        assert_eq!(cmd.speed, 1.5);
        assert_eq!(cmd.into_job(0).generation, 7);
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let cmd = speak(
            r#"{"op":"speak","id":"a","text":"x","speed":"fast","generation":"soon","voice":"  "}"#,
        );
        assert_eq!(cmd.speed, 1.0);
        assert_eq!(cmd.generation, None);
        assert_eq!(cmd.voice, "Bella");

        let cmd = speak(r#"{"op":"speak","id":"a","text":"x","speed":-2}"#);
        assert_eq!(cmd.speed, 1.0);
    }

    #[test]
    fn numeric_strings_and_ids_are_accepted() {
        let cmd = speak(r#"{"op":"speak","id":12,"text":"x","speed":"0.5","generation":"3"}"#);
        assert_eq!(cmd.id, "12");
        assert_eq!(cmd.speed, 0.5);
        assert_eq!(cmd.generation, Some(3));
    }

    #[test]
    fn negative_generation_stamp_is_kept() {
        let cmd = speak(r#"{"op":"speak","id":"a","text":"x","generation":-1}"#);
        assert_eq!(cmd.generation, Some(-1));
        assert_eq!(cmd.into_job(0).generation, -1);
        assert_eq!(pause(r#"{"op":"pause","id":"p","generation":"-3"}"#).generation, Some(-3));
    }

    #[test]
    fn speak_requires_id_and_text() {
        assert_eq!(
            decode_line(r#"{"op":"speak","id":"  ","text":"hello"}"#),
            Err(InputError::InvalidSpeak)
        );
        assert_eq!(
            decode_line(r#"{"op":"speak","id":"a"}"#),
            Err(InputError::InvalidSpeak)
        );
    }

    #[test]
    fn pause_is_clamped_and_truncated() {
        assert_eq!(pause(r#"{"op":"pause","id":"p1","pause_ms":350}"#).pause_ms, 350);
        assert_eq!(pause(r#"{"op":"pause","id":"p1","pause_ms":-20}"#).pause_ms, 0);
        assert_eq!(pause(r#"{"op":"pause","id":"p1","pause_ms":12.9}"#).pause_ms, 12);
        assert_eq!(pause(r#"{"op":"pause","id":"p1"}"#).pause_ms, 0);
        assert_eq!(pause(r#"{"op":"pause","id":"p1","pause_ms":"x"}"#).pause_ms, 0);
    }

    #[test]
    fn pause_requires_id() {
        assert_eq!(
            decode_line(r#"{"op":"pause","pause_ms":10}"#),
            Err(InputError::InvalidPause)
        );
    }

    #[test]
    fn control_commands() {
        assert_eq!(decode_line(r#"{"op":"clear"}"#), Ok(Some(Command::Clear)));
        assert_eq!(decode_line(r#"{"op":"shutdown"}"#), Ok(Some(Command::Shutdown)));
    }

    #[test]
    fn unknown_or_missing_op() {
        assert_eq!(
            decode_line(r#"{"op":"dance"}"#),
            Err(InputError::UnknownOp("dance".into()))
        );
        assert_eq!(
            decode_line(r#"{"id":"a"}"#).map_err(|e| e.to_string()),
            Err("Unknown op: null".to_owned())
        );
    }

    #[test]
    fn malformed_records() {
        let err = decode_line("{not json").expect_err("should fail");
        assert!(err.to_string().starts_with("Invalid JSON: "));
        assert_eq!(decode_line("[1,2]"), Err(InputError::NotAnObject));
    }
}
