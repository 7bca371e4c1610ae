use crate::error::MidiSpecError;
use crate::model::flat::SimpleMidiSpec;
use crate::model::nested::MidiSpec;
use crate::schema::{MIDI_SPEC, SIMPLE_MIDI_SPEC, STREAM_EVENT, Schema};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;

/// Which of the two wire formats a document is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Nested,
    Flat,
}

impl DocumentFormat {
    pub fn schema(&self) -> &'static Schema {
        match self {
            DocumentFormat::Nested => LazyLock::force(&MIDI_SPEC),
            DocumentFormat::Flat => LazyLock::force(&SIMPLE_MIDI_SPEC),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            DocumentFormat::Nested => "MidiSpec",
            DocumentFormat::Flat => "SimpleMidiSpec",
        }
    }
}

fn slice_into<T: DeserializeOwned>(schema: &Schema, json: &Value) -> Result<T, MidiSpecError> {
    let sliced = schema.slice(json)?;
    serde_json::from_value(sliced).map_err(MidiSpecError::Decode)
}

/// Validates a nested document, keeping only the fields the schema declares.
pub fn validate_nested(json: &Value) -> Result<MidiSpec, MidiSpecError> {
    let midi: MidiSpec = slice_into(&MIDI_SPEC, json)?;
    debug!(
        "Validated nested document '{}' with {} track(s)",
        midi.header.name,
        midi.tracks.len()
    );
    Ok(midi)
}

/// Validates a flat document, keeping only the fields the schema declares.
pub fn validate_flat(json: &Value) -> Result<SimpleMidiSpec, MidiSpecError> {
    let simple: SimpleMidiSpec = slice_into(&SIMPLE_MIDI_SPEC, json)?;
    debug!(
        "Validated flat document '{}' with {} stream event(s)",
        simple.header.name,
        simple.stream.len()
    );
    Ok(simple)
}

/// Parses and validates nested JSON text. Syntax errors are reported apart from schema errors.
pub fn parse_nested(text: &str) -> Result<MidiSpec, MidiSpecError> {
    let json: Value = serde_json::from_str(text).map_err(MidiSpecError::Parse)?;
    validate_nested(&json)
}

/// Parses and validates flat JSON text. Syntax errors are reported apart from schema errors.
pub fn parse_flat(text: &str) -> Result<SimpleMidiSpec, MidiSpecError> {
    let json: Value = serde_json::from_str(text).map_err(MidiSpecError::Parse)?;
    validate_flat(&json)
}

/// True when `value` is a well-formed stream note.
pub fn is_stream_note(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("note") && STREAM_EVENT.guard(value)
}
