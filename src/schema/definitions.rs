//! The two published document schemas, built from the combinators in this module.

use super::{Field, Schema, field, optional};
use crate::model::instrument::{CONTROL_CHANGE_NUMBERS, FAMILIES, KEYS, instrument_names};
use std::sync::LazyLock;

/// Field names of the control change map, matching `CONTROL_CHANGE_NUMBERS`.
const CONTROL_CHANGE_FIELDS: [&str; 13] = [
    "1", "2", "4", "5", "7", "8", "10", "64", "65", "66", "67", "68", "84",
];

static INSTRUMENT_NAMES: LazyLock<&'static [&'static str]> =
    LazyLock::new(|| instrument_names().leak());

/// Schema of the nested document.
pub static MIDI_SPEC: LazyLock<Schema> = LazyLock::new(midi_spec);

/// Schema of the flat document.
pub static SIMPLE_MIDI_SPEC: LazyLock<Schema> = LazyLock::new(simple_midi_spec);

/// Schema of one flat stream element.
pub static STREAM_EVENT: LazyLock<Schema> = LazyLock::new(stream_event);

fn ticks() -> Schema {
    Schema::integer(0, i64::MAX)
}

fn ppq() -> Schema {
    Schema::integer(1, u32::MAX as i64)
}

fn channel() -> Schema {
    Schema::integer(0, 15)
}

fn midi_number() -> Schema {
    Schema::integer(0, 127)
}

fn track_id() -> Schema {
    Schema::integer(0, u32::MAX as i64)
}

fn tempo_fields() -> Vec<Field> {
    vec![
        field("ticks", ticks()),
        field("bpm", Schema::positive()),
        optional("time", Schema::number()),
    ]
}

fn time_signature_fields() -> Vec<Field> {
    let part = || Schema::integer(1, u32::MAX as i64);
    vec![
        field("ticks", ticks()),
        field("timeSignature", Schema::Tuple(vec![part(), part()])),
        optional("measures", Schema::number()),
    ]
}

fn key_signature_fields() -> Vec<Field> {
    vec![
        field("ticks", ticks()),
        field("key", Schema::one_of(&KEYS)),
        field("scale", Schema::String),
    ]
}

fn note_fields() -> Vec<Field> {
    vec![
        field("midi", midi_number()),
        field("ticks", ticks()),
        field("name", Schema::String),
        optional("pitch", Schema::String),
        optional("octave", Schema::integer(i32::MIN as i64, i32::MAX as i64)),
        field("velocity", Schema::unit()),
        field("durationTicks", ticks()),
    ]
}

pub fn instrument() -> Schema {
    Schema::object([
        field("family", Schema::one_of(FAMILIES)),
        field("name", Schema::one_of(*INSTRUMENT_NAMES)),
        optional("percussion", Schema::Bool),
    ])
}

pub fn control_change() -> Schema {
    Schema::object([
        field("number", midi_number()),
        field("ticks", ticks()),
        field("value", Schema::unit()),
    ])
}

/// Fields shared by both header formats.
pub fn header_base() -> Schema {
    Schema::object([field("name", Schema::String), field("ppq", ppq())])
}

/// The timeline arrays the nested header adds on top of [`header_base`].
pub fn header_timing() -> Schema {
    Schema::object([
        field("tempos", Schema::array(Schema::object(tempo_fields()))),
        field(
            "timeSignatures",
            Schema::array(Schema::object(time_signature_fields())),
        ),
        field(
            "keySignatures",
            Schema::array(Schema::object(key_signature_fields())),
        ),
    ])
}

pub fn track() -> Schema {
    let control_changes = CONTROL_CHANGE_FIELDS
        .iter()
        .map(|number| field(*number, Schema::array(control_change())));

    Schema::object([
        field("name", Schema::String),
        field("channel", channel()),
        optional("endOfTrackTicks", ticks()),
        field("instrument", instrument()),
        field(
            "pitchBends",
            Schema::array(Schema::object([
                field("ticks", ticks()),
                field("value", Schema::number()),
            ])),
        ),
        field("notes", Schema::array(Schema::object(note_fields()))),
        optional("controlChanges", Schema::partial(control_changes)),
    ])
}

pub fn midi_spec() -> Schema {
    Schema::object([
        field("header", header_base().and(header_timing())),
        field("tracks", Schema::array(track())),
    ])
}

fn tagged(kind: &'static str, fields: Vec<Field>) -> (&'static str, Schema) {
    let mut all = vec![field("type", Schema::literal(kind))];
    all.extend(fields);
    (kind, Schema::Object(all))
}

pub fn stream_event() -> Schema {
    let cc_number = CONTROL_CHANGE_NUMBERS
        .iter()
        .map(|n| Schema::literal(*n))
        .reduce(Schema::or)
        .unwrap_or_else(midi_number);

    let mut note = vec![field("track", track_id())];
    note.extend(note_fields());

    Schema::tagged(
        "type",
        [
            tagged("time", time_signature_fields()),
            tagged("key", key_signature_fields()),
            tagged("tempo", tempo_fields()),
            tagged(
                "cc",
                vec![
                    field("track", track_id()),
                    field("number", cc_number),
                    field("ticks", ticks()),
                    field("value", Schema::unit()),
                ],
            ),
            tagged(
                "pb",
                vec![
                    field("track", track_id()),
                    field("ticks", ticks()),
                    field("value", Schema::number()),
                ],
            ),
            tagged("note", note),
        ],
    )
}

pub fn simple_midi_spec() -> Schema {
    Schema::object([
        field("header", header_base()),
        field(
            "trackDefinitions",
            Schema::array(Schema::object([
                field("id", track_id()),
                field("channel", channel()),
                field("instrument", instrument()),
            ])),
        ),
        field("stream", Schema::array(stream_event())),
    ])
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn piano() -> serde_json::Value {
        json!({ "family": "piano", "name": "acoustic grand piano" })
    }

    #[test]
    fn instrument_enumerations() {
        assert!(instrument().guard(&piano()));
        assert!(instrument().guard(&json!({ "family": "drums", "name": "jazz kit", "percussion": true })));
        assert!(!instrument().guard(&json!({ "family": "kazoo", "name": "acoustic grand piano" })));
        assert!(!instrument().guard(&json!({ "family": "piano", "name": "theremin" })));
    }

    #[test]
    fn stream_event_kinds() {
        let note = json!({
            "type": "note", "track": 0, "midi": 60, "ticks": 0, "name": "C4",
            "velocity": 0.8, "durationTicks": 480
        });
        let cc = json!({ "type": "cc", "track": 1, "number": 64, "ticks": 10, "value": 1 });
        let bad_cc = json!({ "type": "cc", "track": 1, "number": 3, "ticks": 10, "value": 1 });
        let key = json!({ "type": "key", "ticks": 0, "key": "F#", "scale": "major" });
        let time = json!({ "type": "time", "ticks": 0, "timeSignature": [6, 8] });

        assert!(STREAM_EVENT.guard(&note));
        assert!(STREAM_EVENT.guard(&cc));
        assert!(STREAM_EVENT.guard(&key));
        assert!(STREAM_EVENT.guard(&time));

        let err = STREAM_EVENT.check(&bad_cc).unwrap_err();
        assert_eq!(err.path, "number");
    }

    #[test]
    fn control_change_map_is_closed() {
        let track = json!({
            "name": "", "channel": 0, "instrument": piano(), "pitchBends": [], "notes": [],
            "controlChanges": {
                "7": [{ "number": 7, "ticks": 0, "value": 0.5 }],
                "11": [{ "number": 11, "ticks": 0, "value": 0.5 }]
            }
        });

        let sliced = super::track().slice(&track).unwrap();
        let ccs = sliced["controlChanges"].as_object().unwrap();
        assert_eq!(ccs.len(), 1);
        assert!(ccs.contains_key("7"));
    }

    #[test]
    fn tempo_must_move_forward() {
        let tempo = json!({ "type": "tempo", "ticks": 0, "bpm": 0, "time": 0 });
        let err = STREAM_EVENT.check(&tempo).unwrap_err();
        assert_eq!(err.path, "bpm");
        assert_eq!(err.expected, "number > 0");

        assert!(!STREAM_EVENT.guard(&json!({ "type": "tempo", "ticks": 0, "bpm": -90 })));
        assert!(STREAM_EVENT.guard(&json!({ "type": "tempo", "ticks": 0, "bpm": 0.5 })));
    }

    #[test]
    fn declarations_render() {
        let rendered = SIMPLE_MIDI_SPEC.declaration("SimpleMidiSpec");
        assert!(rendered.starts_with("type SimpleMidiSpec = {"));
        assert!(rendered.contains("type: \"note\""));
        assert!(rendered.contains("number: 1 | 2 | 4 | 5 | 7 | 8 | 10 | 64 | 65 | 66 | 67 | 68 | 84"));

        let rendered = MIDI_SPEC.declaration("MidiSpec");
        assert!(rendered.contains("controlChanges?: Partial<{"));
        assert!(rendered.contains("\"Cb\" | \"Gb\""));
    }
}
