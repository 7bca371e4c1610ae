use crate::model::instrument::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Control changes of a track keyed by controller number.
pub type ControlChanges = BTreeMap<u8, Vec<ControlChange>>;

/// The nested document: every track owns its own notes, pitch bends and control changes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MidiSpec {
    pub header: Header,
    pub tracks: Vec<Track>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Usually the name of the first, note-less track.
    pub name: String,
    pub ppq: u32,
    pub tempos: Vec<Tempo>,
    pub time_signatures: Vec<TimeSignature>,
    pub key_signatures: Vec<KeySignature>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tempo {
    pub ticks: u64,
    pub bpm: f64,
    /// Seconds elapsed at `ticks`, when the producer computed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignature {
    pub ticks: u64,
    /// `[numerator, denominator]`
    pub time_signature: [u32; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measures: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KeySignature {
    pub ticks: u64,
    pub key: String,
    pub scale: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub name: String,
    pub channel: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_track_ticks: Option<u64>,
    pub instrument: Instrument,
    pub pitch_bends: Vec<PitchBend>,
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub control_changes: ControlChanges,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PitchBend {
    pub ticks: u64,
    pub value: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub midi: u8,
    pub ticks: u64,
    /// Scientific pitch name, e.g. `C4`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub octave: Option<i32>,
    /// Normalized to `0..=1`.
    pub velocity: f64,
    pub duration_ticks: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ControlChange {
    pub number: u8,
    pub ticks: u64,
    /// Normalized to `0..=1`.
    pub value: f64,
}

impl Track {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// The tick at which the last note of this track is released.
    pub fn last_note_off(&self) -> u64 {
        self.notes
            .iter()
            .map(|note| note.ticks + note.duration_ticks)
            .max()
            .unwrap_or(0)
    }
}

impl MidiSpec {
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|track| track.notes.len()).sum()
    }
}
