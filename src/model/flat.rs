use crate::model::instrument::Instrument;
use crate::model::nested::{ControlChange, KeySignature, Note, PitchBend, Tempo, TimeSignature};
use serde::{Deserialize, Serialize};

/// The flat document: one chronologically ordered stream of tagged events.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimpleMidiSpec {
    pub header: SimpleHeader,
    pub track_definitions: Vec<TrackDefinition>,
    pub stream: Vec<StreamEvent>,
}

/// Header without the timing arrays, which live in the stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SimpleHeader {
    pub name: String,
    pub ppq: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrackDefinition {
    pub id: u32,
    pub channel: u8,
    pub instrument: Instrument,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Time(TimeSignature),
    Key(KeySignature),
    Tempo(Tempo),
    Cc(StreamControlChange),
    Pb(StreamPitchBend),
    Note(StreamNote),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StreamControlChange {
    pub track: u32,
    pub number: u8,
    pub ticks: u64,
    pub value: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StreamPitchBend {
    pub track: u32,
    pub ticks: u64,
    pub value: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamNote {
    pub track: u32,
    pub midi: u8,
    pub ticks: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub octave: Option<i32>,
    pub velocity: f64,
    pub duration_ticks: u64,
}

impl StreamEvent {
    pub fn ticks(&self) -> u64 {
        match self {
            StreamEvent::Time(e) => e.ticks,
            StreamEvent::Key(e) => e.ticks,
            StreamEvent::Tempo(e) => e.ticks,
            StreamEvent::Cc(e) => e.ticks,
            StreamEvent::Pb(e) => e.ticks,
            StreamEvent::Note(e) => e.ticks,
        }
    }

    /// Ordering among events sharing a tick: meter, tempo and key come before anything that
    /// sounds.
    pub fn priority(&self) -> u8 {
        match self {
            StreamEvent::Time(_) => 0,
            StreamEvent::Tempo(_) => 1,
            StreamEvent::Key(_) => 2,
            StreamEvent::Cc(_) => 3,
            StreamEvent::Pb(_) => 4,
            StreamEvent::Note(_) => 5,
        }
    }

    /// The owning track id, for the event kinds stamped with one.
    pub fn track(&self) -> Option<u32> {
        match self {
            StreamEvent::Cc(e) => Some(e.track),
            StreamEvent::Pb(e) => Some(e.track),
            StreamEvent::Note(e) => Some(e.track),
            _ => None,
        }
    }
}

impl StreamControlChange {
    pub fn new(track: u32, cc: &ControlChange) -> Self {
        Self {
            track,
            number: cc.number,
            ticks: cc.ticks,
            value: cc.value,
        }
    }

    pub fn to_control_change(&self) -> ControlChange {
        ControlChange {
            number: self.number,
            ticks: self.ticks,
            value: self.value,
        }
    }
}

impl StreamPitchBend {
    pub fn new(track: u32, bend: &PitchBend) -> Self {
        Self {
            track,
            ticks: bend.ticks,
            value: bend.value,
        }
    }

    pub fn to_pitch_bend(&self) -> PitchBend {
        PitchBend {
            ticks: self.ticks,
            value: self.value,
        }
    }
}

impl StreamNote {
    pub fn new(track: u32, note: &Note) -> Self {
        Self {
            track,
            midi: note.midi,
            ticks: note.ticks,
            name: note.name.clone(),
            pitch: note.pitch.clone(),
            octave: note.octave,
            velocity: note.velocity,
            duration_ticks: note.duration_ticks,
        }
    }

    pub fn to_note(&self) -> Note {
        Note {
            midi: self.midi,
            ticks: self.ticks,
            name: self.name.clone(),
            pitch: self.pitch.clone(),
            octave: self.octave,
            velocity: self.velocity,
            duration_ticks: self.duration_ticks,
        }
    }
}
