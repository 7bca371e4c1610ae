use crate::model::instrument::Instrument;
use crate::model::nested::{MidiSpec, Tempo};
use serde::Serialize;
use std::borrow::Cow;

/// Tempo assumed before the first tempo change, or when there is none.
pub const DEFAULT_BPM: f64 = 120.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

/// Index of the last tempo change at or before `ticks`.
///
/// Expects `tempos` sorted by tick. When several changes share a tick the last of them wins.
pub fn search(tempos: &[Tempo], ticks: u64) -> Option<usize> {
    let last = tempos.last()?;
    if last.ticks <= ticks {
        return Some(tempos.len() - 1);
    }

    tempos.partition_point(|tempo| tempo.ticks <= ticks).checked_sub(1)
}

fn default_seconds(ticks: u64, ppq: u32) -> f64 {
    (ticks as f64 / ppq as f64) * (SECONDS_PER_MINUTE / DEFAULT_BPM)
}

/// Piecewise-constant tempo over a tick timeline.
#[derive(Debug, Clone)]
pub struct TempoMap<'a> {
    tempos: Cow<'a, [Tempo]>,
    ppq: u32,
}

impl<'a> TempoMap<'a> {
    /// Borrows `tempos` when already sorted by tick, otherwise keeps a sorted copy.
    pub fn new(tempos: &'a [Tempo], ppq: u32) -> Self {
        let tempos = if tempos.is_sorted_by_key(|tempo| tempo.ticks) {
            Cow::Borrowed(tempos)
        } else {
            let mut sorted = tempos.to_vec();
            sorted.sort_by_key(|tempo| tempo.ticks);
            Cow::Owned(sorted)
        };

        Self {
            tempos,
            ppq: ppq.max(1),
        }
    }

    pub fn for_midi(midi: &'a MidiSpec) -> Self {
        Self::new(&midi.header.tempos, midi.header.ppq)
    }

    /// Like [`TempoMap::for_midi`], with missing tempo times integrated first.
    pub fn integrated(midi: &MidiSpec) -> TempoMap<'static> {
        TempoMap {
            tempos: Cow::Owned(fill_tempo_times(&midi.header.tempos, midi.header.ppq)),
            ppq: midi.header.ppq.max(1),
        }
    }

    pub fn tempos(&self) -> &[Tempo] {
        &self.tempos
    }

    /// Seconds elapsed at `ticks`.
    ///
    /// Measures from the governing tempo change's `time`. A change without a `time` gives no
    /// anchor, so the position is measured at the default tempo from tick 0 instead; earlier
    /// tempo changes are not integrated.
    pub fn seconds_at_tick(&self, ticks: u64) -> f64 {
        let governing = search(&self.tempos, ticks).map(|i| &self.tempos[i]);

        match governing {
            Some(Tempo {
                ticks: start,
                bpm,
                time: Some(time),
            }) => {
                let elapsed_beats = (ticks - start) as f64 / self.ppq as f64;
                time + (SECONDS_PER_MINUTE / bpm) * elapsed_beats
            }
            _ => default_seconds(ticks, self.ppq),
        }
    }

    /// Sounding length in seconds of something starting at `start` and lasting `duration` ticks.
    pub fn duration_seconds(&self, start: u64, duration: u64) -> f64 {
        self.seconds_at_tick(start + duration) - self.seconds_at_tick(start)
    }
}

/// Returns `tempos` sorted by tick, with every missing `time` computed by walking the segments
/// from tick 0 at the default tempo. Times already present are kept and anchor later segments.
pub fn fill_tempo_times(tempos: &[Tempo], ppq: u32) -> Vec<Tempo> {
    let ppq = ppq.max(1) as f64;
    let mut sorted = tempos.to_vec();
    sorted.sort_by_key(|tempo| tempo.ticks);

    let mut last_tick: u64 = 0;
    let mut last_bpm = DEFAULT_BPM;
    let mut seconds = 0.0;

    for tempo in sorted.iter_mut() {
        seconds += (tempo.ticks - last_tick) as f64 / ppq * (SECONDS_PER_MINUTE / last_bpm);

        let time = *tempo.time.get_or_insert(seconds);
        seconds = time;
        last_tick = tempo.ticks;
        last_bpm = tempo.bpm;
    }

    sorted
}

/// Seconds elapsed at `ticks` in `midi`.
pub fn seconds_at_tick(midi: &MidiSpec, ticks: u64) -> f64 {
    TempoMap::for_midi(midi).seconds_at_tick(ticks)
}

/// Sounding length in seconds of a note starting at `start_ticks`.
pub fn note_duration_seconds(midi: &MidiSpec, start_ticks: u64, duration_ticks: u64) -> f64 {
    TempoMap::for_midi(midi).duration_seconds(start_ticks, duration_ticks)
}

/// Seconds until the last note of the piece is released.
///
/// Unlike [`seconds_at_tick`], tempo changes without a `time` are integrated first, so every
/// stated tempo counts toward the total.
pub fn total_duration_seconds(midi: &MidiSpec) -> f64 {
    let map = TempoMap::integrated(midi);
    midi.tracks
        .iter()
        .filter(|track| !track.is_empty())
        .map(|track| map.seconds_at_tick(track.last_note_off()))
        .fold(0.0, f64::max)
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TimedNote {
    pub midi: u8,
    pub name: String,
    pub ticks: u64,
    pub velocity: f64,
    pub time: f64,
    pub duration: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TimedPitchBend {
    pub ticks: u64,
    pub value: f64,
    pub time: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TimedControlChange {
    pub number: u8,
    pub ticks: u64,
    pub value: f64,
    pub time: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimedTrack {
    pub name: String,
    pub channel: u8,
    pub instrument: Instrument,
    pub notes: Vec<TimedNote>,
    pub pitch_bends: Vec<TimedPitchBend>,
    pub control_changes: Vec<TimedControlChange>,
    /// Seconds until the last note of this track is released.
    pub duration: f64,
}

/// A nested document with every event placed in seconds, ready for playback.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HydratedMidi {
    pub name: String,
    pub tracks: Vec<TimedTrack>,
    pub duration: f64,
}

/// Places every note, pitch bend and control change of `midi` on the timeline described by `map`.
pub fn hydrate(midi: &MidiSpec, map: &TempoMap) -> HydratedMidi {
    let tracks: Vec<TimedTrack> = midi
        .tracks
        .iter()
        .map(|track| {
            let notes: Vec<TimedNote> = track
                .notes
                .iter()
                .map(|note| TimedNote {
                    midi: note.midi,
                    name: note.name.clone(),
                    ticks: note.ticks,
                    velocity: note.velocity,
                    time: map.seconds_at_tick(note.ticks),
                    duration: map.duration_seconds(note.ticks, note.duration_ticks),
                })
                .collect();

            let duration = notes
                .iter()
                .map(|note| note.time + note.duration)
                .fold(0.0, f64::max);

            TimedTrack {
                name: track.name.clone(),
                channel: track.channel,
                instrument: track.instrument.on_channel(track.channel),
                notes,
                pitch_bends: track
                    .pitch_bends
                    .iter()
                    .map(|bend| TimedPitchBend {
                        ticks: bend.ticks,
                        value: bend.value,
                        time: map.seconds_at_tick(bend.ticks),
                    })
                    .collect(),
                control_changes: track
                    .control_changes
                    .iter()
                    .flat_map(|(number, changes)| changes.iter().map(move |cc| (*number, cc)))
                    .map(|(number, cc)| TimedControlChange {
                        number,
                        ticks: cc.ticks,
                        value: cc.value,
                        time: map.seconds_at_tick(cc.ticks),
                    })
                    .collect(),
                duration,
            }
        })
        .collect();

    let duration = tracks.iter().map(|track| track.duration).fold(0.0, f64::max);

    HydratedMidi {
        name: midi.header.name.clone(),
        tracks,
        duration,
    }
}
