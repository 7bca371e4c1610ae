use crate::model::instrument::{Instrument, is_control_change_number, key_for_accidentals};
use crate::model::nested::*;
use crate::timing::fill_tempo_times;
use crate::util::note_name;
use anyhow::{Result, anyhow};
use log::{debug, warn};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;
const PITCH_BEND_CENTER: f64 = 8192.0;

/// Notes still sounding, keyed by (channel, key), with their start tick and velocity.
type OpenNotes = BTreeMap<(u8, u8), Vec<(u64, u8)>>;

/// Everything gathered from one SMF track before it becomes a [`Track`].
#[derive(Default)]
struct TrackState {
    name: Option<String>,
    channel: Option<u8>,
    program: Option<u8>,
    end_tick: u64,
    end_of_track: Option<u64>,
    notes: Vec<Note>,
    pitch_bends: Vec<PitchBend>,
    control_changes: ControlChanges,
    open_notes: OpenNotes,
}

pub fn import_midi_file<P: AsRef<Path>>(path: P) -> Result<MidiSpec> {
    let bytes = fs::read(path.as_ref()).map_err(|e| {
        anyhow!(
            "Failed to read MIDI file {}: {}",
            path.as_ref().display(),
            e
        )
    })?;

    let fallback_name = path
        .as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    midi_bytes_to_spec(&bytes, fallback_name)
}

/// Reads a Standard MIDI File into a nested document.
///
/// The header is named after the first track when that track carries a name but no notes,
/// otherwise after `fallback_name`.
pub fn midi_bytes_to_spec(bytes: &[u8], fallback_name: &str) -> Result<MidiSpec> {
    let smf = Smf::parse(bytes).map_err(|e| anyhow!("Failed to parse MIDI: {:?}", e))?;

    let ppq: u32 = match smf.header.timing {
        Timing::Metrical(t) => t.as_int() as u32,
        Timing::Timecode(_fps, _subframe) => {
            return Err(anyhow!(
                "SMPTE timecode midi timing is not currently supported..!"
            ));
        }
    };

    if ppq == 0 {
        return Err(anyhow!("MIDI header declares zero ticks per quarter note..!"));
    }

    debug!("Ticks per quarter note: {}", ppq);
    debug!(
        "MIDI format: {:?}, tracks: {}",
        smf.header.format,
        smf.tracks.len()
    );

    let mut tempo_changes: Vec<(u64, u32)> = Vec::new();
    let mut time_signatures: Vec<TimeSignature> = Vec::new();
    let mut key_signatures: Vec<KeySignature> = Vec::new();
    let mut states: Vec<TrackState> = Vec::with_capacity(smf.tracks.len());

    for (track_idx, track) in smf.tracks.iter().enumerate() {
        let mut state = TrackState::default();
        let mut abs_tick: u64 = 0;

        for event in track.iter() {
            abs_tick = abs_tick.saturating_add(event.delta.as_int() as u64);

            match &event.kind {
                TrackEventKind::Meta(meta) => match meta {
                    MetaMessage::Tempo(micro) => {
                        let mpqn: u32 = micro.as_int();
                        tempo_changes.push((abs_tick, mpqn));
                        debug!(
                            "Tempo change at tick {} -> {} us/qn (track {})",
                            abs_tick, mpqn, track_idx
                        );
                    }
                    MetaMessage::TimeSignature(numerator, denominator_pow, _, _) => {
                        time_signatures.push(TimeSignature {
                            ticks: abs_tick,
                            time_signature: [
                                *numerator as u32,
                                1u32.checked_shl(*denominator_pow as u32).unwrap_or(4),
                            ],
                            measures: None,
                        });
                    }
                    MetaMessage::KeySignature(accidentals, minor) => {
                        match key_for_accidentals(*accidentals, *minor) {
                            Some(key) => key_signatures.push(KeySignature {
                                ticks: abs_tick,
                                key: key.to_owned(),
                                scale: if *minor { "minor" } else { "major" }.to_owned(),
                            }),
                            None => warn!(
                                "Ignoring key signature with {} accidentals at tick {}..!",
                                accidentals, abs_tick
                            ),
                        }
                    }
                    MetaMessage::TrackName(bytes) => {
                        if state.name.is_none() {
                            let name = String::from_utf8_lossy(bytes).trim().to_owned();
                            debug!("Track {} name: {}", track_idx, name);
                            state.name = Some(name);
                        }
                    }
                    MetaMessage::EndOfTrack => {
                        state.end_of_track = Some(abs_tick);
                    }
                    _ => {}
                },
                TrackEventKind::Midi { channel, message } => {
                    let ch: u8 = channel.as_int();
                    state.channel.get_or_insert(ch);

                    match message {
                        MidiMessage::NoteOn { key, vel } => {
                            let velocity: u8 = vel.as_int();

                            if velocity == 0 {
                                close_note(&mut state, ch, key.as_int(), abs_tick);
                            } else {
                                state
                                    .open_notes
                                    .entry((ch, key.as_int()))
                                    .or_default()
                                    .push((abs_tick, velocity));
                            }
                        }
                        MidiMessage::NoteOff { key, vel: _ } => {
                            close_note(&mut state, ch, key.as_int(), abs_tick);
                        }
                        MidiMessage::ProgramChange { program } => {
                            state.program.get_or_insert(program.as_int());
                        }
                        MidiMessage::Controller { controller, value } => {
                            let number = controller.as_int();
                            if is_control_change_number(number) {
                                state.control_changes.entry(number).or_default().push(
                                    ControlChange {
                                        number,
                                        ticks: abs_tick,
                                        value: value.as_int() as f64 / 127.0,
                                    },
                                );
                            }
                        }
                        MidiMessage::PitchBend { bend } => {
                            let raw = bend.0.as_int() as f64;
                            state.pitch_bends.push(PitchBend {
                                ticks: abs_tick,
                                value: ((raw - PITCH_BEND_CENTER) / PITCH_BEND_CENTER).clamp(-1.0, 1.0),
                            });
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        state.end_tick = abs_tick;
        states.push(state);
    }

    let header_name = match states.first() {
        Some(first) if first.notes.is_empty() && first.open_notes.is_empty() => first
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_name.to_owned()),
        _ => fallback_name.to_owned(),
    };

    let tracks: Vec<Track> = states
        .into_iter()
        .enumerate()
        .map(|(idx, state)| finish_track(idx, state, ppq as u64))
        .collect();

    time_signatures.sort_by_key(|ts| ts.ticks);
    key_signatures.sort_by_key(|ks| ks.ticks);
    fill_measures(&mut time_signatures, ppq);

    tempo_changes.sort_by_key(|(tick, _)| *tick);
    let tempos: Vec<Tempo> = tempo_changes
        .into_iter()
        .filter(|(_, mpqn)| *mpqn > 0)
        .map(|(ticks, mpqn)| Tempo {
            ticks,
            bpm: MICROSECONDS_PER_MINUTE / mpqn as f64,
            time: None,
        })
        .collect();

    let midi = MidiSpec {
        header: Header {
            name: header_name,
            ppq,
            tempos: fill_tempo_times(&tempos, ppq),
            time_signatures,
            key_signatures,
        },
        tracks,
    };

    debug!(
        "Imported '{}' with {} track(s) and {} note(s)",
        midi.header.name,
        midi.tracks.len(),
        midi.note_count()
    );

    Ok(midi)
}

fn finish_track(idx: usize, mut state: TrackState, ticks_per_quarter: u64) -> Track {
    let open_notes = std::mem::take(&mut state.open_notes);
    for ((ch, key), stack) in open_notes.into_iter() {
        for (start_tick, start_vel) in stack {
            let end_tick = if state.end_tick > start_tick {
                state.end_tick
            } else {
                start_tick + ticks_per_quarter
            };

            push_note(&mut state.notes, key, start_tick, end_tick, start_vel);

            warn!(
                "Unclosed NoteOn for {}, channel: {} at tick: {} auto-closing at: {}..!",
                key, ch, start_tick, end_tick
            );
        }
    }

    state.notes.sort_by(|a, b| {
        a.ticks
            .cmp(&b.ticks)
            .then(a.midi.cmp(&b.midi))
            .then(a.duration_ticks.cmp(&b.duration_ticks))
    });

    let channel = state.channel.unwrap_or(0);
    let instrument = Instrument::for_program(state.program.unwrap_or(0), channel);

    if state.notes.is_empty() {
        debug!("Track {} carries no notes", idx);
    }

    Track {
        name: state.name.unwrap_or_default(),
        channel,
        end_of_track_ticks: state.end_of_track,
        instrument,
        pitch_bends: state.pitch_bends,
        notes: state.notes,
        control_changes: state.control_changes,
    }
}

fn push_note(notes: &mut Vec<Note>, midi: u8, start_tick: u64, end_tick: u64, velocity: u8) {
    let (pitch, octave, name) = note_name(midi);
    notes.push(Note {
        midi,
        ticks: start_tick,
        name,
        pitch: Some(pitch.to_owned()),
        octave: Some(octave),
        velocity: velocity as f64 / 127.0,
        duration_ticks: end_tick.saturating_sub(start_tick),
    });
}

fn close_note(state: &mut TrackState, ch: u8, midi_num: u8, abs_tick: u64) {
    if let Some(stack) = state.open_notes.get_mut(&(ch, midi_num))
        && let Some((start_tick, start_vel)) = stack.pop()
    {
        push_note(&mut state.notes, midi_num, start_tick, abs_tick, start_vel);
    } else {
        debug!(
            "Orphaned NoteOff for {} ch{} at tick {}..!",
            midi_num, ch, abs_tick
        );
    }
}

/// Stamps each time signature with the number of measures elapsed before it.
fn fill_measures(time_signatures: &mut [TimeSignature], ppq: u32) {
    let mut last_tick: u64 = 0;
    let mut last_signature = [4u32, 4u32];
    let mut measures = 0.0;

    for ts in time_signatures.iter_mut() {
        let beats = (ts.ticks - last_tick) as f64 / ppq as f64;
        let quarters_per_measure =
            last_signature[0] as f64 * 4.0 / last_signature[1].max(1) as f64;
        measures += beats / quarters_per_measure;

        ts.measures = Some(measures);
        last_tick = ts.ticks;
        last_signature = ts.time_signature;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use midly::num::{u4, u7, u15, u24, u28};
    use midly::{Format, Header as SmfHeader, PitchBend as SmfPitchBend, TrackEvent};

    fn event(delta: u32, kind: TrackEventKind<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind,
        }
    }

    fn midi(channel: u8, message: MidiMessage) -> TrackEventKind<'static> {
        TrackEventKind::Midi {
            channel: u4::new(channel),
            message,
        }
    }

    fn note_on(key: u8, vel: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(vel),
        }
    }

    fn note_off(key: u8) -> MidiMessage {
        MidiMessage::NoteOff {
            key: u7::new(key),
            vel: u7::new(0),
        }
    }

    fn write(smf: &Smf) -> Vec<u8> {
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        bytes
    }

    fn sample() -> Vec<u8> {
        let conductor = vec![
            event(0, TrackEventKind::Meta(MetaMessage::TrackName(b"Sample Song"))),
            event(0, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000)))),
            event(0, TrackEventKind::Meta(MetaMessage::TimeSignature(3, 2, 24, 8))),
            event(0, TrackEventKind::Meta(MetaMessage::KeySignature(-1, true))),
            event(960, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(1_000_000)))),
            event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];

        let lead = vec![
            event(0, TrackEventKind::Meta(MetaMessage::TrackName(b"Lead"))),
            event(0, midi(0, MidiMessage::ProgramChange { program: u7::new(40) })),
            event(
                0,
                midi(
                    0,
                    MidiMessage::Controller {
                        controller: u7::new(7),
                        value: u7::new(127),
                    },
                ),
            ),
            event(
                0,
                midi(
                    0,
                    MidiMessage::Controller {
                        controller: u7::new(11),
                        value: u7::new(64),
                    },
                ),
            ),
            event(0, midi(0, note_on(60, 127))),
            event(
                240,
                midi(
                    0,
                    MidiMessage::PitchBend {
                        bend: SmfPitchBend(midly::num::u14::new(8192)),
                    },
                ),
            ),
            event(240, midi(0, note_off(60))),
            event(0, midi(0, note_on(64, 64))),
            event(480, midi(0, note_on(64, 0))),
            event(0, midi(0, note_on(67, 100))),
            event(480, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];

        let drums = vec![
            event(0, midi(9, note_on(36, 127))),
            event(120, midi(9, note_off(36))),
            event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];

        let smf = Smf {
            header: SmfHeader::new(Format::Parallel, Timing::Metrical(u15::new(480))),
            tracks: vec![conductor, lead, drums],
        };

        write(&smf)
    }

    #[test]
    fn import_sample_song() {
        env_logger::try_init().unwrap_or(());

        let midi = midi_bytes_to_spec(&sample(), "fallback").unwrap();
        assert_eq!(midi.header.name, "Sample Song");
        assert_eq!(midi.header.ppq, 480);
        assert_eq!(midi.tracks.len(), 3);

        let tempos = &midi.header.tempos;
        assert_eq!(tempos.len(), 2);
        assert_eq!(tempos[0].bpm, 120.0);
        assert_eq!(tempos[1].bpm, 60.0);
        assert_eq!(tempos[1].time, Some(1.0));

        assert_eq!(midi.header.time_signatures[0].time_signature, [3, 4]);
        assert_eq!(midi.header.time_signatures[0].measures, Some(0.0));
        assert_eq!(midi.header.key_signatures[0].key, "D");
        assert_eq!(midi.header.key_signatures[0].scale, "minor");

        assert!(midi.tracks[0].notes.is_empty());
        assert_eq!(midi.tracks[0].end_of_track_ticks, Some(960));
    }

    #[test]
    fn import_notes_and_controllers() {
        env_logger::try_init().unwrap_or(());

        let midi = midi_bytes_to_spec(&sample(), "fallback").unwrap();
        let lead = &midi.tracks[1];

        assert_eq!(lead.name, "Lead");
        assert_eq!(lead.instrument.name, "violin");
        assert_eq!(lead.instrument.family, "strings");
        assert_eq!(lead.end_of_track_ticks, Some(1440));

        let notes: Vec<(u8, u64, u64)> = lead
            .notes
            .iter()
            .map(|n| (n.midi, n.ticks, n.duration_ticks))
            .collect();
        assert_eq!(notes, vec![(60, 0, 480), (64, 480, 480), (67, 960, 480)]);
        assert_eq!(lead.notes[0].name, "C4");
        assert_eq!(lead.notes[0].velocity, 1.0);

        assert_eq!(lead.pitch_bends.len(), 1);
        assert_eq!(lead.pitch_bends[0].value, 0.0);

        assert_eq!(lead.control_changes.len(), 1);
        assert_eq!(lead.control_changes[&7][0].value, 1.0);

        let drums = &midi.tracks[2];
        assert_eq!(drums.channel, 9);
        assert_eq!(drums.instrument.family, "drums");
        assert_eq!(drums.instrument.percussion, Some(true));
    }

    #[test]
    fn import_validates_against_schema() {
        let midi = midi_bytes_to_spec(&sample(), "fallback").unwrap();
        let json = serde_json::to_value(&midi).unwrap();
        let validated = crate::validate_nested(&json).unwrap();
        assert_eq!(validated, midi);
    }

    #[test]
    fn unclosed_notes_import_in_a_stable_order() {
        env_logger::try_init().unwrap_or(());

        let track = vec![
            event(0, midi(1, note_on(60, 50))),
            event(0, midi(0, note_on(60, 100))),
            event(0, midi(0, note_on(60, 80))),
            event(0, midi(0, note_on(64, 90))),
            event(240, midi(0, note_off(64))),
            event(240, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];
        let bytes = write(&Smf {
            header: SmfHeader::new(Format::SingleTrack, Timing::Metrical(u15::new(480))),
            tracks: vec![track],
        });

        let first = midi_bytes_to_spec(&bytes, "stable").unwrap();
        for _ in 0..8 {
            assert_eq!(midi_bytes_to_spec(&bytes, "stable").unwrap(), first);
        }

        let notes: Vec<(u8, u64, u64, u8)> = first.tracks[0]
            .notes
            .iter()
            .map(|n| (n.midi, n.ticks, n.duration_ticks, (n.velocity * 127.0).round() as u8))
            .collect();
        assert_eq!(
            notes,
            vec![(60, 0, 480, 100), (60, 0, 480, 80), (60, 0, 480, 50), (64, 0, 240, 90)]
        );
    }

    #[test]
    fn reject_garbage() {
        assert!(midi_bytes_to_spec(b"not a midi file", "x").is_err());
        assert!(import_midi_file("./does/not/exist.mid").is_err());
    }

    #[test]
    fn measures_follow_signatures() {
        let mut signatures = vec![
            TimeSignature {
                ticks: 0,
                time_signature: [4, 4],
                measures: None,
            },
            TimeSignature {
                ticks: 480 * 8,
                time_signature: [6, 8],
                measures: None,
            },
            TimeSignature {
                ticks: 480 * 8 + 480 * 3 * 2,
                time_signature: [4, 4],
                measures: None,
            },
        ];

        fill_measures(&mut signatures, 480);
        assert_eq!(signatures[0].measures, Some(0.0));
        assert_eq!(signatures[1].measures, Some(2.0));
        assert_eq!(signatures[2].measures, Some(4.0));
    }
}
