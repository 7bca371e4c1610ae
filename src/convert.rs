use crate::model::flat::*;
use crate::model::nested::*;
use log::{debug, warn};
use std::collections::HashMap;

/// Sorts tempo changes by tick and drops the ones that change nothing: an entry repeating the
/// previous kept bpm, or landing on the same tick as the previous kept entry.
pub fn dedupe_tempos(tempos: &[Tempo]) -> Vec<Tempo> {
    let mut sorted = tempos.to_vec();
    sorted.sort_by_key(|tempo| tempo.ticks);

    let mut kept: Vec<Tempo> = Vec::with_capacity(sorted.len());
    for tempo in sorted.into_iter() {
        if let Some(last) = kept.last()
            && (last.bpm == tempo.bpm || last.ticks == tempo.ticks)
        {
            continue;
        }

        kept.push(tempo);
    }

    if kept.len() < tempos.len() {
        warn!(
            "Collapsed {} redundant tempo change(s)",
            tempos.len() - kept.len()
        );
    }

    kept
}

fn sort_stream(stream: &mut [StreamEvent]) {
    stream.sort_by(|a, b| {
        a.ticks()
            .cmp(&b.ticks())
            .then_with(|| a.priority().cmp(&b.priority()))
    });
}

/// Converts a nested document into the flat stream format.
///
/// Tracks without notes are dropped, and the remaining ones are numbered in order. Track names
/// and end-of-track markers have no place in the flat format and are lost.
pub fn nested_to_flat(midi: &MidiSpec) -> SimpleMidiSpec {
    let mut track_definitions: Vec<TrackDefinition> = Vec::new();
    let mut stream: Vec<StreamEvent> = Vec::new();

    for ts in midi.header.time_signatures.iter() {
        stream.push(StreamEvent::Time(ts.clone()));
    }
    for ks in midi.header.key_signatures.iter() {
        stream.push(StreamEvent::Key(ks.clone()));
    }
    for tempo in dedupe_tempos(&midi.header.tempos).into_iter() {
        stream.push(StreamEvent::Tempo(tempo));
    }

    let mut dropped = 0;
    for track in midi.tracks.iter() {
        if track.is_empty() {
            dropped += 1;
            continue;
        }

        let id = track_definitions.len() as u32;
        track_definitions.push(TrackDefinition {
            id,
            channel: track.channel,
            instrument: track.instrument.on_channel(track.channel),
        });

        for (number, changes) in track.control_changes.iter() {
            for cc in changes.iter() {
                stream.push(StreamEvent::Cc(StreamControlChange {
                    number: *number,
                    ..StreamControlChange::new(id, cc)
                }));
            }
        }
        for bend in track.pitch_bends.iter() {
            stream.push(StreamEvent::Pb(StreamPitchBend::new(id, bend)));
        }
        for note in track.notes.iter() {
            stream.push(StreamEvent::Note(StreamNote::new(id, note)));
        }
    }

    if dropped > 0 {
        warn!("Dropped {} track(s) without notes from '{}'", dropped, midi.header.name);
    }

    sort_stream(&mut stream);

    debug!(
        "Flattened '{}' into {} track definition(s) and {} stream event(s)",
        midi.header.name,
        track_definitions.len(),
        stream.len()
    );

    SimpleMidiSpec {
        header: SimpleHeader {
            name: midi.header.name.clone(),
            ppq: midi.header.ppq,
        },
        track_definitions,
        stream,
    }
}

/// Converts a flat document back into nested tracks.
///
/// Track names come back empty. Stream events whose track id has no definition are skipped.
pub fn flat_to_nested(simple: &SimpleMidiSpec) -> MidiSpec {
    let mut tracks: Vec<Track> = simple
        .track_definitions
        .iter()
        .map(|def| Track {
            name: String::new(),
            channel: def.channel,
            end_of_track_ticks: None,
            instrument: def.instrument.on_channel(def.channel),
            pitch_bends: Vec::new(),
            notes: Vec::new(),
            control_changes: ControlChanges::new(),
        })
        .collect();

    let mut by_id: HashMap<u32, Vec<usize>> = HashMap::new();
    for (i, def) in simple.track_definitions.iter().enumerate() {
        by_id.entry(def.id).or_default().push(i);
    }

    let mut tempos: Vec<Tempo> = Vec::new();
    let mut time_signatures: Vec<TimeSignature> = Vec::new();
    let mut key_signatures: Vec<KeySignature> = Vec::new();
    let mut orphaned = 0;

    for event in simple.stream.iter() {
        let owners: &[usize] = match event.track() {
            Some(id) => match by_id.get(&id) {
                Some(owners) => owners.as_slice(),
                None => {
                    orphaned += 1;
                    continue;
                }
            },
            None => &[],
        };

        match event {
            StreamEvent::Time(ts) => time_signatures.push(ts.clone()),
            StreamEvent::Key(ks) => key_signatures.push(ks.clone()),
            StreamEvent::Tempo(tempo) => tempos.push(tempo.clone()),
            StreamEvent::Cc(cc) => {
                for &i in owners {
                    tracks[i]
                        .control_changes
                        .entry(cc.number)
                        .or_default()
                        .push(cc.to_control_change());
                }
            }
            StreamEvent::Pb(bend) => {
                for &i in owners {
                    tracks[i].pitch_bends.push(bend.to_pitch_bend());
                }
            }
            StreamEvent::Note(note) => {
                for &i in owners {
                    tracks[i].notes.push(note.to_note());
                }
            }
        }
    }

    if orphaned > 0 {
        warn!(
            "Skipped {} stream event(s) referencing undefined tracks in '{}'",
            orphaned, simple.header.name
        );
    }

    MidiSpec {
        header: Header {
            name: simple.header.name.clone(),
            ppq: simple.header.ppq,
            tempos: dedupe_tempos(&tempos),
            time_signatures,
            key_signatures,
        },
        tracks,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::instrument::Instrument;
    use pretty_assertions::assert_eq;

    fn tempo(ticks: u64, bpm: f64) -> Tempo {
        Tempo {
            ticks,
            bpm,
            time: None,
        }
    }

    fn note(midi: u8, ticks: u64, duration_ticks: u64) -> Note {
        Note {
            midi,
            ticks,
            name: format!("n{midi}"),
            pitch: None,
            octave: None,
            velocity: 0.75,
            duration_ticks,
        }
    }

    fn track(channel: u8, notes: Vec<Note>) -> Track {
        Track {
            name: String::new(),
            channel,
            end_of_track_ticks: None,
            instrument: Instrument::for_program(0, channel),
            pitch_bends: Vec::new(),
            notes,
            control_changes: ControlChanges::new(),
        }
    }

    fn song() -> MidiSpec {
        let mut lead = track(0, vec![note(60, 0, 480), note(64, 480, 480), note(67, 960, 960)]);
        lead.pitch_bends = vec![
            PitchBend {
                ticks: 0,
                value: 0.0,
            },
            PitchBend {
                ticks: 480,
                value: 0.25,
            },
        ];
        lead.control_changes.insert(
            7,
            vec![ControlChange {
                number: 7,
                ticks: 0,
                value: 0.8,
            }],
        );
        lead.control_changes.insert(
            64,
            vec![
                ControlChange {
                    number: 64,
                    ticks: 480,
                    value: 1.0,
                },
                ControlChange {
                    number: 64,
                    ticks: 900,
                    value: 0.0,
                },
            ],
        );

        let drums = track(9, vec![note(36, 0, 120), note(38, 480, 120)]);

        MidiSpec {
            header: Header {
                name: "test song".into(),
                ppq: 480,
                tempos: vec![tempo(0, 120.0), tempo(960, 90.0)],
                time_signatures: vec![TimeSignature {
                    ticks: 0,
                    time_signature: [4, 4],
                    measures: None,
                }],
                key_signatures: vec![KeySignature {
                    ticks: 0,
                    key: "C".into(),
                    scale: "major".into(),
                }],
            },
            tracks: vec![lead, drums],
        }
    }

    #[test]
    fn dedupe_collapses_noise() {
        let tempos = vec![
            tempo(960, 90.0),
            tempo(0, 120.0),
            tempo(0, 100.0),
            tempo(480, 120.0),
            tempo(1440, 90.0),
            tempo(1920, 140.0),
        ];

        let kept = dedupe_tempos(&tempos);
        assert_eq!(kept, vec![tempo(0, 120.0), tempo(960, 90.0), tempo(1920, 140.0)]);
        assert_eq!(dedupe_tempos(&kept), kept);
    }

    #[test]
    fn dedupe_same_tick() {
        let kept = dedupe_tempos(&[tempo(0, 120.0), tempo(0, 60.0)]);
        assert_eq!(kept.len(), 1);
        assert!(dedupe_tempos(&[]).is_empty());
    }

    #[test]
    fn stream_is_ordered() {
        let flat = nested_to_flat(&song());

        for pair in flat.stream.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.ticks() < b.ticks() || (a.ticks() == b.ticks() && a.priority() <= b.priority()),
                "{:?} before {:?}",
                a,
                b
            );
        }

        assert!(matches!(flat.stream[0], StreamEvent::Time(_)));
        assert!(matches!(flat.stream[1], StreamEvent::Tempo(_)));
        assert!(matches!(flat.stream[2], StreamEvent::Key(_)));
        assert!(matches!(flat.stream[3], StreamEvent::Cc(_)));
        assert!(matches!(flat.stream[4], StreamEvent::Pb(_)));
        assert!(matches!(flat.stream[5], StreamEvent::Note(_)));
    }

    #[test]
    fn percussion_from_channel() {
        let mut midi = song();
        midi.tracks[0].instrument.percussion = Some(true);
        midi.tracks[1].instrument.percussion = None;

        let flat = nested_to_flat(&midi);
        assert_eq!(flat.track_definitions[0].instrument.percussion, Some(false));
        assert_eq!(flat.track_definitions[1].instrument.percussion, Some(true));
    }

    #[test]
    fn round_trip() {
        let midi = song();
        let flat = nested_to_flat(&midi);
        assert_eq!(flat.track_definitions.len(), 2);
        assert_eq!(flat.stream.len(), 4 + 3 + 2 + 3 + 2);

        assert_eq!(flat_to_nested(&flat), midi);
    }

    #[test]
    fn idempotent_flattening() {
        let flat = nested_to_flat(&song());
        assert_eq!(nested_to_flat(&flat_to_nested(&flat)), flat);
    }

    #[test]
    fn empty_tracks_are_elided() {
        let mut midi = song();
        midi.tracks.insert(0, track(3, Vec::new()));
        midi.tracks[0].pitch_bends.push(PitchBend {
            ticks: 10,
            value: 1.0,
        });

        let flat = nested_to_flat(&midi);
        assert_eq!(flat.track_definitions.len(), 2);
        assert_eq!(flat.track_definitions[0].channel, 0);
        assert!(flat.stream.iter().all(|e| e.ticks() != 10));
        assert!(flat.stream.iter().filter_map(StreamEvent::track).all(|id| id < 2));
    }

    #[test]
    fn names_are_not_preserved() {
        let mut midi = song();
        midi.tracks[0].name = "Lead".into();
        midi.tracks[0].end_of_track_ticks = Some(4000);

        let back = flat_to_nested(&nested_to_flat(&midi));
        assert_eq!(back.tracks[0].name, "");
        assert_eq!(back.tracks[0].end_of_track_ticks, None);
    }

    #[test]
    fn unknown_track_ids_are_skipped() {
        let mut flat = nested_to_flat(&song());
        flat.stream.push(StreamEvent::Note(StreamNote::new(7, &note(72, 2000, 10))));
        flat.stream.push(StreamEvent::Pb(StreamPitchBend {
            track: 42,
            ticks: 2000,
            value: 0.5,
        }));

        let midi = flat_to_nested(&flat);
        assert_eq!(midi, song());
    }

    #[test]
    fn flat_tempos_are_deduped() {
        let mut flat = nested_to_flat(&song());
        flat.stream.push(StreamEvent::Tempo(tempo(3000, 90.0)));

        let midi = flat_to_nested(&flat);
        assert_eq!(midi.header.tempos, vec![tempo(0, 120.0), tempo(960, 90.0)]);
    }
}
