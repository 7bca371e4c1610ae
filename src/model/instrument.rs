use serde::{Deserialize, Serialize};

/// Instrument families, in General MIDI program order, plus the drum family.
pub const FAMILIES: &[&str] = &[
    "piano",
    "chromatic percussion",
    "organ",
    "guitar",
    "bass",
    "strings",
    "ensemble",
    "brass",
    "reed",
    "pipe",
    "synth lead",
    "synth pad",
    "synth effects",
    "world",
    "percussive",
    "sound effects",
    "drums",
];

/// General MIDI program names, indexed by program number.
pub const PROGRAM_NAMES: [&str; 128] = [
    "acoustic grand piano",
    "bright acoustic piano",
    "electric grand piano",
    "honky-tonk piano",
    "electric piano 1",
    "electric piano 2",
    "harpsichord",
    "clavi",
    "celesta",
    "glockenspiel",
    "music box",
    "vibraphone",
    "marimba",
    "xylophone",
    "tubular bells",
    "dulcimer",
    "drawbar organ",
    "percussive organ",
    "rock organ",
    "church organ",
    "reed organ",
    "accordion",
    "harmonica",
    "tango accordion",
    "acoustic guitar (nylon)",
    "acoustic guitar (steel)",
    "electric guitar (jazz)",
    "electric guitar (clean)",
    "electric guitar (muted)",
    "overdriven guitar",
    "distortion guitar",
    "guitar harmonics",
    "acoustic bass",
    "electric bass (finger)",
    "electric bass (pick)",
    "fretless bass",
    "slap bass 1",
    "slap bass 2",
    "synth bass 1",
    "synth bass 2",
    "violin",
    "viola",
    "cello",
    "contrabass",
    "tremolo strings",
    "pizzicato strings",
    "orchestral harp",
    "timpani",
    "string ensemble 1",
    "string ensemble 2",
    "synthstrings 1",
    "synthstrings 2",
    "choir aahs",
    "voice oohs",
    "synth choir",
    "orchestra hit",
    "trumpet",
    "trombone",
    "tuba",
    "muted trumpet",
    "french horn",
    "brass section",
    "synthbrass 1",
    "synthbrass 2",
    "soprano sax",
    "alto sax",
    "tenor sax",
    "baritone sax",
    "oboe",
    "english horn",
    "bassoon",
    "clarinet",
    "piccolo",
    "flute",
    "recorder",
    "pan flute",
    "blown bottle",
    "shakuhachi",
    "whistle",
    "ocarina",
    "lead 1 (square)",
    "lead 2 (sawtooth)",
    "lead 3 (calliope)",
    "lead 4 (chiff)",
    "lead 5 (charang)",
    "lead 6 (voice)",
    "lead 7 (fifths)",
    "lead 8 (bass + lead)",
    "pad 1 (new age)",
    "pad 2 (warm)",
    "pad 3 (polysynth)",
    "pad 4 (choir)",
    "pad 5 (bowed)",
    "pad 6 (metallic)",
    "pad 7 (halo)",
    "pad 8 (sweep)",
    "fx 1 (rain)",
    "fx 2 (soundtrack)",
    "fx 3 (crystal)",
    "fx 4 (atmosphere)",
    "fx 5 (brightness)",
    "fx 6 (goblins)",
    "fx 7 (echoes)",
    "fx 8 (sci-fi)",
    "sitar",
    "banjo",
    "shamisen",
    "koto",
    "kalimba",
    "bag pipe",
    "fiddle",
    "shanai",
    "tinkle bell",
    "agogo",
    "steel drums",
    "woodblock",
    "taiko drum",
    "melodic tom",
    "synth drum",
    "reverse cymbal",
    "guitar fret noise",
    "breath noise",
    "seashore",
    "bird tweet",
    "telephone ring",
    "helicopter",
    "applause",
    "gunshot",
];

/// Drum kits selectable on the percussion channel, keyed by program number.
pub const DRUM_KITS: &[(u8, &str)] = &[
    (0, "standard kit"),
    (8, "room kit"),
    (16, "power kit"),
    (24, "electronic kit"),
    (25, "tr-808 kit"),
    (32, "jazz kit"),
    (40, "brush kit"),
    (48, "orchestra kit"),
    (56, "sound fx kit"),
];

/// Key spellings accepted in key signatures: the fifteen major keys from seven flats to seven
/// sharps followed by their relative minors.
pub const KEYS: [&str; 30] = [
    "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#", //
    "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#", "G#", "D#", "A#",
];

/// Control change numbers carried by a track.
pub const CONTROL_CHANGE_NUMBERS: [u8; 13] = [1, 2, 4, 5, 7, 8, 10, 64, 65, 66, 67, 68, 84];

/// Every accepted instrument name: the 128 programs and the drum kits.
pub fn instrument_names() -> Vec<&'static str> {
    PROGRAM_NAMES
        .iter()
        .copied()
        .chain(DRUM_KITS.iter().map(|(_, name)| *name))
        .collect()
}

/// Channel 9 (zero-indexed) is the General MIDI percussion channel; 10 is accepted too since
/// some sources number channels from one.
pub fn is_percussion_channel(channel: u8) -> bool {
    channel == 9 || channel == 10
}

pub fn is_control_change_number(number: u8) -> bool {
    CONTROL_CHANGE_NUMBERS.contains(&number)
}

/// Key name for a key signature given as sharps (positive) or flats (negative).
pub fn key_for_accidentals(accidentals: i8, minor: bool) -> Option<&'static str> {
    if !(-7..=7).contains(&accidentals) {
        return None;
    }

    let offset = if minor { 15 } else { 0 };
    Some(KEYS[(accidentals + 7) as usize + offset])
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Instrument {
    pub family: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percussion: Option<bool>,
}

impl Instrument {
    /// The General MIDI instrument for a program change on the given channel.
    pub fn for_program(program: u8, channel: u8) -> Self {
        if is_percussion_channel(channel) {
            let name = DRUM_KITS
                .iter()
                .rev()
                .find(|(patch, _)| *patch <= program)
                .map(|(_, name)| *name)
                .unwrap_or("standard kit");

            return Self {
                family: "drums".to_owned(),
                name: name.to_owned(),
                percussion: Some(true),
            };
        }

        let program = program.min(127) as usize;
        Self {
            family: FAMILIES[program / 8].to_owned(),
            name: PROGRAM_NAMES[program].to_owned(),
            percussion: Some(false),
        }
    }

    /// A copy whose `percussion` flag is derived from the channel rather than trusted.
    pub fn on_channel(&self, channel: u8) -> Self {
        Self {
            percussion: Some(is_percussion_channel(channel)),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn program_family_lookup() {
        let piano = Instrument::for_program(0, 0);
        assert_eq!(piano.family, "piano");
        assert_eq!(piano.name, "acoustic grand piano");
        assert_eq!(piano.percussion, Some(false));

        let gunshot = Instrument::for_program(127, 3);
        assert_eq!(gunshot.family, "sound effects");
        assert_eq!(gunshot.name, "gunshot");
    }

    #[test]
    fn drum_kits_on_percussion_channel() {
        let kit = Instrument::for_program(26, 9);
        assert_eq!(kit.family, "drums");
        assert_eq!(kit.name, "tr-808 kit");
        assert_eq!(kit.percussion, Some(true));
    }

    #[test]
    fn percussion_recomputed_from_channel() {
        let stored = Instrument {
            family: "piano".into(),
            name: "acoustic grand piano".into(),
            percussion: Some(true),
        };

        assert_eq!(stored.on_channel(0).percussion, Some(false));
        assert_eq!(stored.on_channel(9).percussion, Some(true));
        assert_eq!(stored.on_channel(10).percussion, Some(true));
    }

    #[test]
    fn key_spelling_tables() {
        assert_eq!(key_for_accidentals(0, false), Some("C"));
        assert_eq!(key_for_accidentals(0, true), Some("A"));
        assert_eq!(key_for_accidentals(-7, false), Some("Cb"));
        assert_eq!(key_for_accidentals(7, true), Some("A#"));
        assert_eq!(key_for_accidentals(8, false), None);
        assert_eq!(instrument_names().len(), 128 + DRUM_KITS.len());
    }
}
