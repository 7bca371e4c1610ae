use crate::DocumentFormat;
use anyhow::{Result, anyhow};
use log::info;
use std::fs;
use std::path::Path;

const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Pitch class, octave and scientific name of a midi note number, e.g. 60 -> ("C", 4, "C4").
pub fn note_name(midi: u8) -> (&'static str, i32, String) {
    let pitch = PITCH_CLASSES[(midi % 12) as usize];
    let octave = (midi / 12) as i32 - 1;
    (pitch, octave, format!("{pitch}{octave}"))
}

pub fn parse_format(s: &str) -> DocumentFormat {
    match s.to_lowercase().as_str() {
        "n" | "nested" | "midispec" => DocumentFormat::Nested,
        "f" | "flat" | "simple" | "simplemidispec" => DocumentFormat::Flat,
        other => {
            info!("Unknown format '{}', defaulting to `nested`..!", other);
            DocumentFormat::Nested
        }
    }
}

/// Reads a whole document, or stdin when the path is `-`.
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    if path == Path::new("-") {
        return std::io::read_to_string(std::io::stdin())
            .map_err(|e| anyhow!("Failed to read document from stdin: {}", e));
    }

    fs::read_to_string(path).map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn note_names() {
        assert_eq!(note_name(60), ("C", 4, "C4".to_owned()));
        assert_eq!(note_name(0), ("C", -1, "C-1".to_owned()));
        assert_eq!(note_name(69).2, "A4");
        assert_eq!(note_name(127).2, "G9");
        assert_eq!(note_name(61).0, "C#");
    }

    #[test]
    fn formats() {
        env_logger::try_init().unwrap_or(());

        assert_eq!(parse_format("Flat"), DocumentFormat::Flat);
        assert_eq!(parse_format("n"), DocumentFormat::Nested);
        assert_eq!(parse_format("SimpleMidiSpec"), DocumentFormat::Flat);
        assert_eq!(parse_format("yaml"), DocumentFormat::Nested);
    }

    #[test]
    fn missing_document() {
        let err = read_document("./no/such/document.json").unwrap_err();
        assert!(err.to_string().contains("./no/such/document.json"));
    }
}
