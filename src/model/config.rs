use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "midispec",
    about = "Validate, convert and time JSON MIDI documents."
)]
pub struct Args {
    /// Print JSON on a single line instead of pretty-printing it.
    #[arg(short, long, global = true, default_value_t = false)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a document and print what survives validation.
    Validate {
        /// Path to the JSON document, or `-` for stdin.
        file: PathBuf,

        /// Document format: nested|flat.
        #[arg(short, long, default_value = "nested")]
        format: String,
    },

    /// Convert a nested document into the flat stream format.
    ToFlat {
        /// Path to the nested JSON document, or `-` for stdin.
        file: PathBuf,
    },

    /// Convert a flat document back into nested tracks.
    ToNested {
        /// Path to the flat JSON document, or `-` for stdin.
        file: PathBuf,
    },

    /// Print the total duration of a nested document in seconds, with every tempo change
    /// integrated.
    Duration { file: PathBuf },

    /// Print every note of a nested document placed in seconds.
    Timeline {
        file: PathBuf,

        /// Compute missing tempo times from the tempo table before converting.
        #[arg(short, long, default_value_t = false)]
        integrate: bool,

        /// Maximum notes to print per track.
        #[arg(long)]
        max: Option<usize>,
    },

    /// Import a Standard MIDI File into a nested document.
    Import {
        /// Path to the target MIDI file.
        midi: PathBuf,
    },

    /// Print the document schema as type declarations.
    Schema {
        /// Document format: nested|flat.
        #[arg(short, long, default_value = "nested")]
        format: String,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_subcommands() {
        let args = Args::parse_from(["midispec", "validate", "song.json", "--format", "flat"]);
        assert!(!args.compact);
        assert!(matches!(
            args.command,
            Command::Validate { ref format, .. } if format == "flat"
        ));

        let args = Args::parse_from(["midispec", "timeline", "-", "--integrate", "--max", "4", "-c"]);
        assert!(args.compact);
        assert!(matches!(
            args.command,
            Command::Timeline {
                integrate: true,
                max: Some(4),
                ..
            }
        ));

        let args = Args::parse_from(["midispec", "duration", "song.json"]);
        assert!(matches!(args.command, Command::Duration { .. }));

        assert!(Args::try_parse_from(["midispec", "duration", "song.json", "--integrate"]).is_err());
        assert!(Args::try_parse_from(["midispec", "to-flat"]).is_err());
    }
}
