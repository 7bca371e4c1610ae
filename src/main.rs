use anyhow::Result;
use clap::Parser;
use log::{debug, error, info};
use midispec::{
    Args, Command, DocumentFormat, MidiSpec, TempoMap, flat_to_nested, hydrate, import_midi_file,
    nested_to_flat, parse_flat, parse_format, parse_nested, read_document,
    total_duration_seconds,
};
use serde::Serialize;
use std::process::ExitCode;

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };

    println!("{}", rendered);
    Ok(())
}

fn print_validated(text: &str, format: DocumentFormat, compact: bool) -> Result<bool> {
    let result = match format {
        DocumentFormat::Nested => parse_nested(text).map(|midi| serde_json::to_value(&midi)),
        DocumentFormat::Flat => parse_flat(text).map(|simple| serde_json::to_value(&simple)),
    };

    match result {
        Ok(value) => {
            info!("Document is a valid {}..!", format.type_name());
            print_json(&value?, compact)?;
            Ok(true)
        }
        Err(err) => {
            error!("Invalid {}: {}", format.type_name(), err);
            Ok(false)
        }
    }
}

fn load_nested(file: &std::path::Path) -> Result<MidiSpec> {
    let midi = parse_nested(&read_document(file)?)?;
    debug!(
        "Loaded '{}' with {} track(s) and {} note(s)",
        midi.header.name,
        midi.tracks.len(),
        midi.note_count()
    );
    Ok(midi)
}

fn run(args: Args) -> Result<bool> {
    match args.command {
        Command::Validate { file, format } => {
            let format = parse_format(&format);
            print_validated(&read_document(&file)?, format, args.compact)
        }
        Command::ToFlat { file } => {
            let midi = load_nested(&file)?;
            print_json(&nested_to_flat(&midi), args.compact)?;
            Ok(true)
        }
        Command::ToNested { file } => {
            let simple = parse_flat(&read_document(&file)?)?;
            print_json(&flat_to_nested(&simple), args.compact)?;
            Ok(true)
        }
        Command::Duration { file } => {
            let midi = load_nested(&file)?;
            println!("{:.3}", total_duration_seconds(&midi));
            Ok(true)
        }
        Command::Timeline {
            file,
            integrate,
            max,
        } => {
            let midi = load_nested(&file)?;
            let mut timeline = if integrate {
                hydrate(&midi, &TempoMap::integrated(&midi))
            } else {
                hydrate(&midi, &TempoMap::for_midi(&midi))
            };

            if let Some(max) = max {
                info!("Previewing at most {} notes per track..!", max);
                for track in timeline.tracks.iter_mut() {
                    track.notes.truncate(max);
                }
            }

            print_json(&timeline, args.compact)?;
            Ok(true)
        }
        Command::Import { midi } => {
            info!("Importing MIDI file: '{}'...", midi.display());
            let imported = import_midi_file(&midi)?;
            print_json(&imported, args.compact)?;
            Ok(true)
        }
        Command::Schema { format } => {
            let format = parse_format(&format);
            print!("{}", format.schema().declaration(format.type_name()));
            Ok(true)
        }
    }
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    if run(args)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
