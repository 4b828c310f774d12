//! prefpb - Inspect and edit protobuf-encoded `.preferences_pb` files
//!
//! This tool decodes preferences files into their key/value entries, prints
//! or modifies them, and writes them back byte-compatibly. The first save in
//! a session copies the pre-edit file to `<name>.bak`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use prefpb_core::{PreferenceMap, PreferenceValue, PrefsFile, FILE_EXTENSION};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Inspect and edit .preferences_pb key/value files
#[derive(Parser, Debug)]
#[command(name = "prefpb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every entry of a file, or of all preferences files under a directory
    Dump {
        /// Preferences file to dump
        #[arg(short, long, conflicts_with = "directory", required_unless_present = "directory")]
        file: Option<PathBuf>,

        /// Recursively dump every *.preferences_pb under this directory
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: DumpFormat,
    },

    /// Print the value stored under one key
    Get {
        /// Preferences file to read
        file: PathBuf,
        /// Key to look up
        key: String,
    },

    /// Insert or replace a key (retyping is allowed)
    Set {
        /// Preferences file to edit (created if missing)
        file: PathBuf,
        /// Key to set
        key: String,
        /// Value type
        #[arg(short = 't', long = "type", value_enum)]
        value_type: ValueType,
        /// Value; repeat for string-set elements (order preserved)
        #[arg(required_unless_present = "absent", num_args = 0..)]
        values: Vec<String>,
        /// Store the key with no value payload
        #[arg(long, conflicts_with = "values")]
        absent: bool,
    },

    /// Remove a key
    Remove {
        /// Preferences file to edit
        file: PathBuf,
        /// Key to remove
        key: String,
    },
}

/// Output format for dump
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DumpFormat {
    /// "key (kind) = value" lines
    Text,
    /// Key names only (for scripting)
    Keys,
}

/// Value types a key can hold
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ValueType {
    Bool,
    Float,
    Int,
    Long,
    String,
    StringSet,
    Double,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match cli.command {
        Command::Dump {
            file,
            directory,
            format,
        } => match (file, directory) {
            (Some(file), None) => dump_file(&file, format),
            (None, Some(directory)) => dump_directory(&directory, format),
            _ => bail!("either a file or --directory must be specified"),
        },
        Command::Get { file, key } => get_key(&file, &key),
        Command::Set {
            file,
            key,
            value_type,
            values,
            absent,
        } => set_key(&file, &key, value_type, &values, absent),
        Command::Remove { file, key } => remove_key(&file, &key),
    }
}

/// Decode and print one preferences file
fn dump_file(file: &Path, format: DumpFormat) -> Result<()> {
    let session = PrefsFile::open(file)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    print_map(session.map(), format);
    Ok(())
}

/// Walk a directory and dump every preferences file found
fn dump_directory(directory: &Path, format: DumpFormat) -> Result<()> {
    if !directory.is_dir() {
        bail!("not a directory: {}", directory.display());
    }

    let mut found = 0usize;
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !is_preferences_file(path) {
            trace!("skipping {}", path.display());
            continue;
        }

        debug!("dumping {}", path.display());
        println!("# {}", path.display());
        // A corrupt file should not stop the rest of the walk
        if let Err(e) = dump_file(path, format) {
            warn!("skipping {}: {:#}", path.display(), e);
        }
        found += 1;
    }

    if found == 0 {
        warn!(
            "no *.{} files found under {}",
            FILE_EXTENSION,
            directory.display()
        );
    }
    Ok(())
}

fn is_preferences_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == FILE_EXTENSION)
}

fn print_map(map: &PreferenceMap, format: DumpFormat) {
    match format {
        DumpFormat::Text => {
            for (key, value) in map.iter() {
                println!("{key} ({}) = {value}", value.kind());
            }
        }
        DumpFormat::Keys => {
            for key in map.keys() {
                println!("{key}");
            }
        }
    }
}

fn get_key(file: &Path, key: &str) -> Result<()> {
    let session = PrefsFile::open(file)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    match session.map().get(key) {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => bail!("key not found: {key}"),
    }
}

fn set_key(
    file: &Path,
    key: &str,
    value_type: ValueType,
    values: &[String],
    absent: bool,
) -> Result<()> {
    if key.is_empty() {
        bail!("keys must be non-empty");
    }

    let value = if absent {
        PreferenceValue::Absent
    } else {
        parse_value(value_type, values)?
    };

    let mut session = PrefsFile::open_or_create(file)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    let previous = session.map_mut().insert(key.to_string(), value);
    session
        .save()
        .with_context(|| format!("failed to save {}", file.display()))?;

    match previous {
        Some(old) => println!("replaced {key} (was {old})"),
        None => println!("added {key}"),
    }
    Ok(())
}

/// Parse command-line arguments into a typed preference value
fn parse_value(value_type: ValueType, values: &[String]) -> Result<PreferenceValue> {
    // Everything except string-set takes exactly one argument
    if !matches!(value_type, ValueType::StringSet) && values.len() != 1 {
        bail!(
            "expected exactly one value for type {:?}, got {}",
            value_type,
            values.len()
        );
    }

    Ok(match value_type {
        ValueType::Bool => {
            let v = values[0]
                .parse::<bool>()
                .with_context(|| format!("not a bool: {}", values[0]))?;
            PreferenceValue::Boolean(v)
        }
        ValueType::Float => {
            let v = values[0]
                .parse::<f32>()
                .with_context(|| format!("not a float: {}", values[0]))?;
            PreferenceValue::Float(v)
        }
        ValueType::Int => {
            let v = values[0]
                .parse::<i32>()
                .with_context(|| format!("not a 32-bit integer: {}", values[0]))?;
            PreferenceValue::Integer(v)
        }
        ValueType::Long => {
            let v = values[0]
                .parse::<i64>()
                .with_context(|| format!("not a 64-bit integer: {}", values[0]))?;
            PreferenceValue::Long(v)
        }
        ValueType::String => PreferenceValue::String(values[0].clone()),
        ValueType::StringSet => PreferenceValue::StringSet(values.to_vec()),
        ValueType::Double => {
            let v = values[0]
                .parse::<f64>()
                .with_context(|| format!("not a double: {}", values[0]))?;
            PreferenceValue::Double(v)
        }
    })
}

fn remove_key(file: &Path, key: &str) -> Result<()> {
    let mut session = PrefsFile::open(file)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    let Some(old) = session.map_mut().remove(key) else {
        bail!("key not found: {key}");
    };
    session
        .save()
        .with_context(|| format!("failed to save {}", file.display()))?;
    println!("removed {key} (was {old})");
    Ok(())
}
