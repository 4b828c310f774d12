//! # prefpb-core
//!
//! A byte-compatible codec for protobuf-encoded `.preferences_pb` key/value
//! files, plus a small file-backed editing session layer.
//!
//! The wire format (base-128 varints, fixed-width integers, length-delimited
//! submessages, oneof dispatch, generic unknown-field skipping) is
//! implemented from first principles; no protobuf runtime is involved.
//! Files written by this crate remain valid for the system that originally
//! produced them.
//!
//! ## Architecture
//!
//! - [`wire`]: varint/fixed-width primitives, tags, and the shared skip routine
//! - [`value`]: the seven-variant value oneof and its codec
//! - [`map`]: map entries and the top-level preference map codec
//! - [`store`]: file-backed editing sessions with copy-once backups
//! - [`error`]: error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use prefpb_core::{PreferenceValue, PrefsFile};
//!
//! let mut session = PrefsFile::open("./settings.preferences_pb")?;
//! session.map_mut().insert("dark_mode", PreferenceValue::Boolean(true));
//! session.save()?; // first save copies the original to settings.preferences_pb.bak
//! # Ok::<(), prefpb_core::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod map;
pub mod store;
pub mod value;
pub mod wire;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use map::PreferenceMap;
pub use store::PrefsFile;
pub use value::PreferenceValue;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Canonical file extension for preferences files
pub const FILE_EXTENSION: &str = "preferences_pb";
