//! Error types for the prefpb-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for prefpb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all prefpb operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Buffer exhausted in the middle of a field
    #[error("truncated data at offset {offset}: buffer ends mid-field")]
    TruncatedData {
        /// Byte offset where the error occurred, relative to the slice being decoded
        offset: usize,
    },

    /// Varint exceeded 10 bytes without a terminating byte
    #[error("varint overflow at offset {offset}: no terminator within 10 bytes")]
    VarintOverflow {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// Wire type outside the four supported kinds
    #[error("unsupported wire type {wire_type} at offset {offset}")]
    UnsupportedWireType {
        /// Byte offset of the field tag
        offset: usize,
        /// The raw 3-bit wire type value
        wire_type: u8,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new truncated data error
    pub fn truncated(offset: usize) -> Self {
        Self::TruncatedData { offset }
    }

    /// Creates a new varint overflow error
    pub fn varint_overflow(offset: usize) -> Self {
        Self::VarintOverflow { offset }
    }

    /// Creates a new unsupported wire type error
    pub fn unsupported_wire_type(offset: usize, wire_type: u8) -> Self {
        Self::UnsupportedWireType { offset, wire_type }
    }

    /// Returns true if this error indicates structurally corrupt input
    /// (as opposed to an I/O failure)
    pub fn is_corrupt_input(&self) -> bool {
        matches!(
            self,
            Self::TruncatedData { .. }
                | Self::VarintOverflow { .. }
                | Self::UnsupportedWireType { .. }
        )
    }
}
