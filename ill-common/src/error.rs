//! Error type for decoding and encoding asset files.

use std::io;

use crate::formats::magic_tag;

/// Failure while reading or writing one of the binary asset formats.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The 8-byte tag does not match the format being read
    #[error("bad magic: expected {}, found {}", magic_tag(*.expected), magic_tag(*.found))]
    BadMagic { expected: u64, found: u64 },

    /// The 8-byte tag matches none of the known formats
    #[error("not a registry, skeleton, animation or mesh file (magic {})", magic_tag(*.0))]
    UnknownMagic(u64),

    /// Input ended in the middle of a field
    #[error("file is truncated")]
    Truncated,

    /// A length-prefixed string is not valid UTF-8
    #[error("invalid string: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),

    /// Bytes left over after the last field of the file
    #[error("{0} unexpected trailing bytes")]
    TrailingData(usize),

    /// A count does not fit the width of its field
    #[error("{what} count {count} exceeds the format limit of {max}")]
    TooMany {
        what: &'static str,
        count: usize,
        max: usize,
    },

    /// Structurally inconsistent data
    #[error("{0}")]
    Invalid(String),

    /// Any other I/O failure
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for FormatError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::Truncated
        } else {
            FormatError::Io(err)
        }
    }
}
