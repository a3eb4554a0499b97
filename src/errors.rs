//! Errors raised by the uncompressed-image codec core.

use std::fmt;

use crate::fourcc::{BoxType, FourCC};

/// Broad error categories.
///
/// Every [`UncError`] variant maps onto exactly one kind via
/// [`UncError::kind()`]. The enclosing container uses the kind to build
/// user-facing messages; the core only distinguishes behavior by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller violated the API contract.
    Usage,
    /// Wire data violates the specification.
    InvalidInput,
    /// Recognized but not implemented.
    UnsupportedFeature,
    /// Buffer request exceeded the security limits.
    MemoryAllocation,
    /// An upstream compression back-end failed.
    DecoderPlugin,
    /// Invariant broken inside the core.
    Internal,
}

#[derive(Debug)]
pub enum UncError {
    /// Converted `binrw` error. Truncated or otherwise
    /// malformed wire data.
    BinRead(binrw::Error),
    /// IO error from the underlying cursor.
    IoError(std::io::Error),
    /// Converted `Utf8Error` (component type URIs).
    Utf8Error(std::string::FromUtf8Error),
    /// Caller violated the API contract
    /// (null-ish argument, ID overflow, zero pattern dims).
    Usage(String),
    /// A wire field holds a value outside its legal range.
    InvalidParameterValue(String),
    /// A required descriptor box is missing.
    NoMandatoryProperty(String),
    /// FullBox data version this implementation does not handle.
    UnsupportedDataVersion { box_type: BoxType, version: u8 },
    /// Unknown or disabled generic compression method.
    UnsupportedCompressionMethod(FourCC),
    /// Recognized but unimplemented feature
    /// (e.g. an interleave mode other than `component`).
    UnsupportedFeature(String),
    /// Buffer request exceeded the security limits.
    MemoryAllocation(String),
    /// A compression back-end failed while decoding.
    DecoderPlugin(String),
    /// Invariant broken inside the core. Surfaced rather than
    /// asserted in release builds.
    Internal(String),
}

impl UncError {
    /// Maps the variant onto the broad taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BinRead(_)
            | Self::IoError(_)
            | Self::Utf8Error(_)
            | Self::InvalidParameterValue(_)
            | Self::NoMandatoryProperty(_) => ErrorKind::InvalidInput,
            Self::Usage(_) => ErrorKind::Usage,
            Self::UnsupportedDataVersion { .. }
            | Self::UnsupportedCompressionMethod(_)
            | Self::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            Self::MemoryAllocation(_) => ErrorKind::MemoryAllocation,
            Self::DecoderPlugin(_) => ErrorKind::DecoderPlugin,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl std::error::Error for UncError {}

impl fmt::Display for UncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BinRead(err) => write!(f, "{err}"),
            Self::IoError(err) => write!(f, "IO error: {err}"),
            Self::Utf8Error(err) => write!(f, "{err}"),
            Self::Usage(msg) => write!(f, "{msg}"),
            Self::InvalidParameterValue(msg) => write!(f, "{msg}"),
            Self::NoMandatoryProperty(msg) => write!(f, "Missing mandatory property: {msg}"),
            Self::UnsupportedDataVersion { box_type, version } => {
                write!(f, "{box_type} box data version {version} is not implemented yet")
            }
            Self::UnsupportedCompressionMethod(_) => {
                write!(f, "Unsupported unci compression method.")
            }
            Self::UnsupportedFeature(msg) => write!(f, "{msg}"),
            Self::MemoryAllocation(msg) => write!(f, "{msg}"),
            Self::DecoderPlugin(msg) => write!(f, "{msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

/// Converts std::io::Error to UncError
impl From<std::io::Error> for UncError {
    fn from(err: std::io::Error) -> Self {
        UncError::IoError(err)
    }
}

/// Converts binrw::Error to UncError
impl From<binrw::Error> for UncError {
    fn from(err: binrw::Error) -> Self {
        UncError::BinRead(err)
    }
}

/// Converts std::string::FromUtf8Error to UncError
impl From<std::string::FromUtf8Error> for UncError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        UncError::Utf8Error(err)
    }
}
