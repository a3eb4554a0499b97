//! FourCC tags for the ISO 23001-17 descriptor set.
//!
//! [`BoxType`] identifies the descriptor boxes this crate understands;
//! [`FourCC`] is the plain four-byte tag used for `uncC` profiles and
//! generic compression methods.

use std::fmt::Display;

/// Descriptor box FourCC.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoxType {
    /// Component definition box
    Cmpd,
    /// Uncompressed frame configuration box
    UncC,
    /// Generic compression configuration box
    CmpC,
    /// Generic compressed unit info box
    Icef,
    /// Component pattern definition box (Bayer / filter array)
    Cpat,
    /// Polarization pattern box
    Splz,
    /// Sensor bad pixels map box
    Sbpm,
    /// Sensor non-uniformity correction box
    Snuc,
    /// Chroma location box
    Cloc,

    Custom(FourCC),
}

impl BoxType {
    pub fn from_fourcc(fourcc: FourCC) -> Self {
        match &fourcc.0 {
            b"cmpd" => Self::Cmpd,
            b"uncC" => Self::UncC,
            b"cmpC" => Self::CmpC,
            b"icef" => Self::Icef,
            b"cpat" => Self::Cpat,
            b"splz" => Self::Splz,
            b"sbpm" => Self::Sbpm,
            b"snuc" => Self::Snuc,
            b"cloc" => Self::Cloc,
            _ => Self::Custom(fourcc),
        }
    }

    pub fn from_u32(value: u32) -> Self {
        Self::from_fourcc(FourCC(value.to_be_bytes()))
    }

    pub fn fourcc(&self) -> FourCC {
        match self {
            Self::Cmpd => FourCC(*b"cmpd"),
            Self::UncC => FourCC(*b"uncC"),
            Self::CmpC => FourCC(*b"cmpC"),
            Self::Icef => FourCC(*b"icef"),
            Self::Cpat => FourCC(*b"cpat"),
            Self::Splz => FourCC(*b"splz"),
            Self::Sbpm => FourCC(*b"sbpm"),
            Self::Snuc => FourCC(*b"snuc"),
            Self::Cloc => FourCC(*b"cloc"),
            Self::Custom(fcc) => *fcc,
        }
    }
}

impl Display for BoxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fourcc())
    }
}

/// Plain four-byte tag.
///
/// Used for `uncC` profiles (e.g. `rgba`) and generic compression
/// methods (`defl`, `zlib`, `brot`). Stored in wire order; the numeric
/// value is the big-endian interpretation of the four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn new(tag: &[u8; 4]) -> Self {
        Self(*tag)
    }

    pub fn from_u32(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tags are ISO8859-1, not UTF-8. Single bytes map straight to
        // chars; non-printable bytes render as '.'.
        for b in self.0 {
            let c = if (0x20..0x7f).contains(&b) { b as char } else { '.' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
