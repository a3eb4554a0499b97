//! Descriptor boxes of the ISO 23001-17 uncompressed image format.
//!
//! One module per box. Every box exposes `parse` / `write` / `dump`;
//! `parse` rejects non-zero reserved fields and unsupported FullBox
//! versions, `write` always emits the canonical form, and `dump` is the
//! stable line-per-field diagnostic the test suite pins down.

pub mod cloc;
pub mod cmpc;
pub mod cmpd;
pub mod cpat;
pub mod icef;
pub mod sbpm;
pub mod snuc;
pub mod splz;
pub mod uncc;

pub use cloc::Cloc;
pub use cmpc::CmpC;
pub use cmpd::{component_type, Cmpd, Component};
pub use cpat::Cpat;
pub use icef::{CompressedUnitInfo, Icef};
pub use sbpm::Sbpm;
pub use snuc::Snuc;
pub use splz::Splz;
pub use uncc::{ComponentFormat, InterleaveType, SamplingType, UncC, UncCComponent};

use std::io::Cursor;

use crate::bitstream::read_box_header;
use crate::errors::UncError;
use crate::fourcc::BoxType;
use crate::limits::SecurityLimits;

/// Any descriptor box this crate understands.
#[derive(Debug, Clone)]
pub enum UncBox {
    Cmpd(Cmpd),
    UncC(UncC),
    CmpC(CmpC),
    Icef(Icef),
    Cpat(Cpat),
    Splz(Splz),
    Sbpm(Sbpm),
    Snuc(Snuc),
    Cloc(Cloc),
}

impl UncBox {
    pub fn box_type(&self) -> BoxType {
        match self {
            Self::Cmpd(_) => BoxType::Cmpd,
            Self::UncC(_) => BoxType::UncC,
            Self::CmpC(_) => BoxType::CmpC,
            Self::Icef(_) => BoxType::Icef,
            Self::Cpat(_) => BoxType::Cpat,
            Self::Splz(_) => BoxType::Splz,
            Self::Sbpm(_) => BoxType::Sbpm,
            Self::Snuc(_) => BoxType::Snuc,
            Self::Cloc(_) => BoxType::Cloc,
        }
    }

    pub fn write(&self, w: &mut crate::bitstream::BoxWriter) -> Result<(), UncError> {
        match self {
            Self::Cmpd(b) => b.write(w),
            Self::UncC(b) => b.write(w),
            Self::CmpC(b) => b.write(w),
            Self::Icef(b) => b.write(w),
            Self::Cpat(b) => b.write(w),
            Self::Splz(b) => b.write(w),
            Self::Sbpm(b) => b.write(w),
            Self::Snuc(b) => b.write(w),
            Self::Cloc(b) => b.write(w),
        }
    }

    pub fn dump(&self, indent: usize) -> String {
        match self {
            Self::Cmpd(b) => b.dump(indent),
            Self::UncC(b) => b.dump(indent),
            Self::CmpC(b) => b.dump(indent),
            Self::Icef(b) => b.dump(indent),
            Self::Cpat(b) => b.dump(indent),
            Self::Splz(b) => b.dump(indent),
            Self::Sbpm(b) => b.dump(indent),
            Self::Snuc(b) => b.dump(indent),
            Self::Cloc(b) => b.dump(indent),
        }
    }
}

/// Parses the box starting at `data[0]`. Returns the box and the number
/// of bytes it occupied, so callers can iterate a box sequence.
pub fn read_box(data: &[u8], limits: &SecurityLimits) -> Result<(UncBox, usize), UncError> {
    let mut cursor = Cursor::new(data);
    let header = read_box_header(&mut cursor, limits)?;

    if header.box_size > data.len() as u64 {
        return Err(UncError::InvalidParameterValue(format!(
            "box '{}' declares size {} but only {} bytes are available",
            header.box_type,
            header.box_size,
            data.len()
        )));
    }

    let payload = &data[header.header_size as usize..header.box_size as usize];

    let parsed = match &header.box_type {
        BoxType::Cmpd => UncBox::Cmpd(Cmpd::parse(payload, &header, limits)?),
        BoxType::UncC => UncBox::UncC(UncC::parse(payload, &header, limits)?),
        BoxType::CmpC => UncBox::CmpC(CmpC::parse(payload, &header, limits)?),
        BoxType::Icef => UncBox::Icef(Icef::parse(payload, &header, limits)?),
        BoxType::Cpat => UncBox::Cpat(Cpat::parse(payload, &header, limits)?),
        BoxType::Splz => UncBox::Splz(Splz::parse(payload, &header, limits)?),
        BoxType::Sbpm => UncBox::Sbpm(Sbpm::parse(payload, &header, limits)?),
        BoxType::Snuc => UncBox::Snuc(Snuc::parse(payload, &header, limits)?),
        BoxType::Cloc => UncBox::Cloc(Cloc::parse(payload, &header, limits)?),
        BoxType::Custom(fourcc) => {
            return Err(UncError::UnsupportedFeature(format!(
                "box type '{fourcc}' is not handled"
            )))
        }
    };

    Ok((parsed, header.box_size as usize))
}

/// Reads a FullBox version/flags pair and rejects any data version
/// other than 0. Returns the flags.
pub(crate) fn read_full_box_version0(
    r: &mut crate::bitstream::BoxReader,
    box_type: BoxType,
) -> Result<u32, UncError> {
    let (version, flags) = r.read_full_box_header()?;
    if version != 0 {
        return Err(UncError::UnsupportedDataVersion { box_type, version });
    }
    Ok(flags)
}

/// `Box: <fourcc> -----` header plus the size line shared by all dumps.
/// Sizes are zero for a constructed, never-parsed box.
pub(crate) fn dump_box_header(box_type: &BoxType, box_size: u64, header_size: u32) -> String {
    format!("Box: {box_type} -----\nsize: {box_size}   (header size: {header_size})\n")
}

/// Prefixes every line with `2 * indent` spaces.
pub(crate) fn apply_indent(text: String, indent: usize) -> String {
    if indent == 0 {
        return text;
    }
    let prefix = "  ".repeat(indent);
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        out.push_str(&prefix);
        out.push_str(line);
        out.push('\n');
    }
    out
}
