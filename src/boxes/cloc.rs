//! Chroma location box (`cloc`).
//!
//! A single enumeration value 0..6 describing where subsampled chroma
//! samples sit relative to luma: values 0..5 per ISO 23091-2 /
//! ITU-T H.273, value 6 per the ISO 23001-17 extension.

use crate::bitstream::{BoxHeader, BoxReader, BoxWriter};
use crate::boxes::{apply_indent, dump_box_header, read_full_box_version0};
use crate::errors::UncError;
use crate::fourcc::BoxType;
use crate::limits::SecurityLimits;

/// Horizontal/vertical chroma sample shifts (in luma samples) for a
/// chroma location value. Rendered as strings since shifts are halves.
pub fn chroma_shifts(location: u8) -> (&'static str, &'static str) {
    match location {
        0 => ("0", "0.5"),
        1 => ("0.5", "0.5"),
        2 => ("0", "0"),
        3 => ("0.5", "0"),
        4 => ("0", "1"),
        5 => ("0.5", "1"),
        // ISO 23001-17 extension: first field (0,0), second field (1,0).
        6 => ("0", "0"),
        _ => ("?", "?"),
    }
}

/// Chroma location box (`cloc`).
#[derive(Debug, Clone, Default)]
pub struct Cloc {
    chroma_location: u8,
    box_size: u64,
    header_size: u32,
}

impl Cloc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_chroma_location(&mut self, location: u8) {
        self.chroma_location = location;
    }

    pub fn chroma_location(&self) -> u8 {
        self.chroma_location
    }

    pub(crate) fn parse(
        payload: &[u8],
        header: &BoxHeader,
        _limits: &SecurityLimits,
    ) -> Result<Self, UncError> {
        let mut r = BoxReader::new(payload);
        read_full_box_version0(&mut r, BoxType::Cloc)?;

        let chroma_location = r.read_u8()?;
        if chroma_location > 6 {
            return Err(UncError::InvalidParameterValue(format!(
                "chroma location {chroma_location} outside range [0,6]"
            )));
        }

        Ok(Self {
            chroma_location,
            box_size: header.box_size,
            header_size: header.header_size + 4,
        })
    }

    pub fn write(&self, w: &mut BoxWriter) -> Result<(), UncError> {
        if self.chroma_location > 6 {
            return Err(UncError::Usage(format!(
                "chroma location {} outside range [0,6]",
                self.chroma_location
            )));
        }
        w.start_full_box(BoxType::Cloc, 0, 0)?;
        w.write_u8(self.chroma_location)?;
        w.end_box()
    }

    pub fn dump(&self, indent: usize) -> String {
        let mut s = dump_box_header(&BoxType::Cloc, self.box_size, self.header_size);
        s.push_str("version: 0\nflags: 0\n");
        let (h, v) = chroma_shifts(self.chroma_location);
        s.push_str(&format!(
            "chroma_location: {} (h={:<5}v={})\n",
            self.chroma_location,
            format!("{h},"),
            v
        ));
        apply_indent(s, indent)
    }
}
