//! Generic compression configuration box (`cmpC`).
//!
//! Names the compression method applied to the coded data and the unit
//! granularity that each `icef` entry indexes.

use crate::bitstream::{BoxHeader, BoxReader, BoxWriter};
use crate::boxes::{apply_indent, dump_box_header, read_full_box_version0};
use crate::errors::UncError;
use crate::fourcc::{BoxType, FourCC};
use crate::limits::SecurityLimits;

/// Compressed unit granularities for `compressed_unit_type`.
pub mod compressed_unit {
    /// Whole tile per unit.
    pub const TILE: u8 = 0;
    /// One tile row per unit.
    pub const TILE_ROW: u8 = 1;
    /// One tile component per unit.
    pub const TILE_COMPONENT: u8 = 2;
    /// One row of one tile component per unit.
    pub const TILE_ROW_COMPONENT: u8 = 3;
}

/// Generic compression configuration box (`cmpC`).
#[derive(Debug, Clone, Default)]
pub struct CmpC {
    pub compression_type: FourCC,
    pub compressed_unit_type: u8,
    pub(crate) box_size: u64,
    pub(crate) header_size: u32,
}

impl CmpC {
    pub fn new(compression_type: FourCC, compressed_unit_type: u8) -> Self {
        Self {
            compression_type,
            compressed_unit_type,
            box_size: 0,
            header_size: 0,
        }
    }

    pub(crate) fn parse(
        payload: &[u8],
        header: &BoxHeader,
        _limits: &SecurityLimits,
    ) -> Result<Self, UncError> {
        let mut r = BoxReader::new(payload);
        read_full_box_version0(&mut r, BoxType::CmpC)?;

        let compression_type = FourCC::from_u32(r.read_u32()?);
        let compressed_unit_type = r.read_u8()?;
        if compressed_unit_type > compressed_unit::TILE_ROW_COMPONENT {
            return Err(UncError::InvalidParameterValue(format!(
                "unknown compressed unit type {compressed_unit_type}"
            )));
        }

        Ok(Self {
            compression_type,
            compressed_unit_type,
            box_size: header.box_size,
            header_size: header.header_size + 4,
        })
    }

    pub fn write(&self, w: &mut BoxWriter) -> Result<(), UncError> {
        w.start_full_box(BoxType::CmpC, 0, 0)?;
        w.write_u32(self.compression_type.to_u32())?;
        w.write_u8(self.compressed_unit_type)?;
        w.end_box()
    }

    pub fn dump(&self, indent: usize) -> String {
        let mut s = dump_box_header(&BoxType::CmpC, self.box_size, self.header_size);
        s.push_str(&format!("compression_type: {}\n", self.compression_type));
        s.push_str(&format!(
            "compressed_entity_type: {}\n",
            self.compressed_unit_type
        ));
        apply_indent(s, indent)
    }
}
