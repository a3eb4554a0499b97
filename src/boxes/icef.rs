//! Generic compressed unit info box (`icef`).
//!
//! An ordered `(offset, size)` index over the compressed units of an
//! item, in tile raster order. Field widths are selected by a header
//! byte packing `(offset_code << 5) | (size_code << 2)`:
//!
//! | code | offset field | size field |
//! |------|--------------|------------|
//! | 0    | implied      | 8 bit      |
//! | 1    | 16 bit       | 16 bit     |
//! | 2    | 24 bit       | 24 bit     |
//! | 3    | 32 bit       | 32 bit     |
//! | 4    | 64 bit       | 64 bit     |
//!
//! "Implied" offsets are the running sum of the preceding unit sizes.
//! The writer picks the smallest codes that fit, preferring implied
//! offsets when the stored offsets are exactly cumulative.

use crate::bitstream::{BoxHeader, BoxReader, BoxWriter};
use crate::boxes::{apply_indent, dump_box_header, read_full_box_version0};
use crate::errors::UncError;
use crate::fourcc::BoxType;
use crate::limits::SecurityLimits;

/// Bytes per offset field, indexed by offset code. Code 0 = implied.
const OFFSET_FIELD_BYTES: [u32; 5] = [0, 2, 3, 4, 8];
/// Bytes per size field, indexed by size code.
const SIZE_FIELD_BYTES: [u32; 5] = [1, 2, 3, 4, 8];

/// One compressed unit: byte extent within the item data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressedUnitInfo {
    pub unit_offset: u64,
    pub unit_size: u64,
}

/// Generic compressed unit info box (`icef`).
#[derive(Debug, Clone, Default)]
pub struct Icef {
    units: Vec<CompressedUnitInfo>,
    box_size: u64,
    header_size: u32,
}

impl Icef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&mut self, unit: CompressedUnitInfo) {
        self.units.push(unit);
    }

    pub fn units(&self) -> &[CompressedUnitInfo] {
        &self.units
    }

    /// Offset directly after the last unit; the next unit to append
    /// starts here when units are laid out back to back.
    pub fn next_offset(&self) -> u64 {
        self.units
            .last()
            .map(|u| u.unit_offset + u.unit_size)
            .unwrap_or(0)
    }

    pub(crate) fn parse(
        payload: &[u8],
        header: &BoxHeader,
        limits: &SecurityLimits,
    ) -> Result<Self, UncError> {
        let mut r = BoxReader::new(payload);
        read_full_box_version0(&mut r, BoxType::Icef)?;

        let codes = r.read_u8()?;
        if codes & 0b0000_0011 != 0 {
            return Err(UncError::InvalidParameterValue(
                "non-zero reserved bits in icef field codes".into(),
            ));
        }
        let offset_code = ((codes >> 5) & 0b111) as usize;
        let size_code = ((codes >> 2) & 0b111) as usize;
        if offset_code >= OFFSET_FIELD_BYTES.len() || size_code >= SIZE_FIELD_BYTES.len() {
            return Err(UncError::InvalidParameterValue(format!(
                "unsupported icef field codes (offset {offset_code}, size {size_code})"
            )));
        }

        let count = r.read_u32()?;
        limits.check_icef_units(count)?;
        let unit_bytes = OFFSET_FIELD_BYTES[offset_code] + SIZE_FIELD_BYTES[size_code];
        if count as u64 * unit_bytes as u64 > r.remaining() {
            return Err(UncError::InvalidParameterValue(format!(
                "icef declares {count} units but the box is too small"
            )));
        }

        let mut units = Vec::with_capacity(count as usize);
        let mut implied_offset = 0u64;
        for _ in 0..count {
            let explicit_offset = if offset_code == 0 {
                None
            } else {
                Some(r.read_uint(OFFSET_FIELD_BYTES[offset_code])?)
            };
            let unit_size = r.read_uint(SIZE_FIELD_BYTES[size_code])?;
            let unit_offset = match explicit_offset {
                Some(offset) => offset,
                None => {
                    let offset = implied_offset;
                    implied_offset = offset.checked_add(unit_size).ok_or_else(|| {
                        UncError::InvalidParameterValue("icef unit sizes overflow".into())
                    })?;
                    offset
                }
            };
            units.push(CompressedUnitInfo {
                unit_offset,
                unit_size,
            });
        }

        Ok(Self {
            units,
            box_size: header.box_size,
            header_size: header.header_size + 4,
        })
    }

    fn required_offset_code(&self) -> usize {
        let mut running = 0u64;
        let implied_ok = self.units.iter().all(|u| {
            let matches = u.unit_offset == running;
            running = running.saturating_add(u.unit_size);
            matches
        });
        if implied_ok {
            return 0;
        }
        match self.units.iter().map(|u| u.unit_offset).max().unwrap_or(0) {
            0..=0xFFFF => 1,
            0x1_0000..=0xFF_FFFF => 2,
            0x100_0000..=0xFFFF_FFFF => 3,
            _ => 4,
        }
    }

    fn required_size_code(&self) -> usize {
        match self.units.iter().map(|u| u.unit_size).max().unwrap_or(0) {
            0..=0xFF => 0,
            0x100..=0xFFFF => 1,
            0x1_0000..=0xFF_FFFF => 2,
            0x100_0000..=0xFFFF_FFFF => 3,
            _ => 4,
        }
    }

    pub fn write(&self, w: &mut BoxWriter) -> Result<(), UncError> {
        let offset_code = self.required_offset_code();
        let size_code = self.required_size_code();

        w.start_full_box(BoxType::Icef, 0, 0)?;
        w.write_u8(((offset_code as u8) << 5) | ((size_code as u8) << 2))?;
        w.write_u32(self.units.len() as u32)?;
        for unit in &self.units {
            if offset_code != 0 {
                w.write_uint(unit.unit_offset, OFFSET_FIELD_BYTES[offset_code])?;
            }
            w.write_uint(unit.unit_size, SIZE_FIELD_BYTES[size_code])?;
        }
        w.end_box()
    }

    pub fn dump(&self, indent: usize) -> String {
        let mut s = dump_box_header(&BoxType::Icef, self.box_size, self.header_size);
        s.push_str(&format!("num_compressed_units: {}\n", self.units.len()));
        for unit in &self.units {
            s.push_str(&format!(
                "unit_offset: {}, unit_size: {}\n",
                unit.unit_offset, unit.unit_size
            ));
        }
        apply_indent(s, indent)
    }
}
