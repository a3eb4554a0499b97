//! Sensor bad pixels map box (`sbpm`).
//!
//! Defective sensor rows, columns and individual pixels, optionally
//! restricted to a subset of components, with a flag recording whether
//! correction has already been applied.

use crate::bitstream::{BoxHeader, BoxReader, BoxWriter};
use crate::boxes::{apply_indent, dump_box_header, read_full_box_version0};
use crate::errors::UncError;
use crate::fourcc::BoxType;
use crate::image::{BadPixel, SensorBadPixelsMap};
use crate::limits::SecurityLimits;

/// Sensor bad pixels map box (`sbpm`).
#[derive(Debug, Clone, Default)]
pub struct Sbpm {
    map: SensorBadPixelsMap,
    box_size: u64,
    header_size: u32,
}

impl Sbpm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bad_pixels_map(&mut self, map: SensorBadPixelsMap) {
        self.map = map;
    }

    pub fn bad_pixels_map(&self) -> &SensorBadPixelsMap {
        &self.map
    }

    pub(crate) fn parse(
        payload: &[u8],
        header: &BoxHeader,
        limits: &SecurityLimits,
    ) -> Result<Self, UncError> {
        let mut r = BoxReader::new(payload);
        read_full_box_version0(&mut r, BoxType::Sbpm)?;

        let component_count = r.read_u32()?;
        limits.check_components(component_count)?;
        if component_count as u64 * 4 > r.remaining() {
            return Err(UncError::InvalidParameterValue(format!(
                "sbpm declares {component_count} component indices but the box is too small"
            )));
        }
        let mut component_indices = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            component_indices.push(r.read_u32()?);
        }

        let flags = r.read_u8()?;
        if flags & 0x7F != 0 {
            return Err(UncError::InvalidParameterValue(
                "non-zero reserved bits in sbpm flags".into(),
            ));
        }
        let correction_applied = flags & 0x80 != 0;

        let num_bad_rows = r.read_u32()?;
        let num_bad_columns = r.read_u32()?;
        let num_bad_pixels = r.read_u32()?;
        limits.check_bad_pixels(num_bad_rows)?;
        limits.check_bad_pixels(num_bad_columns)?;
        limits.check_bad_pixels(num_bad_pixels)?;
        let needed =
            (num_bad_rows as u64 + num_bad_columns as u64 + num_bad_pixels as u64 * 2) * 4;
        if needed > r.remaining() {
            return Err(UncError::InvalidParameterValue(
                "sbpm entry counts exceed the box payload".into(),
            ));
        }

        let mut bad_rows = Vec::with_capacity(num_bad_rows as usize);
        for _ in 0..num_bad_rows {
            bad_rows.push(r.read_u32()?);
        }
        let mut bad_columns = Vec::with_capacity(num_bad_columns as usize);
        for _ in 0..num_bad_columns {
            bad_columns.push(r.read_u32()?);
        }
        let mut bad_pixels = Vec::with_capacity(num_bad_pixels as usize);
        for _ in 0..num_bad_pixels {
            let row = r.read_u32()?;
            let column = r.read_u32()?;
            bad_pixels.push(BadPixel { row, column });
        }

        Ok(Self {
            map: SensorBadPixelsMap {
                component_indices,
                correction_applied,
                bad_rows,
                bad_columns,
                bad_pixels,
            },
            box_size: header.box_size,
            header_size: header.header_size + 4,
        })
    }

    pub fn write(&self, w: &mut BoxWriter) -> Result<(), UncError> {
        w.start_full_box(BoxType::Sbpm, 0, 0)?;
        w.write_u32(self.map.component_indices.len() as u32)?;
        for index in &self.map.component_indices {
            w.write_u32(*index)?;
        }
        w.write_u8(if self.map.correction_applied { 0x80 } else { 0 })?;
        w.write_u32(self.map.bad_rows.len() as u32)?;
        w.write_u32(self.map.bad_columns.len() as u32)?;
        w.write_u32(self.map.bad_pixels.len() as u32)?;
        for row in &self.map.bad_rows {
            w.write_u32(*row)?;
        }
        for column in &self.map.bad_columns {
            w.write_u32(*column)?;
        }
        for pixel in &self.map.bad_pixels {
            w.write_u32(pixel.row)?;
            w.write_u32(pixel.column)?;
        }
        w.end_box()
    }

    pub fn dump(&self, indent: usize) -> String {
        let mut s = dump_box_header(&BoxType::Sbpm, self.box_size, self.header_size);
        s.push_str("version: 0\nflags: 0\n");
        s.push_str(&format!(
            "component_count: {}\n",
            self.map.component_indices.len()
        ));
        for (i, index) in self.map.component_indices.iter().enumerate() {
            s.push_str(&format!("  component_index[{i}]: {index}\n"));
        }
        s.push_str(&format!(
            "correction_applied: {}\n",
            self.map.correction_applied as u8
        ));
        s.push_str(&format!("num_bad_rows: {}\n", self.map.bad_rows.len()));
        for (i, row) in self.map.bad_rows.iter().enumerate() {
            s.push_str(&format!("  bad_row[{i}]: {row}\n"));
        }
        s.push_str(&format!(
            "num_bad_columns: {}\n",
            self.map.bad_columns.len()
        ));
        for (i, column) in self.map.bad_columns.iter().enumerate() {
            s.push_str(&format!("  bad_column[{i}]: {column}\n"));
        }
        s.push_str(&format!("num_bad_pixels: {}\n", self.map.bad_pixels.len()));
        for (i, pixel) in self.map.bad_pixels.iter().enumerate() {
            s.push_str(&format!(
                "  bad_pixel[{i}]: ({}, {})\n",
                pixel.row, pixel.column
            ));
        }
        apply_indent(s, indent)
    }
}
