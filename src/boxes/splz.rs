//! Polarization pattern box (`splz`).
//!
//! A periodic grid of polarization filter angles, optionally restricted
//! to a subset of components. The f32 bit pattern `0xFFFFFFFF` marks a
//! position without a filter.

use crate::bitstream::{BoxHeader, BoxReader, BoxWriter};
use crate::boxes::{apply_indent, dump_box_header, read_full_box_version0};
use crate::errors::UncError;
use crate::fourcc::BoxType;
use crate::image::{is_no_filter, PolarizationPattern};
use crate::limits::SecurityLimits;

/// Polarization pattern box (`splz`).
#[derive(Debug, Clone, Default)]
pub struct Splz {
    pattern: PolarizationPattern,
    box_size: u64,
    header_size: u32,
}

impl Splz {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pattern(&mut self, pattern: PolarizationPattern) {
        self.pattern = pattern;
    }

    pub fn pattern(&self) -> &PolarizationPattern {
        &self.pattern
    }

    pub(crate) fn parse(
        payload: &[u8],
        header: &BoxHeader,
        limits: &SecurityLimits,
    ) -> Result<Self, UncError> {
        let mut r = BoxReader::new(payload);
        read_full_box_version0(&mut r, BoxType::Splz)?;

        let component_count = r.read_u32()?;
        limits.check_components(component_count)?;
        if component_count as u64 * 4 > r.remaining() {
            return Err(UncError::InvalidParameterValue(format!(
                "splz declares {component_count} component indices but the box is too small"
            )));
        }
        let mut component_indices = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            component_indices.push(r.read_u32()?);
        }

        let pattern_width = r.read_u16()?;
        let pattern_height = r.read_u16()?;
        if pattern_width == 0 || pattern_height == 0 {
            return Err(UncError::InvalidParameterValue(
                "splz pattern dimensions must be non-zero".into(),
            ));
        }

        let count = pattern_width as u64 * pattern_height as u64;
        if count * 4 > r.remaining() {
            return Err(UncError::InvalidParameterValue(format!(
                "splz declares {count} angles but the box is too small"
            )));
        }
        let mut polarization_angles = Vec::with_capacity(count as usize);
        for _ in 0..count {
            polarization_angles.push(r.read_f32()?);
        }

        Ok(Self {
            pattern: PolarizationPattern {
                component_indices,
                pattern_width,
                pattern_height,
                polarization_angles,
            },
            box_size: header.box_size,
            header_size: header.header_size + 4,
        })
    }

    pub fn write(&self, w: &mut BoxWriter) -> Result<(), UncError> {
        let expected = self.pattern.pattern_width as usize * self.pattern.pattern_height as usize;
        if self.pattern.polarization_angles.len() != expected {
            return Err(UncError::Usage(format!(
                "splz pattern has {} angles, expected {expected}",
                self.pattern.polarization_angles.len()
            )));
        }

        w.start_full_box(BoxType::Splz, 0, 0)?;
        w.write_u32(self.pattern.component_indices.len() as u32)?;
        for index in &self.pattern.component_indices {
            w.write_u32(*index)?;
        }
        w.write_u16(self.pattern.pattern_width)?;
        w.write_u16(self.pattern.pattern_height)?;
        for angle in &self.pattern.polarization_angles {
            w.write_f32(*angle)?;
        }
        w.end_box()
    }

    pub fn dump(&self, indent: usize) -> String {
        let mut s = dump_box_header(&BoxType::Splz, self.box_size, self.header_size);
        s.push_str("version: 0\nflags: 0\n");
        s.push_str(&format!(
            "component_count: {}\n",
            self.pattern.component_indices.len()
        ));
        for (i, index) in self.pattern.component_indices.iter().enumerate() {
            s.push_str(&format!("  component_index[{i}]: {index}\n"));
        }
        s.push_str(&format!("pattern_width: {}\n", self.pattern.pattern_width));
        s.push_str(&format!("pattern_height: {}\n", self.pattern.pattern_height));
        for y in 0..self.pattern.pattern_height {
            for x in 0..self.pattern.pattern_width {
                let idx = y as usize * self.pattern.pattern_width as usize + x as usize;
                let angle = self.pattern.polarization_angles[idx];
                if is_no_filter(angle) {
                    s.push_str(&format!("  [{x},{y}]: no filter\n"));
                } else {
                    s.push_str(&format!("  [{x},{y}]: {angle} degrees\n"));
                }
            }
        }
        apply_indent(s, indent)
    }
}
