//! Component pattern definition box (`cpat`).
//!
//! Carries the periodic filter-array (Bayer) pattern: for every pattern
//! position the referenced `cmpd` component and a gain factor.

use crate::bitstream::{BoxHeader, BoxReader, BoxWriter};
use crate::boxes::{apply_indent, dump_box_header, read_full_box_version0};
use crate::errors::UncError;
use crate::fourcc::BoxType;
use crate::image::{BayerPattern, BayerPatternPixel};
use crate::limits::SecurityLimits;

/// Component pattern definition box (`cpat`).
#[derive(Debug, Clone, Default)]
pub struct Cpat {
    pattern: BayerPattern,
    box_size: u64,
    header_size: u32,
}

impl Cpat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pattern(&mut self, pattern: BayerPattern) {
        self.pattern = pattern;
    }

    pub fn pattern(&self) -> &BayerPattern {
        &self.pattern
    }

    pub(crate) fn parse(
        payload: &[u8],
        header: &BoxHeader,
        _limits: &SecurityLimits,
    ) -> Result<Self, UncError> {
        let mut r = BoxReader::new(payload);
        read_full_box_version0(&mut r, BoxType::Cpat)?;

        let pattern_width = r.read_u16()?;
        let pattern_height = r.read_u16()?;
        if pattern_width == 0 || pattern_height == 0 {
            return Err(UncError::InvalidParameterValue(
                "cpat pattern dimensions must be non-zero".into(),
            ));
        }

        let count = pattern_width as u64 * pattern_height as u64;
        if count * 8 > r.remaining() {
            return Err(UncError::InvalidParameterValue(format!(
                "cpat declares {count} pattern positions but the box is too small"
            )));
        }

        let mut pixels = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let index = r.read_u32()?;
            let component_index = u16::try_from(index).map_err(|_| {
                UncError::InvalidParameterValue(format!(
                    "cpat component index {index} exceeds the component range"
                ))
            })?;
            let component_gain = r.read_f32()?;
            pixels.push(BayerPatternPixel {
                component_index,
                component_gain,
            });
        }

        Ok(Self {
            pattern: BayerPattern {
                pattern_width,
                pattern_height,
                pixels,
            },
            box_size: header.box_size,
            header_size: header.header_size + 4,
        })
    }

    pub fn write(&self, w: &mut BoxWriter) -> Result<(), UncError> {
        let expected = self.pattern.pattern_width as usize * self.pattern.pattern_height as usize;
        if self.pattern.pixels.len() != expected {
            return Err(UncError::Usage(format!(
                "cpat pattern has {} entries, expected {expected}",
                self.pattern.pixels.len()
            )));
        }

        w.start_full_box(BoxType::Cpat, 0, 0)?;
        w.write_u16(self.pattern.pattern_width)?;
        w.write_u16(self.pattern.pattern_height)?;
        for pixel in &self.pattern.pixels {
            w.write_u32(pixel.component_index as u32)?;
            w.write_f32(pixel.component_gain)?;
        }
        w.end_box()
    }

    pub fn dump(&self, indent: usize) -> String {
        let mut s = dump_box_header(&BoxType::Cpat, self.box_size, self.header_size);
        s.push_str("version: 0\nflags: 0\n");
        s.push_str(&format!("pattern_width: {}\n", self.pattern.pattern_width));
        s.push_str(&format!("pattern_height: {}\n", self.pattern.pattern_height));
        for y in 0..self.pattern.pattern_height {
            for x in 0..self.pattern.pattern_width {
                let idx = y as usize * self.pattern.pattern_width as usize + x as usize;
                let pixel = &self.pattern.pixels[idx];
                s.push_str(&format!(
                    "  [{x},{y}]: component_index: {}, component_gain: {}\n",
                    pixel.component_index, pixel.component_gain
                ));
            }
        }
        apply_indent(s, indent)
    }
}
