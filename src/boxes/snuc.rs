//! Sensor non-uniformity correction box (`snuc`).
//!
//! Full-frame per-pixel gain and offset planes used to correct sensor
//! non-uniformity, plus a flag recording whether the correction has
//! already been applied to the image data.

use crate::bitstream::{BoxHeader, BoxReader, BoxWriter};
use crate::boxes::{apply_indent, dump_box_header, read_full_box_version0};
use crate::errors::UncError;
use crate::fourcc::BoxType;
use crate::image::SensorNonUniformityCorrection;
use crate::limits::SecurityLimits;

/// Sensor non-uniformity correction box (`snuc`).
#[derive(Debug, Clone, Default)]
pub struct Snuc {
    nuc: SensorNonUniformityCorrection,
    box_size: u64,
    header_size: u32,
}

impl Snuc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_nuc(&mut self, nuc: SensorNonUniformityCorrection) {
        self.nuc = nuc;
    }

    pub fn nuc(&self) -> &SensorNonUniformityCorrection {
        &self.nuc
    }

    pub(crate) fn parse(
        payload: &[u8],
        header: &BoxHeader,
        limits: &SecurityLimits,
    ) -> Result<Self, UncError> {
        let mut r = BoxReader::new(payload);
        read_full_box_version0(&mut r, BoxType::Snuc)?;

        let component_count = r.read_u32()?;
        limits.check_components(component_count)?;
        if component_count as u64 * 4 > r.remaining() {
            return Err(UncError::InvalidParameterValue(format!(
                "snuc declares {component_count} component indices but the box is too small"
            )));
        }
        let mut component_indices = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            component_indices.push(r.read_u32()?);
        }

        let flags = r.read_u8()?;
        if flags & 0x7F != 0 {
            return Err(UncError::InvalidParameterValue(
                "non-zero reserved bits in snuc flags".into(),
            ));
        }
        let nuc_is_applied = flags & 0x80 != 0;

        let image_width = r.read_u32()?;
        let image_height = r.read_u32()?;
        if image_width == 0 || image_height == 0 {
            return Err(UncError::InvalidParameterValue(
                "snuc image dimensions must be non-zero".into(),
            ));
        }
        let count = image_width as u64 * image_height as u64;
        limits.check_pixel_count(count)?;
        if count * 8 > r.remaining() {
            return Err(UncError::InvalidParameterValue(format!(
                "snuc declares {count} correction values but the box is too small"
            )));
        }

        let mut nuc_gains = Vec::with_capacity(count as usize);
        for _ in 0..count {
            nuc_gains.push(r.read_f32()?);
        }
        let mut nuc_offsets = Vec::with_capacity(count as usize);
        for _ in 0..count {
            nuc_offsets.push(r.read_f32()?);
        }

        Ok(Self {
            nuc: SensorNonUniformityCorrection {
                component_indices,
                nuc_is_applied,
                image_width,
                image_height,
                nuc_gains,
                nuc_offsets,
            },
            box_size: header.box_size,
            header_size: header.header_size + 4,
        })
    }

    pub fn write(&self, w: &mut BoxWriter) -> Result<(), UncError> {
        let expected = self.nuc.image_width as usize * self.nuc.image_height as usize;
        if self.nuc.nuc_gains.len() != expected || self.nuc.nuc_offsets.len() != expected {
            return Err(UncError::Usage(format!(
                "snuc planes must hold {expected} values"
            )));
        }

        w.start_full_box(BoxType::Snuc, 0, 0)?;
        w.write_u32(self.nuc.component_indices.len() as u32)?;
        for index in &self.nuc.component_indices {
            w.write_u32(*index)?;
        }
        w.write_u8(if self.nuc.nuc_is_applied { 0x80 } else { 0 })?;
        w.write_u32(self.nuc.image_width)?;
        w.write_u32(self.nuc.image_height)?;
        for gain in &self.nuc.nuc_gains {
            w.write_f32(*gain)?;
        }
        for offset in &self.nuc.nuc_offsets {
            w.write_f32(*offset)?;
        }
        w.end_box()
    }

    pub fn dump(&self, indent: usize) -> String {
        let mut s = dump_box_header(&BoxType::Snuc, self.box_size, self.header_size);
        s.push_str("version: 0\nflags: 0\n");
        s.push_str(&format!(
            "component_count: {}\n",
            self.nuc.component_indices.len()
        ));
        for (i, index) in self.nuc.component_indices.iter().enumerate() {
            s.push_str(&format!("  component_index[{i}]: {index}\n"));
        }
        s.push_str(&format!(
            "nuc_is_applied: {}\n",
            self.nuc.nuc_is_applied as u8
        ));
        s.push_str(&format!("image_width: {}\n", self.nuc.image_width));
        s.push_str(&format!("image_height: {}\n", self.nuc.image_height));
        s.push_str(&format!("nuc_gains: {} values\n", self.nuc.nuc_gains.len()));
        s.push_str(&format!(
            "nuc_offsets: {} values\n",
            self.nuc.nuc_offsets.len()
        ));
        apply_indent(s, indent)
    }
}
