//! Uncompressed frame configuration box (`uncC`).
//!
//! Describes how component samples are laid out in the coded byte
//! stream: per-component bit depths and formats, chroma sampling,
//! interleaving, endianness flags, alignment and the tile grid.
//! Tile counts are stored minus one on the wire.

use crate::bitstream::{BoxHeader, BoxReader, BoxWriter};
use crate::boxes::{apply_indent, dump_box_header, read_full_box_version0};
use crate::errors::UncError;
use crate::fourcc::{BoxType, FourCC};
use crate::limits::SecurityLimits;

/// Chroma sampling applied to Cb/Cr components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingType {
    #[default]
    NoSubsampling,
    YCbCr422,
    YCbCr420,
    YCbCr411,
}

impl SamplingType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NoSubsampling),
            1 => Some(Self::YCbCr422),
            2 => Some(Self::YCbCr420),
            3 => Some(Self::YCbCr411),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::NoSubsampling => 0,
            Self::YCbCr422 => 1,
            Self::YCbCr420 => 2,
            Self::YCbCr411 => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NoSubsampling => "no subsampling",
            Self::YCbCr422 => "YCbCr 4:2:2",
            Self::YCbCr420 => "YCbCr 4:2:0",
            Self::YCbCr411 => "YCbCr 4:1:1",
        }
    }
}

/// How component samples are woven into the byte stream within a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterleaveType {
    #[default]
    Component,
    Pixel,
    Mixed,
    Row,
    TileComponent,
    MultiY,
}

impl InterleaveType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Component),
            1 => Some(Self::Pixel),
            2 => Some(Self::Mixed),
            3 => Some(Self::Row),
            4 => Some(Self::TileComponent),
            5 => Some(Self::MultiY),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Component => 0,
            Self::Pixel => 1,
            Self::Mixed => 2,
            Self::Row => 3,
            Self::TileComponent => 4,
            Self::MultiY => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Pixel => "pixel",
            Self::Mixed => "mixed",
            Self::Row => "row",
            Self::TileComponent => "tile-component",
            Self::MultiY => "multi-y",
        }
    }
}

/// Sample format of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentFormat {
    #[default]
    Unsigned,
    Signed,
    Float,
    Complex32,
    Complex64,
}

impl ComponentFormat {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unsigned),
            1 => Some(Self::Signed),
            2 => Some(Self::Float),
            3 => Some(Self::Complex32),
            4 => Some(Self::Complex64),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Unsigned => 0,
            Self::Signed => 1,
            Self::Float => 2,
            Self::Complex32 => 3,
            Self::Complex64 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unsigned => "unsigned",
            Self::Signed => "signed",
            Self::Float => "float",
            Self::Complex32 => "complex32",
            Self::Complex64 => "complex64",
        }
    }
}

/// One `uncC` component layout entry. `component_index` references the
/// `cmpd` component list.
#[derive(Debug, Clone, Copy, Default)]
pub struct UncCComponent {
    pub component_index: u16,
    /// Actual bit depth; stored minus one on the wire.
    pub component_bit_depth: u8,
    pub component_format: ComponentFormat,
    /// 0 = natural alignment, otherwise 1, 2, 4 or 8 bytes.
    pub component_align_size: u8,
}

/// Uncompressed frame configuration box (`uncC`).
#[derive(Debug, Clone)]
pub struct UncC {
    pub profile: FourCC,
    pub components: Vec<UncCComponent>,
    pub sampling_type: SamplingType,
    pub interleave_type: InterleaveType,
    pub block_size: u8,
    pub components_little_endian: bool,
    pub block_pad_lsb: bool,
    pub block_little_endian: bool,
    pub block_reversed: bool,
    pub pad_unknown: bool,
    pub pixel_size: u32,
    pub row_align_size: u32,
    pub tile_align_size: u32,
    /// Logical tile count (wire value plus one).
    pub num_tile_cols: u32,
    pub num_tile_rows: u32,
    pub(crate) box_size: u64,
    pub(crate) header_size: u32,
}

impl Default for UncC {
    fn default() -> Self {
        Self {
            profile: FourCC::default(),
            components: Vec::new(),
            sampling_type: SamplingType::NoSubsampling,
            interleave_type: InterleaveType::Component,
            block_size: 0,
            components_little_endian: false,
            block_pad_lsb: false,
            block_little_endian: false,
            block_reversed: false,
            pad_unknown: false,
            pixel_size: 0,
            row_align_size: 0,
            tile_align_size: 0,
            num_tile_cols: 1,
            num_tile_rows: 1,
            box_size: 0,
            header_size: 0,
        }
    }
}

impl UncC {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_component(&mut self, component: UncCComponent) {
        self.components.push(component);
    }

    pub(crate) fn parse(
        payload: &[u8],
        header: &BoxHeader,
        limits: &SecurityLimits,
    ) -> Result<Self, UncError> {
        let mut r = BoxReader::new(payload);
        read_full_box_version0(&mut r, BoxType::UncC)?;

        let profile = FourCC::from_u32(r.read_u32()?);

        let count = r.read_u32()?;
        limits.check_components(count)?;
        if count as u64 * 5 > r.remaining() {
            return Err(UncError::InvalidParameterValue(format!(
                "uncC declares {count} components but the box is too small"
            )));
        }

        let mut components = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let component_index = r.read_u16()?;
            let bit_depth_minus_one = r.read_u8()?;
            if bit_depth_minus_one >= 32 {
                return Err(UncError::InvalidParameterValue(format!(
                    "component bit depth {} outside supported range [1,32]",
                    bit_depth_minus_one as u16 + 1
                )));
            }
            let format_code = r.read_u8()?;
            let component_format = ComponentFormat::from_u8(format_code).ok_or_else(|| {
                UncError::InvalidParameterValue(format!(
                    "unknown component format {format_code}"
                ))
            })?;
            let component_align_size = r.read_u8()?;
            if !matches!(component_align_size, 0 | 1 | 2 | 4 | 8) {
                return Err(UncError::InvalidParameterValue(format!(
                    "invalid component align size {component_align_size}"
                )));
            }
            components.push(UncCComponent {
                component_index,
                component_bit_depth: bit_depth_minus_one + 1,
                component_format,
                component_align_size,
            });
        }

        let sampling_code = r.read_u8()?;
        let sampling_type = SamplingType::from_u8(sampling_code).ok_or_else(|| {
            UncError::InvalidParameterValue(format!("unknown sampling type {sampling_code}"))
        })?;

        let interleave_code = r.read_u8()?;
        let interleave_type = InterleaveType::from_u8(interleave_code).ok_or_else(|| {
            UncError::InvalidParameterValue(format!("unknown interleave type {interleave_code}"))
        })?;

        let block_size = r.read_u8()?;

        let flags = r.read_u8()?;
        if flags & 0b0000_0111 != 0 {
            return Err(UncError::InvalidParameterValue(
                "non-zero reserved bits in uncC flags".into(),
            ));
        }

        let pixel_size = r.read_u32()?;
        let row_align_size = r.read_u32()?;
        let tile_align_size = r.read_u32()?;

        let num_tile_cols = r.read_u32()?.checked_add(1).ok_or_else(|| {
            UncError::InvalidParameterValue("number of tile columns overflows".into())
        })?;
        let num_tile_rows = r.read_u32()?.checked_add(1).ok_or_else(|| {
            UncError::InvalidParameterValue("number of tile rows overflows".into())
        })?;
        limits.check_tile_count(num_tile_cols, num_tile_rows)?;

        Ok(Self {
            profile,
            components,
            sampling_type,
            interleave_type,
            block_size,
            components_little_endian: flags & 0x80 != 0,
            block_pad_lsb: flags & 0x40 != 0,
            block_little_endian: flags & 0x20 != 0,
            block_reversed: flags & 0x10 != 0,
            pad_unknown: flags & 0x08 != 0,
            pixel_size,
            row_align_size,
            tile_align_size,
            num_tile_cols,
            num_tile_rows,
            box_size: header.box_size,
            header_size: header.header_size + 4,
        })
    }

    pub fn write(&self, w: &mut BoxWriter) -> Result<(), UncError> {
        if self.num_tile_cols == 0 || self.num_tile_rows == 0 {
            return Err(UncError::Usage("tile counts must be at least 1".into()));
        }

        w.start_full_box(BoxType::UncC, 0, 0)?;
        w.write_u32(self.profile.to_u32())?;
        w.write_u32(self.components.len() as u32)?;
        for component in &self.components {
            if component.component_bit_depth == 0 || component.component_bit_depth > 32 {
                return Err(UncError::Usage(format!(
                    "component bit depth {} outside supported range [1,32]",
                    component.component_bit_depth
                )));
            }
            w.write_u16(component.component_index)?;
            w.write_u8(component.component_bit_depth - 1)?;
            w.write_u8(component.component_format.to_u8())?;
            w.write_u8(component.component_align_size)?;
        }
        w.write_u8(self.sampling_type.to_u8())?;
        w.write_u8(self.interleave_type.to_u8())?;
        w.write_u8(self.block_size)?;

        let mut flags = 0u8;
        if self.components_little_endian {
            flags |= 0x80;
        }
        if self.block_pad_lsb {
            flags |= 0x40;
        }
        if self.block_little_endian {
            flags |= 0x20;
        }
        if self.block_reversed {
            flags |= 0x10;
        }
        if self.pad_unknown {
            flags |= 0x08;
        }
        w.write_u8(flags)?;

        w.write_u32(self.pixel_size)?;
        w.write_u32(self.row_align_size)?;
        w.write_u32(self.tile_align_size)?;
        w.write_u32(self.num_tile_cols - 1)?;
        w.write_u32(self.num_tile_rows - 1)?;
        w.end_box()
    }

    pub fn dump(&self, indent: usize) -> String {
        let mut s = dump_box_header(&BoxType::UncC, self.box_size, self.header_size);
        s.push_str(&format!(
            "profile: {} ({})\n",
            self.profile.to_u32(),
            self.profile
        ));
        for component in &self.components {
            s.push_str(&format!(
                "component_index: {}\n\
                 | component_bit_depth: {}\n\
                 | component_format: {}\n\
                 | component_align_size: {}\n",
                component.component_index,
                component.component_bit_depth,
                component.component_format.name(),
                component.component_align_size
            ));
        }
        s.push_str(&format!("sampling_type: {}\n", self.sampling_type.name()));
        s.push_str(&format!(
            "interleave_type: {}\n",
            self.interleave_type.name()
        ));
        s.push_str(&format!("block_size: {}\n", self.block_size));
        s.push_str(&format!(
            "components_little_endian: {}\n",
            self.components_little_endian as u8
        ));
        s.push_str(&format!("block_pad_lsb: {}\n", self.block_pad_lsb as u8));
        s.push_str(&format!(
            "block_little_endian: {}\n",
            self.block_little_endian as u8
        ));
        s.push_str(&format!("block_reversed: {}\n", self.block_reversed as u8));
        s.push_str(&format!("pad_unknown: {}\n", self.pad_unknown as u8));
        s.push_str(&format!("pixel_size: {}\n", self.pixel_size));
        s.push_str(&format!("row_align_size: {}\n", self.row_align_size));
        s.push_str(&format!("tile_align_size: {}\n", self.tile_align_size));
        s.push_str(&format!("num_tile_cols: {}\n", self.num_tile_cols));
        s.push_str(&format!("num_tile_rows: {}\n", self.num_tile_rows));
        apply_indent(s, indent)
    }
}
