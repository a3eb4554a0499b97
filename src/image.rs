//! In-memory raster image with per-component planes and sensor-metadata
//! attachments.
//!
//! A [`PixelImage`] exclusively owns its plane memory; attachments
//! (Bayer pattern, polarization patterns, bad-pixel maps, NUC data,
//! chroma location) are owned by value. Samples wider than 8 bits are
//! stored little-endian in plane memory.

use crate::errors::UncError;
use crate::limits::SecurityLimits;

/// Colorspace of a pixel image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colorspace {
    Rgb,
    YCbCr,
    Monochrome,
    /// Raw color-filter-array sensor capture (single plane + `cpat`).
    FilterArray,
    /// Components carry arbitrary (non-displayable) data; each plane
    /// records its own component type.
    Nonvisual,
}

/// Chroma format / sample packing of a pixel image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaFormat {
    C444,
    C422,
    C420,
    Monochrome,
    /// 8-bit interleaved RGB, one plane.
    InterleavedRgb,
    /// 8-bit interleaved RGBA, one plane.
    InterleavedRgba,
    /// Interleaved RGB with 16-bit little-endian samples.
    InterleavedRrggbbLe,
}

/// Channel tag of a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Y,
    Cb,
    Cr,
    R,
    G,
    B,
    Alpha,
    /// Single raw sensor plane, interpreted through the Bayer pattern.
    FilterArray,
    /// Packed multi-component plane (RGB / RGBA).
    Interleaved,
    /// Nonvisual data plane; the component type is recorded separately.
    Other,
}

/// Sample datatype of a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDatatype {
    UnsignedInteger,
    SignedInteger,
    FloatingPoint,
    ComplexNumber,
}

/// The f32 bit pattern meaning "no polarization filter at this position".
///
/// This is a quiet NaN; comparisons must use [`is_no_filter`] (exact bit
/// pattern), never `==`.
pub fn no_filter_value() -> f32 {
    f32::from_bits(0xFFFF_FFFF)
}

/// Whether `angle` is the "no filter" sentinel, by exact bit pattern.
pub fn is_no_filter(angle: f32) -> bool {
    angle.to_bits() == 0xFFFF_FFFF
}

/// One position of a Bayer / filter-array pattern.
///
/// Before encoding, `component_index` may carry a raw component type
/// (legacy authoring path); the encoder resolves those against `cmpd`.
/// After decoding it references the image's component table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BayerPatternPixel {
    pub component_index: u16,
    pub component_gain: f32,
}

/// Periodic color-filter-array pattern, row-major.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BayerPattern {
    pub pattern_width: u16,
    pub pattern_height: u16,
    pub pixels: Vec<BayerPatternPixel>,
}

/// Periodic polarization-filter pattern. Angles are degrees; the
/// [`no_filter_value`] bit pattern marks unfiltered positions.
/// An empty component list means the pattern applies to all components.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolarizationPattern {
    pub component_indices: Vec<u32>,
    pub pattern_width: u16,
    pub pattern_height: u16,
    pub polarization_angles: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BadPixel {
    pub row: u32,
    pub column: u32,
}

/// Defective sensor rows, columns and individual pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorBadPixelsMap {
    pub component_indices: Vec<u32>,
    pub correction_applied: bool,
    pub bad_rows: Vec<u32>,
    pub bad_columns: Vec<u32>,
    pub bad_pixels: Vec<BadPixel>,
}

/// Full-frame sensor non-uniformity correction gains and offsets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorNonUniformityCorrection {
    pub component_indices: Vec<u32>,
    pub nuc_is_applied: bool,
    pub image_width: u32,
    pub image_height: u32,
    pub nuc_gains: Vec<f32>,
    pub nuc_offsets: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
struct Plane {
    channel: Channel,
    width: u32,
    height: u32,
    bit_depth: u8,
    datatype: ChannelDatatype,
    /// Row stride in bytes.
    stride: usize,
    data: Vec<u8>,
}

/// In-memory raster with per-component planes and attachments.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelImage {
    width: u32,
    height: u32,
    colorspace: Colorspace,
    chroma: ChromaFormat,
    planes: Vec<Plane>,
    /// Component types for all components known to the image, including
    /// reference components that have no data plane. Filled by the
    /// decoder from `cmpd`; empty for directly authored images.
    component_types: Vec<u16>,
    bayer_pattern: Option<BayerPattern>,
    polarization_patterns: Vec<PolarizationPattern>,
    bad_pixels_maps: Vec<SensorBadPixelsMap>,
    nucs: Vec<SensorNonUniformityCorrection>,
    chroma_location: Option<u8>,
}

/// Bytes used to store one sample of `bit_depth` bits in plane memory.
pub(crate) fn bytes_per_sample(bit_depth: u8) -> usize {
    if bit_depth <= 8 {
        1
    } else if bit_depth <= 16 {
        2
    } else {
        4
    }
}

impl PixelImage {
    pub fn new(width: u32, height: u32, colorspace: Colorspace, chroma: ChromaFormat) -> Self {
        Self {
            width,
            height,
            colorspace,
            chroma,
            planes: Vec::new(),
            component_types: Vec::new(),
            bayer_pattern: None,
            polarization_patterns: Vec::new(),
            bad_pixels_maps: Vec::new(),
            nucs: Vec::new(),
            chroma_location: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn colorspace(&self) -> Colorspace {
        self.colorspace
    }

    pub fn chroma_format(&self) -> ChromaFormat {
        self.chroma
    }

    /// Allocates an unsigned-integer plane. See
    /// [`add_plane_with_datatype`](Self::add_plane_with_datatype).
    pub fn add_plane(
        &mut self,
        channel: Channel,
        width: u32,
        height: u32,
        bit_depth: u8,
        limits: &SecurityLimits,
    ) -> Result<(), UncError> {
        self.add_plane_with_datatype(
            channel,
            width,
            height,
            bit_depth,
            ChannelDatatype::UnsignedInteger,
            limits,
        )
    }

    /// Allocates a zero-filled plane. The stride is the packed row size
    /// rounded up to a 16-byte multiple. For interleaved chroma formats
    /// the interleaved plane stores all color samples of a pixel
    /// consecutively.
    pub fn add_plane_with_datatype(
        &mut self,
        channel: Channel,
        width: u32,
        height: u32,
        bit_depth: u8,
        datatype: ChannelDatatype,
        limits: &SecurityLimits,
    ) -> Result<(), UncError> {
        if width == 0 || height == 0 {
            return Err(UncError::Usage("plane dimensions must be non-zero".into()));
        }
        if bit_depth == 0 || bit_depth > 32 {
            return Err(UncError::Usage(format!(
                "bit depth {bit_depth} outside supported range [1,32]"
            )));
        }

        let samples_per_pixel = match (channel, self.chroma) {
            (Channel::Interleaved, ChromaFormat::InterleavedRgba) => 4,
            (Channel::Interleaved, _) => 3,
            _ => 1,
        };

        limits.check_pixel_count(width as u64 * height as u64)?;

        let row_bytes = width as usize * samples_per_pixel * bytes_per_sample(bit_depth);
        let stride = (row_bytes + 15) & !15;
        limits.check_allocation(stride as u64 * height as u64)?;

        let mut data = Vec::new();
        data.try_reserve_exact(stride * height as usize)
            .map_err(|_| UncError::MemoryAllocation("plane allocation failed".into()))?;
        data.resize(stride * height as usize, 0);

        self.planes.push(Plane {
            channel,
            width,
            height,
            bit_depth,
            datatype,
            stride,
            data,
        });
        Ok(())
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn has_channel(&self, channel: Channel) -> bool {
        self.planes.iter().any(|p| p.channel == channel)
    }

    fn plane(&self, idx: usize) -> Result<&Plane, UncError> {
        self.planes
            .get(idx)
            .ok_or_else(|| UncError::Usage(format!("no plane with index {idx}")))
    }

    pub fn channel(&self, idx: usize) -> Result<Channel, UncError> {
        Ok(self.plane(idx)?.channel)
    }

    pub fn plane_width(&self, idx: usize) -> Result<u32, UncError> {
        Ok(self.plane(idx)?.width)
    }

    pub fn plane_height(&self, idx: usize) -> Result<u32, UncError> {
        Ok(self.plane(idx)?.height)
    }

    pub fn bits_per_pixel(&self, idx: usize) -> Result<u8, UncError> {
        Ok(self.plane(idx)?.bit_depth)
    }

    pub fn datatype(&self, idx: usize) -> Result<ChannelDatatype, UncError> {
        Ok(self.plane(idx)?.datatype)
    }

    /// Plane bytes and row stride.
    pub fn plane_data(&self, idx: usize) -> Result<(&[u8], usize), UncError> {
        let p = self.plane(idx)?;
        Ok((&p.data, p.stride))
    }

    pub fn plane_data_mut(&mut self, idx: usize) -> Result<(&mut [u8], usize), UncError> {
        let p = self
            .planes
            .get_mut(idx)
            .ok_or_else(|| UncError::Usage(format!("no plane with index {idx}")))?;
        Ok((&mut p.data, p.stride))
    }

    /// First plane with the given channel tag.
    pub fn plane_index_by_channel(&self, channel: Channel) -> Option<usize> {
        self.planes.iter().position(|p| p.channel == channel)
    }

    // --- component type table

    /// Records the component types of all components, including
    /// reference components without a data plane.
    pub fn set_component_types(&mut self, types: Vec<u16>) {
        self.component_types = types;
    }

    pub fn component_types(&self) -> &[u16] {
        &self.component_types
    }

    pub fn component_type(&self, idx: usize) -> Option<u16> {
        self.component_types.get(idx).copied()
    }

    // --- attachments

    pub fn set_bayer_pattern(&mut self, pattern: BayerPattern) -> Result<(), UncError> {
        if pattern.pattern_width == 0 || pattern.pattern_height == 0 {
            return Err(UncError::Usage(
                "Bayer pattern dimensions must be non-zero.".into(),
            ));
        }
        let expected = pattern.pattern_width as usize * pattern.pattern_height as usize;
        if pattern.pixels.len() != expected {
            return Err(UncError::Usage(format!(
                "Bayer pattern has {} entries, expected {expected}",
                pattern.pixels.len()
            )));
        }
        self.bayer_pattern = Some(pattern);
        Ok(())
    }

    pub fn has_bayer_pattern(&self) -> bool {
        self.bayer_pattern.is_some()
    }

    pub fn bayer_pattern(&self) -> Option<&BayerPattern> {
        self.bayer_pattern.as_ref()
    }

    pub fn add_polarization_pattern(
        &mut self,
        pattern: PolarizationPattern,
    ) -> Result<(), UncError> {
        if pattern.pattern_width == 0 || pattern.pattern_height == 0 {
            return Err(UncError::Usage(
                "Polarization pattern dimensions must be non-zero.".into(),
            ));
        }
        let expected = pattern.pattern_width as usize * pattern.pattern_height as usize;
        if pattern.polarization_angles.len() != expected {
            return Err(UncError::Usage(format!(
                "Polarization pattern has {} angles, expected {expected}",
                pattern.polarization_angles.len()
            )));
        }
        self.polarization_patterns.push(pattern);
        Ok(())
    }

    pub fn polarization_patterns(&self) -> &[PolarizationPattern] {
        &self.polarization_patterns
    }

    /// Pattern applying to `component_index`: the first pattern listing
    /// the index, falling back to the first pattern with an empty list
    /// (which applies to all components).
    pub fn polarization_pattern_for_component(
        &self,
        component_index: u32,
    ) -> Option<&PolarizationPattern> {
        self.polarization_patterns
            .iter()
            .find(|p| p.component_indices.contains(&component_index))
            .or_else(|| {
                self.polarization_patterns
                    .iter()
                    .find(|p| p.component_indices.is_empty())
            })
    }

    pub fn add_sensor_bad_pixels_map(&mut self, map: SensorBadPixelsMap) {
        self.bad_pixels_maps.push(map);
    }

    pub fn sensor_bad_pixels_maps(&self) -> &[SensorBadPixelsMap] {
        &self.bad_pixels_maps
    }

    pub fn add_sensor_nuc(
        &mut self,
        nuc: SensorNonUniformityCorrection,
    ) -> Result<(), UncError> {
        if nuc.image_width == 0 || nuc.image_height == 0 {
            return Err(UncError::Usage(
                "NUC image dimensions must be non-zero.".into(),
            ));
        }
        let expected = nuc.image_width as usize * nuc.image_height as usize;
        if nuc.nuc_gains.len() != expected || nuc.nuc_offsets.len() != expected {
            return Err(UncError::Usage(format!(
                "NUC planes must hold {expected} values"
            )));
        }
        self.nucs.push(nuc);
        Ok(())
    }

    pub fn sensor_nucs(&self) -> &[SensorNonUniformityCorrection] {
        &self.nucs
    }

    pub fn set_chroma_location(&mut self, location: u8) -> Result<(), UncError> {
        if location > 6 {
            return Err(UncError::Usage(format!(
                "chroma sample location {location} outside range [0,6]"
            )));
        }
        self.chroma_location = Some(location);
        Ok(())
    }

    pub fn chroma_location(&self) -> Option<u8> {
        self.chroma_location
    }
}
