//! Decoder for the uncompressed codec.
//!
//! Driven by the descriptor boxes: `uncC` + `cmpd` are mandatory, the
//! rest optional. Reverses the component-interleave layout back into a
//! [`PixelImage`], decompressing per-tile units first when a `cmpC` box
//! is present. Adversarial wire values surface as typed errors, never
//! as panics.

use tracing::debug;

use crate::boxes::cmpc::compressed_unit;
use crate::boxes::cmpd::component_type;
use crate::boxes::{
    Cloc, CmpC, Cmpd, ComponentFormat, Cpat, Icef, InterleaveType, SamplingType, Sbpm, Snuc,
    Splz, UncBox, UncC,
};
use crate::compression::decompress;
use crate::errors::UncError;
use crate::image::{
    bytes_per_sample, Channel, ChannelDatatype, ChromaFormat, Colorspace, PixelImage,
};
use crate::limits::SecurityLimits;

/// Per-component decode plan derived from `uncC` + `cmpd`.
struct DecComponent {
    channel: Channel,
    component_type: u16,
    bpp: u8,
    datatype: ChannelDatatype,
    byte_aligned: bool,
    plane_width: u32,
    plane_height: u32,
    /// Coded bytes per row of this component.
    row_bytes: u64,
}

fn component_type_to_channel(ty: u16) -> Channel {
    match ty {
        component_type::MONOCHROME | component_type::Y => Channel::Y,
        component_type::CB => Channel::Cb,
        component_type::CR => Channel::Cr,
        component_type::RED => Channel::R,
        component_type::GREEN => Channel::G,
        component_type::BLUE => Channel::B,
        component_type::ALPHA => Channel::Alpha,
        component_type::FILTER_ARRAY => Channel::FilterArray,
        _ => Channel::Other,
    }
}

fn format_to_datatype(format: ComponentFormat) -> ChannelDatatype {
    match format {
        ComponentFormat::Unsigned => ChannelDatatype::UnsignedInteger,
        ComponentFormat::Signed => ChannelDatatype::SignedInteger,
        ComponentFormat::Float => ChannelDatatype::FloatingPoint,
        ComponentFormat::Complex32 | ComponentFormat::Complex64 => {
            ChannelDatatype::ComplexNumber
        }
    }
}

/// Decoder instance for one image item or sequence track.
///
/// Frames are pushed one tile at a time with
/// [`push_frame_data`](Self::push_frame_data) and collected with
/// [`pull_decoded_frame`](Self::pull_decoded_frame);
/// [`decode_single_frame`](Self::decode_single_frame) is the one-shot
/// form. [`flush`](Self::flush) is a no-op since the uncompressed codec
/// has no internal buffering.
#[derive(Debug)]
pub struct UncDecoder {
    uncc: UncC,
    cmpd: Cmpd,
    width: u32,
    height: u32,
    cpat: Option<Cpat>,
    cmpc: Option<CmpC>,
    icef: Option<Icef>,
    splz: Vec<Splz>,
    sbpm: Vec<Sbpm>,
    snuc: Vec<Snuc>,
    cloc: Option<Cloc>,
    decoded: Option<PixelImage>,
}

impl UncDecoder {
    pub fn new(uncc: UncC, cmpd: Cmpd, width: u32, height: u32) -> Self {
        Self {
            uncc,
            cmpd,
            width,
            height,
            cpat: None,
            cmpc: None,
            icef: None,
            splz: Vec::new(),
            sbpm: Vec::new(),
            snuc: Vec::new(),
            cloc: None,
            decoded: None,
        }
    }

    /// Builds a decoder from a parsed box set. `uncC` and `cmpd` are
    /// mandatory; everything else is attached when present.
    pub fn from_boxes(boxes: Vec<UncBox>, width: u32, height: u32) -> Result<Self, UncError> {
        let mut uncc = None;
        let mut cmpd = None;
        let mut cpat = None;
        let mut cmpc = None;
        let mut icef = None;
        let mut splz = Vec::new();
        let mut sbpm = Vec::new();
        let mut snuc = Vec::new();
        let mut cloc = None;

        for b in boxes {
            match b {
                UncBox::UncC(b) => uncc = Some(b),
                UncBox::Cmpd(b) => cmpd = Some(b),
                UncBox::Cpat(b) => cpat = Some(b),
                UncBox::CmpC(b) => cmpc = Some(b),
                UncBox::Icef(b) => icef = Some(b),
                UncBox::Splz(b) => splz.push(b),
                UncBox::Sbpm(b) => sbpm.push(b),
                UncBox::Snuc(b) => snuc.push(b),
                UncBox::Cloc(b) => cloc = Some(b),
            }
        }

        let uncc = uncc.ok_or_else(|| UncError::NoMandatoryProperty("uncC".into()))?;
        let cmpd = cmpd.ok_or_else(|| UncError::NoMandatoryProperty("cmpd".into()))?;

        let mut decoder = Self::new(uncc, cmpd, width, height);
        decoder.cpat = cpat;
        decoder.cmpc = cmpc;
        decoder.icef = icef;
        decoder.splz = splz;
        decoder.sbpm = sbpm;
        decoder.snuc = snuc;
        decoder.cloc = cloc;
        Ok(decoder)
    }

    pub fn set_cpat(&mut self, cpat: Cpat) {
        self.cpat = Some(cpat);
    }

    pub fn set_cmpc(&mut self, cmpc: CmpC) {
        self.cmpc = Some(cmpc);
    }

    pub fn set_icef(&mut self, icef: Icef) {
        self.icef = Some(icef);
    }

    pub fn set_splz(&mut self, splz: Vec<Splz>) {
        self.splz = splz;
    }

    pub fn set_sbpm(&mut self, sbpm: Vec<Sbpm>) {
        self.sbpm = sbpm;
    }

    pub fn set_snuc(&mut self, snuc: Vec<Snuc>) {
        self.snuc = snuc;
    }

    pub fn set_cloc(&mut self, cloc: Cloc) {
        self.cloc = Some(cloc);
    }

    /// Decodes one frame and stores it for
    /// [`pull_decoded_frame`](Self::pull_decoded_frame).
    pub fn push_frame_data(
        &mut self,
        data: &[u8],
        limits: &SecurityLimits,
    ) -> Result<(), UncError> {
        let image = self.decode_single_frame(data, limits)?;
        self.decoded = Some(image);
        Ok(())
    }

    /// Takes the most recently decoded frame, if any.
    pub fn pull_decoded_frame(&mut self) -> Option<PixelImage> {
        self.decoded.take()
    }

    /// No-op: the uncompressed codec holds no frames back.
    pub fn flush(&mut self) {}

    /// Decodes one frame from (possibly compressed) coded data.
    pub fn decode_single_frame(
        &self,
        data: &[u8],
        limits: &SecurityLimits,
    ) -> Result<PixelImage, UncError> {
        match self.uncc.interleave_type {
            InterleaveType::Component => self.decode_component_interleave(data, limits),
            other => Err(UncError::UnsupportedFeature(format!(
                "interleave type '{}' is not implemented",
                other.name()
            ))),
        }
    }

    fn check_unsupported_layout(&self) -> Result<(), UncError> {
        if self.uncc.block_size != 0
            || self.uncc.block_pad_lsb
            || self.uncc.block_little_endian
            || self.uncc.block_reversed
            || self.uncc.pad_unknown
        {
            return Err(UncError::UnsupportedFeature(
                "block-based packing is not implemented".into(),
            ));
        }
        if self.uncc.pixel_size != 0 {
            return Err(UncError::UnsupportedFeature(
                "pixel_size padding is not implemented".into(),
            ));
        }
        if self.uncc.row_align_size != 0 || self.uncc.tile_align_size != 0 {
            return Err(UncError::UnsupportedFeature(
                "row/tile alignment is not implemented".into(),
            ));
        }
        Ok(())
    }

    /// Builds the per-component decode plan and the expected coded size
    /// of one `width`×`height` tile.
    fn build_plan(&self) -> Result<(Vec<DecComponent>, u64), UncError> {
        if self.uncc.components.is_empty() {
            return Err(UncError::InvalidParameterValue(
                "uncC does not define any components".into(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(UncError::Usage("image dimensions must be non-zero".into()));
        }

        let mut plan = Vec::with_capacity(self.uncc.components.len());
        let mut total = 0u64;

        for comp in &self.uncc.components {
            let cmpd_entry = self
                .cmpd
                .components()
                .get(comp.component_index as usize)
                .ok_or_else(|| {
                    UncError::InvalidParameterValue(format!(
                        "uncC component index {} has no cmpd entry",
                        comp.component_index
                    ))
                })?;
            if comp.component_align_size != 0 {
                return Err(UncError::UnsupportedFeature(
                    "component align sizes are not implemented".into(),
                ));
            }

            let component_type = cmpd_entry.component_type;
            let channel = component_type_to_channel(component_type);

            let mut plane_width = self.width;
            let mut plane_height = self.height;
            if channel == Channel::Cb || channel == Channel::Cr {
                match self.uncc.sampling_type {
                    SamplingType::YCbCr420 => {
                        plane_width = (plane_width + 1) / 2;
                        plane_height = (plane_height + 1) / 2;
                    }
                    SamplingType::YCbCr422 => {
                        plane_width = (plane_width + 1) / 2;
                    }
                    SamplingType::YCbCr411 => {
                        return Err(UncError::UnsupportedFeature(
                            "4:1:1 sampling is not implemented".into(),
                        ));
                    }
                    SamplingType::NoSubsampling => {}
                }
            }

            let bpp = comp.component_bit_depth;
            let byte_aligned = bpp % 8 == 0;
            let row_bytes = if byte_aligned {
                plane_width as u64 * ((bpp as u64 + 7) / 8)
            } else {
                (plane_width as u64 * bpp as u64 + 7) / 8
            };
            total += row_bytes * plane_height as u64;

            plan.push(DecComponent {
                channel,
                component_type,
                bpp,
                datatype: format_to_datatype(comp.component_format),
                byte_aligned,
                plane_width,
                plane_height,
                row_bytes,
            });
        }

        Ok((plan, total))
    }

    /// Output colorspace/chroma derived from the component set.
    fn output_colorspace(&self, plan: &[DecComponent]) -> (Colorspace, ChromaFormat) {
        let has = |ty: u16| plan.iter().any(|c| c.component_type == ty);

        if has(component_type::FILTER_ARRAY) {
            return (Colorspace::FilterArray, ChromaFormat::Monochrome);
        }
        if has(component_type::Y) && has(component_type::CB) && has(component_type::CR) {
            let chroma = match self.uncc.sampling_type {
                SamplingType::YCbCr420 => ChromaFormat::C420,
                SamplingType::YCbCr422 => ChromaFormat::C422,
                _ => ChromaFormat::C444,
            };
            return (Colorspace::YCbCr, chroma);
        }
        if has(component_type::RED) && has(component_type::GREEN) && has(component_type::BLUE) {
            return (Colorspace::Rgb, ChromaFormat::C444);
        }
        if plan.iter().all(|c| {
            matches!(
                c.component_type,
                component_type::MONOCHROME | component_type::ALPHA
            )
        }) {
            return (Colorspace::Monochrome, ChromaFormat::Monochrome);
        }
        (Colorspace::Nonvisual, ChromaFormat::C444)
    }

    fn decode_component_interleave(
        &self,
        data: &[u8],
        limits: &SecurityLimits,
    ) -> Result<PixelImage, UncError> {
        self.check_unsupported_layout()?;
        let (plan, expected_size) = self.build_plan()?;

        // The tile grid times the bytes of one tile must stay within
        // the configured limits.
        let tiles = self.uncc.num_tile_cols as u128 * self.uncc.num_tile_rows as u128;
        let full_image_bytes = tiles * expected_size as u128;
        let full_image_bytes = u64::try_from(full_image_bytes).map_err(|_| {
            UncError::InvalidParameterValue("coded image size overflows".into())
        })?;
        limits.check_allocation(full_image_bytes)?;

        // Decompress the frame's unit when a compression box is present.
        let decompressed;
        let raw: &[u8] = if let Some(cmpc) = &self.cmpc {
            if cmpc.compressed_unit_type != compressed_unit::TILE {
                return Err(UncError::UnsupportedFeature(format!(
                    "compressed unit type {} is not implemented",
                    cmpc.compressed_unit_type
                )));
            }

            let unit_data = match self.icef.as_ref().map(|i| i.units()) {
                None | Some([]) => data,
                Some([unit]) => {
                    let start = usize::try_from(unit.unit_offset).map_err(|_| {
                        UncError::InvalidParameterValue("icef unit offset overflows".into())
                    })?;
                    let end = start
                        .checked_add(usize::try_from(unit.unit_size).map_err(|_| {
                            UncError::InvalidParameterValue("icef unit size overflows".into())
                        })?)
                        .ok_or_else(|| {
                            UncError::InvalidParameterValue("icef unit extent overflows".into())
                        })?;
                    data.get(start..end).ok_or_else(|| {
                        UncError::InvalidParameterValue(format!(
                            "icef unit [{start}, {end}) outside coded data of {} bytes",
                            data.len()
                        ))
                    })?
                }
                Some(_) => {
                    return Err(UncError::UnsupportedFeature(
                        "multiple compressed units per frame are not implemented".into(),
                    ))
                }
            };

            decompressed = decompress(cmpc.compression_type, unit_data, expected_size as usize)?;
            &decompressed
        } else {
            data
        };

        if raw.len() as u64 != expected_size {
            return Err(UncError::InvalidParameterValue(format!(
                "coded frame holds {} bytes, layout requires {expected_size}",
                raw.len()
            )));
        }

        let (colorspace, chroma) = self.output_colorspace(&plan);
        debug!(
            ?colorspace,
            ?chroma,
            components = plan.len(),
            "decoding component-interleaved frame"
        );

        let mut image = PixelImage::new(self.width, self.height, colorspace, chroma);
        image.set_component_types(
            self.cmpd
                .components()
                .iter()
                .map(|c| c.component_type)
                .collect(),
        );

        let mut in_pos = 0usize;
        for (idx, comp) in plan.iter().enumerate() {
            image.add_plane_with_datatype(
                comp.channel,
                comp.plane_width,
                comp.plane_height,
                comp.bpp,
                comp.datatype,
                limits,
            )?;
            let (plane, stride) = image.plane_data_mut(idx)?;

            if comp.byte_aligned {
                self.unpack_byte_aligned(comp, &raw[in_pos..], plane, stride);
            } else {
                unpack_bit_packed(comp, &raw[in_pos..], plane, stride);
            }
            in_pos += (comp.row_bytes * comp.plane_height as u64) as usize;
        }

        self.attach_metadata(&mut image)?;
        Ok(image)
    }

    fn unpack_byte_aligned(
        &self,
        comp: &DecComponent,
        src: &[u8],
        plane: &mut [u8],
        stride: usize,
    ) {
        let wire_bytes = ((comp.bpp as usize) + 7) / 8;
        let mem_bytes = bytes_per_sample(comp.bpp);
        let width = comp.plane_width as usize;
        let row_bytes = comp.row_bytes as usize;

        for y in 0..comp.plane_height as usize {
            let src_row = &src[y * row_bytes..(y + 1) * row_bytes];
            let dst_row = &mut plane[y * stride..];

            if wire_bytes == mem_bytes && (self.uncc.components_little_endian || wire_bytes == 1) {
                dst_row[..row_bytes].copy_from_slice(src_row);
            } else {
                for x in 0..width {
                    let sample = &src_row[x * wire_bytes..(x + 1) * wire_bytes];
                    let dst = &mut dst_row[x * mem_bytes..(x + 1) * mem_bytes];
                    dst.iter_mut().for_each(|b| *b = 0);
                    if self.uncc.components_little_endian {
                        dst[..wire_bytes].copy_from_slice(sample);
                    } else {
                        // Big-endian wire samples: reverse into the
                        // little-endian plane layout.
                        for (i, b) in sample.iter().rev().enumerate() {
                            dst[i] = *b;
                        }
                    }
                }
            }
        }
    }

    fn attach_metadata(&self, image: &mut PixelImage) -> Result<(), UncError> {
        if let Some(cpat) = &self.cpat {
            image.set_bayer_pattern(cpat.pattern().clone())?;
        }
        for splz in &self.splz {
            image.add_polarization_pattern(splz.pattern().clone())?;
        }
        for sbpm in &self.sbpm {
            image.add_sensor_bad_pixels_map(sbpm.bad_pixels_map().clone());
        }
        for snuc in &self.snuc {
            image.add_sensor_nuc(snuc.nuc().clone())?;
        }
        if let Some(cloc) = &self.cloc {
            image.set_chroma_location(cloc.chroma_location())?;
        }
        Ok(())
    }
}

/// Reverses the encoder's MSB-first bit packing. Rows are independent:
/// the reader restarts at every row boundary and trailing pad bits are
/// dropped.
fn unpack_bit_packed(comp: &DecComponent, src: &[u8], plane: &mut [u8], stride: usize) {
    let bpp = comp.bpp as u32;
    let mem_bytes = bytes_per_sample(comp.bpp);
    let width = comp.plane_width as usize;
    let row_bytes = comp.row_bytes as usize;

    for y in 0..comp.plane_height as usize {
        let src_row = &src[y * row_bytes..(y + 1) * row_bytes];
        let dst_row = &mut plane[y * stride..];

        let mut accumulator = 0u64;
        let mut accumulated_bits = 0u32;
        let mut in_pos = 0usize;

        for x in 0..width {
            while accumulated_bits < bpp {
                accumulator = (accumulator << 8) | src_row[in_pos] as u64;
                in_pos += 1;
                accumulated_bits += 8;
            }
            accumulated_bits -= bpp;
            let sample = ((accumulator >> accumulated_bits) & ((1u64 << bpp) - 1)) as u32;
            if accumulated_bits > 0 {
                accumulator &= (1u64 << accumulated_bits) - 1;
            } else {
                accumulator = 0;
            }

            let bytes = sample.to_le_bytes();
            dst_row[x * mem_bytes..x * mem_bytes + mem_bytes]
                .copy_from_slice(&bytes[..mem_bytes]);
        }
    }
}
