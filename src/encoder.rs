//! Component-interleave encoder.
//!
//! Builds the descriptor boxes for a [`PixelImage`] and serializes its
//! planes into tile byte blobs, component after component. Byte-aligned
//! components copy row by row; other bit depths go through an MSB-first
//! bit accumulator that flushes at every row end, so bits never straddle
//! rows. Optionally each tile is compressed and registered in an `icef`
//! index.

use tracing::debug;

use crate::boxes::cmpd::component_type;
use crate::boxes::{
    Cloc, Cmpd, Component, ComponentFormat, Cpat, Icef, InterleaveType, SamplingType, Sbpm, Snuc,
    Splz, UncC, UncCComponent,
};
use crate::boxes::icef::CompressedUnitInfo;
use crate::compression::{compress, UnciCompression};
use crate::errors::UncError;
use crate::fourcc::FourCC;
use crate::image::{bytes_per_sample, Channel, ChannelDatatype, ChromaFormat, Colorspace, PixelImage};

/// Options controlling encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingOptions {
    pub compression: UnciCompression,
}

#[derive(Debug, Clone)]
struct EncComponent {
    plane_index: usize,
    channel: Channel,
    bpp: u8,
    byte_aligned: bool,
}

fn channel_to_component_type(channel: Channel) -> Result<u16, UncError> {
    match channel {
        Channel::Y => Ok(component_type::Y),
        Channel::Cb => Ok(component_type::CB),
        Channel::Cr => Ok(component_type::CR),
        Channel::R => Ok(component_type::RED),
        Channel::G => Ok(component_type::GREEN),
        Channel::B => Ok(component_type::BLUE),
        Channel::Alpha => Ok(component_type::ALPHA),
        Channel::FilterArray => Ok(component_type::FILTER_ARRAY),
        Channel::Interleaved | Channel::Other => Err(UncError::Usage(format!(
            "channel {channel:?} has no component type mapping"
        ))),
    }
}

fn datatype_to_format(datatype: ChannelDatatype) -> ComponentFormat {
    match datatype {
        ChannelDatatype::UnsignedInteger => ComponentFormat::Unsigned,
        ChannelDatatype::SignedInteger => ComponentFormat::Signed,
        ChannelDatatype::FloatingPoint => ComponentFormat::Float,
        ChannelDatatype::ComplexNumber => ComponentFormat::Complex32,
    }
}

/// Encoder for component-interleaved layout (`interleave_type = 0`).
///
/// The factory rejects images that already carry an interleaved plane;
/// those are handled by a different layout factory.
#[derive(Debug, Clone)]
pub struct ComponentInterleaveEncoder {
    components: Vec<EncComponent>,
    cmpd: Cmpd,
    uncc: UncC,
    cpat: Option<Cpat>,
    splz: Vec<Splz>,
    sbpm: Vec<Sbpm>,
    snuc: Vec<Snuc>,
    cloc: Option<Cloc>,
}

impl ComponentInterleaveEncoder {
    /// Whether this factory accepts `image`.
    pub fn can_encode(image: &PixelImage) -> bool {
        !image.has_channel(Channel::Interleaved)
    }

    pub fn new(image: &PixelImage, _options: &EncodingOptions) -> Result<Self, UncError> {
        if !Self::can_encode(image) {
            return Err(UncError::Usage(
                "component-interleave encoder cannot encode interleaved images".into(),
            ));
        }

        let is_nonvisual = image.colorspace() == Colorspace::Nonvisual;
        let has_cb = image.has_channel(Channel::Cb);

        let mut components = Vec::with_capacity(image.plane_count());
        let mut cmpd = Cmpd::new();
        let mut uncc = UncC::new();
        let mut little_endian = false;

        let mut box_index: u16 = 0;
        for idx in 0..image.plane_count() {
            let channel = image.channel(idx)?;

            let comp_type = if is_nonvisual {
                image.component_type(idx).ok_or_else(|| {
                    UncError::Usage(format!(
                        "nonvisual image does not define a component type for component {idx}"
                    ))
                })?
            } else if channel == Channel::Y && !has_cb {
                component_type::MONOCHROME
            } else {
                channel_to_component_type(channel)?
            };

            let bpp = image.bits_per_pixel(idx)?;
            let format = datatype_to_format(image.datatype(idx)?);
            let byte_aligned = bpp % 8 == 0;

            if byte_aligned && bpp > 8 {
                little_endian = true;
            }

            cmpd.add_component(Component {
                component_type: comp_type,
                component_type_uri: String::new(),
            });
            uncc.add_component(UncCComponent {
                component_index: box_index,
                component_bit_depth: bpp,
                component_format: format,
                component_align_size: 0,
            });
            box_index += 1;

            components.push(EncComponent {
                plane_index: idx,
                channel,
                bpp,
                byte_aligned,
            });
        }

        uncc.interleave_type = InterleaveType::Component;
        uncc.components_little_endian = little_endian;
        uncc.block_size = 0;
        uncc.sampling_type = match image.chroma_format() {
            ChromaFormat::C420 => SamplingType::YCbCr420,
            ChromaFormat::C422 => SamplingType::YCbCr422,
            _ => SamplingType::NoSubsampling,
        };

        // Bayer pattern: the in-memory pattern carries raw component
        // types (legacy authoring path). Each unique type becomes a
        // reference component in cmpd, appended after the data
        // components with no uncC entry, and the emitted cpat references
        // those cmpd slots.
        let cpat = if let Some(bayer) = image.bayer_pattern() {
            let mut unique_types: Vec<u16> = Vec::new();
            for pixel in &bayer.pixels {
                if !unique_types.contains(&pixel.component_index) {
                    unique_types.push(pixel.component_index);
                }
            }

            let mut type_to_cmpd_index = std::collections::HashMap::new();
            for ty in &unique_types {
                type_to_cmpd_index.insert(*ty, box_index);
                cmpd.add_component(Component {
                    component_type: *ty,
                    component_type_uri: String::new(),
                });
                box_index += 1;
            }

            let mut resolved = bayer.clone();
            for pixel in &mut resolved.pixels {
                pixel.component_index = type_to_cmpd_index[&pixel.component_index];
            }

            let mut cpat = Cpat::new();
            cpat.set_pattern(resolved);
            Some(cpat)
        } else {
            None
        };

        let splz = image
            .polarization_patterns()
            .iter()
            .map(|pattern| {
                let mut b = Splz::new();
                b.set_pattern(pattern.clone());
                b
            })
            .collect();

        let sbpm = image
            .sensor_bad_pixels_maps()
            .iter()
            .map(|map| {
                let mut b = Sbpm::new();
                b.set_bad_pixels_map(map.clone());
                b
            })
            .collect();

        let snuc = image
            .sensor_nucs()
            .iter()
            .map(|nuc| {
                let mut b = Snuc::new();
                b.set_nuc(nuc.clone());
                b
            })
            .collect();

        let cloc = image.chroma_location().map(|location| {
            let mut b = Cloc::new();
            b.set_chroma_location(location);
            b
        });

        debug!(
            components = components.len(),
            little_endian,
            sampling = uncc.sampling_type.name(),
            "built component-interleave descriptor boxes"
        );

        Ok(Self {
            components,
            cmpd,
            uncc,
            cpat,
            splz,
            sbpm,
            snuc,
            cloc,
        })
    }

    pub fn cmpd(&self) -> &Cmpd {
        &self.cmpd
    }

    pub fn uncc(&self) -> &UncC {
        &self.uncc
    }

    pub fn cpat(&self) -> Option<&Cpat> {
        self.cpat.as_ref()
    }

    pub fn splz(&self) -> &[Splz] {
        &self.splz
    }

    pub fn sbpm(&self) -> &[Sbpm] {
        &self.sbpm
    }

    pub fn snuc(&self) -> &[Snuc] {
        &self.snuc
    }

    pub fn cloc(&self) -> Option<&Cloc> {
        self.cloc.as_ref()
    }

    /// Coded size of one `tile_width`×`tile_height` tile before
    /// compression: the sum over components of rows × bytes-per-row,
    /// with chroma planes scaled by the sampling mode.
    pub fn compute_tile_data_size_bytes(&self, tile_width: u32, tile_height: u32) -> u64 {
        let mut total = 0u64;
        for comp in &self.components {
            let mut plane_width = tile_width;
            let mut plane_height = tile_height;

            if comp.channel == Channel::Cb || comp.channel == Channel::Cr {
                match self.uncc.sampling_type {
                    SamplingType::YCbCr420 => {
                        plane_width = (plane_width + 1) / 2;
                        plane_height = (plane_height + 1) / 2;
                    }
                    SamplingType::YCbCr422 => {
                        plane_width = (plane_width + 1) / 2;
                    }
                    _ => {}
                }
            }

            let row_bytes = if comp.byte_aligned {
                plane_width as u64 * ((comp.bpp as u64 + 7) / 8)
            } else {
                (plane_width as u64 * comp.bpp as u64 + 7) / 8
            };
            total += row_bytes * plane_height as u64;
        }
        total
    }

    /// Serializes one tile image into the coded layout, uncompressed.
    pub fn encode_tile(&self, src_image: &PixelImage) -> Result<Vec<u8>, UncError> {
        let total_size =
            self.compute_tile_data_size_bytes(src_image.width(), src_image.height());

        // The planes must match the layout the descriptor boxes declare.
        let mut actual_size = 0u64;
        for comp in &self.components {
            let width = src_image.plane_width(comp.plane_index)? as u64;
            let height = src_image.plane_height(comp.plane_index)? as u64;
            let row_bytes = if comp.byte_aligned {
                width * ((comp.bpp as u64 + 7) / 8)
            } else {
                (width * comp.bpp as u64 + 7) / 8
            };
            actual_size += row_bytes * height;
        }
        if actual_size != total_size {
            return Err(UncError::Usage(format!(
                "tile planes hold {actual_size} coded bytes, layout requires {total_size}"
            )));
        }

        let mut data = vec![0u8; total_size as usize];
        let mut out_pos = 0usize;

        for comp in &self.components {
            let plane_width = src_image.plane_width(comp.plane_index)? as usize;
            let plane_height = src_image.plane_height(comp.plane_index)? as usize;
            let bpp = comp.bpp as usize;
            let (src_data, src_stride) = src_image.plane_data(comp.plane_index)?;

            if comp.byte_aligned {
                let bytes_per_pixel = (bpp + 7) / 8;
                let sample_bytes = bytes_per_sample(comp.bpp);
                let row_bytes = plane_width * bytes_per_pixel;
                for y in 0..plane_height {
                    let row = &src_data[src_stride * y..];
                    if bytes_per_pixel == sample_bytes {
                        data[out_pos..out_pos + row_bytes].copy_from_slice(&row[..row_bytes]);
                        out_pos += row_bytes;
                    } else {
                        // 24-bit samples occupy four bytes in plane
                        // memory but three on the wire.
                        for x in 0..plane_width {
                            let sample = &row[x * sample_bytes..x * sample_bytes + bytes_per_pixel];
                            data[out_pos..out_pos + bytes_per_pixel].copy_from_slice(sample);
                            out_pos += bytes_per_pixel;
                        }
                    }
                }
            } else {
                let sample_bytes = bytes_per_sample(comp.bpp);
                for y in 0..plane_height {
                    let row = &src_data[src_stride * y..];

                    let mut accumulator = 0u64;
                    let mut accumulated_bits = 0u32;

                    for x in 0..plane_width {
                        let sample = match sample_bytes {
                            1 => row[x] as u32,
                            2 => u16::from_le_bytes([row[2 * x], row[2 * x + 1]]) as u32,
                            _ => u32::from_le_bytes([
                                row[4 * x],
                                row[4 * x + 1],
                                row[4 * x + 2],
                                row[4 * x + 3],
                            ]),
                        };

                        accumulator = (accumulator << bpp) | sample as u64;
                        accumulated_bits += bpp as u32;

                        while accumulated_bits >= 8 {
                            accumulated_bits -= 8;
                            data[out_pos] = (accumulator >> accumulated_bits) as u8;
                            out_pos += 1;
                            accumulator &= (1u64 << accumulated_bits) - 1;
                        }
                    }

                    // Flush the partial byte at row end, zero-padded in
                    // the LSBs. The accumulator restarts on the next row.
                    if accumulated_bits > 0 {
                        data[out_pos] = (accumulator << (8 - accumulated_bits)) as u8;
                        out_pos += 1;
                    }
                }
            }
        }

        debug_assert_eq!(out_pos, data.len());
        Ok(data)
    }

    /// Serializes one tile, compresses it with `method` and registers
    /// the compressed extent in `icef` (units are laid out back to back
    /// in tile raster order).
    pub fn encode_tile_compressed(
        &self,
        src_image: &PixelImage,
        method: FourCC,
        icef: &mut Icef,
    ) -> Result<Vec<u8>, UncError> {
        let raw = self.encode_tile(src_image)?;
        let compressed = compress(method, &raw)?;
        debug!(
            raw = raw.len(),
            compressed = compressed.len(),
            method = %method,
            "compressed tile"
        );
        icef.add_unit(CompressedUnitInfo {
            unit_offset: icef.next_offset(),
            unit_size: compressed.len() as u64,
        });
        Ok(compressed)
    }
}
