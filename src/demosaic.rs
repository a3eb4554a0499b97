//! Bilinear demosaicing of filter-array (Bayer) images.
//!
//! Converts a single-plane CFA capture plus its pattern into an
//! interleaved RGB image. For every pattern position a neighbor-offset
//! table is precomputed once per image; each output sample is the
//! rounded average of the in-bounds neighbors carrying that channel.

use tracing::debug;

use crate::boxes::cmpd::component_type;
use crate::errors::UncError;
use crate::image::{Channel, ChromaFormat, Colorspace, PixelImage};
use crate::limits::SecurityLimits;

/// Maps a component type to the RGB output channel it provides.
fn component_type_to_rgb_index(ty: u16) -> Option<usize> {
    match ty {
        component_type::RED => Some(0),
        component_type::GREEN => Some(1),
        component_type::BLUE => Some(2),
        _ => None,
    }
}

/// Sample access shared by the 8-bit and 16-bit kernels.
trait Sample: Copy {
    fn load(row: &[u8], x: usize) -> u64;
    fn store(row: &mut [u8], x: usize, value: u64);
}

impl Sample for u8 {
    fn load(row: &[u8], x: usize) -> u64 {
        row[x] as u64
    }

    fn store(row: &mut [u8], x: usize, value: u64) {
        row[x] = value as u8;
    }
}

impl Sample for u16 {
    fn load(row: &[u8], x: usize) -> u64 {
        u16::from_le_bytes([row[2 * x], row[2 * x + 1]]) as u64
    }

    fn store(row: &mut [u8], x: usize, value: u64) {
        row[2 * x..2 * x + 2].copy_from_slice(&(value as u16).to_le_bytes());
    }
}

/// Converts a filter-array image into interleaved RGB via bilinear
/// demosaicing. 8-bit input produces `InterleavedRgb`; 9..=16-bit input
/// produces `InterleavedRrggbbLe`.
pub fn bayer_bilinear_to_rgb(
    input: &PixelImage,
    limits: &SecurityLimits,
) -> Result<PixelImage, UncError> {
    if input.colorspace() != Colorspace::FilterArray
        || input.chroma_format() != ChromaFormat::Monochrome
    {
        return Err(UncError::Usage(
            "demosaicing requires a filter-array image with a monochrome plane".into(),
        ));
    }

    let pattern = input
        .bayer_pattern()
        .ok_or_else(|| UncError::Internal("filter-array image without a Bayer pattern".into()))?;

    let pw = pattern.pattern_width as usize;
    let ph = pattern.pattern_height as usize;
    if pw == 0 || ph == 0 {
        return Err(UncError::Internal("Bayer pattern with zero dimensions".into()));
    }

    let plane_idx = input
        .plane_index_by_channel(Channel::FilterArray)
        .ok_or_else(|| UncError::Internal("filter-array image without a data plane".into()))?;

    let width = input.width();
    let height = input.height();
    let bpp = input.bits_per_pixel(plane_idx)?;

    let out_chroma = if bpp == 8 {
        ChromaFormat::InterleavedRgb
    } else if bpp > 8 && bpp <= 16 {
        ChromaFormat::InterleavedRrggbbLe
    } else {
        return Err(UncError::Internal(format!(
            "cannot demosaic filter-array data with {bpp} bits per pixel"
        )));
    };

    // Resolve each pattern position to an output channel. Pattern
    // entries reference the image's component table when it has one;
    // without a table the index is a raw component type (images
    // authored through the legacy path).
    let mut pattern_channel = vec![0usize; pw * ph];
    for (i, pixel) in pattern.pixels.iter().enumerate() {
        let ty = if input.component_types().is_empty() {
            pixel.component_index
        } else {
            input.component_type(pixel.component_index as usize).ok_or_else(|| {
                UncError::InvalidParameterValue(format!(
                    "Bayer pattern references unknown component {}",
                    pixel.component_index
                ))
            })?
        };
        pattern_channel[i] = component_type_to_rgb_index(ty).ok_or_else(|| {
            UncError::UnsupportedFeature(
                "Bayer pattern contains component types that we currently cannot convert to RGB"
                    .into(),
            )
        })?;
    }

    // For every pattern position and channel, the periodic neighbor
    // offsets contributing to the average. The channel a position
    // directly provides gets the single offset (0, 0).
    let mut neighbor_offsets: Vec<[Vec<(i32, i32)>; 3]> = Vec::with_capacity(pw * ph);
    for py in 0..ph {
        for px in 0..pw {
            let this_ch = pattern_channel[py * pw + px];
            let mut offsets: [Vec<(i32, i32)>; 3] = Default::default();
            offsets[this_ch].push((0, 0));

            let radius_x = pw as i32 - 1;
            let radius_y = ph as i32 - 1;
            for dy in -radius_y..=radius_y {
                for dx in -radius_x..=radius_x {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let npx = (px as i32 + dx).rem_euclid(pw as i32) as usize;
                    let npy = (py as i32 + dy).rem_euclid(ph as i32) as usize;
                    let neighbor_ch = pattern_channel[npy * pw + npx];
                    if neighbor_ch != this_ch {
                        offsets[neighbor_ch].push((dx, dy));
                    }
                }
            }

            neighbor_offsets.push(offsets);
        }
    }

    debug!(width, height, bpp, pw, ph, "demosaicing filter-array image");

    let mut output = PixelImage::new(width, height, Colorspace::Rgb, out_chroma);
    output.add_plane(Channel::Interleaved, width, height, bpp, limits)?;

    let (in_plane, in_stride) = input.plane_data(plane_idx)?;
    // The interleaved plane was just added at index 0.
    let (out_plane, out_stride) = output.plane_data_mut(0)?;

    if bpp <= 8 {
        demosaic_plane::<u8>(
            in_plane,
            in_stride,
            out_plane,
            out_stride,
            width,
            height,
            pw,
            ph,
            &neighbor_offsets,
        );
    } else {
        demosaic_plane::<u16>(
            in_plane,
            in_stride,
            out_plane,
            out_stride,
            width,
            height,
            pw,
            ph,
            &neighbor_offsets,
        );
    }

    Ok(output)
}

#[allow(clippy::too_many_arguments)]
fn demosaic_plane<P: Sample>(
    in_plane: &[u8],
    in_stride: usize,
    out_plane: &mut [u8],
    out_stride: usize,
    width: u32,
    height: u32,
    pw: usize,
    ph: usize,
    neighbor_offsets: &[[Vec<(i32, i32)>; 3]],
) {
    for y in 0..height as usize {
        let out_row = &mut out_plane[y * out_stride..];
        for x in 0..width as usize {
            let offsets = &neighbor_offsets[(y % ph) * pw + (x % pw)];

            for ch in 0..3 {
                let mut sum = 0u64;
                let mut count = 0u64;

                for &(dx, dy) in &offsets[ch] {
                    let nx = x as i64 + dx as i64;
                    let ny = y as i64 + dy as i64;
                    if nx < 0 || nx >= width as i64 || ny < 0 || ny >= height as i64 {
                        continue;
                    }
                    sum += P::load(&in_plane[ny as usize * in_stride..], nx as usize);
                    count += 1;
                }

                let value = if count > 0 { (sum + count / 2) / count } else { 0 };
                P::store(out_row, x * 3 + ch, value);
            }
        }
    }
}
