//! Generic tile compression, addressed by fourcc.
//!
//! The codec itself only knows the `compress`/`decompress` contract;
//! the actual primitives come from the back-end crates. Brotli support
//! is compile-time optional (`brotli` feature), matching deployments
//! that build without it.

use crate::errors::UncError;
use crate::fourcc::FourCC;

/// Raw deflate.
pub const COMPRESSION_DEFLATE: FourCC = FourCC::new(b"defl");
/// Deflate with zlib wrapper.
pub const COMPRESSION_ZLIB: FourCC = FourCC::new(b"zlib");
/// Brotli.
pub const COMPRESSION_BROTLI: FourCC = FourCC::new(b"brot");

/// Compression selection on the encoder API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnciCompression {
    #[default]
    Off,
    Deflate,
    Zlib,
    Brotli,
}

impl UnciCompression {
    /// The wire fourcc of the method; `None` when compression is off.
    pub fn fourcc(self) -> Option<FourCC> {
        match self {
            Self::Off => None,
            Self::Deflate => Some(COMPRESSION_DEFLATE),
            Self::Zlib => Some(COMPRESSION_ZLIB),
            Self::Brotli => Some(COMPRESSION_BROTLI),
        }
    }
}

/// Compresses `data` with the method named by `method`.
pub fn compress(method: FourCC, data: &[u8]) -> Result<Vec<u8>, UncError> {
    match method {
        COMPRESSION_DEFLATE => Ok(miniz_oxide::deflate::compress_to_vec(data, 6)),
        COMPRESSION_ZLIB => Ok(miniz_oxide::deflate::compress_to_vec_zlib(data, 6)),
        #[cfg(feature = "brotli")]
        COMPRESSION_BROTLI => {
            let mut out = Vec::new();
            let params = brotli::enc::BrotliEncoderParams::default();
            brotli::BrotliCompress(&mut std::io::Cursor::new(data), &mut out, &params)
                .map_err(|e| UncError::DecoderPlugin(format!("brotli compression failed: {e}")))?;
            Ok(out)
        }
        _ => Err(UncError::UnsupportedCompressionMethod(method)),
    }
}

/// Decompresses `data`. `expected_size` bounds the output so an
/// adversarial stream cannot balloon memory; the caller knows the exact
/// tile size from the layout.
pub fn decompress(
    method: FourCC,
    data: &[u8],
    expected_size: usize,
) -> Result<Vec<u8>, UncError> {
    match method {
        COMPRESSION_DEFLATE => {
            let options = zune_inflate::DeflateOptions::default()
                .set_limit(expected_size)
                .set_size_hint(expected_size);
            zune_inflate::DeflateDecoder::new_with_options(data, options)
                .decode_deflate()
                .map_err(|e| UncError::DecoderPlugin(format!("deflate decoding failed: {e:?}")))
        }
        COMPRESSION_ZLIB => {
            let options = zune_inflate::DeflateOptions::default()
                .set_limit(expected_size)
                .set_size_hint(expected_size);
            zune_inflate::DeflateDecoder::new_with_options(data, options)
                .decode_zlib()
                .map_err(|e| UncError::DecoderPlugin(format!("zlib decoding failed: {e:?}")))
        }
        #[cfg(feature = "brotli")]
        COMPRESSION_BROTLI => {
            let mut out = Vec::new();
            brotli::BrotliDecompress(&mut std::io::Cursor::new(data), &mut out)
                .map_err(|e| UncError::DecoderPlugin(format!("brotli decoding failed: {e}")))?;
            if out.len() > expected_size {
                return Err(UncError::DecoderPlugin(format!(
                    "brotli stream expands to {} bytes, expected at most {expected_size}",
                    out.len()
                )));
            }
            Ok(out)
        }
        _ => Err(UncError::UnsupportedCompressionMethod(method)),
    }
}
