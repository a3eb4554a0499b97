//! Encoding and decoding core for the ISO/IEC 23001-17 "uncompressed
//! image format": descriptor boxes, pixel image model, the
//! component-interleave codec pipelines, Bayer bilinear demosaicing,
//! and the WebVMT metadata timeline parser.
//!
//! ```no_run
//! use unci::{read_box, SecurityLimits, UncBox};
//!
//! fn main() -> Result<(), unci::UncError> {
//!     let bytes = std::fs::read("uncC.bin")?;
//!     let limits = SecurityLimits::default();
//!
//!     let (parsed, _consumed) = read_box(&bytes, &limits)?;
//!     print!("{}", parsed.dump(0));
//!
//!     if let UncBox::UncC(uncc) = parsed {
//!         println!("tiles: {}x{}", uncc.num_tile_cols, uncc.num_tile_rows);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod bitstream;
pub mod boxes;
pub mod compression;
pub mod decoder;
pub mod demosaic;
pub mod encoder;
pub mod errors;
pub mod fourcc;
pub mod id_creator;
pub mod image;
pub mod limits;
pub mod webvmt;

mod tests;

pub use bitstream::{BoxHeader, BoxReader, BoxWriter};
pub use boxes::{
    read_box,
    Cloc,
    CmpC,
    Cmpd,
    Component,
    ComponentFormat,
    CompressedUnitInfo,
    Cpat,
    Icef,
    InterleaveType,
    SamplingType,
    Sbpm,
    Snuc,
    Splz,
    UncBox,
    UncC,
    UncCComponent,
    component_type,
};
pub use compression::{compress, decompress, UnciCompression};
pub use decoder::UncDecoder;
pub use demosaic::bayer_bilinear_to_rgb;
pub use encoder::{ComponentInterleaveEncoder, EncodingOptions};
pub use errors::{ErrorKind, UncError};
pub use fourcc::{BoxType, FourCC};
pub use id_creator::{IdCreator, Namespace};
pub use image::{
    is_no_filter,
    no_filter_value,
    BadPixel,
    BayerPattern,
    BayerPatternPixel,
    Channel,
    ChannelDatatype,
    ChromaFormat,
    Colorspace,
    PixelImage,
    PolarizationPattern,
    SensorBadPixelsMap,
    SensorNonUniformityCorrection,
};
pub use limits::SecurityLimits;
pub use webvmt::{WebVmtParser, WebVmtSample, BAD_VMT_TIMESTAMP, WEBVMT_TIMESCALE};
