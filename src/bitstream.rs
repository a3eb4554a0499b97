//! Byte-level box I/O.
//!
//! Boxes are length-prefixed records:
//!
//! ```ignore
//! | [X X X X] [Y Y Y Y] [Z Z Z Z Z Z Z Z] |
//!    |         |         |
//!    |         |         64bit largesize (only if 32bit size == 1)
//!    |         FourCC
//!    32bit size
//! ```
//!
//! FullBoxes carry one version byte and three flag bytes after the type.
//! [`BoxReader`] is a bounded cursor over exactly one box payload: any
//! over-read surfaces as a malformed-input error instead of touching
//! bytes past the box. [`BoxWriter`] accumulates into memory and
//! backpatches the size prefix when a box is closed.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use binrw::{BinReaderExt, BinWriterExt};

use crate::errors::UncError;
use crate::fourcc::BoxType;
use crate::limits::SecurityLimits;

/// Parsed box header. 8 or 16 bytes on the wire, plus 4 for FullBoxes.
#[derive(Debug, Clone)]
pub struct BoxHeader {
    /// Total box size in bytes including the header.
    pub box_size: u64,
    pub box_type: BoxType,
    /// 8, or 16 when the 64-bit largesize form was used.
    pub header_size: u32,
}

impl BoxHeader {
    /// Payload size, excluding the size/type header.
    pub fn data_size(&self) -> u64 {
        self.box_size - self.header_size as u64
    }
}

/// Reads a box header at the cursor position.
pub(crate) fn read_box_header(
    cursor: &mut Cursor<&[u8]>,
    limits: &SecurityLimits,
) -> Result<BoxHeader, UncError> {
    let size32: u32 = cursor.read_be()?;
    let fourcc: u32 = cursor.read_be()?;
    let box_type = BoxType::from_u32(fourcc);

    let (box_size, header_size) = if size32 == 1 {
        (cursor.read_be::<u64>()?, 16)
    } else {
        (size32 as u64, 8)
    };

    if box_size < header_size as u64 {
        return Err(UncError::InvalidParameterValue(format!(
            "box '{box_type}' declares size {box_size}, smaller than its header"
        )));
    }
    limits.check_box_size(box_size)?;

    Ok(BoxHeader {
        box_size,
        box_type,
        header_size,
    })
}

/// Bounded reader over a single box payload.
pub struct BoxReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> BoxReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(payload),
        }
    }

    pub fn remaining(&self) -> u64 {
        self.cursor.get_ref().len() as u64 - self.cursor.position()
    }

    pub fn read_u8(&mut self) -> Result<u8, UncError> {
        Ok(self.cursor.read_be::<u8>()?)
    }

    pub fn read_u16(&mut self) -> Result<u16, UncError> {
        Ok(self.cursor.read_be::<u16>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32, UncError> {
        Ok(self.cursor.read_be::<u32>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64, UncError> {
        Ok(self.cursor.read_be::<u64>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32, UncError> {
        Ok(self.cursor.read_be::<f32>()?)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, UncError> {
        if (n as u64) > self.remaining() {
            return Err(UncError::InvalidParameterValue(format!(
                "read of {n} bytes exceeds box payload ({} remaining)",
                self.remaining()
            )));
        }
        let mut buf = vec![0u8; n];
        self.cursor.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads an unsigned integer of `nbytes` bytes, MSB first.
    /// Used for the variable-width `icef` offset/size fields.
    pub fn read_uint(&mut self, nbytes: u32) -> Result<u64, UncError> {
        debug_assert!(nbytes <= 8);
        let mut value = 0u64;
        for _ in 0..nbytes {
            value = (value << 8) | self.read_u8()? as u64;
        }
        Ok(value)
    }

    /// Reads a NUL-terminated UTF-8 string. The terminator is consumed
    /// and not part of the result.
    pub fn read_nul_string(&mut self) -> Result<String, UncError> {
        let mut buf = Vec::new();
        loop {
            let b = self.read_u8()?;
            if b == 0 {
                break;
            }
            buf.push(b);
        }
        Ok(String::from_utf8(buf)?)
    }

    /// Reads the FullBox version byte and 24-bit flags.
    pub fn read_full_box_header(&mut self) -> Result<(u8, u32), UncError> {
        let version = self.read_u8()?;
        let flags = self.read_uint(3)? as u32;
        Ok((version, flags))
    }
}

/// In-memory box writer. Sizes are backpatched when a box is closed,
/// so nested and sequential boxes serialize in one pass.
pub struct BoxWriter {
    cursor: Cursor<Vec<u8>>,
    open_boxes: Vec<u64>,
}

impl BoxWriter {
    pub fn new() -> Self {
        Self {
            cursor: Cursor::new(Vec::new()),
            open_boxes: Vec::new(),
        }
    }

    /// Opens a plain box: placeholder size + fourcc.
    pub fn start_box(&mut self, box_type: BoxType) -> Result<(), UncError> {
        self.open_boxes.push(self.cursor.position());
        self.write_u32(0)?;
        self.write_bytes(box_type.fourcc().as_bytes())?;
        Ok(())
    }

    /// Opens a FullBox: placeholder size + fourcc + version + flags.
    pub fn start_full_box(
        &mut self,
        box_type: BoxType,
        version: u8,
        flags: u32,
    ) -> Result<(), UncError> {
        self.start_box(box_type)?;
        self.write_u8(version)?;
        self.write_bytes(&flags.to_be_bytes()[1..])?;
        Ok(())
    }

    /// Closes the innermost open box, backpatching its size prefix.
    pub fn end_box(&mut self) -> Result<(), UncError> {
        let start = self
            .open_boxes
            .pop()
            .ok_or_else(|| UncError::Internal("end_box without matching start_box".into()))?;
        let end = self.cursor.position();
        let size = end - start;
        let size32 = u32::try_from(size)
            .map_err(|_| UncError::Internal(format!("box size {size} exceeds 32-bit form")))?;
        self.cursor.seek(SeekFrom::Start(start))?;
        self.write_u32(size32)?;
        self.cursor.seek(SeekFrom::Start(end))?;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), UncError> {
        Ok(self.cursor.write_be(&value)?)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), UncError> {
        Ok(self.cursor.write_be(&value)?)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), UncError> {
        Ok(self.cursor.write_be(&value)?)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), UncError> {
        Ok(self.cursor.write_be(&value)?)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), UncError> {
        Ok(self.cursor.write_be(&value)?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), UncError> {
        Ok(self.cursor.write_all(bytes)?)
    }

    /// Writes an unsigned integer as `nbytes` bytes, MSB first.
    pub fn write_uint(&mut self, value: u64, nbytes: u32) -> Result<(), UncError> {
        debug_assert!(nbytes <= 8);
        for i in (0..nbytes).rev() {
            self.write_u8((value >> (i * 8)) as u8)?;
        }
        Ok(())
    }

    /// Writes a string followed by a NUL terminator.
    pub fn write_nul_string(&mut self, s: &str) -> Result<(), UncError> {
        self.write_bytes(s.as_bytes())?;
        self.write_u8(0)
    }

    /// Finishes writing. Errors if a box is still open.
    pub fn into_bytes(self) -> Result<Vec<u8>, UncError> {
        if !self.open_boxes.is_empty() {
            return Err(UncError::Internal("unclosed box in writer".into()));
        }
        Ok(self.cursor.into_inner())
    }
}

impl Default for BoxWriter {
    fn default() -> Self {
        Self::new()
    }
}
