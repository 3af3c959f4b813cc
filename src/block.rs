//! Frame block taxonomy: wire tags, payload bounds and index packing.
//!
//! A frame on the wire is a concatenation of blocks, each introduced by a
//! single tag byte. The tag values are part of the wire format and must
//! never change; new block kinds are appended only.

use crate::palette::Palette;
use crate::serialize::{BufferReader, BufferWriter};
use crate::{BitmapInfo, Color, LpvcError, Result};

/// The seven block kinds, with discriminants equal to their wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockKind {
    /// Stream reset; decoding of later blocks depends only on bytes from
    /// here on.
    KeyFrame = 0,
    /// Palette delta or full replacement, entropy coded.
    Palette = 1,
    /// Clears the palette without touching the entropy session.
    PaletteReset = 2,
    /// The frame as packed palette indices, entropy coded.
    IndexedBitmap = 3,
    /// The frame as raw RGB triples, entropy coded.
    RawBitmap = 4,
    /// A single literal color filling the whole frame.
    SolidColorBitmap = 5,
    /// The frame equals the previous frame.
    NullBitmap = 6,
}

impl BlockKind {
    /// The wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => Self::KeyFrame,
            1 => Self::Palette,
            2 => Self::PaletteReset,
            3 => Self::IndexedBitmap,
            4 => Self::RawBitmap,
            5 => Self::SolidColorBitmap,
            6 => Self::NullBitmap,
            _ => return Err(LpvcError::UnknownBlockTag(tag)),
        })
    }
}

/// Uncompressed payload bound of a Palette block: the count byte plus 256
/// RGB triples.
pub(crate) fn palette_payload_max() -> usize {
    1 + Palette::MAX_COLORS * 3
}

/// Uncompressed payload bound of an IndexedBitmap block: the bit-width byte
/// plus one byte per pixel at the widest index width.
pub(crate) fn indexed_payload_max(bitmap_info: &BitmapInfo) -> usize {
    1 + bitmap_info.pixel_count()
}

/// Uncompressed payload size of a RawBitmap block.
pub(crate) fn raw_payload_max(bitmap_info: &BitmapInfo) -> usize {
    bitmap_info.pixel_count() * 3
}

pub(crate) const SOLID_COLOR_PAYLOAD_SIZE: usize = 3;

/// Scratch size able to hold any uncompressed palette or indexed-bitmap
/// payload. Shared by encoder and decoder.
pub(crate) fn internal_buffer_size(bitmap_info: &BitmapInfo) -> usize {
    palette_payload_max().max(indexed_payload_max(bitmap_info))
}

pub(crate) fn write_color(writer: &mut BufferWriter<'_>, color: Color) -> Result<()> {
    writer.write_bytes(&[color.r, color.g, color.b])
}

pub(crate) fn read_color(reader: &mut BufferReader<'_>) -> Result<Color> {
    let bytes = reader.read_bytes(3)?;
    Ok(Color {
        r: bytes[0],
        g: bytes[1],
        b: bytes[2],
    })
}

/// Pack `bits`-wide indices into bytes, LSB first, pixels in row-major
/// order. When the pixel count times `bits` is not a multiple of 8, the
/// unused high bits of the final byte stay zero. `bits` must be 1, 2, 4
/// or 8.
pub(crate) fn pack_indices(
    indices: impl Iterator<Item = u8>,
    bits: u32,
    writer: &mut BufferWriter<'_>,
) -> Result<()> {
    debug_assert!(matches!(bits, 1 | 2 | 4 | 8));

    let mut packed = 0u8;
    let mut filled = 0u32;
    for index in indices {
        packed |= index << filled;
        filled += bits;
        if filled == 8 {
            writer.write_u8(packed)?;
            packed = 0;
            filled = 0;
        }
    }
    if filled != 0 {
        writer.write_u8(packed)?;
    }
    Ok(())
}

/// Mirror of [`pack_indices`]: read `count` indices of width `bits`,
/// invoking `emit` for each in pixel order. Bytes are pulled from the
/// reader on demand.
pub(crate) fn unpack_indices(
    reader: &mut BufferReader<'_>,
    bits: u32,
    count: usize,
    mut emit: impl FnMut(u8),
) -> Result<()> {
    if !matches!(bits, 1 | 2 | 4 | 8) {
        return Err(LpvcError::InvalidData);
    }

    let mask = ((1u16 << bits) - 1) as u8;
    let mut packed = 0u8;
    let mut consumed = 8u32;
    for _ in 0..count {
        if consumed == 8 {
            packed = reader.read_u8()?;
            consumed = 0;
        }
        emit((packed >> consumed) & mask);
        consumed += bits;
    }
    Ok(())
}
