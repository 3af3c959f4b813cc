//! Streaming frame decoder.
//!
//! The decoder mirrors the encoder's state machine: it replays the block
//! sequence of each frame, maintaining the palette and the previous frame
//! across calls. Buffers are allocated once at construction.

use rgb::ComponentBytes;

use crate::block::{self, BlockKind};
use crate::palette::Palette;
use crate::serialize::BufferReader;
use crate::zstd_stream::StreamDecompressor;
use crate::{BitmapInfo, Color, LpvcError, Result};

/// Outcome of a single [`Decoder::decode`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeResult {
    /// Whether the frame carried a key-frame block.
    pub key_frame: bool,
}

pub struct Decoder {
    bitmap_info: BitmapInfo,
    frame_bitmap: Vec<Color>,
    previous_frame: Vec<Color>,
    internal_buffer: Vec<u8>,
    palette: Palette,
    decompressor: StreamDecompressor,
    result: DecodeResult,
}

impl Decoder {
    pub fn new(bitmap_info: BitmapInfo) -> Result<Self> {
        if bitmap_info.width == 0 || bitmap_info.height == 0 {
            return Err(LpvcError::InvalidArgument);
        }

        let pixel_count = bitmap_info.pixel_count();
        let black = Color { r: 0, g: 0, b: 0 };

        Ok(Self {
            bitmap_info,
            frame_bitmap: vec![black; pixel_count],
            previous_frame: vec![black; pixel_count],
            internal_buffer: vec![0; block::internal_buffer_size(&bitmap_info)],
            palette: Palette::new(),
            decompressor: StreamDecompressor::new()?,
            result: DecodeResult::default(),
        })
    }

    pub fn bitmap_info(&self) -> BitmapInfo {
        self.bitmap_info
    }

    /// Decode one frame from `input` into `output`.
    ///
    /// `input` must span exactly the bytes one [`crate::Encoder::encode`]
    /// call produced, and `output` exactly one frame. Frames must be fed in
    /// encode order; the first frame of a stream must be a key frame.
    pub fn decode(&mut self, input: &[u8], output: &mut [Color]) -> Result<DecodeResult> {
        let pixel_count = self.bitmap_info.pixel_count();
        if output.len() != pixel_count {
            return Err(LpvcError::BitmapSizeMismatch {
                expected: pixel_count,
                actual: output.len(),
            });
        }

        self.result = DecodeResult::default();

        let mut reader = BufferReader::new(input);
        while reader.remaining() != 0 {
            match BlockKind::from_tag(reader.read_u8()?)? {
                BlockKind::KeyFrame => self.decode_key_frame_block()?,
                BlockKind::Palette => self.decode_palette_block(&mut reader)?,
                BlockKind::PaletteReset => self.reset_palette(),
                BlockKind::IndexedBitmap => self.decode_indexed_bitmap_block(&mut reader)?,
                BlockKind::RawBitmap => self.decode_raw_bitmap_block(&mut reader)?,
                BlockKind::SolidColorBitmap => self.decode_solid_color_block(&mut reader)?,
                BlockKind::NullBitmap => self.decode_null_bitmap_block(),
            }
        }

        output.copy_from_slice(&self.frame_bitmap);
        self.previous_frame.copy_from_slice(&self.frame_bitmap);

        Ok(self.result)
    }

    fn decode_key_frame_block(&mut self) -> Result<()> {
        self.reset()?;
        self.result.key_frame = true;
        Ok(())
    }

    fn decode_palette_block(&mut self, reader: &mut BufferReader<'_>) -> Result<()> {
        let decompressed = self
            .decompressor
            .decompress_into(reader, &mut self.internal_buffer)?;

        let mut payload = BufferReader::new(&self.internal_buffer[..decompressed]);
        let color_count = payload.read_u8()? as usize + 1;

        let mut decoded = Palette::new();
        for _ in 0..color_count {
            decoded.insert(block::read_color(&mut payload)?);
        }

        self.palette = self.palette.merge(&decoded)?;
        Ok(())
    }

    fn decode_indexed_bitmap_block(&mut self, reader: &mut BufferReader<'_>) -> Result<()> {
        let decompressed = self
            .decompressor
            .decompress_into(reader, &mut self.internal_buffer)?;

        let mut payload = BufferReader::new(&self.internal_buffer[..decompressed]);
        let bits = payload.read_u8()? as u32;

        let frame = &mut self.frame_bitmap;
        let palette = &self.palette;
        let mut pixel = 0;
        block::unpack_indices(&mut payload, bits, frame.len(), |index| {
            frame[pixel] = palette.color(index as usize);
            pixel += 1;
        })
    }

    fn decode_raw_bitmap_block(&mut self, reader: &mut BufferReader<'_>) -> Result<()> {
        let frame_bytes = self.frame_bitmap.as_bytes_mut();
        let expected = frame_bytes.len();
        let decompressed = self.decompressor.decompress_into(reader, frame_bytes)?;
        if decompressed != expected {
            return Err(LpvcError::InvalidData);
        }
        Ok(())
    }

    fn decode_solid_color_block(&mut self, reader: &mut BufferReader<'_>) -> Result<()> {
        let color = block::read_color(reader)?;
        self.frame_bitmap.fill(color);
        Ok(())
    }

    fn decode_null_bitmap_block(&mut self) {
        self.frame_bitmap.copy_from_slice(&self.previous_frame);
    }

    fn reset_palette(&mut self) {
        self.palette.clear();
    }

    /// Full stream reset for a key frame: palette and entropy session. The
    /// previous frame is left alone; a key frame always rewrites the frame
    /// buffer before it is read.
    fn reset(&mut self) -> Result<()> {
        self.reset_palette();
        self.decompressor.reset()
    }
}
