//! Streaming frame encoder.
//!
//! One [`Encoder`] instance serves a whole stream: it keeps the palette
//! grown so far, the previously encoded frame and the zstd session, and
//! turns each input bitmap into a block sequence. All working buffers are
//! allocated at construction; a steady-state [`Encoder::encode`] call does
//! not allocate.

use std::collections::HashMap;

use rgb::ComponentBytes;

use crate::block::{self, BlockKind};
use crate::palette::Palette;
use crate::serialize::BufferWriter;
use crate::zstd_stream::{compress_bound, StreamCompressor};
use crate::{BitmapInfo, Color, LpvcError, Result};

/// Encoder configuration, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct EncoderSettings {
    /// Try palette blocks before falling back to raw frames.
    pub use_palette: bool,
    pub zstd_compression_level: i32,
    pub zstd_worker_count: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            use_palette: true,
            zstd_compression_level: 18,
            zstd_worker_count: 1,
        }
    }
}

/// Outcome of a single [`Encoder::encode`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeResult {
    pub bytes_written: usize,
    /// Whether the frame was encoded as a key frame. The first frame of a
    /// stream is promoted to a key frame regardless of the request flag.
    pub key_frame: bool,
}

pub struct Encoder {
    settings: EncoderSettings,
    bitmap_info: BitmapInfo,
    frame_bitmap: Vec<Color>,
    previous_frame: Vec<Color>,
    internal_buffer: Vec<u8>,
    palette: Palette,
    color_map: HashMap<Color, u8>,
    first_frame: bool,
    compressor: StreamCompressor,
}

impl Encoder {
    pub fn new(bitmap_info: BitmapInfo, settings: EncoderSettings) -> Result<Self> {
        if bitmap_info.width == 0 || bitmap_info.height == 0 {
            return Err(LpvcError::InvalidArgument);
        }

        let pixel_count = bitmap_info.pixel_count();
        let compressor = StreamCompressor::new(
            settings.zstd_compression_level,
            settings.zstd_worker_count,
        )?;

        Ok(Self {
            settings,
            bitmap_info,
            frame_bitmap: vec![Color { r: 0, g: 0, b: 0 }; pixel_count],
            previous_frame: Vec::with_capacity(pixel_count),
            internal_buffer: vec![0; block::internal_buffer_size(&bitmap_info)],
            palette: Palette::new(),
            color_map: HashMap::with_capacity(Palette::MAX_COLORS),
            first_frame: true,
            compressor,
        })
    }

    pub fn bitmap_info(&self) -> BitmapInfo {
        self.bitmap_info
    }

    /// Upper bound on the bytes a single [`Self::encode`] call can write.
    ///
    /// A frame is at worst a key frame followed by the largest of the three
    /// bitmap encodings; entropy-coded blocks are costed at the tag plus the
    /// length prefix plus the zstd worst-case bound of their uncompressed
    /// payload.
    pub fn safe_output_buffer_size(&self) -> usize {
        let full_block_size = |payload: usize| 1 + payload;
        let compressed_block_size = |payload: usize| 4 + compress_bound(payload);

        let indexed_with_palette = full_block_size(0) // palette reset
            + full_block_size(compressed_block_size(block::palette_payload_max()))
            + full_block_size(compressed_block_size(block::indexed_payload_max(
                &self.bitmap_info,
            )));
        let raw = full_block_size(compressed_block_size(block::raw_payload_max(
            &self.bitmap_info,
        )));
        let solid = full_block_size(block::SOLID_COLOR_PAYLOAD_SIZE);

        full_block_size(0) + indexed_with_palette.max(raw).max(solid)
    }

    /// Encode one frame into `output`, which must hold at least
    /// [`Self::safe_output_buffer_size`] bytes. `pixels` must be exactly one
    /// frame in row-major order. Frames must be submitted in presentation
    /// order; each non-key frame is defined relative to its predecessor.
    pub fn encode(
        &mut self,
        pixels: &[Color],
        output: &mut [u8],
        request_key_frame: bool,
    ) -> Result<EncodeResult> {
        let pixel_count = self.bitmap_info.pixel_count();
        if pixels.len() != pixel_count {
            return Err(LpvcError::BitmapSizeMismatch {
                expected: pixel_count,
                actual: pixels.len(),
            });
        }

        let mut writer = BufferWriter::new(output);
        let mut key_frame = request_key_frame;

        if self.first_frame {
            self.first_frame = false;
            key_frame = true;
        }

        if key_frame {
            self.encode_key_frame_block(&mut writer)?;
        }

        if !self.previous_frame.is_empty() && self.previous_frame == pixels {
            self.encode_null_bitmap_block(&mut writer)?;
        } else {
            if self.settings.use_palette {
                match self.make_palette(pixels) {
                    Some(new_palette) if new_palette.len() == 1 => {
                        self.encode_solid_color_block(&mut writer, new_palette.color(0))?;
                    }
                    Some(new_palette) => {
                        self.update_palette(&mut writer, &new_palette)?;
                        self.frame_bitmap.copy_from_slice(pixels);
                        self.encode_indexed_bitmap_block(&mut writer)?;
                    }
                    None => {
                        self.frame_bitmap.copy_from_slice(pixels);
                        self.encode_raw_bitmap_block(&mut writer)?;
                    }
                }
            } else {
                self.frame_bitmap.copy_from_slice(pixels);
                self.encode_raw_bitmap_block(&mut writer)?;
            }

            self.previous_frame.clear();
            self.previous_frame.extend_from_slice(&self.frame_bitmap);
        }

        Ok(EncodeResult {
            bytes_written: writer.offset(),
            key_frame,
        })
    }

    /// Distinct colors of the frame, or `None` once a 257th color shows up.
    fn make_palette(&self, pixels: &[Color]) -> Option<Palette> {
        let mut palette = Palette::new();
        for &color in pixels {
            if !palette.insert(color) {
                return None;
            }
        }
        Some(palette)
    }

    /// Emit the palette blocks needed before an indexed bitmap of
    /// `new_palette` can be decoded.
    ///
    /// Colors never seen before are added incrementally when the combined
    /// palette still fits the index bit width of `new_palette`; otherwise
    /// the palette is reset and replaced so indices stay as narrow as the
    /// frame allows.
    fn update_palette(
        &mut self,
        writer: &mut BufferWriter<'_>,
        new_palette: &Palette,
    ) -> Result<()> {
        let new_colors = self.palette.difference(new_palette);
        if new_colors.is_empty() {
            return Ok(());
        }

        let index_capacity = 1usize << new_palette.bits();
        if self.palette.len() + new_colors.len() > index_capacity {
            if !self.palette.is_empty() {
                self.encode_palette_reset_block(writer)?;
            }
            self.encode_palette_block(writer, new_palette)
        } else {
            self.encode_palette_block(writer, &new_colors)
        }
    }

    fn encode_key_frame_block(&mut self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_u8(BlockKind::KeyFrame.tag())?;
        self.reset()
    }

    fn encode_palette_block(
        &mut self,
        writer: &mut BufferWriter<'_>,
        palette: &Palette,
    ) -> Result<()> {
        if palette.is_empty() {
            return Err(LpvcError::EmptyPalette);
        }

        writer.write_u8(BlockKind::Palette.tag())?;

        let payload_size = {
            let mut payload = BufferWriter::new(&mut self.internal_buffer);
            // Stored as count - 1 so a 256-color palette fits the byte.
            payload.write_u8((palette.len() - 1) as u8)?;
            for &color in palette.as_slice() {
                block::write_color(&mut payload, color)?;
            }
            payload.offset()
        };
        self.compressor
            .compress_into(writer, &self.internal_buffer[..payload_size])?;

        self.palette = self.palette.merge(palette)?;
        self.color_map.clear();
        for (index, &color) in self.palette.as_slice().iter().enumerate() {
            self.color_map.insert(color, index as u8);
        }
        Ok(())
    }

    fn encode_palette_reset_block(&mut self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_u8(BlockKind::PaletteReset.tag())?;
        self.reset_palette();
        Ok(())
    }

    fn encode_indexed_bitmap_block(&mut self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_u8(BlockKind::IndexedBitmap.tag())?;

        let payload_size = {
            let frame = &self.frame_bitmap;
            let color_map = &self.color_map;
            let bits = self.palette.bits();

            let mut payload = BufferWriter::new(&mut self.internal_buffer);
            payload.write_u8(bits as u8)?;
            block::pack_indices(
                frame.iter().map(|color| color_map[color]),
                bits,
                &mut payload,
            )?;
            payload.offset()
        };
        self.compressor
            .compress_into(writer, &self.internal_buffer[..payload_size])
    }

    fn encode_raw_bitmap_block(&mut self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_u8(BlockKind::RawBitmap.tag())?;
        self.compressor
            .compress_into(writer, self.frame_bitmap.as_bytes())
    }

    fn encode_solid_color_block(
        &mut self,
        writer: &mut BufferWriter<'_>,
        color: Color,
    ) -> Result<()> {
        writer.write_u8(BlockKind::SolidColorBitmap.tag())?;
        block::write_color(writer, color)?;
        // Keep the scratch frame consistent so the end-of-encode
        // previous-frame update sees what was transmitted.
        self.frame_bitmap.fill(color);
        Ok(())
    }

    fn encode_null_bitmap_block(&mut self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_u8(BlockKind::NullBitmap.tag())
    }

    fn reset_palette(&mut self) {
        self.palette.clear();
        self.color_map.clear();
    }

    /// Full stream reset: palette, previous frame and the entropy session.
    /// Configured parameters are kept.
    fn reset(&mut self) -> Result<()> {
        self.reset_palette();
        self.previous_frame.clear();
        self.compressor.reset()
    }
}
