//! LPVC — a lossless palette-aware video codec.
//!
//! LPVC compresses sequences of equally-sized 24-bit RGB bitmaps, targeting
//! screen-capture and other low-entropy content. Each frame is encoded as a
//! self-describing sequence of typed blocks, exploiting three observations:
//! most frames repeat the previous frame exactly, frames often contain at
//! most 256 distinct colors and admit a small indexed palette, and when
//! neither holds, entropy coding of the raw RGB data still helps.
//!
//! # Wire format
//!
//! A frame is a concatenation of blocks; each block starts with a single tag
//! byte followed by a tag-specific payload. Entropy-coded payloads are
//! prefixed with a little-endian u32 compressed length and produced by a
//! streaming zstd session that persists across blocks until a key frame.
//!
//! | Tag | Block            | Payload                                      |
//! |-----|------------------|----------------------------------------------|
//! | 0   | KeyFrame         | empty; resets encoder/decoder state          |
//! | 1   | Palette          | zstd: `count - 1` byte, then RGB triples     |
//! | 2   | PaletteReset     | empty; clears the palette                    |
//! | 3   | IndexedBitmap    | zstd: bit width byte, then packed indices    |
//! | 4   | RawBitmap        | zstd: the frame as RGB triples               |
//! | 5   | SolidColorBitmap | three literal RGB bytes                      |
//! | 6   | NullBitmap       | empty; frame equals the previous frame       |
//!
//! There is no outer header and no frame terminator; framing comes from the
//! caller passing the exact byte count returned by [`Encoder::encode`].
//!
//! # Example
//!
//! ```no_run
//! use lpvc::{BitmapInfo, Color, Decoder, Encoder, EncoderSettings};
//!
//! let info = BitmapInfo { width: 640, height: 480 };
//! let mut encoder = Encoder::new(info, EncoderSettings::default())?;
//! let mut decoder = Decoder::new(info)?;
//!
//! let frame = vec![Color { r: 0, g: 0, b: 0 }; info.pixel_count()];
//! let mut encoded = vec![0u8; encoder.safe_output_buffer_size()];
//! let mut decoded = vec![Color { r: 0, g: 0, b: 0 }; info.pixel_count()];
//!
//! let result = encoder.encode(&frame, &mut encoded, false)?;
//! decoder.decode(&encoded[..result.bytes_written], &mut decoded)?;
//! assert_eq!(frame, decoded);
//! # Ok::<(), lpvc::LpvcError>(())
//! ```

use thiserror::Error;

pub const API_VERSION_MAJOR: u32 = 1;
pub const API_VERSION_MINOR: u32 = 0;

/// Packed build identifier: major version in the high 16 bits.
pub fn version() -> u32 {
    (API_VERSION_MAJOR << 16) | API_VERSION_MINOR
}

/// Human-readable build identifier.
pub fn version_string() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// A 24-bit RGB pixel.
///
/// Equality is componentwise; the derived ordering is lexicographic on
/// `(r, g, b)`, which is the canonical color ordering used by [`Palette`].
pub type Color = rgb::RGB8;

/// Fixed frame geometry for the lifetime of an encoder or decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapInfo {
    pub width: usize,
    pub height: usize,
}

impl BitmapInfo {
    /// Number of pixels in a frame.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

#[derive(Error, Debug)]
pub enum LpvcError {
    #[error("buffer overflow: requested {requested} bytes with {available} available")]
    BufferOverflow { requested: usize, available: usize },
    #[error("too many colors to form a palette")]
    TooManyColors,
    #[error("palettes with 0 colors are not allowed")]
    EmptyPalette,
    #[error("unknown block tag {0}")]
    UnknownBlockTag(u8),
    #[error("bitmap has {actual} pixels, expected {expected}")]
    BitmapSizeMismatch { expected: usize, actual: usize },
    #[error("invalid argument")]
    InvalidArgument,
    #[error("unsupported format")]
    UnsupportedFormat,
    #[error("invalid data")]
    InvalidData,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LpvcError>;

pub mod block;
pub mod decoder;
pub mod encoder;
pub mod palette;
pub mod ppm;
pub mod serialize;
pub mod zstd_stream;

pub use decoder::{DecodeResult, Decoder};
pub use encoder::{EncodeResult, Encoder, EncoderSettings};
pub use palette::Palette;
