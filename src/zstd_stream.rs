//! Length-prefixed framing over streaming zstd sessions.
//!
//! Entropy-coded block payloads are written as a little-endian u32
//! compressed length followed by that many compressed bytes. Compression
//! runs in flush mode so every payload is self-delimiting and decodable on
//! its own, while the session state (and therefore the compression history)
//! persists from block to block. Only a key frame resets the session, and a
//! reset keeps the configured parameters.

use zstd::stream::raw::{
    CParameter, Decoder as RawDecoder, Encoder as RawEncoder, InBuffer, Operation, OutBuffer,
};

use crate::serialize::{BufferReader, BufferWriter};
use crate::{LpvcError, Result};

/// Worst-case compressed size for `len` uncompressed bytes.
pub fn compress_bound(len: usize) -> usize {
    zstd::zstd_safe::compress_bound(len)
}

/// A stateful zstd compression session.
pub struct StreamCompressor {
    ctx: RawEncoder<'static>,
}

impl StreamCompressor {
    pub fn new(compression_level: i32, worker_count: u32) -> Result<Self> {
        let mut ctx = RawEncoder::new(compression_level)?;
        ctx.set_parameter(CParameter::NbWorkers(worker_count))?;
        Ok(Self { ctx })
    }

    /// Reset the session, keeping the configured parameters.
    pub fn reset(&mut self) -> Result<()> {
        self.ctx.reinit()?;
        Ok(())
    }

    /// Compress `src` into the writer as a length-prefixed payload.
    ///
    /// A u32 placeholder is reserved at the current offset, the compressor
    /// is driven until all input is consumed and flushed, and the
    /// placeholder is patched to the compressed size. An empty `src`
    /// produces a legal zero-length payload.
    pub fn compress_into(&mut self, writer: &mut BufferWriter<'_>, src: &[u8]) -> Result<()> {
        let size_slot = writer.reserve_u32()?;

        let mut input = InBuffer::around(src);
        let compressed_size = {
            let mut output = OutBuffer::around(writer.unfilled());

            while input.pos < input.src.len() {
                let before = (input.pos, output.pos());
                self.ctx.run(&mut input, &mut output)?;
                if (input.pos, output.pos()) == before {
                    return Err(LpvcError::BufferOverflow {
                        requested: input.src.len() - input.pos,
                        available: 0,
                    });
                }
            }
            loop {
                let before = output.pos();
                let remaining = self.ctx.flush(&mut output)?;
                if remaining == 0 {
                    break;
                }
                if output.pos() == before {
                    return Err(LpvcError::BufferOverflow {
                        requested: remaining,
                        available: 0,
                    });
                }
            }
            output.pos()
        };

        writer.advance(compressed_size)?;
        writer.patch_u32(size_slot, compressed_size as u32)
    }
}

/// A stateful zstd decompression session.
pub struct StreamDecompressor {
    ctx: RawDecoder<'static>,
}

impl StreamDecompressor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ctx: RawDecoder::new()?,
        })
    }

    /// Reset the session, keeping the configured parameters.
    pub fn reset(&mut self) -> Result<()> {
        self.ctx.reinit()?;
        Ok(())
    }

    /// Read a u32 length prefix, decompress that many compressed bytes into
    /// `dst` and return the decompressed size. `dst` must bound the
    /// decompressed payload.
    pub fn decompress_into(
        &mut self,
        reader: &mut BufferReader<'_>,
        dst: &mut [u8],
    ) -> Result<usize> {
        let compressed_size = reader.read_u32()? as usize;
        let src = reader.read_bytes(compressed_size)?;

        let dst_len = dst.len();
        let mut input = InBuffer::around(src);
        let mut output = OutBuffer::around(dst);

        while input.pos < input.src.len() {
            let before = (input.pos, output.pos());
            self.ctx.run(&mut input, &mut output)?;
            if (input.pos, output.pos()) == before {
                return Err(LpvcError::BufferOverflow {
                    requested: input.src.len() - input.pos,
                    available: dst_len - output.pos(),
                });
            }
        }
        Ok(output.pos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(payloads: &[&[u8]]) {
        let mut compressor = StreamCompressor::new(3, 1).unwrap();
        let mut decompressor = StreamDecompressor::new().unwrap();

        let bound: usize = payloads
            .iter()
            .map(|p| 4 + compress_bound(p.len()))
            .sum();
        let mut buffer = vec![0u8; bound];
        let written = {
            let mut writer = BufferWriter::new(&mut buffer);
            for payload in payloads {
                compressor.compress_into(&mut writer, payload).unwrap();
            }
            writer.offset()
        };

        let mut reader = BufferReader::new(&buffer[..written]);
        for payload in payloads {
            let mut decompressed = vec![0u8; payload.len()];
            let size = decompressor
                .decompress_into(&mut reader, &mut decompressed)
                .unwrap();
            assert_eq!(size, payload.len());
            assert_eq!(&decompressed, payload);
        }
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn single_payload_round_trips() {
        round_trip(&[b"the quick brown fox jumps over the lazy dog"]);
    }

    #[test]
    fn session_state_spans_payloads() {
        let block = vec![0xA5u8; 4096];
        round_trip(&[&block, &block, &block, b"tail"]);
    }

    #[test]
    fn empty_payload_is_legal() {
        round_trip(&[b"", b"after an empty block"]);
    }

    #[test]
    fn compressed_size_is_patched_into_the_prefix() {
        let mut compressor = StreamCompressor::new(3, 1).unwrap();
        let payload = [7u8; 100];
        let mut buffer = vec![0u8; 4 + compress_bound(payload.len())];
        let written = {
            let mut writer = BufferWriter::new(&mut buffer);
            compressor.compress_into(&mut writer, &payload).unwrap();
            writer.offset()
        };

        let mut reader = BufferReader::new(&buffer[..written]);
        let prefix = reader.read_u32().unwrap() as usize;
        assert_eq!(prefix, written - 4);
    }

    #[test]
    fn compressor_reports_exhausted_output_buffer() {
        let mut compressor = StreamCompressor::new(3, 1).unwrap();
        let payload = [9u8; 4096];
        let mut buffer = [0u8; 8];
        let mut writer = BufferWriter::new(&mut buffer);
        assert!(compressor.compress_into(&mut writer, &payload).is_err());
    }
}
