//! Bounds-checked little-endian cursors over caller-provided byte buffers.
//!
//! [`BufferWriter`] and [`BufferReader`] are the only way codec blocks touch
//! bytes: every access is checked against the end of the buffer and no
//! partial read or write is observable after an error. The writer can also
//! reserve a 32-bit slot and patch it later, which the entropy codec uses to
//! back-fill compressed payload sizes.

use crate::{LpvcError, Result};

/// A write cursor over a caller-owned byte region.
pub struct BufferWriter<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> BufferWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Total capacity of the underlying buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of bytes written so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left before the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    /// The bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.offset]
    }

    /// The writable region past the cursor. Pair with [`Self::advance`] for
    /// code that fills the buffer directly, like the entropy codec.
    pub fn unfilled(&mut self) -> &mut [u8] {
        &mut self.buffer[self.offset..]
    }

    /// Move the cursor forward over bytes filled externally.
    pub fn advance(&mut self, count: usize) -> Result<()> {
        self.check(count)?;
        self.offset += count;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.check(bytes.len())?;
        self.buffer[self.offset..self.offset + bytes.len()].copy_from_slice(bytes);
        self.offset += bytes.len();
        Ok(())
    }

    /// Write a zeroed u32 and return its offset for a later
    /// [`Self::patch_u32`].
    pub fn reserve_u32(&mut self) -> Result<usize> {
        let slot = self.offset;
        self.write_u32(0)?;
        Ok(slot)
    }

    /// Overwrite a previously reserved u32 in place. The cursor is not
    /// moved.
    pub fn patch_u32(&mut self, slot: usize, value: u32) -> Result<()> {
        let end = slot.checked_add(4).ok_or(LpvcError::BufferOverflow {
            requested: 4,
            available: 0,
        })?;
        if end > self.offset {
            return Err(LpvcError::BufferOverflow {
                requested: 4,
                available: self.offset.saturating_sub(slot),
            });
        }
        self.buffer[slot..end].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn check(&self, count: usize) -> Result<()> {
        if count > self.remaining() {
            return Err(LpvcError::BufferOverflow {
                requested: count,
                available: self.remaining(),
            });
        }
        Ok(())
    }
}

/// A read cursor over a borrowed byte region.
pub struct BufferReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left before the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Skip `count` bytes.
    pub fn advance(&mut self, count: usize) -> Result<()> {
        self.check(count)?;
        self.offset += count;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(u8::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Borrow the next `count` bytes and advance past them. The returned
    /// slice outlives the reader; it borrows the underlying buffer.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.check(count)?;
        let bytes = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    fn check(&self, count: usize) -> Result<()> {
        if count > self.remaining() {
            return Err(LpvcError::BufferOverflow {
                requested: count,
                available: self.remaining(),
            });
        }
        Ok(())
    }
}
