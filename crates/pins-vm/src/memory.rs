//! Byte-addressable memory image.
//!
//! ```text
//! 0 .. code_size          code (not addressable by programs)
//! code_size .. data_end   data segment
//! data_end .. HP          heap, grows up
//! SP .. stack_top         stack, grows down
//! ```

use crate::error::{VmError, VmResult};

/// Flat memory of `stack_top` bytes with little-endian 32-bit words.
#[derive(Debug, Clone)]
pub struct Memory {
    bytes: Vec<u8>,
    code_size: i32,
}

impl Memory {
    pub fn new(size: i32, code_size: i32) -> Self {
        Self {
            bytes: vec![0; size.max(0) as usize],
            code_size,
        }
    }

    pub fn size(&self) -> i32 {
        self.bytes.len() as i32
    }

    pub fn code_size(&self) -> i32 {
        self.code_size
    }

    fn range(&self, addr: i32, len: i32) -> VmResult<std::ops::Range<usize>> {
        let end = addr.checked_add(len).ok_or(VmError::MemoryFault(addr))?;
        if addr < self.code_size || end > self.size() {
            return Err(VmError::MemoryFault(addr));
        }
        Ok(addr as usize..end as usize)
    }

    /// Read the word at `addr`.
    pub fn load(&self, addr: i32) -> VmResult<i32> {
        let range = self.range(addr, 4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[range]);
        Ok(i32::from_le_bytes(word))
    }

    /// Write the word at `addr`.
    pub fn store(&mut self, addr: i32, value: i32) -> VmResult<()> {
        let range = self.range(addr, 4)?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Zero `len` bytes starting at `addr`.
    pub fn clear(&mut self, addr: i32, len: i32) -> VmResult<()> {
        let range = self.range(addr, len)?;
        self.bytes[range].fill(0);
        Ok(())
    }
}
