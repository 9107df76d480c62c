use std::ops::Range;

use thiserror::Error;

pub type Byte = u8; // 1 byte
pub type Word = u16; // 2 bytes

/// Every byte of the largest memory is reachable through a 16-bit address
pub const MAX_MEMORY_SIZE: usize = 0x1_0000;
/// The stack starts one word below the top, so at least one word is needed
pub const MIN_MEMORY_SIZE: usize = 2;

/// Errors raised by memory accesses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory access out of bounds: 0x{address:04X} (+{width}) exceeds {len} bytes")]
    OutOfBounds {
        address: usize,
        width: usize,
        len: usize,
    },
    #[error("invalid memory size {0}: must be between 2 and 65536 bytes")]
    InvalidSize(usize),
}

/// Flat, byte addressable memory with big endian word access
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Memory {
    data: Vec<Byte>,
}

impl Default for Memory {
    /// Initializes the full 64 KiB address space
    fn default() -> Self {
        Memory {
            data: vec![0; MAX_MEMORY_SIZE],
        }
    }
}

impl Memory {
    /// Allocates `size` zeroed bytes. The size never changes afterwards.
    pub fn new(size: usize) -> Result<Self, MemoryError> {
        if !(MIN_MEMORY_SIZE..=MAX_MEMORY_SIZE).contains(&size) {
            return Err(MemoryError::InvalidSize(size));
        }

        Ok(Memory {
            data: vec![0; size],
        })
    }

    /// Total number of addressable bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw view of the whole memory
    pub fn as_slice(&self) -> &[Byte] {
        &self.data
    }

    fn range(&self, address: Word, width: usize) -> Result<Range<usize>, MemoryError> {
        let start = address as usize;
        match start.checked_add(width) {
            Some(end) if end <= self.data.len() => Ok(start..end),
            _ => Err(MemoryError::OutOfBounds {
                address: start,
                width,
                len: self.data.len(),
            }),
        }
    }

    /// Reads a byte from the memory
    pub fn read_byte(&self, address: Word) -> Result<Byte, MemoryError> {
        let range = self.range(address, 1)?;
        Ok(self.data[range.start])
    }

    /// Writes a byte to the memory
    pub fn write_byte(&mut self, address: Word, value: Byte) -> Result<(), MemoryError> {
        let range = self.range(address, 1)?;
        self.data[range.start] = value;
        Ok(())
    }

    /// Reads a word from the memory (big endian)
    pub fn read_word(&self, address: Word) -> Result<Word, MemoryError> {
        let range = self.range(address, 2)?;
        Ok(Word::from_be_bytes([
            self.data[range.start],
            self.data[range.start + 1],
        ]))
    }

    /// Writes a word to the memory (big endian)
    pub fn write_word(&mut self, address: Word, value: Word) -> Result<(), MemoryError> {
        let range = self.range(address, 2)?;
        self.data[range].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Borrows `length` bytes starting at `address`
    pub fn read_slice(&self, address: Word, length: usize) -> Result<&[Byte], MemoryError> {
        let range = self.range(address, length)?;
        Ok(&self.data[range])
    }

    /// Writes an array of bytes to the memory. Nothing is written if the
    /// array does not fit.
    pub fn write_array(&mut self, position: Word, data: &[Byte]) -> Result<(), MemoryError> {
        let range = self.range(position, data.len())?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }
}

/// Writes a block of instructions directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $byte:expr ),+ $(,)? ) => {
        $mem.write_array($pos, &[
            $(
                $byte as $crate::memory::Byte,
            )+
        ])
    };
}

#[cfg(test)]
mod tests {
    use crate::instruction::Instruction;
    use crate::registers::Register;

    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_new_rejects_invalid_sizes() {
        assert_eq!(Memory::new(0), Err(MemoryError::InvalidSize(0)));
        assert_eq!(Memory::new(1), Err(MemoryError::InvalidSize(1)));
        assert_eq!(
            Memory::new(MAX_MEMORY_SIZE + 1),
            Err(MemoryError::InvalidSize(MAX_MEMORY_SIZE + 1))
        );
        assert!(Memory::new(MAX_MEMORY_SIZE).is_ok());
    }

    #[test]
    fn test_read_byte() -> Result<()> {
        let mut mem = Memory::default();
        mem.data[0x2] = 0x12;
        assert_eq!(mem.read_byte(0x2)?, 0x12);

        Ok(())
    }

    #[test]
    fn test_write_byte() -> Result<()> {
        let mut mem = Memory::default();
        mem.write_byte(0x44, 12)?;
        assert_eq!(mem.data[0x44], 12);

        Ok(())
    }

    #[test]
    fn test_read_word() -> Result<()> {
        let mut mem = Memory::default();
        mem.data[0] = 0x12;
        mem.data[1] = 0x34;
        assert_eq!(mem.read_word(0)?, 0x1234); // big endian

        Ok(())
    }

    #[test]
    fn test_write_word() -> Result<()> {
        let mut mem = Memory::default();
        mem.write_word(0x44, 0x1234)?;
        assert_eq!(mem.data[0x44], 0x12); // big endian
        assert_eq!(mem.data[0x45], 0x34);

        Ok(())
    }

    #[test]
    fn test_word_at_last_address_is_out_of_bounds() -> Result<()> {
        let mut mem = Memory::new(16)?;
        assert_eq!(
            mem.read_word(15),
            Err(MemoryError::OutOfBounds {
                address: 15,
                width: 2,
                len: 16
            })
        );
        assert!(mem.write_word(15, 0xBEEF).is_err());
        assert_eq!(mem.data[15], 0);
        assert!(mem.read_byte(16).is_err());
        mem.write_word(14, 0xBEEF)?;
        assert_eq!(mem.read_word(14)?, 0xBEEF);

        Ok(())
    }

    #[test]
    fn test_read_past_end_of_full_memory() {
        let mem = Memory::default();
        assert!(mem.read_byte(0xFFFF).is_ok());
        assert!(mem.read_word(0xFFFF).is_err());
    }

    #[test]
    fn test_write_array() -> Result<()> {
        let mut mem = Memory::default();
        mem.write_array(0x44, &[0x12, 0x34, 0x56, 0x78])?;
        assert_eq!(mem.read_slice(0x44, 4)?, &[0x12, 0x34, 0x56, 0x78]);

        Ok(())
    }

    #[test]
    fn test_write_array_does_not_write_partially() -> Result<()> {
        let mut mem = Memory::new(8)?;
        assert!(mem.write_array(6, &[1, 2, 3]).is_err());
        assert_eq!(mem.as_slice(), &[0; 8]);

        Ok(())
    }

    #[test]
    fn test_write_instructions() -> Result<()> {
        let mut mem = Memory::default();

        mem.write_array(
            0x0000,
            &[
                Instruction::MOV_LIT_REG as Byte,
                0x12,
                0x34,
                Register::R1 as Byte,
                Instruction::HLT as Byte,
            ],
        )?;

        let mut mem2 = Memory::default();
        use crate::instruction::Instruction::*;
        use crate::registers::Register::*;
        write_instructions!(mem2 : 0x0000 => MOV_LIT_REG, 0x12, 0x34, R1, HLT)?;

        assert_eq!(mem, mem2);

        Ok(())
    }
}
