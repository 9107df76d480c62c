use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

use crate::memory::{Byte, Word};

/// Errors raised when naming or decoding a register
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("no such register '{0}'")]
    UnknownRegister(String),
    #[error("invalid register operand 0x{0:02X}")]
    InvalidOperand(Byte),
}

macro_rules! registers {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal => $label:literal , )+ ) => {
        /// The fixed register set, in declaration order.
        /// The discriminant is the index used by register operands.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Register {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Register {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => $label , )+
                }
            }
        }

        impl FromStr for Register {
            type Err = RegisterError;

            fn from_str(name: &str) -> Result<Self, Self::Err> {
                match name {
                    $( $label => Ok(Self::$name) , )+
                    _ => Err(RegisterError::UnknownRegister(name.to_string())),
                }
            }
        }
    }
}

registers! {
    /// Instruction pointer
    Ip = 0 => "ip",
    /// Accumulator, receives arithmetic results
    Acc = 1 => "acc",
    /// General purpose
    R1 = 2 => "r1",
    /// General purpose
    R2 = 3 => "r2",
    /// General purpose
    R3 = 4 => "r3",
    /// General purpose
    R4 = 5 => "r4",
    /// General purpose
    R5 = 6 => "r5",
    /// General purpose
    R6 = 7 => "r6",
    /// General purpose
    R7 = 8 => "r7",
    /// General purpose
    R8 = 9 => "r8",
    /// Stack pointer, the stack grows towards address 0
    Sp = 10 => "sp",
    /// Frame pointer, base of the current call frame
    Fp = 11 => "fp",
}

/// Number of registers in the file
pub const REGISTER_COUNT: usize = 12;
/// Size of the register block in bytes
pub const REGISTER_FILE_SIZE: usize = REGISTER_COUNT * 2;

impl Register {
    /// The general purpose registers saved in a call frame, in push order
    pub const GENERAL: [Register; 8] = [
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
        Register::R8,
    ];

    /// Position in the declaration order
    pub fn index(self) -> usize {
        u8::from(self) as usize
    }

    /// Byte offset of the register inside the register block
    pub fn offset(self) -> usize {
        self.index() * 2
    }

    /// Resolves a raw operand byte, rejecting bytes that name no register
    pub fn from_operand(operand: Byte) -> Result<Self, RegisterError> {
        Register::try_from(operand).map_err(|_| RegisterError::InvalidOperand(operand))
    }

    /// Resolves a raw operand byte modulo the register count. Any byte maps
    /// to some register, so invalid operands alias valid ones.
    pub fn from_operand_wrapping(operand: Byte) -> Self {
        Register::ALL[operand as usize % REGISTER_COUNT]
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Twelve 16-bit registers stored big endian in a dedicated byte block,
/// two bytes per register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterFile {
    data: [Byte; REGISTER_FILE_SIZE],
}

impl Default for RegisterFile {
    fn default() -> Self {
        RegisterFile {
            data: [0; REGISTER_FILE_SIZE],
        }
    }
}

impl RegisterFile {
    /// Creates a register file with `sp` and `fp` one word below the top of
    /// a memory of `memory_len` bytes. Everything else starts at zero.
    pub fn new(memory_len: usize) -> Self {
        let mut registers = RegisterFile::default();
        let stack_base = memory_len.saturating_sub(2) as Word;
        registers.set(Register::Sp, stack_base);
        registers.set(Register::Fp, stack_base);
        registers
    }

    pub fn get(&self, register: Register) -> Word {
        let offset = register.offset();
        Word::from_be_bytes([self.data[offset], self.data[offset + 1]])
    }

    pub fn set(&mut self, register: Register, value: Word) {
        let offset = register.offset();
        self.data[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Reads a register by its symbolic name
    pub fn get_by_name(&self, name: &str) -> Result<Word, RegisterError> {
        Ok(self.get(name.parse()?))
    }

    /// Writes a register by its symbolic name
    pub fn set_by_name(&mut self, name: &str, value: Word) -> Result<(), RegisterError> {
        self.set(name.parse()?, value);
        Ok(())
    }

    /// Raw view of the register block
    pub fn as_bytes(&self) -> &[Byte] {
        &self.data
    }
}
