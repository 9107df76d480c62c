use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::memory::{Byte, Word};
use crate::registers::Register;

/// Shape of a single operand in the encoded instruction stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// 16-bit big endian literal
    Literal,
    /// 16-bit big endian memory address
    Address,
    /// One byte naming a register
    Register,
}

impl OperandKind {
    /// Encoded width in bytes
    pub fn width(&self) -> usize {
        match self {
            OperandKind::Literal | OperandKind::Address => 2,
            OperandKind::Register => 1,
        }
    }
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal [ $( $operand:ident ),* ] , )+ ) => {
        /// Defines the instructions and their opcode bytes
        #[allow(non_camel_case_types)]
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }

            /// Operands following the opcode, in encoding order
            pub fn operands(&self) -> &'static [OperandKind] {
                match self {
                    $( Self::$name => &[ $( OperandKind::$operand ),* ] , )+
                }
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }
    }
}

instructions! {
    /// Move a literal into a register
    MOV_LIT_REG = 0x10 [Literal, Register],
    /// Copy a register into another register
    MOV_REG_REG = 0x11 [Register, Register],
    /// Store a register as a word in memory
    MOV_REG_MEM = 0x12 [Register, Address],
    /// Load a word from memory into a register
    MOV_MEM_REG = 0x13 [Address, Register],
    /// Add two registers into `acc`, wrapping at 16 bits
    ADD_REG_REG = 0x14 [Register, Register],
    /// Jump to the address if the literal differs from `acc`
    JMP_NOT_EQ = 0x15 [Literal, Address],
    /// Push a literal onto the stack
    PSH_LIT = 0x17 [Literal],
    /// Push a register onto the stack
    PSH_REG = 0x18 [Register],
    /// Pop the top of the stack into a register
    POP = 0x1A [Register],
    /// Save the call frame and jump to a literal address
    CAL_LIT = 0x5E [Address],
    /// Save the call frame and jump to the address held in a register
    CAL_REG = 0x5F [Register],
    /// Unwind the current call frame
    RET = 0x60 [],
    /// Stop the execution of the program
    HLT = 0xFF [],
}

impl Instruction {
    /// Encoded length including the opcode byte
    pub fn size(&self) -> usize {
        1 + self
            .operands()
            .iter()
            .map(OperandKind::width)
            .sum::<usize>()
    }
}

/// A fully decoded instruction with its operands resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    MovLitReg { literal: Word, dest: Register },
    MovRegReg { src: Register, dest: Register },
    MovRegMem { src: Register, address: Word },
    MovMemReg { address: Word, dest: Register },
    AddRegReg { lhs: Register, rhs: Register },
    JmpNotEq { literal: Word, address: Word },
    PshLit { literal: Word },
    PshReg { src: Register },
    Pop { dest: Register },
    CalLit { address: Word },
    CalReg { target: Register },
    Ret,
    Hlt,
}

impl Operation {
    pub fn instruction(&self) -> Instruction {
        match self {
            Operation::MovLitReg { .. } => Instruction::MOV_LIT_REG,
            Operation::MovRegReg { .. } => Instruction::MOV_REG_REG,
            Operation::MovRegMem { .. } => Instruction::MOV_REG_MEM,
            Operation::MovMemReg { .. } => Instruction::MOV_MEM_REG,
            Operation::AddRegReg { .. } => Instruction::ADD_REG_REG,
            Operation::JmpNotEq { .. } => Instruction::JMP_NOT_EQ,
            Operation::PshLit { .. } => Instruction::PSH_LIT,
            Operation::PshReg { .. } => Instruction::PSH_REG,
            Operation::Pop { .. } => Instruction::POP,
            Operation::CalLit { .. } => Instruction::CAL_LIT,
            Operation::CalReg { .. } => Instruction::CAL_REG,
            Operation::Ret => Instruction::RET,
            Operation::Hlt => Instruction::HLT,
        }
    }

    /// Encodes the operation into its byte form
    pub fn encode(&self) -> Vec<Byte> {
        let mut bytes = Vec::with_capacity(self.instruction().size());
        bytes.push(self.instruction().into());

        match *self {
            Operation::MovLitReg { literal, dest } => {
                push_word(&mut bytes, literal);
                bytes.push(dest.into());
            }
            Operation::MovRegReg { src, dest } => {
                bytes.push(src.into());
                bytes.push(dest.into());
            }
            Operation::MovRegMem { src, address } => {
                bytes.push(src.into());
                push_word(&mut bytes, address);
            }
            Operation::MovMemReg { address, dest } => {
                push_word(&mut bytes, address);
                bytes.push(dest.into());
            }
            Operation::AddRegReg { lhs, rhs } => {
                bytes.push(lhs.into());
                bytes.push(rhs.into());
            }
            Operation::JmpNotEq { literal, address } => {
                push_word(&mut bytes, literal);
                push_word(&mut bytes, address);
            }
            Operation::PshLit { literal } => push_word(&mut bytes, literal),
            Operation::PshReg { src } => bytes.push(src.into()),
            Operation::Pop { dest } => bytes.push(dest.into()),
            Operation::CalLit { address } => push_word(&mut bytes, address),
            Operation::CalReg { target } => bytes.push(target.into()),
            Operation::Ret | Operation::Hlt => {}
        }

        bytes
    }
}

fn push_word(bytes: &mut Vec<Byte>, value: Word) {
    bytes.extend_from_slice(&value.to_be_bytes());
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instruction())?;
        match *self {
            Operation::MovLitReg { literal, dest } => write!(f, " 0x{:04X}, {}", literal, dest),
            Operation::MovRegReg { src, dest } => write!(f, " {}, {}", src, dest),
            Operation::MovRegMem { src, address } => write!(f, " {}, [0x{:04X}]", src, address),
            Operation::MovMemReg { address, dest } => write!(f, " [0x{:04X}], {}", address, dest),
            Operation::AddRegReg { lhs, rhs } => write!(f, " {}, {}", lhs, rhs),
            Operation::JmpNotEq { literal, address } => {
                write!(f, " 0x{:04X}, 0x{:04X}", literal, address)
            }
            Operation::PshLit { literal } => write!(f, " 0x{:04X}", literal),
            Operation::PshReg { src } => write!(f, " {}", src),
            Operation::Pop { dest } => write!(f, " {}", dest),
            Operation::CalLit { address } => write!(f, " 0x{:04X}", address),
            Operation::CalReg { target } => write!(f, " {}", target),
            Operation::Ret | Operation::Hlt => Ok(()),
        }
    }
}
