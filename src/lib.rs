//! A tiny 16-bit von-Neumann machine: flat byte memory, twelve 16-bit
//! registers and a byte-encoded instruction set interpreted one step at a time.

pub mod config;
pub mod inspect;
pub mod instruction;
pub mod memory;
pub mod processor;
pub mod registers;

pub use config::{MachineConfig, OperandResolution};
pub use inspect::{MemoryWindow, RegisterDump};
pub use instruction::{Instruction, OperandKind, Operation};
pub use memory::{Byte, Memory, MemoryError, Word};
pub use processor::{CpuError, Processor};
pub use registers::{Register, RegisterError, RegisterFile};
