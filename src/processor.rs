use std::convert::TryFrom;

use crate::config::{MachineConfig, OperandResolution};
use crate::instruction::{Instruction, Operation};
use crate::memory::{Byte, Memory, MemoryError, Word, MAX_MEMORY_SIZE};
use crate::registers::{Register, RegisterError, RegisterFile};
use log::*;
use thiserror::Error;

/// Bytes pushed by a call: r1..r8, the return address and the frame size
pub const FRAME_SIZE: usize = 20;

/// Errors that can occur while stepping the processor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error("invalid opcode 0x{opcode:02X} at 0x{address:04X}")]
    InvalidOpcode { opcode: Byte, address: Word },
    #[error("stack overflow: sp 0x{sp:04X} has no room for {needed} bytes")]
    StackOverflow { sp: Word, needed: usize },
    #[error("stack underflow: nothing to pop above sp 0x{sp:04X}")]
    StackUnderflow { sp: Word },
    #[error("processor is halted")]
    Halted,
    #[error("memory of {actual} bytes, processor was built for {expected}")]
    MemoryMismatch { expected: usize, actual: usize },
}

/// Reads the instruction stream from a private copy of `ip`. The processor
/// only sees the new `ip` once the cursor is committed.
struct Cursor<'a> {
    memory: &'a Memory,
    ip: usize,
    resolution: OperandResolution,
}

impl<'a> Cursor<'a> {
    fn new(memory: &'a Memory, ip: Word, resolution: OperandResolution) -> Self {
        Self {
            memory,
            ip: ip as usize,
            resolution,
        }
    }

    /// Current position as a 16-bit address
    fn address(&self, width: usize) -> Result<Word, MemoryError> {
        Word::try_from(self.ip).map_err(|_| MemoryError::OutOfBounds {
            address: self.ip,
            width,
            len: self.memory.len(),
        })
    }

    fn fetch(&mut self) -> Result<Byte, CpuError> {
        let byte = self.memory.read_byte(self.address(1)?)?;
        self.ip += 1;
        Ok(byte)
    }

    fn fetch16(&mut self) -> Result<Word, CpuError> {
        let word = self.memory.read_word(self.address(2)?)?;
        self.ip += 2;
        Ok(word)
    }

    fn fetch_register(&mut self) -> Result<Register, CpuError> {
        let operand = self.fetch()?;
        match self.resolution {
            OperandResolution::Strict => Ok(Register::from_operand(operand)?),
            OperandResolution::Wrapping => Ok(Register::from_operand_wrapping(operand)),
        }
    }

    fn decode(&mut self) -> Result<Operation, CpuError> {
        let address = self.address(1)?;
        let opcode = self.fetch()?;
        let instruction = Instruction::try_from(opcode)
            .map_err(|_| CpuError::InvalidOpcode { opcode, address })?;

        let operation = match instruction {
            Instruction::MOV_LIT_REG => Operation::MovLitReg {
                literal: self.fetch16()?,
                dest: self.fetch_register()?,
            },
            Instruction::MOV_REG_REG => Operation::MovRegReg {
                src: self.fetch_register()?,
                dest: self.fetch_register()?,
            },
            Instruction::MOV_REG_MEM => Operation::MovRegMem {
                src: self.fetch_register()?,
                address: self.fetch16()?,
            },
            Instruction::MOV_MEM_REG => Operation::MovMemReg {
                address: self.fetch16()?,
                dest: self.fetch_register()?,
            },
            Instruction::ADD_REG_REG => Operation::AddRegReg {
                lhs: self.fetch_register()?,
                rhs: self.fetch_register()?,
            },
            Instruction::JMP_NOT_EQ => Operation::JmpNotEq {
                literal: self.fetch16()?,
                address: self.fetch16()?,
            },
            Instruction::PSH_LIT => Operation::PshLit {
                literal: self.fetch16()?,
            },
            Instruction::PSH_REG => Operation::PshReg {
                src: self.fetch_register()?,
            },
            Instruction::POP => Operation::Pop {
                dest: self.fetch_register()?,
            },
            Instruction::CAL_LIT => Operation::CalLit {
                address: self.fetch16()?,
            },
            Instruction::CAL_REG => Operation::CalReg {
                target: self.fetch_register()?,
            },
            Instruction::RET => Operation::Ret,
            Instruction::HLT => Operation::Hlt,
        };

        Ok(operation)
    }
}

/// Emulates the CPU. Memory is not owned: it is handed to every call that
/// needs it, so a loader can fill it between steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Processor {
    registers: RegisterFile,
    /// Bytes pushed since the last call frame was saved
    stack_frame_size: Word,
    operand_resolution: OperandResolution,
    /// Length of the memory `sp` and `fp` were placed in
    memory_len: usize,
    /// Termination flag. Set by HLT
    halted: bool,
}

impl Processor {
    /// Initializes a new CPU for `memory`, with `ip` at 0 and the stack
    /// starting one word below the top of memory
    pub fn new(memory: &Memory) -> Self {
        Self::with_operand_resolution(memory, OperandResolution::default())
    }

    pub fn with_operand_resolution(memory: &Memory, operand_resolution: OperandResolution) -> Self {
        Self {
            registers: RegisterFile::new(memory.len()),
            stack_frame_size: 0,
            operand_resolution,
            memory_len: memory.len(),
            halted: false,
        }
    }

    /// Allocates the configured memory together with a processor for it
    pub fn from_config(config: &MachineConfig) -> Result<(Self, Memory), MemoryError> {
        let memory = config.memory()?;
        let processor = Self::with_operand_resolution(&memory, config.operand_resolution);
        Ok((processor, memory))
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// Reads a register by name
    pub fn get_register(&self, name: &str) -> Result<Word, RegisterError> {
        self.registers.get_by_name(name)
    }

    /// Writes a register by name
    pub fn set_register(&mut self, name: &str, value: Word) -> Result<(), RegisterError> {
        self.registers.set_by_name(name, value)
    }

    pub fn stack_frame_size(&self) -> Word {
        self.stack_frame_size
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn cursor<'a>(&self, memory: &'a Memory) -> Cursor<'a> {
        Cursor::new(memory, self.registers.get(Register::Ip), self.operand_resolution)
    }

    /// `ip` is a 16-bit register: past the last byte it wraps to 0, and
    /// any out of range access is left to the next fetch
    fn commit(&mut self, cursor: &Cursor<'_>) {
        self.registers
            .set(Register::Ip, (cursor.ip % MAX_MEMORY_SIZE) as Word);
    }

    /// Reads the byte at `ip` and advances `ip` by one
    pub fn fetch(&mut self, memory: &Memory) -> Result<Byte, CpuError> {
        let mut cursor = self.cursor(memory);
        let byte = cursor.fetch()?;
        self.commit(&cursor);
        Ok(byte)
    }

    /// Reads the word at `ip` and advances `ip` by two
    pub fn fetch16(&mut self, memory: &Memory) -> Result<Word, CpuError> {
        let mut cursor = self.cursor(memory);
        let word = cursor.fetch16()?;
        self.commit(&cursor);
        Ok(word)
    }

    /// Consumes a register operand and returns the register's byte offset
    pub fn fetch_register_index(&mut self, memory: &Memory) -> Result<usize, CpuError> {
        let mut cursor = self.cursor(memory);
        let register = cursor.fetch_register()?;
        self.commit(&cursor);
        Ok(register.offset())
    }

    /// Decodes the instruction at `ip` without changing any state
    pub fn decode(&self, memory: &Memory) -> Result<Operation, CpuError> {
        self.cursor(memory).decode()
    }

    /// Writes `value` at `sp` and moves `sp` one word down
    pub fn push(&mut self, memory: &mut Memory, value: Word) -> Result<(), CpuError> {
        let sp = self.registers.get(Register::Sp);
        if sp < 2 {
            return Err(CpuError::StackOverflow { sp, needed: 2 });
        }

        memory.write_word(sp, value)?;
        self.registers.set(Register::Sp, sp - 2);
        self.stack_frame_size = self.stack_frame_size.wrapping_add(2);

        trace!("PUSH 0x{:04X} @ 0x{:04X}", value, sp);
        Ok(())
    }

    /// Moves `sp` one word up and returns the word found there
    pub fn pop(&mut self, memory: &Memory) -> Result<Word, CpuError> {
        let sp = self.registers.get(Register::Sp);
        let next = sp as usize + 2;
        if next + 2 > memory.len() {
            return Err(CpuError::StackUnderflow { sp });
        }

        let next = next as Word;
        let value = memory.read_word(next)?;
        self.registers.set(Register::Sp, next);
        self.stack_frame_size = self.stack_frame_size.wrapping_sub(2);

        trace!("POP 0x{:04X} @ 0x{:04X}", value, next);
        Ok(value)
    }

    /// Saves a call frame: r1..r8, `ip` and the frame size. The frame
    /// pointer then marks the new frame.
    pub fn push_state(&mut self, memory: &mut Memory) -> Result<(), CpuError> {
        let sp = self.registers.get(Register::Sp);
        if (sp as usize) < FRAME_SIZE {
            return Err(CpuError::StackOverflow {
                sp,
                needed: FRAME_SIZE,
            });
        }

        for register in Register::GENERAL.iter() {
            let value = self.registers.get(*register);
            self.push(memory, value)?;
        }
        let ip = self.registers.get(Register::Ip);
        self.push(memory, ip)?;
        let frame_size = self.stack_frame_size.wrapping_add(2);
        self.push(memory, frame_size)?;

        let sp = self.registers.get(Register::Sp);
        self.registers.set(Register::Fp, sp);
        self.stack_frame_size = 0;

        debug!("frame saved @ 0x{:04X} (size {})", sp, frame_size);
        Ok(())
    }

    /// Unwinds the frame saved by [`Processor::push_state`], restoring the
    /// caller's registers, `ip`, `sp`, `fp` and running frame size
    pub fn pop_state(&mut self, memory: &Memory) -> Result<(), CpuError> {
        let frame_base = self.registers.get(Register::Fp);
        if frame_base as usize + 2 + FRAME_SIZE > memory.len() {
            return Err(CpuError::StackUnderflow { sp: frame_base });
        }

        self.registers.set(Register::Sp, frame_base);
        let frame_size = self.pop(memory)?;
        // the size word counted itself
        self.stack_frame_size = frame_size.wrapping_sub(2);

        let ip = self.pop(memory)?;
        self.registers.set(Register::Ip, ip);
        for register in Register::GENERAL.iter().rev() {
            let value = self.pop(memory)?;
            self.registers.set(*register, value);
        }

        self.registers
            .set(Register::Fp, frame_base.wrapping_add(frame_size));

        debug!("frame restored, returning to 0x{:04X}", ip);
        Ok(())
    }

    /// Executes a single decoded operation. `ip` must already point past it.
    pub fn execute_operation(
        &mut self,
        operation: Operation,
        memory: &mut Memory,
    ) -> Result<(), CpuError> {
        match operation {
            Operation::MovLitReg { literal, dest } => {
                self.registers.set(dest, literal);
            }
            Operation::MovRegReg { src, dest } => {
                let value = self.registers.get(src);
                self.registers.set(dest, value);
            }
            Operation::MovRegMem { src, address } => {
                memory.write_word(address, self.registers.get(src))?;
            }
            Operation::MovMemReg { address, dest } => {
                let value = memory.read_word(address)?;
                self.registers.set(dest, value);
            }
            Operation::AddRegReg { lhs, rhs } => {
                let result = self
                    .registers
                    .get(lhs)
                    .wrapping_add(self.registers.get(rhs));
                self.registers.set(Register::Acc, result);
            }
            Operation::JmpNotEq { literal, address } => {
                if literal != self.registers.get(Register::Acc) {
                    self.registers.set(Register::Ip, address);
                }
            }
            Operation::PshLit { literal } => {
                self.push(memory, literal)?;
            }
            Operation::PshReg { src } => {
                let value = self.registers.get(src);
                self.push(memory, value)?;
            }
            Operation::Pop { dest } => {
                let value = self.pop(memory)?;
                self.registers.set(dest, value);
            }
            Operation::CalLit { address } => {
                self.push_state(memory)?;
                self.registers.set(Register::Ip, address);
            }
            Operation::CalReg { target } => {
                let address = self.registers.get(target);
                self.push_state(memory)?;
                self.registers.set(Register::Ip, address);
            }
            Operation::Ret => {
                self.pop_state(memory)?;
            }
            Operation::Hlt => {
                self.halted = true; // set termination flag
            }
        }

        debug!("{}", operation);
        Ok(())
    }

    /// Runs one fetch-decode-execute cycle and returns the executed operation.
    ///
    /// # Errors
    ///
    /// A decode failure leaves `ip` at the failing opcode. An execution
    /// failure leaves `ip` past the instruction, with registers and memory
    /// untouched by it. `memory` must have the length the processor was
    /// built for, otherwise [`CpuError::MemoryMismatch`] is returned.
    pub fn step(&mut self, memory: &mut Memory) -> Result<Operation, CpuError> {
        if self.halted {
            return Err(CpuError::Halted);
        }
        if memory.len() != self.memory_len {
            return Err(CpuError::MemoryMismatch {
                expected: self.memory_len,
                actual: memory.len(),
            });
        }

        let mut cursor = self.cursor(memory);
        let operation = cursor.decode()?;
        self.commit(&cursor);

        let registers = self.registers;
        let stack_frame_size = self.stack_frame_size;
        if let Err(err) = self.execute_operation(operation, memory) {
            self.registers = registers;
            self.stack_frame_size = stack_frame_size;
            warn!("{} failed: {}", operation, err);
            return Err(err);
        }

        Ok(operation)
    }

    /// Runs until HLT and returns the number of executed instructions
    pub fn run_until_halt(&mut self, memory: &mut Memory) -> Result<usize, CpuError> {
        let mut steps = 0;
        while !self.halted {
            self.step(memory)?;
            steps += 1;
        }

        info!(
            "Program halted after {} steps. acc: 0x{:04X}",
            steps,
            self.registers.get(Register::Acc)
        );

        Ok(steps)
    }
}
