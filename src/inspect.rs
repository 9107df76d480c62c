//! Read-only views of the machine state for debug front ends.

use std::fmt;

use log::*;

use crate::memory::{Byte, Memory, MemoryError, Word};
use crate::processor::Processor;
use crate::registers::Register;

/// Bytes shown by [`Processor::view_memory_at`]
pub const DEFAULT_WINDOW: usize = 8;

/// Every register with its value, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDump(pub Vec<(&'static str, Word)>);

impl fmt::Display for RegisterDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.0 {
            writeln!(f, "{}: 0x{:04x}", name, value)?;
        }
        Ok(())
    }
}

/// A run of bytes starting at `address`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryWindow {
    pub address: Word,
    pub bytes: Vec<Byte>,
}

impl fmt::Display for MemoryWindow {
    // 0x0f01: 0x04 0x05 0xa3 0xfe 0x13 0x0d 0x44 0x0f
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}:", self.address)?;
        for byte in &self.bytes {
            write!(f, " 0x{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Processor {
    pub fn dump_registers(&self) -> RegisterDump {
        RegisterDump(
            Register::ALL
                .iter()
                .map(|register| (register.name(), self.registers().get(*register)))
                .collect(),
        )
    }

    /// Copies `length` bytes starting at `address`
    pub fn dump_memory_window(
        &self,
        memory: &Memory,
        address: Word,
        length: usize,
    ) -> Result<MemoryWindow, MemoryError> {
        Ok(MemoryWindow {
            address,
            bytes: memory.read_slice(address, length)?.to_vec(),
        })
    }

    /// The eight bytes starting at `address`
    pub fn view_memory_at(&self, memory: &Memory, address: Word) -> Result<MemoryWindow, MemoryError> {
        self.dump_memory_window(memory, address, DEFAULT_WINDOW)
    }

    /// Logs the registers, the bytes at `ip` and the top of the stack
    pub fn debug(&self, memory: &Memory) {
        debug!("\n{}", self.dump_registers());

        let ip = self.registers().get(Register::Ip);
        match self.view_memory_at(memory, ip) {
            Ok(window) => debug!("{}", window),
            Err(err) => debug!("ip: {}", err),
        }

        let sp = self.registers().get(Register::Sp);
        let top = sp.saturating_sub(DEFAULT_WINDOW as Word - 2);
        match self.view_memory_at(memory, top) {
            Ok(window) => debug!("{}", window),
            Err(err) => debug!("sp: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write_instructions;
    use color_eyre::eyre::Result;

    #[test]
    fn test_dump_registers_order() {
        let mem = Memory::default();
        let cpu = Processor::new(&mem);

        let dump = cpu.dump_registers();
        let names: Vec<_> = dump.0.iter().map(|(name, _)| *name).collect();

        assert_eq!(
            names,
            vec!["ip", "acc", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "sp", "fp"]
        );
        assert_eq!(dump.0[10], ("sp", 0xFFFE));
    }

    #[test]
    fn test_register_dump_format() {
        let dump = RegisterDump(vec![("ip", 0x0004), ("acc", 0xBEEF)]);
        assert_eq!(dump.to_string(), "ip: 0x0004\nacc: 0xbeef\n");
    }

    #[test]
    fn test_memory_window() -> Result<()> {
        let mut mem = Memory::default();
        let cpu = Processor::new(&mem);
        write_instructions!(mem : 0x0100 => 0x01, 0x00)?;

        let window = cpu.view_memory_at(&mem, 0x0100)?;

        assert_eq!(window.bytes, vec![0x01, 0x00, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            window.to_string(),
            "0x0100: 0x01 0x00 0x00 0x00 0x00 0x00 0x00 0x00"
        );
        assert_eq!(cpu.dump_memory_window(&mem, 0x0100, 2)?.bytes, vec![0x01, 0x00]);

        Ok(())
    }

    #[test]
    fn test_memory_window_out_of_bounds() {
        let mem = Memory::default();
        let cpu = Processor::new(&mem);

        assert!(cpu.view_memory_at(&mem, 0xFFFC).is_err());
        assert!(cpu.dump_memory_window(&mem, 0xFFFC, 4).is_ok());
    }

    #[test]
    fn test_inspection_has_no_side_effects() -> Result<()> {
        let mem = Memory::default();
        let cpu = Processor::new(&mem);
        let before = cpu.clone();

        cpu.dump_registers();
        cpu.view_memory_at(&mem, 0)?;
        cpu.debug(&mem);

        assert_eq!(cpu, before);

        Ok(())
    }
}
