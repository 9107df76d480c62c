use crate::memory::{Memory, MemoryError, MAX_MEMORY_SIZE};

/// How register operand bytes outside the register set are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandResolution {
    /// Reject the byte with `RegisterError::InvalidOperand`
    Strict,
    /// Take the byte modulo the register count, aliasing it onto a valid register
    Wrapping,
}

impl Default for OperandResolution {
    fn default() -> Self {
        Self::Strict
    }
}

/// Construction parameters of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MachineConfig {
    /// Total addressable space in bytes
    pub memory_size: usize,
    pub operand_resolution: OperandResolution,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: MAX_MEMORY_SIZE,
            operand_resolution: OperandResolution::default(),
        }
    }
}

impl MachineConfig {
    pub fn with_memory_size(mut self, memory_size: usize) -> Self {
        self.memory_size = memory_size;
        self
    }

    pub fn with_operand_resolution(mut self, operand_resolution: OperandResolution) -> Self {
        self.operand_resolution = operand_resolution;
        self
    }

    /// Allocates a zeroed memory of the configured size
    pub fn memory(&self) -> Result<Memory, MemoryError> {
        Memory::new(self.memory_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_default_config() {
        let config = MachineConfig::default();
        assert_eq!(config.memory_size, 0x1_0000);
        assert_eq!(config.operand_resolution, OperandResolution::Strict);
    }

    #[test]
    fn test_memory_follows_config() -> Result<()> {
        let memory = MachineConfig::default().with_memory_size(256).memory()?;
        assert_eq!(memory.len(), 256);

        assert_eq!(
            MachineConfig::default().with_memory_size(0).memory(),
            Err(MemoryError::InvalidSize(0))
        );

        Ok(())
    }
}
