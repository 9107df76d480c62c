use color_eyre::eyre::Result;

use cpu16::config::MachineConfig;
use cpu16::processor::Processor;
use cpu16::write_instructions;
use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Counts `acc` down from 10 to 0 by adding 0xFFFF until JMP_NOT_EQ falls through
fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().with_level(LevelFilter::Debug).init()?; // logging

    let (mut cpu, mut mem) = Processor::from_config(&MachineConfig::default())?;

    use cpu16::instruction::Instruction::*;
    use cpu16::registers::Register::*;
    write_instructions!(mem : 0x0000 =>
        MOV_LIT_REG, 0x00, 0x0A, Acc,
        MOV_LIT_REG, 0xFF, 0xFF, R1,
        ADD_REG_REG, Acc, R1,
        JMP_NOT_EQ, 0x00, 0x00, 0x00, 0x08,
        HLT
    )?;

    cpu.run_until_halt(&mut mem)?;

    Ok(())
}
