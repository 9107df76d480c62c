use color_eyre::eyre::Result;

use cpu16::config::{MachineConfig, OperandResolution};
use cpu16::processor::Processor;
use cpu16::write_instructions;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

/// The subroutine adds r1 and r2 and stores the sum here
const RESULT: u16 = 0x0300;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().with_level(LevelFilter::Trace).init()?; // logging

    let config = MachineConfig::default()
        .with_memory_size(0x1000)
        .with_operand_resolution(OperandResolution::Strict);
    let (mut cpu, mut mem) = Processor::from_config(&config)?;

    use cpu16::instruction::Instruction::*;
    use cpu16::registers::Register::*;
    write_instructions!(mem : 0x0000 =>
        MOV_LIT_REG, 0x12, 0x00, R1,
        MOV_LIT_REG, 0x00, 0x34, R2,
        CAL_LIT, 0x01, 0x00,
        MOV_MEM_REG, 0x03, 0x00, R3,
        HLT
    )?;
    // r1 and r2 are clobbered here and restored by RET; acc is not part of the frame
    write_instructions!(mem : 0x0100 =>
        ADD_REG_REG, R1, R2,
        MOV_REG_MEM, Acc, 0x03, 0x00,
        MOV_LIT_REG, 0x00, 0x00, R1,
        RET
    )?;

    let steps = cpu.run_until_halt(&mut mem)?;
    cpu.debug(&mem);

    info!(
        "{} steps, result: 0x{:04X}, r1 after return: 0x{:04X}",
        steps,
        mem.read_word(RESULT)?,
        cpu.get_register("r1")?
    );

    Ok(())
}
