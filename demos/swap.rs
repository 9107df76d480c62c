use color_eyre::eyre::Result;

use cpu16::memory::Memory;
use cpu16::processor::Processor;
use cpu16::registers::Register;
use cpu16::write_instructions;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

/// Swaps two registers through the stack, printing the machine after every step
fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().with_level(LevelFilter::Debug).init()?; // logging

    let mut mem = Memory::new(256 * 256)?;
    let mut cpu = Processor::new(&mem);

    use cpu16::instruction::Instruction::*;
    use cpu16::registers::Register::*;
    write_instructions!(mem : 0x0000 =>
        MOV_LIT_REG, 0x51, 0x51, R1,
        MOV_LIT_REG, 0x42, 0x42, R2,
        PSH_REG, R1,
        PSH_REG, R2,
        POP, R1,
        POP, R2
    )?;

    cpu.debug(&mem);
    for _ in 0..6 {
        cpu.step(&mut mem)?;
        print!("{}", cpu.dump_registers());
        println!("{}", cpu.view_memory_at(&mem, cpu.registers().get(Register::Ip))?);
        println!("{}", cpu.view_memory_at(&mem, 0xFFFF - 1 - 6)?);
        println!();
    }

    info!(
        "r1: 0x{:04X}, r2: 0x{:04X}",
        cpu.get_register("r1")?,
        cpu.get_register("r2")?
    );

    Ok(())
}
