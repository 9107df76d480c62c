use color_eyre::eyre::Result;

use cpu16::instruction::Instruction::*;
use cpu16::registers::Register::*;
use cpu16::{write_instructions, CpuError, MachineConfig, Memory, MemoryError, Operation, Processor};

#[test]
fn swap_through_the_stack() -> Result<()> {
    let mut mem = Memory::new(256 * 256)?;
    let mut cpu = Processor::new(&mem);

    write_instructions!(mem : 0x0000 =>
        MOV_LIT_REG, 0x51, 0x51, R1,
        MOV_LIT_REG, 0x42, 0x42, R2,
        PSH_REG, R1,
        PSH_REG, R2,
        POP, R1,
        POP, R2
    )?;
    let initial_sp = cpu.registers().get(Sp);

    for _ in 0..6 {
        cpu.step(&mut mem)?;
    }

    assert_eq!(cpu.get_register("r1")?, 0x4242);
    assert_eq!(cpu.get_register("r2")?, 0x5151);
    assert_eq!(cpu.get_register("sp")?, initial_sp);
    assert_eq!(cpu.get_register("ip")?, 16);

    Ok(())
}

#[test]
fn push_literal_lands_below_top_of_memory() -> Result<()> {
    let mut mem = Memory::new(256 * 256)?;
    let mut cpu = Processor::new(&mem);

    write_instructions!(mem : 0x0000 => PSH_LIT, 0x52, 0x52)?;
    cpu.step(&mut mem)?;

    let window = cpu.view_memory_at(&mem, 0xFFF8)?;
    assert_eq!(
        window.to_string(),
        "0xfff8: 0x00 0x00 0x00 0x00 0x00 0x00 0x52 0x52"
    );

    Ok(())
}

#[test]
fn countdown_loop_runs_to_halt() -> Result<()> {
    let (mut cpu, mut mem) = Processor::from_config(&MachineConfig::default())?;

    // r1 = 0xFFFF acts as -1; loop until acc reaches zero
    write_instructions!(mem : 0x0000 =>
        MOV_LIT_REG, 0x00, 0x05, Acc,
        MOV_LIT_REG, 0xFF, 0xFF, R1,
        ADD_REG_REG, Acc, R1,
        JMP_NOT_EQ, 0x00, 0x00, 0x00, 0x08,
        HLT
    )?;

    let steps = cpu.run_until_halt(&mut mem)?;

    assert_eq!(cpu.registers().get(Acc), 0);
    assert_eq!(steps, 2 + 5 * 2 + 1);

    Ok(())
}

#[test]
fn nested_calls_unwind_in_order() -> Result<()> {
    let (mut cpu, mut mem) = Processor::from_config(&MachineConfig::default())?;

    write_instructions!(mem : 0x0000 =>
        MOV_LIT_REG, 0x00, 0x01, R1,
        CAL_LIT, 0x01, 0x00,
        HLT
    )?;
    write_instructions!(mem : 0x0100 =>
        MOV_LIT_REG, 0x00, 0x02, R1,
        PSH_LIT, 0xAA, 0xAA,
        CAL_LIT, 0x02, 0x00,
        POP, R2,
        MOV_REG_MEM, R2, 0x03, 0x00,
        RET
    )?;
    write_instructions!(mem : 0x0200 =>
        MOV_LIT_REG, 0x00, 0x03, R1,
        RET
    )?;

    cpu.run_until_halt(&mut mem)?;

    assert_eq!(cpu.registers().get(R1), 0x0001);
    // r2 is restored by the caller's frame, the popped value survives in memory
    assert_eq!(cpu.registers().get(R2), 0);
    assert_eq!(mem.read_word(0x0300)?, 0xAAAA);
    assert_eq!(cpu.registers().get(Sp), 0xFFFE);
    assert_eq!(cpu.registers().get(Fp), 0xFFFE);
    assert_eq!(cpu.stack_frame_size(), 0);

    Ok(())
}

#[test]
fn small_memory_places_stack_at_its_top() -> Result<()> {
    let config = MachineConfig::default().with_memory_size(64);
    let (mut cpu, mut mem) = Processor::from_config(&config)?;

    write_instructions!(mem : 0x0000 => PSH_LIT, 0x12, 0x34)?;
    cpu.step(&mut mem)?;

    assert_eq!(mem.read_word(62)?, 0x1234);
    assert_eq!(cpu.registers().get(Sp), 60);

    Ok(())
}

#[test]
fn running_off_the_end_of_memory_fails() -> Result<()> {
    let config = MachineConfig::default().with_memory_size(4);
    let (mut cpu, mut mem) = Processor::from_config(&config)?;

    write_instructions!(mem : 0x0000 => MOV_LIT_REG, 0x12, 0x34, R1)?;
    cpu.step(&mut mem)?;

    assert!(matches!(
        cpu.step(&mut mem),
        Err(CpuError::Memory(MemoryError::OutOfBounds { address: 4, .. }))
    ));

    Ok(())
}

#[test]
fn loader_can_feed_bytes_between_steps() -> Result<()> {
    let mut mem = Memory::default();
    let mut cpu = Processor::new(&mem);

    let program = [
        Operation::MovLitReg { literal: 0x0100, dest: R1 },
        Operation::MovRegMem { src: R1, address: 0x0100 },
        Operation::MovMemReg { address: 0x0100, dest: R7 },
    ];

    let mut position = 0;
    for operation in program.iter() {
        let bytes = operation.encode();
        mem.write_array(position, &bytes)?;
        position += bytes.len() as u16;

        assert_eq!(cpu.step(&mut mem)?, *operation);
    }

    assert_eq!(cpu.registers().get(R7), 0x0100);

    Ok(())
}
