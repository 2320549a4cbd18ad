//! Per-operation semantics of the emulator.
//!
//! Reference behavior: all arithmetic wraps modulo 256; stores suppress the
//! AC/OUT write-back but still write X/Y; the `[Y,X++]` mode increments X
//! even when the OUT write is suppressed; XOUT latches AC on the rising edge
//! of OUT bit 6.

use gtsim_core::config::{Config, IllegalPolicy};
use gtsim_core::isa::{BusSrc, Mode, Op};
use gtsim_core::{Machine, SimError};

use crate::common::program::Program;

fn run(program: Vec<u8>, steps: u64) -> Machine {
    let config = Config::default();
    let mut m = Machine::new(&config);
    m.load_program(&program, 0).unwrap();
    for _ in 0..steps {
        let _ = m.step().unwrap();
    }
    m
}

fn reg(m: &Machine, name: &str) -> u64 {
    m.inspect(name).unwrap()
}

// ─── Loads ───────────────────────────────────────────────────────────────────

#[test]
fn ld_immediate_into_each_target() {
    let p = Program::new()
        .ld_imm(0x12)
        .ld_x(0x34)
        .ld_y(0x56)
        .ld_out(0x38)
        .build();
    let m = run(p, Program::steps_for(4));
    assert_eq!(reg(&m, "ac"), 0x12);
    assert_eq!(reg(&m, "x"), 0x34);
    assert_eq!(reg(&m, "y"), 0x56);
    assert_eq!(reg(&m, "out"), 0x38);
}

#[test]
fn ld_from_ram_uses_effective_address() {
    // Store 0x77 at zero page 0x20, clobber AC, load it back through [D].
    let p = Program::new()
        .ld_imm(0x77)
        .st_ac(0x20)
        .ld_imm(0x00)
        .ld_zp(0x20)
        .build();
    let m = run(p, Program::steps_for(4));
    assert_eq!(reg(&m, "ac"), 0x77);
    assert_eq!(reg(&m, "ram[0x20]"), 0x77);
}

#[test]
fn ld_indexed_addressing_via_x_and_y() {
    // Write AC to [Y,X] (0x0105), then read it back through the same mode.
    let p = Program::new()
        .ld_x(0x05)
        .ld_y(0x01)
        .ld_imm(0xAB)
        .op(Op::St, Mode::YxAc, BusSrc::Ac, 0)
        .ld_imm(0x00)
        .op(Op::Ld, Mode::YxAc, BusSrc::Ram, 0)
        .build();
    let m = run(p, Program::steps_for(6));
    assert_eq!(reg(&m, "ram[0x0105]"), 0xAB);
    assert_eq!(reg(&m, "ac"), 0xAB);
}

// ─── ALU ─────────────────────────────────────────────────────────────────────

#[test]
fn add_wraps_modulo_256() {
    let m = run(Program::new().ld_imm(0xFF).add_imm(0x02).build(), 3);
    assert_eq!(reg(&m, "ac"), 0x01);
}

#[test]
fn sub_wraps_modulo_256() {
    let m = run(Program::new().ld_imm(0x01).sub_imm(0x03).build(), 3);
    assert_eq!(reg(&m, "ac"), 0xFE);
}

#[test]
fn logic_ops_apply_bitwise() {
    let m = run(Program::new().ld_imm(0xF0).and_imm(0x3C).build(), 3);
    assert_eq!(reg(&m, "ac"), 0x30);
    let m = run(Program::new().ld_imm(0xF0).or_imm(0x3C).build(), 3);
    assert_eq!(reg(&m, "ac"), 0xFC);
    let m = run(Program::new().ld_imm(0xF0).xor_imm(0x3C).build(), 3);
    assert_eq!(reg(&m, "ac"), 0xCC);
}

#[test]
fn accumulator_example_five_plus_three() {
    let m = run(Program::new().ld_imm(5).add_imm(3).build(), 3);
    assert_eq!(reg(&m, "ac"), 8);
}

// ─── Stores ──────────────────────────────────────────────────────────────────

#[test]
fn store_suppresses_ac_write_back() {
    let p = Program::new().ld_imm(0x42).st_ac(0x10).build();
    let m = run(p, 3);
    assert_eq!(reg(&m, "ac"), 0x42, "ST must not clobber AC");
    assert_eq!(reg(&m, "ram[0x10]"), 0x42);
}

#[test]
fn store_with_x_target_still_writes_x() {
    // ST $33,[$10],X: stores the immediate and loads X with it.
    let p = Program::new().op(Op::St, Mode::DX, BusSrc::Data, 0x33).build();
    let m = run(p, 2);
    assert_eq!(reg(&m, "ram[0x33]"), 0x33);
    assert_eq!(reg(&m, "x"), 0x33);
}

#[test]
fn store_immediate_value_to_ram() {
    let p = Program::new()
        .op(Op::St, Mode::DAc, BusSrc::Data, 0x7F)
        .build();
    let m = run(p, 2);
    // Bus carries the operand; the cell address is the same operand byte.
    assert_eq!(reg(&m, "ram[0x7f]"), 0x7F);
}

// ─── Post-increment and output latches ───────────────────────────────────────

#[test]
fn yxpp_mode_increments_x_and_wraps() {
    let p = Program::new()
        .ld_x(0xFF)
        .ld_imm(0x11)
        .op(Op::Ld, Mode::YxppOut, BusSrc::Ac, 0)
        .build();
    let m = run(p, Program::steps_for(3));
    assert_eq!(reg(&m, "out"), 0x11);
    assert_eq!(reg(&m, "x"), 0x00, "X post-increment wraps");
}

#[test]
fn suppressed_store_to_out_still_increments_x() {
    let p = Program::new()
        .ld_x(0x07)
        .op(Op::St, Mode::YxppOut, BusSrc::Data, 0x22)
        .build();
    let m = run(p, Program::steps_for(2));
    assert_eq!(reg(&m, "out"), 0x00, "ST suppresses the OUT write");
    assert_eq!(reg(&m, "x"), 0x08, "increment is not suppressed");
    assert_eq!(reg(&m, "ram[0x0007]"), 0x22);
}

#[test]
fn xout_latches_ac_on_out_bit6_rising_edge() {
    let p = Program::new()
        .ld_imm(0x5A) // AC that XOUT should capture
        .ld_out(0x40) // bit 6 rises
        .ld_imm(0x99)
        .ld_out(0x41) // bit 6 stays high: no new latch
        .build();
    let m = run(p, Program::steps_for(4));
    assert_eq!(reg(&m, "xout"), 0x5A);

    // Dropping and raising bit 6 again latches the new AC.
    let p = Program::new()
        .ld_imm(0x5A)
        .ld_out(0x40)
        .ld_imm(0x99)
        .ld_out(0x00)
        .ld_out(0x40)
        .build();
    let m = run(p, Program::steps_for(5));
    assert_eq!(reg(&m, "xout"), 0x99);
}

#[test]
fn input_port_drives_the_bus() {
    let config = Config::default();
    let mut m = Machine::new(&config);
    let p = Program::new()
        .op(Op::Ld, Mode::DAc, BusSrc::In, 0)
        .build();
    m.load_program(&p, 0).unwrap();
    m.set_input(0xC3);
    for _ in 0..2 {
        let _ = m.step().unwrap();
    }
    assert_eq!(reg(&m, "ac"), 0xC3);
}

// ─── Error handling ──────────────────────────────────────────────────────────

#[test]
fn undefined_encoding_halts_under_halt_policy() {
    let config = Config {
        illegal_policy: IllegalPolicy::Halt,
        ..Config::default()
    };
    let mut m = Machine::new(&config);
    let p = Program::new()
        .op(Op::St, Mode::DAc, BusSrc::Ram, 0x10)
        .build();
    m.load_program(&p, 0).unwrap();
    let _ = m.step().unwrap(); // reset word
    let err = m.step().unwrap_err();
    match err {
        SimError::IllegalInstruction { opcode, addr } => {
            assert_eq!(opcode, 0b110_000_01);
            assert_eq!(addr, 0x0000);
        }
        other => panic!("expected IllegalInstruction, got {other}"),
    }
    assert!(m.is_halted());
    assert!(matches!(m.step(), Err(SimError::Halted { addr: 0 })));
}

#[test]
fn undefined_encoding_continues_with_write_back_by_default() {
    // Seed the cell, then execute the undefined store-from-RAM encoding: the
    // cell must be unchanged and execution must continue.
    let p = Program::new()
        .ld_imm(0x66)
        .st_ac(0x10)
        .op(Op::St, Mode::DAc, BusSrc::Ram, 0x10)
        .ld_imm(0x05)
        .build();
    let m = run(p, Program::steps_for(4));
    assert_eq!(reg(&m, "ram[0x10]"), 0x66);
    assert_eq!(reg(&m, "ac"), 0x05);
    assert!(!m.is_halted());
    assert_eq!(m.stats().illegal_continued, 1);
}

#[test]
fn program_too_large_fails_before_mutation() {
    let config = Config::default();
    let mut m = Machine::new(&config);
    let err = m.load_program(&[0u8; 1], 128 * 1024).unwrap_err();
    assert!(matches!(err, SimError::ProgramTooLarge { .. }), "{err}");
    // A fitting image at the same origin minus one is accepted.
    m.load_program(&[0u8; 1], 128 * 1024 - 1).unwrap();
}

#[test]
fn unknown_arch_state_is_a_caller_error() {
    let m = Machine::new(&Config::default());
    let err = m.inspect("accumulator").unwrap_err();
    assert_eq!(
        err,
        SimError::UnknownArchState {
            name: "accumulator".into()
        }
    );
    assert!(m.inspect("ram[0x8000]").is_err(), "index past RAM end");
}
