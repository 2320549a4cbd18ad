//! Branches, far jumps, and page behavior.
//!
//! Branch conditions derive from the accumulator: Z when AC = 0, N from
//! bit 7. A taken in-page branch replaces only the low program-counter byte;
//! the page is that of the *fetch* address (the word after the branch),
//! because the hardware's high counters hold during the load.

use gtsim_core::config::Config;
use gtsim_core::isa::Condition;
use gtsim_core::{Machine, SimError};
use rstest::rstest;

use crate::common::program::Program;

fn machine_with(program: Vec<u8>) -> Machine {
    let mut m = Machine::new(&Config::default());
    m.load_program(&program, 0).unwrap();
    m
}

/// Run: set AC, branch to 0x10 on `cond`, fall through to a marker that sets
/// OUT; at 0x10 a different marker sets OUT.
fn branch_outcome(cond: Condition, ac: u8) -> u8 {
    let p = Program::new()
        .ld_imm(ac)
        .branch(cond, 0x10)
        .ld_out(0x01) // fall-through marker at word 2
        .nop()
        .pad_to(0x10)
        .ld_out(0x02) // taken marker at word 0x10
        .build();
    let mut m = machine_with(p);
    // Reset word, ld, branch, the word in the branch shadow, the marker.
    for _ in 0..5 {
        let _ = m.step().unwrap();
    }
    m.inspect("out").unwrap() as u8
}

#[rstest]
#[case(Condition::Gt, 0x05, true)]
#[case(Condition::Gt, 0x00, false)]
#[case(Condition::Gt, 0x80, false)]
#[case(Condition::Lt, 0x80, true)]
#[case(Condition::Lt, 0xFF, true)]
#[case(Condition::Lt, 0x00, false)]
#[case(Condition::Lt, 0x05, false)]
#[case(Condition::Ne, 0x05, true)]
#[case(Condition::Ne, 0x80, true)]
#[case(Condition::Ne, 0x00, false)]
#[case(Condition::Eq, 0x00, true)]
#[case(Condition::Eq, 0x05, false)]
#[case(Condition::Eq, 0x80, false)]
#[case(Condition::Ge, 0x00, true)]
#[case(Condition::Ge, 0x7F, true)]
#[case(Condition::Ge, 0x80, false)]
#[case(Condition::Le, 0x00, true)]
#[case(Condition::Le, 0x80, true)]
#[case(Condition::Le, 0x01, false)]
#[case(Condition::Bra, 0x00, true)]
#[case(Condition::Bra, 0x42, true)]
fn condition_table(#[case] cond: Condition, #[case] ac: u8, #[case] taken: bool) {
    let expected = if taken { 0x02 } else { 0x01 };
    assert_eq!(branch_outcome(cond, ac), expected, "{cond:?} ac={ac:#04x}");
}

#[test]
fn branch_shadow_instruction_executes() {
    // The word after a taken branch is already fetched and executes before
    // control arrives at the target (pipelined fetch, no flush).
    let p = Program::new()
        .branch(Condition::Bra, 0x10)
        .ld_x(0x77) // shadow word: executes despite the taken branch
        .pad_to(0x10)
        .ld_out(0x02)
        .build();
    let mut m = machine_with(p);
    for _ in 0..4 {
        let _ = m.step().unwrap();
    }
    assert_eq!(m.inspect("x").unwrap(), 0x77);
    assert_eq!(m.inspect("out").unwrap(), 0x02);
}

#[test]
fn far_jump_loads_page_from_y() {
    let p = Program::new()
        .ld_y(0x02)
        .jmp(0x34)
        .build();
    let mut m = machine_with(p);
    // Reset word, ld y, jmp, shadow word.
    for _ in 0..4 {
        let _ = m.step().unwrap();
    }
    assert_eq!(m.inspect("pc").unwrap(), 0x0235);
}

#[test]
fn in_page_branch_keeps_fetch_page() {
    // Branch at word 0xFE: its shadow word is 0xFF, still page 0, so the
    // target is 0x0010.
    let p = Program::new()
        .pad_to(0xFE)
        .branch(Condition::Bra, 0x10)
        .build();
    let mut m = machine_with(p);
    for _ in 0..0xFF + 1 {
        let _ = m.step().unwrap();
    }
    assert_eq!(m.inspect("pc").unwrap(), 0x0010);
}

#[test]
fn branch_at_page_end_targets_next_page() {
    // Branch at word 0xFF: its shadow word is 0x100, page 1, so the target
    // is 0x0110 — the documented page-crossing quirk.
    let p = Program::new()
        .pad_to(0xFF)
        .branch(Condition::Bra, 0x10)
        .build();
    let mut m = machine_with(p);
    for _ in 0..0x100 + 1 {
        let _ = m.step().unwrap();
    }
    assert_eq!(m.inspect("pc").unwrap(), 0x0110);
}

#[test]
fn not_taken_branch_falls_through() {
    let p = Program::new()
        .ld_imm(0x01)
        .branch(Condition::Eq, 0x10)
        .ld_out(0x01)
        .build();
    let mut m = machine_with(p);
    for _ in 0..4 {
        let _ = m.step().unwrap();
    }
    assert_eq!(m.inspect("out").unwrap(), 0x01);
    assert_eq!(m.inspect("pc").unwrap(), 4);
}

#[test]
fn branch_condition_reads_ram_operand_from_zero_page() {
    // BNE with the RAM bus source takes its target byte from [D].
    let p = Program::new()
        .ld_imm(0x30)
        .st_ac(0x08) // target byte 0x30 parked at zero page 0x08
        .ld_imm(0x01) // AC nonzero so BNE is taken
        .op(
            gtsim_core::isa::Op::Bcc,
            gtsim_core::isa::Mode::from_bits(Condition::Ne.bits()),
            gtsim_core::isa::BusSrc::Ram,
            0x08,
        )
        .build();
    let mut m = machine_with(p);
    for _ in 0..5 {
        let _ = m.step().unwrap();
    }
    assert_eq!(m.inspect("pc").unwrap(), 0x0030);
}

#[test]
fn halted_machine_rejects_further_steps_without_corruption() {
    let config = Config {
        illegal_policy: gtsim_core::config::IllegalPolicy::Halt,
        ..Config::default()
    };
    let mut m = Machine::new(&config);
    let p = Program::new()
        .ld_imm(0x55)
        .op(
            gtsim_core::isa::Op::St,
            gtsim_core::isa::Mode::DAc,
            gtsim_core::isa::BusSrc::Ram,
            0x10,
        )
        .build();
    m.load_program(&p, 0).unwrap();
    let _ = m.step().unwrap();
    let _ = m.step().unwrap(); // ld $55
    assert!(m.step().is_err());
    // Frozen: AC still holds the last committed value.
    assert_eq!(m.inspect("ac").unwrap(), 0x55);
    assert!(matches!(m.step(), Err(SimError::Halted { .. })));
}
