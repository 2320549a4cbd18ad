//! Disassembler listing format checks.

use gtsim_core::isa::disasm::{disassemble, disassemble_all};
use gtsim_core::isa::{BusSrc, Condition, Mode, Op, encode};

fn dis(op: Op, mode: Mode, bus: BusSrc, operand: u8) -> String {
    disassemble(encode(op, mode, bus), operand)
}

#[test]
fn load_and_alu_forms() {
    assert_eq!(dis(Op::Ld, Mode::DAc, BusSrc::Data, 0x05), "LOAD $05,AC");
    assert_eq!(dis(Op::Ld, Mode::DAc, BusSrc::Ram, 0x30), "LOAD [$30],AC");
    assert_eq!(dis(Op::Add, Mode::YxAc, BusSrc::Ram, 0x00), "ADD [Y,X],AC");
    assert_eq!(dis(Op::And, Mode::DAc, BusSrc::Ac, 0x00), "AND AC,AC");
    assert_eq!(dis(Op::Xor, Mode::DY, BusSrc::In, 0x00), "XOR IN,Y");
    assert_eq!(
        dis(Op::Sub, Mode::YdAc, BusSrc::Ram, 0x12),
        "SUB [Y,$12],AC"
    );
}

#[test]
fn post_increment_suffix() {
    assert_eq!(
        dis(Op::Ld, Mode::YxppOut, BusSrc::Ram, 0x00),
        "LOAD [Y,X],OUT (x++)"
    );
}

#[test]
fn store_forms_list_surviving_targets() {
    assert_eq!(dis(Op::St, Mode::DAc, BusSrc::Ac, 0x30), "STORE AC,[$30]");
    // X write-back survives a store and is listed after the cell.
    assert_eq!(
        dis(Op::St, Mode::DX, BusSrc::Data, 0x33),
        "STORE $33,[$33],X"
    );
    assert_eq!(
        dis(Op::St, Mode::YxppOut, BusSrc::In, 0x00),
        "STORE IN,[Y,X] (x++)"
    );
}

#[test]
fn undefined_store_renders_as_ctrl() {
    assert_eq!(dis(Op::St, Mode::DAc, BusSrc::Ram, 0x30), "CTRL -,[$30]");
}

#[test]
fn branch_and_jump_forms() {
    for (cond, name) in [
        (Condition::Gt, "BGT"),
        (Condition::Lt, "BLT"),
        (Condition::Ne, "BNE"),
        (Condition::Eq, "BEQ"),
        (Condition::Ge, "BGE"),
        (Condition::Le, "BLE"),
        (Condition::Bra, "BRA"),
    ] {
        assert_eq!(
            dis(Op::Bcc, Mode::from_bits(cond.bits()), BusSrc::Data, 0x10),
            format!("{name} $10")
        );
    }
    assert_eq!(
        dis(Op::Bcc, Mode::from_bits(Condition::Jmp.bits()), BusSrc::Data, 0x00),
        "JUMP Y, $00"
    );
}

#[test]
fn listing_carries_word_addresses() {
    let image = [0x00, 0x05, 0x80, 0x03];
    let lines = disassemble_all(&image);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "0000  LOAD $05,AC");
    assert_eq!(lines[1], "0001  ADD $03,AC");
}
