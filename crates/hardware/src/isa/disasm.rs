//! Instruction disassembly.
//!
//! Renders a two-byte instruction word as `OPER src,target` with the
//! conventions of the machine's reference listings: immediate operands as
//! `$nn`, RAM operands as the addressing-mode bracket form, the `(x++)`
//! suffix for the post-increment mode, and `CTRL` for the undefined
//! store-from-RAM encoding.

use super::{BusSrc, Condition, Instruction, Mode, Op, Target};

const fn op_name(op: Op) -> &'static str {
    match op {
        Op::Ld => "LOAD",
        Op::And => "AND",
        Op::Or => "OR",
        Op::Xor => "XOR",
        Op::Add => "ADD",
        Op::Sub => "SUB",
        Op::St => "STORE",
        Op::Bcc => "JUMP",
    }
}

const fn branch_name(cond: Condition) -> &'static str {
    match cond {
        Condition::Jmp => "JUMP Y,",
        Condition::Gt => "BGT",
        Condition::Lt => "BLT",
        Condition::Ne => "BNE",
        Condition::Eq => "BEQ",
        Condition::Ge => "BGE",
        Condition::Le => "BLE",
        Condition::Bra => "BRA",
    }
}

const fn target_name(target: Target) -> &'static str {
    match target {
        Target::Ac => "AC",
        Target::X => "X",
        Target::Y => "Y",
        Target::Out => "OUT",
    }
}

/// Addressing-mode bracket form with the operand substituted for `D`.
fn address_form(mode: Mode, operand: u8) -> String {
    match (mode.high_from_y(), mode.low_from_x()) {
        (false, false) => format!("[${operand:02x}]"),
        (false, true) => "[X]".to_owned(),
        (true, false) => format!("[Y,${operand:02x}]"),
        (true, true) => "[Y,X]".to_owned(),
    }
}

fn bus_form(instr: Instruction, operand: u8) -> String {
    match instr.bus {
        BusSrc::Data => format!("${operand:02x}"),
        BusSrc::Ram => address_form(instr.mode, operand),
        BusSrc::Ac => "AC".to_owned(),
        BusSrc::In => "IN".to_owned(),
    }
}

/// Disassemble one instruction word.
pub fn disassemble(ir: u8, operand: u8) -> String {
    let instr = Instruction::decode(ir);
    let suffix = if instr.mode.post_increments_x() {
        " (x++)"
    } else {
        ""
    };

    match instr.op {
        Op::Bcc => format!("{} ${operand:02x}", branch_name(instr.condition())),
        Op::St => {
            // The store target is the RAM cell; X/Y write-back still happens
            // and is listed after it, AC/OUT write-back is suppressed.
            let source = if instr.is_undefined() {
                // Only meaningful with an expansion board, where it is CTRL.
                "-".to_owned()
            } else {
                bus_form(instr, operand)
            };
            let oper = if instr.is_undefined() { "CTRL" } else { "STORE" };
            let mut target = address_form(instr.mode, operand);
            match instr.mode.target() {
                Target::X | Target::Y => {
                    target.push(',');
                    target.push_str(target_name(instr.mode.target()));
                }
                Target::Ac | Target::Out => {}
            }
            format!("{oper} {source},{target}{suffix}")
        }
        _ => format!(
            "{} {},{}{suffix}",
            op_name(instr.op),
            bus_form(instr, operand),
            target_name(instr.mode.target())
        ),
    }
}

/// Disassemble a byte-pair program image into one line per word.
pub fn disassemble_all(image: &[u8]) -> Vec<String> {
    image
        .chunks_exact(2)
        .enumerate()
        .map(|(addr, word)| format!("{addr:04x}  {}", disassemble(word[0], word[1])))
        .collect()
}
