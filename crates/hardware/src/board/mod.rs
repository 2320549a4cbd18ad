//! The fixed board topology, wired from the element library.
//!
//! This module reproduces the schematic's structure rather than its
//! semantics-by-table: the program counter is four chained 4-bit counters,
//! instruction fields feed one-hot decoders, the branch condition is a 4-way
//! mux over the mode bits selected by the (N, Z) flags, and the extended
//! output register's write strobe is derived combinationally from the OUT
//! register's data and enable, which is how a single global clock edge
//! captures a derived-clock latch.
//!
//! Signal names are the inspection surface; architectural quantities carry
//! the same names the emulator uses (`pc`, `ir`, `d`, `ac`, `x`, `y`, `in`,
//! `out`, `xout`), which keeps the default correspondence map one-to-one.

/// The ALU block element.
pub mod alu;

use crate::common::constants::ROM_WORDS;
use crate::common::error::SimError;
use crate::config::Config;
use crate::harness::CorrespondenceMap;
use crate::netlist::element::{
    Concat, Const, Counter, Decoder, Gate, GateOp, InputPort, Mux, Ram, Register, Rom, Slice,
};
use crate::netlist::simulator::CircuitSimulator;
use crate::netlist::topology::Netlist;
use alu::AluUnit;

/// Build the board netlist and wrap it in a validated simulator.
///
/// Reset values for the named stateful elements (`pc0`..`pc3`, `ir`, `d`,
/// `ac`, `x`, `y`, `out`, `xout`) come from
/// [`Config::reset_values`]; anything unlisted resets to zero.
///
/// # Errors
///
/// [`SimError::Topology`] only if the wiring here is inconsistent with the
/// element library's contracts — a defect, not a runtime condition.
pub fn build(config: &Config) -> Result<CircuitSimulator, SimError> {
    CircuitSimulator::new(netlist(config)?, config)
}

/// The default correspondence map: every architectural name maps to the
/// board signal of the same name.
pub fn correspondence() -> CorrespondenceMap {
    let mut map = CorrespondenceMap::new();
    for name in ["pc", "ir", "d", "ac", "x", "y", "in", "out", "xout"] {
        map.add(name, [name]);
    }
    map
}

/// Wire the board topology.
///
/// # Errors
///
/// [`SimError::Topology`] for inconsistent wiring (see [`build`]).
pub fn netlist(config: &Config) -> Result<Netlist, SimError> {
    let rv = |name: &str| config.reset_value(name);
    let mut net = Netlist::new();

    // Constant rails.
    let one = net.signal("one", 1)?;
    let never = net.signal("never", 1)?;
    let zero8 = net.signal("zero8", 8)?;
    net.add(Const::new("one", 1, one));
    net.add(Const::new("never", 0, never));
    net.add(Const::new("zero8", 0, zero8));

    // Fetch: PC counter chain, ROM, and the IR/D pipeline registers.
    let pc0 = net.signal("pc0", 4)?;
    let pc1 = net.signal("pc1", 4)?;
    let pc2 = net.signal("pc2", 4)?;
    let pc3 = net.signal("pc3", 4)?;
    let pc0_tc = net.signal("pc0_tc", 1)?;
    let pc1_tc = net.signal("pc1_tc", 1)?;
    let pc2_tc = net.signal("pc2_tc", 1)?;
    let pc3_tc = net.signal("pc3_tc", 1)?;
    let pc = net.signal("pc", 16)?;
    let rom_ir = net.signal("rom_ir", 8)?;
    let rom_d = net.signal("rom_d", 8)?;
    let ir = net.signal("ir", 8)?;
    let d = net.signal("d", 8)?;

    // Decode fields and one-hot lines.
    let ir_op = net.signal("ir_op", 3)?;
    let ir_mode = net.signal("ir_mode", 3)?;
    let ir_bus = net.signal("ir_bus", 2)?;
    let op_hot = net.signal("op_hot", 8)?;
    let mode_hot = net.signal("mode_hot", 8)?;
    let is_st = net.signal("is_st", 1)?;
    let is_bcc = net.signal("is_bcc", 1)?;
    let not_st = net.signal("not_st", 1)?;
    let not_bcc = net.signal("not_bcc", 1)?;
    let m: Vec<_> = (0..8)
        .map(|i| net.signal(&format!("m{i}"), 1))
        .collect::<Result<_, _>>()?;

    // Address and bus paths.
    let addr_lo_any = net.signal("addr_lo_any", 1)?;
    let addr_lo_sel = net.signal("addr_lo_sel", 1)?;
    let addr_hi_any = net.signal("addr_hi_any", 1)?;
    let addr_hi_sel = net.signal("addr_hi_sel", 1)?;
    let addr_lo = net.signal("addr_lo", 8)?;
    let addr_hi = net.signal("addr_hi", 8)?;
    let addr = net.signal("addr", 16)?;
    let ram_q = net.signal("ram_q", 8)?;
    let bus = net.signal("bus", 8)?;

    // ALU and flags.
    let alu_f = net.signal("alu", 8)?;
    let alu_co = net.signal("alu_co", 1)?;
    let flag_n = net.signal("flag_n", 1)?;
    let cond_sel = net.signal("cond_sel", 2)?;
    let cc_gt = net.signal("cc_gt", 1)?;
    let cc_lt = net.signal("cc_lt", 1)?;
    let cc_eq = net.signal("cc_eq", 1)?;
    let cond_hit = net.signal("cond_hit", 1)?;
    let take_any = net.signal("take_any", 1)?;
    let pc_load_lo = net.signal("pc_load_lo", 1)?;
    let pc_load_hi = net.signal("pc_load_hi", 1)?;
    let not_load_lo = net.signal("not_load_lo", 1)?;

    // Write-back enables and the register file.
    let ac_tgt = net.signal("ac_tgt", 1)?;
    let ac_we = net.signal("ac_we", 1)?;
    let x_we = net.signal("x_we", 1)?;
    let y_we = net.signal("y_we", 1)?;
    let out_tgt = net.signal("out_tgt", 1)?;
    let out_we = net.signal("out_we", 1)?;
    let x_inc = net.signal("x_inc", 1)?;
    let x_tc = net.signal("x_tc", 1)?;
    let ac = net.signal("ac", 8)?;
    let x = net.signal("x", 8)?;
    let y = net.signal("y", 8)?;
    let inp = net.signal("in", 8)?;
    let out = net.signal("out", 8)?;
    let xout = net.signal("xout", 8)?;
    let alu_b6 = net.signal("alu_b6", 1)?;
    let out_b6 = net.signal("out_b6", 1)?;
    let not_out_b6 = net.signal("not_out_b6", 1)?;
    let xout_we = net.signal("xout_we", 1)?;

    // Nibble taps for the counter load buses.
    let bus_lo = net.signal("bus_lo", 4)?;
    let bus_hi = net.signal("bus_hi", 4)?;
    let y_lo = net.signal("y_lo", 4)?;
    let y_hi = net.signal("y_hi", 4)?;

    // --- Program counter ---------------------------------------------------
    // Low byte loads the bus value on a taken branch; the high byte loads Y
    // only on a far jump and holds (count disabled) during an in-page
    // branch, which is what pins the target to the fetch page.
    net.add(Counter::new("pc0", bus_lo, pc_load_lo, one, one, pc0, pc0_tc, rv("pc0")));
    net.add(Counter::new("pc1", bus_hi, pc_load_lo, one, pc0_tc, pc1, pc1_tc, rv("pc1")));
    net.add(Counter::new("pc2", y_lo, pc_load_hi, not_load_lo, pc1_tc, pc2, pc2_tc, rv("pc2")));
    net.add(Counter::new("pc3", y_hi, pc_load_hi, not_load_lo, pc2_tc, pc3, pc3_tc, rv("pc3")));
    net.add(Concat::new("pc_bus", vec![pc0, pc1, pc2, pc3], pc));

    // --- Fetch -------------------------------------------------------------
    net.add(Rom::new("rom", pc, vec![rom_ir, rom_d], ROM_WORDS));
    net.add(Register::new("ir", rom_ir, one, ir, rv("ir")));
    net.add(Register::new("d", rom_d, one, d, rv("d")));

    // --- Decode ------------------------------------------------------------
    net.add(Slice::new("ir_op_f", ir, 5, ir_op));
    net.add(Slice::new("ir_mode_f", ir, 2, ir_mode));
    net.add(Slice::new("ir_bus_f", ir, 0, ir_bus));
    net.add(Decoder::new("op_dec", ir_op, op_hot));
    net.add(Decoder::new("mode_dec", ir_mode, mode_hot));
    net.add(Slice::new("is_st_f", op_hot, 6, is_st));
    net.add(Slice::new("is_bcc_f", op_hot, 7, is_bcc));
    net.add(Gate::new("not_st_g", GateOp::Not, vec![is_st], not_st));
    net.add(Gate::new("not_bcc_g", GateOp::Not, vec![is_bcc], not_bcc));
    for (i, &line) in m.iter().enumerate() {
        net.add(Slice::new(&format!("m{i}_f"), mode_hot, i as u32, line));
    }

    // --- Effective address -------------------------------------------------
    // Under Bcc the mode field is a condition, so both selects are forced to
    // the default [D] path.
    net.add(Gate::new("addr_lo_any_g", GateOp::Or, vec![m[1], m[3], m[7]], addr_lo_any));
    net.add(Gate::new("addr_lo_sel_g", GateOp::And, vec![addr_lo_any, not_bcc], addr_lo_sel));
    net.add(Gate::new("addr_hi_any_g", GateOp::Or, vec![m[2], m[3], m[7]], addr_hi_any));
    net.add(Gate::new("addr_hi_sel_g", GateOp::And, vec![addr_hi_any, not_bcc], addr_hi_sel));
    net.add(Mux::new("addr_lo_mux", addr_lo_sel, vec![d, x], addr_lo));
    net.add(Mux::new("addr_hi_mux", addr_hi_sel, vec![zero8, y], addr_hi));
    net.add(Concat::new("addr_bus", vec![addr_lo, addr_hi], addr));

    // --- Memory and bus ----------------------------------------------------
    net.add(Ram::new("ram", addr, bus, is_st, ram_q, config.ram_addr_bits.min(16)));
    net.add(Mux::new("bus_mux", ir_bus, vec![d, ram_q, ac, inp], bus));

    // --- ALU and branch condition -------------------------------------------
    net.add(AluUnit::new("alu", ac, bus, ir_op, alu_f, alu_co));
    net.add(Slice::new("flag_n_f", ac, 7, flag_n));
    net.add(Concat::new("cond_sel_bus", vec![flag_n, alu_co], cond_sel));
    net.add(Slice::new("cc_gt_f", ir_mode, 0, cc_gt));
    net.add(Slice::new("cc_lt_f", ir_mode, 1, cc_lt));
    net.add(Slice::new("cc_eq_f", ir_mode, 2, cc_eq));
    // (Z, N) selects which mode bit answers; Z∧N cannot occur and reads the
    // constant-0 rail through the mux's out-of-range default path.
    net.add(Mux::new("cond_mux", cond_sel, vec![cc_gt, cc_lt, cc_eq, never], cond_hit));
    net.add(Gate::new("take_any_g", GateOp::Or, vec![m[0], cond_hit], take_any));
    net.add(Gate::new("pc_load_lo_g", GateOp::And, vec![is_bcc, take_any], pc_load_lo));
    net.add(Gate::new("pc_load_hi_g", GateOp::And, vec![is_bcc, m[0]], pc_load_hi));
    net.add(Gate::new("not_load_lo_g", GateOp::Not, vec![pc_load_lo], not_load_lo));

    // --- Write-back enables -------------------------------------------------
    // ST suppresses the AC and OUT targets but still writes X and Y.
    net.add(Gate::new("ac_tgt_g", GateOp::Or, vec![m[0], m[1], m[2], m[3]], ac_tgt));
    net.add(Gate::new("ac_we_g", GateOp::And, vec![ac_tgt, not_st, not_bcc], ac_we));
    net.add(Gate::new("x_we_g", GateOp::And, vec![m[4], not_bcc], x_we));
    net.add(Gate::new("y_we_g", GateOp::And, vec![m[5], not_bcc], y_we));
    net.add(Gate::new("out_tgt_g", GateOp::Or, vec![m[6], m[7]], out_tgt));
    net.add(Gate::new("out_we_g", GateOp::And, vec![out_tgt, not_st, not_bcc], out_we));
    net.add(Gate::new("x_inc_g", GateOp::And, vec![m[7], not_bcc], x_inc));

    // --- Register file ------------------------------------------------------
    net.add(Register::new("ac", alu_f, ac_we, ac, rv("ac")));
    net.add(Counter::new("x", alu_f, x_we, x_inc, one, x, x_tc, rv("x")));
    net.add(Register::new("y", alu_f, y_we, y, rv("y")));
    net.add(Register::new("out", alu_f, out_we, out, rv("out")));
    net.add(InputPort::new("in", inp));

    // --- Extended output ----------------------------------------------------
    // XOUT clocks on the rising edge of OUT bit 6. The strobe is computed
    // before the edge from the OUT register's own write: enable high, data
    // bit 6 high, current bit 6 low.
    net.add(Slice::new("alu_b6_f", alu_f, 6, alu_b6));
    net.add(Slice::new("out_b6_f", out, 6, out_b6));
    net.add(Gate::new("not_out_b6_g", GateOp::Not, vec![out_b6], not_out_b6));
    net.add(Gate::new("xout_we_g", GateOp::And, vec![out_we, alu_b6, not_out_b6], xout_we));
    net.add(Register::new("xout", ac, xout_we, xout, rv("xout")));

    // --- Nibble taps --------------------------------------------------------
    net.add(Slice::new("bus_lo_f", bus, 0, bus_lo));
    net.add(Slice::new("bus_hi_f", bus, 4, bus_hi));
    net.add(Slice::new("y_lo_f", y, 0, y_lo));
    net.add(Slice::new("y_hi_f", y, 4, y_hi));

    Ok(net)
}
