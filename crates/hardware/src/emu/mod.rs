//! Instruction-level emulator.
//!
//! Interprets the machine's instruction set directly against architectural
//! state, bypassing circuit-level detail, to provide the fast reference
//! behavior the differential harness compares the netlist engine against.
//!
//! The fetch pipeline is modeled exactly: each `step()` executes the
//! previously fetched instruction word (`ir`/`d`) while fetching the word at
//! `pc`, then latches the new word and advances `pc`. A taken in-page branch
//! replaces only the low byte of `pc`; the page is that of the fetch address,
//! matching the hardware's counter chain, which holds the high byte during
//! the load.

use std::collections::BTreeMap;

use tracing::{trace, warn};

use crate::common::constants::ROM_BYTES;
use crate::common::error::SimError;
use crate::config::{Config, IllegalPolicy};
use crate::isa::{BusSrc, Condition, Instruction, Op, Target};
use crate::stats::SimStats;
use crate::trace::{Recorder, StepRecord, parse_indexed};

/// The architectural state of the machine plus its interpreter.
///
/// Each instance is self-contained; multiple machines coexist freely (the
/// comparison harness and the determinism tests rely on it).
#[derive(Debug)]
pub struct Machine {
    rom: Vec<u8>,
    ram: Vec<u8>,
    ram_mask: u16,
    pc: u16,
    exec_pc: u16,
    ir: u8,
    d: u8,
    ac: u8,
    x: u8,
    y: u8,
    inp: u8,
    out: u8,
    xout: u8,
    halted: Option<u16>,
    policy: IllegalPolicy,
    instructions: u64,
    recorder: Recorder,
    stats: SimStats,
}

impl Machine {
    /// Create a machine with zeroed state and empty ROM. RAM size follows
    /// [`Config::ram_addr_bits`].
    pub fn new(config: &Config) -> Self {
        let ram_addr_bits = config.ram_addr_bits.min(16);
        Self {
            rom: vec![0; ROM_BYTES],
            ram: vec![0; 1 << ram_addr_bits],
            ram_mask: ((1u32 << ram_addr_bits) - 1) as u16,
            pc: 0,
            exec_pc: 0,
            ir: 0,
            d: 0,
            ac: 0,
            x: 0,
            y: 0,
            inp: 0,
            out: 0,
            xout: 0,
            halted: None,
            policy: config.illegal_policy,
            instructions: 0,
            recorder: Recorder::default(),
            stats: SimStats::new(),
        }
    }

    /// Install program bytes into ROM at a byte origin.
    ///
    /// # Errors
    ///
    /// [`SimError::ProgramTooLarge`] if the image does not fit; checked
    /// before any state is mutated.
    pub fn load_program(&mut self, bytes: &[u8], origin: usize) -> Result<(), SimError> {
        let end = origin.checked_add(bytes.len()).unwrap_or(usize::MAX);
        if end > self.rom.len() {
            return Err(SimError::ProgramTooLarge {
                size: bytes.len(),
                origin,
                capacity: self.rom.len(),
            });
        }
        self.rom[origin..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Execute one instruction and capture a step record of the watched
    /// state.
    ///
    /// # Errors
    ///
    /// [`SimError::Halted`] once the machine has frozen;
    /// [`SimError::IllegalInstruction`] for the undefined encoding under the
    /// `Halt` policy.
    pub fn step(&mut self) -> Result<StepRecord, SimError> {
        if let Some(addr) = self.halted {
            return Err(SimError::Halted { addr });
        }

        let fetch_pc = self.pc;
        let word = 2 * usize::from(fetch_pc);
        let ir_next = self.rom[word];
        let d_next = self.rom[word + 1];

        let instr = Instruction::decode(self.ir);
        let operand = self.d;
        trace!(
            target: "gtsim::emu",
            pc = self.exec_pc,
            ir = self.ir,
            d = operand,
            "exec"
        );

        if instr.is_undefined() {
            match self.policy {
                IllegalPolicy::Halt => {
                    self.halted = Some(self.exec_pc);
                    return Err(SimError::IllegalInstruction {
                        opcode: self.ir,
                        addr: self.exec_pc,
                    });
                }
                IllegalPolicy::Continue => {
                    self.stats.illegal_continued += 1;
                    warn!(
                        target: "gtsim::emu",
                        opcode = self.ir,
                        addr = self.exec_pc,
                        "undefined store-from-RAM encoding; continuing with write-back"
                    );
                }
            }
        }

        // Effective RAM address. Under Bcc the mode field carries the
        // condition and the address path stays on zero-page [D].
        let (lo, hi) = if matches!(instr.op, Op::Bcc) {
            (operand, 0)
        } else {
            (
                if instr.mode.low_from_x() {
                    self.x
                } else {
                    operand
                },
                if instr.mode.high_from_y() { self.y } else { 0 },
            )
        };
        let addr = u16::from(hi) << 8 | u16::from(lo);

        let bus = match instr.bus {
            BusSrc::Data => operand,
            BusSrc::Ram => self.load_ram(addr),
            BusSrc::Ac => self.ac,
            BusSrc::In => self.inp,
        };

        if matches!(instr.op, Op::St) {
            self.store_ram(addr, bus);
        }

        let alu = match instr.op {
            Op::Ld | Op::St => bus,
            Op::And => self.ac & bus,
            Op::Or => self.ac | bus,
            Op::Xor => self.ac ^ bus,
            Op::Add => self.ac.wrapping_add(bus),
            Op::Sub => self.ac.wrapping_sub(bus),
            Op::Bcc => self.ac.wrapping_neg(),
        };

        let mut taken = false;
        if matches!(instr.op, Op::Bcc) {
            taken = instr.condition().taken(self.ac);
        } else {
            let suppressed = matches!(instr.op, Op::St);
            let old_out6 = self.out & 0x40 != 0;
            match instr.mode.target() {
                Target::Ac if !suppressed => self.ac = alu,
                Target::X => self.x = alu,
                Target::Y => self.y = alu,
                Target::Out if !suppressed => self.out = alu,
                Target::Ac | Target::Out => {}
            }
            // The extended output latch clocks on the rising edge of OUT
            // bit 6. OUT writes never write AC in the same cycle, so the
            // latched value is the stable accumulator.
            if !old_out6 && self.out & 0x40 != 0 {
                self.xout = self.ac;
                trace!(target: "gtsim::emu", xout = self.xout, "xout latch");
            }
            if instr.mode.post_increments_x() {
                self.x = self.x.wrapping_add(1);
            }
        }

        let mut next_pc = fetch_pc.wrapping_add(1);
        if taken {
            next_pc = match instr.condition() {
                Condition::Jmp => u16::from(self.y) << 8 | u16::from(bus),
                _ => (fetch_pc & 0xff00) | u16::from(bus),
            };
            trace!(target: "gtsim::emu", target_pc = next_pc, "branch taken");
        }

        self.exec_pc = fetch_pc;
        self.pc = next_pc;
        self.ir = ir_next;
        self.d = d_next;

        self.instructions += 1;
        self.stats.record_instruction(instr.op, taken);

        let record = self.capture();
        self.recorder.push(record.clone());
        Ok(record)
    }

    /// Current value of a named architectural item, or of one RAM cell via
    /// the `"ram[index]"` probe syntax.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownArchState`] if the name does not resolve.
    pub fn inspect(&self, name: &str) -> Result<u64, SimError> {
        let value = match name {
            "pc" => u64::from(self.pc),
            "exec_pc" => u64::from(self.exec_pc),
            "ir" => u64::from(self.ir),
            "d" => u64::from(self.d),
            "ac" => u64::from(self.ac),
            "x" => u64::from(self.x),
            "y" => u64::from(self.y),
            "in" => u64::from(self.inp),
            "out" => u64::from(self.out),
            "xout" => u64::from(self.xout),
            _ => {
                let cell = parse_indexed(name)
                    .filter(|(element, _)| *element == "ram")
                    .and_then(|(_, index)| self.ram.get(index));
                return cell.map(|&b| u64::from(b)).ok_or_else(|| {
                    SimError::UnknownArchState {
                        name: name.to_owned(),
                    }
                });
            }
        };
        Ok(value)
    }

    /// Register an architectural name for per-step capture. Takes effect
    /// from the next step; earlier records are not backfilled.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownArchState`] if the name does not resolve.
    pub fn watch(&mut self, name: &str) -> Result<(), SimError> {
        let _ = self.inspect(name)?;
        self.recorder.watch(name);
        Ok(())
    }

    /// The ordered step records captured since the last reset.
    pub fn trace(&self) -> &[StepRecord] {
        self.recorder.trace()
    }

    /// The recorder, for JSON export of the trace.
    pub const fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Zero all architectural state and discard trace history. The loaded
    /// program is preserved; RAM is deterministically cleared.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.pc = 0;
        self.exec_pc = 0;
        self.ir = 0;
        self.d = 0;
        self.ac = 0;
        self.x = 0;
        self.y = 0;
        self.inp = 0;
        self.out = 0;
        self.xout = 0;
        self.halted = None;
        self.instructions = 0;
        self.recorder.clear();
        self.stats = SimStats::new();
    }

    /// Drive the input port.
    pub fn set_input(&mut self, value: u8) {
        self.inp = value;
    }

    /// Whether the machine froze on an illegal instruction.
    pub const fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Instructions executed since the last reset.
    pub const fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Execution statistics since the last reset.
    pub const fn stats(&self) -> &SimStats {
        &self.stats
    }

    fn load_ram(&self, addr: u16) -> u8 {
        self.ram[usize::from(addr & self.ram_mask)]
    }

    fn store_ram(&mut self, addr: u16, value: u8) {
        self.ram[usize::from(addr & self.ram_mask)] = value;
    }

    fn capture(&self) -> StepRecord {
        let mut values = BTreeMap::new();
        for name in self.recorder.watched() {
            if let Ok(value) = self.inspect(name) {
                let _ = values.insert(name.clone(), value);
            }
        }
        StepRecord {
            step: self.instructions,
            values,
        }
    }
}
