//! Configuration system for the dual-level simulator.
//!
//! This module defines the runtime knobs recognized by both engines and the
//! comparison harness. It provides:
//! 1. **Defaults:** Baseline values matching the physical board.
//! 2. **Policies:** The illegal-instruction policy enum.
//! 3. **Overrides:** Per-element reset values for fault-injection runs.
//!
//! Configuration is supplied via JSON from external tooling or use
//! `Config::default()`.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Default configuration constants.
///
/// These values define the baseline behavior when not explicitly overridden.
mod defaults {
    /// Iteration cap for the combinational settle pass.
    ///
    /// The deepest combinational path on the board settles in well under ten
    /// passes; the cap exists so a wiring defect surfaces as an error instead
    /// of a hang.
    pub const SETTLE_CAP: u32 = 64;

    /// Clock cycles the circuit advances per emulated instruction.
    ///
    /// The machine executes one instruction per clock with a pipelined fetch,
    /// so the lockstep ratio is 1.
    pub const CYCLES_PER_INSTRUCTION: u32 = 1;

    /// Byte offset in ROM where program images are installed.
    pub const LOAD_ORIGIN: usize = 0;

    /// Decoded RAM address bits (32 KiB on the stock board).
    pub const RAM_ADDR_BITS: u32 = crate::common::constants::RAM_ADDR_BITS;
}

/// Policy applied when the emulator decodes the machine's undefined encoding
/// (a store with the RAM bus source).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum IllegalPolicy {
    /// Execute the encoding the way the unexpanded hardware does (the
    /// addressed cell is read and written back unchanged) and log a warning.
    ///
    /// This is the default: it keeps the emulator in agreement with the
    /// circuit simulator, which has no notion of an illegal encoding.
    #[default]
    Continue,
    /// Freeze the machine. The offending `step()` fails with
    /// [`SimError::IllegalInstruction`](crate::SimError::IllegalInstruction)
    /// and every later `step()` fails with
    /// [`SimError::Halted`](crate::SimError::Halted).
    Halt,
}

/// Root configuration for both engines and the harness.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of full combinational evaluation passes per settle.
    pub settle_cap: u32,
    /// Circuit clock cycles equivalent to one emulated instruction.
    pub cycles_per_instruction: u32,
    /// Byte offset in ROM where `load_program` installs images.
    pub load_origin: usize,
    /// Number of RAM address bits both engines decode (RAM size is
    /// `2^ram_addr_bits` bytes; higher address bits are ignored).
    pub ram_addr_bits: u32,
    /// Illegal-instruction policy for the emulator.
    pub illegal_policy: IllegalPolicy,
    /// Reset-value overrides keyed by stateful element name (e.g. `"ac"`).
    ///
    /// Values not listed reset to zero. Used by fault-injection tests to
    /// perturb one engine's initial state.
    pub reset_values: BTreeMap<String, u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settle_cap: defaults::SETTLE_CAP,
            cycles_per_instruction: defaults::CYCLES_PER_INSTRUCTION,
            load_origin: defaults::LOAD_ORIGIN,
            ram_addr_bits: defaults::RAM_ADDR_BITS,
            illegal_policy: IllegalPolicy::default(),
            reset_values: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Reset value configured for a named stateful element, defaulting to 0.
    pub fn reset_value(&self, name: &str) -> u64 {
        self.reset_values.get(name).copied().unwrap_or(0)
    }
}
