//! Dual-level Gigatron TTL microcomputer simulator library.
//!
//! This crate reconstructs the behavior of the Gigatron, a microcomputer built
//! entirely from discrete logic chips, at two levels of fidelity:
//! 1. **Netlist:** A chip-level circuit simulator (signals, elements, settle passes).
//! 2. **Board:** The fixed Gigatron topology wired from the element library.
//! 3. **Emulator:** An instruction-level interpreter of the same machine.
//! 4. **Harness:** A differential comparison harness stepping both engines in lockstep.
//! 5. **Support:** ISA decoding/disassembly, trace/watch capture, configuration, statistics.

/// Common types and constants (errors, machine geometry).
pub mod common;
/// Simulator configuration (defaults, policies, reset-value overrides).
pub mod config;
/// Chip-level circuit simulation (signals, element library, topology, simulator).
pub mod netlist;
/// The Gigatron board topology built from the element library.
pub mod board;
/// Instruction set (field extraction, operation tables, disassembly).
pub mod isa;
/// Instruction-level emulator of the architectural state.
pub mod emu;
/// Trace/watch subsystem shared by both engines.
pub mod trace;
/// Differential comparison harness and divergence reporting.
pub mod harness;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Chip-level engine; build one with [`board::build`] or a custom netlist.
pub use crate::netlist::simulator::CircuitSimulator;
/// Instruction-level engine; holds the architectural state of the machine.
pub use crate::emu::Machine;
/// Lockstep comparison harness; construct with [`harness::Harness::new`].
pub use crate::harness::Harness;
/// Library-wide error type covering both engines and the harness.
pub use crate::common::error::SimError;
