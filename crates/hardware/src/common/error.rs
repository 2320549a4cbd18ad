//! Error definitions for both engines and the comparison harness.
//!
//! Every failure carries the offending name, address, or step index so that a
//! caller can act on it without re-deriving context. Build-time topology
//! failures are fatal; name-lookup failures are caller errors and leave engine
//! state untouched.

use thiserror::Error;

/// Which side of the differential comparison a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The instruction-level emulator (architectural-state names).
    Emulator,
    /// The chip-level circuit simulator (signal names).
    Circuit,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emulator => write!(f, "emulator"),
            Self::Circuit => write!(f, "circuit"),
        }
    }
}

/// Library-wide error type.
///
/// Variants map one-to-one onto the failure kinds of the two engines and the
/// harness. No variant is produced for a condition the caller could not
/// distinguish from another.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SimError {
    /// Malformed wiring detected while building a netlist: duplicate names,
    /// multiple drivers, undriven inputs, width mismatches, or a combinational
    /// cycle with no clocked break. Fatal; the netlist is unusable.
    #[error("topology error: {reason}")]
    Topology {
        /// Human-readable description naming the offending signal or element.
        reason: String,
    },

    /// The combinational settle pass failed to reach a fixed point within the
    /// configured iteration cap. The step that produced this error did not
    /// apply a clock edge; the circuit state is the pre-step state.
    #[error("circuit failed to settle after {iterations} passes; unstable: {unstable:?}")]
    UnstableCircuit {
        /// Number of full evaluation passes performed before giving up.
        iterations: u32,
        /// Signals still changing on the final pass.
        unstable: Vec<String>,
    },

    /// A signal name not registered in the netlist was inspected or watched.
    #[error("unknown signal `{name}`")]
    UnknownSignal {
        /// The name that failed to resolve.
        name: String,
    },

    /// An architectural-state name unknown to the emulator was inspected or
    /// watched.
    #[error("unknown architectural state `{name}`")]
    UnknownArchState {
        /// The name that failed to resolve.
        name: String,
    },

    /// The emulator decoded the machine's undefined encoding (a store with
    /// the RAM bus source) under the `Halt` policy.
    #[error("illegal instruction {opcode:#04x} at {addr:#06x}")]
    IllegalInstruction {
        /// The offending opcode byte.
        opcode: u8,
        /// Address of the instruction word that was executing.
        addr: u16,
    },

    /// The emulator was stepped after halting on an illegal instruction.
    #[error("machine is halted (illegal instruction at {addr:#06x})")]
    Halted {
        /// Address of the instruction that halted the machine.
        addr: u16,
    },

    /// A program image does not fit in ROM at the requested origin. Raised
    /// before any state is mutated.
    #[error("program of {size} bytes at origin {origin:#06x} exceeds ROM capacity of {capacity} bytes")]
    ProgramTooLarge {
        /// Program image size in bytes.
        size: usize,
        /// Byte origin the load was requested at.
        origin: usize,
        /// Total ROM capacity in bytes.
        capacity: usize,
    },

    /// The correspondence map references a name unknown to one of the
    /// engines. Raised before any stepping in a harness run.
    #[error("correspondence map references unknown {side} name `{name}`")]
    Correspondence {
        /// Which engine failed to resolve the name.
        side: Side,
        /// The unresolvable name.
        name: String,
    },
}

impl SimError {
    /// Shorthand constructor for topology failures.
    pub fn topology(reason: impl Into<String>) -> Self {
        Self::Topology {
            reason: reason.into(),
        }
    }
}
