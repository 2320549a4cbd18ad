//! Common types shared across the netlist engine, the emulator, and the harness.

/// Machine geometry constants (ROM/RAM sizes, register widths).
pub mod constants;
/// Error definitions for topology, execution, and comparison failures.
pub mod error;
