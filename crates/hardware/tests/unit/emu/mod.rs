//! Unit tests for the instruction-level emulator.

/// Per-operation semantics: loads, ALU operations, stores, I/O latches.
pub mod instructions;

/// Branches, far jumps, and page behavior.
pub mod control_flow;
