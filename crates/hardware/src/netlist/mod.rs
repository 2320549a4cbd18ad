//! Chip-level circuit simulation.
//!
//! This module models a schematic as a netlist of logic elements joined by
//! named, fixed-width signals, and evaluates it cycle-by-cycle:
//! 1. **Signals:** Typed value carriers ([`signal`]).
//! 2. **Elements:** The primitive library and the [`element::Element`] trait.
//! 3. **Topology:** Netlist construction and build-time validation ([`topology`]).
//! 4. **Simulator:** Settle/clock-edge stepping and inspection ([`simulator`]).
//!
//! No analog propagation delay is modeled: each clock cycle settles the
//! combinational logic to a fixed point, applies one clock edge to every
//! stateful element, then settles again so outputs reflect the post-edge
//! state.

/// The element trait and the primitive element library.
pub mod element;
/// Named fixed-width signals and the value store.
pub mod signal;
/// The chip-level simulator driving a validated netlist.
pub mod simulator;
/// Netlist construction and validation.
pub mod topology;
