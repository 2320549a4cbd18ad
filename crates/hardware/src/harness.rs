//! Differential comparison harness.
//!
//! Drives the instruction-level emulator and the chip-level simulator in
//! lockstep over the same program and reports the first point where any
//! correspondence-mapped quantity diverges. Comparison happens *before* each
//! paired step, so a divergence already present in the reset state (fault
//! injection) is reported at step 0, and again after every instruction /
//! cycle-group boundary.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::common::error::{Side, SimError};
use crate::config::Config;
use crate::emu::Machine;
use crate::netlist::simulator::CircuitSimulator;

/// Declared equivalence between architectural names and circuit signals.
///
/// Each architectural name maps to one or more signal names. Multiple
/// signals are concatenated least-significant first by their bit-widths, so
/// a 16-bit counter split across four 4-bit stages can be compared against a
/// single architectural register.
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceMap {
    entries: Vec<(String, Vec<String>)>,
}

impl CorrespondenceMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an architectural name to its circuit signal name(s).
    pub fn add<I, S>(&mut self, arch: &str, signals: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .push((arch.to_owned(), signals.into_iter().map(Into::into).collect()));
    }

    /// The mapped pairs, in insertion order.
    pub fn entries(&self) -> &[(String, Vec<String>)] {
        &self.entries
    }
}

/// First observed disagreement between the two engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DivergenceReport {
    /// Lockstep step index at which the disagreement was observed. Step 0 is
    /// the reset state, before any instruction executes.
    pub step: u64,
    /// The architectural name of the diverging quantity.
    pub name: String,
    /// The emulator's value.
    pub emulator: u64,
    /// The circuit simulator's value (concatenated if multi-signal).
    pub circuit: u64,
}

/// Result of a completed harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// The engines disagreed; execution stopped at the first mismatch.
    Diverged(DivergenceReport),
    /// All steps compared equal.
    Completed {
        /// Number of lockstep steps executed.
        steps: u64,
        /// Final values of every mapped quantity (by architectural name).
        final_state: BTreeMap<String, u64>,
    },
}

/// Lockstep driver for the two engines.
pub struct Harness {
    emulator: Machine,
    circuit: CircuitSimulator,
    map: CorrespondenceMap,
    cycles_per_instruction: u32,
    load_origin: usize,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("map", &self.map.entries.len())
            .field("cycles_per_instruction", &self.cycles_per_instruction)
            .finish()
    }
}

impl Harness {
    /// Assemble a harness from two engines and a correspondence map.
    ///
    /// The cycles-per-instruction ratio and program load origin come from
    /// the configuration; the ratio is a property of the target machine, not
    /// assumed 1:1 here.
    pub fn new(
        emulator: Machine,
        circuit: CircuitSimulator,
        map: CorrespondenceMap,
        config: &Config,
    ) -> Self {
        Self {
            emulator,
            circuit,
            map,
            cycles_per_instruction: config.cycles_per_instruction,
            load_origin: config.load_origin,
        }
    }

    /// Build the standard pairing for the target board: a fresh emulator, the
    /// board netlist, and the one-to-one correspondence map.
    ///
    /// # Errors
    ///
    /// Propagates board construction failures.
    pub fn for_board(config: &Config) -> Result<Self, SimError> {
        Ok(Self::new(
            Machine::new(config),
            crate::board::build(config)?,
            crate::board::correspondence(),
            config,
        ))
    }

    /// Load `program` into both engines, reset them, and step in lockstep up
    /// to `max_steps` instructions, comparing every mapped quantity at every
    /// step boundary.
    ///
    /// # Errors
    ///
    /// [`SimError::Correspondence`] if the map references an unknown name on
    /// either side (raised before any stepping);
    /// [`SimError::ProgramTooLarge`] if the program does not fit; any engine
    /// stepping error is propagated as-is.
    pub fn run(&mut self, program: &[u8], max_steps: u64) -> Result<RunOutcome, SimError> {
        self.validate_map()?;

        self.emulator.load_program(program, self.load_origin)?;
        self.circuit.load_program(program, self.load_origin)?;
        self.emulator.reset();
        self.circuit.reset()?;

        for step in 0..=max_steps {
            if let Some(report) = self.compare(step)? {
                debug!(
                    target: "gtsim::harness",
                    step,
                    name = %report.name,
                    emulator = report.emulator,
                    circuit = report.circuit,
                    "divergence"
                );
                return Ok(RunOutcome::Diverged(report));
            }
            if step == max_steps {
                break;
            }
            let _ = self.emulator.step()?;
            for _ in 0..self.cycles_per_instruction {
                let _ = self.circuit.step()?;
            }
        }

        Ok(RunOutcome::Completed {
            steps: max_steps,
            final_state: self.snapshot()?,
        })
    }

    /// The emulator side, for inspection after a run.
    pub const fn emulator(&self) -> &Machine {
        &self.emulator
    }

    /// The circuit side, for inspection after a run.
    pub const fn circuit(&self) -> &CircuitSimulator {
        &self.circuit
    }

    /// Mutable access to the emulator, e.g. to register watches before a run.
    pub fn emulator_mut(&mut self) -> &mut Machine {
        &mut self.emulator
    }

    /// Mutable access to the circuit simulator.
    pub fn circuit_mut(&mut self) -> &mut CircuitSimulator {
        &mut self.circuit
    }

    /// Fail fast on any unmapped name, before any stepping.
    fn validate_map(&self) -> Result<(), SimError> {
        for (arch, signals) in self.map.entries() {
            if self.emulator.inspect(arch).is_err() {
                return Err(SimError::Correspondence {
                    side: Side::Emulator,
                    name: arch.clone(),
                });
            }
            for signal in signals {
                if self.circuit.inspect(signal).is_err() {
                    return Err(SimError::Correspondence {
                        side: Side::Circuit,
                        name: signal.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn circuit_value(&self, signals: &[String]) -> Result<u64, SimError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        for signal in signals {
            value |= self.circuit.inspect(signal)? << shift;
            shift += self.circuit.width_of(signal)?;
        }
        Ok(value)
    }

    fn compare(&self, step: u64) -> Result<Option<DivergenceReport>, SimError> {
        for (arch, signals) in self.map.entries() {
            let emulator = self.emulator.inspect(arch)?;
            let circuit = self.circuit_value(signals)?;
            if emulator != circuit {
                return Ok(Some(DivergenceReport {
                    step,
                    name: arch.clone(),
                    emulator,
                    circuit,
                }));
            }
        }
        Ok(None)
    }

    fn snapshot(&self) -> Result<BTreeMap<String, u64>, SimError> {
        let mut state = BTreeMap::new();
        for (arch, _) in self.map.entries() {
            let _ = state.insert(arch.clone(), self.emulator.inspect(arch)?);
        }
        Ok(state)
    }
}
