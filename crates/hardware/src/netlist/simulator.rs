//! The chip-level simulator driving a validated netlist.
//!
//! One `step()` is one clock cycle: settle the combinational logic to a fixed
//! point, apply a clock edge to every stateful element using the settled
//! inputs, then settle once more so outputs reflect the post-edge state. The
//! settle pass is capped; exceeding the cap is surfaced as
//! [`SimError::UnstableCircuit`] rather than silently continuing with
//! inconsistent values.

use std::collections::BTreeMap;

use tracing::trace;

use super::signal::NetState;
use super::topology::Netlist;
use crate::common::error::SimError;
use crate::config::Config;
use crate::stats::SimStats;
use crate::trace::{Recorder, StepRecord, parse_indexed};

/// Cycle-by-cycle executor of a wired circuit topology.
///
/// Each instance is self-contained: multiple simulators over identical
/// topologies produce identical traces from identical inputs.
pub struct CircuitSimulator {
    netlist: Netlist,
    state: NetState,
    cycle: u64,
    settle_cap: u32,
    recorder: Recorder,
    stats: SimStats,
}

impl std::fmt::Debug for CircuitSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitSimulator")
            .field("netlist", &self.netlist)
            .field("cycle", &self.cycle)
            .finish()
    }
}

impl CircuitSimulator {
    /// Validate a netlist and wrap it in a simulator.
    ///
    /// The topology is checked once, here: name, driver, width, and
    /// combinational-cycle errors all surface before the first step. The
    /// circuit comes up settled in its reset state.
    ///
    /// # Errors
    ///
    /// [`SimError::Topology`] for a malformed netlist;
    /// [`SimError::UnstableCircuit`] if the initial settle exceeds the cap.
    pub fn new(netlist: Netlist, config: &Config) -> Result<Self, SimError> {
        netlist.validate()?;
        let state = NetState::new(netlist.signals());
        let mut sim = Self {
            netlist,
            state,
            cycle: 0,
            settle_cap: config.settle_cap,
            recorder: Recorder::default(),
            stats: SimStats::new(),
        };
        let _ = sim.settle()?;
        Ok(sim)
    }

    /// Advance exactly one clock cycle and capture a step record of the
    /// watched signals.
    ///
    /// # Errors
    ///
    /// [`SimError::UnstableCircuit`] if either settle pass fails to converge;
    /// the clock edge is not applied in that case.
    pub fn step(&mut self) -> Result<StepRecord, SimError> {
        let passes = self.settle()?;
        for element in self.netlist.elements_mut() {
            if element.is_clocked() {
                element.clock_edge(&self.state);
            }
        }
        let post_passes = self.settle()?;
        self.cycle += 1;
        self.stats.record_cycle(passes.max(post_passes));
        trace!(
            target: "gtsim::sim",
            cycle = self.cycle,
            settle_passes = passes + post_passes,
            "clock"
        );
        let record = self.capture();
        self.recorder.push(record.clone());
        Ok(record)
    }

    /// Current value of a named signal, or of one memory cell via the
    /// `"name[index]"` probe syntax.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSignal`] if the name resolves to neither.
    pub fn inspect(&self, name: &str) -> Result<u64, SimError> {
        if let Some(id) = self.netlist.signal_id(name) {
            return Ok(self.state.get(id));
        }
        if let Some((element, index)) = parse_indexed(name) {
            if let Some(value) = self
                .netlist
                .element_by_name(element)
                .and_then(|e| e.probe(index))
            {
                return Ok(value);
            }
        }
        Err(SimError::UnknownSignal {
            name: name.to_owned(),
        })
    }

    /// Bit-width of a named signal (memory probes report the 8-bit cell).
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSignal`] as for [`inspect`](Self::inspect).
    pub fn width_of(&self, name: &str) -> Result<u32, SimError> {
        if let Some(id) = self.netlist.signal_id(name) {
            return Ok(self.netlist.signals().width(id));
        }
        self.inspect(name).map(|_| 8)
    }

    /// Register a signal (or memory probe) for per-step capture.
    ///
    /// Takes effect from the next step; earlier records are not backfilled.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSignal`] if the name does not resolve.
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

    /// Force every stateful element to its configured initial state, discard
    /// trace history, and re-settle. ROM program contents are preserved.
    ///
    /// # Errors
    ///
    /// [`SimError::UnstableCircuit`] if the post-reset settle exceeds the cap.
    pub fn reset(&mut self) -> Result<(), SimError> {
        for element in self.netlist.elements_mut() {
            element.reset();
        }
        self.state.zero();
        self.cycle = 0;
        self.recorder.clear();
        self.stats = SimStats::new();
        self.settle().map(|_| ())
    }

    /// Install program bytes into the netlist's program store at a byte
    /// origin.
    ///
    /// # Errors
    ///
    /// [`SimError::ProgramTooLarge`] if the image does not fit (checked
    /// before any mutation); [`SimError::Topology`] if the netlist has no
    /// loadable element.
    pub fn load_program(&mut self, bytes: &[u8], origin: usize) -> Result<(), SimError> {
        let store = self
            .netlist
            .elements_mut()
            .iter_mut()
            .find(|e| e.storage_bytes().is_some())
            .ok_or_else(|| SimError::topology("netlist has no program store"))?;
        let capacity = store.storage_bytes().unwrap_or(0);
        if origin + bytes.len() > capacity {
            return Err(SimError::ProgramTooLarge {
                size: bytes.len(),
                origin,
                capacity,
            });
        }
        store.load(bytes, origin);
        self.settle().map(|_| ())
    }

    /// Drive an external input port by element name.
    ///
    /// # Errors
    ///
    /// [`SimError::UnknownSignal`] if no input port has that name.
    pub fn set_input(&mut self, name: &str, value: u64) -> Result<(), SimError> {
        let accepted = self
            .netlist
            .element_by_name_mut(name)
            .is_some_and(|e| e.set_input(value));
        if accepted {
            self.settle().map(|_| ())
        } else {
            Err(SimError::UnknownSignal {
                name: name.to_owned(),
            })
        }
    }

    /// Clock cycles executed since the last reset.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Execution statistics since the last reset.
    pub const fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// Repeatedly evaluate all elements until a full pass changes nothing.
    ///
    /// Every element is evaluated each pass; evaluation is idempotent by the
    /// element contract, so order only affects how fast the fixed point is
    /// reached, never its value.
    fn settle(&mut self) -> Result<u32, SimError> {
        for pass in 1..=self.settle_cap {
            let before = self.state.snapshot();
            for element in self.netlist.elements() {
                element.evaluate(&mut self.state);
            }
            if self.state.changed_since(&before).next().is_none() {
                return Ok(pass);
            }
            if pass == self.settle_cap {
                let unstable: Vec<String> = self
                    .state
                    .changed_since(&before)
                    .map(|i| {
                        self.netlist
                            .signals()
                            .name(super::signal::SignalId(i))
                            .to_owned()
                    })
                    .collect();
                return Err(SimError::UnstableCircuit {
                    iterations: self.settle_cap,
                    unstable,
                });
            }
        }
        // settle_cap is validated at construction; a zero cap can only fail.
        Err(SimError::UnstableCircuit {
            iterations: 0,
            unstable: Vec::new(),
        })
    }

    fn capture(&self) -> StepRecord {
        let mut values = BTreeMap::new();
        for name in self.recorder.watched() {
            // Watched names were validated in watch(); a probe of a cell that
            // has since disappeared simply drops out of the record.
            if let Ok(value) = self.inspect(name) {
                let _ = values.insert(name.clone(), value);
            }
        }
        StepRecord {
            step: self.cycle,
            values,
        }
    }
}
