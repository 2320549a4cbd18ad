//! Netlist construction and build-time validation.
//!
//! A [`Netlist`] is built by registering signals and adding elements, then
//! handed to the simulator, which validates it once:
//! 1. **Names:** Signal and element names are unique within their namespace.
//! 2. **Drivers:** Every signal is driven by exactly one element output.
//! 3. **Widths:** Every element's bindings satisfy its width contract.
//! 4. **Cycles:** No combinational cycle without a clocked break. The check
//!    walks the per-element combinational dependency edges, so feedback
//!    through registers, counters, and memory write ports is legal.

use std::collections::HashMap;

use super::element::Element;
use super::signal::{Signal, SignalId, SignalTable};
use crate::common::error::SimError;

/// A set of elements and the signals connecting them.
pub struct Netlist {
    signals: SignalTable,
    by_name: HashMap<String, SignalId>,
    elements: Vec<Box<dyn Element>>,
}

impl std::fmt::Debug for Netlist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Netlist")
            .field("signals", &self.signals.len())
            .field("elements", &self.elements.len())
            .finish()
    }
}

impl Default for Netlist {
    fn default() -> Self {
        Self::new()
    }
}

impl Netlist {
    /// Create an empty netlist.
    pub fn new() -> Self {
        Self {
            signals: SignalTable::default(),
            by_name: HashMap::new(),
            elements: Vec::new(),
        }
    }

    /// Register a named signal of the given bit-width.
    ///
    /// # Errors
    ///
    /// [`SimError::Topology`] for a duplicate name or a width outside 1..=64.
    pub fn signal(&mut self, name: &str, width: u32) -> Result<SignalId, SimError> {
        if !(1..=64).contains(&width) {
            return Err(SimError::topology(format!(
                "signal `{name}`: width {width} outside 1..=64"
            )));
        }
        if self.by_name.contains_key(name) {
            return Err(SimError::topology(format!("duplicate signal `{name}`")));
        }
        let id = self.signals.push(Signal {
            name: name.to_owned(),
            width,
        });
        let _ = self.by_name.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Add an element to the netlist.
    pub fn add<E: Element + 'static>(&mut self, element: E) {
        self.elements.push(Box::new(element));
    }

    /// Look up a signal id by name.
    pub fn signal_id(&self, name: &str) -> Option<SignalId> {
        self.by_name.get(name).copied()
    }

    /// The signal description table.
    pub const fn signals(&self) -> &SignalTable {
        &self.signals
    }

    pub(crate) fn elements(&self) -> &[Box<dyn Element>] {
        &self.elements
    }

    pub(crate) fn elements_mut(&mut self) -> &mut [Box<dyn Element>] {
        &mut self.elements
    }

    pub(crate) fn element_by_name_mut(&mut self, name: &str) -> Option<&mut Box<dyn Element>> {
        self.elements.iter_mut().find(|e| e.name() == name)
    }

    pub(crate) fn element_by_name(&self, name: &str) -> Option<&dyn Element> {
        self.elements
            .iter()
            .find(|e| e.name() == name)
            .map(AsRef::as_ref)
    }

    /// Validate the complete topology. Called once by the simulator before
    /// any evaluation.
    pub(crate) fn validate(&self) -> Result<(), SimError> {
        self.check_element_names()?;
        self.check_bindings()?;
        self.check_drivers()?;
        self.check_combinational_cycles()
    }

    fn check_element_names(&self) -> Result<(), SimError> {
        let mut seen = HashMap::new();
        for element in &self.elements {
            if seen.insert(element.name().to_owned(), ()).is_some() {
                return Err(SimError::topology(format!(
                    "duplicate element `{}`",
                    element.name()
                )));
            }
        }
        Ok(())
    }

    fn check_bindings(&self) -> Result<(), SimError> {
        for element in &self.elements {
            for id in element.inputs().into_iter().chain(element.outputs()) {
                if self.signals.get(id).is_none() {
                    return Err(SimError::topology(format!(
                        "element `{}` is bound to a signal from another netlist",
                        element.name()
                    )));
                }
            }
            element.validate(&self.signals)?;
        }
        Ok(())
    }

    fn check_drivers(&self) -> Result<(), SimError> {
        let mut driver: Vec<Option<&str>> = vec![None; self.signals.len()];
        for element in &self.elements {
            for id in element.outputs() {
                match driver[id.index()] {
                    None => driver[id.index()] = Some(element.name()),
                    Some(other) => {
                        return Err(SimError::topology(format!(
                            "signal `{}` driven by both `{other}` and `{}`",
                            self.signals.name(id),
                            element.name()
                        )));
                    }
                }
            }
        }
        if let Some(undriven) = driver.iter().position(Option::is_none) {
            return Err(SimError::topology(format!(
                "signal `{}` has no driver",
                self.signals.name(SignalId(undriven))
            )));
        }
        Ok(())
    }

    /// Detect combinational cycles by three-color depth-first search over the
    /// signal dependency graph. Edges come from each element's
    /// `comb_edges()`, so clocked breaks are invisible to the walk, exactly
    /// as they are to signal propagation within one cycle.
    fn check_combinational_cycles(&self) -> Result<(), SimError> {
        let n = self.signals.len();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for element in &self.elements {
            for (from, to) in element.comb_edges() {
                adjacency[from.index()].push(to.index());
            }
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let mut color = vec![Color::White; n];

        // Iterative DFS: (node, next-child-index) stack.
        for root in 0..n {
            if color[root] != Color::White {
                continue;
            }
            let mut stack = vec![(root, 0usize)];
            color[root] = Color::Gray;
            while let Some(top) = stack.last_mut() {
                let (node, child) = *top;
                if child < adjacency[node].len() {
                    top.1 += 1;
                    let next = adjacency[node][child];
                    match color[next] {
                        Color::White => {
                            color[next] = Color::Gray;
                            stack.push((next, 0));
                        }
                        Color::Gray => {
                            let cycle: Vec<&str> = stack
                                .iter()
                                .map(|&(i, _)| self.signals.name(SignalId(i)))
                                .collect();
                            return Err(SimError::topology(format!(
                                "combinational cycle with no clocked break through `{}` (path: {})",
                                self.signals.name(SignalId(next)),
                                cycle.join(" -> ")
                            )));
                        }
                        Color::Black => {}
                    }
                } else {
                    color[node] = Color::Black;
                    let _ = stack.pop();
                }
            }
        }
        Ok(())
    }
}
