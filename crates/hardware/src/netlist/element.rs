//! The element trait and the primitive element library.
//!
//! Elements are the chips of the netlist: each declares its input and output
//! signal bindings and implements:
//! 1. **`evaluate`:** A pure recomputation of combinational outputs from the
//!    current input values. Idempotent and side-effect-free for unchanged
//!    inputs, which is what lets the simulator settle iteratively.
//! 2. **`clock_edge`:** For stateful elements only — sample inputs into
//!    internal state. Outputs expose the new state on the next `evaluate`.
//! 3. **`comb_edges`:** The input→output pairs that are combinationally
//!    connected. Stateful elements override this so that, e.g., a RAM whose
//!    write port is fed from its own read port is not misreported as a
//!    combinational cycle.
//!
//! The library covers the chip families on the target board: constant
//! drivers, bitwise gates, bus multiplexers, one-hot decoders, bit slices,
//! bus concatenators, write-enabled registers, loadable synchronous counters,
//! ROM, RAM, and an externally driven input port.

use super::signal::{NetState, SignalId, SignalTable, mask};
use crate::common::error::SimError;

/// A logic element wired into a netlist.
///
/// Implementations outside this module are expected (the board supplies its
/// ALU block this way); the trait is the seam between the generic simulator
/// and any schematic-specific chip.
pub trait Element {
    /// Instance name, unique within the netlist.
    fn name(&self) -> &str;

    /// Input signal bindings.
    fn inputs(&self) -> Vec<SignalId>;

    /// Output signal bindings.
    fn outputs(&self) -> Vec<SignalId>;

    /// Check width and binding consistency against the signal table.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Topology`] naming the element and the offending
    /// signal.
    fn validate(&self, table: &SignalTable) -> Result<(), SimError>;

    /// Recompute combinational outputs from current input values.
    fn evaluate(&self, state: &mut NetState);

    /// Input→output pairs that are combinationally connected.
    ///
    /// The default is the full cross product, correct for purely
    /// combinational elements.
    fn comb_edges(&self) -> Vec<(SignalId, SignalId)> {
        let outs = self.outputs();
        self.inputs()
            .into_iter()
            .flat_map(|i| outs.iter().map(move |&o| (i, o)))
            .collect()
    }

    /// Whether this element holds clocked state.
    fn is_clocked(&self) -> bool {
        false
    }

    /// Sample inputs into internal state. Called once per cycle on stateful
    /// elements, after the pre-edge settle.
    fn clock_edge(&mut self, state: &NetState) {
        let _ = state;
    }

    /// Restore internal state to the configured reset value.
    fn reset(&mut self) {}

    /// Read one cell of internal storage, for memory elements.
    fn probe(&self, index: usize) -> Option<u64> {
        let _ = index;
        None
    }

    /// Byte capacity of internal program storage, for loadable elements.
    fn storage_bytes(&self) -> Option<usize> {
        None
    }

    /// Install program bytes at a byte origin. The caller bounds-checks
    /// against [`storage_bytes`](Self::storage_bytes) first.
    fn load(&mut self, bytes: &[u8], origin: usize) {
        let _ = (bytes, origin);
    }

    /// Drive an external input value, for input-port elements. Returns false
    /// if this element is not an input port.
    fn set_input(&mut self, value: u64) -> bool {
        let _ = value;
        false
    }
}

fn require_width(
    table: &SignalTable,
    element: &str,
    id: SignalId,
    want: u32,
) -> Result<(), SimError> {
    let got = table.width(id);
    if got == want {
        Ok(())
    } else {
        Err(SimError::topology(format!(
            "element `{element}`: signal `{}` is {got} bits, expected {want}",
            table.name(id)
        )))
    }
}

// ---------------------------------------------------------------------------
// Combinational primitives
// ---------------------------------------------------------------------------

/// Bitwise function applied by a [`Gate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOp {
    /// Bitwise AND over all inputs.
    And,
    /// Bitwise OR over all inputs.
    Or,
    /// Bitwise XOR over all inputs.
    Xor,
    /// Inverted AND.
    Nand,
    /// Inverted OR.
    Nor,
    /// Inversion of a single input.
    Not,
}

/// N-input bitwise gate. All inputs and the output share one width.
#[derive(Debug)]
pub struct Gate {
    name: String,
    op: GateOp,
    inputs: Vec<SignalId>,
    output: SignalId,
}

impl Gate {
    /// Create a gate applying `op` across `inputs`, driving `output`.
    pub fn new(name: &str, op: GateOp, inputs: Vec<SignalId>, output: SignalId) -> Self {
        Self {
            name: name.to_owned(),
            op,
            inputs,
            output,
        }
    }
}

impl Element for Gate {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.output]
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        let arity_ok = match self.op {
            GateOp::Not => self.inputs.len() == 1,
            _ => self.inputs.len() >= 2,
        };
        if !arity_ok {
            return Err(SimError::topology(format!(
                "gate `{}`: {:?} over {} inputs",
                self.name,
                self.op,
                self.inputs.len()
            )));
        }
        let width = table.width(self.output);
        for &input in &self.inputs {
            require_width(table, &self.name, input, width)?;
        }
        Ok(())
    }

    fn evaluate(&self, state: &mut NetState) {
        let mut vals = self.inputs.iter().map(|&id| state.get(id));
        let first = vals.next().unwrap_or(0);
        let folded = match self.op {
            GateOp::And | GateOp::Nand => vals.fold(first, |acc, v| acc & v),
            GateOp::Or | GateOp::Nor => vals.fold(first, |acc, v| acc | v),
            GateOp::Xor => vals.fold(first, |acc, v| acc ^ v),
            GateOp::Not => first,
        };
        let result = match self.op {
            GateOp::Nand | GateOp::Nor | GateOp::Not => !folded,
            _ => folded,
        };
        state.set(self.output, result);
    }
}

/// Constant driver.
#[derive(Debug)]
pub struct Const {
    name: String,
    value: u64,
    output: SignalId,
}

impl Const {
    /// Drive `output` with the fixed `value`.
    pub fn new(name: &str, value: u64, output: SignalId) -> Self {
        Self {
            name: name.to_owned(),
            value,
            output,
        }
    }
}

impl Element for Const {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.output]
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        let width = table.width(self.output);
        if self.value & !mask(width) != 0 {
            return Err(SimError::topology(format!(
                "const `{}`: value {:#x} exceeds {width}-bit output `{}`",
                self.name,
                self.value,
                table.name(self.output)
            )));
        }
        Ok(())
    }

    fn evaluate(&self, state: &mut NetState) {
        state.set(self.output, self.value);
    }
}

/// N-way bus multiplexer.
///
/// Selects one of the data inputs by the select value. A select beyond the
/// number of data inputs drives 0; this is the library-wide out-of-range
/// policy and the board relies on it for the never-taken branch condition.
#[derive(Debug)]
pub struct Mux {
    name: String,
    select: SignalId,
    data: Vec<SignalId>,
    output: SignalId,
}

impl Mux {
    /// Create a mux selecting among `data` (index 0 first) by `select`.
    pub fn new(name: &str, select: SignalId, data: Vec<SignalId>, output: SignalId) -> Self {
        Self {
            name: name.to_owned(),
            select,
            data,
            output,
        }
    }
}

impl Element for Mux {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        let mut ins = vec![self.select];
        ins.extend(&self.data);
        ins
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.output]
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        if self.data.is_empty() {
            return Err(SimError::topology(format!(
                "mux `{}` has no data inputs",
                self.name
            )));
        }
        let sel_width = table.width(self.select);
        if self.data.len() > 1usize << sel_width.min(32) {
            return Err(SimError::topology(format!(
                "mux `{}`: {}-bit select cannot address {} inputs",
                self.name,
                sel_width,
                self.data.len()
            )));
        }
        let width = table.width(self.output);
        for &input in &self.data {
            require_width(table, &self.name, input, width)?;
        }
        Ok(())
    }

    fn evaluate(&self, state: &mut NetState) {
        let sel = state.get(self.select) as usize;
        let value = self.data.get(sel).map_or(0, |&id| state.get(id));
        state.set(self.output, value);
    }
}

/// One-hot decoder: drives bit `n` of the output bus when the input reads `n`.
#[derive(Debug)]
pub struct Decoder {
    name: String,
    input: SignalId,
    output: SignalId,
}

impl Decoder {
    /// Create a decoder from a binary `input` to a one-hot `output` bus of
    /// width `2^input_width`.
    pub fn new(name: &str, input: SignalId, output: SignalId) -> Self {
        Self {
            name: name.to_owned(),
            input,
            output,
        }
    }
}

impl Element for Decoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        vec![self.input]
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.output]
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        let in_width = table.width(self.input);
        if in_width > 6 {
            return Err(SimError::topology(format!(
                "decoder `{}`: {in_width}-bit input is wider than the 6-bit library limit",
                self.name
            )));
        }
        require_width(table, &self.name, self.output, 1 << in_width)
    }

    fn evaluate(&self, state: &mut NetState) {
        state.set(self.output, 1u64 << state.get(self.input));
    }
}

/// Bit-field extraction: output = `input[lo .. lo + output_width]`.
#[derive(Debug)]
pub struct Slice {
    name: String,
    input: SignalId,
    lo: u32,
    output: SignalId,
}

impl Slice {
    /// Extract the field starting at bit `lo` of `input` into `output`.
    pub fn new(name: &str, input: SignalId, lo: u32, output: SignalId) -> Self {
        Self {
            name: name.to_owned(),
            input,
            lo,
            output,
        }
    }
}

impl Element for Slice {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        vec![self.input]
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.output]
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        let in_width = table.width(self.input);
        let out_width = table.width(self.output);
        if self.lo + out_width > in_width {
            return Err(SimError::topology(format!(
                "slice `{}`: bits {}..{} exceed {}-bit input `{}`",
                self.name,
                self.lo,
                self.lo + out_width,
                in_width,
                table.name(self.input)
            )));
        }
        Ok(())
    }

    fn evaluate(&self, state: &mut NetState) {
        state.set(self.output, state.get(self.input) >> self.lo);
    }
}

/// Bus concatenator, least-significant input first.
#[derive(Debug)]
pub struct Concat {
    name: String,
    inputs: Vec<SignalId>,
    output: SignalId,
}

impl Concat {
    /// Concatenate `inputs` (LSB-first) into `output`.
    pub fn new(name: &str, inputs: Vec<SignalId>, output: SignalId) -> Self {
        Self {
            name: name.to_owned(),
            inputs,
            output,
        }
    }
}

impl Element for Concat {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.output]
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        let total: u32 = self.inputs.iter().map(|&id| table.width(id)).sum();
        if total == table.width(self.output) {
            Ok(())
        } else {
            Err(SimError::topology(format!(
                "concat `{}`: inputs total {total} bits but output `{}` is {} bits",
                self.name,
                table.name(self.output),
                table.width(self.output)
            )))
        }
    }

    fn evaluate(&self, state: &mut NetState) {
        let mut value = 0u64;
        let mut shift = 0u32;
        for &id in &self.inputs {
            value |= state.get(id) << shift;
            shift += state.width_of(id);
        }
        state.set(self.output, value);
    }
}

// ---------------------------------------------------------------------------
// Stateful primitives
// ---------------------------------------------------------------------------

/// Edge-triggered register with a write enable.
///
/// Resets to its configured reset value (0 unless overridden).
#[derive(Debug)]
pub struct Register {
    name: String,
    d: SignalId,
    we: SignalId,
    q: SignalId,
    state: u64,
    reset_value: u64,
}

impl Register {
    /// Create a register sampling `d` when `we` is high, driving `q`.
    pub fn new(name: &str, d: SignalId, we: SignalId, q: SignalId, reset_value: u64) -> Self {
        Self {
            name: name.to_owned(),
            d,
            we,
            q,
            state: reset_value,
            reset_value,
        }
    }
}

impl Element for Register {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        vec![self.d, self.we]
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.q]
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        require_width(table, &self.name, self.d, table.width(self.q))?;
        require_width(table, &self.name, self.we, 1)
    }

    fn evaluate(&self, state: &mut NetState) {
        state.set(self.q, self.state);
    }

    fn comb_edges(&self) -> Vec<(SignalId, SignalId)> {
        Vec::new()
    }

    fn is_clocked(&self) -> bool {
        true
    }

    fn clock_edge(&mut self, state: &NetState) {
        if state.get(self.we) != 0 {
            self.state = state.get(self.d);
        }
    }

    fn reset(&mut self) {
        self.state = self.reset_value;
    }
}

/// Synchronous loadable counter in the 74161 mold.
///
/// At a clock edge: load `p` when `pe` is high, otherwise count when both
/// enables (`cep`, `cet`) are high, otherwise hold. The ripple-carry output
/// `tc` is combinational: high when `cet` is high and the count is at its
/// maximum, which is what lets wider counters be chained from 4-bit stages.
#[derive(Debug)]
pub struct Counter {
    name: String,
    p: SignalId,
    pe: SignalId,
    cep: SignalId,
    cet: SignalId,
    q: SignalId,
    tc: SignalId,
    state: u64,
    reset_value: u64,
}

impl Counter {
    /// Create a counter with load bus `p`, load enable `pe`, count enables
    /// `cep`/`cet`, count output `q`, and ripple carry `tc`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        p: SignalId,
        pe: SignalId,
        cep: SignalId,
        cet: SignalId,
        q: SignalId,
        tc: SignalId,
        reset_value: u64,
    ) -> Self {
        Self {
            name: name.to_owned(),
            p,
            pe,
            cep,
            cet,
            q,
            tc,
            state: reset_value,
            reset_value,
        }
    }
}

impl Element for Counter {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        vec![self.p, self.pe, self.cep, self.cet]
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.q, self.tc]
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        require_width(table, &self.name, self.p, table.width(self.q))?;
        require_width(table, &self.name, self.pe, 1)?;
        require_width(table, &self.name, self.cep, 1)?;
        require_width(table, &self.name, self.cet, 1)?;
        require_width(table, &self.name, self.tc, 1)
    }

    fn evaluate(&self, state: &mut NetState) {
        let top = mask(state.width_of(self.q));
        let tc = u64::from(state.get(self.cet) != 0 && self.state == top);
        state.set(self.q, self.state);
        state.set(self.tc, tc);
    }

    fn comb_edges(&self) -> Vec<(SignalId, SignalId)> {
        // Only the carry chain is combinational; q is pure state.
        vec![(self.cet, self.tc)]
    }

    fn is_clocked(&self) -> bool {
        true
    }

    fn clock_edge(&mut self, state: &NetState) {
        if state.get(self.pe) != 0 {
            self.state = state.get(self.p);
        } else if state.get(self.cep) != 0 && state.get(self.cet) != 0 {
            self.state = (self.state + 1) & mask(state.width_of(self.q));
        }
    }

    fn reset(&mut self) {
        self.state = self.reset_value;
    }
}

/// Word-addressed program ROM with one 8-bit output port per byte of the
/// word. For the target board the word is two bytes: opcode then operand.
///
/// Contents survive [`reset`](Element::reset); they are program, not state.
#[derive(Debug)]
pub struct Rom {
    name: String,
    addr: SignalId,
    ports: Vec<SignalId>,
    data: Vec<u8>,
}

impl Rom {
    /// Create a ROM of `words` words addressed by `addr`, with one output
    /// port per byte of the word, zero-filled until loaded.
    pub fn new(name: &str, addr: SignalId, ports: Vec<SignalId>, words: usize) -> Self {
        let bytes = words * ports.len();
        Self {
            name: name.to_owned(),
            addr,
            ports,
            data: vec![0; bytes],
        }
    }
}

impl Element for Rom {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        vec![self.addr]
    }

    fn outputs(&self) -> Vec<SignalId> {
        self.ports.clone()
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        if self.ports.is_empty() {
            return Err(SimError::topology(format!(
                "rom `{}` has no output ports",
                self.name
            )));
        }
        for &port in &self.ports {
            require_width(table, &self.name, port, 8)?;
        }
        let words = self.data.len() / self.ports.len();
        let span = 1usize
            .checked_shl(table.width(self.addr))
            .unwrap_or(usize::MAX);
        if span > words {
            return Err(SimError::topology(format!(
                "rom `{}`: {}-bit address exceeds {words} stored words",
                self.name,
                table.width(self.addr)
            )));
        }
        Ok(())
    }

    fn evaluate(&self, state: &mut NetState) {
        let word = state.get(self.addr) as usize * self.ports.len();
        for (i, &port) in self.ports.iter().enumerate() {
            let byte = self.data.get(word + i).copied().unwrap_or(0);
            state.set(port, u64::from(byte));
        }
    }

    fn probe(&self, index: usize) -> Option<u64> {
        self.data.get(index).copied().map(u64::from)
    }

    fn storage_bytes(&self) -> Option<usize> {
        Some(self.data.len())
    }

    fn load(&mut self, bytes: &[u8], origin: usize) {
        if let Some(slot) = self.data.get_mut(origin..origin + bytes.len()) {
            slot.copy_from_slice(bytes);
        }
    }
}

/// Byte-wide RAM with a combinational read port and a clocked write port.
///
/// The address input is masked to `addr_bits`. Reads before any write return
/// 0: contents are deterministically zeroed at construction and on reset.
#[derive(Debug)]
pub struct Ram {
    name: String,
    addr: SignalId,
    din: SignalId,
    we: SignalId,
    q: SignalId,
    addr_bits: u32,
    mem: Vec<u8>,
}

impl Ram {
    /// Create a RAM of `2^addr_bits` cells with read output `q` and a write
    /// port (`din`, `we`) effective at clock edges.
    pub fn new(
        name: &str,
        addr: SignalId,
        din: SignalId,
        we: SignalId,
        q: SignalId,
        addr_bits: u32,
    ) -> Self {
        Self {
            name: name.to_owned(),
            addr,
            din,
            we,
            q,
            addr_bits,
            mem: vec![0; 1 << addr_bits],
        }
    }

    fn cell(&self, state: &NetState) -> usize {
        (state.get(self.addr) & mask(self.addr_bits)) as usize
    }
}

impl Element for Ram {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        vec![self.addr, self.din, self.we]
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.q]
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        require_width(table, &self.name, self.din, 8)?;
        require_width(table, &self.name, self.q, 8)?;
        require_width(table, &self.name, self.we, 1)
    }

    fn evaluate(&self, state: &mut NetState) {
        let value = self.mem.get(self.cell(state)).copied().unwrap_or(0);
        state.set(self.q, u64::from(value));
    }

    fn comb_edges(&self) -> Vec<(SignalId, SignalId)> {
        // The write port is sampled at the edge; only addr→q is combinational.
        vec![(self.addr, self.q)]
    }

    fn is_clocked(&self) -> bool {
        true
    }

    fn clock_edge(&mut self, state: &NetState) {
        if state.get(self.we) != 0 {
            let cell = self.cell(state);
            let value = state.get(self.din) as u8;
            if let Some(slot) = self.mem.get_mut(cell) {
                *slot = value;
            }
        }
    }

    fn reset(&mut self) {
        self.mem.fill(0);
    }

    fn probe(&self, index: usize) -> Option<u64> {
        self.mem.get(index).copied().map(u64::from)
    }
}

/// Externally driven input port.
///
/// Stands in for a latch a peripheral would drive; an external collaborator
/// sets its value between steps via
/// [`CircuitSimulator::set_input`](super::simulator::CircuitSimulator::set_input).
#[derive(Debug)]
pub struct InputPort {
    name: String,
    output: SignalId,
    value: u64,
}

impl InputPort {
    /// Create an input port driving `output`, initially 0.
    pub fn new(name: &str, output: SignalId) -> Self {
        Self {
            name: name.to_owned(),
            output,
            value: 0,
        }
    }
}

impl Element for InputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.output]
    }

    fn validate(&self, _table: &SignalTable) -> Result<(), SimError> {
        Ok(())
    }

    fn evaluate(&self, state: &mut NetState) {
        state.set(self.output, self.value);
    }

    fn reset(&mut self) {
        self.value = 0;
    }

    fn set_input(&mut self, value: u64) -> bool {
        self.value = value;
        true
    }
}
