//! The board's ALU block as a single combinational element.
//!
//! The physical ALU is an operand-selection network feeding an 8-bit adder
//! chain; this element models that cluster at the same chip-level
//! abstraction as the rest of the library. Logic operations bypass the
//! carry; add/subtract/negate run through the adder, whose carry out doubles
//! as the zero flag during a branch (negating AC overflows exactly when AC
//! is zero).

use crate::common::error::SimError;
use crate::netlist::element::Element;
use crate::netlist::signal::{NetState, SignalId, SignalTable};

/// Operation encoding shared with the instruction word's operation field.
const OP_LD: u64 = 0;
const OP_AND: u64 = 1;
const OP_OR: u64 = 2;
const OP_XOR: u64 = 3;
const OP_ADD: u64 = 4;
const OP_SUB: u64 = 5;
const OP_ST: u64 = 6;

/// The ALU block: `a` (accumulator side), `b` (bus side), 3-bit `op`;
/// result `f` and adder carry `co`.
#[derive(Debug)]
pub struct AluUnit {
    name: String,
    a: SignalId,
    b: SignalId,
    op: SignalId,
    f: SignalId,
    co: SignalId,
}

impl AluUnit {
    /// Bind the ALU block to its operand, op-select, and result signals.
    pub fn new(
        name: &str,
        a: SignalId,
        b: SignalId,
        op: SignalId,
        f: SignalId,
        co: SignalId,
    ) -> Self {
        Self {
            name: name.to_owned(),
            a,
            b,
            op,
            f,
            co,
        }
    }
}

impl Element for AluUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<SignalId> {
        vec![self.a, self.b, self.op]
    }

    fn outputs(&self) -> Vec<SignalId> {
        vec![self.f, self.co]
    }

    fn validate(&self, table: &SignalTable) -> Result<(), SimError> {
        for (id, want) in [
            (self.a, 8),
            (self.b, 8),
            (self.op, 3),
            (self.f, 8),
            (self.co, 1),
        ] {
            if table.width(id) != want {
                return Err(SimError::topology(format!(
                    "alu `{}`: signal `{}` is {} bits, expected {want}",
                    self.name,
                    table.name(id),
                    table.width(id)
                )));
            }
        }
        Ok(())
    }

    fn evaluate(&self, state: &mut NetState) {
        let a = state.get(self.a);
        let b = state.get(self.b);
        let (sum, carry) = match state.get(self.op) {
            OP_LD | OP_ST => (b, 0),
            OP_AND => (a & b, 0),
            OP_OR => (a | b, 0),
            OP_XOR => (a ^ b, 0),
            OP_ADD => {
                let s = a + b;
                (s, s >> 8)
            }
            OP_SUB => {
                let s = a + (b ^ 0xff) + 1;
                (s, s >> 8)
            }
            // Branch: the adder computes -AC; the carry out is the Z flag.
            _ => {
                let s = (a ^ 0xff) + 1;
                (s, s >> 8)
            }
        };
        state.set(self.f, sum);
        state.set(self.co, carry);
    }
}
