//! Trace/watch subsystem shared by both engines.
//!
//! Observation is decoupled from execution: an engine owns a [`Recorder`],
//! callers register names with `watch`, and every step appends one
//! [`StepRecord`] containing only the watched names. Watches registered
//! mid-run take effect from the next record on; earlier records are not
//! backfilled — a name absent from a record's map means it was not watched
//! when that record was captured.

use std::collections::BTreeMap;

use serde::Serialize;

/// A single point-in-time snapshot of watched values.
///
/// The ordered sequence of step records since the last reset forms the trace.
/// This in-memory shape (a sequence of name→value maps) is the contract
/// external tools rely on; on-disk persistence is their concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Step index: clock cycle for the circuit, instruction count for the
    /// emulator. 1-based; a record is captured after its step completes.
    pub step: u64,
    /// Watched name → value at this step.
    pub values: BTreeMap<String, u64>,
}

/// Append-only store of watched names and their per-step records.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    watches: Vec<String>,
    records: Vec<StepRecord>,
}

impl Recorder {
    /// Register a name for capture. Callers validate the name against their
    /// engine first; duplicates are ignored.
    pub fn watch(&mut self, name: &str) {
        if !self.watches.iter().any(|w| w == name) {
            self.watches.push(name.to_owned());
        }
    }

    /// Names currently being captured, in registration order.
    pub fn watched(&self) -> &[String] {
        &self.watches
    }

    /// Append a completed record.
    pub fn push(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    /// The full ordered trace since the last [`clear`](Self::clear).
    pub fn trace(&self) -> &[StepRecord] {
        &self.records
    }

    /// Discard recorded history, keeping the watch list.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Serialize the trace to JSON (an array of step records).
    ///
    /// # Errors
    ///
    /// Propagates serializer failures; with these value types none occur in
    /// practice.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.records)
    }
}

/// Split an indexed probe name like `"ram[0x1234]"` into its element name and
/// cell index. Accepts decimal and `0x` hexadecimal indices. Returns `None`
/// for plain names.
pub(crate) fn parse_indexed(name: &str) -> Option<(&str, usize)> {
    let open = name.find('[')?;
    let inner = name.get(open + 1..name.len().checked_sub(1)?)?;
    if !name.ends_with(']') || inner.is_empty() {
        return None;
    }
    let index = inner.strip_prefix("0x").map_or_else(
        || inner.parse::<usize>().ok(),
        |hex| usize::from_str_radix(hex, 16).ok(),
    )?;
    Some((&name[..open], index))
}
