//! Differential harness tests: lockstep agreement, fault injection,
//! correspondence validation, and divergence reporting.

use std::collections::BTreeMap;

use gtsim_core::common::error::Side;
use gtsim_core::config::Config;
use gtsim_core::harness::{CorrespondenceMap, RunOutcome};
use gtsim_core::{Harness, Machine, SimError, board};
use pretty_assertions::assert_eq;

use crate::common::program::Program;

fn completed(outcome: &RunOutcome) -> &BTreeMap<String, u64> {
    match outcome {
        RunOutcome::Completed { final_state, .. } => final_state,
        RunOutcome::Diverged(report) => panic!("unexpected divergence: {report:?}"),
    }
}

#[test]
fn five_plus_three_agrees_on_both_engines() {
    let config = Config::default();
    let mut harness = Harness::for_board(&config).unwrap();
    let p = Program::new().ld_imm(5).add_imm(3).build();
    let outcome = harness.run(&p, Program::steps_for(2)).unwrap();
    let state = completed(&outcome);
    assert_eq!(state["ac"], 8);
    assert_eq!(harness.emulator().inspect("ac").unwrap(), 8);
    assert_eq!(harness.circuit().inspect("ac").unwrap(), 8);
}

#[test]
fn memory_write_read_back_agrees_at_the_same_boundary() {
    let config = Config::default();
    let mut map = board::correspondence();
    map.add("ram[0x0030]", ["ram[0x0030]"]);
    let mut harness = Harness::new(
        Machine::new(&config),
        board::build(&config).unwrap(),
        map,
        &config,
    );
    let p = Program::new()
        .ld_imm(0xFF)
        .st_ac(0x30)
        .ld_imm(0x00)
        .ld_zp(0x30)
        .build();
    let outcome = harness.run(&p, Program::steps_for(4)).unwrap();
    let state = completed(&outcome);
    assert_eq!(state["ram[0x0030]"], 0xFF);
    assert_eq!(state["ac"], 0xFF);
}

#[test]
fn branches_and_indexed_stores_agree() {
    let config = Config::default();
    let mut harness = Harness::for_board(&config).unwrap();
    // A small loop: count AC down from 3, storing through [Y,X++].
    let p = Program::new()
        .ld_x(0x10) // word 0
        .ld_imm(0x03) // word 1
        .op(
            gtsim_core::isa::Op::St,
            gtsim_core::isa::Mode::YxppOut,
            gtsim_core::isa::BusSrc::Ac,
            0,
        ) // word 2: ram[x++] = ac
        .sub_imm(1) // word 3
        .branch(gtsim_core::isa::Condition::Ne, 0x02) // word 4
        .nop() // word 5: branch shadow
        .build();
    let outcome = harness.run(&p, 20).unwrap();
    let state = completed(&outcome);
    assert_eq!(state["ac"], 0);
    assert_eq!(state["x"], 0x13);
    assert_eq!(
        harness.emulator().inspect("ram[0x10]").unwrap(),
        3,
        "first stored countdown value"
    );
}

#[test]
fn fault_injected_reset_value_diverges_at_step_zero() {
    let mut config = Config::default();
    let _ = config.reset_values.insert("ac".into(), 0x01);
    // The override perturbs only the circuit side; the emulator resets to 0.
    let mut harness = Harness::for_board(&config).unwrap();
    let p = Program::new().nop().build();
    let outcome = harness.run(&p, 4).unwrap();
    match outcome {
        RunOutcome::Diverged(report) => {
            assert_eq!(report.step, 0);
            assert_eq!(report.name, "ac");
            assert_eq!(report.emulator, 0x00);
            assert_eq!(report.circuit, 0x01);
        }
        RunOutcome::Completed { .. } => panic!("fault must be detected"),
    }
}

#[test]
fn correspondence_error_names_the_bad_side_before_stepping() {
    let config = Config::default();

    let mut map = CorrespondenceMap::new();
    map.add("accumulator", ["ac"]);
    let mut harness = Harness::new(
        Machine::new(&config),
        board::build(&config).unwrap(),
        map,
        &config,
    );
    let err = harness.run(&Program::new().nop().build(), 4).unwrap_err();
    assert_eq!(
        err,
        SimError::Correspondence {
            side: Side::Emulator,
            name: "accumulator".into()
        }
    );
    assert_eq!(harness.emulator().instructions(), 0, "must fail fast");

    let mut map = CorrespondenceMap::new();
    map.add("ac", ["accumulator_bus"]);
    let mut harness = Harness::new(
        Machine::new(&config),
        board::build(&config).unwrap(),
        map,
        &config,
    );
    let err = harness.run(&Program::new().nop().build(), 4).unwrap_err();
    assert_eq!(
        err,
        SimError::Correspondence {
            side: Side::Circuit,
            name: "accumulator_bus".into()
        }
    );
}

#[test]
fn multi_signal_mapping_concatenates_counter_nibbles() {
    let config = Config::default();
    let mut map = CorrespondenceMap::new();
    // The 16-bit architectural pc against the four 4-bit counter stages.
    map.add("pc", ["pc0", "pc1", "pc2", "pc3"]);
    map.add("ac", ["ac"]);
    let mut harness = Harness::new(
        Machine::new(&config),
        board::build(&config).unwrap(),
        map,
        &config,
    );
    let p = Program::new().ld_imm(0x05).build();
    let outcome = harness.run(&p, 6).unwrap();
    let state = completed(&outcome);
    assert_eq!(state["pc"], 6);
}

#[test]
fn divergence_report_serializes_for_external_reporting() {
    let report = gtsim_core::harness::DivergenceReport {
        step: 7,
        name: "ac".into(),
        emulator: 8,
        circuit: 9,
    };
    let json = serde_json::to_string(&report).unwrap();
    assert_eq!(json, r#"{"step":7,"name":"ac","emulator":8,"circuit":9}"#);
}

#[test]
fn undefined_encoding_still_agrees_under_continue_policy() {
    let config = Config::default();
    let mut harness = Harness::for_board(&config).unwrap();
    let p = Program::new()
        .ld_imm(0x66)
        .st_ac(0x10)
        .op(
            gtsim_core::isa::Op::St,
            gtsim_core::isa::Mode::DAc,
            gtsim_core::isa::BusSrc::Ram,
            0x10,
        )
        .ld_imm(0x05)
        .build();
    let outcome = harness.run(&p, Program::steps_for(4)).unwrap();
    let state = completed(&outcome);
    assert_eq!(state["ac"], 0x05);
}
