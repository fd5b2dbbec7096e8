//! Integration tests for the regdump CLI.

use debug_regs as _;
use serde as _;
use tracing as _;
use tracing_subscriber as _;

use std::process::{Command, Output};

use serde_json::Value;

fn regdump(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_regdump"))
        .args(args)
        .output()
        .expect("failed to run regdump")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf-8 output")
}

#[test]
fn groups_lists_supported_groups_in_order() {
    let output = regdump(&["groups", "--isa", "imafdv", "--vlen", "256"]);
    assert!(output.status.success());

    let text = stdout(&output);
    let names: Vec<_> = text
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(
        names,
        [
            "Core",
            "Floating_point",
            "Vector",
            "User_Control_and_Status",
            "Machine_Control_and_Status",
            "Integration_support",
        ]
    );
    assert!(text.starts_with("Hart "));
}

#[test]
fn list_prints_one_line_per_register() {
    let output = regdump(&[
        "list",
        "--isa",
        "im",
        "--xlen",
        "32",
        "--flen",
        "0",
        "--restricted",
        "--view",
        "core",
    ]);
    assert!(output.status.success());

    let text = stdout(&output);
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 17);
    assert!(lines[0].contains("zero"));
    assert!(lines[0].contains("ro"));
    assert!(lines[16].starts_with("0x0010  pc"));
}

#[test]
fn json_report_carries_descriptors_and_diagnostics() {
    let output = regdump(&[
        "list",
        "--isa",
        "if",
        "--flen",
        "32",
        "--restricted",
        "--json",
        "--log-level",
        "error",
    ]);
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(report["description"], "Hart");
    assert_eq!(report["mode"], "Restricted");
    assert_eq!(report["diagnostics"].as_array().map(Vec::len), Some(1));

    let registers = report["registers"].as_array().expect("register array");
    let ft0 = registers
        .iter()
        .find(|reg| reg["name"] == "ft0")
        .expect("ft0 listed");
    assert_eq!(ft0["bits"], 64);
    assert_eq!(ft0["index"], 33);
    assert!(registers.iter().all(|reg| reg.get("slot").is_none()));
}

#[test]
fn coercion_warning_is_logged_to_stderr() {
    let output = regdump(&["list", "--isa", "if", "--flen", "32", "--restricted"]);
    assert!(output.status.success());
    let log = String::from_utf8_lossy(&output.stderr);
    assert!(log.contains("WARN"));
    assert!(log.contains("forcing apparent FPR width to 64 bits"));
}

#[test]
fn invalid_configuration_exits_with_error() {
    let output = regdump(&["list", "--xlen", "128"]);
    assert_eq!(output.status.code(), Some(1));
    let log = String::from_utf8_lossy(&output.stderr);
    assert!(log.contains("unsupported XLEN 128"));
}

#[test]
fn unknown_command_prints_usage() {
    let output = regdump(&["dump"]);
    assert_eq!(output.status.code(), Some(1));
    let log = String::from_utf8_lossy(&output.stderr);
    assert!(log.contains("unknown command: dump"));
    assert!(log.contains("Usage: regdump"));
}

#[test]
fn help_goes_to_stdout() {
    let output = regdump(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("--restricted"));
}
