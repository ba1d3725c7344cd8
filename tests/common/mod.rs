//! Shared helpers for running the `equipswap` binary in integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

/// Path to a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Runs the binary to completion with `args`, logging kept to warnings.
#[allow(clippy::missing_panics_doc)]
pub fn run_equipswap(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_equipswap"))
        .args(args)
        .arg("--quiet")
        .env_remove("EQUIPSWAP_LOG_LEVEL")
        .env_remove("EQUIPSWAP_CONFIG")
        .output()
        .expect("failed to run equipswap")
}

/// Stdout of `output` as a string.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr of `output` as a string.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
