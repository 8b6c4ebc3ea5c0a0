//! Shared fixtures for the workspace integration tests.

use std::path::PathBuf;

/// `programs/` at the workspace root, holding the fixture contracts.
pub fn programs_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(|root| root.join("programs"))
        .unwrap_or_else(|| PathBuf::from("programs"))
}

/// Read a fixture contract by file name.
pub fn load_program(name: &str) -> std::io::Result<String> {
    std::fs::read_to_string(programs_dir().join(name))
}
