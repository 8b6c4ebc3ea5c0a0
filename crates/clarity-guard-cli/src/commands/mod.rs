//! CLI command implementations.
//!
//! Each command lives in its own sub-module and returns the process exit
//! code; errors bubble up to `main` as `anyhow::Error`.

pub mod fix;
pub mod generate;
pub mod helpers;
pub mod scan;

pub use fix::{cmd_diff, cmd_fix};
pub use generate::{cmd_generate, GenerateFlags};
pub use scan::cmd_scan;
