//! Run configuration and the commands the binary dispatches to.

pub mod bench_cmd;
pub mod config;

pub use bench_cmd::{RunArgs, export_csv, resolve_config, run, run_with_engine};
pub use config::{DEFAULT_ITERATIONS, HarnessConfig};
