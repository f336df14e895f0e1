//! Cuttlefish binary library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: serve and route
//! - `inspect`: Collection summary and payload field inventory
//! - `sanity`: Scenario check against a running server

pub mod cli;
pub mod commands;
pub mod inspect;
pub mod sanity;

pub use cli::{Cli, Commands};
pub use commands::{build_pipeline, init_tracing, route, serve};
pub use inspect::{inspect, run_inspect, FieldInventory, PayloadShape};
pub use sanity::run_sanity;
