//! Interactive terminal client.

mod domain;
mod formatter;
mod input;
mod runner;
mod ui;

pub use input::{Input, InputError, USAGE, parse};
pub use runner::run_client;
