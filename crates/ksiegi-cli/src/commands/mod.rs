//! Subcommands of the `ksiegi` binary.

pub mod cells;
pub mod compare;
pub mod config;
pub mod pages;

mod driver;
