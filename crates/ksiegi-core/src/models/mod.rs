//! Data models and configuration.

pub mod config;
pub mod record;

pub use config::KsiegiConfig;
pub use record::{Cell, CellResult, ComparisonRow, ComparisonStatus, PageLine, PageResult, Record};
