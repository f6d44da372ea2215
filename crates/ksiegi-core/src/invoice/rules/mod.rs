//! Rule tables for invoice-number recognition.

pub mod patterns;

pub use patterns::{BLACKLIST_PHRASES, BLACKLIST_WORDS};
