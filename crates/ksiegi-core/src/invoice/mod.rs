//! Invoice-number recognition: validation and record extraction.

mod records;
pub mod rules;
mod validator;

pub use records::{clean_record_text, extract_records};
pub use validator::{
    RecordValidator, ValidationMode, MIN_RECORD_LEN, is_disqualified, matches_loose_shape,
    matches_strict_pattern,
};
