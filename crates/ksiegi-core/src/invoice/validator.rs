//! Plausibility check for recognized invoice/record numbers.

use serde::{Deserialize, Serialize};

use super::rules::patterns::{
    BLACKLIST_PHRASES, BLACKLIST_WORD_PATTERNS, HAS_DIGIT, HAS_SEPARATOR, STRICT_PATTERNS,
};

/// Shortest text the loose shape rule accepts.
pub const MIN_RECORD_LEN: usize = 5;

/// How the shape stage decides after the disqualifiers pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// At least five characters, one digit, and a `/` or `-`.
    Loose,
    /// Must match one of the known ledger number layouts.
    Strict,
}

/// Decides whether a recognized string is a plausible record number.
#[derive(Debug, Clone, Copy)]
pub struct RecordValidator {
    mode: ValidationMode,
}

impl RecordValidator {
    /// Create a validator for the given mode.
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Run the disqualifier stage, then the mode's shape stage.
    pub fn is_plausible_record(&self, text: &str) -> bool {
        if is_disqualified(text) {
            return false;
        }

        match self.mode {
            ValidationMode::Loose => matches_loose_shape(text),
            ValidationMode::Strict => matches_strict_pattern(text),
        }
    }
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new(ValidationMode::Loose)
    }
}

/// True if the text contains a blacklisted phrase or word.
pub fn is_disqualified(text: &str) -> bool {
    let lower = text.trim().to_lowercase();

    if BLACKLIST_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }

    BLACKLIST_WORD_PATTERNS.iter().any(|re| re.is_match(&lower))
}

/// Loose shape rule: length, a digit and a separator.
pub fn matches_loose_shape(text: &str) -> bool {
    let text = text.trim();
    text.chars().count() >= MIN_RECORD_LEN && HAS_DIGIT.is_match(text) && HAS_SEPARATOR.is_match(text)
}

/// Strict rule: one of the ordered ledger layouts.
pub fn matches_strict_pattern(text: &str) -> bool {
    STRICT_PATTERNS.iter().any(|re| re.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_modes_accept_ledger_number() {
        let text = "F/12345/01/02/M1";
        assert!(RecordValidator::new(ValidationMode::Loose).is_plausible_record(text));
        assert!(RecordValidator::new(ValidationMode::Strict).is_plausible_record(text));
    }

    #[test]
    fn test_blacklisted_word_rejected() {
        let text = "sprzedaż 12/2024";
        assert!(matches_loose_shape(text));
        assert!(!RecordValidator::new(ValidationMode::Loose).is_plausible_record(text));
        assert!(!RecordValidator::new(ValidationMode::Strict).is_plausible_record("sprzedaż 01/08/2025"));
    }

    #[test]
    fn test_blacklist_is_whole_word() {
        // "zakupy" is not the blacklisted word "zakup"
        let validator = RecordValidator::new(ValidationMode::Loose);
        assert!(validator.is_plausible_record("zakupy 12/2024"));
        assert!(!validator.is_plausible_record("ZAKUP 12/2024"));
    }

    #[test]
    fn test_blacklisted_phrase_rejected() {
        let validator = RecordValidator::new(ValidationMode::Loose);
        assert!(!validator.is_plausible_record("Towar dla sprzedaży 1/2"));
    }

    #[test]
    fn test_loose_shape_rules() {
        let validator = RecordValidator::new(ValidationMode::Loose);
        assert!(validator.is_plausible_record("FV/2025/8/34"));
        assert!(validator.is_plausible_record("A-123"));
        assert!(!validator.is_plausible_record("1/2"));
        assert!(!validator.is_plausible_record("ABC/DEF"));
        assert!(!validator.is_plausible_record("123456"));
    }

    #[test]
    fn test_strict_patterns() {
        let validator = RecordValidator::new(ValidationMode::Strict);
        for text in ["F/12345/01/02/M1", "12345/01/2024/UP", "123/2024", "1/08/2025"] {
            assert!(validator.is_plausible_record(text), "{text}");
        }
        for text in ["FV/2025/8/34", "invalid text", "random123", "F/WRONG/FORMAT"] {
            assert!(!validator.is_plausible_record(text), "{text}");
        }
    }

    #[test]
    fn test_mode_serde() {
        let mode: ValidationMode = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(mode, ValidationMode::Strict);
        assert_eq!(serde_json::to_string(&ValidationMode::Loose).unwrap(), "\"loose\"");
    }
}
