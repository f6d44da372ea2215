//! Regex patterns and word lists for invoice-number recognition.

use lazy_static::lazy_static;
use regex::Regex;

/// Multi-word phrases that disqualify a candidate (substring match, lower-case).
pub const BLACKLIST_PHRASES: &[&str] = &[
    "py dla sprzedaży wyłącznie",
    "dla sprzedaży wyłącznie",
    "dla sprzedaży",
    "sprzedaży wyłącznie",
    "wyłącznie dla sprzedaży",
    "materiały do sprzedaży",
    "przeznaczone do sprzedaży",
    "artykuły do sprzedaży",
];

/// Single words that disqualify a candidate (whole-word match, lower-case).
pub const BLACKLIST_WORDS: &[&str] = &[
    "usług",
    "zakupu",
    "naturze",
    "sprzedaż",
    "towarów",
    "zakup",
    "spółka",
    "materiałów",
    "artykułów",
    "przeznaczone",
];

lazy_static! {
    // Ledger invoice-number layouts, tried in order
    pub static ref STRICT_PATTERNS: Vec<Regex> = [
        r"\bF/\d{5}/\d{2}/\d{2}/M1\b",
        r"\b\d{5}/\d{2}/\d{4}/UP\b",
        r"\b\d{5}/\d{2}\b",
        r"\b\d{3}/\d{4}\b",
        r"\bF/M\d{2}/\d{7}/\d{2}/\d{2}\b",
        r"\b\d{2}/\d{2}/\d{4}\b",
        r"\b\d{1,2}/\d{2}/\d{4}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    pub static ref BLACKLIST_WORD_PATTERNS: Vec<Regex> = BLACKLIST_WORDS
        .iter()
        .map(|w| Regex::new(&format!(r"\b{}\b", regex::escape(w))).unwrap())
        .collect();

    pub static ref HAS_DIGIT: Regex = Regex::new(r"\d").unwrap();

    pub static ref HAS_SEPARATOR: Regex = Regex::new(r"[/-]").unwrap();
}
