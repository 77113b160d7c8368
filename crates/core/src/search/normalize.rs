//! Text canonicalization shared by indexing, grouping and recommendation.

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("invalid number pattern"));

static NOISE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:full cream|milk|product|new|pack|original)\b")
        .expect("invalid noise word pattern")
});

/// Unit keywords, multi-character units first so that `ml` is never read as
/// `l` nor `kg` as `g`.
const UNIT_KEYWORDS: &[(&str, &[&str])] = &[
    ("ml", &["ml", "millilitre", "milliliter", "millilitres", "milliliters"]),
    ("kg", &["kg", "kgs", "kilo", "kilogram", "kilograms"]),
    ("l", &["l", "lt", "ltr", "litre", "liter", "litres", "liters"]),
    ("g", &["g", "gm", "gms", "gr", "gram", "grams"]),
    ("pcs", &["pc", "pcs", "piece", "pieces"]),
];

/// Lowercases, drops ASCII punctuation and collapses whitespace.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|ch| !ch.is_ascii_punctuation())
        .collect();
    collapse_whitespace(&stripped)
}

/// First numeric value in `text` and its canonical unit (`ml`, `l`, `g`,
/// `kg`, `pcs` or empty). Quantity is 0.0 when no number is present.
pub fn extract_quantity_unit(text: &str) -> (f64, &'static str) {
    let lowered = text.to_lowercase();
    let Some(number) = NUMBER_PATTERN.find(&lowered) else {
        return (0.0, scan_unit_words(&lowered));
    };

    let quantity = number.as_str().parse::<f64>().unwrap_or(0.0);
    let suffix: String = lowered[number.end()..]
        .trim_start()
        .chars()
        .take_while(|ch| ch.is_ascii_alphabetic())
        .collect();

    match classify_unit(&suffix) {
        "" => (quantity, scan_unit_words(&lowered)),
        unit => (quantity, unit),
    }
}

/// Canonical unit for a single unit word, empty when unrecognised.
pub fn classify_unit(word: &str) -> &'static str {
    let word = word.trim().trim_end_matches('.').to_lowercase();
    if word.is_empty() {
        return "";
    }

    UNIT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.contains(&word.as_str()))
        .map(|(unit, _)| *unit)
        .unwrap_or("")
}

/// `normalize` followed by removal of words that carry no identity for
/// cross-store matching.
pub fn clean_name(text: &str) -> String {
    let normalized = normalize(text);
    collapse_whitespace(&NOISE_PATTERN.replace_all(&normalized, " "))
}

/// Drops a trailing bracketed annotation such as a store branch tag.
pub fn strip_bracketed_suffix(name: &str) -> &str {
    name.split('[').next().unwrap_or(name).trim()
}

fn scan_unit_words(lowered: &str) -> &'static str {
    let words: Vec<&str> = lowered
        .split(|ch: char| !ch.is_alphanumeric())
        .map(|word| word.trim_start_matches(|ch: char| ch.is_ascii_digit()))
        .filter(|word| !word.is_empty())
        .collect();

    UNIT_KEYWORDS
        .iter()
        .find(|(_, keywords)| words.iter().any(|word| keywords.contains(word)))
        .map(|(unit, _)| *unit)
        .unwrap_or("")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
