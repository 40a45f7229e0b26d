// src/normalize.rs - Text normalization for noisy government/patent records
//
// Classification is extremely sensitive to normalization, so every pass here is
// explicit and covered by tests: case folding, diacritic folding, punctuation
// substitution, whitespace collapse, and sanitization of undecodable content.

use crate::models::verdict::DiagnosticFlag;

/// Characters produced by lossy decoding upstream. Stripped, and flagged so the
/// verdict records that the input was damaged.
const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Punctuation folded to whitespace before tokenization. Mirrors the ampersand
/// handling used for organization names: connectors become words, separators
/// become spaces.
const CHAR_SUBSTITUTIONS: [(&str, &str); 10] = [
    ("&", " and "),
    ("+", " plus "),
    ("/", " "),
    ("-", " "),
    (".", " "),
    ("'", ""),
    ("’", ""),
    ("(", " "),
    (")", " "),
    (",", " "),
];

/// Latin diacritics folded to their ASCII base letter. Upstream exports encode
/// the same name inconsistently (e.g. "Universite" vs "Université"), so both
/// forms must normalize identically.
const DIACRITIC_FOLDS: [(char, &str); 33] = [
    ('à', "a"), ('á', "a"), ('â', "a"), ('ã', "a"), ('ä', "a"), ('å', "a"),
    ('ç', "c"),
    ('è', "e"), ('é', "e"), ('ê', "e"), ('ë', "e"),
    ('ì', "i"), ('í', "i"), ('î', "i"), ('ï', "i"),
    ('ñ', "n"),
    ('ò', "o"), ('ó', "o"), ('ô', "o"), ('õ', "o"), ('ö', "o"), ('ø', "o"),
    ('ù', "u"), ('ú', "u"), ('û', "u"), ('ü', "u"),
    ('ý', "y"), ('ÿ', "y"),
    ('š', "s"), ('ž', "z"),
    ('ā', "a"), ('ē', "e"), ('ī', "i"),
];

/// Outcome of normalizing one field. `flags` is empty for clean input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedField {
    pub text: String,
    pub flags: Vec<DiagnosticFlag>,
}

/// Normalize one free-text field: case-fold, strip replacement characters,
/// fold diacritics, substitute punctuation, drop remaining non-alphanumerics,
/// collapse whitespace. Never fails; dirty input degrades to an empty string
/// with a diagnostic flag.
pub fn normalize_text(raw: &str) -> NormalizedField {
    let mut flags = Vec::new();

    let had_content = !raw.trim().is_empty();
    if raw.contains(REPLACEMENT_CHAR) {
        flags.push(DiagnosticFlag::ReplacementCharsStripped);
    }

    let mut normalized = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == REPLACEMENT_CHAR {
            continue;
        }
        for lc in c.to_lowercase() {
            match DIACRITIC_FOLDS.iter().find(|(from, _)| *from == lc) {
                Some((_, to)) => normalized.push_str(to),
                None => normalized.push(lc),
            }
        }
    }

    for (pattern, replacement) in &CHAR_SUBSTITUTIONS {
        if normalized.contains(pattern) {
            normalized = normalized.replace(pattern, replacement);
        }
    }

    normalized = normalized
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

    if had_content && normalized.is_empty() {
        flags.push(DiagnosticFlag::EmptyAfterNormalization);
    }

    NormalizedField {
        text: normalized,
        flags,
    }
}

/// Normalize a country code: trim, uppercase, and reject anything that is not
/// a plausible 2-3 letter alphabetic code. `None` means "treat as absent".
pub fn normalize_country_code(raw: &str) -> Result<Option<String>, DiagnosticFlag> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() < 2 || trimmed.len() > 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DiagnosticFlag::MalformedCountryCode);
    }
    Ok(Some(trimmed.to_ascii_uppercase()))
}

/// Join and normalize a record's address fields into one searchable string.
pub fn normalize_address_fields(fields: &[String]) -> NormalizedField {
    let mut flags = Vec::new();
    let mut parts = Vec::new();
    for field in fields {
        let normalized = normalize_text(field);
        for flag in normalized.flags {
            if !flags.contains(&flag) {
                flags.push(flag);
            }
        }
        if !normalized.text.is_empty() {
            parts.push(normalized.text);
        }
    }
    NormalizedField {
        text: parts.join(" "),
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_fold_and_whitespace_collapse() {
        let n = normalize_text("  Beijing   ACME  Semiconductor ");
        assert_eq!(n.text, "beijing acme semiconductor");
        assert!(n.flags.is_empty());
    }

    #[test]
    fn test_punctuation_substitution() {
        let n = normalize_text("Beijing Acme Semiconductor Co., Ltd.");
        assert_eq!(n.text, "beijing acme semiconductor co ltd");

        let n = normalize_text("AT&T Research");
        assert_eq!(n.text, "at and t research");
    }

    #[test]
    fn test_diacritic_folding() {
        let a = normalize_text("Université de Montréal");
        let b = normalize_text("Universite de Montreal");
        assert_eq!(a.text, b.text);
        assert_eq!(a.text, "universite de montreal");
    }

    #[test]
    fn test_replacement_chars_stripped_and_flagged() {
        let n = normalize_text("Huaw\u{FFFD}ei Technologies");
        assert_eq!(n.text, "huawei technologies");
        assert_eq!(n.flags, vec![DiagnosticFlag::ReplacementCharsStripped]);
    }

    #[test]
    fn test_unnormalizable_field_flagged_not_fatal() {
        let n = normalize_text("\u{FFFD}\u{FFFD}\u{FFFD}");
        assert_eq!(n.text, "");
        assert!(n.flags.contains(&DiagnosticFlag::ReplacementCharsStripped));
        assert!(n.flags.contains(&DiagnosticFlag::EmptyAfterNormalization));
    }

    #[test]
    fn test_already_normalized_is_fixed_point() {
        let once = normalize_text("beijing acme semiconductor co ltd");
        let twice = normalize_text(&once.text);
        assert_eq!(once.text, twice.text);
    }

    #[test]
    fn test_country_code_normalization() {
        assert_eq!(normalize_country_code(" cn ").unwrap(), Some("CN".to_string()));
        assert_eq!(normalize_country_code("Chn").unwrap(), Some("CHN".to_string()));
        assert_eq!(normalize_country_code("").unwrap(), None);
        assert_eq!(normalize_country_code("  ").unwrap(), None);
        assert_eq!(
            normalize_country_code("united states"),
            Err(DiagnosticFlag::MalformedCountryCode)
        );
        assert_eq!(normalize_country_code("C"), Err(DiagnosticFlag::MalformedCountryCode));
        assert_eq!(normalize_country_code("C1"), Err(DiagnosticFlag::MalformedCountryCode));
    }

    #[test]
    fn test_address_fields_joined() {
        let n = normalize_address_fields(&[
            "Nanshan District,".to_string(),
            "SHENZHEN".to_string(),
            "Guangdong Province".to_string(),
        ]);
        assert_eq!(n.text, "nanshan district shenzhen guangdong province");
    }
}
