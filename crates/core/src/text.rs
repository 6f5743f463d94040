//! Turkish-aware case mapping shared by the receipt parser and the
//! category matcher.
//!
//! The default Unicode mappings get the dotted/dotless I pair wrong for
//! Turkish: `'i'.to_uppercase()` is `I` (should be `İ`) and
//! `'İ'.to_lowercase()` is `i` followed by U+0307.

const COMBINING_DOT_ABOVE: char = '\u{0307}';

/// Uppercase with Turkish rules (`i → İ`, `ı → I`).
pub fn to_upper_tr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'i' => out.push('İ'),
            'ı' => out.push('I'),
            COMBINING_DOT_ABOVE => {}
            c => out.extend(c.to_uppercase()),
        }
    }
    out
}

/// Lowercase with Turkish rules (`İ → i`, `I → ı`).
pub fn to_lower_tr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'İ' => out.push('i'),
            'I' => out.push('ı'),
            COMBINING_DOT_ABOVE => {}
            c => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Case-insensitive search key: every I variant collapses to `i`, other
/// letters are lowercased. Turkish diacritics other than the I dot are kept.
///
/// OCR output mixes ASCII `I` and `İ` freely, so a search key must not
/// depend on which one the engine picked.
pub fn fold_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'İ' | 'I' | 'ı' => out.push('i'),
            COMBINING_DOT_ABOVE => {}
            c => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Replace Turkish letters with their undotted/uncedilled ASCII base.
pub fn strip_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ç' => 'c',
            'ğ' => 'g',
            'ı' => 'i',
            'ö' => 'o',
            'ş' => 's',
            'ü' => 'u',
            'Ç' => 'C',
            'Ğ' => 'G',
            'İ' => 'I',
            'Ö' => 'O',
            'Ş' => 'S',
            'Ü' => 'U',
            c => c,
        })
        .collect()
}
