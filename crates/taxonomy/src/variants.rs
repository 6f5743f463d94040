//! Query normalization and OCR-confusion variants.

use tezgah_core::text::to_lower_tr;

/// Confusable character families, checked in this order. Only the first
/// family present in a query is expanded.
const CONFUSABLE_FAMILIES: &[&[char]] = &[
    &['ı', 'i', 'l', '1'],
    &['ğ', 'g'],
    &['ş', 's'],
    &['ç', 'c'],
    &['ö', 'o'],
    &['ü', 'u'],
];

fn is_search_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, 'ç' | 'ğ' | 'ı' | 'ö' | 'ş' | 'ü')
}

/// Lowercase (Turkish rules), replace anything that is not a Turkish letter
/// or digit with a space, and collapse runs of whitespace.
pub fn normalize_query(text: &str) -> String {
    let lowered: String = to_lower_tr(text)
        .chars()
        .map(|c| if is_search_char(c) { c } else { ' ' })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Variants of an already-normalized query produced by swapping one member
/// of the first confusable family found for each of the others.
///
/// Output is deterministic, excludes the query itself and holds at most
/// `n * (n - 1)` entries for a family of `n` characters.
pub fn confusable_variants(normalized: &str) -> Vec<String> {
    let Some(family) = CONFUSABLE_FAMILIES
        .iter()
        .find(|family| normalized.chars().any(|c| family.contains(&c)))
    else {
        return Vec::new();
    };

    let mut variants: Vec<String> = Vec::new();
    for &from in family.iter().filter(|c| normalized.contains(**c)) {
        for &to in family.iter().filter(|c| **c != from) {
            let variant = normalized.replace(from, &to.to_string());
            if variant != normalized && !variants.contains(&variant) {
                variants.push(variant);
            }
        }
    }
    variants
}
