//! Receipt text → [`ParsedReceipt`].
//!
//! Merchant and total are resolved by ordered strategy cascades: each
//! strategy either produces a field or passes, and the first one that
//! produces wins. Nothing here returns an error; a field that cannot be
//! found comes back with confidence 0.

use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use tezgah_core::text::{fold_case, strip_diacritics};
use tezgah_core::{ExtractedField, Money};

use crate::merchant::{CatalogError, MerchantCatalog};
use crate::normalize::normalize;
use crate::price::{is_numeric, is_price_shaped, last_price, parse_price};
use crate::types::{ParsedLineItem, ParsedReceipt, ITEM_CONFIDENCE};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_date, r"\b(\d{1,2})[./-](\d{1,2})[./-](\d{4})\b");
re!(re_tax_total, r"TOPLAM\s*KDV|KDV\s*TOPLAM|KDV\s*TUTAR");

// ── Tunables ─────────────────────────────────────────────────────────────────

/// Header lines searched for a catalog merchant.
const MERCHANT_HEADER_LINES: usize = 5;
/// Items are read from lines strictly after this index.
const ITEM_HEADER_END: usize = 2;

const TOTAL_KEYWORDS: &[&str] = &["TOPLAM", "TOPLAN", "TUTAR", "ODENECEK", "ÖDENECEK"];
/// Matched against [`Line::folded`], so `Fiş`, `FİS` and `FIS` all hit.
const ITEM_SKIP_MARKERS: &[&str] = &["kdv", "fis", "tarih"];

const FIRST_LINE_MERCHANT_CONFIDENCE: f32 = 0.2;
const DATE_CONFIDENCE: f32 = 0.9;
const TOTAL_SAME_LINE_CONFIDENCE: f32 = 0.85;
const TOTAL_NEXT_LINE_CONFIDENCE: f32 = 0.8;
const TOTAL_FALLBACK_CONFIDENCE: f32 = 0.4;

// ── Lines ────────────────────────────────────────────────────────────────────

/// A trimmed, non-empty receipt line. `index` counts only such lines.
#[derive(Debug)]
struct Line<'a> {
    index: usize,
    raw: &'a str,
    /// `normalize(raw)`, used for keyword search.
    upper: String,
    /// Case-folded ASCII form, used for marker search.
    folded: String,
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(index, raw)| Line {
            index,
            raw,
            upper: normalize(raw),
            folded: strip_diacritics(&fold_case(raw)),
        })
        .collect()
}

// ── Strategy cascade ─────────────────────────────────────────────────────────

struct Strategy<T> {
    name: &'static str,
    run: fn(&ReceiptParser, &[Line<'_>]) -> Option<ExtractedField<T>>,
}

fn first_hit<T>(
    field: &'static str,
    strategies: &[Strategy<T>],
    parser: &ReceiptParser,
    lines: &[Line<'_>],
) -> Option<ExtractedField<T>> {
    strategies.iter().find_map(|s| {
        let hit = (s.run)(parser, lines)?;
        tracing::debug!(field, strategy = s.name, confidence = hit.confidence, line = ?hit.source_line, "field extracted");
        Some(hit)
    })
}

#[derive(Debug, Clone, PartialEq)]
struct MerchantGuess {
    name: String,
    key: Option<String>,
}

const MERCHANT_STRATEGIES: &[Strategy<MerchantGuess>] = &[
    Strategy { name: "catalog_header", run: merchant_from_catalog },
    Strategy { name: "first_line", run: merchant_from_first_line },
];

const TOTAL_STRATEGIES: &[Strategy<Money>] = &[
    Strategy { name: "keyword_line", run: total_from_keywords },
    Strategy { name: "largest_in_bottom_half", run: total_from_bottom_half },
];

// ── Parser ───────────────────────────────────────────────────────────────────

/// Parses OCR text of Turkish retail receipts.
///
/// Output depends only on the input text, the catalog and the reference
/// date used when no date is printed.
#[derive(Debug, Clone)]
pub struct ReceiptParser {
    catalog: MerchantCatalog,
    reference_date: Option<NaiveDate>,
}

impl ReceiptParser {
    pub fn new(catalog: MerchantCatalog) -> Self {
        Self { catalog, reference_date: None }
    }

    /// A parser over the built-in merchant catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Ok(Self::new(MerchantCatalog::builtin()?))
    }

    /// Date reported (at confidence 0) for receipts without a readable
    /// date. Defaults to today's local date at parse time.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn catalog(&self) -> &MerchantCatalog {
        &self.catalog
    }

    pub fn parse(&self, text: &str) -> ParsedReceipt {
        let lines = split_lines(text);

        let (merchant, merchant_key) = match first_hit("merchant", MERCHANT_STRATEGIES, self, &lines) {
            Some(guess) => {
                let key = guess.value.key.clone();
                (guess.map(|g| g.name), key)
            }
            None => (ExtractedField::missing(String::new()), None),
        };

        let date = self.extract_date(&lines);
        let total = first_hit("total", TOTAL_STRATEGIES, self, &lines)
            .unwrap_or_else(|| ExtractedField::missing(Money::zero()));
        let items = extract_items(&lines, date.source_line, total.source_line);

        ParsedReceipt { merchant, merchant_key, date, total, items, raw_text: text.to_string() }
    }

    fn extract_date(&self, lines: &[Line<'_>]) -> ExtractedField<NaiveDate> {
        lines
            .iter()
            .find_map(|line| {
                re_date()
                    .captures_iter(line.raw)
                    .find_map(|c| {
                        let day: u32 = c.get(1)?.as_str().parse().ok()?;
                        let month: u32 = c.get(2)?.as_str().parse().ok()?;
                        let year: i32 = c.get(3)?.as_str().parse().ok()?;
                        receipt_date(day, month, year)
                    })
                    .map(|d| ExtractedField::at_line(d, DATE_CONFIDENCE, line.index))
            })
            .unwrap_or_else(|| ExtractedField::missing(self.fallback_date()))
    }

    fn fallback_date(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Local::now().date_naive())
    }
}

fn receipt_date(day: u32, month: u32, year: i32) -> Option<NaiveDate> {
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) || !(2000..=2099).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

// ── Merchant ─────────────────────────────────────────────────────────────────

fn merchant_from_catalog(parser: &ReceiptParser, lines: &[Line<'_>]) -> Option<ExtractedField<MerchantGuess>> {
    lines.iter().take(MERCHANT_HEADER_LINES).find_map(|line| {
        let hit = parser.catalog.find(line.raw)?;
        let guess = MerchantGuess {
            name: hit.merchant.display_name.clone(),
            key: Some(hit.merchant.key.clone()),
        };
        Some(ExtractedField::at_line(guess, hit.confidence, line.index))
    })
}

/// Receipts print the store name first; use it when the catalog has nothing.
fn merchant_from_first_line(_: &ReceiptParser, lines: &[Line<'_>]) -> Option<ExtractedField<MerchantGuess>> {
    let line = lines.first()?;
    let guess = MerchantGuess { name: line.raw.to_string(), key: None };
    Some(ExtractedField::at_line(guess, FIRST_LINE_MERCHANT_CONFIDENCE, line.index))
}

// ── Total ────────────────────────────────────────────────────────────────────

/// Grand-total keyword lines, never the tax subtotal (`TOPLAM KDV`).
fn is_total_line(line: &Line<'_>) -> bool {
    TOTAL_KEYWORDS.iter().any(|k| line.upper.contains(k)) && !re_tax_total().is_match(&line.upper)
}

/// The first total-keyword line from the top wins, so an `ARA TOPLAM`
/// subtotal printed above `GENEL TOPLAM` is taken as the total.
fn total_from_keywords(_: &ReceiptParser, lines: &[Line<'_>]) -> Option<ExtractedField<Money>> {
    lines.iter().enumerate().find_map(|(pos, line)| {
        if !is_total_line(line) {
            return None;
        }
        if let Some(amount) = last_price(line.raw) {
            return Some(ExtractedField::at_line(amount, TOTAL_SAME_LINE_CONFIDENCE, line.index));
        }
        // Amount printed under the label.
        let next = lines.get(pos + 1).filter(|n| !re_tax_total().is_match(&n.upper))?;
        let amount = last_price(next.raw)?;
        Some(ExtractedField::at_line(amount, TOTAL_NEXT_LINE_CONFIDENCE, next.index))
    })
}

/// Last resort: the largest amount in the lower half of the receipt,
/// tax subtotal lines excluded.
fn total_from_bottom_half(_: &ReceiptParser, lines: &[Line<'_>]) -> Option<ExtractedField<Money>> {
    let mut best: Option<(Money, usize)> = None;
    for line in &lines[lines.len() / 2..] {
        if re_tax_total().is_match(&line.upper) {
            continue;
        }
        for amount in line.raw.split_whitespace().filter_map(parse_price) {
            if best.map_or(true, |(b, _)| amount > b) {
                best = Some((amount, line.index));
            }
        }
    }
    best.map(|(amount, index)| ExtractedField::at_line(amount, TOTAL_FALLBACK_CONFIDENCE, index))
}

// ── Items ────────────────────────────────────────────────────────────────────

fn extract_items(lines: &[Line<'_>], date_line: Option<usize>, total_line: Option<usize>) -> Vec<ParsedLineItem> {
    let end = total_line.unwrap_or(lines.len());
    lines
        .iter()
        .filter(|l| l.index > ITEM_HEADER_END && l.index < end)
        .filter(|l| Some(l.index) != date_line)
        .filter(|l| !ITEM_SKIP_MARKERS.iter().any(|m| l.folded.contains(m)))
        .filter_map(|l| {
            let (raw_name, unit_price) = parse_item_line(l.raw)?;
            Some(ParsedLineItem {
                raw_name,
                quantity: 1,
                unit_price,
                confidence: ITEM_CONFIDENCE,
                source_line: l.index,
            })
        })
        .collect()
}

/// `NAME ... PRICE [TAX-CODE]` → (name, price).
fn parse_item_line(line: &str) -> Option<(String, Money)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }

    // A short trailing token is a tax-code marker (`%8`, `*1`, `B`).
    let mut price_pos = tokens.len() - 1;
    if tokens[price_pos].chars().count() <= 3 {
        price_pos -= 1;
    }
    let price = parse_price(tokens[price_pos])?;

    let mut name_tokens = &tokens[..price_pos];
    while let Some((last, rest)) = name_tokens.split_last() {
        if is_price_shaped(last) || is_numeric(last) || last.chars().count() < 2 {
            name_tokens = rest;
        } else {
            break;
        }
    }

    let name = name_tokens.join(" ");
    if name.chars().count() < 3 {
        return None;
    }
    Some((name, price))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const BIM_RECEIPT: &str = "\
BIM BIRLESIK MAGAZALAR A.S.
ANKARA CAD. NO:12 ISTANBUL
TARIH: 15.03.2024 SAAT: 18:42
FIS NO: 0042
EKMEK 5,00 %1
PINAR SUT 1L 32,50 %1
DOMATES KG 2 24,90 %1
DETERJAN 3KG 180,00 %20
TOPLAM KDV 12,50
TOPLAM *242,40
NAKIT 250,00
PARA USTU 7,60";

    fn parser() -> ReceiptParser {
        ReceiptParser::builtin()
            .unwrap()
            .with_reference_date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── Full receipt ─────────────────────────────────────────────────────────

    #[test]
    fn parses_full_receipt() {
        let r = parser().parse(BIM_RECEIPT);

        assert_eq!(r.merchant.value, "BİM");
        assert_eq!(r.merchant_key.as_deref(), Some("bim"));
        assert_eq!(r.merchant.confidence, 0.9);

        assert_eq!(r.date.value, ymd(2024, 3, 15));
        assert_eq!(r.date.source_line, Some(2));

        assert_eq!(r.total.value, Money::from_cents(24240));
        assert_eq!(r.total.confidence, 0.85);
        assert_eq!(r.total.source_line, Some(9));

        let names: Vec<&str> = r.items.iter().map(|i| i.raw_name.as_str()).collect();
        assert_eq!(names, vec!["EKMEK", "PINAR SUT 1L", "DOMATES KG", "DETERJAN 3KG"]);
        assert_eq!(r.items[2].unit_price, Money::from_cents(2490));
        assert!(r.items.iter().all(|i| i.quantity == 1 && i.confidence == 0.7));
        assert_eq!(r.raw_text, BIM_RECEIPT);
    }

    #[test]
    fn parse_is_deterministic() {
        let p = parser();
        assert_eq!(p.parse(BIM_RECEIPT), p.parse(BIM_RECEIPT));
        assert_eq!(p.parse("garbage\n\n???"), p.parse("garbage\n\n???"));
    }

    #[test]
    fn total_is_not_reconciled_with_items() {
        let text = "MIGROS\nADRES\n01.02.2024\nEKMEK 5,00\nSUT 20,00\nTOPLAM 99,99";
        let r = parser().parse(text);
        assert_eq!(r.total.value, Money::from_cents(9999));
        assert_eq!(r.items_total(), Money::from_cents(2500));
    }

    // ── Merchant ─────────────────────────────────────────────────────────────

    #[test]
    fn merchant_from_catalog_within_header() {
        let text = "HOSGELDINIZ\nTESEKKURLER\nSOK MARKETLER TIC. A.S.\nX";
        let r = parser().parse(text);
        assert_eq!(r.merchant.value, "ŞOK");
        assert_eq!(r.merchant.source_line, Some(2));
    }

    #[test]
    fn merchant_outside_header_is_ignored() {
        let text = "KOSE BAKKAL\n1\n2\n3\n4\nMIGROS";
        let r = parser().parse(text);
        assert_eq!(r.merchant.value, "KOSE BAKKAL");
        assert_eq!(r.merchant.confidence, 0.2);
        assert_eq!(r.merchant_key, None);
    }

    #[test]
    fn merchant_strategies_run_in_order() {
        let p = parser();
        let lines = split_lines("UNKNOWN SHOP LTD.\nSTREET");
        assert!(merchant_from_catalog(&p, &lines).is_none());
        let guess = merchant_from_first_line(&p, &lines).unwrap();
        assert_eq!(guess.value.name, "UNKNOWN SHOP LTD.");
        assert_eq!(guess.source_line, Some(0));
    }

    // ── Date ─────────────────────────────────────────────────────────────────

    #[test]
    fn date_separators() {
        for (text, expected) in [
            ("X\n05.06.2023", ymd(2023, 6, 5)),
            ("X\n05/06/2023", ymd(2023, 6, 5)),
            ("X\n05-06-2023", ymd(2023, 6, 5)),
            ("X\nTARIH:31.12.2099", ymd(2099, 12, 31)),
            ("X\n1.1.2000", ymd(2000, 1, 1)),
        ] {
            let r = parser().parse(text);
            assert_eq!(r.date.value, expected, "text {text:?}");
            assert_eq!(r.date.confidence, 0.9);
        }
    }

    #[test]
    fn date_recovers_every_day_of_a_year() {
        let p = parser();
        let mut d = ymd(2024, 1, 1);
        while d.year() == 2024 {
            for sep in ['.', '/', '-'] {
                let text = format!("SHOP\n{}", d.format(&format!("%d{sep}%m{sep}%Y")));
                assert_eq!(p.parse(&text).date.value, d);
            }
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn date_out_of_range_is_skipped() {
        let text = "X\n32.01.2024\n15.13.2024\n01.01.1999\n31.02.2024\n10.10.2024";
        let r = parser().parse(text);
        assert_eq!(r.date.value, ymd(2024, 10, 10));
        assert_eq!(r.date.source_line, Some(5));
    }

    #[test]
    fn missing_date_uses_reference_with_zero_confidence() {
        let r = parser().parse("SHOP\nNO DATE HERE");
        assert_eq!(r.date.value, ymd(2026, 1, 1));
        assert_eq!(r.date.confidence, 0.0);
        assert_eq!(r.date.source_line, None);
    }

    // ── Total ────────────────────────────────────────────────────────────────

    #[test]
    fn tax_total_line_is_not_the_total() {
        let text = "SHOP\nX\nY\nTOPLAM KDV 12,50\nTOPLAM 70,40";
        let r = parser().parse(text);
        assert_eq!(r.total.value, Money::from_cents(7040));
        assert_eq!(r.total.source_line, Some(4));
    }

    #[test]
    fn kdv_toplam_line_is_not_the_total() {
        let text = "SHOP\nKDV TOPLAM 99,00\nGENEL TOPLAM 45,00";
        let r = parser().parse(text);
        assert_eq!(r.total.value, Money::from_cents(4500));
    }

    #[test]
    fn total_amount_on_next_line() {
        let text = "SHOP\nA\nB\nODENECEK TUTAR\n*55,25";
        let r = parser().parse(text);
        assert_eq!(r.total.value, Money::from_cents(5525));
        assert_eq!(r.total.confidence, 0.8);
        assert_eq!(r.total.source_line, Some(4));
    }

    #[test]
    fn next_line_tax_total_is_not_taken() {
        let text = "SHOP\nTOPLAM\nTOPLAM KDV 3,00";
        let r = parser().parse(text);
        assert_ne!(r.total.source_line, Some(2));
    }

    #[test]
    fn ocr_damaged_keyword_and_amount() {
        let text = "SHOP\nA\nB\ntoplan 1O,5O";
        let r = parser().parse(text);
        assert_eq!(r.total.value, Money::from_cents(1050));
        assert_eq!(r.total.confidence, 0.85);
    }

    #[test]
    fn total_falls_back_to_largest_in_bottom_half() {
        let text = "SHOP\n999,99 HEADER NOISE\nA\nB\nEKMEK 5,00\nPEYNIR 80,00\nSUT 20,00\nNAKIT 100,00";
        let r = parser().parse(text);
        assert_eq!(r.total.value, Money::from_cents(10000));
        assert_eq!(r.total.confidence, 0.4);
        assert_eq!(r.total.source_line, Some(7));
    }

    #[test]
    fn no_total_anywhere_is_zero() {
        let r = parser().parse("SHOP\nNOTHING\nHERE");
        assert!(r.total.value.is_zero());
        assert_eq!(r.total.confidence, 0.0);
        assert_eq!(r.total.source_line, None);
    }

    // ── Items ────────────────────────────────────────────────────────────────

    #[test]
    fn item_line_rules() {
        assert_eq!(parse_item_line("EKMEK 5,00"), Some(("EKMEK".into(), Money::from_cents(500))));
        assert_eq!(parse_item_line("EKMEK 5,00 %1"), Some(("EKMEK".into(), Money::from_cents(500))));
        assert_eq!(parse_item_line("SIMIT 2 X 4,00 B"), Some(("SIMIT".into(), Money::from_cents(400))));
        assert_eq!(parse_item_line("YAG 1,5 89,90"), Some(("YAG".into(), Money::from_cents(8990))));
        assert_eq!(parse_item_line("SU 5,00"), None);
        assert_eq!(parse_item_line("EKMEK"), None);
        assert_eq!(parse_item_line("EKMEK BEDAVA"), None);
        assert_eq!(parse_item_line("5,00"), None);
    }

    #[test]
    fn items_skip_marker_and_date_lines() {
        let text = "SHOP\nADDR\nHEADER\nFIS NO 12,00\nKDV %8 1,20\n12.03.2024 10,00\nCAY 42,00\nTOPLAM 42,00";
        let r = parser().parse(text);
        let names: Vec<&str> = r.items.iter().map(|i| i.raw_name.as_str()).collect();
        assert_eq!(names, vec!["CAY"]);
        assert_eq!(r.items[0].source_line, 6);
    }

    #[test]
    fn items_stop_at_total_line() {
        let text = "SHOP\nADDR\nDATE\nCAY 42,00\nTOPLAM 42,00\nKART ILE 42,00";
        let r = parser().parse(text);
        assert_eq!(r.items.len(), 1);
    }

    #[test]
    fn first_three_lines_never_become_items() {
        let text = "SHOP 10,00\nADDR 10,00\nPHONE 10,00\nCAY 42,00\nTOPLAM 42,00";
        let r = parser().parse(text);
        let names: Vec<&str> = r.items.iter().map(|i| i.raw_name.as_str()).collect();
        assert_eq!(names, vec!["CAY"]);
    }

    // ── Degenerate input ─────────────────────────────────────────────────────

    #[test]
    fn empty_text_extracts_nothing() {
        let r = parser().parse("");
        assert_eq!(r.merchant.value, "");
        assert_eq!(r.merchant.confidence, 0.0);
        assert_eq!(r.date.confidence, 0.0);
        assert_eq!(r.total.confidence, 0.0);
        assert!(r.items.is_empty());
    }

    #[test]
    fn no_panic_on_garbage_input() {
        let r = parser().parse("!@#$%^&*()\n\0\x01\x02\n   \n,,,, .... %%%\nİıŞş 1,2,3,4");
        for c in [r.merchant.confidence, r.date.confidence, r.total.confidence] {
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn crlf_and_blank_lines_are_ignored() {
        let text = "MIGROS\r\n\r\n  ADRES  \r\nTARIH 02.02.2024\r\nCAY 42,00\r\nTOPLAM 42,00\r\n";
        let r = parser().parse(text);
        assert_eq!(r.merchant_key.as_deref(), Some("migros"));
        assert_eq!(r.date.source_line, Some(2));
        assert_eq!(r.items.len(), 1);
        assert_eq!(r.total.source_line, Some(4));
    }

    #[test]
    fn mixed_case_markers_are_skipped() {
        let r = parser().parse("SHOP\nADDR\nHDR\nFis No: 0042 12,00\nTarih 12,00\nCAY 42,00\nToplam 54,00");
        let names: Vec<&str> = r.items.iter().map(|i| i.raw_name.as_str()).collect();
        assert_eq!(names, vec!["CAY"]);
        assert_eq!(r.total.value, Money::from_cents(5400));
    }

    #[test]
    fn first_total_keyword_wins() {
        let r = parser().parse("SHOP\nARA TOPLAM 5,00\nGENEL TOPLAM 6,00");
        assert_eq!(r.total.value, Money::from_cents(500));
        assert_eq!(r.total.source_line, Some(1));
    }

    #[test]
    fn parsed_receipt_round_trips_through_json() {
        let r = parser().parse(BIM_RECEIPT);
        let json = serde_json::to_string(&r).unwrap();
        let back: ParsedReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
        assert_eq!(back.items[0].raw_name, "EKMEK");
    }
}
