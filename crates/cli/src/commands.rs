use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use tezgah_ocr::{ReceiptParser, ReceiptPipeline};
use tezgah_taxonomy::CategoryMatcher;

use crate::config::{check_min_confidence, Config};

#[derive(Args)]
pub struct ParseArgs {
    /// Receipt text file, or `-` for stdin
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Date to report (at confidence 0) when the receipt has none
    #[arg(long)]
    today: Option<NaiveDate>,
}

#[derive(Args)]
pub struct CategorizeArgs {
    /// Product names as printed on a receipt
    #[arg(required = true)]
    names: Vec<String>,

    /// Acceptance threshold (overrides config)
    #[arg(long)]
    min_confidence: Option<f32>,
}

pub fn parse(args: &ParseArgs, config: &Config) -> anyhow::Result<()> {
    let parser = build_parser(args, config)?;
    let text = read_input(&args.input)?;
    print_json(&parser.parse(&text))
}

pub fn categorize(args: &CategorizeArgs, config: &Config) -> anyhow::Result<()> {
    let min_confidence = check_min_confidence(args.min_confidence.unwrap_or(config.min_confidence))?;
    let matcher = build_matcher(config)?;
    let summary = matcher.match_receipt_items(&args.names, min_confidence)?;
    tracing::info!(
        matched = summary.matched.len(),
        unmatched = summary.unmatched.len(),
        "categorized"
    );
    print_json(&summary)
}

pub fn process(args: &ParseArgs, config: &Config) -> anyhow::Result<()> {
    let parser = build_parser(args, config)?;
    let matcher = build_matcher(config)?;
    let text = read_input(&args.input)?;
    let pipeline = ReceiptPipeline::new(parser, &matcher).with_min_confidence(config.min_confidence);
    print_json(&pipeline.process(&text)?)
}

fn build_parser(args: &ParseArgs, config: &Config) -> anyhow::Result<ReceiptParser> {
    let parser = ReceiptParser::new(config.merchant_catalog()?);
    Ok(match args.today {
        Some(date) => parser.with_reference_date(date),
        None => parser,
    })
}

fn build_matcher(config: &Config) -> anyhow::Result<CategoryMatcher> {
    let matcher = CategoryMatcher::new();
    matcher.initialize(&config.taxonomy()?)?;
    Ok(matcher)
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fis.txt");
        std::fs::write(&path, "BIM\nTOPLAM 1,00").unwrap();
        assert_eq!(read_input(&path).unwrap(), "BIM\nTOPLAM 1,00");
    }

    #[test]
    fn read_input_missing_file_names_path() {
        let err = read_input(Path::new("/nonexistent/fis.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/fis.txt"));
    }

    #[test]
    fn build_parser_applies_reference_date() {
        let args = ParseArgs { input: PathBuf::from("-"), today: NaiveDate::from_ymd_opt(2025, 5, 5) };
        let parser = build_parser(&args, &Config::default()).unwrap();
        let receipt = parser.parse("SHOP");
        assert_eq!(receipt.date.value, NaiveDate::from_ymd_opt(2025, 5, 5).unwrap());
        assert_eq!(receipt.date.confidence, 0.0);
    }

    #[test]
    fn build_matcher_uses_config_taxonomy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxonomy.toml");
        std::fs::write(
            &path,
            r#"
[[department]]
id = "d"
name = "Dept"
[[department.category]]
id = "c"
name = "Cat"
[[department.category.subcategory]]
id = "s"
name = "Sub"
item_groups = [{ id = "boza", name = "Boza" }]
"#,
        )
        .unwrap();
        let config = Config { taxonomy: Some(path), ..Config::default() };
        let matcher = build_matcher(&config).unwrap();
        assert_eq!(matcher.snapshot().unwrap().len(), 1);
        assert_eq!(matcher.find_best_match("BOZA").unwrap().unwrap().item_group.id, "boza");
    }

    #[test]
    fn categorize_rejects_out_of_range_threshold() {
        let args = CategorizeArgs { names: vec!["AYRAN".to_string()], min_confidence: Some(2.0) };
        let err = categorize(&args, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("min_confidence"));
    }
}
