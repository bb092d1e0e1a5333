use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;

use super::ReceiptError;
use crate::models::{Expense, LineItem};

/// Fields read off a receipt. Every field is optional because extraction is
/// best effort.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct ParsedReceipt {
    #[serde(default)]
    pub(crate) vendor: Option<String>,
    #[serde(default)]
    pub(crate) date: Option<String>,
    #[serde(default)]
    pub(crate) total: Option<Decimal>,
    #[serde(default)]
    pub(crate) items: Vec<LineItem>,
}

impl ParsedReceipt {
    pub(crate) fn is_empty(&self) -> bool {
        self.vendor.is_none() && self.date.is_none() && self.total.is_none() && self.items.is_empty()
    }

    /// Prefill an expense form. Missing fields fall back to `today`, an empty
    /// vendor and the sum of the line items.
    pub(crate) fn to_draft(&self, today: NaiveDate) -> Expense {
        let date = self
            .date
            .as_deref()
            .and_then(normalize_date)
            .unwrap_or(today)
            .format("%Y-%m-%d")
            .to_string();
        let amount = self
            .total
            .unwrap_or_else(|| self.items.iter().map(|i| i.amount).sum());
        let mut expense = Expense::new(
            date,
            self.vendor.clone().unwrap_or_default(),
            String::new(),
            amount,
        );
        expense.line_items = self.items.clone();
        expense
    }
}

/// Reads the fields of a receipt. Implementations are called once per
/// upload and never retried.
pub(crate) trait ReceiptParser {
    fn parse(&self, bytes: &[u8], file_name: &str) -> Result<ParsedReceipt, ReceiptError>;
}

/// Runs an external extraction program with the receipt's path as its last
/// argument and decodes the JSON it prints.
pub(crate) struct CommandParser {
    program: String,
    args: Vec<String>,
}

impl CommandParser {
    pub(crate) fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

impl ReceiptParser for CommandParser {
    fn parse(&self, bytes: &[u8], file_name: &str) -> Result<ParsedReceipt, ReceiptError> {
        let path = scratch_path(file_name);
        std::fs::write(&path, bytes)?;
        let output = Command::new(&self.program).args(&self.args).arg(&path).output();
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "could not remove receipt scratch file");
        }

        let output = output
            .map_err(|e| ReceiptError::Extraction(format!("could not run {}: {e}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReceiptError::Extraction(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let parsed: ParsedReceipt = serde_json::from_slice(&output.stdout)?;
        if parsed.is_empty() {
            return Err(ReceiptError::Unrecognized);
        }
        tracing::debug!(program = %self.program, items = parsed.items.len(), "receipt extracted");
        Ok(parsed)
    }
}

fn scratch_path(file_name: &str) -> PathBuf {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    std::env::temp_dir().join(format!(
        "junkyard-{}.{ext}",
        uuid::Uuid::new_v4().simple()
    ))
}

/// Extracts fields from plain-text receipts.
pub(crate) struct TextParser {
    total: Regex,
    iso_date: Regex,
    us_date: Regex,
    item: Regex,
}

impl TextParser {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            total: Regex::new(r"(?im)^\s*(?:grand\s+)?total\b[^\d\-\n]*(-?\d+(?:\.\d{1,2})?)")?,
            iso_date: Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b")?,
            us_date: Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b")?,
            item: Regex::new(r"^\s*(.+?)\s{2,}\$?(-?\d+\.\d{2})\s*$")?,
        })
    }
}

impl ReceiptParser for TextParser {
    fn parse(&self, bytes: &[u8], file_name: &str) -> Result<ParsedReceipt, ReceiptError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| ReceiptError::UnsupportedType(file_name.to_string()))?;

        let total = self
            .total
            .captures_iter(text)
            .last()
            .and_then(|c| Decimal::from_str(&c[1]).ok());

        let date = self
            .iso_date
            .captures(text)
            .and_then(|c| normalize_date(&c[1]))
            .or_else(|| {
                self.us_date.captures(text).and_then(|c| {
                    normalize_date(&format!("{}-{:0>2}-{:0>2}", &c[3], &c[1], &c[2]))
                })
            })
            .map(|d| d.format("%Y-%m-%d").to_string());

        let mut items = Vec::new();
        for line in text.lines() {
            let Some(caps) = self.item.captures(line) else {
                continue;
            };
            let description = caps[1].trim().to_string();
            let lowered = description.to_lowercase();
            if ["total", "subtotal", "tax", "change", "cash", "card", "tip"]
                .iter()
                .any(|w| lowered.contains(w))
            {
                continue;
            }
            if let Ok(amount) = Decimal::from_str(&caps[2]) {
                items.push(LineItem {
                    description,
                    amount,
                });
            }
        }

        let vendor = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.chars().any(|c| c.is_ascii_digit()))
            .map(str::to_string);

        let parsed = ParsedReceipt {
            vendor,
            date,
            total,
            items,
        };
        if parsed.total.is_none() && parsed.items.is_empty() {
            return Err(ReceiptError::Unrecognized);
        }
        Ok(parsed)
    }
}

/// Configured extraction command, or the text parser when none is set.
pub(crate) fn parser_from_command(
    command: Option<&str>,
) -> anyhow::Result<Box<dyn ReceiptParser>> {
    let parts: Vec<String> = command
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    match parts.split_first() {
        Some((program, args)) => Ok(Box::new(CommandParser::new(
            program.clone(),
            args.to_vec(),
        ))),
        None => Ok(Box::new(TextParser::new()?)),
    }
}

fn normalize_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
