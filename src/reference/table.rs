//! Tolerant reader for GTFS-style text tables.
//!
//! Real-world exports arrive with byte-order marks, semicolon or tab
//! delimiters and historical column spellings, so every table goes through
//! [`Table::parse`] rather than a plain `csv::Reader`.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;
use tracing::debug;

const BOM: char = '\u{feff}';

/// Candidate delimiters, in tie-break order.
const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Number of leading lines sampled for delimiter detection.
const SAMPLE_LINES: usize = 5;

/// Removes a single leading byte-order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}

/// Picks the most frequent of `,` `;` `\t` over the first five lines.
///
/// Ties (including no delimiter at all) resolve to the earlier candidate, so
/// a single-column file is read as comma separated.
pub fn detect_delimiter(text: &str) -> u8 {
    let mut best = DELIMITERS[0];
    let mut best_count = 0;

    for delimiter in DELIMITERS {
        let count: usize = text
            .lines()
            .take(SAMPLE_LINES)
            .map(|line| line.bytes().filter(|b| *b == delimiter).count())
            .sum();
        if count > best_count {
            best = delimiter;
            best_count = count;
        }
    }

    best
}

/// A parsed table with header-addressed rows.
#[derive(Debug, Default)]
pub struct Table {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    /// Reads and parses the table at `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        Self::parse(&raw).with_context(|| format!("failed to parse '{}'", path.display()))
    }

    /// Parses table text: BOM stripped, delimiter detected, fields trimmed,
    /// empty lines skipped and ragged rows tolerated.
    pub fn parse(raw: &str) -> Result<Self> {
        let text = strip_bom(raw);
        let delimiter = detect_delimiter(text);
        let shown = (delimiter as char).escape_default().to_string();
        debug!(delimiter = %shown, "Detected table delimiter");

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record);
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|record| Row {
            headers: &self.headers,
            record,
        })
    }
}

/// One data row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    headers: &'a StringRecord,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// Value of the exact column `name`, if the column exists in this row.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == name)?;
        self.record.get(idx)
    }

    /// First non-empty value among the candidate column spellings.
    pub fn first_of(&self, candidates: &[&str]) -> Option<&'a str> {
        candidates
            .iter()
            .filter_map(|name| self.get(name))
            .find(|value| !value.is_empty())
    }
}
