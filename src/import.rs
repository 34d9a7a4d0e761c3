//! CSV import: turns `address,amount` rows into the two free-text lists the
//! amount parser consumes. Validation is left to the parser so CSV input gets
//! exactly the same checks as typed input.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

/// Recipient and amount lists, one entry per line, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedLists {
    pub recipients: String,
    pub amounts: String,
}

impl ImportedLists {
    pub fn len(&self) -> usize {
        self.recipients.lines().count()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

fn looks_like_header(first: &str, second: &str) -> bool {
    let first = first.to_lowercase();
    let second = second.to_lowercase();
    (first.contains("address") || first.contains("recipient")) && second.contains("amount")
}

/// Parse CSV text with an optional `address,amount` header row.
pub fn parse_csv(contents: &str) -> Result<ImportedLists> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut recipients = Vec::new();
    let mut amounts = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| anyhow!("CSV parsing error at line {}: {}", line_num + 1, e))?;

        let address = record.get(0).unwrap_or("").trim_matches('"').trim();
        let amount = record.get(1).unwrap_or("").trim_matches('"').trim();

        if address.is_empty() && amount.is_empty() {
            continue;
        }
        if line_num == 0 && looks_like_header(address, amount) {
            continue;
        }
        if record.len() < 2 || amount.is_empty() {
            return Err(anyhow!(
                "Line {}: expected `address,amount`, got {} column(s)",
                line_num + 1,
                record.len()
            ));
        }

        recipients.push(address.to_string());
        amounts.push(amount.to_string());
    }

    Ok(ImportedLists {
        recipients: recipients.join("\n"),
        amounts: amounts.join("\n"),
    })
}

pub fn load_csv_file(path: &Path) -> Result<ImportedLists> {
    let contents = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let lists = parse_csv(&contents)?;
    tracing::info!("Imported {} rows from {:?}", lists.len(), path);
    Ok(lists)
}
