//! Expense archive extraction and table parsing
//!
//! Each archive holds a semicolon-delimited, Windows-1252 encoded table with
//! one expense line per row. Amounts use a comma as decimal separator
//! (`1.234,56`). Columns are located by header name:
//!
//! - `ds_funcao_governo` → theme
//! - `ds_subfuncao_governo` → subtheme
//! - `tp_despesa` → payment status
//! - `vl_despesa` → amount

use std::io::{Read, Seek};
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord};
use encoding_rs::WINDOWS_1252;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::models::{ExpenseRecord, PaymentStatus};

const THEME_COLUMN: &str = "ds_funcao_governo";
const SUBTHEME_COLUMN: &str = "ds_subfuncao_governo";
const STATUS_COLUMN: &str = "tp_despesa";
const AMOUNT_COLUMN: &str = "vl_despesa";

/// Extract and parse the expense table inside a yearly archive
///
/// The table is the last entry of the archive; earlier entries (layout
/// notes, readmes) are ignored.
pub fn read_archive<R: Read + Seek>(reader: R) -> Result<Vec<ExpenseRecord>> {
    let mut archive =
        ZipArchive::new(reader).map_err(|e| Error::Parse(format!("Invalid archive: {}", e)))?;

    let last = archive
        .len()
        .checked_sub(1)
        .ok_or_else(|| Error::Parse("Archive is empty".into()))?;

    let mut entry = archive
        .by_index(last)
        .map_err(|e| Error::Parse(format!("Unreadable archive entry: {}", e)))?;
    let entry_name = entry.name().to_string();

    let mut raw = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut raw)
        .map_err(|e| Error::Parse(format!("Failed to extract {}: {}", entry_name, e)))?;

    let (text, _, had_errors) = WINDOWS_1252.decode(&raw);
    if had_errors {
        warn!("{} contains bytes outside Windows-1252", entry_name);
    }

    debug!("Extracted {} ({} bytes)", entry_name, raw.len());
    parse_expense_csv(text.as_bytes())
}

/// Parse a decoded expense table
pub fn parse_expense_csv<R: Read>(reader: R) -> Result<Vec<ExpenseRecord>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| Error::Parse(format!("Unreadable header: {}", e)))?
        .clone();
    let columns = Columns::locate(&headers)?;

    let mut records = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row = result.map_err(|e| Error::Parse(format!("Line {}: {}", line, e)))?;
        records.push(columns.record(&row, line)?);
    }

    debug!("Parsed {} expense lines", records.len());
    Ok(records)
}

/// Positions of the columns we read
struct Columns {
    theme: usize,
    subtheme: usize,
    status: usize,
    amount: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}') == name)
                .ok_or_else(|| Error::Parse(format!("Missing column: {}", name)))
        };

        Ok(Self {
            theme: find(THEME_COLUMN)?,
            subtheme: find(SUBTHEME_COLUMN)?,
            status: find(STATUS_COLUMN)?,
            amount: find(AMOUNT_COLUMN)?,
        })
    }

    fn record(&self, row: &StringRecord, line: usize) -> Result<ExpenseRecord> {
        let field = |idx: usize, name: &str| {
            row.get(idx)
                .map(str::trim)
                .ok_or_else(|| Error::Parse(format!("Line {}: missing {}", line, name)))
        };

        let amount_str = field(self.amount, AMOUNT_COLUMN)?;
        let amount = parse_amount(amount_str).ok_or_else(|| {
            Error::Parse(format!("Line {}: invalid amount {:?}", line, amount_str))
        })?;

        Ok(ExpenseRecord {
            theme: field(self.theme, THEME_COLUMN)?.to_string(),
            subtheme: field(self.subtheme, SUBTHEME_COLUMN)?.to_string(),
            status: PaymentStatus::from_label(field(self.status, STATUS_COLUMN)?),
            amount,
        })
    }
}

/// Parse a pt-BR formatted amount ("1.234,56") into a decimal
///
/// Values without a comma are read as plain decimals ("1234.56").
fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let normalized = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s.to_string()
    };

    Decimal::from_str(&normalized).ok()
}
