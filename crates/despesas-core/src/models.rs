//! Domain models for Despesas

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{Error, Result};

/// Payment stage of an expense line
///
/// The portal publishes each expense at several stages (committed, settled,
/// paid). Only `Paid` lines represent money actually disbursed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Paid,
    Committed,
    Settled,
    Other(String),
}

impl PaymentStatus {
    /// Parse a status label, accepting both the portal's Portuguese values
    /// ("Valor Pago") and the English names ("Paid")
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Valor Pago" | "Paid" => Self::Paid,
            "Valor Empenhado" | "Committed" => Self::Committed,
            "Valor Liquidado" | "Settled" => Self::Settled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "Paid",
            Self::Committed => "Committed",
            Self::Settled => "Settled",
            Self::Other(label) => label,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One government expenditure line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseRecord {
    /// Government function (`ds_funcao_governo`)
    pub theme: String,
    /// Government sub-function (`ds_subfuncao_governo`)
    pub subtheme: String,
    /// Payment stage (`tp_despesa`)
    pub status: PaymentStatus,
    /// Amount in BRL (`vl_despesa`)
    pub amount: Decimal,
}

impl ExpenseRecord {
    pub fn new(
        theme: impl Into<String>,
        subtheme: impl Into<String>,
        status: PaymentStatus,
        amount: Decimal,
    ) -> Self {
        Self {
            theme: theme.into(),
            subtheme: subtheme.into(),
            status,
            amount,
        }
    }
}

/// All expense lines for one (city, year)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseTable {
    pub city: String,
    pub year: i32,
    pub records: Vec<ExpenseRecord>,
}

impl ExpenseTable {
    pub fn new(city: impl Into<String>, year: i32, records: Vec<ExpenseRecord>) -> Self {
        Self {
            city: city.into(),
            year,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpenseRecord> {
        self.records.iter()
    }
}

/// Aggregated amount for one theme
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThemeTotal {
    pub total: Decimal,
    /// Distinct subthemes seen under this theme
    pub subthemes: BTreeSet<String>,
}

/// Totals per theme
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ThemeSummary {
    themes: BTreeMap<String, ThemeTotal>,
}

impl ThemeSummary {
    pub(crate) fn from_map(themes: BTreeMap<String, ThemeTotal>) -> Self {
        Self { themes }
    }

    pub fn get(&self, theme: &str) -> Option<&ThemeTotal> {
        self.themes.get(theme)
    }

    /// Like `get`, but an absent theme is an error
    pub fn require(&self, theme: &str) -> Result<&ThemeTotal> {
        self.get(theme).ok_or_else(|| Error::UnknownTheme {
            theme: theme.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ThemeTotal)> {
        self.themes.iter()
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Sum over all themes
    pub fn total(&self) -> Result<Decimal> {
        self.themes
            .values()
            .try_fold(Decimal::ZERO, |acc, t| {
                acc.checked_add(t.total)
                    .ok_or_else(|| Error::Overflow("total over all themes".to_string()))
            })
    }
}

/// Totals per (theme, subtheme) pair
///
/// This is the canonical grouping: theme totals and per-theme subtheme
/// totals are both projections of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeSubthemeSummary {
    totals: BTreeMap<(String, String), Decimal>,
}

impl ThemeSubthemeSummary {
    pub(crate) fn from_map(totals: BTreeMap<(String, String), Decimal>) -> Self {
        Self { totals }
    }

    pub fn total(&self, theme: &str, subtheme: &str) -> Option<Decimal> {
        self.totals
            .get(&(theme.to_string(), subtheme.to_string()))
            .copied()
    }

    /// Like `total`, but distinguishes an absent theme from an absent subtheme
    pub fn require(&self, theme: &str, subtheme: &str) -> Result<Decimal> {
        if let Some(total) = self.total(theme, subtheme) {
            return Ok(total);
        }
        if self.has_theme(theme) {
            Err(Error::UnknownSubtheme {
                theme: theme.to_string(),
                subtheme: subtheme.to_string(),
            })
        } else {
            Err(Error::UnknownTheme {
                theme: theme.to_string(),
            })
        }
    }

    pub fn has_theme(&self, theme: &str) -> bool {
        self.subthemes_of(theme).next().is_some()
    }

    /// Subtheme totals under one theme, in subtheme order
    pub fn subthemes_of<'a>(
        &'a self,
        theme: &'a str,
    ) -> impl Iterator<Item = (&'a str, Decimal)> + 'a {
        let start = (theme.to_string(), String::new());
        self.totals
            .range(start..)
            .take_while(move |((t, _), _)| t == theme)
            .map(|((_, sub), total)| (sub.as_str(), *total))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Decimal)> {
        self.totals
            .iter()
            .map(|((theme, sub), total)| (theme.as_str(), sub.as_str(), *total))
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}
