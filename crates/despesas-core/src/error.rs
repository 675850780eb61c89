//! Error types for Despesas

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Source unavailable for {city}/{year}: {reason}")]
    SourceUnavailable {
        city: String,
        year: i32,
        reason: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No expense data for {city}/{year}")]
    NotFound { city: String, year: i32 },

    #[error("Unknown theme: {theme}")]
    UnknownTheme { theme: String },

    #[error("Unknown subtheme: {theme}/{subtheme}")]
    UnknownSubtheme { theme: String, subtheme: String },

    /// Failure while processing one year of a historical series
    #[error("{city}/{year}: {source}")]
    Year {
        city: String,
        year: i32,
        #[source]
        source: Box<Error>,
    },

    #[error("Amount overflow in {0}")]
    Overflow(String),

    /// Two selections of one series map to the same column
    #[error("Column {column} is produced by more than one selection")]
    DuplicateColumn { column: String },

    #[error("Invalid city name: {0:?}")]
    InvalidCity(String),

    #[error("Missing value for column {column} in year {year}")]
    MissingCell { year: i32, column: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Attach the (city, year) a failure happened in
    pub fn in_year(self, city: &str, year: i32) -> Self {
        Error::Year {
            city: city.to_string(),
            year,
            source: Box::new(self),
        }
    }

    /// The underlying error with any year context removed
    pub fn root(&self) -> &Error {
        match self {
            Error::Year { source, .. } => source.root(),
            other => other,
        }
    }

    /// Year the failure happened in, if known
    pub fn year(&self) -> Option<i32> {
        match self {
            Error::Year { year, .. }
            | Error::SourceUnavailable { year, .. }
            | Error::NotFound { year, .. }
            | Error::MissingCell { year, .. } => Some(*year),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_context_display() {
        let err = Error::UnknownTheme {
            theme: "Saúde".to_string(),
        }
        .in_year("campinas", 2019);
        assert_eq!(err.to_string(), "campinas/2019: Unknown theme: Saúde");
        assert_eq!(err.year(), Some(2019));
    }

    #[test]
    fn test_root_unwraps_context() {
        let err = Error::UnknownSubtheme {
            theme: "Saúde".to_string(),
            subtheme: "Atenção Básica".to_string(),
        }
        .in_year("campinas", 2020);
        assert!(matches!(
            err.root(),
            Error::UnknownSubtheme { theme, subtheme }
                if theme == "Saúde" && subtheme == "Atenção Básica"
        ));
    }

    #[test]
    fn test_root_of_plain_error_is_itself() {
        let err = Error::Parse("bad row".into());
        assert!(matches!(err.root(), Error::Parse(_)));
        assert_eq!(err.year(), None);
    }
}
