use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use crate::filter::FilterPredicate;
use crate::layout::Canvas;
use crate::record::{self, AMOUNT_SYNONYMS, DATE_SYNONYMS, FieldOutcome};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read parameter file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Invalid parameter file {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("No input CSV given (set `source_path` in the parameter file or pass --input)")]
    MissingSource,
    #[error("Date range is empty: {from} is after {to}")]
    InvertedDateRange { from: NaiveDate, to: NaiveDate },
    #[error("Canvas of {width}x{height} leaves no room inside a margin of {margin}")]
    CanvasTooSmall { width: u32, height: u32, margin: u32 },
}

/// Names of the CSV columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub sender: String,
    pub receiver: String,
    pub amount: String,
    pub date: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        ColumnConfig {
            sender: "Nadawca".to_string(),
            receiver: "Odbiorca".to_string(),
            amount: "Kwota".to_string(),
            date: "Data".to_string(),
        }
    }
}

impl ColumnConfig {
    /// Configured amount column first, then the known synonyms, without duplicates.
    pub fn amount_candidates(&self) -> Vec<&str> {
        dedup_in_order(std::iter::once(self.amount.as_str()).chain(AMOUNT_SYNONYMS))
    }

    pub fn date_candidates(&self) -> Vec<&str> {
        dedup_in_order(std::iter::once(self.date.as_str()).chain(DATE_SYNONYMS))
    }
}

fn dedup_in_order<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Run parameters, as read from the JSON parameter file and overridden from the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "csv_path")]
    pub source_path: Option<PathBuf>,
    pub output_path: PathBuf,
    pub entities: Vec<String>,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub from: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub to: Option<NaiveDate>,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub canvas_margin: u32,
    pub node_width: u32,
    pub currency: String,
    pub columns: ColumnConfig,
}

impl Default for Config {
    fn default() -> Self {
        let canvas = Canvas::default();
        Config {
            source_path: None,
            output_path: PathBuf::from("flows.svg"),
            entities: Vec::new(),
            from: None,
            to: None,
            canvas_width: canvas.width,
            canvas_height: canvas.height,
            canvas_margin: canvas.margin,
            node_width: canvas.node_width,
            currency: "PLN".to_string(),
            columns: ColumnConfig::default(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn source_path(&self) -> Result<&Path, ConfigError> {
        self.source_path.as_deref().ok_or(ConfigError::MissingSource)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source_path()?;
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ConfigError::InvertedDateRange { from, to });
            }
        }
        let margins = 2 * u64::from(self.canvas_margin);
        if u64::from(self.canvas_width) <= margins || u64::from(self.canvas_height) <= margins {
            return Err(ConfigError::CanvasTooSmall {
                width: self.canvas_width,
                height: self.canvas_height,
                margin: self.canvas_margin,
            });
        }
        Ok(())
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.canvas_width,
            height: self.canvas_height,
            margin: self.canvas_margin,
            node_width: self.node_width,
        }
    }

    pub fn predicate(&self) -> FilterPredicate {
        FilterPredicate {
            entities: self.entities.iter().cloned().collect::<BTreeSet<_>>(),
            from: self.from,
            to: self.to,
        }
    }

    /// Human readable period for the diagram subtitle, if any bound is set.
    pub fn period(&self) -> Option<String> {
        match (self.from, self.to) {
            (None, None) => None,
            (from, to) => Some(format!(
                "{} - {}",
                from.map_or("…".to_string(), |d| d.to_string()),
                to.map_or("…".to_string(), |d| d.to_string()),
            )),
        }
    }
}

/// Accepts `null`, `""` or an ISO date.
fn deserialize_optional_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(record::parse_date) {
        None | Some(FieldOutcome::Absent) => Ok(None),
        Some(FieldOutcome::Value(date)) => Ok(Some(date)),
        Some(FieldOutcome::Invalid(raw)) => Err(serde::de::Error::custom(format!(
            "invalid date `{raw}`, expected YYYY-MM-DD"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.canvas(), Canvas { width: 800, height: 600, margin: 100, node_width: 20 });
        assert!(matches!(config.validate(), Err(ConfigError::MissingSource)));
    }

    #[test]
    fn test_parameter_file_keys() {
        let config = Config::from_json(
            r#"{
                "csv_path": "transakcje.csv",
                "entities": ["Firma A", "Firma B"],
                "from": "2024-01-01",
                "to": "",
                "canvas_width": 1024,
                "columns": { "amount": "Suma" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.source_path().unwrap(), Path::new("transakcje.csv"));
        assert_eq!(config.entities, vec!["Firma A".to_string(), "Firma B".to_string()]);
        assert_eq!(config.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(config.to, None);
        assert_eq!(config.canvas_width, 1024);
        assert_eq!(config.canvas_height, 600);
        assert_eq!(config.columns.amount, "Suma");
        assert_eq!(config.columns.sender, "Nadawca");
        assert_eq!(config.period().unwrap(), "2024-01-01 - …");
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let err = Config::from_json(r#"{"from": "01/02/2024"}"#).unwrap_err();
        assert!(err.to_string().contains("01/02/2024"));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let config = Config::from_json(
            r#"{"source_path": "a.csv", "from": "2024-02-01", "to": "2024-01-01"}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvertedDateRange { .. })));
    }

    #[test]
    fn test_canvas_must_fit_margin() {
        let config = Config::from_json(
            r#"{"source_path": "a.csv", "canvas_height": 200, "canvas_margin": 100}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::CanvasTooSmall { .. })));
    }

    #[test]
    fn test_huge_margin_is_rejected() {
        let config = Config::from_json(
            r#"{"source_path": "a.csv", "canvas_margin": 3000000000}"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CanvasTooSmall { margin: 3000000000, .. })
        ));
    }

    #[test]
    fn test_amount_candidates_are_deduplicated() {
        let columns = ColumnConfig { amount: "Amount".to_string(), ..ColumnConfig::default() };
        assert_eq!(columns.amount_candidates(), vec!["Amount", "Value", "Wartość", "Wartosc"]);
        assert_eq!(
            ColumnConfig::default().amount_candidates(),
            vec!["Kwota", "Amount", "Value", "Wartość", "Wartosc"]
        );
        assert_eq!(ColumnConfig::default().date_candidates(), vec!["Data", "DataTransakcji", "Date"]);
    }
}
