use std::collections::HashMap;
use chrono::NaiveDate;
use crate::config::ColumnConfig;

/// Amount column names tried after the configured one, in priority order.
pub const AMOUNT_SYNONYMS: [&str; 4] = ["Amount", "Value", "Wartość", "Wartosc"];

/// Date column names tried after the configured one, in priority order.
pub const DATE_SYNONYMS: [&str; 2] = ["DataTransakcji", "Date"];

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Outcome of interpreting a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome<T> {
    Value(T),
    Absent,
    /// The cell was there but could not be interpreted; keeps the raw text.
    Invalid(String),
}

/// One CSV row keyed by header name. Unknown columns are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Record {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Returns the cell for `column`, treating an empty cell as missing.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn sender<'a>(&'a self, columns: &ColumnConfig) -> Option<&'a str> {
        self.get(&columns.sender)
    }

    pub fn receiver<'a>(&'a self, columns: &ColumnConfig) -> Option<&'a str> {
        self.get(&columns.receiver)
    }

    /// Probes the amount candidates in order and returns the first one that parses.
    /// If nothing parses, the last invalid cell seen is reported.
    pub fn amount(&self, columns: &ColumnConfig) -> FieldOutcome<f64> {
        let mut outcome = FieldOutcome::Absent;
        for column in columns.amount_candidates() {
            let Some(raw) = self.get(column) else {
                continue;
            };
            match parse_amount(raw) {
                FieldOutcome::Value(amount) => return FieldOutcome::Value(amount),
                other => outcome = other,
            }
        }
        outcome
    }

    /// The first present date candidate decides; later candidates are not consulted.
    pub fn date(&self, columns: &ColumnConfig) -> FieldOutcome<NaiveDate> {
        columns
            .date_candidates()
            .into_iter()
            .find_map(|column| self.get(column))
            .map_or(FieldOutcome::Absent, parse_date)
    }
}

/// Parses a locale-formatted amount such as `1 500,75`.
pub fn parse_amount(raw: &str) -> FieldOutcome<f64> {
    let normalized: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if normalized.is_empty() {
        return FieldOutcome::Absent;
    }
    match normalized.parse::<f64>() {
        Ok(amount) if amount.is_finite() => FieldOutcome::Value(amount),
        _ => FieldOutcome::Invalid(raw.to_string()),
    }
}

pub fn parse_date(raw: &str) -> FieldOutcome<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return FieldOutcome::Absent;
    }
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => FieldOutcome::Value(date),
        Err(_) => FieldOutcome::Invalid(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_amount_locale_format() {
        assert_eq!(parse_amount("1 500,75"), FieldOutcome::Value(1500.75));
        assert_eq!(parse_amount("1000.50"), FieldOutcome::Value(1000.5));
        assert_eq!(parse_amount("12\u{a0}000"), FieldOutcome::Value(12000.0));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert_eq!(parse_amount("abc"), FieldOutcome::Invalid("abc".to_string()));
        assert_eq!(parse_amount("1,500.75"), FieldOutcome::Invalid("1,500.75".to_string()));
        assert_eq!(parse_amount("inf"), FieldOutcome::Invalid("inf".to_string()));
        assert_eq!(parse_amount("   "), FieldOutcome::Absent);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-15"), FieldOutcome::Value(date(2024, 1, 15)));
        assert_eq!(parse_date("15.01.2024"), FieldOutcome::Invalid("15.01.2024".to_string()));
        assert_eq!(parse_date("2024-02-30"), FieldOutcome::Invalid("2024-02-30".to_string()));
        assert_eq!(parse_date(""), FieldOutcome::Absent);
    }

    #[test]
    fn test_empty_cell_is_absent() {
        let record = Record::from_pairs([("Nadawca", "A"), ("Odbiorca", "")]);
        let columns = ColumnConfig::default();
        assert_eq!(record.sender(&columns), Some("A"));
        assert_eq!(record.receiver(&columns), None);
    }

    #[test]
    fn test_amount_falls_through_to_synonym() {
        let columns = ColumnConfig::default();
        let record = Record::from_pairs([("Kwota", "n/a"), ("Amount", "12,5")]);
        assert_eq!(record.amount(&columns), FieldOutcome::Value(12.5));

        let record = Record::from_pairs([("Kwota", "n/a")]);
        assert_eq!(record.amount(&columns), FieldOutcome::Invalid("n/a".to_string()));

        let record = Record::from_pairs([("Opis", "x")]);
        assert_eq!(record.amount(&columns), FieldOutcome::Absent);
    }

    #[test]
    fn test_amount_prefers_configured_column() {
        let columns = ColumnConfig::default();
        let record = Record::from_pairs([("Kwota", "10"), ("Amount", "99")]);
        assert_eq!(record.amount(&columns), FieldOutcome::Value(10.0));
    }

    #[test]
    fn test_first_present_date_column_decides() {
        let columns = ColumnConfig::default();
        let record = Record::from_pairs([("Data", "garbage"), ("Date", "2024-01-01")]);
        assert_eq!(record.date(&columns), FieldOutcome::Invalid("garbage".to_string()));

        let record = Record::from_pairs([("Data", ""), ("DataTransakcji", "2024-03-10")]);
        assert_eq!(record.date(&columns), FieldOutcome::Value(date(2024, 3, 10)));
    }
}
