use std::collections::BTreeSet;
use chrono::NaiveDate;
use log::{debug, info};
use crate::config::ColumnConfig;
use crate::record::{FieldOutcome, Record};

/// Which records take part in the diagram.
///
/// An empty entity set and unset date bounds mean "no restriction". Both
/// date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicate {
    pub entities: BTreeSet<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl FilterPredicate {
    pub fn is_unrestricted(&self) -> bool {
        self.entities.is_empty() && self.from.is_none() && self.to.is_none()
    }

    /// Exact match of sender or receiver against the entity set.
    pub fn matches_entities(&self, record: &Record, columns: &ColumnConfig) -> bool {
        if self.entities.is_empty() {
            return true;
        }
        [record.sender(columns), record.receiver(columns)]
            .into_iter()
            .flatten()
            .any(|party| self.entities.contains(party))
    }

    /// Records without a usable date are never excluded here.
    pub fn matches_dates(&self, record: &Record, columns: &ColumnConfig) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        match record.date(columns) {
            FieldOutcome::Value(date) => {
                self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
            }
            FieldOutcome::Absent => true,
            FieldOutcome::Invalid(raw) => {
                debug!("Keeping record with unparsable date {:?}", raw);
                true
            }
        }
    }

    pub fn matches(&self, record: &Record, columns: &ColumnConfig) -> bool {
        self.matches_entities(record, columns) && self.matches_dates(record, columns)
    }
}

/// Returns the records accepted by `predicate`, in their original order.
pub fn filter_records(records: &[Record], predicate: &FilterPredicate, columns: &ColumnConfig) -> Vec<Record> {
    if predicate.is_unrestricted() {
        return records.to_vec();
    }
    if !predicate.entities.is_empty() {
        info!("Filtering by {} entities: {:?}", predicate.entities.len(), predicate.entities);
    }
    if predicate.from.is_some() || predicate.to.is_some() {
        info!(
            "Filtering by date range: {} -> {}",
            predicate.from.map_or("(none)".to_string(), |d| d.to_string()),
            predicate.to.map_or("(none)".to_string(), |d| d.to_string()),
        );
    }
    let filtered: Vec<Record> = records
        .iter()
        .filter(|record| predicate.matches(record, columns))
        .cloned()
        .collect();
    info!("{} of {} records left after filtering", filtered.len(), records.len());
    filtered
}
