use std::collections::BTreeMap;
use log::{info, trace};
use crate::config::ColumnConfig;
use crate::record::{FieldOutcome, Record};

/// Placeholder for a missing sender or receiver. Records resolving to it are not aggregated.
pub const UNKNOWN_PARTY: &str = "unknown";

/// Ordered (sender, receiver) pair. `A -> B` and `B -> A` are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowKey {
    pub sender: String,
    pub receiver: String,
}

impl FlowKey {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        FlowKey {
            sender: sender.into(),
            receiver: receiver.into(),
        }
    }
}

/// Summed amounts per ordered pair. Every stored amount is strictly positive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowMap {
    flows: BTreeMap<FlowKey, f64>,
}

impl FlowMap {
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, sender: &str, receiver: &str) -> Option<f64> {
        self.flows.get(&FlowKey::new(sender, receiver)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlowKey, f64)> + '_ {
        self.flows.iter().map(|(key, &amount)| (key, amount))
    }

    pub fn max_amount(&self) -> Option<f64> {
        self.flows.values().copied().reduce(f64::max)
    }

    pub fn total_amount(&self) -> f64 {
        self.flows.values().sum()
    }

    /// Distinct endpoint names, sorted.
    pub fn participants(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .flows
            .keys()
            .flat_map(|key| [key.sender.as_str(), key.receiver.as_str()])
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Largest amount first; equal amounts keep key order.
    pub fn sorted_by_amount_desc(&self) -> Vec<(&FlowKey, f64)> {
        let mut flows: Vec<(&FlowKey, f64)> = self.iter().collect();
        flows.sort_by(|a, b| b.1.total_cmp(&a.1));
        flows
    }

    /// Participant sending the most in total, with that total.
    pub fn largest_sender(&self) -> Option<(&str, f64)> {
        largest(self.flows.iter().map(|(key, &amount)| (key.sender.as_str(), amount)))
    }

    /// Participant receiving the most in total, with that total.
    pub fn largest_receiver(&self) -> Option<(&str, f64)> {
        largest(self.flows.iter().map(|(key, &amount)| (key.receiver.as_str(), amount)))
    }
}

fn largest<'a>(amounts: impl Iterator<Item = (&'a str, f64)>) -> Option<(&'a str, f64)> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for (party, amount) in amounts {
        *totals.entry(party).or_default() += amount;
    }
    // Ties go to the alphabetically first name.
    totals
        .into_iter()
        .fold(None, |best: Option<(&str, f64)>, (party, total)| match best {
            Some((_, best_total)) if best_total >= total => best,
            _ => Some((party, total)),
        })
}

/// Folds records into per-pair totals.
#[derive(Debug, Default)]
pub struct FlowEngine {
    flows: BTreeMap<FlowKey, f64>,
    skipped: usize,
}

impl FlowEngine {
    pub fn load_records<'a>(&mut self, records: impl Iterator<Item = &'a Record>, columns: &ColumnConfig) {
        for record in records {
            let sender = record.sender(columns).unwrap_or(UNKNOWN_PARTY);
            let receiver = record.receiver(columns).unwrap_or(UNKNOWN_PARTY);
            if sender == UNKNOWN_PARTY || receiver == UNKNOWN_PARTY {
                trace!("Record {:?} has no sender or receiver. Skipping.", record);
                self.skipped += 1;
                continue;
            }
            let amount = match record.amount(columns) {
                FieldOutcome::Value(amount) => amount,
                FieldOutcome::Absent => {
                    trace!("Record {} -> {} has no amount. Skipping.", sender, receiver);
                    self.skipped += 1;
                    continue;
                }
                FieldOutcome::Invalid(raw) => {
                    trace!("Record {} -> {} has unparsable amount {:?}. Skipping.", sender, receiver, raw);
                    self.skipped += 1;
                    continue;
                }
            };
            if amount <= 0.0 {
                trace!("Record {} -> {} has non-positive amount {}. Skipping.", sender, receiver, amount);
                self.skipped += 1;
                continue;
            }
            *self.flows.entry(FlowKey::new(sender, receiver)).or_default() += amount;
        }
    }

    /// Number of records that did not contribute to any flow.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn into_flows(self) -> FlowMap {
        FlowMap { flows: self.flows }
    }
}

pub fn aggregate(records: &[Record], columns: &ColumnConfig) -> FlowMap {
    let mut engine = FlowEngine::default();
    engine.load_records(records.iter(), columns);
    if engine.skipped() > 0 {
        info!("{} records did not contribute to any flow", engine.skipped());
    }
    let flows = engine.into_flows();
    info!("Aggregated {} records into {} unique flows", records.len(), flows.len());
    flows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterPredicate, filter_records};
    use chrono::NaiveDate;

    fn record(sender: &str, receiver: &str, amount: &str, date: &str) -> Record {
        Record::from_pairs([("Nadawca", sender), ("Odbiorca", receiver), ("Kwota", amount), ("Data", date)])
    }

    fn sample() -> Vec<Record> {
        vec![
            record("A", "B", "1000.50", "2024-01-15"),
            record("B", "C", "2000.00", "2024-02-20"),
            record("A", "C", "1500.75", "2024-01-25"),
            record("C", "A", "500.00", "2024-03-10"),
            record("A", "B", "1000.50", "2024-01-20"),
        ]
    }

    #[test]
    fn test_aggregate_sums_pairs() {
        let flows = aggregate(&sample(), &ColumnConfig::default());
        assert_eq!(flows.len(), 4);
        assert_eq!(flows.get("A", "B"), Some(2001.0));
        assert_eq!(flows.get("B", "C"), Some(2000.0));
        assert_eq!(flows.get("A", "C"), Some(1500.75));
        assert_eq!(flows.get("C", "A"), Some(500.0));
    }

    #[test]
    fn test_aggregate_after_date_filter() {
        let columns = ColumnConfig::default();
        let predicate = FilterPredicate {
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            to: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..Default::default()
        };
        let filtered = filter_records(&sample(), &predicate, &columns);
        assert_eq!(filtered.len(), 3);
        let flows = aggregate(&filtered, &columns);
        assert_eq!(flows.len(), 2);
        assert_eq!(flows.get("A", "B"), Some(2001.0));
        assert_eq!(flows.get("A", "C"), Some(1500.75));
    }

    #[test]
    fn test_aggregate_empty() {
        let flows = aggregate(&[], &ColumnConfig::default());
        assert!(flows.is_empty());
        assert_eq!(flows.max_amount(), None);
        assert_eq!(flows.total_amount(), 0.0);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut records = sample();
        let forward = aggregate(&records, &ColumnConfig::default());
        records.reverse();
        let backward = aggregate(&records, &ColumnConfig::default());
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_skips_unusable_records() {
        let records = vec![
            record("A", "B", "abc", "2024-01-01"),
            record("A", "B", "-5", "2024-01-01"),
            record("A", "B", "0", "2024-01-01"),
            record("", "B", "10", "2024-01-01"),
            record("unknown", "B", "10", "2024-01-01"),
            Record::from_pairs([("Nadawca", "A"), ("Kwota", "10")]),
            record("A", "B", "1 500,75", "2024-01-01"),
        ];
        let mut engine = FlowEngine::default();
        engine.load_records(records.iter(), &ColumnConfig::default());
        assert_eq!(engine.skipped(), 6);
        let flows = engine.into_flows();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows.get("A", "B"), Some(1500.75));
    }

    #[test]
    fn test_amount_from_synonym_column() {
        let records = vec![
            Record::from_pairs([("Nadawca", "A"), ("Odbiorca", "B"), ("Value", "7")]),
            Record::from_pairs([("Nadawca", "A"), ("Odbiorca", "B"), ("Wartość", "3,5")]),
        ];
        let flows = aggregate(&records, &ColumnConfig::default());
        assert_eq!(flows.get("A", "B"), Some(10.5));
    }

    #[test]
    fn test_names_containing_arrows_do_not_collide() {
        let records = vec![
            record("A→B", "C", "1", ""),
            record("A", "B→C", "2", ""),
        ];
        let flows = aggregate(&records, &ColumnConfig::default());
        assert_eq!(flows.len(), 2);
        assert_eq!(flows.get("A→B", "C"), Some(1.0));
        assert_eq!(flows.get("A", "B→C"), Some(2.0));
    }

    #[test]
    fn test_summary_queries() {
        let flows = aggregate(&sample(), &ColumnConfig::default());
        assert_eq!(flows.max_amount(), Some(2001.0));
        assert_eq!(flows.total_amount(), 6001.75);
        assert_eq!(flows.participants(), vec!["A", "B", "C"]);
        assert_eq!(flows.largest_sender(), Some(("A", 3501.75)));
        assert_eq!(flows.largest_receiver(), Some(("C", 3500.75)));

        let order: Vec<(&str, &str)> = flows
            .sorted_by_amount_desc()
            .into_iter()
            .map(|(key, _)| (key.sender.as_str(), key.receiver.as_str()))
            .collect();
        assert_eq!(order, vec![("A", "B"), ("B", "C"), ("A", "C"), ("C", "A")]);
    }

    #[test]
    fn test_ties_keep_key_order() {
        let records = vec![record("B", "C", "5", ""), record("A", "C", "5", "")];
        let flows = aggregate(&records, &ColumnConfig::default());
        let first = flows.sorted_by_amount_desc()[0].0.clone();
        assert_eq!(first, FlowKey::new("A", "C"));
    }
}
