use log::{error, info, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use crate::record::Record;

/// Reads CSV rows keyed by the header row. Short rows keep only the cells
/// they have; rows that fail to decode are skipped.
pub fn read_records<R: Read>(reader: R) -> Vec<Record> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            error!("Failed to read the CSV header row: {}", e);
            return Vec::new();
        }
    };
    reader
        .into_records()
        .filter_map(|result| match result {
            Ok(row) => Some(Record::from_pairs(headers.iter().zip(row.iter()))),
            Err(e) => {
                warn!("Failed to parse a row from the CSV file: {}. Skipping invalid record.", e);
                None
            }
        })
        .collect()
}

/// Loads all records from a CSV file. A missing or unreadable file yields no records.
pub fn load_csv_file(path: &Path) -> Vec<Record> {
    info!("Loading {}", path.display());
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            error!("Cannot open {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let records = read_records(file);
    info!("Loaded {} records", records.len());
    records
}
