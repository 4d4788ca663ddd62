use crate::domain::model::ScrapedRecord;
use crate::utils::error::Result;
use std::path::Path;

/// Writes records as `name,address` CSV (header included).
pub fn write_records<W: std::io::Write>(writer: W, records: &[ScrapedRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    if records.is_empty() {
        csv_writer.write_record(["name", "address"])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_records_to_file<P: AsRef<Path>>(path: P, records: &[ScrapedRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = std::fs::File::create(path)?;
    write_records(file, records)?;
    tracing::info!(path = %path.display(), count = records.len(), "Records exported");
    Ok(())
}
