use std::io::{Error, Write};
use tempfile::NamedTempFile;

pub const HEADER: &str = "type, account, to, amount, name, currency, key";

/// Writes `rows` under the standard header into a temporary CSV file.
pub fn commands_file(rows: &[&str]) -> Result<NamedTempFile, Error> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{}", HEADER)?;
    for row in rows {
        writeln!(file, "{}", row)?;
    }
    file.flush()?;
    Ok(file)
}

/// One account followed by `rows` single-unit deposits, each with its own key.
pub fn generate_deposits(rows: usize) -> Result<NamedTempFile, Error> {
    let file = NamedTempFile::new()?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file.reopen()?);
    wtr.write_record(["type", "account", "to", "amount", "name", "currency", "key"])?;
    wtr.write_record(["open", "", "", "0", "bulk", "EUR", ""])?;
    for _ in 0..rows {
        wtr.write_record(["deposit", "1", "", "1", "", "", ""])?;
    }
    wtr.flush()?;
    Ok(file)
}
