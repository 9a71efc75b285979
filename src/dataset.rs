//! Reading the clause dataset
//!
//! The dataset is a CSV file with a header row. A `text` column is required
//! and an `id` column is optional; any other column is ignored.

use crate::document::Document;
use crate::error::{Error, Result};
use std::io::Read;
use std::path::Path;

const TEXT_COLUMN: &str = "text";
const ID_COLUMN: &str = "id";

/// Loads the clauses of a CSV file.
///
/// Rows whose trimmed `text` is empty are skipped. The order of the remaining
/// rows is kept.
///
/// # Errors
///
/// * [`Error::Configuration`] if the file has no `text` column
/// * [`Error::Csv`] / [`Error::Io`] if the file cannot be read or parsed
pub fn load_clauses(path: impl AsRef<Path>) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        Error::configuration(format!("Cannot open dataset '{}': {}", path.display(), e))
    })?;

    read_clauses(file)
}

/// Same as [`load_clauses`] over any reader.
pub fn read_clauses<R: Read>(reader: R) -> Result<Vec<Document>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let text_col = headers
        .iter()
        .position(|h| h.trim() == TEXT_COLUMN)
        .ok_or_else(|| Error::configuration("CSV must have a 'text' column."))?;
    let id_col = headers.iter().position(|h| h.trim() == ID_COLUMN);

    let mut documents = Vec::new();
    let mut skipped = 0usize;

    for record in rdr.records() {
        let record = record?;

        let text = record.get(text_col).unwrap_or("").trim();
        if text.is_empty() {
            skipped += 1;
            continue;
        }

        let id = id_col
            .and_then(|col| record.get(col))
            .unwrap_or("")
            .to_string();

        documents.push(Document::new(id, text));
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} rows with empty text", skipped);
    }

    Ok(documents)
}
