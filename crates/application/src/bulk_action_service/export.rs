use estatedesk_core::{AppError, AppResult};
use estatedesk_domain::ListRecord;
use serde_json::Value;

/// Writes rows as CSV with one column per requested field; returns the row count.
pub fn write_rows_csv<W: std::io::Write>(
    rows: &[ListRecord],
    columns: &[&str],
    writer: W,
) -> AppResult<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(columns).map_err(csv_error)?;

    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|column| cell_text(row.field(column)))
            .collect();
        csv_writer.write_record(&record).map_err(csv_error)?;
    }

    csv_writer
        .flush()
        .map_err(|error| AppError::Internal(format!("failed to flush CSV export: {error}")))?;
    Ok(rows.len())
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_error(error: csv::Error) -> AppError {
    AppError::Internal(format!("failed to write CSV export: {error}"))
}
