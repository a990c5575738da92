//! CSV encoding of datasets
//!
//! Null cells are written as empty fields. On the way back in, each column's
//! [`ColumnKind`] decides how a cell is typed, so a dataset written here reads
//! back equal to itself.

use super::{ColumnKind, Dataset, FieldValue, ListingRow, Schema};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Header mismatch: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Row {row}: invalid value {value:?} in column '{column}'")]
    BadCell {
        row: usize,
        column: String,
        value: String,
    },
}

/// Writes the header and every row of `dataset`
pub fn write_csv<W: io::Write>(dataset: &Dataset, writer: W) -> Result<(), TableError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(dataset.schema().names())?;
    for row in dataset.rows() {
        wtr.write_record(
            dataset
                .schema()
                .names()
                .map(|name| encode_cell(row.get(name))),
        )?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Reads rows laid out as `schema`. The header must match the schema exactly.
pub fn read_csv<R: io::Read>(schema: &Schema, reader: R) -> Result<Dataset, TableError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let found: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let expected: Vec<String> = schema.names().map(str::to_string).collect();
    if found != expected {
        return Err(TableError::HeaderMismatch { expected, found });
    }

    let mut dataset = Dataset::new(schema.clone());
    for (index, record) in rdr.records().enumerate() {
        let record = record?;
        let mut row = ListingRow::new();
        for (column, raw) in schema.columns().iter().zip(record.iter()) {
            let value = decode_cell(column.kind, raw).ok_or_else(|| TableError::BadCell {
                row: index + 1,
                column: column.name.clone(),
                value: raw.to_string(),
            })?;
            row.set(column.name.clone(), value);
        }
        dataset.push(row);
    }
    Ok(dataset)
}

fn encode_cell(value: Option<&FieldValue>) -> String {
    value.map(FieldValue::to_string).unwrap_or_default()
}

/// `None` when the cell cannot hold a value of `kind`; `Some(None)` for null.
fn decode_cell(kind: ColumnKind, raw: &str) -> Option<Option<FieldValue>> {
    if raw.is_empty() {
        return Some(None);
    }
    let value = match kind {
        ColumnKind::Postcode | ColumnKind::Text => FieldValue::Text(raw.to_string()),
        ColumnKind::Field => match raw.parse::<i64>() {
            Ok(n) => FieldValue::Int(n),
            Err(_) => FieldValue::Text(raw.to_string()),
        },
        ColumnKind::Keyword => match raw {
            "true" | "True" | "TRUE" => FieldValue::Bool(true),
            "false" | "False" | "FALSE" => FieldValue::Bool(false),
            _ => return None,
        },
    };
    Some(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, POSTCODE_COLUMN};
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new(POSTCODE_COLUMN, ColumnKind::Postcode),
            Column::new("price", ColumnKind::Field),
            Column::new("parking space", ColumnKind::Keyword),
            Column::new("text", ColumnKind::Text),
        ])
    }

    #[test]
    fn test_csv_preserves_types_and_nulls() {
        let dataset = Dataset::with_rows(
            schema(),
            vec![
                ListingRow::new()
                    .with(POSTCODE_COLUMN, Some("SW1A 1AA".into()))
                    .with("price", Some(FieldValue::Int(350_000)))
                    .with("parking space", Some(true.into()))
                    .with("text", Some("Bright flat, \"quiet\"\nnear park".into())),
                ListingRow::new()
                    .with(POSTCODE_COLUMN, Some("SW1A 1AA".into()))
                    .with("price", Some("POA".into())),
            ],
        );

        let mut buf = Vec::new();
        write_csv(&dataset, &mut buf).unwrap();
        let back = read_csv(&schema(), buf.as_slice()).unwrap();

        assert_eq!(back, dataset);
    }

    #[test]
    fn test_header_mismatch_is_rejected() {
        let csv = "postcode,price\nA,1\n";
        let err = read_csv(&schema(), csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::HeaderMismatch { .. }));
    }

    #[test]
    fn test_bad_keyword_cell_is_rejected() {
        let csv = "postcode,price,parking space,text\nA,1,maybe,\n";
        let err = read_csv(&schema(), csv.as_bytes()).unwrap_err();
        match err {
            TableError::BadCell { row, column, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, "parking space");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_capitalised_booleans_are_accepted() {
        let csv = "postcode,price,parking space,text\nA,,True,\n";
        let dataset = read_csv(&schema(), csv.as_bytes()).unwrap();
        assert_eq!(
            dataset.rows()[0].get("parking space"),
            Some(&FieldValue::Bool(true))
        );
    }
}
