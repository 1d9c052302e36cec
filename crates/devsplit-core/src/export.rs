use std::io::{Read, Write};
use std::time::Instant;

use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use tracing::info;

use crate::error::Error;
use crate::path;
use crate::progress::ProgressReporter;
use crate::records::find_column;

/// Column written with each row's device label.
pub const OUTPUT_COLUMN: &str = "device_name";
/// Label for rows under a hidden folder.
pub const HIDDEN_LABEL: &str = "-";

const PROGRESS_EVERY: usize = 1000;

/// Export label of a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowLabel {
    Hidden,
    Unassigned,
    Device(String),
}

impl RowLabel {
    pub fn as_str(&self) -> &str {
        match self {
            RowLabel::Hidden => HIDDEN_LABEL,
            RowLabel::Unassigned => "",
            RowLabel::Device(name) => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub rows: usize,
    pub assigned: usize,
    pub unassigned: usize,
    pub hidden: usize,
    /// False when the source already had the output column.
    pub appended_column: bool,
}

/// Copy `input` to `output`, setting the device label of every row.
///
/// Columns and row order are preserved. The label column is overwritten in
/// place when present, appended otherwise. `label_for` receives the raw path
/// cell; rows with a blank path are unassigned.
pub fn project_csv<R, W, F>(
    input: R,
    output: W,
    path_column: &str,
    root: &str,
    label_for: F,
    reporter: &dyn ProgressReporter,
) -> Result<ExportSummary, Error>
where
    R: Read,
    W: Write,
    F: Fn(&str) -> RowLabel,
{
    let start = Instant::now();
    reporter.on_export_start();

    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
    let mut writer = WriterBuilder::new().flexible(true).from_writer(output);

    let mut headers = reader.headers()?.clone();
    let path_idx = find_column(&headers, path_column)
        .ok_or_else(|| Error::MissingColumn(path_column.to_string()))?;

    let mut summary = ExportSummary::default();
    let out_idx = match find_column(&headers, OUTPUT_COLUMN) {
        Some(idx) => idx,
        None => {
            headers.push_field(OUTPUT_COLUMN);
            summary.appended_column = true;
            headers.len() - 1
        }
    };
    writer.write_record(&headers)?;

    for record in reader.records() {
        let record = record?;
        let raw_path = record.get(path_idx).unwrap_or("").trim();

        let label = if path::is_root(raw_path, root) {
            RowLabel::Unassigned
        } else {
            label_for(raw_path)
        };
        match &label {
            RowLabel::Hidden => summary.hidden += 1,
            RowLabel::Unassigned => summary.unassigned += 1,
            RowLabel::Device(_) => summary.assigned += 1,
        }

        let mut fields: Vec<&str> = record.iter().collect();
        if fields.len() < out_idx {
            fields.resize(out_idx, "");
        }
        if summary.appended_column {
            fields.insert(out_idx, label.as_str());
        } else if fields.len() == out_idx {
            fields.push(label.as_str());
        } else {
            fields[out_idx] = label.as_str();
        }
        writer.write_record(&fields)?;

        summary.rows += 1;
        if summary.rows % PROGRESS_EVERY == 0 {
            reporter.on_export_progress(summary.rows);
        }
    }

    writer.flush()?;

    let duration = start.elapsed().as_secs_f64();
    reporter.on_export_complete(summary.rows, duration);
    info!(
        "Exported {} rows ({} assigned, {} unassigned, {} hidden) in {:.2}s",
        summary.rows, summary.assigned, summary.unassigned, summary.hidden, duration
    );

    Ok(summary)
}
