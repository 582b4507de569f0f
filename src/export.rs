//! CSV export of chart series

use std::io::Write;
use thiserror::Error;

use crate::widgets::ChartBoard;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Widget not found: {0}")]
    WidgetNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write trace 0 of widget `id` as `label,value` rows.
///
/// Returns the number of data rows written.
pub async fn export_widget_csv<W: Write>(
    board: &ChartBoard,
    id: &str,
    writer: W,
) -> Result<usize, ExportError> {
    let series = board
        .widget(id)
        .await
        .and_then(|w| w.primary_series())
        .ok_or_else(|| ExportError::WidgetNotFound(id.to_string()))?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["label", "value"])?;

    let mut rows = 0;
    for (label, value) in series.x.iter().zip(&series.y) {
        let value = value.to_string();
        csv_writer.write_record([label.as_str(), value.as_str()])?;
        rows += 1;
    }
    csv_writer.flush()?;

    tracing::debug!(widget = %id, rows, "Exported chart series");
    Ok(rows)
}
