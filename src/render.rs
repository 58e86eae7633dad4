//! Plain-text and JSON rendering of query results for the terminal.

use crate::core::db::QueryResult;
use crate::core::Result;

/// Renders a result as a padded table followed by a row count.
///
/// Statements without a result set render as an affected-rows line.
pub fn render_table(result: &QueryResult) -> String {
    if !result.has_rows() {
        let mut out = format!("OK, {} row(s) affected", result.affected_rows);
        if let Some(id) = result.last_insert_id {
            out.push_str(&format!(" (last insert id {})", id));
        }
        return out;
    }

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &result.rows {
        for (i, value) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(value.chars().count());
            }
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(result.rows.len() + 3);
    lines.push(format_row(&result.columns));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &result.rows {
        lines.push(format_row(row));
    }
    lines.push(format!("({} rows)", result.row_count));
    lines.join("\n")
}

/// Renders a result as pretty-printed JSON.
pub fn render_json(result: &QueryResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}
