use std::borrow::Cow;
use std::fmt::Write as _;

use crate::table::NormalizedTable;

const NULL_DISPLAY: &str = "NULL";

/// Renders up to `limit` rows of a normalized table with typed column headers.
pub fn render_normalized(table: &NormalizedTable, limit: Option<usize>) -> String {
    let headers = table
        .columns
        .iter()
        .map(|column| {
            let marker = if column.nullable { "?" } else { "" };
            format!("{}:{}{marker}", column.name, column.semantic_type)
        })
        .collect::<Vec<_>>();
    let rows = table
        .rows
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Some(value) => value.as_display(),
                    None => NULL_DISPLAY.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(headers.len()) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let rule = widths
        .iter()
        .map(|w| "-".repeat((*w).max(3)))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&sanitized));
            format!("{sanitized}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.truncate(line.trim_end().len());
    line
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_table_aligns_columns() {
        let headers = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            vec!["1".to_string(), "Alice".to_string()],
            vec!["2".to_string(), "Bob".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["id  name", "---  -----", "1   Alice", "2   Bob"]);
    }

    #[test]
    fn render_table_flattens_control_characters() {
        let headers = vec!["note".to_string()];
        let rows = vec![vec!["line1\nline2\tvalue".to_string()]];
        let rendered = render_table(&headers, &rows);
        assert_eq!(rendered.lines().nth(2), Some("line1 line2 value"));
    }
}
