//! Bordered plain-text tables.

use super::{Layout, Table};

/// Narrowest a column is squeezed to when the table must fit `max_width`.
const MIN_COLUMN_WIDTH: usize = 4;

/// Render `table` as a bordered grid no wider than `max_width` characters
/// (when the column count allows). Cells that do not fit are wrapped.
pub fn render_text(table: &Table, max_width: usize) -> String {
    let mut out = String::new();
    if let Some(title) = &table.title {
        out.push_str(title);
        out.push('\n');
    }

    let columns = table.columns.len().max(1);
    let header = match table.layout {
        Layout::Columns => Some(&table.columns),
        Layout::KeyValue => None,
    };

    let mut widths = vec![0usize; columns];
    for row in header.into_iter().chain(table.rows.iter()) {
        for (i, cell) in row.iter().enumerate().take(columns) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    if table.rows.is_empty() {
        let needed = table.empty_message.chars().count();
        let inner = inner_width(&widths);
        if needed > inner {
            widths[columns - 1] += needed - inner;
        }
    }
    fit_widths(&mut widths, max_width);

    let rule = rule_line(&widths);
    out.push_str(&rule);

    if let Some(header) = header {
        push_row(&mut out, header, &widths);
        out.push_str(&rule);
    }

    if table.rows.is_empty() {
        let inner = inner_width(&widths);
        let message: String = table.empty_message.chars().take(inner).collect();
        out.push_str(&format!("| {message:^inner$} |\n"));
        out.push_str(&rule);
    } else {
        for row in &table.rows {
            push_row(&mut out, row, &widths);
            out.push_str(&rule);
        }
    }

    out
}

/// Width available to a cell spanning every column.
fn inner_width(widths: &[usize]) -> usize {
    widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)
}

/// Total line width: `| a | b |` is content plus three per column plus one.
fn total_width(widths: &[usize]) -> usize {
    widths.iter().sum::<usize>() + 3 * widths.len() + 1
}

/// Shrink the widest columns one character at a time until the table fits.
fn fit_widths(widths: &mut [usize], max_width: usize) {
    while total_width(widths) > max_width {
        let Some((widest, width)) = widths
            .iter()
            .copied()
            .enumerate()
            .max_by_key(|(_, w)| *w)
        else {
            return;
        };
        if width <= MIN_COLUMN_WIDTH {
            return;
        }
        widths[widest] -= 1;
    }
}

fn rule_line(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line.push('\n');
    line
}

fn push_row(out: &mut String, row: &[String], widths: &[usize]) {
    let wrapped: Vec<Vec<String>> = widths
        .iter()
        .enumerate()
        .map(|(i, width)| wrap(row.get(i).map(String::as_str).unwrap_or(""), *width))
        .collect();
    let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

    for line in 0..height {
        out.push('|');
        for (cell, width) in wrapped.iter().zip(widths) {
            let text = cell.get(line).map(String::as_str).unwrap_or("");
            out.push_str(&format!(" {text:<width$} |"));
        }
        out.push('\n');
    }
}

/// Split `text` into chunks of at most `width` characters.
fn wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}
