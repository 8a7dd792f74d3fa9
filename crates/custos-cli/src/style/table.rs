//! Tables via comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use custos::AttributeResult;
use custos_types::wire;

use super::colors::{SemanticStyle, status_style};

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(columns: &[&str]) -> Vec<Cell> {
    columns
        .iter()
        .map(|col| {
            if super::no_color() {
                Cell::new(col)
            } else {
                Cell::new(col).add_attribute(Attribute::Bold).fg(Color::Cyan)
            }
        })
        .collect()
}

/// Attribute report: one row per result, in report order.
pub fn report_table(results: &[AttributeResult]) -> Table {
    let mut table = base_table();
    table.set_header(header(&["Class", "Type", "Status", "Echo", "Value (base64)"]));

    for result in results {
        let status = result.status();
        table.add_row(vec![
            Cell::new(result.class()),
            Cell::new(result.attr_type()),
            Cell::new(status.as_str().styled(status_style(status))),
            Cell::new(result.echo()),
            Cell::new(result.value().map_or_else(String::new, |v| wire::encode(v))),
        ]);
    }

    table
}

/// Prints rows under a header, with a count footer.
pub fn print_table(columns: &[&str], rows: &[Vec<String>]) {
    let mut table = base_table();
    table.set_header(header(columns));
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");

    let count = rows.len();
    let noun = if count == 1 { "entry" } else { "entries" };
    println!("{}", format!("({count} {noun})").muted());
}

/// Prints a two-column key-value table.
pub fn print_info_table(entries: &[(&str, &str)]) {
    let mut table = base_table();
    for (key, value) in entries {
        let key_cell = if super::no_color() {
            Cell::new(key)
        } else {
            Cell::new(key).fg(Color::DarkGrey)
        };
        table.add_row(vec![key_cell, Cell::new(value)]);
    }
    println!("{table}");
}
