use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Colors a build result the way the CI server's UI does.
pub fn color_coded_result_cell(result: &str) -> Cell {
    match result {
        "succeeded" => Cell::new(result).fg(TableColor::Green),
        "partiallySucceeded" => Cell::new(result).fg(TableColor::Yellow),
        "failed" => Cell::new(result).fg(TableColor::Red),
        _ => Cell::new(result),
    }
}

pub fn count_cell(count: usize, color: TableColor) -> Cell {
    if count == 0 {
        Cell::new(count)
    } else {
        Cell::new(count).fg(color)
    }
}
