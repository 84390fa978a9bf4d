use comfy_table::{presets, ContentArrangement, Table};
use console::Style;

pub fn style_success() -> Style {
    Style::new().green()
}

pub fn style_dim() -> Style {
    Style::new().dim()
}

pub fn print_success(msg: &str) {
    println!("  {} {}", style_success().apply_to("✓"), msg);
}

/// Key-value info card: no header, no borders.
pub fn info_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print table with 2-space left indent.
pub fn print_table(table: &Table) {
    for line in table.lines() {
        println!("  {}", line);
    }
}
