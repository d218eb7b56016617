use comfy_table::{Attribute, Cell, CellAlignment, Table, modifiers, presets};

use crate::dump::Report;

#[must_use]
pub fn build_run_table(reports: &[Report]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table.set_header(vec!["Source", "Records", "File"]);
    for report in reports {
        table.add_row(vec![
            Cell::new(report.vendor),
            Cell::new(report.file.n_records).set_alignment(CellAlignment::Right),
            Cell::new(report.file.path.display()).add_attribute(Attribute::Dim),
        ]);
    }
    table
}
