use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use dstore_core::JobState;
use dstore_model::{FieldType, ImportStatus, Schema};

use dstore_cli::pipeline::ImportOutcome;

pub fn print_import(outcome: &ImportOutcome) {
    let summary = &outcome.summary;
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![header_cell("Field"), header_cell("Value")]);
    table.add_row(vec![Cell::new("Resource"), Cell::new(outcome.resource.id())]);
    table.add_row(vec![
        Cell::new("File"),
        Cell::new(outcome.resource.file_path().display()),
    ]);
    table.add_row(vec![Cell::new("Storage"), Cell::new(outcome.storage)]);
    table.add_row(vec![
        Cell::new("Status"),
        status_cell(summary.result.status()),
    ]);
    table.add_row(vec![Cell::new("Passes"), number_cell(summary.passes)]);
    table.add_row(vec![
        Cell::new("Chunks"),
        number_cell(summary.checkpoint.chunks_processed),
    ]);
    table.add_row(vec![
        Cell::new("Rows read"),
        number_cell(summary.checkpoint.record_number),
    ]);
    table.add_row(vec![Cell::new("Records stored"), number_cell(outcome.stored)]);
    println!("{table}");
    if let Some(error) = summary.result.error() {
        eprintln!("error: {error}");
    }
}

pub fn print_status(state: &JobState) {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("Resource"),
        header_cell("File"),
        header_cell("Status"),
        header_cell("Chunks"),
        header_cell("Rows read"),
        header_cell("Chunk size"),
        header_cell("Storage"),
    ]);
    table.add_row(vec![
        Cell::new(state.resource.id()),
        Cell::new(state.resource.file_path().display()),
        status_cell(state.status),
        number_cell(state.chunks_processed),
        number_cell(state.record_number),
        number_cell(state.chunk_size),
        Cell::new(&state.storage),
    ]);
    println!("{table}");
    if let Some(error) = &state.error {
        eprintln!("error: {error}");
    }
}

pub fn print_schema(schema: &Schema) {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.set_header(vec![
        header_cell("#"),
        header_cell("Field"),
        header_cell("Type"),
        header_cell("Header"),
    ]);
    for (index, field) in schema.fields().iter().enumerate() {
        let header = match &field.description {
            Some(description) => Cell::new(description),
            None => Cell::new("(unchanged)").add_attribute(Attribute::Dim),
        };
        let field_type = match field.field_type {
            FieldType::Text => "text",
        };
        table.add_row(vec![
            number_cell(index + 1),
            Cell::new(&field.name).add_attribute(Attribute::Bold),
            Cell::new(field_type),
            header,
        ]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn number_cell(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

fn status_cell(status: ImportStatus) -> Cell {
    let color = match status {
        ImportStatus::Done => Color::Green,
        ImportStatus::Stopped => Color::Yellow,
        ImportStatus::Error => Color::Red,
    };
    Cell::new(status)
        .fg(color)
        .add_attribute(Attribute::Bold)
}
