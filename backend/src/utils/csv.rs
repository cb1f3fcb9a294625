use anyhow::Context;
use csv::{QuoteStyle, WriterBuilder};

fn needs_formula_guard(value: &str) -> bool {
    matches!(value.chars().next(), Some('=' | '+' | '-' | '@' | '\t' | '\r'))
}

/// Prefixes cells a spreadsheet would evaluate as a formula.
pub fn guard_cell(value: &str) -> String {
    if needs_formula_guard(value) {
        format!("'{}", value)
    } else {
        value.to_string()
    }
}

/// Renders a header and rows as CSV with every cell quoted and guarded.
pub fn render_csv(header: &[&str], rows: &[Vec<String>]) -> anyhow::Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row.iter().map(|cell| guard_cell(cell)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush csv writer: {}", e.error()))?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}
