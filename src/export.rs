//! One-way renderings of the quote history, plus reading CSV or JSON exports back.

use std::{fmt::Write as _, fs, path::Path, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{
    errors::{QuoteError, Result},
    validation::DataValidator,
};
use crate::domain::{Quote, QuoteStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xml,
    Txt,
    Html,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Csv,
        ExportFormat::Json,
        ExportFormat::Xml,
        ExportFormat::Txt,
        ExportFormat::Html,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Json => "JSON",
            ExportFormat::Xml => "XML",
            ExportFormat::Txt => "Plain text",
            ExportFormat::Html => "HTML",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Txt => "txt",
            ExportFormat::Html => "html",
        }
    }

    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for ExportFormat {
    type Err = QuoteError;

    fn from_str(raw: &str) -> Result<Self> {
        let wanted = raw.trim().trim_start_matches('.').to_ascii_lowercase();
        ExportFormat::ALL
            .into_iter()
            .find(|format| format.extension() == wanted || (wanted == "text" && *format == ExportFormat::Txt))
            .ok_or_else(|| QuoteError::InvalidInput(format!("unknown export format `{}`", raw.trim())))
    }
}

/// Flat shape written to every export format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuoteRecord {
    pub id: Uuid,
    pub piece_name: String,
    pub print_time: f64,
    pub filament_used: f64,
    #[serde(default)]
    pub filament_type: String,
    pub material_cost: f64,
    #[serde(default)]
    pub print_time_cost: f64,
    #[serde(default)]
    pub electricity_cost: f64,
    pub subtotal: f64,
    pub profit_margin: f64,
    pub final_price: f64,
    #[serde(default)]
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Quote> for QuoteRecord {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id,
            piece_name: quote.piece_name.clone(),
            print_time: quote.total_hours,
            filament_used: quote.weight_g,
            filament_type: quote.filament_type.clone(),
            material_cost: quote.material_cost,
            print_time_cost: quote.print_time_cost,
            electricity_cost: quote.electricity_cost,
            subtotal: quote.subtotal(),
            profit_margin: quote.profit_margin_percent,
            final_price: quote.final_price,
            status: quote.status,
            created_at: quote.created_at,
        }
    }
}

impl QuoteRecord {
    pub fn into_quote(self) -> Quote {
        Quote {
            id: self.id,
            piece_name: self.piece_name,
            weight_g: self.filament_used,
            total_hours: self.print_time,
            filament_type: self.filament_type,
            material_cost: self.material_cost,
            print_time_cost: self.print_time_cost,
            electricity_cost: self.electricity_cost,
            profit_margin_percent: self.profit_margin,
            final_price: self.final_price,
            status: self.status,
            notes: String::new(),
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }

    fn validate(&self) -> Result<()> {
        DataValidator::validate_piece_name(&self.piece_name)?;
        DataValidator::validate_print_time(self.print_time)?;
        DataValidator::validate_filament_used(self.filament_used)?;
        DataValidator::validate_cost(self.final_price)?;
        Ok(())
    }
}

/// `currency_symbol` prefixes money in the human-readable formats (TXT, HTML).
pub fn render(format: ExportFormat, quotes: &[Quote], currency_symbol: &str) -> Result<String> {
    let records: Vec<QuoteRecord> = quotes.iter().map(QuoteRecord::from).collect();
    match format {
        ExportFormat::Csv => render_csv(&records),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(&records)?),
        ExportFormat::Xml => Ok(render_xml(&records)),
        ExportFormat::Txt => Ok(render_txt(&records, currency_symbol)),
        ExportFormat::Html => Ok(render_html(&records, currency_symbol)),
    }
}

/// Writes `quotes` to `path` and returns how many were exported.
pub fn export_quotes(
    path: &Path,
    format: ExportFormat,
    quotes: &[Quote],
    currency_symbol: &str,
) -> Result<usize> {
    let contents = render(format, quotes, currency_symbol)?;
    fs::write(path, contents)?;
    tracing::info!(path = %path.display(), format = format.label(), count = quotes.len(), "quotes exported");
    Ok(quotes.len())
}

/// Reads a CSV or JSON export. Records that fail validation are skipped with a warning.
pub fn import_quotes(path: &Path, format: ExportFormat) -> Result<Vec<QuoteRecord>> {
    let records = match format {
        ExportFormat::Csv => read_csv(path)?,
        ExportFormat::Json => serde_json::from_str(&fs::read_to_string(path)?)?,
        other => {
            return Err(QuoteError::InvalidInput(format!(
                "{} files cannot be imported",
                other.label()
            )))
        }
    };
    Ok(records
        .into_iter()
        .filter(|record| match record.validate() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(id = %record.id, error = %err, "skipping invalid quote record");
                false
            }
        })
        .collect())
}

fn render_csv(records: &[QuoteRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| QuoteError::StorageError(format!("csv: {}", err.error())))?;
    String::from_utf8(bytes).map_err(|err| QuoteError::StorageError(err.to_string()))
}

fn read_csv(path: &Path) -> Result<Vec<QuoteRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<QuoteRecord>().enumerate() {
        match row {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(path = %path.display(), row = index + 2, error = %err, "skipping malformed quote row");
            }
        }
    }
    Ok(records)
}

fn render_xml(records: &[QuoteRecord]) -> String {
    let mut out = String::from("<?xml version='1.0' encoding='utf-8'?>\n<quotes>\n");
    for record in records {
        out.push_str("  <quote>\n");
        for (tag, value) in record_fields(record) {
            let _ = writeln!(out, "    <{tag}>{}</{tag}>", escape_markup(&value));
        }
        out.push_str("  </quote>\n");
    }
    out.push_str("</quotes>\n");
    out
}

fn render_txt(records: &[QuoteRecord], symbol: &str) -> String {
    let money = |value: f64| DataValidator::format_currency_with(value, symbol);
    let mut out = format!("Quote history\n{}\n\n", "=".repeat(50));
    for r in records {
        let _ = writeln!(out, "ID: {}", r.id);
        let _ = writeln!(out, "Piece: {}", r.piece_name);
        let _ = writeln!(out, "Print time: {} h", r.print_time);
        let _ = writeln!(out, "Filament used: {} g ({})", r.filament_used, r.filament_type);
        let _ = writeln!(out, "Material cost: {}", money(r.material_cost));
        let _ = writeln!(out, "Machine time cost: {}", money(r.print_time_cost));
        let _ = writeln!(out, "Electricity cost: {}", money(r.electricity_cost));
        let _ = writeln!(out, "Subtotal: {}", money(r.subtotal));
        let _ = writeln!(out, "Profit margin: {}%", r.profit_margin);
        let _ = writeln!(out, "Final price: {}", money(r.final_price));
        let _ = writeln!(out, "Date: {}", r.created_at.to_rfc3339());
        let _ = writeln!(out, "{}\n", "-".repeat(30));
    }
    out
}

fn render_html(records: &[QuoteRecord], symbol: &str) -> String {
    let money = |value: f64| escape_markup(&DataValidator::format_currency_with(value, symbol));
    let mut out = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n    <title>Quote history</title>\n    <style>\n        body { font-family: Arial, sans-serif; margin: 20px; }\n        table { border-collapse: collapse; width: 100%; }\n        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n        th { background-color: #f2f2f2; }\n    </style>\n</head>\n<body>\n    <h1>Quote history</h1>\n    <table>\n        <tr>",
    );
    for header in [
        "ID",
        "Piece",
        "Print time (h)",
        "Filament (g)",
        "Material cost",
        "Subtotal",
        "Margin (%)",
        "Final price",
        "Date",
    ] {
        let _ = write!(out, "<th>{}</th>", header);
    }
    out.push_str("</tr>\n");
    for r in records {
        let _ = writeln!(
            out,
            "        <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}%</td><td>{}</td><td>{}</td></tr>",
            r.id,
            escape_markup(&r.piece_name),
            r.print_time,
            r.filament_used,
            money(r.material_cost),
            money(r.subtotal),
            r.profit_margin,
            money(r.final_price),
            r.created_at.to_rfc3339()
        );
    }
    out.push_str("    </table>\n</body>\n</html>\n");
    out
}

fn record_fields(r: &QuoteRecord) -> Vec<(&'static str, String)> {
    vec![
        ("id", r.id.to_string()),
        ("piece_name", r.piece_name.clone()),
        ("print_time", r.print_time.to_string()),
        ("filament_used", r.filament_used.to_string()),
        ("filament_type", r.filament_type.clone()),
        ("material_cost", r.material_cost.to_string()),
        ("print_time_cost", r.print_time_cost.to_string()),
        ("electricity_cost", r.electricity_cost.to_string()),
        ("subtotal", r.subtotal.to_string()),
        ("profit_margin", r.profit_margin.to_string()),
        ("final_price", r.final_price.to_string()),
        ("status", r.status.to_string()),
        ("created_at", r.created_at.to_rfc3339()),
    ]
}

fn escape_markup(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
