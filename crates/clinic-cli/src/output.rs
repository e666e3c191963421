//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use clinic_console::TreatmentRow;
use clinic_models::{Medicine, Patient, RecordId, Resource, Staff, Treatment};
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

/// Fixed-width table layout for one record kind.
pub(crate) trait Tabular: Resource {
    fn header() -> String;
    fn row(&self) -> String;
}

impl Tabular for Patient {
    fn header() -> String {
        format!("{:<24} {:<28} {:>4} HISTORY", "ID", "NAME", "AGE")
    }

    fn row(&self) -> String {
        let age = self.age.map(|age| age.to_string()).unwrap_or_default();
        format!(
            "{:<24} {:<28} {:>4} {}",
            id_cell(self.id.as_ref()),
            self.name,
            age,
            self.medical_history
        )
    }
}

impl Tabular for Staff {
    fn header() -> String {
        format!("{:<24} {:<28} {:<8} SPECIALIZATION", "ID", "NAME", "ROLE")
    }

    fn row(&self) -> String {
        format!(
            "{:<24} {:<28} {:<8} {}",
            id_cell(self.id.as_ref()),
            self.name,
            self.role,
            self.specialization.as_deref().unwrap_or("-")
        )
    }
}

impl Tabular for Medicine {
    fn header() -> String {
        format!("{:<24} {:<28} {:>8}", "ID", "NAME", "QTY")
    }

    fn row(&self) -> String {
        let quantity = self
            .quantity
            .map_or_else(|| "-".to_string(), |quantity| quantity.to_string());
        format!(
            "{:<24} {:<28} {:>8}",
            id_cell(self.id.as_ref()),
            self.name,
            quantity
        )
    }
}

impl Tabular for Treatment {
    fn header() -> String {
        format!(
            "{:<24} {:<12} {:<12} {:<12} DESCRIPTION",
            "ID", "PATIENT", "STAFF", "MEDICINE"
        )
    }

    fn row(&self) -> String {
        format!(
            "{:<24} {:<12} {:<12} {:<12} {}",
            id_cell(self.id.as_ref()),
            self.patient_id,
            self.staff_id,
            self.medicine_id,
            self.description
        )
    }
}

pub(crate) fn id_cell(id: Option<&RecordId>) -> &str {
    id.map_or("-", RecordId::as_str)
}

/// Header plus one row per record.
pub(crate) fn format_table<R: Tabular>(records: &[R]) -> String {
    let mut lines = vec![R::header()];
    lines.extend(records.iter().map(Tabular::row));
    lines.join("\n")
}

pub(crate) fn render_records<R: Tabular>(
    records: &[R],
    status: &str,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(records)?,
        OutputFormat::Table => {
            println!("{}", format_table(records));
            println!("{status}");
        }
    }
    Ok(())
}

/// `field: value` lines for one record, in declaration order.
pub(crate) fn format_fields<T: Serialize>(record: &T) -> CliResult<String> {
    let value = serde_json::to_value(record)
        .map_err(|err| CliError::failure(anyhow!("failed to encode record: {err}")))?;
    let Value::Object(map) = value else {
        return Ok(value.to_string());
    };
    let lines: Vec<String> = map
        .iter()
        .map(|(field, value)| format!("{field}: {}", scalar(value)))
        .collect();
    Ok(lines.join("\n"))
}

pub(crate) fn render_record<T: Serialize>(record: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(record)?,
        OutputFormat::Table => println!("{}", format_fields(record)?),
    }
    Ok(())
}

pub(crate) fn format_board(rows: &[TreatmentRow]) -> String {
    let mut lines = vec![format!(
        "{:<24} {:<20} {:<20} {:<20} {:<16} DESCRIPTION",
        "ID", "DATE", "PATIENT", "STAFF", "MEDICINE"
    )];
    lines.extend(rows.iter().map(|row| {
        format!(
            "{:<24} {:<20} {:<20} {:<20} {:<16} {}",
            id_cell(row.id.as_ref()),
            row.date,
            row.patient,
            row.staff,
            row.medicine,
            row.description
        )
    }));
    lines.join("\n")
}

pub(crate) fn render_board(rows: &[TreatmentRow], status: &str, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<Value> = rows
                .iter()
                .map(|row| {
                    json!({
                        "id": row.id,
                        "date": row.date,
                        "patient": row.patient,
                        "staff": row.staff,
                        "medicine": row.medicine,
                        "description": row.description,
                        "notes": row.notes,
                    })
                })
                .collect();
            print_json(&rows)?;
        }
        OutputFormat::Table => {
            println!("{}", format_board(rows));
            println!("{status}");
        }
    }
    Ok(())
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
