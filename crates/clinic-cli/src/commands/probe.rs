use clinic_console::normalize::{describe, normalize};
use clinic_console::{LoadFailure, RawResponse};
use clinic_models::ResourceKind;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cli::{OutputFormat, ProbeArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::print_json;

const BODY_PREFIX_CHARS: usize = 300;

/// What a raw list response looks like and how it would be read.
#[derive(Debug, Serialize)]
pub(crate) struct ProbeReport {
    pub(crate) kind: ResourceKind,
    pub(crate) url: String,
    pub(crate) status: u16,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body_prefix: String,
    pub(crate) is_json: bool,
    pub(crate) is_array: bool,
    pub(crate) top_level_keys: Vec<String>,
    pub(crate) payload: String,
    pub(crate) shape: Option<&'static str>,
    pub(crate) entries: usize,
}

pub(crate) fn analyse(kind: ResourceKind, raw: RawResponse) -> ProbeReport {
    let parsed = serde_json::from_str::<Value>(&raw.body).ok();
    let (shape, entries) = parsed.as_ref().map_or((None, 0), |payload| {
        let normalized = normalize(payload, kind.envelope_alias());
        (Some(normalized.shape.label()), normalized.entries.len())
    });
    let top_level_keys = match &parsed {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };
    ProbeReport {
        kind,
        url: raw.url,
        status: raw.status,
        headers: raw.headers,
        body_prefix: raw.body.chars().take(BODY_PREFIX_CHARS).collect(),
        is_json: parsed.is_some(),
        is_array: matches!(parsed, Some(Value::Array(_))),
        top_level_keys,
        payload: parsed.as_ref().map_or_else(|| "not JSON".to_string(), describe),
        shape,
        entries,
    }
}

pub(crate) fn format_report(report: &ProbeReport) -> String {
    let mut lines = vec![format!("GET {} -> {}", report.url, report.status)];
    lines.push("headers:".to_string());
    lines.extend(
        report
            .headers
            .iter()
            .map(|(name, value)| format!("  {name}: {value}")),
    );
    lines.push(format!("body: {}", report.body_prefix));
    lines.push(format!("payload: {}", report.payload));
    lines.push(format!("array: {}", if report.is_array { "yes" } else { "no" }));
    if !report.top_level_keys.is_empty() {
        lines.push(format!("keys: {}", report.top_level_keys.join(", ")));
    }
    match report.shape {
        Some(shape) => lines.push(format!("read as: {shape} ({} entries)", report.entries)),
        None => lines.push("read as: undecodable body".to_string()),
    }
    lines.join("\n")
}

pub(crate) async fn handle_probe(
    ctx: &AppContext,
    args: ProbeArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let kinds = args
        .kind
        .map_or_else(|| ResourceKind::ALL.to_vec(), |kind| vec![kind]);
    let mut reports = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let raw = ctx
            .api
            .probe(kind)
            .await
            .map_err(|err| CliError::from(LoadFailure::from(err)))?;
        debug!(kind = %kind, status = raw.status, "probe response");
        reports.push(analyse(kind, raw));
    }

    match format {
        OutputFormat::Json => print_json(&reports)?,
        OutputFormat::Table => {
            let sections: Vec<String> = reports.iter().map(format_report).collect();
            println!("{}", sections.join("\n\n"));
        }
    }
    Ok(())
}
