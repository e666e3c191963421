//! Command-line surface for the clinic records console.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clinic_console::config::DEFAULT_API_URL;
use clinic_models::{Medicine, Patient, ResourceKind, Staff, Treatment};
use clinic_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, command_span, init_logging};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliResult, TimingOverrides, build_config, parse_url};
use crate::commands::board::handle_board;
use crate::commands::probe::handle_probe;
use crate::commands::records::handle_records;
use crate::commands::seed::handle_seed;

/// Parse arguments, run the command and return the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format,
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("error: {err:#}");
        return 3;
    }

    let request_id = Uuid::new_v4().to_string();
    let span = command_span(&command_label(&cli.command), &request_id);
    match execute(cli, &request_id).instrument(span).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn execute(cli: Cli, request_id: &str) -> CliResult<()> {
    let timing = TimingOverrides {
        http_timeout_secs: cli.timeout,
        list_watchdog_ms: cli.list_watchdog_ms,
        record_watchdog_ms: cli.record_watchdog_ms,
        aggregate_watchdog_ms: cli.aggregate_watchdog_ms,
    };
    let config = build_config(cli.api_url, timing)?;
    let ctx = AppContext::new(config, request_id)?;
    dispatch(&ctx, cli.command, cli.output).await
}

pub(crate) async fn dispatch(ctx: &AppContext, command: Command, format: OutputFormat) -> CliResult<()> {
    match command {
        Command::Patients(command) => handle_records::<Patient>(ctx, command, format).await,
        Command::Staff(command) => handle_records::<Staff>(ctx, command, format).await,
        Command::Medicines(command) => handle_records::<Medicine>(ctx, command, format).await,
        Command::Treatments(RecordCommand::Ls(args)) => handle_board(ctx, args, format).await,
        Command::Treatments(command) => handle_records::<Treatment>(ctx, command, format).await,
        Command::Probe(args) => handle_probe(ctx, args, format).await,
        Command::Seed => handle_seed(ctx).await,
    }
}

#[derive(Parser)]
#[command(name = "clinic", version, about = "Console for the clinic records API")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "CLINIC_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) api_url: Url,
    /// Per-request HTTP timeout in seconds.
    #[arg(long, global = true, env = "CLINIC_HTTP_TIMEOUT_SECS")]
    pub(crate) timeout: Option<u64>,
    /// Watchdog for list loads, in milliseconds.
    #[arg(long, global = true, env = "CLINIC_LIST_WATCHDOG_MS")]
    pub(crate) list_watchdog_ms: Option<u64>,
    /// Watchdog for single-record loads and saves, in milliseconds.
    #[arg(long, global = true, env = "CLINIC_RECORD_WATCHDOG_MS")]
    pub(crate) record_watchdog_ms: Option<u64>,
    /// Watchdog for the treatment board, in milliseconds.
    #[arg(long, global = true, env = "CLINIC_AGGREGATE_WATCHDOG_MS")]
    pub(crate) aggregate_watchdog_ms: Option<u64>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(long, global = true, env = "CLINIC_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub(crate) log_level: String,
    /// `json`, `pretty` or `auto`.
    #[arg(long, global = true, env = "CLINIC_LOG_FORMAT", default_value = "auto")]
    pub(crate) log_format: LogFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Patient records.
    #[command(subcommand)]
    Patients(RecordCommand),
    /// Doctors and nurses.
    #[command(subcommand)]
    Staff(RecordCommand),
    /// Medicine stock.
    #[command(subcommand)]
    Medicines(RecordCommand),
    /// Treatments; `ls` renders the board with resolved names.
    #[command(subcommand)]
    Treatments(RecordCommand),
    /// Dump a raw list response and the envelope it would be read as.
    Probe(ProbeArgs),
    /// Insert sample patients.
    Seed,
}

#[derive(Subcommand, Debug)]
pub(crate) enum RecordCommand {
    /// List records, optionally filtered.
    Ls(ListArgs),
    /// Show one record.
    Get(GetArgs),
    /// Create a record from flags.
    Create(RecordFields),
    /// Load a record, apply the given flags and save it.
    Update(UpdateArgs),
    /// Delete one record.
    Delete(DeleteArgs),
    /// Delete several records in one call.
    DeleteMany(DeleteManyArgs),
    /// Interactive list console with search, selection and bulk actions.
    Console,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ListArgs {
    /// Client-side filter over the searchable fields.
    #[arg(long, short)]
    pub(crate) query: Option<String>,
    /// Sent to the server as `?q=`.
    #[arg(long)]
    pub(crate) server_query: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct GetArgs {
    pub(crate) id: String,
}

#[derive(Args, Debug)]
pub(crate) struct UpdateArgs {
    pub(crate) id: String,
    #[command(flatten)]
    pub(crate) fields: RecordFields,
}

#[derive(Args, Debug)]
pub(crate) struct DeleteArgs {
    pub(crate) id: String,
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    pub(crate) yes: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DeleteManyArgs {
    #[arg(required = true, num_args = 1..)]
    pub(crate) ids: Vec<String>,
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    pub(crate) yes: bool,
}

/// Form fields shared by every kind; each kind accepts its own subset.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct RecordFields {
    #[arg(long)]
    pub(crate) name: Option<String>,
    #[arg(long)]
    pub(crate) age: Option<u32>,
    #[arg(long)]
    pub(crate) history: Option<String>,
    /// `DOCTOR`, `NURSE` or any role the server knows.
    #[arg(long)]
    pub(crate) role: Option<String>,
    #[arg(long)]
    pub(crate) specialization: Option<String>,
    #[arg(long)]
    pub(crate) quantity: Option<u32>,
    /// Patient identifier (treatments).
    #[arg(long)]
    pub(crate) patient: Option<String>,
    /// Staff identifier (treatments).
    #[arg(long)]
    pub(crate) staff: Option<String>,
    /// Medicine identifier (treatments).
    #[arg(long)]
    pub(crate) medicine: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long)]
    pub(crate) notes: Option<String>,
    /// ISO-8601 timestamp; defaults to now on create.
    #[arg(long)]
    pub(crate) date: Option<String>,
    #[arg(long)]
    pub(crate) start_date: Option<String>,
    #[arg(long)]
    pub(crate) end_date: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ProbeArgs {
    /// Kind to probe; every kind when omitted.
    #[arg(long)]
    pub(crate) kind: Option<ResourceKind>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn command_label(command: &Command) -> String {
    let (kind, command) = match command {
        Command::Patients(command) => (ResourceKind::Patients, command),
        Command::Staff(command) => (ResourceKind::Staff, command),
        Command::Medicines(command) => (ResourceKind::Medicines, command),
        Command::Treatments(command) => (ResourceKind::Treatments, command),
        Command::Probe(_) => return "probe".to_string(),
        Command::Seed => return "seed".to_string(),
    };
    let action = match command {
        RecordCommand::Ls(_) => "ls",
        RecordCommand::Get(_) => "get",
        RecordCommand::Create(_) => "create",
        RecordCommand::Update(_) => "update",
        RecordCommand::Delete(_) => "delete",
        RecordCommand::DeleteMany(_) => "delete_many",
        RecordCommand::Console => "console",
    };
    format!("{kind}_{action}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("clinic").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn defaults_point_at_the_local_api() {
        let cli = parse(&["patients", "ls"]);
        assert_eq!(cli.api_url.as_str(), "http://127.0.0.1:8081/");
        assert_eq!(cli.output, OutputFormat::Table);
        assert_eq!(cli.log_level, DEFAULT_LOG_LEVEL);
        assert!(cli.list_watchdog_ms.is_none());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = parse(&[
            "staff",
            "ls",
            "--query",
            "nurse",
            "--output",
            "json",
            "--list-watchdog-ms",
            "2500",
        ]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.list_watchdog_ms, Some(2_500));
        match cli.command {
            Command::Staff(RecordCommand::Ls(args)) => {
                assert_eq!(args.query.as_deref(), Some("nurse"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn create_collects_record_fields() {
        let cli = parse(&[
            "patients", "create", "--name", "Ana", "--age", "28", "--history", "Asthma",
        ]);
        match cli.command {
            Command::Patients(RecordCommand::Create(fields)) => {
                assert_eq!(fields.name.as_deref(), Some("Ana"));
                assert_eq!(fields.age, Some(28));
                assert_eq!(fields.history.as_deref(), Some("Asthma"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn negative_age_is_rejected_by_the_parser() {
        let result = Cli::try_parse_from(["clinic", "patients", "create", "--age", "-3"]);
        assert!(result.is_err());
    }

    #[test]
    fn delete_many_requires_ids() {
        assert!(Cli::try_parse_from(["clinic", "medicines", "delete-many"]).is_err());
        let cli = parse(&["medicines", "delete-many", "m1", "m2", "--yes"]);
        match cli.command {
            Command::Medicines(RecordCommand::DeleteMany(args)) => {
                assert_eq!(args.ids, ["m1", "m2"]);
                assert!(args.yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn probe_kind_is_parsed() {
        let cli = parse(&["probe", "--kind", "staff"]);
        match cli.command {
            Command::Probe(args) => assert_eq!(args.kind, Some(ResourceKind::Staff)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn invalid_api_url_is_rejected() {
        assert!(Cli::try_parse_from(["clinic", "--api-url", "not a url", "seed"]).is_err());
    }

    #[test]
    fn command_label_matches_variants() {
        assert_eq!(
            command_label(&Command::Patients(RecordCommand::Ls(ListArgs::default()))),
            "patients_ls"
        );
        assert_eq!(
            command_label(&Command::Treatments(RecordCommand::Console)),
            "treatments_console"
        );
        assert_eq!(command_label(&Command::Seed), "seed");
    }
}
