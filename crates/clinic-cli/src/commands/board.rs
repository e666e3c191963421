use std::sync::Arc;

use clinic_console::TreatmentBoard;
use clinic_console::filter::{matches, normalize_query};
use clinic_models::ResourceKind;

use crate::cli::{ListArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_board;

pub(crate) async fn handle_board(
    ctx: &AppContext,
    args: ListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if args.server_query.is_some() {
        return Err(CliError::validation(
            "--server-query is not supported by the treatment board",
        ));
    }
    let mut board = TreatmentBoard::new(
        Arc::clone(&ctx.api),
        ctx.config.aggregate_watchdog,
        ctx.profile(ResourceKind::Treatments).record_watchdog,
    );
    let state = board.load().await;
    if let Some(failure) = state.failure() {
        return Err(CliError::from(failure.clone()));
    }

    let query = normalize_query(args.query.as_deref().unwrap_or_default());
    let rows: Vec<_> = board
        .treatments()
        .iter()
        .zip(board.rows())
        .filter(|(treatment, _)| matches(*treatment, &query))
        .map(|(_, row)| row)
        .collect();
    render_board(&rows, board.status_line(), format)
}
