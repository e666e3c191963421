//! Interactive list console: one controller driven by line commands.
//!
//! Input is read one line at a time without holding the stdin lock, so the
//! delete confirmation can prompt on the same stream.

use std::io::{self, Write};

use anyhow::anyhow;
use clinic_console::{CollectionController, Confirm, GateNotice, LoadState, ResourceApi};
use clinic_models::{RecordId, Resource};

use crate::client::{AppContext, CliError, CliResult, prompt_confirm};
use crate::commands::records::controller;
use crate::output::{Tabular, id_cell};

const HELP: &str = "\
commands:
  list               show the visible records
  search <text>      filter by any searchable field
  clear              drop the filter
  toggle <id>        select or deselect a visible record
  all                select every visible record (again to undo)
  none               clear the selection
  view               summarise the selected records
  edit | inspect     open the single selected record
  delete [<id>]      delete one record, or every selected record
  reload             fetch the list again
  refresh            clear the filter and fetch again
  quit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConsoleCommand {
    List,
    Search(String),
    Clear,
    Toggle(RecordId),
    All,
    Deselect,
    View,
    Edit,
    Inspect,
    Delete(Option<RecordId>),
    Reload,
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

pub(crate) fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));
    let command = match verb.to_ascii_lowercase().as_str() {
        "" | "ls" | "list" => ConsoleCommand::List,
        "search" | "/" => ConsoleCommand::Search(rest.to_string()),
        "clear" => ConsoleCommand::Clear,
        "toggle" | "t" if !rest.is_empty() => ConsoleCommand::Toggle(RecordId::new(rest)),
        "toggle" | "t" => return Err("usage: toggle <id>".to_string()),
        "all" => ConsoleCommand::All,
        "none" => ConsoleCommand::Deselect,
        "view" => ConsoleCommand::View,
        "edit" => ConsoleCommand::Edit,
        "inspect" => ConsoleCommand::Inspect,
        "delete" | "rm" => ConsoleCommand::Delete((!rest.is_empty()).then(|| RecordId::new(rest))),
        "reload" => ConsoleCommand::Reload,
        "refresh" => ConsoleCommand::Refresh,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(command)
}

/// Render the visible records with a selection marker per row.
pub(crate) fn format_listing<R, A>(controller: &CollectionController<R, A>) -> String
where
    R: Tabular,
    A: ResourceApi,
{
    let mut lines = vec![format!("    {}", R::header())];
    for record in controller.visible() {
        let marker = match record.id() {
            Some(id) if controller.is_selected(id) => "[x]",
            Some(_) => "[ ]",
            None => "   ",
        };
        lines.push(format!("{marker} {}", record.row()));
    }
    let selected = controller.selected_ids().len();
    let query = controller.query();
    let mut footer = controller.status_line();
    if !query.is_empty() {
        footer.push_str(&format!(" · filter '{query}'"));
    }
    if selected > 0 {
        footer.push_str(&format!(" · {selected} selected"));
    }
    lines.push(footer);
    lines.join("\n")
}

fn report_load(state: &LoadState, out: &mut dyn Write) -> io::Result<()> {
    if let Some(failure) = state.failure() {
        writeln!(out, "! {failure}")?;
    }
    Ok(())
}

fn report_notice(notice: &GateNotice, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "! {notice}")
}

/// Apply one command to the controller, writing feedback to `out`.
pub(crate) async fn execute<R, A>(
    controller: &CollectionController<R, A>,
    command: ConsoleCommand,
    confirm: &dyn Confirm,
    out: &mut dyn Write,
) -> io::Result<Flow>
where
    R: Tabular,
    A: ResourceApi,
{
    match command {
        ConsoleCommand::List => writeln!(out, "{}", format_listing(controller))?,
        ConsoleCommand::Search(text) => {
            controller.set_query(&text);
            writeln!(out, "{}", format_listing(controller))?;
        }
        ConsoleCommand::Clear => {
            controller.set_query("");
            writeln!(out, "{}", format_listing(controller))?;
        }
        ConsoleCommand::Toggle(id) => {
            let selected = controller.toggle(&id);
            if selected {
                writeln!(out, "selected {id}")?;
            } else if controller.state().visible_ids().any(|visible| visible == &id) {
                writeln!(out, "deselected {id}")?;
            } else {
                writeln!(out, "! no visible {} with id {id}", R::KIND.singular())?;
            }
        }
        ConsoleCommand::All => {
            controller.select_all();
            writeln!(out, "{}", format_listing(controller))?;
        }
        ConsoleCommand::Deselect => {
            controller.deselect_all();
            writeln!(out, "selection cleared")?;
        }
        ConsoleCommand::View => match controller.view_selected() {
            Ok(records) => {
                for record in records {
                    writeln!(out, "{}: {}", id_cell(record.id()), record.summary())?;
                }
            }
            Err(notice) => report_notice(&notice, out)?,
        },
        ConsoleCommand::Edit => match controller.edit_selected() {
            Ok(dispatch) => writeln!(out, "open {}", dispatch.route(R::KIND))?,
            Err(notice) => report_notice(&notice, out)?,
        },
        ConsoleCommand::Inspect => match controller.inspect_selected() {
            Ok(dispatch) => writeln!(out, "open {}", dispatch.route(R::KIND))?,
            Err(notice) => report_notice(&notice, out)?,
        },
        ConsoleCommand::Delete(id) => {
            let outcome = match &id {
                Some(id) => controller.delete_one(id, confirm).await,
                None => controller.delete_selected(confirm).await,
            };
            match outcome {
                Ok(state) => {
                    report_load(&state, out)?;
                    writeln!(out, "{}", format_listing(controller))?;
                }
                Err(notice) => report_notice(&notice, out)?,
            }
        }
        ConsoleCommand::Reload => {
            let state = controller.load().await;
            report_load(&state, out)?;
            writeln!(out, "{}", format_listing(controller))?;
        }
        ConsoleCommand::Refresh => {
            let state = controller.refresh().await;
            report_load(&state, out)?;
            writeln!(out, "{}", format_listing(controller))?;
        }
        ConsoleCommand::Help => writeln!(out, "{HELP}")?,
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

pub(crate) async fn run_console<R: Tabular>(ctx: &AppContext) -> CliResult<()> {
    let controller = controller::<R>(ctx);
    let mut stdout = io::stdout();
    let failed = |err: io::Error| CliError::failure(anyhow!("console output failed: {err}"));

    execute(&controller, ConsoleCommand::Reload, &prompt_confirm, &mut stdout)
        .await
        .map_err(failed)?;
    loop {
        write!(stdout, "{}> ", R::KIND.path_segment())
            .and_then(|()| stdout.flush())
            .map_err(failed)?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line).map_err(failed)? == 0 {
            writeln!(stdout).map_err(failed)?;
            return Ok(());
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                writeln!(stdout, "! {message}").map_err(failed)?;
                continue;
            }
        };
        if execute(&controller, command, &prompt_confirm, &mut stdout)
            .await
            .map_err(failed)?
            == Flow::Quit
        {
            return Ok(());
        }
    }
}
