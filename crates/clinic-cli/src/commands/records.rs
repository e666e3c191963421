use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use clinic_console::{CollectionController, EditorMode, GateNotice, HttpApi, RecordEditor};
use clinic_models::{Medicine, Patient, RecordId, Resource, Staff, StaffRole, Treatment};
use tracing::info;

use crate::cli::{
    DeleteArgs, DeleteManyArgs, GetArgs, ListArgs, OutputFormat, RecordCommand, RecordFields,
    UpdateArgs,
};
use crate::client::{AppContext, CliError, CliResult, confirmation};
use crate::commands::console::run_console;
use crate::output::{Tabular, render_record, render_records};

/// Applies form flags to a record of one kind.
pub(crate) trait FieldPatch: Tabular + Default {
    /// Flags this kind accepts.
    const FLAGS: &'static [&'static str];

    fn apply(&mut self, fields: RecordFields);

    /// Defaults filled in before the first save.
    fn prepare_new(&mut self) {}
}

impl FieldPatch for Patient {
    const FLAGS: &'static [&'static str] = &["--name", "--age", "--history"];

    fn apply(&mut self, fields: RecordFields) {
        if let Some(name) = fields.name {
            self.name = name;
        }
        if let Some(age) = fields.age {
            self.age = Some(age);
        }
        if let Some(history) = fields.history {
            self.medical_history = history;
        }
    }
}

impl FieldPatch for Staff {
    const FLAGS: &'static [&'static str] = &["--name", "--role", "--specialization"];

    fn apply(&mut self, fields: RecordFields) {
        if let Some(name) = fields.name {
            self.name = name;
        }
        if let Some(role) = fields.role {
            self.role = StaffRole::from(role);
        }
        if let Some(specialization) = fields.specialization {
            self.specialization = Some(specialization).filter(|value| !value.trim().is_empty());
        }
    }
}

impl FieldPatch for Medicine {
    const FLAGS: &'static [&'static str] = &["--name", "--quantity"];

    fn apply(&mut self, fields: RecordFields) {
        if let Some(name) = fields.name {
            self.name = name;
        }
        if let Some(quantity) = fields.quantity {
            self.quantity = Some(quantity);
        }
    }
}

impl FieldPatch for Treatment {
    const FLAGS: &'static [&'static str] = &[
        "--patient",
        "--staff",
        "--medicine",
        "--description",
        "--notes",
        "--date",
        "--start-date",
        "--end-date",
    ];

    fn apply(&mut self, fields: RecordFields) {
        let RecordFields {
            patient,
            staff,
            medicine,
            description,
            notes,
            date,
            start_date,
            end_date,
            ..
        } = fields;
        if let Some(patient) = patient {
            self.patient_id = patient;
        }
        if let Some(staff) = staff {
            self.staff_id = staff;
        }
        if let Some(medicine) = medicine {
            self.medicine_id = medicine;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(notes) = notes {
            self.notes = notes;
        }
        if let Some(date) = date {
            self.date = date;
        }
        if start_date.is_some() {
            self.start_date = start_date;
        }
        if end_date.is_some() {
            self.end_date = end_date;
        }
    }

    fn prepare_new(&mut self) {
        if self.date.trim().is_empty() {
            self.date = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        }
    }
}

/// Flags present on the command line, in declaration order.
pub(crate) fn provided_flags(fields: &RecordFields) -> Vec<&'static str> {
    [
        ("--name", fields.name.is_some()),
        ("--age", fields.age.is_some()),
        ("--history", fields.history.is_some()),
        ("--role", fields.role.is_some()),
        ("--specialization", fields.specialization.is_some()),
        ("--quantity", fields.quantity.is_some()),
        ("--patient", fields.patient.is_some()),
        ("--staff", fields.staff.is_some()),
        ("--medicine", fields.medicine.is_some()),
        ("--description", fields.description.is_some()),
        ("--notes", fields.notes.is_some()),
        ("--date", fields.date.is_some()),
        ("--start-date", fields.start_date.is_some()),
        ("--end-date", fields.end_date.is_some()),
    ]
    .into_iter()
    .filter_map(|(flag, present)| present.then_some(flag))
    .collect()
}

fn check_flags<R: FieldPatch>(fields: &RecordFields) -> CliResult<()> {
    let unrelated: Vec<&str> = provided_flags(fields)
        .into_iter()
        .filter(|flag| !R::FLAGS.contains(flag))
        .collect();
    if unrelated.is_empty() {
        Ok(())
    } else {
        Err(CliError::validation(format!(
            "{} not valid for {} (expected {})",
            unrelated.join(", "),
            R::KIND.plural(),
            R::FLAGS.join(", ")
        )))
    }
}

pub(crate) async fn handle_records<R: FieldPatch>(
    ctx: &AppContext,
    command: RecordCommand,
    format: OutputFormat,
) -> CliResult<()> {
    match command {
        RecordCommand::Ls(args) => handle_list::<R>(ctx, args, format).await,
        RecordCommand::Get(args) => handle_get::<R>(ctx, args, format).await,
        RecordCommand::Create(fields) => handle_create::<R>(ctx, fields, format).await,
        RecordCommand::Update(args) => handle_update::<R>(ctx, args, format).await,
        RecordCommand::Delete(args) => handle_delete::<R>(ctx, args).await,
        RecordCommand::DeleteMany(args) => handle_delete_many::<R>(ctx, args).await,
        RecordCommand::Console => run_console::<R>(ctx).await,
    }
}

pub(crate) fn controller<R: Resource>(ctx: &AppContext) -> CollectionController<R, Arc<HttpApi>> {
    CollectionController::new(Arc::clone(&ctx.api), ctx.profile(R::KIND))
}

fn editor<R: Resource + Default>(ctx: &AppContext, mode: EditorMode) -> RecordEditor<R, Arc<HttpApi>> {
    RecordEditor::new(Arc::clone(&ctx.api), ctx.profile(R::KIND), mode)
}

async fn handle_list<R: FieldPatch>(
    ctx: &AppContext,
    args: ListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let controller = controller::<R>(ctx);
    controller.set_server_query(args.server_query);
    let state = controller.load().await;
    if let Some(failure) = state.failure() {
        return Err(CliError::from(failure.clone()));
    }
    if let Some(query) = args.query {
        controller.set_query(&query);
    }
    render_records(&controller.visible(), &controller.status_line(), format)
}

async fn handle_get<R: FieldPatch>(
    ctx: &AppContext,
    args: GetArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut editor = editor::<R>(ctx, EditorMode::View(RecordId::new(args.id)));
    let state = editor.load().await;
    if let Some(failure) = state.failure() {
        return Err(CliError::from(failure.clone()));
    }
    render_record(editor.draft(), format)
}

async fn handle_create<R: FieldPatch>(
    ctx: &AppContext,
    fields: RecordFields,
    format: OutputFormat,
) -> CliResult<()> {
    check_flags::<R>(&fields)?;
    let mut draft = R::default();
    draft.apply(fields);
    draft.prepare_new();

    let mut editor = editor::<R>(ctx, EditorMode::New);
    editor.set_draft(draft);
    let saved = editor.save().await?;
    info!(kind = %R::KIND, id = ?saved.id(), "created");
    render_record(&saved, format)
}

async fn handle_update<R: FieldPatch>(
    ctx: &AppContext,
    args: UpdateArgs,
    format: OutputFormat,
) -> CliResult<()> {
    check_flags::<R>(&args.fields)?;
    if provided_flags(&args.fields).is_empty() {
        return Err(CliError::validation(format!(
            "nothing to update; pass one of {}",
            R::FLAGS.join(", ")
        )));
    }

    let mut editor = editor::<R>(ctx, EditorMode::Edit(RecordId::new(args.id)));
    let state = editor.load().await;
    if let Some(failure) = state.failure() {
        return Err(CliError::from(failure.clone()));
    }
    editor.draft_mut().apply(args.fields);
    let saved = editor.save().await?;
    render_record(&saved, format)
}

async fn handle_delete<R: FieldPatch>(ctx: &AppContext, args: DeleteArgs) -> CliResult<()> {
    let confirm = confirmation(args.yes)?;
    let id = RecordId::new(args.id);
    let controller = controller::<R>(ctx);
    match controller.delete_one(&id, &confirm).await {
        Ok(_) => {
            println!("deleted {} {id}", R::KIND.singular());
            Ok(())
        }
        Err(GateNotice::Cancelled) => {
            println!("{}", GateNotice::Cancelled);
            Ok(())
        }
        Err(notice) => Err(CliError::from(notice)),
    }
}

async fn handle_delete_many<R: FieldPatch>(
    ctx: &AppContext,
    args: DeleteManyArgs,
) -> CliResult<()> {
    let confirm = confirmation(args.yes)?;
    let controller = controller::<R>(ctx);
    let state = controller.load().await;
    if let Some(failure) = state.failure() {
        return Err(CliError::from(failure.clone()));
    }

    let ids: BTreeSet<RecordId> = args.ids.into_iter().map(RecordId::new).collect();
    for id in &ids {
        if !controller.toggle(id) {
            return Err(CliError::validation(format!(
                "no {} with id {id} in the current list",
                R::KIND.singular()
            )));
        }
    }

    match controller.delete_selected(&confirm).await {
        Ok(_) => {
            println!("deleted {} {}", ids.len(), R::KIND.plural());
            println!("{}", controller.status_line());
            Ok(())
        }
        Err(GateNotice::Cancelled) => {
            println!("{}", GateNotice::Cancelled);
            Ok(())
        }
        Err(notice) => Err(CliError::from(notice)),
    }
}
