use std::sync::Arc;

use anyhow::anyhow;
use clinic_console::{EditorMode, LoadFailure, RecordEditor, ResourceApi};
use clinic_models::{Patient, Resource, ResourceKind};
use tracing::{info, warn};

use crate::client::{AppContext, CliError, CliResult};
use crate::output::id_cell;

pub(crate) fn sample_patients() -> Vec<Patient> {
    [
        ("Juan Perez", 30, "Ninguno"),
        ("Maria Gomez", 25, "Asma"),
        ("Carlos Lopez", 45, "Diabetes"),
        ("Ana Rodriguez", 50, "Hipertension"),
    ]
    .into_iter()
    .map(|(name, age, history)| Patient {
        id: None,
        name: name.to_string(),
        age: Some(age),
        medical_history: history.to_string(),
    })
    .collect()
}

/// Check the API answers, then insert the sample patients one by one.
pub(crate) async fn handle_seed(ctx: &AppContext) -> CliResult<()> {
    if let Err(err) = ctx.api.list(ResourceKind::Patients, None).await {
        return Err(CliError::failure(anyhow!(
            "API at {} is not reachable: {}",
            ctx.config.base_url,
            LoadFailure::from(err)
        )));
    }
    println!("API reachable at {}", ctx.config.base_url);

    let samples = sample_patients();
    let total = samples.len();
    let mut failed = 0_usize;
    for patient in samples {
        let name = patient.name.clone();
        let mut editor = RecordEditor::<Patient, _>::new(
            Arc::clone(&ctx.api),
            ctx.profile(ResourceKind::Patients),
            EditorMode::New,
        );
        editor.set_draft(patient);
        match editor.save().await {
            Ok(saved) => {
                info!(id = ?saved.id(), "sample patient inserted");
                println!("inserted {name} ({})", id_cell(saved.id()));
            }
            Err(err) => {
                failed += 1;
                warn!(error = %err, patient = %name, "sample patient insert failed");
                println!("failed {name}: {err}");
            }
        }
    }

    if failed == 0 {
        println!("seeded {total} patients");
        Ok(())
    } else {
        Err(CliError::failure(anyhow!("{failed} of {total} inserts failed")))
    }
}
