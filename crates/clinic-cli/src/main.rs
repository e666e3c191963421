//! `clinic` binary entrypoint.

use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let code = clinic_cli::run().await;
    process::exit(code);
}
