// Entrypoint for the configuration importer.
// Prompts for the appliance, credentials and file, then validates, uploads
// and imports it. Exits 1 on any failure or cancellation.

use fdm_config::{logging, ui, ConsoleReporter};
use std::process::ExitCode;

fn main() -> ExitCode {
    logging::init();
    let reporter = ConsoleReporter::new();
    ui::run(&reporter, ui::run_import)
}
