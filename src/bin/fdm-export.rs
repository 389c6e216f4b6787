// Entrypoint for the configuration exporter.
// Prompts for the appliance, credentials and download location, then
// exports the full configuration and downloads the resulting file.

use fdm_config::{logging, ui, ConsoleReporter};
use std::process::ExitCode;

fn main() -> ExitCode {
    logging::init();
    let reporter = ConsoleReporter::new();
    ui::run(&reporter, ui::run_export)
}
