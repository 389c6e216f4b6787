// Diagnostic logging. Operator-facing narration goes through `report`;
// this only wires `tracing` output to stderr, filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Defaults to `warn` when `RUST_LOG` is
/// unset; a second call is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
