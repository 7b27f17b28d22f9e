use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Logs go to stderr so that stdout only
/// carries the CSV report.
///
/// `RUST_LOG` wins over `verbose` when it is set.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "txledger=debug" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
