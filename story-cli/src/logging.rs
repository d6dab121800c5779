use tracing_subscriber::EnvFilter;

/// Initialise logging. The default level is `info`; `--verbose` switches to
/// `debug` and lets `RUST_LOG` override the filter.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
