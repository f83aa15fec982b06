use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "pinstream=warn";
const VERBOSE_FILTER: &str = "pinstream=debug";

/// Logs go to stderr so stdout stays usable with `--simple`.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
