use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "COINWATCH_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

/// Install the stderr subscriber. Verbosity comes from `COINWATCH_LOG`.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(error) = installed {
        eprintln!("warning: logging disabled: {error}");
    }
}
