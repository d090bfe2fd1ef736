use runkit::runner::{local_command, Runner};
use runkit::RunkitError;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), RunkitError> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let runner = match local_command().and_then(|local| Runner::new(vec![local])) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let debug = runner.debug_requested(&args);
    init_tracing(debug);

    // With --debug, errors leave main unmodified
    let code = if debug {
        runner.try_console_script(&args)?
    } else {
        runner.console_script(&args)
    };
    process::exit(code);
}

/// Log to stderr; `--debug` wins over `RUNKIT_LOG`
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("RUNKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
