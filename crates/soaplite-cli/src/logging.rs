use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{Layer, filter::LevelFilter, fmt, prelude::*, registry::LookupSpan};

fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber: compact output on stderr, plus a plain
/// file copy with thread ids when `log_file` is given.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let file_output = match log_file {
        Some(path) => Some(file_layer(File::create(&path).map_err(CliError::Io)?)),
        None => None,
    };

    tracing_subscriber::registry()
        .with(level_filter(verbosity, quiet))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(file_output)
        .init();

    Ok(())
}

fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_thread_ids(true)
}
