//! cmdplay: record keystrokes in a shell, or replay a recorded session.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{CommandFactory, Parser};
use cmdplay::app::{self, Mode};
use cmdplay::config::SHELL_NOT_FOUND;
use cmdplay::{CmdplayError, EnvConfig, FileConfig, SessionConfig};
use tracing_subscriber::EnvFilter;

/// Record terminal keystrokes with their timing and replay them into a shell
#[derive(Debug, Parser)]
#[command(name = "cmdplay", version)]
struct Cli {
    /// Session file: written in record mode, read in play mode
    #[arg(short, long, value_name = "PATH")]
    file: PathBuf,

    /// Record a session instead of playing one
    #[arg(short, long)]
    record: bool,

    /// Shell to run [default: $SHELL]
    #[arg(short, long, value_name = "PATH")]
    shell: Option<String>,

    /// Config file [default: ~/.config/cmdplay/config.toml]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log at debug level unless CMDPLAY_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let env = EnvConfig::default();

    let file_config = match FileConfig::discover(cli.config.as_deref(), &env) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };
    let config = SessionConfig::resolve(cli.shell.clone(), &env, &file_config);

    if let Err(e) = init_tracing(config.log_filter(cli.verbose), cli.log_file.as_deref()) {
        return fail(&e);
    }

    let Ok(shell) = config.shell() else {
        println!("{SHELL_NOT_FOUND}");
        eprintln!("{}", Cli::command().render_usage());
        return ExitCode::FAILURE;
    };

    let mode = if cli.record { Mode::Record } else { Mode::Play };
    tracing::debug!(?mode, shell, file = %cli.file.display(), "starting");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return fail(&CmdplayError::io_context("starting the async runtime", e)),
    };

    let mut stdout = io::stdout();
    let result = runtime.block_on(app::run(
        mode,
        shell,
        &cli.file,
        config.session_options(),
        &mut stdout,
    ));
    // A stdin read may still be parked on a blocking thread.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn init_tracing(filter: &str, log_file: Option<&Path>) -> cmdplay::Result<()> {
    let env_filter = EnvFilter::try_new(filter)
        .map_err(|e| CmdplayError::config(format!("invalid log filter {filter:?}: {e}")))?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    CmdplayError::io_context(format!("opening log file {}", path.display()), e)
                })?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => subscriber.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn fail(error: &CmdplayError) -> ExitCode {
    tracing::error!(%error, "cmdplay failed");
    eprintln!("cmdplay: {error}");
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn file_is_required() {
        assert!(Cli::try_parse_from(["cmdplay"]).is_err());
    }

    #[test]
    fn short_flags() {
        let cli =
            Cli::try_parse_from(["cmdplay", "-r", "-f", "demo.rec", "-s", "/bin/zsh"]).unwrap();
        assert!(cli.record);
        assert_eq!(cli.file, PathBuf::from("demo.rec"));
        assert_eq!(cli.shell.as_deref(), Some("/bin/zsh"));
        assert!(!cli.verbose);
    }

    #[test]
    fn play_is_the_default_mode() {
        let cli = Cli::try_parse_from(["cmdplay", "--file", "demo.rec"]).unwrap();
        assert!(!cli.record);
        assert_eq!(cli.config, None);
    }
}
