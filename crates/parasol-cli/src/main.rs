//! The `parasol` process entry point (`spec.md` §6): parses CLI flags,
//! calls `OpenCore`, optionally binds the backstage inspection server, and
//! hands any unrecognised flags through to registered modules verbatim.

mod backstage;

use clap::Parser;
use parasol_runtime::{open_core, OpenCoreArgs};
use std::path::PathBuf;

/// `--log-<level>` verbosity, ordered from least to most chatty, matching
/// `spec.md` §4.1's level list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warning,
    Info,
    Api,
    Detail,
    Trace,
}

impl LogLevel {
    fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Info | LogLevel::Api => tracing::Level::INFO,
            LogLevel::Detail => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "parasol", about = "Parasol kernel host process")]
struct Cli {
    /// Binds the backstage HTTP inspection server to 127.0.0.1:<port>.
    #[arg(long)]
    backstage: Option<u16>,

    /// Verbosity level; repeatable `--log-<level>` flags are folded into
    /// one enum value here rather than one boolean switch per level.
    #[arg(long = "log", value_enum, default_value_t = LogLevel::Warning)]
    log: LogLevel,

    /// Explicit module search path, passed straight to `OpenCore`.
    #[arg(long)]
    module_path: Option<PathBuf>,

    /// Any flag this binary does not recognise is collected here and
    /// passed through to registered modules verbatim, per `spec.md` §6.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    module_args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log.as_tracing()).init();

    let core = match open_core(OpenCoreArgs {
        module_path: cli.module_path,
        extra_args: cli.module_args,
        ..Default::default()
    }) {
        Ok(core) => core,
        Err(e) => {
            eprintln!("parasol: failed to initialise core: {e}");
            std::process::exit(-1);
        }
    };

    tracing::info!(classes = core.classes.class_count(), "core initialised");

    if let Some(port) = cli.backstage {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                eprintln!("parasol: failed to start async runtime: {e}");
                std::process::exit(-1);
            }
        };

        let exit = runtime.block_on(async move {
            tokio::select! {
                result = backstage::serve(port, core.clone()) => result,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                    Ok(())
                }
            }
        });

        if let Err(e) = exit {
            eprintln!("parasol: backstage server error: {e}");
            std::process::exit(-1);
        }
    }

    std::process::exit(0);
}
