//! Initialize logging for the occ services.
//!
//! # Examples
//! ```no_run
//! occ_telemetry::configure()
//!     .set_filter_directives("info,occ_scheduler=debug")
//!     .set_pretty_print(true)
//!     .try_init()
//!     .expect("must be able to initialize telemetry");
//! tracing::info!("telemetry initialized");
//! ```
use std::io::IsTerminal as _;

use tracing_subscriber::{
    filter::{
        LevelFilter,
        ParseError,
    },
    layer::SubscriberExt as _,
    util::{
        SubscriberInitExt as _,
        TryInitError,
    },
    EnvFilter,
};

pub mod display;
mod report;

pub use report::install_error_hook;

/// The errors that can occur when initializing telemetry.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    fn filter_directives(source: ParseError) -> Self {
        Self(ErrorKind::FilterDirectives(source))
    }

    fn init_subscriber(source: TryInitError) -> Self {
        Self(ErrorKind::InitSubscriber(source))
    }

    fn error_hook(source: eyre::InstallError) -> Self {
        Self(ErrorKind::ErrorHook(source))
    }
}

#[derive(Debug, thiserror::Error)]
enum ErrorKind {
    #[error("failed to parse filter directives")]
    FilterDirectives(#[source] ParseError),
    #[error("failed installing global tracing subscriber")]
    InitSubscriber(#[source] TryInitError),
    #[error("failed installing the eyre report hook")]
    ErrorHook(#[source] eyre::InstallError),
}

#[must_use = "the telemetry config must be initialized to be useful"]
pub fn configure() -> Config {
    Config::new()
}

pub struct Config {
    filter_directives: String,
    force_stdout: bool,
    pretty_print: bool,
    install_error_hook: bool,
}

impl Config {
    #[must_use = "telemetry must be initialized to be useful"]
    fn new() -> Self {
        Self {
            filter_directives: String::new(),
            force_stdout: false,
            pretty_print: false,
            install_error_hook: true,
        }
    }

    #[must_use = "telemetry must be initialized to be useful"]
    pub fn set_filter_directives(mut self, filter_directives: &str) -> Self {
        self.filter_directives = filter_directives.to_string();
        self
    }

    /// Emit human readable lines even if stdout is not a terminal.
    #[must_use = "telemetry must be initialized to be useful"]
    pub fn set_force_stdout(mut self, force_stdout: bool) -> Self {
        self.force_stdout = force_stdout;
        self
    }

    #[must_use = "telemetry must be initialized to be useful"]
    pub fn set_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    #[must_use = "telemetry must be initialized to be useful"]
    pub fn set_install_error_hook(mut self, install_error_hook: bool) -> Self {
        self.install_error_hook = install_error_hook;
        self
    }

    /// Initialize telemetry, consuming the config.
    ///
    /// Lines are written as JSON unless pretty printing was requested and stdout is a
    /// terminal (or stdout was forced).
    ///
    /// # Errors
    /// Fails if the filter directives could not be parsed, or if the global tracing
    /// subscriber or the eyre hook could not be installed.
    pub fn try_init(self) -> Result<(), Error> {
        let Self {
            filter_directives,
            force_stdout,
            pretty_print,
            install_error_hook,
        } = self;

        let env_filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse(filter_directives)
            .map_err(Error::filter_directives)?;

        let human_readable = pretty_print && (force_stdout || std::io::stdout().is_terminal());
        let (compact_layer, json_layer) = if human_readable {
            (Some(tracing_subscriber::fmt::layer().compact()), None)
        } else {
            (
                None,
                Some(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_writer(std::io::stdout),
                ),
            )
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(compact_layer)
            .with(json_layer)
            .try_init()
            .map_err(Error::init_subscriber)?;

        if install_error_hook {
            report::install_error_hook().map_err(Error::error_hook)?;
        }
        Ok(())
    }
}
