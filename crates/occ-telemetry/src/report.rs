//! An `eyre` report hook that renders the whole error chain on a single line.
//!
//! A report built from `eyre!("disk full").wrap_err("failed to commit")` renders as
//! `failed to commit: disk full`, for both `{}` and `{:?}`, so that log fields holding
//! errors never span multiple lines.
use std::{
    error::Error,
    fmt::{
        self,
        Formatter,
    },
};

/// Installs the single-line hook as the global `eyre` report handler.
///
/// Must be called before the first `eyre::Report` is constructed.
///
/// # Errors
/// Fails if another handler was installed already.
pub fn install_error_hook() -> Result<(), eyre::InstallError> {
    eyre::set_hook(Box::new(|_| Box::new(SingleLine)))
}

struct SingleLine;

impl eyre::EyreHandler for SingleLine {
    fn debug(&self, error: &(dyn Error + 'static), f: &mut Formatter<'_>) -> fmt::Result {
        write_chain(error, f)
    }

    fn display(&self, error: &(dyn Error + 'static), f: &mut Formatter<'_>) -> fmt::Result {
        write_chain(error, f)
    }
}

fn write_chain(mut error: &(dyn Error + 'static), f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{error}")?;
    while let Some(cause) = error.source() {
        write!(f, ": {cause}")?;
        error = cause;
    }
    Ok(())
}
