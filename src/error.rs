use thiserror::Error;

pub type Result<T, E = SchedulerError> = std::result::Result<T, E>;

/// Error kinds surfaced to RPC callers (spec.md §7).
#[derive(Error)]
pub enum SchedulerError {
    /// A request named a filter that isn't registered.
    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    /// No host survived filtering, or the pool was exhausted mid-selection.
    #[error("no valid host found for the requested instance")]
    NoValidHost,

    /// The inventory store could not be queried.
    #[error("inventory store unavailable: {0}")]
    InventoryUnavailable(#[source] anyhow::Error),

    /// The attestation service could not be reached; cached verdicts are
    /// treated as `unknown` and the trust filter fails for that host rather
    /// than aborting the whole request.
    #[error("attestation service unavailable: {0}")]
    AttestationUnavailable(#[source] anyhow::Error),

    /// A legacy RPC method (`run_instance`, `prep_resize`) was refused by a
    /// deployment that only accepts `select_destinations`.
    #[error("method not supported by this deployment")]
    NotSupported,

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for SchedulerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Formats an error together with its full `source()` chain, one cause per
/// line, so that a `{:?}` log line never silently drops the root cause.
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    write!(f, "{e}")?;
    let mut current = e.source();
    while let Some(cause) = current {
        write!(f, "\n\tCaused by: {cause}")?;
        current = cause.source();
    }
    Ok(())
}
