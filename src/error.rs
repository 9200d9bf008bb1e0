use thiserror::Error;

/// Boxed cause carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by a contributor-stats run.
#[derive(Error, Debug)]
pub enum StatsError {
    /// The run was configured with options that cannot produce a valid traversal.
    #[error("invalid run options: {0}")]
    InvalidOptions(String),

    /// A page or review fetch failed; the run was aborted.
    #[error("transport error while {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The caller cancelled the run (explicit abort or timeout).
    #[error("run cancelled before completion")]
    Cancelled,
}

impl StatsError {
    pub fn transport(context: impl Into<String>, source: BoxError) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// Returns the underlying transport cause, if any.
    pub fn transport_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
