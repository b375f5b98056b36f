//! Error types for race setup.

use thiserror::Error;

/// Errors raised while configuring or resetting a race.
///
/// Ticking, pausing and resuming never fail; only setting up a new batch can.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaceError {
    /// More unique labels were requested than the label range holds.
    #[error("label range holds {available} unique labels, {requested} requested")]
    ExhaustedRange { requested: usize, available: u128 },

    /// Duration, token count or lane geometry is unusable.
    #[error("invalid race configuration: {0}")]
    InvalidConfig(String),

    /// A color band partition needs at least one color.
    #[error("color palette is empty")]
    EmptyPalette,
}

impl RaceError {
    /// Creates an invalid configuration error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
