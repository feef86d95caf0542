/// Errors from scheduler setup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// The configuration cannot drive a scheduler.
    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for scheduler results.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
