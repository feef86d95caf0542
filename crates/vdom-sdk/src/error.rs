use thiserror::Error;
use vdom_fiber::SessionId;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("tree error: {0}")]
    Tree(#[from] vdom_types::TreeError),

    #[error("diff error: {0}")]
    Diff(#[from] vdom_diff::DiffError),

    #[error("apply error: {0}")]
    Apply(#[from] vdom_patch::ApplyError),

    #[error("completion of session {0} was computed against a tree that is no longer current")]
    StaleCompletion(SessionId),

    #[error("nothing is mounted")]
    NotMounted,

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
