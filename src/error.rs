use thiserror::Error;

/// Errors raised while ticking a tree. The tick is abandoned as soon as one
/// of these is produced; the context is left as it was at that point.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TickError {
    #[error("task {node:?} must call exactly one of succeed, fail or running per tick, but made {calls} call(s)")]
    InvalidOutcome { node: String, calls: usize },
    #[error("random node {node:?} has no children to pick from")]
    EmptyComposite { node: String },
}

pub type TickResult = Result<crate::Outcome, TickError>;

/// Errors raised while building trees, either by hand through a
/// [`crate::Registry`] or from a definition file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("node type or subtree name not found {0:?}")]
    UnknownNodeName(String),
    #[error("{node} requires exactly one child, but none was given")]
    MissingChild { node: String },
    #[error("attempted to add too many nodes to {node}")]
    TooManyChildren { node: String },
    #[error("{node:?} does not take child nodes")]
    UnexpectedChildren { node: String },
    #[error("{node} does not take argument {arg:?}")]
    UnexpectedArgument { node: String, arg: String },
    #[error("{node} requires argument {arg:?}")]
    MissingArgument { node: String, arg: String },
    #[error("argument {arg:?} of {node} must be a non-negative integer")]
    InvalidArgument { node: String, arg: String },
    #[error("invalid weights for {node}: {reason}")]
    InvalidWeights { node: String, reason: String },
    #[error("subtree {node:?} refers to itself")]
    InfiniteRecursion { node: String },
    #[error("tree name {0:?} is a built-in node type")]
    ReservedTreeName(String),
    #[error("tree {0:?} is defined more than once")]
    DuplicateTree(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}
