use crate::store::StorePath;
use crate::types::EqClass;
use thiserror::Error;

/// Failures that callers need to tell apart. Everything else in the store
/// layer propagates as an opaque `anyhow` error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid path hash `{0}'")]
    InvalidPathHash(String),

    #[error("invalid store path `{0}'")]
    InvalidStorePath(String),

    #[error("invalid derivation target `{0}'")]
    InvalidDrvPath(String),

    #[error("derivation has no output `{0}'")]
    NoSuchOutput(String),

    #[error("cycle detected in the references of `{0}'")]
    Cycle(StorePath),

    #[error("conflict in equivalence class `{0}'")]
    Conflict(EqClass),

    #[error("no output path in equivalence class `{0}' is known")]
    NoClassMember(EqClass),

    #[error("path `{0}' is not in any equivalence class")]
    UnknownClass(StorePath),
}
