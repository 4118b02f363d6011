//! Error Taxonomy
//!
//! Construction-time failures (`initialize`, `push_back` against an exhausted arena) return
//! [`Status`] up the call chain. Failures discovered inside a `do_all` task body are not
//! threaded back through a `Result`: they go through [`check!`], which aborts the process, the
//! same way the upstream crate leans on `assert!`/`more_asserts::assert_le!` rather than
//! propagating a `Result` out of a hot loop.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// arena exhausted
    BadAlloc,
    /// double-initialize on a container
    AlreadyInit,
    /// query before initialize (e.g. prefix sum not yet computed)
    NotInit,
    /// index past container end
    OutOfBounds,
    /// generic / unsupported operation
    Error(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::BadAlloc => write!(f, "bad alloc: arena exhausted"),
            Status::AlreadyInit => write!(f, "container already initialized"),
            Status::NotInit => write!(f, "container not yet initialized"),
            Status::OutOfBounds => write!(f, "index out of bounds"),
            Status::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

impl std::error::Error for Status {}

pub type Result<T> = std::result::Result<T, Status>;

/// Aborts the process with a diagnostic if `status` is an error, mirroring `PANDO_CHECK`.
/// Build-phase failures discovered inside a `do_all` body are treated as fatal: there is no
/// partial-commit recovery.
#[macro_export]
macro_rules! check {
    ($status:expr) => {
        match $status {
            Ok(value) => value,
            Err(err) => panic!("fatal: {err}"),
        }
    };
}
