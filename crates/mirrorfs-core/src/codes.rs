//! POSIX-style integer status codes
//!
//! Every public cache operation reports its outcome as one of these codes;
//! the filesystem-call shim passes them through unchanged. The negative
//! values match the errno of the corresponding kernel error.

/// Operation completed.
pub const OK: i32 = 0;

/// Generic client-side failure (pool exhaustion, bad argument, transport).
pub const EREMOTE: i32 = -1;

/// Remote "no such file or directory" or remote-side IO failure.
pub const ENOENT: i32 = -2;

/// Permission denied.
pub const EACCES: i32 = -13;

/// Path exists but is not a directory.
pub const ENOTDIR: i32 = -20;

/// Directory not empty.
pub const ENOTEMPTY: i32 = -39;

/// File already present in the local cache (positive, advisory).
pub const EEXIST: i32 = 17;
