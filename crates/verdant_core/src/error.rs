//! # Core Error Types
//!
//! Errors raised by the entity codec and the registry.

use thiserror::Error;

/// Errors raised while encoding or decoding wire buffers.
///
/// Decoding is fail-fast: the first malformed byte aborts the whole decode
/// and no partial value is ever returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before the announced payload did.
    #[error("unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the decoder needed next.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A mask header carried bits outside the declared enumeration.
    #[error("unknown mask bits: {0:#x}")]
    UnknownMask(u64),

    /// A string payload was not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    /// A collection count exceeded the sanity ceiling.
    #[error("collection of {count} elements exceeds the limit of {max}")]
    OversizedCollection {
        /// Announced element count.
        count: u32,
        /// Allowed maximum.
        max: u32,
    },

    /// Bytes remained after a complete top-level decode.
    #[error("{0} trailing bytes after a complete decode")]
    TrailingBytes(usize),
}

/// An operation referenced an entity id the registry does not hold.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("stale entity id {0}")]
pub struct StaleEntity(pub i32);
