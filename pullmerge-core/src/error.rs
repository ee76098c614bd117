// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for demand-driven ordered merging
//!
//! Every failure of a merge is fail-fast: the first error terminates the merged
//! output and tears down every source subscription. [`MergeError`] separates the
//! three ways that can happen (a producer breaking the demand protocol, a source
//! signalling an error, a key-mapper failing) from configuration mistakes that
//! are reported before anything is spawned.
//!
//! # Examples
//!
//! ```
//! use pullmerge_core::{MergeError, Result};
//!
//! fn check_lookahead(lookahead: usize) -> Result<usize> {
//!     if lookahead == 0 {
//!         return Err(MergeError::InvalidLookahead { lookahead });
//!     }
//!     Ok(lookahead)
//! }
//!
//! assert!(check_lookahead(0).is_err());
//! ```

use crate::SourceIndex;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Root error type for all merge operations
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A producer pushed an item while it had no outstanding demand.
    ///
    /// This is a protocol violation and always fatal for the merge.
    #[error("Demand exceeded: producer pushed an item without outstanding demand")]
    DemandExceeded,

    /// A source signalled an error.
    #[error("Source {index} failed: {error}")]
    SourceFailed {
        /// Registration index of the failing source
        index: SourceIndex,
        /// The error the source reported
        #[source]
        error: Box<MergeError>,
    },

    /// The key-mapper failed on an item of the given source.
    #[error("Key mapper failed on an item of source {index}: {error}")]
    KeyMapper {
        /// Registration index of the source whose item could not be keyed
        index: SourceIndex,
        /// The error returned by the key-mapper
        #[source]
        error: BoxError,
    },

    /// A different source failed, terminating this output as well.
    ///
    /// Only produced by the ordering enforcer, where every source owns an output.
    #[error("Terminated because source {index} failed")]
    SiblingFailed {
        /// Registration index of the source that failed first
        index: SourceIndex,
    },

    /// The source subscription was torn down (merge disposed or failed).
    #[error("Source subscription is closed")]
    SourceClosed,

    /// The lookahead window must hold at least one item.
    #[error("Invalid lookahead {lookahead}: must be at least 1")]
    InvalidLookahead {
        /// The rejected lookahead
        lookahead: usize,
    },

    /// Stream processing encountered an error
    #[error("Stream processing error: {context}")]
    StreamProcessingError {
        /// Description of what went wrong during stream processing
        context: String,
    },

    /// Custom error from user code
    #[error("User error: {0}")]
    UserError(#[source] BoxError),
}

impl MergeError {
    /// Create a stream processing error with the given context
    pub fn stream_error(context: impl Into<String>) -> Self {
        Self::StreamProcessingError {
            context: context.into(),
        }
    }

    /// Wrap a user error
    pub fn user_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::UserError(Box::new(error))
    }

    /// Attribute an error to the source that reported it.
    ///
    /// An error already attributed to `index` is returned unchanged. Anything
    /// else, including an error attributed to a source of a nested merge, is
    /// wrapped so that `source_index` names `index`.
    #[must_use]
    pub fn from_source(index: SourceIndex, error: MergeError) -> Self {
        match error {
            already @ (Self::SourceFailed { .. } | Self::KeyMapper { .. })
                if already.source_index() == Some(index) =>
            {
                already
            }
            other => Self::SourceFailed {
                index,
                error: Box::new(other),
            },
        }
    }

    /// Wrap a key-mapper failure for the given source
    pub fn key_mapper(index: SourceIndex, error: impl Into<BoxError>) -> Self {
        Self::KeyMapper {
            index,
            error: error.into(),
        }
    }

    /// Returns `true` if this error (or the error it wraps) is a demand protocol violation
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            Self::DemandExceeded => true,
            Self::SourceFailed { error, .. } => error.is_protocol_violation(),
            _ => false,
        }
    }

    /// The index of the source this error is attributed to, if any
    #[must_use]
    pub const fn source_index(&self) -> Option<SourceIndex> {
        match self {
            Self::SourceFailed { index, .. }
            | Self::KeyMapper { index, .. }
            | Self::SiblingFailed { index } => Some(*index),
            _ => None,
        }
    }
}

/// Specialized Result type for merge operations
pub type Result<T> = std::result::Result<T, MergeError>;

/// Extension trait for converting errors into `MergeError`
pub trait IntoMergeError {
    /// Convert this error into a `MergeError` with additional context
    fn into_merge_error(self, context: &str) -> MergeError;

    /// Convert this error into a `MergeError` without additional context
    fn into_merge(self) -> MergeError
    where
        Self: Sized,
    {
        self.into_merge_error("")
    }
}

impl<E: std::error::Error + Send + Sync + 'static> IntoMergeError for E {
    fn into_merge_error(self, context: &str) -> MergeError {
        if context.is_empty() {
            MergeError::user_error(self)
        } else {
            MergeError::stream_error(format!("{context}: {self}"))
        }
    }
}

/// Helper trait for adding context to `Result`s
pub trait ResultExt<T> {
    /// Add context to an error
    ///
    /// # Errors
    /// Returns `Err(MergeError)` if the underlying result is `Err`.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context to an error using a closure (lazy evaluation)
    ///
    /// # Errors
    /// Returns `Err(MergeError)` if the underlying result is `Err`.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<MergeError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.with_context(|| context.into())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            MergeError::UserError(inner) => MergeError::StreamProcessingError {
                context: format!("{}: {inner}", f()),
            },
            other => other,
        })
    }
}

impl Clone for MergeError {
    fn clone(&self) -> Self {
        match self {
            Self::DemandExceeded => Self::DemandExceeded,
            Self::SourceFailed { index, error } => Self::SourceFailed {
                index: *index,
                error: error.clone(),
            },
            // Boxed user errors cannot be cloned, keep their message
            Self::KeyMapper { index, error } => Self::SourceFailed {
                index: *index,
                error: Box::new(Self::stream_error(format!("key mapper: {error}"))),
            },
            Self::SiblingFailed { index } => Self::SiblingFailed { index: *index },
            Self::SourceClosed => Self::SourceClosed,
            Self::InvalidLookahead { lookahead } => Self::InvalidLookahead {
                lookahead: *lookahead,
            },
            Self::StreamProcessingError { context } => Self::StreamProcessingError {
                context: context.clone(),
            },
            Self::UserError(e) => Self::StreamProcessingError {
                context: format!("User error: {e}"),
            },
        }
    }
}
