// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::MergeError;

/// An item travelling through a source or a merged output: a value or an error.
///
/// Errors travel in-band so a source can report a failure through the same
/// stream that carries its values. An error is always the last item of a
/// merged output.
#[derive(Debug, Clone)]
pub enum StreamItem<T> {
    /// A successful value
    Value(T),
    /// An error that terminates the stream
    Error(MergeError),
}

impl<T: PartialEq> PartialEq for StreamItem<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StreamItem::Value(a), StreamItem::Value(b)) => a == b,
            _ => false, // Errors are never equal
        }
    }
}

impl<T> StreamItem<T> {
    /// Returns `true` if this is a `Value`.
    pub const fn is_value(&self) -> bool {
        matches!(self, StreamItem::Value(_))
    }

    /// Returns `true` if this is an `Error`.
    pub const fn is_error(&self) -> bool {
        matches!(self, StreamItem::Error(_))
    }

    /// Borrow the value, if any.
    pub const fn value(&self) -> Option<&T> {
        match self {
            StreamItem::Value(v) => Some(v),
            StreamItem::Error(_) => None,
        }
    }

    /// Converts from `StreamItem<T>` to `Option<T>`, discarding errors.
    pub fn ok(self) -> Option<T> {
        match self {
            StreamItem::Value(v) => Some(v),
            StreamItem::Error(_) => None,
        }
    }

    /// Converts from `StreamItem<T>` to `Option<MergeError>`, discarding values.
    pub fn err(self) -> Option<MergeError> {
        match self {
            StreamItem::Value(_) => None,
            StreamItem::Error(e) => Some(e),
        }
    }

    /// Maps the contained value, propagating errors unchanged.
    pub fn map<U, F>(self, f: F) -> StreamItem<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            StreamItem::Value(v) => StreamItem::Value(f(v)),
            StreamItem::Error(e) => StreamItem::Error(e),
        }
    }

    /// Maps the contained error, leaving values untouched.
    pub fn map_err<F>(self, f: F) -> Self
    where
        F: FnOnce(MergeError) -> MergeError,
    {
        match self {
            StreamItem::Value(v) => StreamItem::Value(v),
            StreamItem::Error(e) => StreamItem::Error(f(e)),
        }
    }

    /// Returns the contained value, panicking if it's an error.
    ///
    /// # Panics
    ///
    /// Panics if the item is an `Error`.
    pub fn unwrap(self) -> T {
        match self {
            StreamItem::Value(v) => v,
            StreamItem::Error(e) => {
                panic!("called `StreamItem::unwrap()` on an `Error` value: {e:?}")
            }
        }
    }
}

impl<T> From<Result<T, MergeError>> for StreamItem<T> {
    fn from(result: Result<T, MergeError>) -> Self {
        match result {
            Ok(v) => StreamItem::Value(v),
            Err(e) => StreamItem::Error(e),
        }
    }
}

impl<T> From<StreamItem<T>> for Result<T, MergeError> {
    fn from(item: StreamItem<T>) -> Self {
        match item {
            StreamItem::Value(v) => Ok(v),
            StreamItem::Error(e) => Err(e),
        }
    }
}
