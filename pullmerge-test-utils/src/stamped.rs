// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::fmt;
use std::ops::Deref;

/// A test value paired with an explicit merge key.
///
/// Merge tests key items with [`Stamped::key`], so the expected order of a merged
/// stream can be read straight off the fixtures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped<T> {
    pub key: u64,
    pub value: T,
}

impl<T> Stamped<T> {
    pub const fn new(key: u64, value: T) -> Self {
        Self { key, value }
    }

    pub const fn key(&self) -> u64 {
        self.key
    }

    pub const fn get(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Shorthand for [`Stamped::new`].
pub const fn stamped<T>(key: u64, value: T) -> Stamped<T> {
    Stamped::new(key, value)
}

impl<T> Deref for Stamped<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T: fmt::Display> fmt::Display for Stamped<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value, self.key)
    }
}

impl<T> From<(u64, T)> for Stamped<T> {
    fn from((key, value): (u64, T)) -> Self {
        Self::new(key, value)
    }
}
