// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use core::fmt;
use pullmerge_core::{MergeError, Result, SourceIndex};

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type MapFn<T, K> = dyn Fn(&T) -> core::result::Result<K, BoxError> + Send + Sync;

/// Extracts the merge key of an item.
///
/// The key is computed once per item, when its source tracker accepts it.
pub struct KeyMapper<T, K> {
    map: Box<MapFn<T, K>>,
}

impl<T: 'static, K: 'static> KeyMapper<T, K> {
    /// A key mapper that cannot fail.
    pub fn new<F>(map: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self {
            map: Box::new(move |item: &T| -> core::result::Result<K, BoxError> {
                Ok(map(item))
            }),
        }
    }

    /// A key mapper whose failures terminate the merge, attributed to the
    /// source of the offending item.
    pub fn fallible<F, E>(map: F) -> Self
    where
        F: Fn(&T) -> core::result::Result<K, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            map: Box::new(move |item: &T| -> core::result::Result<K, BoxError> {
                map(item).map_err(Into::into)
            }),
        }
    }
}

impl<T, K> KeyMapper<T, K> {
    /// # Errors
    /// Returns `MergeError::KeyMapper` if the mapping function fails.
    pub fn key_of(&self, index: SourceIndex, item: &T) -> Result<K> {
        (self.map)(item).map_err(|error| MergeError::key_mapper(index, error))
    }
}

impl<T, K> fmt::Debug for KeyMapper<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMapper").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No lifetime bounds on T or K, like the coordinator actor.
    fn keys<T, K>(mapper: &KeyMapper<T, K>, items: &[T]) -> Result<Vec<K>> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| mapper.key_of(index, item))
            .collect()
    }

    #[test]
    fn test_key_of_maps_every_item() {
        let mapper = KeyMapper::new(|word: &&str| word.len());

        let result = keys(&mapper, &["a", "abc"]).expect("infallible mapper");

        assert_eq!(result, vec![1, 3]);
    }

    #[test]
    fn test_fallible_key_of_attributes_failure_to_source() {
        let mapper = KeyMapper::fallible(|text: &String| text.parse::<u32>());

        let error = keys(&mapper, &["1".to_string(), "x".to_string()])
            .expect_err("second item is not a number");

        assert!(matches!(error, MergeError::KeyMapper { index: 1, .. }));
    }
}
