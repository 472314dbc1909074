// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Append-only, ordered adapter registry.

use crate::error::Error;

use super::TopicAdapter;

/// Ordered collection of topic adapters.
///
/// Adapters are kept in registration order, which is also dispatch order:
/// the first adapter whose pattern matches wins. Register the most specific
/// pattern first when suffixes overlap. There is no removal.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn TopicAdapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an adapter and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySuffix`] for an empty suffix and
    /// [`Error::DuplicateSuffix`] if the exact suffix is already registered.
    pub fn push(&mut self, adapter: Box<dyn TopicAdapter>) -> Result<usize, Error> {
        let suffix = adapter.suffix();
        if suffix.is_empty() {
            return Err(Error::EmptySuffix);
        }
        if self.adapters.iter().any(|a| a.suffix() == suffix) {
            return Err(Error::DuplicateSuffix(suffix.to_string()));
        }
        self.adapters.push(adapter);
        Ok(self.adapters.len() - 1)
    }

    /// Returns the number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns `true` if no adapter is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Returns the adapter at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&dyn TopicAdapter> {
        self.adapters.get(index).map(|adapter| &**adapter)
    }

    /// Iterates over the suffixes in registration order.
    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.adapters.iter().map(|a| a.suffix())
    }

    /// Iterates mutably over the adapters in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn TopicAdapter>> {
        self.adapters.iter_mut()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.suffixes()).finish()
    }
}
