// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic adapters: one application feature bound to one topic suffix.
//!
//! An adapter declares a suffix relative to the device namespace (for
//! example `color-palette/set`, or a wildcard pattern such as
//! `scenes/+/apply`) and handles the messages that arrive on it.
//!
//! # Usage
//!
//! ```
//! use geoglow_controller::adapter::{FnAdapter, TopicAdapter};
//!
//! let mut adapter = FnAdapter::new("lights/set", |topic, payload, len| {
//!     println!("{topic}: {payload} ({len} bytes)");
//! });
//! assert_eq!(adapter.suffix(), "lights/set");
//! adapter.on_message("GeoGlow/f/lights/set", &serde_json::json!({"r": 1}), 7);
//! ```
//!
//! Adapters are handed to [`MqttRouter::register_adapter`], which owns them
//! for the rest of the process.
//!
//! [`MqttRouter::register_adapter`]: crate::protocol::MqttRouter::register_adapter

mod registry;

pub use registry::AdapterRegistry;

use serde_json::Value;

/// Handler for the messages on one namespaced topic.
pub trait TopicAdapter {
    /// Topic suffix relative to the device namespace. May contain one
    /// MQTT wildcard.
    fn suffix(&self) -> &str;

    /// Handles a decoded message.
    ///
    /// `topic` is the concrete topic it arrived on and `raw_len` the length
    /// of the undecoded payload.
    fn on_message(&mut self, topic: &str, payload: &Value, raw_len: usize);
}

/// A [`TopicAdapter`] backed by a closure.
pub struct FnAdapter<F> {
    suffix: String,
    handler: F,
}

impl<F> FnAdapter<F>
where
    F: FnMut(&str, &Value, usize),
{
    /// Creates an adapter for `suffix` that forwards messages to `handler`.
    #[must_use]
    pub fn new(suffix: impl Into<String>, handler: F) -> Self {
        Self {
            suffix: suffix.into(),
            handler,
        }
    }
}

impl<F> TopicAdapter for FnAdapter<F>
where
    F: FnMut(&str, &Value, usize),
{
    fn suffix(&self) -> &str {
        &self.suffix
    }

    fn on_message(&mut self, topic: &str, payload: &Value, raw_len: usize) {
        (self.handler)(topic, payload, raw_len);
    }
}

impl<F> std::fmt::Debug for FnAdapter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnAdapter")
            .field("suffix", &self.suffix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fn_adapter_forwards_arguments() {
        let last_len = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&last_len);
        let mut adapter = FnAdapter::new("a/b", move |topic, payload, len| {
            assert_eq!(topic, "GeoGlow/x/a/b");
            assert_eq!(payload["on"], true);
            seen.store(len, Ordering::SeqCst);
        });

        adapter.on_message("GeoGlow/x/a/b", &serde_json::json!({"on": true}), 11);
        assert_eq!(last_len.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn fn_adapter_debug_shows_suffix() {
        let adapter = FnAdapter::new("a/#", |_: &str, _: &Value, _: usize| {});
        assert!(format!("{adapter:?}").contains("a/#"));
    }
}
