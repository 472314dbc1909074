// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `color-palette/set` topic adapter.

use serde::Deserialize;
use serde_json::Value;

use crate::adapter::TopicAdapter;
use crate::error::LightError;

use super::HsbColor;

/// Something that can show a colour palette.
pub trait LightSink {
    /// Displays `palette` on the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejects or cannot receive the palette.
    fn display_palette(&mut self, palette: &[HsbColor]) -> Result<(), LightError>;
}

#[derive(Debug, Deserialize)]
struct PalettePayload {
    palette: Vec<HsbColor>,
}

/// Applies palettes received on `GeoGlow/<friendId>/color-palette/set`.
///
/// Payload: `{"palette": [{"hue": 0, "saturation": 100, "brightness": 80}, ...]}`.
/// Malformed palettes and device failures are logged and dropped.
#[derive(Debug)]
pub struct ColorPaletteAdapter<S> {
    sink: S,
}

impl<S: LightSink> ColorPaletteAdapter<S> {
    /// Topic suffix the adapter listens on.
    pub const SUFFIX: &'static str = "color-palette/set";

    /// Creates an adapter forwarding palettes to `sink`.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Returns the sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: LightSink> TopicAdapter for ColorPaletteAdapter<S> {
    fn suffix(&self) -> &str {
        Self::SUFFIX
    }

    fn on_message(&mut self, topic: &str, payload: &Value, _raw_len: usize) {
        let palette = match PalettePayload::deserialize(payload) {
            Ok(parsed) if !parsed.palette.is_empty() => parsed.palette,
            Ok(_) => {
                tracing::warn!(topic = %topic, "Ignoring empty palette");
                return;
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Ignoring malformed palette");
                return;
            }
        };

        tracing::debug!(colors = palette.len(), "Applying palette");
        if let Err(e) = self.sink.display_palette(&palette) {
            tracing::warn!(error = %e, "Failed to display palette");
        }
    }
}
