// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The local light panel.
//!
//! - [`HsbColor`]: validated colour value
//! - [`ColorPaletteAdapter`]: topic adapter that shows received palettes
//!   through a [`LightSink`]
//! - [`NanoleafClient`]: HTTP client for the panel's REST API (feature `http`)

mod color;
#[cfg(feature = "http")]
mod nanoleaf;
mod palette;

pub use color::HsbColor;
#[cfg(feature = "http")]
pub use nanoleaf::NanoleafClient;
pub use palette::{ColorPaletteAdapter, LightSink};
