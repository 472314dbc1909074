// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Log output for the controller binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the application.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a compact stderr subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` (e.g. `info`,
/// `geoglow_controller=debug`) is used.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init(default_level: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt::layer().with_target(false).compact())
        .try_init()
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Returns `true` once a global subscriber has been installed.
#[must_use]
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
