// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic presence ping for the friend service.
//!
//! Every [`Heartbeat::DEFAULT_INTERVAL`] the controller publishes
//! `{"friendId", "deviceId", "panelIds"}` on [`PING_TOPIC`] so peers can see
//! which panels are online.
//!
//! [`PING_TOPIC`]: crate::protocol::PING_TOPIC

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::identity::DeviceId;

/// Schedules pings on a fixed interval.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    last: Option<Instant>,
}

impl Heartbeat {
    /// Default time between pings.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

    /// Creates a heartbeat; the first [`due`](Self::due) call returns `true`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns the ping interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` (and restarts the interval) if a ping is due at `now`.
    pub fn due(&mut self, now: Instant) -> bool {
        let due = self
            .last
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

/// Body of a presence ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingPayload<'a> {
    /// Friend id of this controller.
    pub friend_id: &'a str,
    /// Unique controller id.
    pub device_id: DeviceId,
    /// Ids of the attached panels.
    pub panel_ids: &'a [String],
}

/// Builds the ping body.
#[must_use]
pub fn ping_payload<'a>(
    friend_id: &'a str,
    device_id: DeviceId,
    panel_ids: &'a [String],
) -> PingPayload<'a> {
    PingPayload {
        friend_id,
        device_id,
        panel_ids,
    }
}
