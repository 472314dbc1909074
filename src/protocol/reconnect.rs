// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker connection state machine.
//!
//! ```text
//!            transport down            attempt ok
//! Disconnected ──────────────► Connecting ──────────► Connected
//!      ▲                        │    ▲                    │
//!      │                        └────┘                    │
//!      │               attempt failed: wait retry_delay   │
//!      └──────────────────────────────────────────────────┘
//!                 transport reports not connected (next tick)
//! ```
//!
//! The machine never sleeps. Each tick asks [`ReconnectMachine::poll_attempt`]
//! whether the retry deadline has passed; retries are unbounded.

use std::fmt;
use std::time::{Duration, Instant};

/// State of the single broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session, no attempt scheduled yet.
    #[default]
    Disconnected,
    /// Attempting to (re)connect; retries on a fixed delay.
    Connecting,
    /// Session established and subscriptions issued.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Tracks connection state and the next retry deadline.
#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: ConnectionState,
    retry_delay: Duration,
    next_attempt: Option<Instant>,
    failed_attempts: u32,
}

impl ReconnectMachine {
    /// Creates a machine in the `Disconnected` state.
    #[must_use]
    pub fn new(retry_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retry_delay,
            next_attempt: None,
            failed_attempts: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the fixed delay between attempts.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Returns the number of failed attempts since the last success.
    #[must_use]
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Returns when the next attempt is allowed, if one is scheduled.
    #[must_use]
    pub fn next_attempt(&self) -> Option<Instant> {
        self.next_attempt
    }

    /// Records that the transport reported not connected.
    ///
    /// `Connected` drops to `Disconnected`, and `Disconnected` moves on to
    /// `Connecting` with an immediate first attempt.
    pub fn transport_down(&mut self, now: Instant) {
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Disconnected;
        }
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connecting;
            self.next_attempt = Some(now);
        }
    }

    /// Returns `true` if an attempt should be made at `now`.
    #[must_use]
    pub fn poll_attempt(&self, now: Instant) -> bool {
        self.state == ConnectionState::Connecting
            && self.next_attempt.is_none_or(|deadline| now >= deadline)
    }

    /// Records a failed attempt and schedules the next one.
    pub fn attempt_failed(&mut self, now: Instant) {
        self.state = ConnectionState::Connecting;
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.next_attempt = Some(now + self.retry_delay);
    }

    /// Records an established session.
    pub fn connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.next_attempt = None;
        self.failed_attempts = 0;
    }
}
