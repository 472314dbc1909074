// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status and error reports.
//!
//! Reports are small JSON objects published on the flat status topics:
//!
//! ```json
//! {"firmwareVersion": "0.1.0", "friendId": "team-7", "boot": "connected"}
//! {"firmwareVersion": "0.1.0", "friendId": "team-7", "error": "payload parse failed"}
//! ```
//!
//! The [`StatusReporter`] only builds payloads and notifies local
//! listeners. Publishing happens in [`MqttRouter`](super::MqttRouter), which
//! treats report publishes as terminal: if one fails it is logged and
//! dropped, never reported again.

use serde_json::{Map, Value};

use crate::identity::FirmwareIdentity;

use super::topic::{ERROR_TOPIC, STATUS_TOPIC};

/// Key used for the message of an error report.
const ERROR_KEY: &str = "error";

/// Marker appended to a shortened message.
const ELLIPSIS: &str = "...";

/// A status or error event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// A status update of a given kind.
    Status {
        /// The key the message is stored under (e.g. `boot`).
        kind: String,
        /// Human-readable message.
        message: String,
    },
    /// An error description.
    Error {
        /// Human-readable message.
        message: String,
    },
}

impl Report {
    /// Returns the topic this report is published on.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Status { .. } => STATUS_TOPIC,
            Self::Error { .. } => ERROR_TOPIC,
        }
    }

    /// Returns the report message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } | Self::Error { message } => message,
        }
    }

    /// Returns `true` for error reports.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    fn with_message(&self, message: String) -> Self {
        match self {
            Self::Status { kind, .. } => Self::Status {
                kind: kind.clone(),
                message,
            },
            Self::Error { .. } => Self::Error { message },
        }
    }
}

type ReportListener = Box<dyn FnMut(&Report)>;

/// Builds report payloads and fans reports out to local listeners.
pub struct StatusReporter {
    identity: FirmwareIdentity,
    listeners: Vec<ReportListener>,
}

impl StatusReporter {
    /// Creates a reporter for the given identity.
    #[must_use]
    pub fn new(identity: FirmwareIdentity) -> Self {
        Self {
            identity,
            listeners: Vec::new(),
        }
    }

    /// Returns the identity stamped on every report.
    #[must_use]
    pub fn identity(&self) -> &FirmwareIdentity {
        &self.identity
    }

    /// Registers a listener called for every report, published or not.
    pub fn on_report<F>(&mut self, listener: F)
    where
        F: FnMut(&Report) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Builds the JSON payload for a report.
    #[must_use]
    pub fn payload(&self, report: &Report) -> Value {
        let mut object = Map::new();
        object.insert(
            "firmwareVersion".to_string(),
            Value::from(self.identity.version()),
        );
        object.insert(
            "friendId".to_string(),
            Value::from(self.identity.friend_id()),
        );
        let (key, message) = match report {
            Report::Status { kind, message } => (kind.as_str(), message),
            Report::Error { message } => (ERROR_KEY, message),
        };
        object.insert(key.to_string(), Value::from(message.as_str()));
        Value::Object(object)
    }

    /// Shortens the message of `report` so its encoded payload fits in
    /// `capacity` bytes.
    ///
    /// The budget is measured on the escaped JSON form, so quotes and
    /// control characters count for what they cost on the wire. If even an
    /// empty message does not fit, the message is emptied.
    #[must_use]
    pub fn fit(&self, report: Report, capacity: usize) -> Report {
        let frame = self.payload(&report.with_message(String::new()));
        let overhead = serde_json::to_vec(&frame).map_or(capacity, |bytes| bytes.len());
        let budget = capacity.saturating_sub(overhead);
        if escaped_len(report.message()) <= budget {
            return report;
        }
        let message = truncate_escaped(report.message(), budget);
        report.with_message(message)
    }

    /// Notifies every listener of `report`.
    pub fn notify(&mut self, report: &Report) {
        for listener in &mut self.listeners {
            listener(report);
        }
    }
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter")
            .field("identity", &self.identity)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Bytes `c` takes inside a JSON string literal.
fn escaped_char_len(c: char) -> usize {
    match c {
        '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0c}' => 2,
        c if u32::from(c) < 0x20 => 6,
        c => c.len_utf8(),
    }
}

fn escaped_len(text: &str) -> usize {
    text.chars().map(escaped_char_len).sum()
}

/// Longest prefix of `text` whose escaped form, plus [`ELLIPSIS`], fits in
/// `budget` bytes.
fn truncate_escaped(text: &str, budget: usize) -> String {
    let Some(limit) = budget.checked_sub(ELLIPSIS.len()) else {
        return String::new();
    };
    let mut used = 0;
    let mut end = 0;
    for (index, c) in text.char_indices() {
        used += escaped_char_len(c);
        if used > limit {
            break;
        }
        end = index + c.len_utf8();
    }
    format!("{}{ELLIPSIS}", &text[..end])
}
