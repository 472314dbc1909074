// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic namespace construction and wildcard matching.
//!
//! Feature topics live under a per-device root:
//!
//! ```text
//! GeoGlow/<friend_id>/<adapter suffix>
//! ```
//!
//! Status and error reports use flat, product-wide topics that are not
//! scoped by friend id ([`STATUS_TOPIC`], [`ERROR_TOPIC`]).

/// Product prefix shared by every topic this controller uses.
pub const PRODUCT_PREFIX: &str = "GeoGlow";

/// Topic for status reports.
pub const STATUS_TOPIC: &str = "GeoGlow/status/update";

/// Topic for error reports.
pub const ERROR_TOPIC: &str = "GeoGlow/status/error";

/// Topic for the periodic presence ping consumed by the friend service.
pub const PING_TOPIC: &str = "GeoGlow/Friend-Service/ping";

/// Per-device topic root, `GeoGlow/<friend_id>/`.
///
/// # Examples
///
/// ```
/// use geoglow_controller::protocol::Namespace;
///
/// let ns = Namespace::new("team-7");
/// assert_eq!(ns.as_str(), "GeoGlow/team-7/");
/// assert_eq!(ns.topic_for("color-palette/set"), "GeoGlow/team-7/color-palette/set");
/// assert_eq!(ns.client_id(), "GeoGlow-team-7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    friend_id: String,
    root: String,
}

impl Namespace {
    /// Creates the namespace for the given friend id.
    #[must_use]
    pub fn new(friend_id: impl Into<String>) -> Self {
        let friend_id = friend_id.into();
        let root = format!("{PRODUCT_PREFIX}/{friend_id}/");
        Self { friend_id, root }
    }

    /// Returns the namespace root, including the trailing slash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.root
    }

    /// Returns the friend id this namespace was built from.
    #[must_use]
    pub fn friend_id(&self) -> &str {
        &self.friend_id
    }

    /// Returns the fully qualified topic for an adapter suffix.
    #[must_use]
    pub fn topic_for(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.root)
    }

    /// Returns the MQTT client id derived from the namespace.
    ///
    /// Deterministic so the broker can spot a second session for the same
    /// device.
    #[must_use]
    pub fn client_id(&self) -> String {
        format!("{PRODUCT_PREFIX}-{}", self.friend_id)
    }
}

/// Tests a subscription pattern against a concrete received topic.
///
/// - A pattern ending in `#` matches any topic that starts with the pattern
///   minus the `#` (so `root/#` matches `root/` and `root/x/y`, but neither
///   `root` nor `rootX`).
/// - A pattern containing `+` is compared level by level; each `+` level
///   matches exactly one level of the topic, which may be empty.
/// - Anything else is an exact string comparison.
///
/// Patterns combining `+` with a trailing `#`, or with `#` anywhere other
/// than the last character, are unsupported: the `#` rule wins and any `+`
/// before it is compared literally.
///
/// # Examples
///
/// ```
/// use geoglow_controller::protocol::topic_matches;
///
/// assert!(topic_matches("root/#", "root/x/y"));
/// assert!(topic_matches("root/+/set", "root/anything/set"));
/// assert!(!topic_matches("root/+/set", "root/a/b/set"));
/// assert!(topic_matches("root/a", "root/a"));
/// ```
#[must_use]
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('#') {
        return topic.starts_with(prefix);
    }

    if pattern.contains('+') {
        let mut levels = topic.split('/');
        for filter in pattern.split('/') {
            match levels.next() {
                Some(_) if filter == "+" => {}
                Some(level) if level == filter => {}
                _ => return false,
            }
        }
        return levels.next().is_none();
    }

    pattern == topic
}
