// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device and firmware identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of this controller.
///
/// Generated once on first boot and persisted in the controller config.
/// Serialized as a hyphenated UUID string.
///
/// # Examples
///
/// ```
/// use geoglow_controller::DeviceId;
///
/// let id = DeviceId::new();
/// let parsed: DeviceId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Generates a new random (v4) identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = &self.0.to_string()[..8];
        write!(f, "DeviceId({short}...)")
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for DeviceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Firmware version and friend id, fixed for the life of the process.
///
/// Every status and error report carries both values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareIdentity {
    version: String,
    friend_id: String,
}

impl FirmwareIdentity {
    /// Creates an identity.
    #[must_use]
    pub fn new(version: impl Into<String>, friend_id: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            friend_id: friend_id.into(),
        }
    }

    /// Returns the firmware version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the friend id.
    #[must_use]
    pub fn friend_id(&self) -> &str {
        &self.friend_id
    }
}
