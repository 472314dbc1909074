// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HSB colour values as used by the panel effects API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// HSB color representation (Hue, Saturation, Brightness).
///
/// Serializes as `{"hue": .., "saturation": .., "brightness": ..}`, which is
/// both the palette entry format of the panel API and of inbound
/// `color-palette/set` messages. Deserialization validates the ranges.
///
/// # Examples
///
/// ```
/// use geoglow_controller::light::HsbColor;
///
/// let teal = HsbColor::new(180, 100, 60).unwrap();
/// assert_eq!(teal.hue(), 180);
///
/// let parsed: HsbColor =
///     serde_json::from_str(r#"{"hue":180,"saturation":100,"brightness":60}"#).unwrap();
/// assert_eq!(parsed, teal);
///
/// assert!(HsbColor::new(361, 0, 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawHsb")]
pub struct HsbColor {
    hue: u16,
    saturation: u8,
    brightness: u8,
}

#[derive(Deserialize)]
struct RawHsb {
    hue: u16,
    saturation: u8,
    brightness: u8,
}

impl TryFrom<RawHsb> for HsbColor {
    type Error = ValueError;

    fn try_from(raw: RawHsb) -> Result<Self, Self::Error> {
        Self::new(raw.hue, raw.saturation, raw.brightness)
    }
}

impl HsbColor {
    /// Maximum hue value (inclusive, 360 wraps to red).
    pub const MAX_HUE: u16 = 360;

    /// Maximum saturation value.
    pub const MAX_SATURATION: u8 = 100;

    /// Maximum brightness value.
    pub const MAX_BRIGHTNESS: u8 = 100;

    /// Creates a new HSB color.
    ///
    /// # Errors
    ///
    /// Returns error if any value is outside its valid range.
    pub fn new(hue: u16, saturation: u8, brightness: u8) -> Result<Self, ValueError> {
        if hue > Self::MAX_HUE {
            return Err(ValueError::InvalidHue(hue));
        }
        if saturation > Self::MAX_SATURATION {
            return Err(ValueError::InvalidSaturation(saturation));
        }
        if brightness > Self::MAX_BRIGHTNESS {
            return Err(ValueError::InvalidBrightness(brightness));
        }
        Ok(Self {
            hue,
            saturation,
            brightness,
        })
    }

    /// Returns the hue value (0-360).
    #[must_use]
    pub const fn hue(&self) -> u16 {
        self.hue
    }

    /// Returns the saturation value (0-100).
    #[must_use]
    pub const fn saturation(&self) -> u8 {
        self.saturation
    }

    /// Returns the brightness value (0-100).
    #[must_use]
    pub const fn brightness(&self) -> u8 {
        self.brightness
    }
}

impl fmt::Display for HsbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HSB({}, {}%, {}%)",
            self.hue, self.saturation, self.brightness
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hsb_color_valid() {
        let color = HsbColor::new(180, 50, 75).unwrap();
        assert_eq!(color.hue(), 180);
        assert_eq!(color.saturation(), 50);
        assert_eq!(color.brightness(), 75);
    }

    #[test]
    fn hsb_color_bounds() {
        assert!(HsbColor::new(360, 100, 100).is_ok());
        assert!(matches!(
            HsbColor::new(361, 50, 50),
            Err(ValueError::InvalidHue(361))
        ));
        assert!(matches!(
            HsbColor::new(180, 101, 50),
            Err(ValueError::InvalidSaturation(101))
        ));
        assert!(matches!(
            HsbColor::new(180, 50, 101),
            Err(ValueError::InvalidBrightness(101))
        ));
    }

    #[test]
    fn serializes_as_palette_entry() {
        let color = HsbColor::new(10, 20, 30).unwrap();
        assert_eq!(
            serde_json::to_value(color).unwrap(),
            json!({"hue": 10, "saturation": 20, "brightness": 30})
        );
    }

    #[test]
    fn deserialize_validates_ranges() {
        let err = serde_json::from_value::<HsbColor>(
            json!({"hue": 400, "saturation": 20, "brightness": 30}),
        );
        assert!(err.is_err());
    }

    #[test]
    fn display() {
        let color = HsbColor::new(120, 100, 75).unwrap();
        assert_eq!(color.to_string(), "HSB(120, 100%, 75%)");
    }
}
