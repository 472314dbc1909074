// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for the Nanoleaf panel REST API.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LightError;

use super::{HsbColor, LightSink};

/// Blocking client for one Nanoleaf controller.
///
/// All device endpoints live under `/api/v1/<auth_token>/`. A fresh token
/// is obtained with [`generate_token`](Self::generate_token) while the
/// device is in pairing mode (power button held for a few seconds).
///
/// # Examples
///
/// ```no_run
/// use geoglow_controller::light::{HsbColor, NanoleafClient};
///
/// let client = NanoleafClient::new("http://192.168.1.60:16021", "token")?;
/// client.set_power(true)?;
/// client.display_palette(&[HsbColor::new(200, 80, 60)?])?;
/// # Ok::<(), geoglow_controller::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct NanoleafClient {
    base_url: String,
    auth_token: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    auth_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Layout {
    position_data: Vec<PanelPosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanelPosition {
    panel_id: u32,
}

#[derive(Debug, Serialize)]
struct EffectWrite<'a> {
    write: WriteCommand<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteCommand<'a> {
    command: &'static str,
    anim_type: &'static str,
    color_type: &'static str,
    palette: &'a [HsbColor],
    trans_time: Range,
    delay_time: Range,
    #[serde(rename = "loop")]
    looping: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Range {
    min_value: u32,
    max_value: u32,
}

impl<'a> EffectWrite<'a> {
    /// Looping effect that fades randomly between the palette colours.
    fn random(palette: &'a [HsbColor]) -> Self {
        let timing = || Range {
            min_value: 50,
            max_value: 100,
        };
        Self {
            write: WriteCommand {
                command: "display",
                anim_type: "random",
                color_type: "HSB",
                palette,
                trans_time: timing(),
                delay_time: timing(),
                looping: true,
            },
        }
    }
}

impl NanoleafClient {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a client for the device at `base_url` (e.g.
    /// `http://192.168.1.60:16021`).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Result<Self, LightError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder().timeout(Self::DEFAULT_TIMEOUT).build()?;

        Ok(Self {
            base_url,
            auth_token: auth_token.into(),
            client,
        })
    }

    /// Returns the device base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the current auth token.
    #[must_use]
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// Replaces the auth token used for subsequent requests.
    pub fn set_auth_token(&mut self, token: impl Into<String>) {
        self.auth_token = token.into();
    }

    /// Builds the URL of a token-scoped endpoint.
    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/{}/{path}",
            self.base_url,
            urlencoding::encode(&self.auth_token)
        )
    }

    /// Fetches the controller info document.
    ///
    /// # Errors
    ///
    /// Returns [`LightError::Unauthorized`] for a bad token, or an HTTP error.
    pub fn info(&self) -> Result<Value, LightError> {
        let url = self.api_url("");
        tracing::debug!(url = %self.base_url, "Fetching panel info");
        let response = check(self.client.get(&url).send()?)?;
        Ok(response.json()?)
    }

    /// Returns `true` if the device answers with the current token.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        match self.info() {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Panel not reachable");
                false
            }
        }
    }

    /// Requests a new auth token. Only succeeds while the device is in
    /// pairing mode.
    ///
    /// # Errors
    ///
    /// Returns [`LightError::Unauthorized`] when pairing mode is off.
    pub fn generate_token(&self) -> Result<String, LightError> {
        let url = format!("{}/api/v1/new", self.base_url);
        let response = check(self.client.post(&url).send()?)?;
        let body: TokenResponse = response.json()?;
        if body.auth_token.is_empty() {
            return Err(LightError::UnexpectedFormat("empty auth_token".to_string()));
        }
        tracing::info!("Obtained new panel auth token");
        Ok(body.auth_token)
    }

    /// Switches the panels on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn set_power(&self, on: bool) -> Result<(), LightError> {
        let body = serde_json::json!({ "on": { "value": on } });
        check(self.client.put(self.api_url("state")).json(&body).send()?)?;
        tracing::debug!(on, "Set panel power");
        Ok(())
    }

    /// Returns the ids of every panel in the layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the layout is malformed.
    pub fn panel_ids(&self) -> Result<Vec<String>, LightError> {
        let response = check(self.client.get(self.api_url("panelLayout/layout")).send()?)?;
        let text = response.text()?;
        let layout: Layout = serde_json::from_str(&text)
            .map_err(|e| LightError::UnexpectedFormat(e.to_string()))?;
        Ok(layout
            .position_data
            .iter()
            .map(|panel| panel.panel_id.to_string())
            .collect())
    }

    /// Shows `palette` as a looping random-transition effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub fn display_palette(&self, palette: &[HsbColor]) -> Result<(), LightError> {
        let body = EffectWrite::random(palette);
        check(self.client.put(self.api_url("effects")).json(&body).send()?)?;
        tracing::debug!(colors = palette.len(), "Palette displayed");
        Ok(())
    }
}

impl LightSink for NanoleafClient {
    fn display_palette(&mut self, palette: &[HsbColor]) -> Result<(), LightError> {
        NanoleafClient::display_palette(self, palette)
    }
}

/// Maps auth failures and other non-2xx statuses to errors.
fn check(response: Response) -> Result<Response, LightError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(LightError::Unauthorized);
    }
    if !status.is_success() {
        return Err(LightError::Status(status.as_u16()));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_encodes_token() {
        let client = NanoleafClient::new("http://panel:16021/", "a b/c").unwrap();
        assert_eq!(client.base_url(), "http://panel:16021");
        assert_eq!(
            client.api_url("state"),
            "http://panel:16021/api/v1/a%20b%2Fc/state"
        );
        assert_eq!(client.api_url(""), "http://panel:16021/api/v1/a%20b%2Fc/");
    }

    #[test]
    fn effect_body_shape() {
        let palette = [HsbColor::new(1, 2, 3).unwrap()];
        let json = serde_json::to_value(EffectWrite::random(&palette)).unwrap();
        assert_eq!(json["write"]["animType"], "random");
        assert_eq!(json["write"]["colorType"], "HSB");
        assert_eq!(json["write"]["loop"], true);
        assert_eq!(json["write"]["transTime"]["minValue"], 50);
        assert_eq!(json["write"]["palette"][0]["brightness"], 3);
    }

    #[test]
    fn set_auth_token_replaces_token() {
        let mut client = NanoleafClient::new("http://panel", "old").unwrap();
        client.set_auth_token("new");
        assert_eq!(client.auth_token(), "new");
    }
}
