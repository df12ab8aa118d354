// omadactl - SSID control for Omada controllers
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::error::OmadaError;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

const TOKEN_HEADER: &str = "Csrf-Token";

static UA: OnceLock<HeaderValue> = OnceLock::new();

/// What the SSID routines need from a controller session.
///
/// Paths are relative to the controller API root, e.g.
/// `/sites/{site}/setting/wlans`.
pub trait ControllerApi {
    /// Authenticates and returns the key of the configured site.
    fn login(&mut self) -> Result<String, OmadaError>;
    fn logout(&mut self) -> Result<(), OmadaError>;
    fn get(&mut self, path: &str) -> Result<Value, OmadaError>;
    fn patch(&mut self, path: &str, body: &Value) -> Result<Value, OmadaError>;
}

/// `{errorCode, msg, result}` wrapper around every Omada response.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "errorCode", default)]
    error_code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    result: Option<Value>,
}

#[derive(Debug)]
struct Session {
    api_root: Url,
    token: String,
}

#[derive(Debug)]
pub struct OmadaClient {
    base_url: Url,
    http: Client,
    username: String,
    password: String,
    site: String,
    session: Option<Session>,
}

impl OmadaClient {
    /// `verify_tls = false` accepts the self-signed certificate most
    /// controllers ship with. It only affects this client.
    pub fn new(
        url: &str,
        username: &str,
        password: &str,
        site: &str,
        verify_tls: bool,
    ) -> Result<Self, OmadaError> {
        let base_url = Url::parse(url).map_err(|e| OmadaError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let user_agent = UA.get_or_init(|| HeaderValue::from_static("omadactl/0.1"));
        let http = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!verify_tls)
            .user_agent(user_agent.clone())
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            base_url,
            http,
            username: username.to_string(),
            password: password.to_string(),
            site: site.to_string(),
            session: None,
        })
    }

    fn controller_id(&self) -> Result<String, OmadaError> {
        let url = join(&self.base_url, "api/info")?;
        debug!(%url, "fetching controller info");
        let result = self.send(self.http.get(url), "fetch controller info")?;
        result
            .get("omadacId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| OmadaError::Malformed("api/info response has no omadacId".into()))
    }

    fn resolve_site(&mut self) -> Result<String, OmadaError> {
        let current = self.get("/users/current")?;
        let sites = current
            .get("privilege")
            .and_then(|p| p.get("sites"))
            .and_then(Value::as_array)
            .ok_or_else(|| OmadaError::Malformed("users/current lists no sites".into()))?;

        sites
            .iter()
            .find_map(|site| {
                let name = site.get("name").and_then(Value::as_str);
                let key = site.get("key").and_then(Value::as_str)?;
                (name == Some(self.site.as_str()) || key == self.site).then(|| key.to_string())
            })
            .ok_or_else(|| OmadaError::SiteNotFound(self.site.clone()))
    }

    fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, OmadaError> {
        let session = self.session.as_ref().ok_or(OmadaError::NoSession)?;
        let url = join(&session.api_root, path.trim_start_matches('/'))?;
        debug!(%method, %url, "controller request");

        let mut req = self
            .http
            .request(method.clone(), url)
            .header(TOKEN_HEADER, session.token.as_str());
        if let Some(b) = body {
            req = req.json(b);
        }

        let operation = format!("{method} {path}");
        self.send(req, &operation)
    }

    /// Sends one request and unwraps the envelope. Nothing is retried.
    fn send(&self, req: RequestBuilder, operation: &str) -> Result<Value, OmadaError> {
        let res = req
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()?;
        let status = res.status();
        let text = res.text()?;

        if !status.is_success() {
            let envelope = serde_json::from_str::<Envelope>(&text).ok();
            return Err(OmadaError::Rejected {
                operation: operation.to_string(),
                status: status.as_u16(),
                code: envelope.as_ref().map(|e| e.error_code).unwrap_or(-1),
                message: envelope
                    .and_then(|e| e.msg)
                    .unwrap_or_else(|| truncate(&text)),
            });
        }

        let envelope: Envelope = serde_json::from_str(&text).map_err(|e| {
            OmadaError::Malformed(format!("{operation} returned non-JSON body: {e}"))
        })?;
        if envelope.error_code != 0 {
            return Err(OmadaError::Rejected {
                operation: operation.to_string(),
                status: status.as_u16(),
                code: envelope.error_code,
                message: envelope.msg.unwrap_or_default(),
            });
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

impl ControllerApi for OmadaClient {
    fn login(&mut self) -> Result<String, OmadaError> {
        let controller_id = self.controller_id()?;
        let api_root = join(&self.base_url, &format!("{controller_id}/api/v2/"))?;
        let creds = serde_json::json!({
            "username": self.username,
            "password": self.password,
        });

        info!(url = %self.base_url, "logging in to Omada controller");
        let login_url = join(&api_root, "login")?;
        let result = self
            .send(self.http.post(login_url).json(&creds), "login")
            .map_err(|err| match err {
                OmadaError::Rejected { message, code, .. } => {
                    OmadaError::Authentication(format!("{message} (errorCode {code})"))
                }
                other => other,
            })?;
        let token = result
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OmadaError::Authentication("controller returned no token".into()))?
            .to_string();

        self.session = Some(Session { api_root, token });
        match self.resolve_site() {
            Ok(site_key) => {
                debug!(site = %self.site, %site_key, "resolved site");
                Ok(site_key)
            }
            Err(err) => {
                // the token is already live on the controller
                let _ = self.logout();
                Err(err)
            }
        }
    }

    fn logout(&mut self) -> Result<(), OmadaError> {
        if self.session.is_none() {
            return Ok(());
        }
        info!("logging out of Omada controller");
        let outcome = self.request(Method::POST, "/logout", None).map(|_| ());
        self.session = None;
        outcome
    }

    fn get(&mut self, path: &str) -> Result<Value, OmadaError> {
        self.request(Method::GET, path, None)
    }

    fn patch(&mut self, path: &str, body: &Value) -> Result<Value, OmadaError> {
        self.request(Method::PATCH, path, Some(body))
    }
}

fn join(base: &Url, path: &str) -> Result<Url, OmadaError> {
    base.join(path).map_err(|e| OmadaError::InvalidUrl {
        url: format!("{base}{path}"),
        reason: e.to_string(),
    })
}

fn truncate(body: &str) -> String {
    if body.chars().count() > 200 {
        format!("{}...", body.chars().take(200).collect::<String>())
    } else {
        body.to_string()
    }
}
