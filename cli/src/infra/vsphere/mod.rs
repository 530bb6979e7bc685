//! vCenter client implementing the platform ports.
//!
//! Two API surfaces are used, each with its own session:
//!
//! - VI/JSON (`/sdk/vim25/{release}/...`) for inventory, VM operations and
//!   tasks ([`vim`]).
//! - Automation REST (`/api/...`) for tag categories, tags and associations
//!   ([`tagging`]).
//!
//! Both sessions are opened by [`VsphereClient::connect`] and closed by
//! [`VsphereClient::logout`].

pub mod tagging;
pub mod vim;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::domain::PlatformError;
use crate::domain::config::PlatformConfig;
use vim::{MoRef, ServiceContent};

/// Header carrying the session token on both API surfaces.
const SESSION_HEADER: &str = "vmware-api-session-id";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Username and password for the platform.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated connection to one vCenter.
pub struct VsphereClient {
    http: reqwest::Client,
    base: String,
    vim_base: String,
    vim_session: String,
    rest_session: String,
    content: ServiceContent,
}

impl VsphereClient {
    /// Open both sessions against the configured vCenter.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is unreachable or either login is
    /// rejected.
    pub async fn connect(cfg: &PlatformConfig, creds: &Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(cfg.insecure)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client")?;
        let base = format!("https://{}:{}", cfg.host, cfg.port);
        let vim_base = format!("{base}/sdk/vim25/{}", cfg.api_release);

        let content: ServiceContent = decode(
            check(
                http.get(format!("{vim_base}/ServiceInstance/ServiceInstance/content"))
                    .send()
                    .await
                    .with_context(|| format!("cannot reach vCenter at {base}"))?,
                "ServiceInstance/content",
            )
            .await?,
            "ServiceInstance/content",
        )
        .await?;

        let vim_session = vim_login(&http, &vim_base, &content.session_manager, creds).await?;
        let rest_session = match rest_login(&http, &base, creds).await {
            Ok(token) => token,
            Err(e) => {
                vim_logout(&http, &vim_base, &content.session_manager, &vim_session).await;
                return Err(e);
            }
        };
        tracing::debug!(host = %cfg.host, user = %creds.username, "vCenter sessions established");

        Ok(Self {
            http,
            base,
            vim_base,
            vim_session,
            rest_session,
            content,
        })
    }

    /// Close both sessions. Failures are logged, not returned.
    pub async fn logout(&self) {
        vim_logout(
            &self.http,
            &self.vim_base,
            &self.content.session_manager,
            &self.vim_session,
        )
        .await;
        let result = self
            .http
            .delete(format!("{}/api/session", self.base))
            .header(SESSION_HEADER, &self.rest_session)
            .send()
            .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, "REST logout failed");
        }
    }

    fn vim(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{path}", self.vim_base))
            .header(SESSION_HEADER, &self.vim_session)
    }

    fn rest(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/api/{path}", self.base))
            .header(SESSION_HEADER, &self.rest_session)
    }
}

async fn vim_login(
    http: &reqwest::Client,
    vim_base: &str,
    session_manager: &MoRef,
    creds: &Credentials,
) -> Result<String> {
    let path = format!("SessionManager/{}/Login", session_manager.value);
    let resp = check(
        http.post(format!("{vim_base}/{path}"))
            .json(&serde_json::json!({
                "userName": creds.username,
                "password": creds.password,
            }))
            .send()
            .await
            .context("VI/JSON login request failed")?,
        &path,
    )
    .await
    .context("VI/JSON login rejected")?;
    session_token(&resp).context("VI/JSON login returned no session id")
}

async fn vim_logout(http: &reqwest::Client, vim_base: &str, session_manager: &MoRef, session: &str) {
    let result = http
        .post(format!("{vim_base}/SessionManager/{}/Logout", session_manager.value))
        .header(SESSION_HEADER, session)
        .send()
        .await;
    if let Err(e) = result {
        tracing::debug!(error = %e, "VI/JSON logout failed");
    }
}

async fn rest_login(http: &reqwest::Client, base: &str, creds: &Credentials) -> Result<String> {
    let resp = check(
        http.post(format!("{base}/api/session"))
            .basic_auth(&creds.username, Some(&creds.password))
            .send()
            .await
            .context("REST login request failed")?,
        "session",
    )
    .await
    .context("REST login rejected")?;
    decode(resp, "session").await
}

fn session_token(resp: &Response) -> Option<String> {
    resp.headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Pass successful responses through; turn everything else into a
/// [`PlatformError`].
async fn check(resp: Response, path: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify(status, path, &body).into())
}

/// Map an error response to a [`PlatformError`].
///
/// VI/JSON faults carry `_typeName`; REST errors carry `error_type`.
fn classify(status: StatusCode, path: &str, body: &str) -> PlatformError {
    let json: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let kind = json
        .get("_typeName")
        .or_else(|| json.get("error_type"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    if status == StatusCode::NOT_FOUND || kind == "ManagedObjectNotFound" || kind == "NOT_FOUND" {
        return PlatformError::ObjectNotFound(path.to_string());
    }
    let message = json
        .pointer("/faultMessage/0/message")
        .or_else(|| json.pointer("/messages/0/default_message"))
        .and_then(serde_json::Value::as_str)
        .map_or_else(
            || if kind.is_empty() { body.trim().to_string() } else { kind.to_string() },
            str::to_string,
        );
    PlatformError::Http {
        status: status.as_u16(),
        path: path.to_string(),
        message,
    }
}

async fn decode<T: DeserializeOwned>(resp: Response, path: &str) -> Result<T> {
    let text = resp
        .text()
        .await
        .with_context(|| format!("reading response for {path}"))?;
    serde_json::from_str(&text).map_err(|e| {
        PlatformError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Like [`decode`], but an empty body or JSON `null` is `None`.
async fn decode_optional<T: DeserializeOwned>(resp: Response, path: &str) -> Result<Option<T>> {
    let text = resp
        .text()
        .await
        .with_context(|| format!("reading response for {path}"))?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&text).map_err(|e| {
        PlatformError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
