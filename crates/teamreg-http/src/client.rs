// HTTP adapter for the league backend, built on reqwest.
//
// Every endpoint answers with the `{status, msg, data}` envelope. Non-success
// HTTP statuses and `status: "error"` envelopes both map to `ApiError`, with
// the server's `msg` preserved so the result handler can show it verbatim.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use teamreg_core::api::{
    Ack, ApiResponse, CreatedPlayer, ExistingPlayer, FormPart, LeagueApi, MultipartForm, PlayerUpdate,
    ResponseStatus, SeasonRef,
};
use teamreg_core::config::ApiConfig;
use teamreg_core::error::ApiError;
use teamreg_core::session::SessionContext;

// ---------------------------------------------------------------------------
// HttpLeagueApi
// ---------------------------------------------------------------------------

pub struct HttpLeagueApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLeagueApi {
    /// Client with reqwest's defaults (no request timeout).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base(base_url.into()),
        }
    }

    /// Build from the `[api]` config section, applying the request timeout.
    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: normalize_base(config.base_url.clone()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the API root.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder, session: &SessionContext) -> RequestBuilder {
        match session.authorization_header() {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        }
    }

    /// Send a request and unwrap the response envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        session: &SessionContext,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = self
            .authorize(request, session)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        debug!(status = status.as_u16(), bytes = body.len(), "league API response");
        parse_envelope(status, &body)
    }
}

fn normalize_base(base: String) -> String {
    base.trim().trim_end_matches('/').to_string()
}

// ---------------------------------------------------------------------------
// Envelope and error mapping
// ---------------------------------------------------------------------------

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// The `msg` field of an error body, if the body is a JSON object with one.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let msg = value.get("msg").or_else(|| value.get("message"))?.as_str()?.trim();
    (!msg.is_empty()).then(|| msg.to_string())
}

pub(crate) fn parse_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<ApiResponse<T>, ApiError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!(status = status.as_u16(), "league API refused credentials");
        return Err(ApiError::Unauthorized {
            message: extract_message(body),
        });
    }
    if !status.is_success() {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: extract_message(body),
        });
    }

    let envelope: ApiResponse<T> =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(format!("invalid response envelope: {e}")))?;
    if envelope.status == ResponseStatus::Error {
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message: envelope.message().map(str::to_string),
        });
    }
    Ok(envelope)
}

fn ack<T>(envelope: &ApiResponse<T>) -> Ack {
    Ack {
        message: envelope.message().map(str::to_string),
    }
}

/// Convert the core's form description into a reqwest multipart body.
pub(crate) fn to_multipart(form: MultipartForm) -> Result<Form, ApiError> {
    let mut out = Form::new();
    for part in form.into_parts() {
        out = match part {
            FormPart::Text { name, value } => out.text(name, value),
            FormPart::File { name, file } => {
                let part = Part::bytes(file.bytes().to_vec())
                    .file_name(file.file_name().to_string())
                    .mime_str(file.mime_type())
                    .map_err(|e| ApiError::Transport(format!("invalid mime type for {name}: {e}")))?;
                out.part(name, part)
            }
        };
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// LeagueApi implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl LeagueApi for HttpLeagueApi {
    async fn validate_invitation(&self, session: &SessionContext, code: &str) -> Result<SeasonRef, ApiError> {
        let request = self
            .http
            .post(self.endpoint("invitation/validate"))
            .json(&json!({ "code": code }));
        let envelope: ApiResponse<Value> = self.send(request, session).await?;
        let data = envelope.data.unwrap_or(Value::Null);
        SeasonRef::from_payload(&data)
            .ok_or_else(|| ApiError::Decode("validation response carries no season".to_string()))
    }

    async fn create_team(&self, session: &SessionContext, form: MultipartForm) -> Result<Ack, ApiError> {
        let request = self.http.post(self.endpoint("teams")).multipart(to_multipart(form)?);
        let envelope: ApiResponse<Value> = self.send(request, session).await?;
        Ok(ack(&envelope))
    }

    async fn create_player(&self, session: &SessionContext, form: MultipartForm) -> Result<CreatedPlayer, ApiError> {
        let request = self.http.post(self.endpoint("players")).multipart(to_multipart(form)?);
        let envelope: ApiResponse<Value> = self.send(request, session).await?;
        let id = envelope
            .data
            .as_ref()
            .and_then(|d| d.get("_id").or_else(|| d.get("id")))
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Decode("created player has no id".to_string()))?;
        Ok(CreatedPlayer { id: id.to_string() })
    }

    async fn update_player(
        &self,
        session: &SessionContext,
        player_id: &str,
        update: &PlayerUpdate,
    ) -> Result<(), ApiError> {
        let request = self
            .http
            .patch(self.endpoint(&format!("players/{player_id}")))
            .json(update);
        let _: ApiResponse<Value> = self.send(request, session).await?;
        Ok(())
    }

    async fn players_by_team(&self, session: &SessionContext, team_id: &str) -> Result<Vec<ExistingPlayer>, ApiError> {
        let request = self.http.get(self.endpoint(&format!("players/team/{team_id}")));
        let envelope: ApiResponse<Vec<ExistingPlayer>> = self.send(request, session).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn add_team_to_season(&self, session: &SessionContext, team_id: &str, code: &str) -> Result<Ack, ApiError> {
        let request = self
            .http
            .post(self.endpoint(&format!("teams/{team_id}/season")))
            .json(&json!({ "code": code }));
        let envelope: ApiResponse<Value> = self.send(request, session).await?;
        Ok(ack(&envelope))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
