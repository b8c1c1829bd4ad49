// League API seam: wire types and the async trait the HTTP adapter implements.
//
// The core crate never talks to the network itself. Everything it sends is
// described here as plain data (`MultipartForm`, `PlayerUpdate`) so tests can
// inspect the exact shape of an outbound submission.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::photo::ImageFile;
use crate::session::SessionContext;

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// The `{status, msg, data}` envelope every league endpoint answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    #[serde(default)]
    pub msg: String,
    /// A missing `data` field reads as `None`; no `T: Default` is required.
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn message(&self) -> Option<&str> {
        let msg = self.msg.trim();
        (!msg.is_empty()).then_some(msg)
    }
}

/// Acknowledgement of a write, carrying the server's message when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Domain payloads
// ---------------------------------------------------------------------------

/// The season an invitation code grants access to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonRef {
    pub id: String,
    pub name: Option<String>,
}

impl SeasonRef {
    /// Extract the season from a validation response's `data`.
    ///
    /// The server sends either `{season: "<id>"}`, `{season: {_id, name}}`,
    /// or the season object itself.
    pub fn from_payload(data: &Value) -> Option<SeasonRef> {
        let season = data.get("season").unwrap_or(data);
        match season {
            Value::String(id) if !id.is_empty() => Some(SeasonRef {
                id: id.clone(),
                name: None,
            }),
            Value::Object(obj) => {
                let id = obj.get("_id").or_else(|| obj.get("id"))?.as_str()?;
                Some(SeasonRef {
                    id: id.to_string(),
                    name: obj.get("name").and_then(Value::as_str).map(str::to_string),
                })
            }
            _ => None,
        }
    }
}

/// A previously saved player, as returned by `GET /players/team/{teamId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingPlayer {
    #[serde(rename = "_id")]
    pub id: String,
    pub fullname: String,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub jersey: Option<i32>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(rename = "isLider", default)]
    pub is_lider: bool,
}

impl ExistingPlayer {
    /// Birth date parsed from the wire, accepting full ISO date-times and
    /// bare `YYYY-MM-DD` dates.
    pub fn birth_date(&self) -> Option<NaiveDate> {
        let raw = self.birthday.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.date_naive())
            .ok()
            .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
    }
}

/// Server id of a player created through `POST /players`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPlayer {
    pub id: String,
}

/// JSON body of `PATCH /players/{id}`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jersey: Option<i32>,
}

// ---------------------------------------------------------------------------
// Multipart shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file: ImageFile },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

/// Ordered multipart body. The transport adapter turns it into a real
/// `multipart/form-data` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: ImageFile) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file,
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<FormPart> {
        self.parts
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn file_part(&self, name: &str) -> Option<&ImageFile> {
        self.parts.iter().find_map(|p| match p {
            FormPart::File { name: n, file } if n == name => Some(file),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// LeagueApi trait
// ---------------------------------------------------------------------------

/// Remote operations the registration flow depends on.
///
/// Every call takes the session explicitly; implementations must not reach
/// for ambient token storage.
#[async_trait]
pub trait LeagueApi: Send + Sync {
    /// `POST /invitation/validate` with `{code}`.
    async fn validate_invitation(
        &self,
        session: &SessionContext,
        code: &str,
    ) -> Result<SeasonRef, ApiError>;

    /// `POST /teams` with the full create-team multipart body.
    async fn create_team(
        &self,
        session: &SessionContext,
        form: MultipartForm,
    ) -> Result<Ack, ApiError>;

    /// `POST /players` with one player's multipart body.
    async fn create_player(
        &self,
        session: &SessionContext,
        form: MultipartForm,
    ) -> Result<CreatedPlayer, ApiError>;

    /// `PATCH /players/{id}` with a JSON body.
    async fn update_player(
        &self,
        session: &SessionContext,
        player_id: &str,
        update: &PlayerUpdate,
    ) -> Result<(), ApiError>;

    /// `GET /players/team/{teamId}`.
    async fn players_by_team(
        &self,
        session: &SessionContext,
        team_id: &str,
    ) -> Result<Vec<ExistingPlayer>, ApiError>;

    /// `POST /teams/{teamId}/season` with `{code}`.
    async fn add_team_to_season(
        &self,
        session: &SessionContext,
        team_id: &str,
        code: &str,
    ) -> Result<Ack, ApiError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn season_from_plain_id() {
        let season = SeasonRef::from_payload(&json!({"season": "s-1"})).unwrap();
        assert_eq!(season.id, "s-1");
        assert_eq!(season.name, None);
    }

    #[test]
    fn season_from_nested_object() {
        let data = json!({"season": {"_id": "s-2", "name": "Apertura 2026"}, "code": "X"});
        let season = SeasonRef::from_payload(&data).unwrap();
        assert_eq!(season.id, "s-2");
        assert_eq!(season.name.as_deref(), Some("Apertura 2026"));
    }

    #[test]
    fn season_from_bare_object() {
        let season = SeasonRef::from_payload(&json!({"_id": "s-3"})).unwrap();
        assert_eq!(season.id, "s-3");
    }

    #[test]
    fn season_missing_is_none() {
        assert!(SeasonRef::from_payload(&json!({"season": null})).is_none());
        assert!(SeasonRef::from_payload(&json!({"season": ""})).is_none());
    }

    #[test]
    fn existing_player_deserializes_wire_names() {
        let player: ExistingPlayer = serde_json::from_value(json!({
            "_id": "p1",
            "fullname": "Ana Pérez",
            "birthday": "2001-04-05T00:00:00.000Z",
            "jersey": 10,
            "picture": "ana.png",
            "isLider": true
        }))
        .unwrap();
        assert_eq!(player.id, "p1");
        assert!(player.is_lider);
        assert_eq!(player.birth_date(), NaiveDate::from_ymd_opt(2001, 4, 5));
    }

    #[test]
    fn birth_date_accepts_plain_dates_and_rejects_garbage() {
        let mut player = ExistingPlayer {
            id: "p".into(),
            fullname: "X".into(),
            birthday: Some("1999-12-31".into()),
            jersey: None,
            picture: None,
            is_lider: false,
        };
        assert_eq!(player.birth_date(), NaiveDate::from_ymd_opt(1999, 12, 31));
        player.birthday = Some("not a date".into());
        assert_eq!(player.birth_date(), None);
    }

    #[test]
    fn player_update_skips_unset_fields() {
        let update = PlayerUpdate {
            jersey: Some(7),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"jersey": 7}));
    }

    #[test]
    fn envelope_message_trims_blank() {
        let resp: ApiResponse<Value> =
            serde_json::from_value(json!({"status": "error", "msg": "  ", "data": null})).unwrap();
        assert_eq!(resp.status, ResponseStatus::Error);
        assert_eq!(resp.message(), None);
        assert!(resp.data.is_none());
    }

    /// Payload type without a `Default` impl.
    #[derive(Debug, Deserialize, PartialEq)]
    struct SeasonOnly {
        season: String,
    }

    fn decode<T: serde::de::DeserializeOwned>(body: Value) -> ApiResponse<T> {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn envelope_decodes_payloads_without_default() {
        let resp: ApiResponse<SeasonOnly> = decode(json!({"status": "success", "data": {"season": "s-1"}}));
        assert_eq!(
            resp.data,
            Some(SeasonOnly {
                season: "s-1".into()
            })
        );

        let resp: ApiResponse<SeasonOnly> = decode(json!({"status": "success"}));
        assert!(resp.data.is_none());
        assert_eq!(resp.msg, "");
    }
}
