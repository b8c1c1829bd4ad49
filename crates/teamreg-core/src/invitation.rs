// Invitation gate: a season-invitation code must validate before the roster
// form unlocks. Also hosts the join-season request for existing teams.

use std::time::Duration;

use tracing::{info, warn};

use crate::api::{Ack, LeagueApi, SeasonRef};
use crate::config::InvitationConfig;
use crate::error::{ApiError, InvitationError, RegistrationError};
use crate::session::SessionContext;

pub const MISSING_CODE_MESSAGE: &str = "Se requiere un código de invitación para registrar un equipo.";
pub const REJECTED_CODE_MESSAGE: &str = "El código de invitación no es válido o ha expirado.";

/// Gate lifecycle. `Valid` and `Invalid` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Validating,
    Valid { season: SeasonRef },
    Invalid { message: String },
}

impl GateState {
    pub fn is_settled(&self) -> bool {
        matches!(self, GateState::Valid { .. } | GateState::Invalid { .. })
    }
}

#[derive(Debug, Clone)]
pub struct InvitationGate {
    code: Option<String>,
    state: GateState,
    redirect_delay: Duration,
    missing: bool,
}

impl InvitationGate {
    /// Create a gate for a code supplied from outside the form (e.g. a
    /// navigation parameter). Blank codes count as absent.
    pub fn new(code: Option<String>, config: &InvitationConfig) -> Self {
        let code = code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        InvitationGate {
            code,
            state: GateState::Idle,
            redirect_delay: config.redirect_delay(),
            missing: false,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// True once the code validated; the roster form is usable only then.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, GateState::Valid { .. })
    }

    pub fn season(&self) -> Option<&SeasonRef> {
        match &self.state {
            GateState::Valid { season } => Some(season),
            _ => None,
        }
    }

    /// How long the caller should wait before redirecting away. Only set
    /// when the gate ended `Invalid`.
    pub fn redirect_delay(&self) -> Option<Duration> {
        matches!(self.state, GateState::Invalid { .. }).then_some(self.redirect_delay)
    }

    /// The failure as an error value, if the gate ended `Invalid`.
    pub fn error(&self) -> Option<InvitationError> {
        match &self.state {
            GateState::Invalid { .. } if self.missing => Some(InvitationError::Missing),
            GateState::Invalid { message } => Some(InvitationError::Rejected {
                message: message.clone(),
            }),
            _ => None,
        }
    }

    /// Leave `Idle`. Returns the code to validate remotely, or `None` when no
    /// call is needed: the code was absent (gate is now `Invalid`) or the
    /// gate already left `Idle`.
    pub fn begin(&mut self) -> Option<String> {
        if self.state != GateState::Idle {
            return None;
        }
        match &self.code {
            None => {
                warn!("no invitation code supplied, gate closed");
                self.missing = true;
                self.state = GateState::Invalid {
                    message: MISSING_CODE_MESSAGE.to_string(),
                };
                None
            }
            Some(code) => {
                self.state = GateState::Validating;
                Some(code.clone())
            }
        }
    }

    /// Settle a `Validating` gate with the remote result. Has no effect in
    /// any other state.
    pub fn resolve(&mut self, result: Result<SeasonRef, ApiError>) -> &GateState {
        if self.state != GateState::Validating {
            return &self.state;
        }
        self.state = match result {
            Ok(season) => {
                info!(season = %season.id, "invitation code accepted");
                GateState::Valid { season }
            }
            Err(e) => {
                warn!("invitation code rejected: {e}");
                GateState::Invalid {
                    message: e
                        .server_message()
                        .unwrap_or(REJECTED_CODE_MESSAGE)
                        .to_string(),
                }
            }
        };
        &self.state
    }

    /// Run the whole transition: `begin`, the remote call if one is needed,
    /// and `resolve`. Calling it on a settled gate returns the settled state
    /// without touching the network.
    pub async fn validate(&mut self, api: &dyn LeagueApi, session: &SessionContext) -> &GateState {
        if let Some(code) = self.begin() {
            let result = api.validate_invitation(session, &code).await;
            self.resolve(result);
        }
        &self.state
    }
}

// ---------------------------------------------------------------------------
// Join season
// ---------------------------------------------------------------------------

/// Trim a typed code and check its length locally.
pub fn normalize_code(raw: &str, min_len: usize) -> Result<String, InvitationError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(InvitationError::Missing);
    }
    if code.chars().count() < min_len {
        return Err(InvitationError::TooShort { min: min_len });
    }
    Ok(code.to_string())
}

/// Enroll an existing team into a season by invitation code.
///
/// Local code problems never reach the network.
pub async fn join_season(
    api: &dyn LeagueApi,
    session: &SessionContext,
    team_id: &str,
    raw_code: &str,
    config: &InvitationConfig,
) -> Result<Ack, RegistrationError> {
    let code = normalize_code(raw_code, config.min_code_length)?;
    info!(team_id, "joining season with invitation code");
    match api.add_team_to_season(session, team_id, &code).await {
        Ok(ack) => Ok(ack),
        Err(e) => {
            warn!(team_id, "join season failed: {e}");
            Err(RegistrationError::Network(e))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(code: Option<&str>) -> InvitationGate {
        InvitationGate::new(code.map(str::to_string), &InvitationConfig::default())
    }

    fn season() -> SeasonRef {
        SeasonRef {
            id: "s-1".into(),
            name: None,
        }
    }

    #[test]
    fn empty_code_goes_straight_to_invalid() {
        for code in [None, Some(""), Some("   ")] {
            let mut g = gate(code);
            assert_eq!(g.begin(), None);
            assert!(matches!(g.state(), GateState::Invalid { .. }));
            assert_eq!(g.error(), Some(InvitationError::Missing));
            assert_eq!(g.redirect_delay(), Some(Duration::from_secs(2)));
            assert!(!g.is_unlocked());
        }
    }

    #[test]
    fn begin_moves_to_validating_with_trimmed_code() {
        let mut g = gate(Some("  VALID123 "));
        assert_eq!(g.begin().as_deref(), Some("VALID123"));
        assert_eq!(g.state(), &GateState::Validating);
        // A second begin does not start another call.
        assert_eq!(g.begin(), None);
        assert_eq!(g.redirect_delay(), None);
    }

    #[test]
    fn success_unlocks() {
        let mut g = gate(Some("VALID123"));
        g.begin();
        g.resolve(Ok(season()));
        assert!(g.is_unlocked());
        assert_eq!(g.season(), Some(&season()));
        assert_eq!(g.redirect_delay(), None);
        assert_eq!(g.error(), None);
    }

    #[test]
    fn failure_carries_server_message() {
        let mut g = gate(Some("OLD"));
        g.begin();
        g.resolve(Err(ApiError::Rejected {
            status: 404,
            message: Some("Invitación expirada".into()),
        }));
        assert_eq!(
            g.state(),
            &GateState::Invalid {
                message: "Invitación expirada".into()
            }
        );
        assert_eq!(
            g.error(),
            Some(InvitationError::Rejected {
                message: "Invitación expirada".into()
            })
        );
    }

    #[test]
    fn failure_without_message_uses_default() {
        let mut g = gate(Some("OLD"));
        g.begin();
        g.resolve(Err(ApiError::Transport("connection reset".into())));
        assert_eq!(
            g.state(),
            &GateState::Invalid {
                message: REJECTED_CODE_MESSAGE.into()
            }
        );
    }

    #[test]
    fn settled_states_are_terminal() {
        let mut g = gate(Some("VALID123"));
        g.begin();
        g.resolve(Ok(season()));
        g.resolve(Err(ApiError::Timeout));
        assert!(g.is_unlocked());

        // Resolving an idle gate does nothing either.
        let mut idle = gate(Some("X"));
        idle.resolve(Ok(season()));
        assert_eq!(idle.state(), &GateState::Idle);
    }

    #[test]
    fn normalize_code_rules() {
        assert_eq!(normalize_code("  ", 4), Err(InvitationError::Missing));
        assert_eq!(normalize_code(" abc ", 4), Err(InvitationError::TooShort { min: 4 }));
        assert_eq!(normalize_code(" abcd ", 4).as_deref(), Ok("abcd"));
        // Length is counted in characters, not bytes.
        assert_eq!(normalize_code("ñññ", 3).as_deref(), Ok("ñññ"));
    }
}
