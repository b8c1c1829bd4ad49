// Maps registration results to what the user sees and where they go next.
// Rendering is the host's job; this only decides message and navigation.

use std::time::Duration;

use crate::api::Ack;
use crate::error::{InvitationError, PhotoError, RegistrationError, RosterError};
use crate::invitation::MISSING_CODE_MESSAGE;
use crate::submission::RosterUpdateReport;

pub const TEAM_REGISTERED: &str = "Equipo registrado correctamente";
pub const ROSTER_UPDATED: &str = "Plantilla actualizada correctamente";
pub const SEASON_JOINED: &str = "Equipo inscrito a la temporada correctamente";
pub const NETWORK_FAILED: &str = "Ocurrió un error, por favor intenta de nuevo.";
pub const JOIN_SEASON_FAILED: &str = "Error al agregar el equipo a la temporada";
pub const GATE_LOCKED: &str = "Valida tu código de invitación antes de registrar el equipo.";
pub const INVALID_IMAGE: &str = "Por favor selecciona una imagen válida.";
pub const MISSING_PLAYER: &str = "El jugador seleccionado ya no existe.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Notice {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    MyTeams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    Go(Route),
    /// Navigate after a delay so the notice can be read first.
    RedirectAfter { route: Route, delay: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// `None` leaves whatever is on screen untouched.
    pub notice: Option<Notice>,
    pub navigation: Navigation,
}

/// Stateless mapping from results to outcomes. Holds the redirect delay used
/// for invitation failures.
#[derive(Debug, Clone, Copy)]
pub struct ResultHandler {
    redirect_delay: Duration,
}

impl ResultHandler {
    pub fn new(redirect_delay: Duration) -> Self {
        ResultHandler { redirect_delay }
    }

    pub fn team_created(&self, ack: &Ack) -> Outcome {
        Outcome {
            notice: Some(Notice::new(
                NoticeLevel::Success,
                ack.message.as_deref().unwrap_or(TEAM_REGISTERED),
            )),
            navigation: Navigation::Go(Route::MyTeams),
        }
    }

    pub fn roster_updated(&self, report: &RosterUpdateReport) -> Outcome {
        let message = if report.outcomes.is_empty() {
            ROSTER_UPDATED.to_string()
        } else {
            format!("Plantilla actualizada: {} jugadores guardados.", report.committed_count())
        };
        Outcome {
            notice: Some(Notice::new(NoticeLevel::Success, message)),
            navigation: Navigation::Go(Route::MyTeams),
        }
    }

    pub fn season_joined(&self, ack: &Ack) -> Outcome {
        Outcome {
            notice: Some(Notice::new(
                NoticeLevel::Success,
                ack.message.as_deref().unwrap_or(SEASON_JOINED),
            )),
            navigation: Navigation::Stay,
        }
    }

    /// Warning shown when a roster operation is refused, e.g. an add on a
    /// full roster.
    pub fn roster_rejected(&self, err: &RosterError) -> Outcome {
        Outcome {
            notice: Some(Notice::new(NoticeLevel::Warning, roster_text(err))),
            navigation: Navigation::Stay,
        }
    }

    pub fn failure(&self, err: &RegistrationError) -> Outcome {
        match err {
            RegistrationError::Validation(report) => Outcome {
                notice: Some(Notice::new(NoticeLevel::Error, report.summary.clone())),
                navigation: Navigation::Stay,
            },
            RegistrationError::Network(api) => Outcome {
                notice: Some(Notice::new(
                    NoticeLevel::Error,
                    api.server_message().unwrap_or(NETWORK_FAILED),
                )),
                navigation: Navigation::Stay,
            },
            RegistrationError::Invitation(inv) => self.invitation_failed(inv),
            RegistrationError::PartialRoster(report) => Outcome {
                notice: Some(Notice::new(NoticeLevel::Error, partial_message(report))),
                navigation: Navigation::Stay,
            },
            RegistrationError::SubmissionInFlight => Outcome {
                notice: None,
                navigation: Navigation::Stay,
            },
            RegistrationError::GateLocked => Outcome {
                notice: Some(Notice::new(NoticeLevel::Error, GATE_LOCKED)),
                navigation: Navigation::Stay,
            },
            RegistrationError::Photo(photo) => Outcome {
                notice: Some(Notice::new(NoticeLevel::Error, photo_text(photo))),
                navigation: Navigation::Stay,
            },
            RegistrationError::Roster(roster) => self.roster_rejected(roster),
        }
    }

    /// Join-season failures keep the dialog open instead of redirecting.
    pub fn join_season_failed(&self, err: &RegistrationError) -> Outcome {
        match err {
            RegistrationError::Network(api) => Outcome {
                notice: Some(Notice::new(
                    NoticeLevel::Error,
                    api.server_message().unwrap_or(JOIN_SEASON_FAILED),
                )),
                navigation: Navigation::Stay,
            },
            RegistrationError::Invitation(inv) => Outcome {
                notice: Some(Notice::new(NoticeLevel::Error, invitation_text(inv))),
                navigation: Navigation::Stay,
            },
            other => self.failure(other),
        }
    }

    fn invitation_failed(&self, err: &InvitationError) -> Outcome {
        Outcome {
            notice: Some(Notice::new(NoticeLevel::Error, invitation_text(err))),
            navigation: Navigation::RedirectAfter {
                route: Route::Home,
                delay: self.redirect_delay,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Notice texts
// ---------------------------------------------------------------------------
//
// Error `Display` strings are for logs. Users see these instead.

fn partial_message(report: &RosterUpdateReport) -> String {
    let failed: Vec<&str> = report.failed().map(|o| o.name.as_str()).collect();
    format!(
        "No se pudo guardar {}: {}. Se guardaron {} de {} jugadores.",
        if failed.len() == 1 { "1 jugador" } else { "algunos jugadores" },
        failed.join(", "),
        report.committed_count(),
        report.outcomes.len()
    )
}

fn invitation_text(err: &InvitationError) -> String {
    match err {
        InvitationError::Missing => MISSING_CODE_MESSAGE.to_string(),
        InvitationError::TooShort { min } => {
            format!("El código de invitación debe tener al menos {min} caracteres")
        }
        InvitationError::Rejected { message } => message.clone(),
    }
}

fn roster_text(err: &RosterError) -> String {
    match err {
        RosterError::CapacityReached { max } => format!("Un equipo puede tener como máximo {max} jugadores"),
        RosterError::IndexOutOfRange { .. } => MISSING_PLAYER.to_string(),
    }
}

fn photo_text(err: &PhotoError) -> String {
    match err {
        PhotoError::NotAnImage { .. } | PhotoError::Empty => INVALID_IMAGE.to_string(),
        PhotoError::Slot(roster) => roster_text(roster),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::roster::SlotId;
    use crate::submission::{PlayerAction, PlayerOutcome};
    use crate::validation::{Issue, ValidationReport};

    fn handler() -> ResultHandler {
        ResultHandler::new(Duration::from_secs(2))
    }

    fn outcome(id: u64, name: &str, ok: bool) -> PlayerOutcome {
        PlayerOutcome {
            slot: SlotId::new(id),
            index: id as usize,
            name: name.into(),
            action: PlayerAction::Updated,
            result: if ok {
                Ok(format!("p{id}"))
            } else {
                Err(ApiError::Transport("reset".into()))
            },
        }
    }

    #[test]
    fn created_uses_server_message_when_present() {
        let out = handler().team_created(&Ack {
            message: Some("Equipo creado".into()),
        });
        assert_eq!(out.notice.unwrap().message, "Equipo creado");
        assert_eq!(out.navigation, Navigation::Go(Route::MyTeams));

        let out = handler().team_created(&Ack::default());
        assert_eq!(out.notice.unwrap().message, TEAM_REGISTERED);
    }

    #[test]
    fn validation_failure_stays_with_summary() {
        let report = ValidationReport::new(vec![Issue {
            slot: Some(0),
            field: crate::validation::Field::FullName,
            reason: crate::validation::Reason::Required,
        }]);
        let out = handler().failure(&RegistrationError::Validation(report));
        let notice = out.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, crate::validation::SUMMARY_REQUIRED);
        assert_eq!(out.navigation, Navigation::Stay);
    }

    #[test]
    fn network_failure_falls_back_to_default() {
        let out = handler().failure(&RegistrationError::Network(ApiError::Timeout));
        assert_eq!(out.notice.unwrap().message, NETWORK_FAILED);

        let out = handler().failure(&RegistrationError::Network(ApiError::Rejected {
            status: 409,
            message: Some("Nombre de equipo duplicado".into()),
        }));
        assert_eq!(out.notice.unwrap().message, "Nombre de equipo duplicado");
    }

    #[test]
    fn invitation_failure_redirects_after_delay() {
        let out = handler().failure(&RegistrationError::Invitation(InvitationError::Missing));
        assert_eq!(
            out.navigation,
            Navigation::RedirectAfter {
                route: Route::Home,
                delay: Duration::from_secs(2)
            }
        );
        assert_eq!(out.notice.unwrap().message, MISSING_CODE_MESSAGE);
    }

    #[test]
    fn partial_failure_names_failed_players() {
        let report = RosterUpdateReport {
            outcomes: vec![outcome(0, "Ana", true), outcome(1, "Luz", false), outcome(2, "Eva", true)],
        };
        let out = handler().failure(&RegistrationError::PartialRoster(report));
        assert_eq!(
            out.notice.unwrap().message,
            "No se pudo guardar 1 jugador: Luz. Se guardaron 2 de 3 jugadores."
        );
    }

    #[test]
    fn missing_code_notice_matches_gate_message() {
        let gate_error = RegistrationError::Invitation(InvitationError::Missing);
        let opened = handler().failure(&gate_error).notice.unwrap().message;
        let joining = handler().join_season_failed(&gate_error).notice.unwrap().message;
        assert_eq!(opened, MISSING_CODE_MESSAGE);
        assert_eq!(joining, MISSING_CODE_MESSAGE);
    }

    #[test]
    fn locked_gate_notice() {
        let out = handler().failure(&RegistrationError::GateLocked);
        assert_eq!(out.notice.unwrap().message, GATE_LOCKED);
        assert_eq!(out.navigation, Navigation::Stay);
    }

    #[test]
    fn in_flight_is_silent() {
        let out = handler().failure(&RegistrationError::SubmissionInFlight);
        assert_eq!(out.notice, None);
        assert_eq!(out.navigation, Navigation::Stay);
    }

    #[test]
    fn capacity_warning() {
        let out = handler().roster_rejected(&RosterError::CapacityReached { max: 12 });
        let notice = out.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.message, "Un equipo puede tener como máximo 12 jugadores");
    }

    #[test]
    fn rejected_photo_is_an_error_notice() {
        let err = RegistrationError::Photo(crate::error::PhotoError::NotAnImage {
            declared_type: "text/plain".into(),
        });
        let notice = handler().failure(&err).notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, INVALID_IMAGE);

        let err = RegistrationError::Photo(crate::error::PhotoError::Slot(RosterError::IndexOutOfRange {
            index: 3,
            len: 1,
        }));
        assert_eq!(handler().failure(&err).notice.unwrap().message, MISSING_PLAYER);
    }

    #[test]
    fn join_season_failures_stay_open() {
        let out = handler().join_season_failed(&RegistrationError::Network(ApiError::Timeout));
        assert_eq!(out.notice.unwrap().message, JOIN_SEASON_FAILED);
        assert_eq!(out.navigation, Navigation::Stay);

        let out = handler().join_season_failed(&RegistrationError::Invitation(
            InvitationError::TooShort { min: 4 },
        ));
        assert_eq!(out.navigation, Navigation::Stay);
        assert_eq!(
            out.notice.unwrap().message,
            "El código de invitación debe tener al menos 4 caracteres"
        );
    }

    #[test]
    fn roster_updated_counts_saved_players() {
        let report = RosterUpdateReport {
            outcomes: vec![outcome(0, "Ana", true), outcome(1, "Luz", true)],
        };
        let out = handler().roster_updated(&report);
        assert_eq!(out.notice.unwrap().message, "Plantilla actualizada: 2 jugadores guardados.");
    }
}
