// Submission: exhaustive re-validation, payload assembly, and dispatch.
//
// Create mode sends the whole team in one multipart request. Edit mode sends
// one request per slot concurrently and reports, slot by slot, which records
// were committed and which failed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, SecondsFormat};
use futures_util::future::join_all;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::{Ack, LeagueApi, MultipartForm, PlayerUpdate};
use crate::error::{ApiError, RegistrationError};
use crate::invitation::InvitationGate;
use crate::roster::{RosterBuilder, RosterSlot, SlotId};
use crate::session::SessionContext;
use crate::team::TeamDraft;
use crate::validation::{team_issues, ValidationReport};

// ---------------------------------------------------------------------------
// Submission latch
// ---------------------------------------------------------------------------

/// Re-entrancy guard: at most one submission in flight per form.
#[derive(Debug, Clone, Default)]
pub struct SubmissionLatch {
    in_flight: Arc<AtomicBool>,
}

/// Releases the latch when dropped, whatever way the submission settled.
#[derive(Debug)]
pub struct SubmissionGuard {
    in_flight: Arc<AtomicBool>,
}

impl SubmissionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<SubmissionGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmissionGuard {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

/// Birth date as an ISO date-time at UTC midnight, e.g.
/// `2001-04-05T00:00:00.000Z`.
pub fn iso_birthday(date: NaiveDate) -> String {
    date.and_time(NaiveTime::default())
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Part name carrying the photo of the player at `index` in create mode.
pub fn player_photo_part(index: usize) -> String {
    format!("playerPhoto{index}")
}

fn player_entry(slot: &RosterSlot, is_lider: bool) -> Value {
    json!({
        "fullname": slot.full_name.trim(),
        "birthday": slot.birth_date.map(iso_birthday),
        "jersey": slot.jersey_number,
        // Photos travel as separate file parts.
        "picture": "",
        "isLider": is_lider,
    })
}

/// Assemble the single multipart body for a new team.
pub fn build_create_form(team: &TeamDraft, roster: &RosterBuilder, code: Option<&str>) -> MultipartForm {
    let days = Value::Array(
        team.days()
            .into_iter()
            .map(|d| Value::from(d.label()))
            .collect(),
    );
    let players = Value::Array(
        roster
            .slots()
            .iter()
            .enumerate()
            .map(|(i, slot)| player_entry(slot, roster.captain() == Some(i)))
            .collect(),
    );

    let mut form = MultipartForm::new()
        .text("name", team.trimmed_name())
        .text("availabilityDays", days.to_string());
    if let Some(code) = code {
        form = form.text("code", code);
    }
    if let Some(logo) = &team.logo {
        form = form.file("logo", logo.clone());
    }
    form = form.text("players", players.to_string());

    for (i, slot) in roster.slots().iter().enumerate() {
        if let Some(photo) = &slot.photo {
            form = form.file(player_photo_part(i), photo.clone());
        }
    }
    form
}

/// What one edit-mode request does.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerRequestKind {
    Update { player_id: String, update: PlayerUpdate },
    Create { form: MultipartForm },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRequest {
    pub slot: SlotId,
    pub index: usize,
    pub name: String,
    pub kind: PlayerRequestKind,
}

/// One request per slot: updates for saved players, creates for new ones.
pub fn build_player_requests(team_id: &str, roster: &RosterBuilder) -> Vec<PlayerRequest> {
    roster
        .slots()
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let fullname = slot.full_name.trim().to_string();
            let birthday = slot.birth_date.map(iso_birthday);
            let kind = match &slot.existing_id {
                Some(player_id) => PlayerRequestKind::Update {
                    player_id: player_id.clone(),
                    update: PlayerUpdate {
                        fullname: Some(fullname),
                        birthday,
                        jersey: slot.jersey_number,
                    },
                },
                None => {
                    let mut form = MultipartForm::new()
                        .text("fullname", fullname)
                        .text("birthday", birthday.unwrap_or_default())
                        .text(
                            "jersey",
                            slot.jersey_number.map(|n| n.to_string()).unwrap_or_default(),
                        )
                        .text("teamId", team_id);
                    if let Some(photo) = &slot.photo {
                        form = form.file("picture", photo.clone());
                    }
                    PlayerRequestKind::Create { form }
                }
            };
            PlayerRequest {
                slot: slot.id,
                index,
                name: slot.display_name(index),
                kind,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Edit-mode report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Created,
    Updated,
}

/// Settled result of one edit-mode request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerOutcome {
    pub slot: SlotId,
    pub index: usize,
    pub name: String,
    pub action: PlayerAction,
    /// On success, the server id of the player.
    pub result: Result<String, ApiError>,
}

impl PlayerOutcome {
    pub fn is_committed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-slot account of an edit-mode submission, in roster order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterUpdateReport {
    pub outcomes: Vec<PlayerOutcome>,
}

impl RosterUpdateReport {
    pub fn committed(&self) -> impl Iterator<Item = &PlayerOutcome> {
        self.outcomes.iter().filter(|o| o.is_committed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PlayerOutcome> {
        self.outcomes.iter().filter(|o| !o.is_committed())
    }

    pub fn committed_count(&self) -> usize {
        self.committed().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }
}

// ---------------------------------------------------------------------------
// SubmissionAssembler
// ---------------------------------------------------------------------------

pub struct SubmissionAssembler {
    api: Arc<dyn LeagueApi>,
    session: SessionContext,
    latch: SubmissionLatch,
}

impl SubmissionAssembler {
    pub fn new(api: Arc<dyn LeagueApi>, session: SessionContext) -> Self {
        SubmissionAssembler {
            api,
            session,
            latch: SubmissionLatch::new(),
        }
    }

    pub fn latch(&self) -> &SubmissionLatch {
        &self.latch
    }

    pub fn is_submitting(&self) -> bool {
        self.latch.is_in_flight()
    }

    /// Create mode: validate everything and send the team in one request.
    ///
    /// When `gate` is given it must be unlocked, and its code travels with
    /// the payload.
    pub async fn submit_new_team(
        &self,
        gate: Option<&InvitationGate>,
        team: &TeamDraft,
        roster: &mut RosterBuilder,
    ) -> Result<Ack, RegistrationError> {
        let _guard = self
            .latch
            .try_acquire()
            .ok_or(RegistrationError::SubmissionInFlight)?;

        if gate.is_some_and(|g| !g.is_unlocked()) {
            return Err(RegistrationError::GateLocked);
        }

        let mut issues = team_issues(team);
        if let Err(report) = roster.validate() {
            issues.extend(report.issues);
        }
        if !issues.is_empty() {
            let report = ValidationReport::new(issues);
            warn!(issues = report.issues.len(), "create-team submission blocked by validation");
            return Err(RegistrationError::Validation(report));
        }

        let form = build_create_form(team, roster, gate.and_then(InvitationGate::code));
        info!(
            team = team.trimmed_name(),
            players = roster.len(),
            "submitting new team"
        );

        match self.api.create_team(&self.session, form).await {
            Ok(ack) => {
                info!(team = team.trimmed_name(), "team registered");
                Ok(ack)
            }
            Err(e) => {
                warn!(team = team.trimmed_name(), "team registration failed: {e}");
                Err(RegistrationError::Network(e))
            }
        }
    }

    /// Edit mode: validate, then issue one request per slot concurrently and
    /// wait for all of them.
    ///
    /// Players created successfully get their server id written back into
    /// the roster so a retry after a partial failure does not duplicate them.
    pub async fn submit_roster_update(
        &self,
        team_id: &str,
        roster: &mut RosterBuilder,
    ) -> Result<RosterUpdateReport, RegistrationError> {
        let _guard = self
            .latch
            .try_acquire()
            .ok_or(RegistrationError::SubmissionInFlight)?;

        if let Err(report) = roster.validate() {
            warn!(issues = report.issues.len(), "roster update blocked by validation");
            return Err(RegistrationError::Validation(report));
        }

        let requests = build_player_requests(team_id, roster);
        info!(team_id, requests = requests.len(), "submitting roster update");

        let api = &self.api;
        let session = &self.session;
        let outcomes: Vec<PlayerOutcome> = join_all(requests.into_iter().map(|req| async move {
            let (action, result) = match req.kind {
                PlayerRequestKind::Update { player_id, update } => {
                    let result = api
                        .update_player(session, &player_id, &update)
                        .await
                        .map(|()| player_id);
                    (PlayerAction::Updated, result)
                }
                PlayerRequestKind::Create { form } => {
                    let result = api.create_player(session, form).await.map(|p| p.id);
                    (PlayerAction::Created, result)
                }
            };
            PlayerOutcome {
                slot: req.slot,
                index: req.index,
                name: req.name,
                action,
                result,
            }
        }))
        .await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(player_id) => {
                    if outcome.action == PlayerAction::Created {
                        roster.mark_committed(outcome.slot, player_id.clone());
                    }
                }
                Err(e) => warn!(slot = %outcome.slot, player = %outcome.name, "player request failed: {e}"),
            }
        }

        let report = RosterUpdateReport { outcomes };
        if report.is_complete() {
            info!(team_id, players = report.outcomes.len(), "roster updated");
            Ok(report)
        } else {
            warn!(
                team_id,
                failed = report.failed_count(),
                committed = report.committed_count(),
                "roster update partially failed"
            );
            Err(RegistrationError::PartialRoster(report))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
