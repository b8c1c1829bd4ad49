// RegistrationForm: the hosting view's handle on one registration flow.
//
// Ties the invitation gate, the roster builder, photo attachments, and the
// submission assembler together, and owns their lifetime. Dropping the form
// aborts every preview decode still running; dropping a pending `submit`
// future cancels its requests and releases the submission latch.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{Ack, LeagueApi};
use crate::config::RegistrationConfig;
use crate::error::RegistrationError;
use crate::invitation::InvitationGate;
use crate::outcome::{Outcome, ResultHandler};
use crate::photo::{ChosenFile, PhotoAttachmentManager, Preview};
use crate::roster::{PhotoTicket, RosterBuilder, SlotId, SlotUpdate};
use crate::session::SessionContext;
use crate::submission::{RosterUpdateReport, SubmissionAssembler};
use crate::team::TeamDraft;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    /// Register a brand-new team with its roster in one request.
    CreateTeam,
    /// Edit the roster of an already registered team.
    EditRoster { team_id: String },
}

/// Successful result of [`RegistrationForm::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submitted {
    TeamCreated(Ack),
    RosterUpdated(RosterUpdateReport),
}

pub struct RegistrationForm {
    mode: FormMode,
    gate: Option<InvitationGate>,
    team: TeamDraft,
    roster: RosterBuilder,
    photos: PhotoAttachmentManager,
    assembler: SubmissionAssembler,
    results: ResultHandler,
    api: Arc<dyn LeagueApi>,
    session: SessionContext,
}

impl RegistrationForm {
    fn build(
        config: &RegistrationConfig,
        api: Arc<dyn LeagueApi>,
        session: SessionContext,
        mode: FormMode,
        gate: Option<InvitationGate>,
        roster: RosterBuilder,
    ) -> Self {
        RegistrationForm {
            mode,
            gate,
            team: TeamDraft::default(),
            roster,
            photos: PhotoAttachmentManager::new(),
            assembler: SubmissionAssembler::new(Arc::clone(&api), session.clone()),
            results: ResultHandler::new(config.invitation.redirect_delay()),
            api,
            session,
        }
    }

    /// Create-team flow without an invitation gate.
    pub fn new_team(
        config: &RegistrationConfig,
        api: Arc<dyn LeagueApi>,
        session: SessionContext,
    ) -> Self {
        let roster = RosterBuilder::new(config.roster.clone());
        Self::build(config, api, session, FormMode::CreateTeam, None, roster)
    }

    /// Create-team flow gated by an invitation code. The form stays locked
    /// until [`RegistrationForm::open`] validates the code.
    pub fn new_team_with_invitation(
        config: &RegistrationConfig,
        api: Arc<dyn LeagueApi>,
        session: SessionContext,
        code: Option<String>,
    ) -> Self {
        let gate = InvitationGate::new(code, &config.invitation);
        let roster = RosterBuilder::new(config.roster.clone());
        Self::build(config, api, session, FormMode::CreateTeam, Some(gate), roster)
    }

    /// Edit flow: fetch the team's saved players and hydrate the roster.
    pub async fn edit_team(
        config: &RegistrationConfig,
        api: Arc<dyn LeagueApi>,
        session: SessionContext,
        team_id: impl Into<String>,
    ) -> Result<Self, RegistrationError> {
        let team_id = team_id.into();
        let players = api.players_by_team(&session, &team_id).await.map_err(|e| {
            warn!(%team_id, "failed to load players: {e}");
            RegistrationError::Network(e)
        })?;
        info!(%team_id, players = players.len(), "loaded saved roster");

        let roster = RosterBuilder::hydrate(config.roster.clone(), &players);
        let mode = FormMode::EditRoster { team_id };
        Ok(Self::build(config, api, session, mode, None, roster))
    }

    // -----------------------------------------------------------------------
    // Gate
    // -----------------------------------------------------------------------

    /// Validate the invitation code if this form is gated.
    ///
    /// Returns the outcome to show when the gate closed (including the
    /// delayed redirect), or `None` when the form is usable.
    pub async fn open(&mut self) -> Option<Outcome> {
        let gate = self.gate.as_mut()?;
        gate.validate(self.api.as_ref(), &self.session).await;
        gate.error()
            .map(|e| self.results.failure(&RegistrationError::Invitation(e)))
    }

    pub fn gate(&self) -> Option<&InvitationGate> {
        self.gate.as_ref()
    }

    /// Ungated forms are always usable; gated ones only once the code
    /// validated.
    pub fn is_usable(&self) -> bool {
        self.gate.as_ref().map_or(true, InvitationGate::is_unlocked)
    }

    fn ensure_usable(&self) -> Result<(), RegistrationError> {
        if self.is_usable() {
            Ok(())
        } else {
            Err(RegistrationError::GateLocked)
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn roster(&self) -> &RosterBuilder {
        &self.roster
    }

    pub fn team(&self) -> &TeamDraft {
        &self.team
    }

    pub fn results(&self) -> &ResultHandler {
        &self.results
    }

    pub fn is_submitting(&self) -> bool {
        self.assembler.is_submitting()
    }

    pub fn pending_previews(&self) -> usize {
        self.photos.pending()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn set_team_name(&mut self, name: impl Into<String>) -> Result<(), RegistrationError> {
        self.ensure_usable()?;
        self.team.name = name.into();
        Ok(())
    }

    pub fn set_availability(
        &mut self,
        days: impl IntoIterator<Item = crate::team::AvailabilityDay>,
    ) -> Result<(), RegistrationError> {
        self.ensure_usable()?;
        self.team.availability_days = days.into_iter().collect();
        Ok(())
    }

    pub fn set_logo(&mut self, file: ChosenFile) -> Result<Preview, RegistrationError> {
        self.ensure_usable()?;
        Ok(self.team.set_logo(file)?)
    }

    pub fn add_player(&mut self) -> Result<SlotId, RegistrationError> {
        self.ensure_usable()?;
        Ok(self.roster.add_slot()?)
    }

    /// Remove a player and cancel its pending preview decode.
    pub fn remove_player(&mut self, index: usize) -> Result<(), RegistrationError> {
        self.ensure_usable()?;
        let removed = self.roster.remove_slot(index)?;
        self.photos.cancel(removed.id);
        Ok(())
    }

    pub fn update_player(&mut self, index: usize, update: SlotUpdate) -> Result<(), RegistrationError> {
        self.ensure_usable()?;
        Ok(self.roster.update_slot(index, update)?)
    }

    pub fn set_captain(&mut self, index: usize) -> Result<(), RegistrationError> {
        self.ensure_usable()?;
        Ok(self.roster.set_captain(index)?)
    }

    pub fn select_player(&mut self, index: usize) -> Result<(), RegistrationError> {
        Ok(self.roster.select_slot(index)?)
    }

    pub fn deselect_player(&mut self) {
        self.roster.deselect();
    }

    pub fn select_photo(&mut self, index: usize, file: ChosenFile) -> Result<PhotoTicket, RegistrationError> {
        self.ensure_usable()?;
        Ok(self.photos.select_photo(&mut self.roster, index, file)?)
    }

    /// Apply preview completions that already arrived.
    pub fn poll_previews(&mut self) -> usize {
        self.photos.drain_ready(&mut self.roster)
    }

    /// Wait for all outstanding preview decodes.
    pub async fn settle_previews(&mut self) {
        self.photos.settle(&mut self.roster).await;
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    pub async fn submit(&mut self) -> Result<Submitted, RegistrationError> {
        match &self.mode {
            FormMode::CreateTeam => self
                .assembler
                .submit_new_team(self.gate.as_ref(), &self.team, &mut self.roster)
                .await
                .map(Submitted::TeamCreated),
            FormMode::EditRoster { team_id } => self
                .assembler
                .submit_roster_update(team_id, &mut self.roster)
                .await
                .map(Submitted::RosterUpdated),
        }
    }

    /// Submit and translate the result into a notice plus navigation.
    pub async fn submit_for_outcome(&mut self) -> Outcome {
        match self.submit().await {
            Ok(Submitted::TeamCreated(ack)) => self.results.team_created(&ack),
            Ok(Submitted::RosterUpdated(report)) => self.results.roster_updated(&report),
            Err(e) => self.results.failure(&e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CreatedPlayer, ExistingPlayer, MultipartForm, PlayerUpdate, SeasonRef};
    use crate::error::ApiError;
    use async_trait::async_trait;

    /// Refuses every call; these tests never reach the network.
    struct Offline;

    #[async_trait]
    impl LeagueApi for Offline {
        async fn validate_invitation(&self, _: &SessionContext, _: &str) -> Result<SeasonRef, ApiError> {
            Err(ApiError::Transport("offline".into()))
        }
        async fn create_team(&self, _: &SessionContext, _: MultipartForm) -> Result<Ack, ApiError> {
            Err(ApiError::Transport("offline".into()))
        }
        async fn create_player(&self, _: &SessionContext, _: MultipartForm) -> Result<CreatedPlayer, ApiError> {
            Err(ApiError::Transport("offline".into()))
        }
        async fn update_player(&self, _: &SessionContext, _: &str, _: &PlayerUpdate) -> Result<(), ApiError> {
            Err(ApiError::Transport("offline".into()))
        }
        async fn players_by_team(&self, _: &SessionContext, _: &str) -> Result<Vec<ExistingPlayer>, ApiError> {
            Err(ApiError::Transport("offline".into()))
        }
        async fn add_team_to_season(&self, _: &SessionContext, _: &str, _: &str) -> Result<Ack, ApiError> {
            Err(ApiError::Transport("offline".into()))
        }
    }

    fn config() -> RegistrationConfig {
        RegistrationConfig::default()
    }

    #[test]
    fn ungated_form_is_usable() {
        let mut form = RegistrationForm::new_team(&config(), Arc::new(Offline), SessionContext::anonymous());
        assert!(form.is_usable());
        assert!(form.add_player().is_ok());
        assert_eq!(form.mode(), &FormMode::CreateTeam);
    }

    #[test]
    fn gated_form_is_locked_before_open() {
        let mut form = RegistrationForm::new_team_with_invitation(
            &config(),
            Arc::new(Offline),
            SessionContext::anonymous(),
            Some("VALID123".into()),
        );
        assert!(!form.is_usable());
        assert!(matches!(form.add_player(), Err(RegistrationError::GateLocked)));
        assert!(form.roster().is_empty());
    }

    #[tokio::test]
    async fn failed_gate_returns_redirect_outcome() {
        let mut form = RegistrationForm::new_team_with_invitation(
            &config(),
            Arc::new(Offline),
            SessionContext::anonymous(),
            Some("VALID123".into()),
        );
        let outcome = form.open().await.unwrap();
        assert!(matches!(
            outcome.navigation,
            crate::outcome::Navigation::RedirectAfter { .. }
        ));
        assert!(!form.is_usable());
    }

    #[tokio::test]
    async fn edit_flow_surfaces_load_failure() {
        let err = RegistrationForm::edit_team(&config(), Arc::new(Offline), SessionContext::anonymous(), "t1")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RegistrationError::Network(_)));
    }

    #[tokio::test]
    async fn removing_a_player_cancels_its_decode() {
        let mut form = RegistrationForm::new_team(&config(), Arc::new(Offline), SessionContext::anonymous());
        form.add_player().unwrap();
        form.select_photo(0, ChosenFile::new("a.png", "image/png", vec![1])).unwrap();
        assert_eq!(form.pending_previews(), 1);
        form.remove_player(0).unwrap();
        assert_eq!(form.pending_previews(), 0);
    }

    #[tokio::test]
    async fn capacity_maps_to_warning() {
        let mut form = RegistrationForm::new_team(&config(), Arc::new(Offline), SessionContext::anonymous());
        for _ in 0..12 {
            form.add_player().unwrap();
        }
        let err = form.add_player().unwrap_err();
        let outcome = form.results().failure(&err);
        assert_eq!(
            outcome.notice.unwrap().level,
            crate::outcome::NoticeLevel::Warning
        );
    }
}
