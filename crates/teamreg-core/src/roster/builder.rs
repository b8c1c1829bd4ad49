// RosterBuilder: the only owner of a roster under construction.
//
// Every mutation goes through here so the invariants hold after each call:
// the roster never exceeds `max_players`, a set captain index always points
// at a live slot, and duplicate-jersey flags are rescanned from scratch.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::api::ExistingPlayer;
use crate::config::RosterRules;
use crate::error::RosterError;
use crate::photo::{ImageFile, PreviewReady};
use crate::validation::{self, Issue, ValidationReport};

use super::slot::{PhotoTicket, RosterSlot, SlotId, SlotUpdate, Touched};

#[derive(Debug, Clone)]
pub struct RosterBuilder {
    rules: RosterRules,
    slots: Vec<RosterSlot>,
    captain: Option<usize>,
    /// Focused slot, tracked by identity so it follows the slot around.
    selected: Option<SlotId>,
    next_id: u64,
}

impl RosterBuilder {
    /// An empty roster for the create-team flow.
    pub fn new(rules: RosterRules) -> Self {
        RosterBuilder {
            rules,
            slots: Vec::new(),
            captain: None,
            selected: None,
            next_id: 0,
        }
    }

    /// A roster for the edit flow, one slot per saved player.
    ///
    /// With no saved players the roster starts with a single empty slot so
    /// the form is never blank. The first player flagged as leader becomes
    /// captain. Players beyond `max_players` are dropped with a warning.
    pub fn hydrate(rules: RosterRules, players: &[ExistingPlayer]) -> Self {
        let mut builder = RosterBuilder::new(rules);

        if players.is_empty() {
            // Cannot fail: the roster is empty and max_players >= 1.
            let _ = builder.add_slot();
            return builder;
        }

        if players.len() > builder.rules.max_players {
            warn!(
                "team has {} saved players, only the first {} are editable",
                players.len(),
                builder.rules.max_players
            );
        }

        for player in players.iter().take(builder.rules.max_players) {
            let id = builder.allocate_id();
            builder.slots.push(RosterSlot::from_existing(id, player));
        }
        builder.captain = players
            .iter()
            .take(builder.slots.len())
            .position(|p| p.is_lider);

        builder.refresh_duplicates();
        info!("hydrated roster with {} saved players", builder.slots.len());
        builder
    }

    fn allocate_id(&mut self) -> SlotId {
        let id = SlotId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn check_index(&self, index: usize) -> Result<(), RosterError> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(RosterError::IndexOutOfRange {
                index,
                len: self.slots.len(),
            })
        }
    }

    fn refresh_duplicates(&mut self) {
        validation::refresh_duplicate_flags(&mut self.slots);
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn rules(&self) -> &RosterRules {
        &self.rules
    }

    pub fn slots(&self) -> &[RosterSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Result<&RosterSlot, RosterError> {
        self.check_index(index)?;
        Ok(&self.slots[index])
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.rules.max_players
    }

    pub fn captain(&self) -> Option<usize> {
        self.captain
    }

    pub fn index_of(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected.and_then(|id| self.index_of(id))
    }

    /// Indices currently flagged as sharing a jersey number.
    pub fn duplicate_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.duplicate_jersey.then_some(i))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Structural operations
    // -----------------------------------------------------------------------

    /// Append an empty slot.
    ///
    /// At capacity nothing changes and `CapacityReached` is returned for the
    /// caller to show as a warning.
    pub fn add_slot(&mut self) -> Result<SlotId, RosterError> {
        if self.is_full() {
            warn!("roster is full ({} players), add ignored", self.rules.max_players);
            return Err(RosterError::CapacityReached {
                max: self.rules.max_players,
            });
        }

        let was_empty = self.slots.is_empty();
        let id = self.allocate_id();
        self.slots.push(RosterSlot::empty(id));

        if was_empty && self.rules.captain_on_first_slot {
            self.captain = Some(0);
        }

        self.refresh_duplicates();
        debug!(%id, len = self.slots.len(), "added roster slot");
        Ok(id)
    }

    /// Remove the slot at `index` together with its photo and preview.
    ///
    /// Captain repair: removing the captain clears it, removing a slot before
    /// the captain shifts it down by one, removing a later slot leaves it.
    pub fn remove_slot(&mut self, index: usize) -> Result<RosterSlot, RosterError> {
        self.check_index(index)?;
        let removed = self.slots.remove(index);

        self.captain = match self.captain {
            Some(c) if c == index => None,
            Some(c) if c > index => Some(c - 1),
            other => other,
        };
        if self.selected == Some(removed.id) {
            self.selected = None;
        }

        self.refresh_duplicates();
        debug!(id = %removed.id, index, "removed roster slot");
        Ok(removed)
    }

    pub fn set_captain(&mut self, index: usize) -> Result<(), RosterError> {
        self.check_index(index)?;
        self.captain = Some(index);
        Ok(())
    }

    pub fn clear_captain(&mut self) {
        self.captain = None;
    }

    pub fn select_slot(&mut self, index: usize) -> Result<(), RosterError> {
        self.check_index(index)?;
        self.selected = Some(self.slots[index].id);
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    // -----------------------------------------------------------------------
    // Field edits
    // -----------------------------------------------------------------------

    pub fn update_slot(&mut self, index: usize, update: SlotUpdate) -> Result<(), RosterError> {
        self.check_index(index)?;
        let slot = &mut self.slots[index];
        match update {
            SlotUpdate::FullName(name) => {
                slot.full_name = name;
                slot.touched.full_name = true;
            }
            SlotUpdate::BirthDate(date) => {
                slot.birth_date = date;
                slot.touched.birth_date = true;
            }
            SlotUpdate::JerseyNumber(jersey) => {
                slot.jersey_number = jersey;
                slot.touched.jersey_number = true;
            }
        }
        self.refresh_duplicates();
        Ok(())
    }

    /// Store a new photo on a slot. The old preview is dropped immediately;
    /// the new one arrives through [`RosterBuilder::apply_preview`].
    pub fn attach_photo(&mut self, index: usize, photo: ImageFile) -> Result<PhotoTicket, RosterError> {
        self.check_index(index)?;
        let slot = &mut self.slots[index];
        slot.photo = Some(photo);
        slot.preview = None;
        slot.touched.photo = true;
        slot.photo_generation += 1;
        Ok(PhotoTicket {
            slot: slot.id,
            generation: slot.photo_generation,
        })
    }

    /// Write a decoded preview into the slot it was issued for.
    ///
    /// Ignored when the slot is gone or a newer photo was selected since.
    pub fn apply_preview(&mut self, ready: PreviewReady) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.id == ready.slot) else {
            debug!(slot = %ready.slot, "preview for removed slot discarded");
            return false;
        };
        if slot.photo_generation != ready.generation {
            debug!(slot = %ready.slot, "stale preview discarded");
            return false;
        }
        match ready.preview {
            Some(preview) => {
                slot.preview = Some(preview);
                true
            }
            None => false,
        }
    }

    /// Record the server id of a player created by an edit-mode submission,
    /// so a retry updates it instead of creating it twice.
    pub fn mark_committed(&mut self, id: SlotId, player_id: impl Into<String>) -> bool {
        match self.slots.iter_mut().find(|s| s.id == id) {
            Some(slot) => {
                slot.existing_id = Some(player_id.into());
                true
            }
            None => false,
        }
    }

    /// Mark every field of every slot as touched.
    pub fn touch_all(&mut self) {
        for slot in &mut self.slots {
            slot.touched = Touched::all();
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Issues to render for one slot right now.
    pub fn live_issues(&self, index: usize, today: NaiveDate) -> Result<Vec<Issue>, RosterError> {
        self.check_index(index)?;
        Ok(validation::live_slot_issues(
            index,
            &self.slots[index],
            &self.rules,
            today,
        ))
    }

    /// Touch everything and run the exhaustive check.
    pub fn validate_at(&mut self, today: NaiveDate) -> Result<(), ValidationReport> {
        self.touch_all();
        self.refresh_duplicates();
        validation::validate_roster(&self.slots, self.captain, &self.rules, today)
    }

    pub fn validate(&mut self) -> Result<(), ValidationReport> {
        self.validate_at(chrono::Local::now().date_naive())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
