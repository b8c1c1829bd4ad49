// A single roster slot: player fields plus the slot's own photo and preview.

use std::fmt;

use chrono::NaiveDate;

use crate::api::ExistingPlayer;
use crate::photo::{ImageFile, Preview};

/// Stable identity of a slot. Positions shift under removal; ids never do,
/// and a builder never hands out the same id twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
    pub(crate) fn new(raw: u64) -> Self {
        SlotId(raw)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Which fields the user has interacted with. Untouched fields do not show
/// errors until a submit attempt touches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Touched {
    pub full_name: bool,
    pub birth_date: bool,
    pub jersey_number: bool,
    pub photo: bool,
}

impl Touched {
    pub fn all() -> Self {
        Touched {
            full_name: true,
            birth_date: true,
            jersey_number: true,
            photo: true,
        }
    }
}

/// One entry in a roster.
///
/// The preview lives on the record itself so it can never drift away from
/// the slot it belongs to.
#[derive(Debug, Clone)]
pub struct RosterSlot {
    pub id: SlotId,
    /// Server id of a previously saved player; `None` for new players.
    pub existing_id: Option<String>,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub jersey_number: Option<i32>,
    /// A newly chosen photo, uploaded on submit.
    pub photo: Option<ImageFile>,
    /// Picture path already stored server-side for a saved player.
    pub existing_picture: Option<String>,
    pub preview: Option<Preview>,
    /// Set while another slot carries the same jersey number.
    pub duplicate_jersey: bool,
    pub touched: Touched,
    pub(crate) photo_generation: u64,
}

impl RosterSlot {
    pub(crate) fn empty(id: SlotId) -> Self {
        RosterSlot {
            id,
            existing_id: None,
            full_name: String::new(),
            birth_date: None,
            jersey_number: None,
            photo: None,
            existing_picture: None,
            preview: None,
            duplicate_jersey: false,
            touched: Touched::default(),
            photo_generation: 0,
        }
    }

    pub(crate) fn from_existing(id: SlotId, player: &ExistingPlayer) -> Self {
        RosterSlot {
            existing_id: Some(player.id.clone()),
            full_name: player.fullname.clone(),
            birth_date: player.birth_date(),
            jersey_number: player.jersey,
            existing_picture: player.picture.clone().filter(|p| !p.trim().is_empty()),
            ..RosterSlot::empty(id)
        }
    }

    /// True for players that have never been saved.
    pub fn is_new(&self) -> bool {
        self.existing_id.is_none()
    }

    /// Whether the slot has any picture, chosen now or stored before.
    pub fn has_picture(&self) -> bool {
        self.photo.is_some() || self.existing_picture.is_some()
    }

    /// Name used in user-facing messages.
    pub fn display_name(&self, index: usize) -> String {
        let name = self.full_name.trim();
        if name.is_empty() {
            format!("Player {}", index + 1)
        } else {
            name.to_string()
        }
    }
}

/// A single field edit routed through the builder.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotUpdate {
    FullName(String),
    BirthDate(Option<NaiveDate>),
    JerseyNumber(Option<i32>),
}

/// Identifies one photo selection: the slot it was issued for and the
/// selection generation at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoTicket {
    pub slot: SlotId,
    pub generation: u64,
}
