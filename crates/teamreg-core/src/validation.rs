// Field and cross-record constraints over a roster snapshot.
//
// Everything here is a pure function of its inputs. The builder calls
// `refresh_duplicate_flags` after every mutation and `validate_roster` right
// before a submission.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::config::{CaptainPolicy, PhotoRequirement, RosterRules};
use crate::roster::RosterSlot;
use crate::team::TeamDraft;

/// Letters, Spanish accented letters, and whitespace.
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-ZáéíóúÁÉÍÓÚüÜñÑ\s]*$").expect("name pattern is a valid regex")
});

// ---------------------------------------------------------------------------
// Issue types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FullName,
    BirthDate,
    JerseyNumber,
    Photo,
    Captain,
    TeamName,
    AvailabilityDays,
}

impl Field {
    /// Form-control name the UI binds errors to.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FullName => "fullName",
            Field::BirthDate => "birthDate",
            Field::JerseyNumber => "jerseyNumber",
            Field::Photo => "photo",
            Field::Captain => "captain",
            Field::TeamName => "teamName",
            Field::AvailabilityDays => "availabilityDays",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Required,
    Pattern,
    OutOfRange { min: i32, max: i32 },
    InFuture,
    Duplicate,
}

impl Reason {
    pub fn message(&self) -> String {
        match self {
            Reason::Required => "Este campo es obligatorio".to_string(),
            Reason::Pattern => "Solo se permiten letras y espacios".to_string(),
            Reason::OutOfRange { min, max } => format!("El valor debe estar entre {min} y {max}"),
            Reason::InFuture => "La fecha no puede estar en el futuro".to_string(),
            Reason::Duplicate => "Este número de camiseta ya está en uso en el equipo".to_string(),
        }
    }
}

/// One failed rule. `slot` is `None` for roster- or team-level rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub slot: Option<usize>,
    pub field: Field,
    pub reason: Reason,
}

impl Issue {
    fn slot(index: usize, field: Field, reason: Reason) -> Self {
        Issue {
            slot: Some(index),
            field,
            reason,
        }
    }

    fn roster(field: Field, reason: Reason) -> Self {
        Issue {
            slot: None,
            field,
            reason,
        }
    }
}

/// Consolidated result of an exhaustive check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
    pub summary: String,
}

pub const SUMMARY_REQUIRED: &str = "Por favor complete todos los campos requeridos correctamente.";
pub const SUMMARY_DUPLICATES: &str = "Los números de camiseta deben ser únicos dentro del equipo.";
pub const SUMMARY_CAPTAIN: &str = "Selecciona un capitán antes de enviar.";

impl ValidationReport {
    pub fn new(issues: Vec<Issue>) -> Self {
        let summary = if issues.iter().any(|i| i.reason == Reason::Duplicate) {
            SUMMARY_DUPLICATES
        } else if issues.len() == 1 && issues[0].field == Field::Captain {
            SUMMARY_CAPTAIN
        } else {
            SUMMARY_REQUIRED
        };
        ValidationReport {
            issues,
            summary: summary.to_string(),
        }
    }

    pub fn issues_for(&self, slot: usize) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.slot == Some(slot))
    }

    pub fn has_duplicates(&self) -> bool {
        self.issues.iter().any(|i| i.reason == Reason::Duplicate)
    }
}

// ---------------------------------------------------------------------------
// Per-field rules
// ---------------------------------------------------------------------------

pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

pub fn check_full_name(name: &str) -> Option<Reason> {
    if name.trim().is_empty() {
        Some(Reason::Required)
    } else if !is_valid_name(name) {
        Some(Reason::Pattern)
    } else {
        None
    }
}

pub fn check_birth_date(date: Option<NaiveDate>, today: NaiveDate) -> Option<Reason> {
    match date {
        None => Some(Reason::Required),
        Some(d) if d > today => Some(Reason::InFuture),
        Some(_) => None,
    }
}

pub fn check_jersey(jersey: Option<i32>, rules: &RosterRules) -> Option<Reason> {
    match jersey {
        None => Some(Reason::Required),
        Some(n) if n < rules.jersey_min || n > rules.jersey_max => Some(Reason::OutOfRange {
            min: rules.jersey_min,
            max: rules.jersey_max,
        }),
        Some(_) => None,
    }
}

pub fn check_photo(slot: &RosterSlot, requirement: PhotoRequirement) -> Option<Reason> {
    let missing = match requirement {
        PhotoRequirement::NewSlotsOnly => slot.is_new() && slot.photo.is_none(),
        PhotoRequirement::AllSlots => !slot.has_picture(),
        PhotoRequirement::Never => false,
    };
    missing.then_some(Reason::Required)
}

// ---------------------------------------------------------------------------
// Cross-record rule: unique jerseys
// ---------------------------------------------------------------------------

/// Map each jersey number to the indices of the slots wearing it.
pub fn jersey_buckets(slots: &[RosterSlot]) -> BTreeMap<i32, Vec<usize>> {
    let mut buckets: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, slot) in slots.iter().enumerate() {
        if let Some(n) = slot.jersey_number {
            buckets.entry(n).or_default().push(i);
        }
    }
    buckets
}

/// Full rescan: flag every member of a shared-jersey bucket and clear the
/// flag everywhere else. Returns the flagged indices in ascending order.
pub fn refresh_duplicate_flags(slots: &mut [RosterSlot]) -> Vec<usize> {
    let mut flagged: Vec<usize> = jersey_buckets(slots)
        .into_values()
        .filter(|members| members.len() > 1)
        .flatten()
        .collect();
    flagged.sort_unstable();

    for (i, slot) in slots.iter_mut().enumerate() {
        slot.duplicate_jersey = flagged.binary_search(&i).is_ok();
    }

    if !flagged.is_empty() {
        debug!(?flagged, "duplicate jersey numbers");
    }
    flagged
}

// ---------------------------------------------------------------------------
// Aggregate checks
// ---------------------------------------------------------------------------

/// Every issue on one slot, touched or not. Duplicate state is read from the
/// slot's flag, so flags must be fresh.
pub fn slot_issues(index: usize, slot: &RosterSlot, rules: &RosterRules, today: NaiveDate) -> Vec<Issue> {
    let mut issues = Vec::new();
    if let Some(reason) = check_full_name(&slot.full_name) {
        issues.push(Issue::slot(index, Field::FullName, reason));
    }
    if let Some(reason) = check_birth_date(slot.birth_date, today) {
        issues.push(Issue::slot(index, Field::BirthDate, reason));
    }
    if let Some(reason) = check_jersey(slot.jersey_number, rules) {
        issues.push(Issue::slot(index, Field::JerseyNumber, reason));
    } else if slot.duplicate_jersey {
        issues.push(Issue::slot(index, Field::JerseyNumber, Reason::Duplicate));
    }
    if let Some(reason) = check_photo(slot, rules.photo_requirement) {
        issues.push(Issue::slot(index, Field::Photo, reason));
    }
    issues
}

/// Issues the UI should show right now: only touched fields, except that
/// duplicate jerseys are always highlighted.
pub fn live_slot_issues(
    index: usize,
    slot: &RosterSlot,
    rules: &RosterRules,
    today: NaiveDate,
) -> Vec<Issue> {
    slot_issues(index, slot, rules, today)
        .into_iter()
        .filter(|issue| {
            issue.reason == Reason::Duplicate
                || match issue.field {
                    Field::FullName => slot.touched.full_name,
                    Field::BirthDate => slot.touched.birth_date,
                    Field::JerseyNumber => slot.touched.jersey_number,
                    Field::Photo => slot.touched.photo,
                    _ => true,
                }
        })
        .collect()
}

/// Exhaustive check of the whole roster, including the captain policy.
pub fn validate_roster(
    slots: &[RosterSlot],
    captain: Option<usize>,
    rules: &RosterRules,
    today: NaiveDate,
) -> Result<(), ValidationReport> {
    let mut issues: Vec<Issue> = slots
        .iter()
        .enumerate()
        .flat_map(|(i, slot)| slot_issues(i, slot, rules, today))
        .collect();

    if rules.captain_policy == CaptainPolicy::Required && !slots.is_empty() && captain.is_none() {
        issues.push(Issue::roster(Field::Captain, Reason::Required));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport::new(issues))
    }
}

/// Team-level rules from the create-team dialog.
pub fn team_issues(team: &TeamDraft) -> Vec<Issue> {
    let mut issues = Vec::new();
    if let Some(reason) = check_full_name(&team.name) {
        issues.push(Issue::roster(Field::TeamName, reason));
    }
    if team.availability_days.is_empty() {
        issues.push(Issue::roster(Field::AvailabilityDays, Reason::Required));
    }
    issues
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
