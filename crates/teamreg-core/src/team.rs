// Team-level fields assembled at submit time.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PhotoError;
use crate::photo::{ChosenFile, ImageFile, Preview};

/// Weekday a team can play on. Serialized with the league's wire labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AvailabilityDay {
    #[serde(rename = "Lunes")]
    Monday,
    #[serde(rename = "Martes")]
    Tuesday,
    #[serde(rename = "Miércoles")]
    Wednesday,
    #[serde(rename = "Jueves")]
    Thursday,
    #[serde(rename = "Viernes")]
    Friday,
    #[serde(rename = "Sábado")]
    Saturday,
    #[serde(rename = "Domingo")]
    Sunday,
}

impl AvailabilityDay {
    pub const ALL: [AvailabilityDay; 7] = [
        AvailabilityDay::Monday,
        AvailabilityDay::Tuesday,
        AvailabilityDay::Wednesday,
        AvailabilityDay::Thursday,
        AvailabilityDay::Friday,
        AvailabilityDay::Saturday,
        AvailabilityDay::Sunday,
    ];

    /// Wire label, e.g. `"Miércoles"`.
    pub fn label(&self) -> &'static str {
        match self {
            AvailabilityDay::Monday => "Lunes",
            AvailabilityDay::Tuesday => "Martes",
            AvailabilityDay::Wednesday => "Miércoles",
            AvailabilityDay::Thursday => "Jueves",
            AvailabilityDay::Friday => "Viernes",
            AvailabilityDay::Saturday => "Sábado",
            AvailabilityDay::Sunday => "Domingo",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|d| d.label() == label)
    }
}

impl fmt::Display for AvailabilityDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The team half of a create-mode submission.
#[derive(Debug, Clone, Default)]
pub struct TeamDraft {
    pub name: String,
    pub availability_days: BTreeSet<AvailabilityDay>,
    pub logo: Option<ImageFile>,
}

impl TeamDraft {
    pub fn new(name: impl Into<String>) -> Self {
        TeamDraft {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_days(mut self, days: impl IntoIterator<Item = AvailabilityDay>) -> Self {
        self.availability_days.extend(days);
        self
    }

    /// Validate and store a logo, returning its preview. Non-images leave
    /// the current logo in place.
    pub fn set_logo(&mut self, file: ChosenFile) -> Result<Preview, PhotoError> {
        let image = file.image()?;
        let preview = Preview::encode(&image);
        self.logo = Some(image);
        Ok(preview)
    }

    /// Trimmed name as sent to the server.
    pub fn trimmed_name(&self) -> &str {
        self.name.trim()
    }

    /// Days in Monday-first order.
    pub fn days(&self) -> Vec<AvailabilityDay> {
        self.availability_days.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_label() {
        for day in AvailabilityDay::ALL {
            assert_eq!(AvailabilityDay::from_label(day.label()), Some(day));
        }
        assert_eq!(AvailabilityDay::from_label("Funday"), None);
    }

    #[test]
    fn serializes_with_wire_labels() {
        let json = serde_json::to_string(&[AvailabilityDay::Wednesday, AvailabilityDay::Saturday])
            .unwrap();
        assert_eq!(json, r#"["Miércoles","Sábado"]"#);
    }

    #[test]
    fn days_are_ordered_monday_first() {
        let team = TeamDraft::new("X").with_days([
            AvailabilityDay::Sunday,
            AvailabilityDay::Monday,
            AvailabilityDay::Sunday,
        ]);
        assert_eq!(team.days(), vec![AvailabilityDay::Monday, AvailabilityDay::Sunday]);
    }

    #[test]
    fn rejected_logo_keeps_previous() {
        let mut team = TeamDraft::new("X");
        team.set_logo(ChosenFile::new("logo.png", "image/png", vec![1, 2, 3]))
            .unwrap();
        let err = team
            .set_logo(ChosenFile::new("logo.gif.exe", "application/octet-stream", vec![9]))
            .unwrap_err();
        assert!(matches!(err, PhotoError::NotAnImage { .. }));
        assert_eq!(team.logo.as_ref().map(|l| l.file_name()), Some("logo.png"));
    }
}
