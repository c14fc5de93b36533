use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DraftError {
    #[error("Title must not be empty")]
    EmptyTitle,
    #[error("Name must not be empty")]
    EmptyName,
    #[error("Event ends ({end}) before it starts ({start})")]
    EndsBeforeStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("Invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),
    #[error("Calendar id must not be empty")]
    MissingCalendar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub calendar_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub all_day: bool,
    pub color: Option<String>,
    pub recurrence: Option<Recurrence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recurrence {
    #[serde(rename = "DIARIA")]
    Daily,
    #[serde(rename = "SEMANAL")]
    Weekly,
    #[serde(rename = "MENSAL")]
    Monthly,
    #[serde(rename = "ANUAL")]
    Yearly,
}

impl Recurrence {
    pub fn label(&self) -> &'static str {
        match self {
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "diaria" => Ok(Recurrence::Daily),
            "weekly" | "semanal" => Ok(Recurrence::Weekly),
            "monthly" | "mensal" => Ok(Recurrence::Monthly),
            "yearly" | "anual" => Ok(Recurrence::Yearly),
            other => Err(format!("Unknown recurrence '{}'", other)),
        }
    }
}

impl Event {
    /// Calendar date the event is bucketed under.
    pub fn start_date(&self) -> NaiveDate {
        self.start_at.date()
    }

    pub fn to_draft(&self) -> EventDraft {
        EventDraft {
            calendar_id: self.calendar_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            start_at: self.start_at,
            end_at: self.end_at,
            all_day: self.all_day,
            color: self.color.clone(),
            recurrence: self.recurrence,
        }
    }
}

/// Body sent when creating or replacing an event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub calendar_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub all_day: bool,
    pub color: Option<String>,
    pub recurrence: Option<Recurrence>,
}

impl EventDraft {
    pub fn new(
        calendar_id: impl Into<String>,
        title: impl Into<String>,
        start_at: NaiveDateTime,
        end_at: NaiveDateTime,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            title: title.into(),
            description: None,
            location: None,
            start_at,
            end_at,
            all_day: false,
            color: None,
            recurrence: None,
        }
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.calendar_id.trim().is_empty() {
            return Err(DraftError::MissingCalendar);
        }
        if self.title.trim().is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        if self.end_at < self.start_at {
            return Err(DraftError::EndsBeforeStart {
                start: self.start_at,
                end: self.end_at,
            });
        }
        if let Some(color) = &self.color
            && !super::calendar_type::is_valid_color(color)
        {
            return Err(DraftError::InvalidColor(color.clone()));
        }
        Ok(())
    }
}
