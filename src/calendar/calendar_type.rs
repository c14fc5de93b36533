use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::event::DraftError;
use super::share::Permission;

pub const DEFAULT_COLOR: &str = "#6366F1";

pub const PALETTE: [&str; 6] = [
    "#3788d8", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub owner_id: String,
    pub owner_name: Option<String>,
    pub access: Access,
}

/// How the signed-in user reaches a calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Owner,
    Shared(Permission),
}

impl Calendar {
    pub fn is_owned(&self) -> bool {
        self.access == Access::Owner
    }

    pub fn can_edit(&self) -> bool {
        matches!(self.access, Access::Owner | Access::Shared(Permission::Edit))
    }

    pub fn access_label(&self) -> &'static str {
        match self.access {
            Access::Owner => "owner",
            Access::Shared(Permission::Edit) => "can edit",
            Access::Shared(Permission::View) => "view only",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDraft {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
}

impl CalendarDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            color: DEFAULT_COLOR.to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::EmptyName);
        }
        if !is_valid_color(&self.color) {
            return Err(DraftError::InvalidColor(self.color.clone()));
        }
        Ok(())
    }
}

impl From<&Calendar> for CalendarDraft {
    fn from(calendar: &Calendar) -> Self {
        Self {
            name: calendar.name.clone(),
            description: calendar.description.clone(),
            color: calendar.color.clone(),
        }
    }
}

pub fn is_valid_color(color: &str) -> bool {
    static HEX_COLOR: OnceLock<Regex> = OnceLock::new();
    HEX_COLOR
        .get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"))
        .is_match(color)
}
