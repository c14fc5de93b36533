use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "VISUALIZAR")]
    View,
    #[serde(rename = "EDITAR")]
    Edit,
}

impl Permission {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Permission::View => "VISUALIZAR",
            Permission::Edit => "EDITAR",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::View => write!(f, "view"),
            Permission::Edit => write!(f, "edit"),
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "view" | "visualizar" => Ok(Permission::View),
            "edit" | "editar" => Ok(Permission::Edit),
            other => Err(format!("Unknown permission '{}', use view or edit", other)),
        }
    }
}

/// A grant of access on one calendar to another user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub id: String,
    pub calendar_id: String,
    pub calendar_name: Option<String>,
    pub user_id: Option<String>,
    pub user_name: String,
    pub user_email: Option<String>,
    pub permission: Permission,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareRequest {
    pub calendar_id: String,
    pub recipient_email: String,
    pub permission: Permission,
}

impl ShareRequest {
    pub fn new(
        calendar_id: impl Into<String>,
        recipient_email: impl Into<String>,
        permission: Permission,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            recipient_email: recipient_email.into().trim().to_string(),
            permission,
        }
    }
}
