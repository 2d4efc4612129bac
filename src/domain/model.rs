use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strips whitespace and the byte-order mark that spreadsheet exports
/// sometimes leave at the start of a cell.
pub fn trim_name(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

/// A name from the invitation list, always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct InvitedName(String);

impl InvitedName {
    /// Returns `None` when nothing is left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = trim_name(raw);
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for InvitedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvitedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attendance {
    #[default]
    #[serde(rename = "hadir")]
    Attending,
    #[serde(rename = "tidak")]
    NotAttending,
}

impl Attendance {
    /// Stored form value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Attendance::Attending => "hadir",
            Attendance::NotAttending => "tidak",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Attendance::Attending => "Hadir",
            Attendance::NotAttending => "Tidak Hadir",
        }
    }

    /// 接受表單值 (hadir/tidak) 與常見的英文寫法
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "hadir" | "h" | "y" | "yes" | "attending" => Some(Attendance::Attending),
            "tidak" | "tidak hadir" | "t" | "n" | "no" | "not attending" => {
                Some(Attendance::NotAttending)
            }
            _ => None,
        }
    }
}

/// One guest book entry as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestResponse {
    pub name: String,
    pub attendance: Attendance,
    #[serde(rename = "guests")]
    pub guest_count: u32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl GuestResponse {
    pub fn new(
        name: &InvitedName,
        attendance: Attendance,
        guest_count: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.as_str().to_string(),
            attendance,
            guest_count,
            message: message.into(),
            submitted_at: None,
        }
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.submitted_at = Some(at);
        self
    }

    pub fn is_attending(&self) -> bool {
        self.attendance == Attendance::Attending
    }
}

/// Form input collected after a successful name check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseForm {
    pub attendance: Attendance,
    pub guest_count: u32,
    pub message: String,
}

impl Default for ResponseForm {
    fn default() -> Self {
        Self {
            attendance: Attendance::Attending,
            guest_count: 1,
            message: String::new(),
        }
    }
}
