//! Value types shared by commands and messages.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a user-supplied name does not match any variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct ParseVariantError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Cup colours a student can show.
///
/// Serialized with the server's variant names (`"Green"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CupColor {
    Green,
    Yellow,
    Red,
}

impl CupColor {
    pub const ALL: [CupColor; 3] = [CupColor::Green, CupColor::Yellow, CupColor::Red];

    pub fn as_str(&self) -> &'static str {
        match self {
            CupColor::Green => "green",
            CupColor::Yellow => "yellow",
            CupColor::Red => "red",
        }
    }
}

impl fmt::Display for CupColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CupColor {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "green" => Ok(CupColor::Green),
            "yellow" => Ok(CupColor::Yellow),
            "red" => Ok(CupColor::Red),
            _ => Err(ParseVariantError {
                kind: "cup color",
                value: s.to_string(),
                expected: "green, yellow, red",
            }),
        }
    }
}

/// How a participant joins a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    /// Respondent: shows cups, answers questions
    Student,
    /// Presenter: sees the tallies, manages questions
    Teacher,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Student => "student",
            ConnectionType::Teacher => "teacher",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(ConnectionType::Student),
            "teacher" => Ok(ConnectionType::Teacher),
            _ => Err(ParseVariantError {
                kind: "connection type",
                value: s.to_string(),
                expected: "student, teacher",
            }),
        }
    }
}

/// Server-assigned question identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
