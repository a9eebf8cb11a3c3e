//! Session snapshot: the observable state of one room membership.

use crate::protocol::{CupColor, QuestionInfo, RoomInfo};

/// Connection status as shown to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
    /// An inbound message is being applied
    Working,
    /// The last applied message was a server error
    Error,
}

/// Cup counts over the closed colour set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CupTally {
    pub green: u32,
    pub yellow: u32,
    pub red: u32,
}

impl CupTally {
    pub fn new(green: u32, yellow: u32, red: u32) -> Self {
        Self { green, yellow, red }
    }

    pub fn count(&self, color: CupColor) -> u32 {
        match color {
            CupColor::Green => self.green,
            CupColor::Yellow => self.yellow,
            CupColor::Red => self.red,
        }
    }
}

impl From<&RoomInfo> for CupTally {
    fn from(info: &RoomInfo) -> Self {
        Self::new(info.green, info.yellow, info.red)
    }
}

/// Immutable state value published to observers.
///
/// Invariant: `connection_status == Error` exactly when `error_message` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    room_name: String,
    pub connection_status: ConnectionStatus,
    /// Last value reported by the server
    pub connection_count: u32,
    pub cup_tally: CupTally,
    /// `None` until the first question report
    pub questions: Option<Vec<QuestionInfo>>,
    pub error_message: Option<String>,
}

impl SessionSnapshot {
    pub fn new(room_name: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            connection_status: ConnectionStatus::Disconnected,
            connection_count: 0,
            cup_tally: CupTally::default(),
            questions: None,
            error_message: None,
        }
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self.connection_status, ConnectionStatus::Disconnected)
    }

    /// Questions reported so far, empty before the first report
    pub fn questions(&self) -> &[QuestionInfo] {
        self.questions.as_deref().unwrap_or_default()
    }
}
