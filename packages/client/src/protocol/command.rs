//! Outbound commands (client → server).

use serde::{Deserialize, Serialize};

use super::types::{ConnectionType, CupColor, QuestionId};

/// Handshake payload, always the first frame of a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConnectInfo {
    pub room_name: String,
    pub connection_type: ConnectionType,
}

/// A question as created by a teacher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub title: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishQuestion {
    pub id: QuestionId,
    /// Seconds students get to answer
    pub secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub id: QuestionId,
    /// Index into the question's options
    pub answer: usize,
}

/// Partial update of a question. Absent fields are left as they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionModification {
    pub id: QuestionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Commands the client sends, tagged by `task`.
///
/// Fire-and-forget: there is no correlation id and no per-command reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", content = "payload")]
pub enum Command {
    RoomConnect(RoomConnectInfo),
    ChooseCup(CupColor),
    CreateQuestion(QuestionDefinition),
    PublishQuestion(PublishQuestion),
    AnswerQuestion(QuestionAnswer),
    DeleteQuestion(QuestionId),
    ModifyQuestion(QuestionModification),
}

impl Command {
    /// The `task` tag this command is sent under
    pub fn task(&self) -> &'static str {
        match self {
            Command::RoomConnect(_) => "RoomConnect",
            Command::ChooseCup(_) => "ChooseCup",
            Command::CreateQuestion(_) => "CreateQuestion",
            Command::PublishQuestion(_) => "PublishQuestion",
            Command::AnswerQuestion(_) => "AnswerQuestion",
            Command::DeleteQuestion(_) => "DeleteQuestion",
            Command::ModifyQuestion(_) => "ModifyQuestion",
        }
    }
}
