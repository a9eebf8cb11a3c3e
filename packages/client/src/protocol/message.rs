//! Inbound messages (server → client).

use serde::{Deserialize, Serialize};

use super::types::QuestionId;

/// Room counters as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    /// Number of participants connected to the room
    pub connections: u32,
    pub green: u32,
    pub yellow: u32,
    pub red: u32,
}

/// A question together with its current answer counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionInfo {
    pub id: QuestionId,
    pub title: String,
    pub options: Vec<String>,
    /// One count per option, same order as `options`
    pub answers: Vec<u32>,
}

/// A question pushed to everybody in the room for answering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPublication {
    pub id: QuestionId,
    pub title: String,
    pub options: Vec<String>,
    pub secs: u64,
}

/// Messages the server sends, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum InboundMessage {
    RoomInfo(RoomInfo),
    QuestionsInfo(Vec<QuestionInfo>),
    QuestionPublication(QuestionPublication),
    QuestionDelete(QuestionId),
    /// Acknowledges a cup choice or an answer
    Ok,
    Error(String),
}

/// The closed set of `kind` tags understood by this client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    RoomInfo,
    QuestionsInfo,
    QuestionPublication,
    QuestionDelete,
    Ok,
    Error,
}

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        MessageKind::RoomInfo,
        MessageKind::QuestionsInfo,
        MessageKind::QuestionPublication,
        MessageKind::QuestionDelete,
        MessageKind::Ok,
        MessageKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::RoomInfo => "RoomInfo",
            MessageKind::QuestionsInfo => "QuestionsInfo",
            MessageKind::QuestionPublication => "QuestionPublication",
            MessageKind::QuestionDelete => "QuestionDelete",
            MessageKind::Ok => "Ok",
            MessageKind::Error => "Error",
        }
    }

    /// Look up a wire tag; `None` for tags this client does not know
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl InboundMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            InboundMessage::RoomInfo(_) => MessageKind::RoomInfo,
            InboundMessage::QuestionsInfo(_) => MessageKind::QuestionsInfo,
            InboundMessage::QuestionPublication(_) => MessageKind::QuestionPublication,
            InboundMessage::QuestionDelete(_) => MessageKind::QuestionDelete,
            InboundMessage::Ok => MessageKind::Ok,
            InboundMessage::Error(_) => MessageKind::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_match_serde_tags() {
        // テスト項目: MessageKind のタグ名が serde のタグ名と一致する
        // given (前提条件):
        let samples = vec![
            InboundMessage::RoomInfo(RoomInfo {
                connections: 1,
                green: 0,
                yellow: 0,
                red: 0,
            }),
            InboundMessage::QuestionsInfo(vec![]),
            InboundMessage::QuestionPublication(QuestionPublication {
                id: QuestionId(1),
                title: "q".to_string(),
                options: vec![],
                secs: 10,
            }),
            InboundMessage::QuestionDelete(QuestionId(1)),
            InboundMessage::Ok,
            InboundMessage::Error("oops".to_string()),
        ];

        for message in samples {
            // when (操作):
            let value = serde_json::to_value(&message).unwrap();

            // then (期待する結果):
            let tag = value["kind"].as_str().unwrap();
            assert_eq!(tag, message.kind().as_str());
            assert_eq!(MessageKind::from_tag(tag), Some(message.kind()));
        }
    }

    #[test]
    fn test_from_tag_unknown() {
        // テスト項目: 未知のタグは None になる
        // given (前提条件):
        let tag = "ParticipantJoined";

        // when (操作):
        let kind = MessageKind::from_tag(tag);

        // then (期待する結果):
        assert_eq!(kind, None);
    }
}
