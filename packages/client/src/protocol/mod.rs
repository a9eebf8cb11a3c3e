//! Wire-level Data Transfer Objects for the room WebSocket.
//!
//! Every frame is a JSON object with a string tag and a `payload`:
//! - outbound (client → server): `{"task": ..., "payload": ...}`
//! - inbound (server → client): `{"kind": ..., "payload": ...}`

pub mod command;
pub mod message;
pub mod types;

pub use command::{
    Command, PublishQuestion, QuestionAnswer, QuestionDefinition, QuestionModification,
    RoomConnectInfo,
};
pub use message::{InboundMessage, MessageKind, QuestionInfo, QuestionPublication, RoomInfo};
pub use types::{ConnectionType, CupColor, ParseVariantError, QuestionId};
