//! Session state projector.
//!
//! Pure reducer over `(snapshot, event) -> snapshot`. For every decoded
//! message: mark `Working` and clear the error, apply the kind-specific
//! update, then derive the final status from the error field. Lifecycle
//! markers only touch the status.

use crate::{
    protocol::{InboundMessage, QuestionId, QuestionPublication},
    snapshot::{ConnectionStatus, CupTally, SessionSnapshot},
};

/// Synthetic events emitted by the connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleMarker {
    /// The handle reached `Open` and the handshake was written
    Started,
    /// The handle is gone (peer close, transport error, teardown)
    Closed,
}

/// Change to the single-slot publication cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationUpdate {
    Publish(QuestionPublication),
    /// Clear the cell if it currently holds this question
    Retract(QuestionId),
}

impl PublicationUpdate {
    /// Apply to the cell in place; returns whether the cell changed
    pub fn apply_to(self, cell: &mut Option<QuestionPublication>) -> bool {
        match self {
            PublicationUpdate::Publish(publication) => {
                *cell = Some(publication);
                true
            }
            PublicationUpdate::Retract(id) => {
                if cell.as_ref().is_some_and(|current| current.id == id) {
                    *cell = None;
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Result of folding one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub snapshot: SessionSnapshot,
    /// Set when the event also concerns the publication cell
    pub publication: Option<PublicationUpdate>,
}

/// Start processing an inbound message: `Working`, error cleared
pub fn begin(snapshot: &SessionSnapshot) -> SessionSnapshot {
    let mut next = snapshot.clone();
    next.connection_status = ConnectionStatus::Working;
    next.error_message = None;
    next
}

/// Fold a decoded message into the snapshot
pub fn apply(snapshot: &SessionSnapshot, message: InboundMessage) -> Projection {
    let mut next = begin(snapshot);
    let mut publication = None;

    match message {
        InboundMessage::RoomInfo(info) => {
            next.connection_count = info.connections;
            next.cup_tally = CupTally::from(&info);
        }
        InboundMessage::QuestionsInfo(questions) => {
            next.questions = Some(questions);
        }
        InboundMessage::QuestionPublication(published) => {
            publication = Some(PublicationUpdate::Publish(published));
        }
        InboundMessage::QuestionDelete(id) => {
            publication = Some(PublicationUpdate::Retract(id));
        }
        InboundMessage::Error(text) => {
            next.error_message = Some(text);
        }
        // No snapshot field carries acknowledgements
        InboundMessage::Ok => {}
    }

    next.connection_status = if next.error_message.is_some() {
        ConnectionStatus::Error
    } else {
        ConnectionStatus::Connected
    };

    Projection {
        snapshot: next,
        publication,
    }
}

/// Fold a lifecycle marker into the snapshot
pub fn mark(snapshot: &SessionSnapshot, marker: LifecycleMarker) -> SessionSnapshot {
    let mut next = snapshot.clone();
    next.connection_status = match marker {
        LifecycleMarker::Started => ConnectionStatus::Connected,
        LifecycleMarker::Closed => ConnectionStatus::Disconnected,
    };
    next
}
