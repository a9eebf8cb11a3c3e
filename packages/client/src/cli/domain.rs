//! Decisions taken by the interactive client.
//!
//! Pure functions over snapshots and connection states, kept apart from the
//! terminal loop so they can be tested without I/O.

use crate::{
    connection::ConnectionState,
    error::{ClientError, TransportError},
    snapshot::{ConnectionStatus, SessionSnapshot},
};

/// Whether `snapshot` is worth printing given the one printed last.
///
/// Intermediate `Working` snapshots and repeats are skipped.
pub fn should_render(snapshot: &SessionSnapshot, last_rendered: Option<&SessionSnapshot>) -> bool {
    if snapshot.connection_status == ConnectionStatus::Working {
        return false;
    }
    last_rendered != Some(snapshot)
}

/// Why the client must stop, if the connection is over.
///
/// # Arguments
///
/// * `snapshot` - The snapshot just observed
/// * `state` - State of the session's connection
/// * `was_connected` - Whether the session has been connected before
/// * `url` - Endpoint, for the error message
pub fn connection_ended(
    snapshot: &SessionSnapshot,
    state: ConnectionState,
    was_connected: bool,
    url: &str,
) -> Option<ClientError> {
    if snapshot.connection_status != ConnectionStatus::Disconnected
        || state != ConnectionState::Disconnected
    {
        return None;
    }

    if was_connected {
        Some(ClientError::Transport(TransportError::Closed))
    } else {
        Some(ClientError::Transport(TransportError::Connect(format!(
            "could not join the room at {}",
            url
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: ConnectionStatus) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot::new("math");
        snapshot.connection_status = status;
        snapshot
    }

    #[test]
    fn test_should_render_skips_working() {
        // テスト項目: Working 状態のスナップショットは表示しない
        // given (前提条件):
        let working = snapshot(ConnectionStatus::Working);

        // when (操作):
        let result = should_render(&working, None);

        // then (期待する結果):
        assert!(!result);
    }

    #[test]
    fn test_should_render_skips_repeats() {
        // テスト項目: 前回と同じスナップショットは表示しない
        // given (前提条件):
        let connected = snapshot(ConnectionStatus::Connected);
        let mut busier = connected.clone();
        busier.connection_count = 4;

        // when (操作):
        let repeat = should_render(&connected, Some(&connected));
        let changed = should_render(&busier, Some(&connected));
        let first = should_render(&connected, None);

        // then (期待する結果):
        assert!(!repeat);
        assert!(changed);
        assert!(first);
    }

    #[test]
    fn test_connection_ended_while_opening() {
        // テスト項目: 接続処理中は終了と判定しない
        // given (前提条件):
        let disconnected = snapshot(ConnectionStatus::Disconnected);

        // when (操作):
        let result = connection_ended(&disconnected, ConnectionState::Opening, false, "ws://x/ws");

        // then (期待する結果):
        assert!(result.is_none());
    }

    #[test]
    fn test_connection_ended_after_being_connected() {
        // テスト項目: 接続済みだった場合は接続断として終了する
        // given (前提条件):
        let disconnected = snapshot(ConnectionStatus::Disconnected);

        // when (操作):
        let result = connection_ended(
            &disconnected,
            ConnectionState::Disconnected,
            true,
            "ws://x/ws",
        );

        // then (期待する結果):
        assert!(matches!(
            result,
            Some(ClientError::Transport(TransportError::Closed))
        ));
    }

    #[test]
    fn test_connection_ended_without_ever_connecting() {
        // テスト項目: 一度も接続できなかった場合は接続エラーとして終了する
        // given (前提条件):
        let disconnected = snapshot(ConnectionStatus::Disconnected);

        // when (操作):
        let result = connection_ended(
            &disconnected,
            ConnectionState::Disconnected,
            false,
            "ws://x/ws",
        );

        // then (期待する結果):
        match result {
            Some(ClientError::Transport(TransportError::Connect(reason))) => {
                assert!(reason.contains("ws://x/ws"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_connection_ended_while_connected() {
        // テスト項目: 接続中は終了と判定しない
        // given (前提条件):
        let connected = snapshot(ConnectionStatus::Connected);

        // when (操作):
        let result = connection_ended(&connected, ConnectionState::Open, true, "ws://x/ws");

        // then (期待する結果):
        assert!(result.is_none());
    }
}
