//! Room session: snapshot observers, lazy connection and commands.
//!
//! The connection only exists while someone observes the snapshot. The
//! first `subscribe()` opens it, dropping the last `SnapshotObserver`
//! closes it. Commands are fire-and-forget and fail with
//! `ClientError::NotConnected` unless the connection is open.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::{
    config::ClientConfig,
    connection::{ConnectionHandle, ConnectionState},
    error::ClientError,
    protocol::{
        Command, ConnectionType, CupColor, PublishQuestion, QuestionAnswer, QuestionDefinition,
        QuestionId, QuestionModification, QuestionPublication, RoomConnectInfo,
    },
    snapshot::SessionSnapshot,
    store::SessionStore,
    transport::{Connector, WebSocketConnector},
};

/// One participant's view of one room.
///
/// Cheap to clone; clones share the same connection and snapshot.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    room_name: String,
    connection_type: ConnectionType,
    url: String,
    connector: Arc<dyn Connector>,
    store: Arc<SessionStore>,
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    observers: usize,
    handle: Option<ConnectionHandle>,
    torn_down: bool,
}

impl Session {
    /// Session against the configured endpoint over WebSocket
    pub fn open(
        config: &ClientConfig,
        room_name: impl Into<String>,
        connection_type: ConnectionType,
    ) -> Self {
        Self::with_connector(
            Arc::new(WebSocketConnector),
            config.endpoint(),
            room_name,
            connection_type,
        )
    }

    /// Session using a custom connector
    pub fn with_connector(
        connector: Arc<dyn Connector>,
        url: impl Into<String>,
        room_name: impl Into<String>,
        connection_type: ConnectionType,
    ) -> Self {
        let room_name = room_name.into();
        let store = Arc::new(SessionStore::new(&room_name));
        Self {
            inner: Arc::new(SessionInner {
                room_name,
                connection_type,
                url: url.into(),
                connector,
                store,
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    pub fn room_name(&self) -> &str {
        &self.inner.room_name
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.inner.connection_type
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.url
    }

    /// Latest snapshot, without activating the connection
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.store.current()
    }

    /// Observe the snapshot. The first observer opens the connection.
    ///
    /// Opening spawns onto the current Tokio runtime; outside a runtime the
    /// observer still works but the connection stays closed.
    pub fn subscribe(&self) -> SnapshotObserver {
        let receiver = self.inner.store.subscribe();
        self.inner.attach();
        SnapshotObserver {
            receiver,
            session: self.inner.clone(),
        }
    }

    /// Observe question publications. Does not open the connection.
    pub fn publications(&self) -> PublicationObserver {
        PublicationObserver {
            receiver: self.inner.store.subscribe_publications(),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock().observers
    }

    /// State of the current connection; `Disconnected` when there is none
    pub fn connection_state(&self) -> ConnectionState {
        self.inner
            .lock()
            .handle
            .as_ref()
            .map_or(ConnectionState::Disconnected, ConnectionHandle::state)
    }

    /// Whether the current connection reached `Open`, even if it has
    /// disconnected since
    pub fn has_opened(&self) -> bool {
        self.inner
            .lock()
            .handle
            .as_ref()
            .is_some_and(ConnectionHandle::has_opened)
    }

    /// Tear the session down. The connection closes and is never reopened.
    pub fn close(&self) {
        let handle = {
            let mut lifecycle = self.inner.lock();
            lifecycle.torn_down = true;
            lifecycle.handle.take()
        };
        if let Some(handle) = handle {
            tracing::info!("Closing session for room '{}'", self.inner.room_name);
            drop(handle);
        }
    }

    pub fn choose_cup(&self, color: CupColor) -> Result<(), ClientError> {
        self.send(Command::ChooseCup(color))
    }

    pub fn create_question(&self, definition: QuestionDefinition) -> Result<(), ClientError> {
        self.send(Command::CreateQuestion(definition))
    }

    pub fn publish_question(&self, id: QuestionId, secs: u64) -> Result<(), ClientError> {
        self.send(Command::PublishQuestion(PublishQuestion { id, secs }))
    }

    pub fn answer_question(&self, id: QuestionId, answer: usize) -> Result<(), ClientError> {
        self.send(Command::AnswerQuestion(QuestionAnswer { id, answer }))
    }

    pub fn delete_question(&self, id: QuestionId) -> Result<(), ClientError> {
        self.send(Command::DeleteQuestion(id))
    }

    pub fn modify_question(&self, modification: QuestionModification) -> Result<(), ClientError> {
        self.send(Command::ModifyQuestion(modification))
    }

    fn send(&self, command: Command) -> Result<(), ClientError> {
        let lifecycle = self.inner.lock();
        match &lifecycle.handle {
            Some(handle) => handle.send(&command),
            None => {
                tracing::debug!("Rejecting {}: no connection", command.task());
                Err(ClientError::NotConnected)
            }
        }
    }
}

impl SessionInner {
    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn attach(&self) {
        let mut lifecycle = self.lock();
        lifecycle.observers += 1;
        if lifecycle.observers == 1 && lifecycle.handle.is_none() && !lifecycle.torn_down {
            lifecycle.handle = self.start();
        }
    }

    fn detach(&self) {
        let handle = {
            let mut lifecycle = self.lock();
            lifecycle.observers = lifecycle.observers.saturating_sub(1);
            if lifecycle.observers == 0 {
                lifecycle.handle.take()
            } else {
                None
            }
        };
        if let Some(handle) = handle {
            tracing::info!(
                "Last observer left room '{}', closing the connection",
                self.room_name
            );
            drop(handle);
        }
    }

    fn start(&self) -> Option<ConnectionHandle> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!("Cannot open the connection outside a Tokio runtime: {}", e);
                return None;
            }
        };

        let handshake = Command::RoomConnect(RoomConnectInfo {
            room_name: self.room_name.clone(),
            connection_type: self.connection_type,
        });
        Some(ConnectionHandle::open(
            &runtime,
            self.store.clone(),
            self.connector.clone(),
            self.url.clone(),
            handshake,
        ))
    }
}

/// Keeps the connection alive while held
pub struct SnapshotObserver {
    receiver: watch::Receiver<SessionSnapshot>,
    session: Arc<SessionInner>,
}

impl SnapshotObserver {
    /// Latest snapshot, marking it as seen
    pub fn current(&mut self) -> SessionSnapshot {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the next published snapshot
    pub async fn changed(&mut self) -> Option<SessionSnapshot> {
        self.receiver.changed().await.ok()?;
        Some(self.current())
    }

    /// Wait until the snapshot satisfies `predicate`; checks the current one first
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<SessionSnapshot>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        self.receiver
            .wait_for(&mut predicate)
            .await
            .ok()
            .map(|snapshot| snapshot.clone())
    }
}

impl Clone for SnapshotObserver {
    fn clone(&self) -> Self {
        self.session.attach();
        Self {
            receiver: self.receiver.clone(),
            session: self.session.clone(),
        }
    }
}

impl Drop for SnapshotObserver {
    fn drop(&mut self) {
        self.session.detach();
    }
}

/// Latest question publication; clears when the question is deleted
pub struct PublicationObserver {
    receiver: watch::Receiver<Option<QuestionPublication>>,
}

impl PublicationObserver {
    pub fn current(&mut self) -> Option<QuestionPublication> {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for the cell to change. `None` once the session is gone.
    pub async fn changed(&mut self) -> Option<Option<QuestionPublication>> {
        self.receiver.changed().await.ok()?;
        Some(self.current())
    }

    /// Wait for the next publication, skipping retractions
    pub async fn next_publication(&mut self) -> Option<QuestionPublication> {
        loop {
            if let Some(publication) = self.changed().await? {
                return Some(publication);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::TransportError,
        snapshot::{ConnectionStatus, CupTally},
        transport::{MemoryConnector, MemoryServer, MockConnector},
    };

    const URL: &str = "memory://cups/ws";

    fn memory_session(connection_type: ConnectionType) -> (Session, MemoryServer) {
        let (connector, server) = MemoryConnector::new();
        let session = Session::with_connector(Arc::new(connector), URL, "math", connection_type);
        (session, server)
    }

    async fn wait_open(observer: &mut SnapshotObserver) {
        observer
            .wait_for(|s| s.connection_status == ConnectionStatus::Connected)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_connection_without_observers() {
        // テスト項目: 購読者がいない間は接続しない
        // given (前提条件):
        let (session, server) = memory_session(ConnectionType::Student);

        // when (操作):
        let snapshot = session.snapshot();
        let _publications = session.publications();
        tokio::task::yield_now().await;

        // then (期待する結果):
        assert_eq!(server.connect_attempts(), 0);
        assert_eq!(snapshot.room_name(), "math");
        assert_eq!(snapshot.connection_status, ConnectionStatus::Disconnected);
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_first_observer_opens_with_handshake() {
        // テスト項目: 最初の購読で接続し、最初のフレームとして RoomConnect を送る
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Teacher);

        // when (操作):
        let mut observer = session.subscribe();
        let mut peer = server.accept().await.unwrap();
        wait_open(&mut observer).await;

        // then (期待する結果):
        assert_eq!(peer.url(), URL);
        assert_eq!(
            peer.recv().await.unwrap(),
            r#"{"task":"RoomConnect","payload":{"room_name":"math","connection_type":"Teacher"}}"#
        );
        assert_eq!(session.connection_state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_additional_observers_share_the_connection() {
        // テスト項目: 2 人目以降の購読者は同じ接続を共有する
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Student);
        let first = session.subscribe();
        let _peer = server.accept().await.unwrap();

        // when (操作):
        let second = session.subscribe();
        let third = first.clone();
        tokio::task::yield_now().await;

        // then (期待する結果):
        assert_eq!(session.observer_count(), 3);
        assert_eq!(server.connect_attempts(), 1);
        drop((first, second, third));
        assert_eq!(session.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_last_observer_leaving_closes() {
        // テスト項目: 最後の購読者が離れると接続が閉じ、データは残る
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Student);
        let mut observer = session.subscribe();
        let mut peer = server.accept().await.unwrap();
        peer.send_text(
            r#"{"kind":"RoomInfo","payload":{"connections":5,"green":1,"yellow":2,"red":0}}"#,
        );
        observer
            .wait_for(|s| s.connection_count == 5)
            .await
            .unwrap();

        // when (操作):
        drop(observer);

        // then (期待する結果):
        let snapshot = session.snapshot();
        assert_eq!(snapshot.connection_status, ConnectionStatus::Disconnected);
        assert_eq!(snapshot.connection_count, 5);
        assert_eq!(snapshot.cup_tally, CupTally::new(1, 2, 0));
        assert!(peer.recv().await.unwrap().contains("RoomConnect"));
        assert_eq!(peer.recv().await, None);
        assert!(matches!(
            session.choose_cup(CupColor::Red),
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_resubscribe_creates_a_new_connection() {
        // テスト項目: 再購読は古い接続の再試行ではなく、新しい接続を作る
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Student);
        let observer = session.subscribe();
        let _old_peer = server.accept().await.unwrap();
        drop(observer);

        // when (操作):
        let mut observer = session.subscribe();
        let mut new_peer = server.accept().await.unwrap();
        wait_open(&mut observer).await;

        // then (期待する結果):
        assert_eq!(server.connect_attempts(), 2);
        assert!(new_peer.recv().await.unwrap().contains("RoomConnect"));
        assert_eq!(session.connection_state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_room_info_scenario() {
        // テスト項目: RoomInfo を受信すると人数と集計がそのまま置き換わる
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Teacher);
        let mut observer = session.subscribe();
        let peer = server.accept().await.unwrap();

        // when (操作):
        peer.send_text(
            r#"{"kind":"RoomInfo","payload":{"connections":3,"green":2,"yellow":1,"red":0}}"#,
        );

        // then (期待する結果):
        let snapshot = observer
            .wait_for(|s| s.connection_count == 3)
            .await
            .unwrap();
        assert_eq!(snapshot.cup_tally, CupTally::new(2, 1, 0));
        assert_eq!(snapshot.connection_status, ConnectionStatus::Connected);
        assert_eq!(snapshot.error_message, None);
    }

    #[tokio::test]
    async fn test_error_then_room_info_scenario() {
        // テスト項目: サーバーのエラーは次のメッセージで解除される
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Student);
        let mut observer = session.subscribe();
        let peer = server.accept().await.unwrap();

        // when (操作):
        peer.send_text(r#"{"kind":"Error","payload":"room full"}"#);
        let errored = observer
            .wait_for(|s| s.error_message.is_some())
            .await
            .unwrap();
        peer.send_text(
            r#"{"kind":"RoomInfo","payload":{"connections":1,"green":0,"yellow":0,"red":1}}"#,
        );
        let recovered = observer
            .wait_for(|s| s.connection_count == 1)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(errored.connection_status, ConnectionStatus::Error);
        assert_eq!(errored.error_message.as_deref(), Some("room full"));
        assert_eq!(recovered.connection_status, ConnectionStatus::Connected);
        assert_eq!(recovered.error_message, None);
    }

    #[tokio::test]
    async fn test_malformed_payload_leaves_snapshot_identical() {
        // テスト項目: 不正なペイロードではスナップショットが一切変わらない
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Student);
        let mut publications = session.publications();
        let mut observer = session.subscribe();
        let peer = server.accept().await.unwrap();
        peer.send_text(
            r#"{"kind":"RoomInfo","payload":{"connections":2,"green":1,"yellow":1,"red":0}}"#,
        );
        let before = observer
            .wait_for(|s| s.connection_count == 2)
            .await
            .unwrap();

        // when (操作):
        peer.send_text(r#"{"kind":"RoomInfo","payload":{"connections":"many"}}"#);
        peer.send_text("[1, 2, 3]");
        peer.send_text(r#"{"kind":"Shrug","payload":null}"#);
        // 公開の到着を待てば、それより前のペイロードは処理済み
        peer.send_text(
            r#"{"kind":"QuestionPublication","payload":{"id":1,"title":"?","options":["a"],"secs":5}}"#,
        );
        publications.next_publication().await.unwrap();

        // then (期待する結果):
        assert_eq!(session.snapshot(), before);
        assert_eq!(session.connection_state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_command_while_disconnected_sends_nothing() {
        // テスト項目: 未接続でのコマンドは NotConnected になり、何も送られない
        // given (前提条件):
        let (session, server) = memory_session(ConnectionType::Student);

        // when (操作):
        let result = session.choose_cup(CupColor::Red);

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert_eq!(server.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_commands_reach_the_server() {
        // テスト項目: 接続中のコマンドはエンコードされてサーバーに届く
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Teacher);
        let mut observer = session.subscribe();
        let mut peer = server.accept().await.unwrap();
        wait_open(&mut observer).await;
        assert!(peer.recv().await.unwrap().contains("RoomConnect"));

        // when (操作):
        session
            .create_question(QuestionDefinition {
                title: "2 + 2?".to_string(),
                options: vec!["3".to_string(), "4".to_string()],
            })
            .unwrap();
        session.publish_question(QuestionId(1), 30).unwrap();
        session.answer_question(QuestionId(1), 1).unwrap();
        session.delete_question(QuestionId(1)).unwrap();
        session
            .modify_question(QuestionModification {
                id: QuestionId(2),
                title: Some("3 + 3?".to_string()),
                options: None,
            })
            .unwrap();
        session.choose_cup(CupColor::Yellow).unwrap();

        // then (期待する結果):
        let expected = [
            r#"{"task":"CreateQuestion","payload":{"title":"2 + 2?","options":["3","4"]}}"#,
            r#"{"task":"PublishQuestion","payload":{"id":1,"secs":30}}"#,
            r#"{"task":"AnswerQuestion","payload":{"id":1,"answer":1}}"#,
            r#"{"task":"DeleteQuestion","payload":1}"#,
            r#"{"task":"ModifyQuestion","payload":{"id":2,"title":"3 + 3?"}}"#,
            r#"{"task":"ChooseCup","payload":"Yellow"}"#,
        ];
        for frame in expected {
            assert_eq!(peer.recv().await.unwrap(), frame);
        }
    }

    #[tokio::test]
    async fn test_publications_are_observed_separately() {
        // テスト項目: 質問の公開は公開セルに届き、削除で取り消される
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Student);
        let mut publications = session.publications();
        let _observer = session.subscribe();
        let peer = server.accept().await.unwrap();

        // when (操作):
        peer.send_text(
            r#"{"kind":"QuestionPublication","payload":{"id":7,"title":"Capital of France?","options":["Paris","Rome"],"secs":20}}"#,
        );
        let published = publications.next_publication().await.unwrap();
        peer.send_text(r#"{"kind":"QuestionDelete","payload":7}"#);
        let retracted = publications.changed().await.unwrap();

        // then (期待する結果):
        assert_eq!(published.id, QuestionId(7));
        assert_eq!(published.options, vec!["Paris", "Rome"]);
        assert_eq!(published.secs, 20);
        assert_eq!(retracted, None);
        assert_eq!(session.snapshot().questions, None);
    }

    #[tokio::test]
    async fn test_close_tears_down_for_good() {
        // テスト項目: close 後は購読しても再接続せず、コマンドは失敗する
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Student);
        let mut observer = session.subscribe();
        let _peer = server.accept().await.unwrap();
        wait_open(&mut observer).await;

        // when (操作):
        session.close();
        let _late = session.subscribe();
        tokio::task::yield_now().await;

        // then (期待する結果):
        assert_eq!(server.connect_attempts(), 1);
        assert_eq!(
            session.snapshot().connection_status,
            ConnectionStatus::Disconnected
        );
        assert!(matches!(
            session.answer_question(QuestionId(1), 0),
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_retried() {
        // テスト項目: 接続失敗は Disconnected になり、購読者がいる間は再試行しない
        // given (前提条件):
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|_| Err(TransportError::Connect("refused".to_string())));
        let session = Session::with_connector(
            Arc::new(connector),
            URL,
            "math",
            ConnectionType::Student,
        );

        // when (操作):
        let mut observer = session.subscribe();
        let _second = session.subscribe();
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        // then (期待する結果):
        assert_eq!(
            observer.current().connection_status,
            ConnectionStatus::Disconnected
        );
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert!(!session.has_opened());
        assert!(matches!(
            session.choose_cup(CupColor::Green),
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_has_opened_survives_a_coalesced_disconnect() {
        // テスト項目: Connected のスナップショットを観測しないまま切断されても、接続済みだったことが分かる
        // given (前提条件):
        let (session, mut server) = memory_session(ConnectionType::Student);
        let mut observer = session.subscribe();
        let mut peer = server.accept().await.unwrap();
        assert!(peer.recv().await.unwrap().contains("RoomConnect"));

        // when (操作):
        peer.close();
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while session.connection_state() != ConnectionState::Disconnected {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        // then (期待する結果):
        assert!(session.has_opened());
        assert_eq!(
            observer.current().connection_status,
            ConnectionStatus::Disconnected
        );
    }

    #[test]
    fn test_subscribe_outside_runtime_stays_disconnected() {
        // テスト項目: Tokio ランタイム外での購読はパニックせず、接続もしない
        // given (前提条件):
        let (session, server) = memory_session(ConnectionType::Student);

        // when (操作):
        let mut observer = session.subscribe();

        // then (期待する結果):
        assert_eq!(server.connect_attempts(), 0);
        assert_eq!(
            observer.current().connection_status,
            ConnectionStatus::Disconnected
        );
    }
}
