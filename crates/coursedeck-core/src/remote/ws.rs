//! WebSocket course store
//!
//! Maintains a long-lived connection to the document server. A background
//! task owns the socket; the store handle talks to it over a command channel.
//!
//! On disconnection the task reconnects with exponential backoff and
//! re-issues every live `watch`, so change feeds survive transient outages.
//! Requests in flight when the connection drops fail with
//! `StoreError::Disconnected`. A server error addressed to a subscription is
//! terminal for that feed. Feeds whose receiver was dropped are unwatched the
//! next time the task handles a command, and are never re-issued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::message::{decode_course, decode_courses, ClientMessage, ReqId, ServerMessage, SubId};
use super::{ChangeFeed, CourseStore, DocumentUpdate, COURSES_COLLECTION};
use crate::config::Config;
use crate::error::StoreError;
use crate::models::Course;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

type AllSender = mpsc::UnboundedSender<Result<Vec<Course>, StoreError>>;
type OneSender = mpsc::UnboundedSender<Result<Option<Course>, StoreError>>;

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected, waiting to retry
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Handshake done, serving requests
    Connected,
}

/// Configuration for the WebSocket store
#[derive(Debug, Clone)]
pub struct WsStoreConfig {
    /// WebSocket URL
    pub url: String,
    /// Initial reconnect delay
    pub initial_reconnect_delay: Duration,
    /// Maximum reconnect delay
    pub max_reconnect_delay: Duration,
    /// How long a request may wait for its answer
    pub request_timeout: Duration,
}

impl Default for WsStoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl WsStoreConfig {
    pub fn from_config(url: &str, config: &Config) -> Self {
        Self {
            url: url.to_string(),
            initial_reconnect_delay: config.initial_reconnect_delay(),
            max_reconnect_delay: config.max_reconnect_delay(),
            request_timeout: config.request_timeout(),
        }
    }
}

/// Where pushes for a subscription go
#[derive(Debug, Clone)]
enum FeedSink {
    All(AllSender),
    One(OneSender),
}

impl FeedSink {
    fn is_closed(&self) -> bool {
        match self {
            FeedSink::All(tx) => tx.is_closed(),
            FeedSink::One(tx) => tx.is_closed(),
        }
    }
}

/// Answer to a request
#[derive(Debug)]
enum Reply {
    Docs(Vec<Course>),
    Ack,
}

type ReplySender = oneshot::Sender<Result<Reply, StoreError>>;

/// Commands sent to the connection task
#[derive(Debug)]
enum Command {
    Watch {
        sub_id: SubId,
        doc_id: Option<String>,
        sink: FeedSink,
    },
    Request {
        req_id: ReqId,
        message: ClientMessage,
        reply: ReplySender,
    },
    /// The caller stopped waiting for a request
    Cancel {
        req_id: ReqId,
    },
    Shutdown,
}

/// Live subscriptions and outstanding requests, kept across reconnects
#[derive(Default)]
struct Registry {
    subs: HashMap<SubId, (Option<String>, FeedSink)>,
    pending: HashMap<ReqId, ReplySender>,
}

impl Registry {
    /// Forget subscriptions whose receiver is gone, returning their ids
    fn prune_closed(&mut self) -> Vec<SubId> {
        let closed: Vec<SubId> = self
            .subs
            .iter()
            .filter(|(_, (_, sink))| sink.is_closed())
            .map(|(sub_id, _)| *sub_id)
            .collect();
        for sub_id in &closed {
            self.subs.remove(sub_id);
        }
        if !closed.is_empty() {
            debug!("Dropping {} closed subscription(s)", closed.len());
        }
        closed
    }

    fn fail_pending(&mut self) {
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(StoreError::Disconnected));
        }
    }
}

/// Course store reached over a persistent WebSocket connection
pub struct WsCourseStore {
    command_tx: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<ConnectionStatus>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl WsCourseStore {
    /// Spawn the connection task and return a handle to it
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(config: WsStoreConfig) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let request_timeout = config.request_timeout;

        tokio::spawn(connection_loop(config, command_rx, status_tx));

        Self {
            command_tx,
            status_rx,
            next_id: AtomicU64::new(1),
            request_timeout,
        }
    }

    /// Get the current status
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Subscribe to status changes
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn send_command(&self, command: Command) -> Result<(), StoreError> {
        self.command_tx
            .send(command)
            .map_err(|_| StoreError::Disconnected)
    }

    async fn request(&self, build: impl FnOnce(ReqId) -> ClientMessage) -> Result<Reply, StoreError> {
        let req_id = self.next_id();
        let (reply, rx) = oneshot::channel();
        self.send_command(Command::Request {
            req_id,
            message: build(req_id),
            reply,
        })?;

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(StoreError::Disconnected),
            Err(_) => {
                let _ = self.command_tx.send(Command::Cancel { req_id });
                Err(StoreError::Timeout {
                    seconds: self.request_timeout.as_secs(),
                })
            }
        }
    }

    async fn get(&self, doc_id: Option<String>) -> Result<Vec<Course>, StoreError> {
        match self
            .request(|req_id| ClientMessage::Get { req_id, doc_id })
            .await?
        {
            Reply::Docs(docs) => Ok(docs),
            Reply::Ack => Err(StoreError::Protocol("expected result, got ack".to_string())),
        }
    }
}

impl Drop for WsCourseStore {
    fn drop(&mut self) {
        let _ = self.command_tx.send(Command::Shutdown);
    }
}

#[async_trait]
impl CourseStore for WsCourseStore {
    async fn get_all(&self) -> Result<Vec<Course>, StoreError> {
        self.get(None).await
    }

    async fn get_one(&self, course_id: &str) -> Result<Option<Course>, StoreError> {
        Ok(self.get(Some(course_id.to_string())).await?.into_iter().next())
    }

    async fn watch_all(&self) -> Result<ChangeFeed<Vec<Course>>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.send_command(Command::Watch {
            sub_id: self.next_id(),
            doc_id: None,
            sink: FeedSink::All(tx),
        })?;
        Ok(rx)
    }

    async fn watch_one(&self, course_id: &str) -> Result<ChangeFeed<Option<Course>>, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.send_command(Command::Watch {
            sub_id: self.next_id(),
            doc_id: Some(course_id.to_string()),
            sink: FeedSink::One(tx),
        })?;
        Ok(rx)
    }

    async fn update(&self, course_id: &str, update: DocumentUpdate) -> Result<(), StoreError> {
        let doc_id = course_id.to_string();
        match self
            .request(|req_id| ClientMessage::Update {
                req_id,
                doc_id,
                ops: update.fields,
            })
            .await?
        {
            Reply::Ack => Ok(()),
            Reply::Docs(_) => Err(StoreError::Protocol("expected ack, got result".to_string())),
        }
    }
}

/// Double the delay, capped at `max`
fn next_delay(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

/// Main connection loop with reconnection
async fn connection_loop(
    config: WsStoreConfig,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    status_tx: watch::Sender<ConnectionStatus>,
) {
    let client_id = format!("coursedeck-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let mut registry = Registry::default();
    let mut reconnect_delay = config.initial_reconnect_delay;

    loop {
        let _ = status_tx.send(ConnectionStatus::Connecting);

        match connect_and_serve(&config, &client_id, &mut registry, &mut command_rx, &status_tx)
            .await
        {
            Ok(true) => break,
            Ok(false) => {
                // Connection closed normally, reset backoff
                reconnect_delay = config.initial_reconnect_delay;
            }
            Err(e) => {
                warn!("Course store connection error: {}", e);
            }
        }

        registry.fail_pending();
        let _ = status_tx.send(ConnectionStatus::Disconnected);
        debug!("Reconnecting in {:?}", reconnect_delay);

        // Wait before reconnecting; requests made meanwhile fail fast
        let sleep = tokio::time::sleep(reconnect_delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => {
                    reconnect_delay = next_delay(reconnect_delay, config.max_reconnect_delay);
                    break;
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) | None => {
                            let _ = status_tx.send(ConnectionStatus::Disconnected);
                            return;
                        }
                        Some(Command::Watch { sub_id, doc_id, sink }) => {
                            // Issued once connected
                            registry.subs.insert(sub_id, (doc_id, sink));
                        }
                        Some(Command::Request { reply, .. }) => {
                            let _ = reply.send(Err(StoreError::Disconnected));
                        }
                        Some(Command::Cancel { .. }) => {}
                    }
                }
            }
        }
    }

    let _ = status_tx.send(ConnectionStatus::Disconnected);
}

/// Connect and serve commands until disconnection or shutdown
///
/// Returns `Ok(true)` on shutdown, `Ok(false)` when the server closed.
async fn connect_and_serve(
    config: &WsStoreConfig,
    client_id: &str,
    registry: &mut Registry,
    command_rx: &mut mpsc::UnboundedReceiver<Command>,
    status_tx: &watch::Sender<ConnectionStatus>,
) -> Result<bool, StoreError> {
    let (ws_stream, _) = connect_async(config.url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    send_message(&mut write, &ClientMessage::hello(client_id, COURSES_COLLECTION)).await?;
    let server_id = wait_for_welcome(&mut read, config.request_timeout).await?;

    info!("Connected to course store {} ({})", config.url, server_id);
    let _ = status_tx.send(ConnectionStatus::Connected);

    // Re-issue subscriptions that outlived the previous connection
    registry.prune_closed();
    let live: Vec<(SubId, Option<String>)> = registry
        .subs
        .iter()
        .map(|(sub_id, (doc_id, _))| (*sub_id, doc_id.clone()))
        .collect();
    for (sub_id, doc_id) in live {
        send_message(&mut write, &ClientMessage::Watch { sub_id, doc_id }).await?;
    }

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                match cmd {
                    Some(Command::Watch { sub_id, doc_id, sink }) => {
                        registry.subs.insert(sub_id, (doc_id.clone(), sink));
                        send_message(&mut write, &ClientMessage::Watch { sub_id, doc_id }).await?;
                    }
                    Some(Command::Request { req_id, message, reply }) => {
                        registry.pending.insert(req_id, reply);
                        send_message(&mut write, &message).await?;
                    }
                    Some(Command::Cancel { req_id }) => {
                        registry.pending.remove(&req_id);
                    }
                    Some(Command::Shutdown) | None => {
                        write.close().await.ok();
                        return Ok(true);
                    }
                }
                for sub_id in registry.prune_closed() {
                    send_message(&mut write, &ClientMessage::Unwatch { sub_id }).await?;
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => match ServerMessage::decode(&data) {
                        Ok(message) => {
                            for sub_id in handle_server_message(registry, message) {
                                send_message(&mut write, &ClientMessage::Unwatch { sub_id }).await?;
                            }
                        }
                        Err(e) => warn!("Failed to decode store message: {}", e),
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(false),
                    Some(Err(e)) => return Err(e.into()),
                    _ => {}
                }
            }
        }
    }
}

/// Route a server message to its feed or request
///
/// Returns subscriptions whose receiver is gone and should be unwatched.
fn handle_server_message(registry: &mut Registry, message: ServerMessage) -> Vec<SubId> {
    let mut dropped = Vec::new();

    match message {
        ServerMessage::Snapshot { sub_id, docs } => {
            if let Some((_, FeedSink::All(tx))) = registry.subs.get(&sub_id) {
                if tx.send(Ok(decode_courses(docs))).is_err() {
                    registry.subs.remove(&sub_id);
                    dropped.push(sub_id);
                }
            }
        }
        ServerMessage::Document { sub_id, doc } => {
            if let Some((_, FeedSink::One(tx))) = registry.subs.get(&sub_id) {
                let doc = match doc {
                    Some(doc) => match decode_course(doc) {
                        Some(course) => Some(course),
                        // Keep the last good state
                        None => return dropped,
                    },
                    None => None,
                };
                if tx.send(Ok(doc)).is_err() {
                    registry.subs.remove(&sub_id);
                    dropped.push(sub_id);
                }
            }
        }
        ServerMessage::Result { req_id, docs } => {
            if let Some(reply) = registry.pending.remove(&req_id) {
                let _ = reply.send(Ok(Reply::Docs(decode_courses(docs))));
            }
        }
        ServerMessage::Ack { req_id } => {
            if let Some(reply) = registry.pending.remove(&req_id) {
                let _ = reply.send(Ok(Reply::Ack));
            }
        }
        ServerMessage::Error {
            req_id,
            sub_id,
            code,
            message,
        } => {
            let error = StoreError::from_code(&code, message);
            if let Some(reply) = req_id.and_then(|id| registry.pending.remove(&id)) {
                let _ = reply.send(Err(error.clone()));
            }
            // Terminal for the subscription
            if let Some((_, sink)) = sub_id.and_then(|id| registry.subs.remove(&id)) {
                warn!("Subscription closed by store: {}", error);
                match sink {
                    FeedSink::All(tx) => {
                        let _ = tx.send(Err(error));
                    }
                    FeedSink::One(tx) => {
                        let _ = tx.send(Err(error));
                    }
                }
            }
        }
        ServerMessage::Welcome { .. } => {}
    }

    dropped
}

/// Wait for the handshake response
async fn wait_for_welcome(read: &mut WsRead, timeout: Duration) -> Result<String, StoreError> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return Err(StoreError::Timeout {
                seconds: timeout.as_secs(),
            });
        }

        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => match ServerMessage::decode(&data) {
                        Ok(ServerMessage::Welcome { server_id }) => return Ok(server_id),
                        Ok(ServerMessage::Error { code, message, .. }) => {
                            return Err(StoreError::from_code(&code, message));
                        }
                        _ => {}
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(StoreError::Transport(
                            "store closed connection during handshake".to_string(),
                        ));
                    }
                    Some(Err(e)) => return Err(e.into()),
                    _ => {}
                }
            }
            _ = tokio::time::sleep(remaining) => {
                return Err(StoreError::Timeout { seconds: timeout.as_secs() });
            }
        }
    }
}

async fn send_message(write: &mut WsWrite, message: &ClientMessage) -> Result<(), StoreError> {
    let bytes = message
        .encode()
        .map_err(|e| StoreError::Protocol(e.to_string()))?;
    write.send(Message::Binary(bytes)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn course_doc(id: &str, name: &str) -> serde_json::Value {
        serde_json::to_value(Course::new(id, name)).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = WsStoreConfig::default();
        assert_eq!(config.initial_reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_next_delay_is_capped() {
        let max = Duration::from_secs(30);
        assert_eq!(next_delay(Duration::from_secs(1), max), Duration::from_secs(2));
        assert_eq!(next_delay(Duration::from_secs(20), max), max);
    }

    #[test]
    fn test_snapshot_routed_to_feed() {
        let mut registry = Registry::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.subs.insert(1, (None, FeedSink::All(tx)));

        let dropped = handle_server_message(
            &mut registry,
            ServerMessage::Snapshot {
                sub_id: 1,
                docs: vec![
                    course_doc("c1", "Algorithms"),
                    json!({"id": "c2", "syllabus": [{"week": 1, "content": "cells"}]}),
                ],
            },
        );

        assert!(dropped.is_empty());
        let courses = rx.try_recv().unwrap().unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].id, "c1");
    }

    #[test]
    fn test_malformed_document_keeps_last_state() {
        let mut registry = Registry::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry
            .subs
            .insert(3, (Some("c2".to_string()), FeedSink::One(tx)));

        handle_server_message(
            &mut registry,
            ServerMessage::Document {
                sub_id: 3,
                doc: Some(json!({"id": "c2", "syllabus": [{"week": 1}]})),
            },
        );

        assert!(rx.try_recv().is_err());
        assert!(registry.subs.contains_key(&3));
    }

    #[test]
    fn test_prune_closed_subscriptions() {
        let mut registry = Registry::default();
        let (live_tx, _live_rx) = mpsc::unbounded_channel();
        registry.subs.insert(1, (None, FeedSink::All(live_tx)));
        for sub_id in 2..7 {
            let (tx, rx) = mpsc::unbounded_channel();
            drop(rx);
            registry
                .subs
                .insert(sub_id, (Some(format!("c{}", sub_id)), FeedSink::One(tx)));
        }

        let mut closed = registry.prune_closed();
        closed.sort();

        assert_eq!(closed, vec![2, 3, 4, 5, 6]);
        assert_eq!(registry.subs.len(), 1);
        assert!(registry.subs.contains_key(&1));
    }

    #[test]
    fn test_dropped_feed_is_unwatched() {
        let mut registry = Registry::default();
        let (tx, rx) = mpsc::unbounded_channel();
        registry
            .subs
            .insert(5, (Some("c1".to_string()), FeedSink::One(tx)));
        drop(rx);

        let dropped = handle_server_message(
            &mut registry,
            ServerMessage::Document { sub_id: 5, doc: None },
        );

        assert_eq!(dropped, vec![5]);
        assert!(registry.subs.is_empty());
    }

    #[test]
    fn test_subscription_error_is_terminal() {
        let mut registry = Registry::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry
            .subs
            .insert(2, (Some("c1".to_string()), FeedSink::One(tx)));

        handle_server_message(
            &mut registry,
            ServerMessage::Error {
                req_id: None,
                sub_id: Some(2),
                code: "permission-denied".to_string(),
                message: "revoked".to_string(),
            },
        );

        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(StoreError::PermissionDenied(_))
        ));
        assert!(registry.subs.is_empty());
    }

    #[test]
    fn test_ack_resolves_pending_request() {
        let mut registry = Registry::default();
        let (reply, mut rx) = oneshot::channel();
        registry.pending.insert(9, reply);

        handle_server_message(&mut registry, ServerMessage::Ack { req_id: 9 });

        assert!(matches!(rx.try_recv().unwrap(), Ok(Reply::Ack)));
    }

    #[test]
    fn test_fail_pending() {
        let mut registry = Registry::default();
        let (reply, mut rx) = oneshot::channel();
        registry.pending.insert(1, reply);

        registry.fail_pending();

        assert!(matches!(rx.try_recv().unwrap(), Err(StoreError::Disconnected)));
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_requests() {
        let store = WsCourseStore::connect(WsStoreConfig {
            url: "ws://127.0.0.1:9".to_string(),
            initial_reconnect_delay: Duration::from_millis(50),
            max_reconnect_delay: Duration::from_millis(100),
            request_timeout: Duration::from_secs(5),
        });

        let result = store.get_all().await;
        assert!(result.unwrap_err().is_transient());
        assert_ne!(store.status(), ConnectionStatus::Connected);
    }

    /// What a test server connection should do next
    #[derive(Debug)]
    enum Frame {
        Send(ServerMessage),
        Close,
    }

    /// Minimal document server: answers the handshake and hands every other
    /// client message to the test
    struct TestServer {
        url: String,
        inbox: mpsc::UnboundedReceiver<(usize, ClientMessage)>,
        conns: mpsc::UnboundedReceiver<mpsc::UnboundedSender<Frame>>,
    }

    impl TestServer {
        async fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("ws://{}", listener.local_addr().unwrap());
            let (inbox_tx, inbox) = mpsc::unbounded_channel();
            let (conns_tx, conns) = mpsc::unbounded_channel();

            tokio::spawn(async move {
                let mut index = 0;
                while let Ok((stream, _)) = listener.accept().await {
                    let Ok(ws) = accept_async(stream).await else {
                        continue;
                    };
                    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
                    let _ = conns_tx.send(frame_tx);
                    tokio::spawn(serve_connection(index, ws, inbox_tx.clone(), frame_rx));
                    index += 1;
                }
            });

            Self { url, inbox, conns }
        }

        fn store(&self, request_timeout: Duration) -> WsCourseStore {
            WsCourseStore::connect(WsStoreConfig {
                url: self.url.clone(),
                initial_reconnect_delay: Duration::from_millis(300),
                max_reconnect_delay: Duration::from_secs(1),
                request_timeout,
            })
        }

        async fn next_connection(&mut self) -> mpsc::UnboundedSender<Frame> {
            tokio::time::timeout(Duration::from_secs(5), self.conns.recv())
                .await
                .unwrap()
                .unwrap()
        }

        async fn next_message(&mut self) -> (usize, ClientMessage) {
            tokio::time::timeout(Duration::from_secs(5), self.inbox.recv())
                .await
                .unwrap()
                .unwrap()
        }

        /// Next message on connection `index`, skipping older connections
        async fn next_message_on(&mut self, index: usize) -> ClientMessage {
            loop {
                let (from, message) = self.next_message().await;
                if from == index {
                    return message;
                }
            }
        }
    }

    async fn serve_connection(
        index: usize,
        ws: WebSocketStream<TcpStream>,
        inbox: mpsc::UnboundedSender<(usize, ClientMessage)>,
        mut frames: mpsc::UnboundedReceiver<Frame>,
    ) {
        let (mut write, mut read) = ws.split();
        loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Binary(data))) => {
                        let Ok(message) = ciborium::from_reader::<ClientMessage, _>(data.as_slice()) else {
                            continue;
                        };
                        if let ClientMessage::Hello { .. } = message {
                            let welcome = ServerMessage::Welcome { server_id: "test".to_string() };
                            let _ = write.send(encode(&welcome)).await;
                        } else {
                            let _ = inbox.send((index, message));
                        }
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                },
                frame = frames.recv() => match frame {
                    Some(Frame::Send(message)) => {
                        let _ = write.send(encode(&message)).await;
                    }
                    Some(Frame::Close) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                },
            }
        }
    }

    fn encode(message: &ServerMessage) -> Message {
        let mut bytes = Vec::new();
        ciborium::into_writer(message, &mut bytes).unwrap();
        Message::Binary(bytes)
    }

    async fn wait_for_status(store: &WsCourseStore, wanted: ConnectionStatus) {
        let mut status = store.subscribe_status();
        tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| *s == wanted))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_rewatches_live_feeds_only() {
        let mut server = TestServer::start().await;
        let store = Arc::new(server.store(Duration::from_secs(5)));

        let _catalog = store.watch_all().await.unwrap();
        for id in ["c1", "c2", "c3", "c4", "c5"] {
            drop(store.watch_one(id).await.unwrap());
        }

        let first = server.next_connection().await;
        let mut catalog_sub = None;
        let mut watches = 0;
        while watches < 6 {
            if let (0, ClientMessage::Watch { sub_id, doc_id }) = server.next_message().await {
                watches += 1;
                if doc_id.is_none() {
                    catalog_sub = Some(sub_id);
                }
            }
        }

        first.send(Frame::Close).unwrap();
        let second = server.next_connection().await;

        // Only the live catalog feed is watched again
        let message = server.next_message_on(1).await;
        assert_eq!(
            message,
            ClientMessage::Watch {
                sub_id: catalog_sub.unwrap(),
                doc_id: None,
            }
        );

        let request = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_all().await }
        });
        let message = server.next_message_on(1).await;
        let ClientMessage::Get { req_id, doc_id: None } = message else {
            panic!("expected get after the re-watch");
        };

        second
            .send(Frame::Send(ServerMessage::Result {
                req_id,
                docs: vec![course_doc("c1", "Algorithms")],
            }))
            .unwrap();
        assert_eq!(request.await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_feed_is_unwatched_on_next_command() {
        let mut server = TestServer::start().await;
        let store = server.store(Duration::from_secs(5));

        let feed = store.watch_one("c1").await.unwrap();
        let _connection = server.next_connection().await;
        let (_, message) = server.next_message().await;
        let ClientMessage::Watch { sub_id, .. } = message else {
            panic!("expected watch");
        };

        drop(feed);
        let _catalog = store.watch_all().await.unwrap();

        let (_, message) = server.next_message().await;
        assert!(matches!(message, ClientMessage::Watch { doc_id: None, .. }));
        let (_, message) = server.next_message().await;
        assert_eq!(message, ClientMessage::Unwatch { sub_id });
    }

    #[tokio::test]
    async fn test_pending_request_fails_when_connection_drops() {
        let mut server = TestServer::start().await;
        let store = Arc::new(server.store(Duration::from_secs(5)));

        let connection = server.next_connection().await;
        let request = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_one("c1").await }
        });

        let (_, message) = server.next_message().await;
        assert!(matches!(message, ClientMessage::Get { .. }));
        connection.send(Frame::Close).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), request)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(StoreError::Disconnected)));
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out() {
        let mut server = TestServer::start().await;
        let store = Arc::new(server.store(Duration::from_millis(300)));

        let connection = server.next_connection().await;
        let request = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_all().await }
        });
        let (_, message) = server.next_message().await;
        let ClientMessage::Get { req_id: late_id, .. } = message else {
            panic!("expected get");
        };

        let result = request.await.unwrap();
        assert!(matches!(result, Err(StoreError::Timeout { .. })));

        // A late answer is ignored; the next request still gets its own
        connection
            .send(Frame::Send(ServerMessage::Result {
                req_id: late_id,
                docs: vec![course_doc("late", "Late")],
            }))
            .unwrap();
        let request = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_all().await }
        });
        let (_, message) = server.next_message().await;
        let ClientMessage::Get { req_id, .. } = message else {
            panic!("expected get");
        };
        connection
            .send(Frame::Send(ServerMessage::Result {
                req_id,
                docs: vec![course_doc("c1", "Algorithms")],
            }))
            .unwrap();

        let courses = request.await.unwrap().unwrap();
        assert_eq!(courses[0].id, "c1");
    }

    #[tokio::test]
    async fn test_watch_while_disconnected_is_queued() {
        let mut server = TestServer::start().await;
        let store = server.store(Duration::from_secs(5));

        let first = server.next_connection().await;
        wait_for_status(&store, ConnectionStatus::Connected).await;
        first.send(Frame::Close).unwrap();
        wait_for_status(&store, ConnectionStatus::Disconnected).await;

        let mut feed = store.watch_all().await.unwrap();

        let second = server.next_connection().await;
        let message = server.next_message_on(1).await;
        let ClientMessage::Watch { sub_id, doc_id: None } = message else {
            panic!("expected watch");
        };

        second
            .send(Frame::Send(ServerMessage::Snapshot {
                sub_id,
                docs: vec![course_doc("c1", "Algorithms")],
            }))
            .unwrap();
        let courses = tokio::time::timeout(Duration::from_secs(5), feed.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(courses[0].name, "Algorithms");
        assert_eq!(store.status(), ConnectionStatus::Connected);
    }
}
