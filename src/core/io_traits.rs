//! I/O traits for WebSocket channels and HTTP endpoints
//!
//! These traits abstract network operations, enabling the session, queue
//! and tournament state machines to be tested with mock implementations.

use super::error::{ApiError, ChannelError};
use super::protocol::ActionResponse;

// =============================================================================
// CHANNEL EVENTS
// =============================================================================

/// Events surfaced by a message channel, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Handshake completed, sends are now accepted
    Opened,
    /// One text frame
    Text(String),
    /// Closed by the peer or the network
    Closed { reason: Option<String> },
    /// Transport error; the channel is unusable afterwards
    Error(String),
}

// =============================================================================
// I/O TRAITS
// =============================================================================

/// A bidirectional JSON message channel (one WebSocket)
pub trait MessageChannel {
    fn is_open(&self) -> bool;

    /// Queue one text frame for sending
    fn send_text(&mut self, text: String) -> Result<(), ChannelError>;

    /// Poll for the next channel event (non-blocking)
    fn poll_event(&mut self) -> Option<ChannelEvent>;

    /// Close the channel; idempotent
    fn close(&mut self);
}

/// Opens channels on logical server paths (`/ws/queue/`, ...)
pub trait ChannelConnector {
    type Channel: MessageChannel;

    fn open(&mut self, path: &str) -> Result<Self::Channel, ChannelError>;
}

/// The mutating HTTP endpoints
pub trait ApiClient {
    /// POST `/matchmaking/`
    fn join_queue(&self) -> Result<ActionResponse, ApiError>;

    /// POST `/matchmaking/local_game/`
    fn start_local_game(&self) -> Result<ActionResponse, ApiError>;

    /// POST `/tournaments/join/{id}/`
    fn join_tournament(&self, tournament_id: &str) -> Result<ActionResponse, ApiError>;

    /// POST `/users/logout/`
    fn logout(&self) -> Result<ActionResponse, ApiError>;
}

/// Serialize and send one protocol message
pub fn send_json<C: MessageChannel, T: serde::Serialize>(
    channel: &mut C,
    msg: &T,
) -> Result<(), ChannelError> {
    if !channel.is_open() {
        return Err(ChannelError::NotOpen);
    }
    let text = serde_json::to_string(msg).map_err(|e| ChannelError::Send(e.to_string()))?;
    channel.send_text(text)
}

// =============================================================================
// MOCK IMPLEMENTATIONS FOR TESTING
// =============================================================================

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// State shared between a mock channel and the test holding its handle
    #[derive(Debug, Default)]
    pub struct MockChannelState {
        pub open: bool,
        pub events: VecDeque<ChannelEvent>,
        pub sent: Vec<String>,
        pub close_count: usize,
    }

    /// Test-side handle on a mock channel
    #[derive(Debug, Clone, Default)]
    pub struct MockChannelHandle(pub Rc<RefCell<MockChannelState>>);

    impl MockChannelHandle {
        pub fn push(&self, event: ChannelEvent) {
            self.0.borrow_mut().events.push_back(event);
        }

        /// Queue a server text frame
        pub fn push_text(&self, text: &str) {
            self.push(ChannelEvent::Text(text.to_string()));
        }

        /// Simulate the server closing the socket
        pub fn server_close(&self) {
            self.0.borrow_mut().open = false;
            self.push(ChannelEvent::Closed { reason: None });
        }

        pub fn set_open(&self, open: bool) {
            self.0.borrow_mut().open = open;
        }

        pub fn is_open(&self) -> bool {
            self.0.borrow().open
        }

        pub fn sent(&self) -> Vec<String> {
            self.0.borrow().sent.clone()
        }

        /// Sent frames decoded as JSON
        pub fn sent_json(&self) -> Vec<serde_json::Value> {
            self.0
                .borrow()
                .sent
                .iter()
                .filter_map(|s| serde_json::from_str(s).ok())
                .collect()
        }

        /// Number of sent frames with the given `type`
        pub fn sent_count(&self, msg_type: &str) -> usize {
            self.sent_json()
                .iter()
                .filter(|v| v["type"] == msg_type)
                .count()
        }

        pub fn clear_sent(&self) {
            self.0.borrow_mut().sent.clear();
        }

        pub fn close_count(&self) -> usize {
            self.0.borrow().close_count
        }
    }

    /// Mock channel backed by a shared state
    #[derive(Debug)]
    pub struct MockChannel {
        state: MockChannelHandle,
    }

    impl MockChannel {
        /// A channel that already completed its handshake
        pub fn opened() -> (Self, MockChannelHandle) {
            let handle = MockChannelHandle::default();
            handle.set_open(true);
            handle.push(ChannelEvent::Opened);
            (
                Self {
                    state: handle.clone(),
                },
                handle,
            )
        }
    }

    impl MessageChannel for MockChannel {
        fn is_open(&self) -> bool {
            self.state.is_open()
        }

        fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
            let mut state = self.state.0.borrow_mut();
            if !state.open {
                return Err(ChannelError::NotOpen);
            }
            state.sent.push(text);
            Ok(())
        }

        fn poll_event(&mut self) -> Option<ChannelEvent> {
            self.state.0.borrow_mut().events.pop_front()
        }

        fn close(&mut self) {
            let mut state = self.state.0.borrow_mut();
            state.open = false;
            state.close_count += 1;
        }
    }

    /// Mock connector recording every opened path
    #[derive(Debug, Default)]
    pub struct MockConnector {
        pub opened: Vec<(String, MockChannelHandle)>,
        /// Paths whose connect attempt fails
        pub failing: Vec<String>,
    }

    impl MockConnector {
        pub fn new() -> Self {
            Self::default()
        }

        /// Handle of the most recent channel opened on `path`
        pub fn handle(&self, path: &str) -> Option<MockChannelHandle> {
            self.opened
                .iter()
                .rev()
                .find(|(p, _)| p == path)
                .map(|(_, h)| h.clone())
        }

        pub fn open_count(&self, path: &str) -> usize {
            self.opened.iter().filter(|(p, _)| p == path).count()
        }
    }

    impl ChannelConnector for MockConnector {
        type Channel = MockChannel;

        fn open(&mut self, path: &str) -> Result<MockChannel, ChannelError> {
            if self.failing.iter().any(|p| p == path) {
                return Err(ChannelError::Connect(format!("refused: {}", path)));
            }
            let (channel, handle) = MockChannel::opened();
            self.opened.push((path.to_string(), handle));
            Ok(channel)
        }
    }

    /// Mock HTTP API with canned responses
    pub struct MockApi {
        pub queue_response: RefCell<Result<ActionResponse, ApiError>>,
        pub local_game_response: RefCell<Result<ActionResponse, ApiError>>,
        pub tournament_response: RefCell<Result<ActionResponse, ApiError>>,
        pub logout_response: RefCell<Result<ActionResponse, ApiError>>,
        /// Endpoint calls, in order
        pub calls: RefCell<Vec<String>>,
    }

    impl MockApi {
        /// Every endpoint answers with success
        pub fn new() -> Self {
            let ok = || {
                Ok(ActionResponse {
                    success: Some(true),
                    status: Some("success".to_string()),
                    ..Default::default()
                })
            };
            Self {
                queue_response: RefCell::new(ok()),
                local_game_response: RefCell::new(Ok(ActionResponse {
                    status: Some("success".to_string()),
                    session_id: Some("local-1".to_string()),
                    ..Default::default()
                })),
                tournament_response: RefCell::new(ok()),
                logout_response: RefCell::new(Ok(ActionResponse {
                    success: Some(true),
                    next_url: Some("/home/".to_string()),
                    ..Default::default()
                })),
                calls: RefCell::new(Vec::new()),
            }
        }

        /// Build a rejection body
        pub fn rejected(message: &str) -> Result<ActionResponse, ApiError> {
            Ok(ActionResponse {
                success: Some(false),
                status: Some("error".to_string()),
                message: Some(message.to_string()),
                ..Default::default()
            })
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Default for MockApi {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ApiClient for MockApi {
        fn join_queue(&self) -> Result<ActionResponse, ApiError> {
            self.calls.borrow_mut().push("join_queue".to_string());
            self.queue_response.borrow().clone()
        }

        fn start_local_game(&self) -> Result<ActionResponse, ApiError> {
            self.calls.borrow_mut().push("start_local_game".to_string());
            self.local_game_response.borrow().clone()
        }

        fn join_tournament(&self, tournament_id: &str) -> Result<ActionResponse, ApiError> {
            self.calls
                .borrow_mut()
                .push(format!("join_tournament:{}", tournament_id));
            self.tournament_response.borrow().clone()
        }

        fn logout(&self) -> Result<ActionResponse, ApiError> {
            self.calls.borrow_mut().push("logout".to_string());
            self.logout_response.borrow().clone()
        }
    }
}
