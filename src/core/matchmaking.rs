//! Matchmaking queue client
//!
//! Joining is a two-step affair: the HTTP endpoint registers the player in
//! the queue, then the `/ws/queue/` channel waits for `game_matched`. The
//! session id it carries is handed to the coordinator, which opens the game.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::constants::{QUEUE_TIMER_INTERVAL, QUEUE_WS_PATH};
use super::error::{ApiError, ClientError};
use super::format::format_elapsed;
use super::io_traits::{send_json, ApiClient, ChannelConnector, ChannelEvent, MessageChannel};
use super::protocol::{decode, ActionResponse, QueueClientMessage, QueueServerMessage};
use super::traits::Navigator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueTicket {
    NotQueued,
    Queued { since: Instant },
    Matched { session_id: String },
}

/// Result of draining the queue channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOutcome {
    /// Opponent found, open this game session
    Matched(String),
    /// Channel closed while waiting
    Dropped,
}

pub struct MatchmakingClient<Ch: MessageChannel> {
    channel: Option<Ch>,
    ticket: QueueTicket,
    queue_ui_visible: bool,
    last_timer_refresh: Option<Instant>,
}

impl<Ch: MessageChannel> Default for MatchmakingClient<Ch> {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a response body into a result, notifying the user on rejection
fn accept<N: Navigator + ?Sized>(
    response: Result<ActionResponse, ApiError>,
    nav: &mut N,
    what: &str,
) -> Result<ActionResponse, ClientError> {
    let response = response.map_err(|e| {
        error!(error = %e, "[QUEUE] {} request failed", what);
        ClientError::from(e)
    })?;
    if !response.is_success() {
        let message = response.failure_message();
        warn!(message = %message, "[QUEUE] {} rejected", what);
        nav.notify(&message);
        return Err(ClientError::Rejected(message));
    }
    Ok(response)
}

impl<Ch: MessageChannel> MatchmakingClient<Ch> {
    pub fn new() -> Self {
        Self {
            channel: None,
            ticket: QueueTicket::NotQueued,
            queue_ui_visible: false,
            last_timer_refresh: None,
        }
    }

    pub fn ticket(&self) -> &QueueTicket {
        &self.ticket
    }

    pub fn is_queued(&self) -> bool {
        matches!(self.ticket, QueueTicket::Queued { .. })
    }

    pub fn is_channel_open(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_open())
    }

    pub fn join<C, A, N>(
        &mut self,
        connector: &mut C,
        api: &A,
        nav: &mut N,
        now: Instant,
    ) -> Result<(), ClientError>
    where
        C: ChannelConnector<Channel = Ch>,
        A: ApiClient + ?Sized,
        N: Navigator + ?Sized,
    {
        accept(api.join_queue(), nav, "Join queue")?;

        if !self.is_channel_open() {
            let channel = connector.open(QUEUE_WS_PATH).map_err(|e| {
                error!(error = %e, "[QUEUE] Failed to open queue channel");
                e
            })?;
            self.channel = Some(channel);
        }

        self.ticket = QueueTicket::Queued { since: now };
        nav.show_queue();
        nav.update_queue_timer(&format_elapsed(std::time::Duration::ZERO));
        self.queue_ui_visible = true;
        self.last_timer_refresh = Some(now);
        info!("[QUEUE] Joined matchmaking queue");
        Ok(())
    }

    /// Leave the queue. Only possible while the queue channel is open.
    pub fn cancel<N: Navigator + ?Sized>(&mut self, nav: &mut N) -> bool {
        let Some(channel) = self.channel.as_mut().filter(|c| c.is_open()) else {
            error!("[QUEUE] Cannot leave queue: channel not connected");
            return false;
        };
        if let Err(e) = send_json(channel, &QueueClientMessage::LeaveMessage) {
            error!(error = %e, "[QUEUE] Failed to send leave message");
            return false;
        }
        info!("[QUEUE] Leaving queue");
        self.ticket = QueueTicket::NotQueued;
        self.hide_ui(nav);
        true
    }

    /// Create a local game. Returns its session id.
    pub fn start_local_game<A, N>(&mut self, api: &A, nav: &mut N) -> Result<String, ClientError>
    where
        A: ApiClient + ?Sized,
        N: Navigator + ?Sized,
    {
        let response = accept(api.start_local_game(), nav, "Local game")?;
        let session_id = response.session_id.ok_or_else(|| {
            error!("[QUEUE] Local game response without session_id");
            ClientError::Api(ApiError::Decode("missing session_id".to_string()))
        })?;
        info!(session = %session_id, "[QUEUE] Local game created");
        Ok(session_id)
    }

    /// Drain the queue channel
    pub fn poll<N: Navigator + ?Sized>(&mut self, nav: &mut N) -> Option<QueueOutcome> {
        loop {
            let event = self.channel.as_mut()?.poll_event()?;
            match event {
                ChannelEvent::Opened => debug!("[QUEUE] Channel open"),
                ChannelEvent::Text(text) => {
                    match decode::<QueueServerMessage>("queue", &text) {
                        Some(QueueServerMessage::GameMatched { session_id }) => {
                            info!(session = %session_id, "[QUEUE] Game matched");
                            self.hide_ui(nav);
                            self.close_channel();
                            self.ticket = QueueTicket::Matched {
                                session_id: session_id.clone(),
                            };
                            return Some(QueueOutcome::Matched(session_id));
                        }
                        Some(QueueServerMessage::Unknown) => {
                            debug!("[QUEUE] Ignoring unknown message type");
                        }
                        None => {}
                    }
                }
                ChannelEvent::Closed { reason } => {
                    info!(reason = ?reason, "[QUEUE] Channel closed");
                    return self.on_channel_lost(nav);
                }
                ChannelEvent::Error(e) => {
                    error!(error = %e, "[QUEUE] Channel error");
                    return self.on_channel_lost(nav);
                }
            }
        }
    }

    fn on_channel_lost<N: Navigator + ?Sized>(&mut self, nav: &mut N) -> Option<QueueOutcome> {
        self.channel = None;
        let was_queued = self.is_queued();
        if was_queued {
            self.ticket = QueueTicket::NotQueued;
        }
        self.hide_ui(nav);
        was_queued.then_some(QueueOutcome::Dropped)
    }

    /// Refresh the elapsed-time counter, once a second
    pub fn tick_timer<N: Navigator + ?Sized>(&mut self, nav: &mut N, now: Instant) {
        let QueueTicket::Queued { since } = self.ticket else {
            return;
        };
        if !self.queue_ui_visible {
            return;
        }
        let due = self
            .last_timer_refresh
            .map(|t| now.saturating_duration_since(t) >= QUEUE_TIMER_INTERVAL)
            .unwrap_or(true);
        if due {
            self.last_timer_refresh = Some(now);
            nav.update_queue_timer(&format_elapsed(now.saturating_duration_since(since)));
        }
    }

    /// Drop the ticket and the channel without notifying the server
    pub fn shutdown<N: Navigator + ?Sized>(&mut self, nav: &mut N) {
        self.close_channel();
        self.ticket = QueueTicket::NotQueued;
        self.hide_ui(nav);
    }

    fn hide_ui<N: Navigator + ?Sized>(&mut self, nav: &mut N) {
        if self.queue_ui_visible {
            nav.hide_queue();
            self.queue_ui_visible = false;
            self.last_timer_refresh = None;
        }
    }

    fn close_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io_traits::mocks::{MockApi, MockChannel, MockConnector};
    use crate::core::traits::mocks::{MockNavigator, NavCall};
    use std::time::Duration;

    fn joined(
        connector: &mut MockConnector,
        nav: &mut MockNavigator,
        now: Instant,
    ) -> MatchmakingClient<MockChannel> {
        let mut client = MatchmakingClient::new();
        client.join(connector, &MockApi::new(), nav, now).unwrap();
        client
    }

    #[test]
    fn test_join_opens_channel_and_shows_queue() {
        let t0 = Instant::now();
        let mut connector = MockConnector::new();
        let mut nav = MockNavigator::new();
        let client = joined(&mut connector, &mut nav, t0);

        assert_eq!(client.ticket(), &QueueTicket::Queued { since: t0 });
        assert_eq!(connector.open_count(QUEUE_WS_PATH), 1);
        assert_eq!(nav.count(&NavCall::ShowQueue), 1);
        assert_eq!(nav.count(&NavCall::QueueTimer("00:00".to_string())), 1);
    }

    #[test]
    fn test_join_rejected_notifies_without_state_change() {
        let mut connector = MockConnector::new();
        let mut nav = MockNavigator::new();
        let api = MockApi::new();
        *api.queue_response.borrow_mut() = MockApi::rejected("User already in queue");

        let mut client: MatchmakingClient<MockChannel> = MatchmakingClient::new();
        let result = client.join(&mut connector, &api, &mut nav, Instant::now());

        assert_eq!(
            result,
            Err(ClientError::Rejected("User already in queue".to_string()))
        );
        assert_eq!(nav.notifications(), vec!["User already in queue".to_string()]);
        assert_eq!(client.ticket(), &QueueTicket::NotQueued);
        assert_eq!(connector.open_count(QUEUE_WS_PATH), 0);
    }

    #[test]
    fn test_join_reuses_open_channel() {
        let t0 = Instant::now();
        let mut connector = MockConnector::new();
        let mut nav = MockNavigator::new();
        let mut client = joined(&mut connector, &mut nav, t0);
        assert!(client.cancel(&mut nav));
        client
            .join(&mut connector, &MockApi::new(), &mut nav, t0)
            .unwrap();
        assert_eq!(connector.open_count(QUEUE_WS_PATH), 1);
    }

    #[test]
    fn test_game_matched_hides_queue_once_and_closes() {
        let t0 = Instant::now();
        let mut connector = MockConnector::new();
        let mut nav = MockNavigator::new();
        let mut client = joined(&mut connector, &mut nav, t0);
        let handle = connector.handle(QUEUE_WS_PATH).unwrap();

        handle.push_text(r#"{"type":"game_matched","session_id":"s1"}"#);
        handle.push_text(r#"{"type":"game_matched","session_id":"s1"}"#);
        assert_eq!(
            client.poll(&mut nav),
            Some(QueueOutcome::Matched("s1".to_string()))
        );
        assert_eq!(client.poll(&mut nav), None);

        assert_eq!(nav.count(&NavCall::HideQueue), 1);
        assert_eq!(handle.close_count(), 1);
        assert!(!client.is_channel_open());
        assert_eq!(
            client.ticket(),
            &QueueTicket::Matched {
                session_id: "s1".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_queue_message_ignored() {
        let t0 = Instant::now();
        let mut connector = MockConnector::new();
        let mut nav = MockNavigator::new();
        let mut client = joined(&mut connector, &mut nav, t0);
        let handle = connector.handle(QUEUE_WS_PATH).unwrap();
        handle.push_text(r#"{"type":"queue_position","position":3}"#);
        assert_eq!(client.poll(&mut nav), None);
        assert!(client.is_queued());
    }

    #[test]
    fn test_cancel_without_channel_is_noop() {
        let mut nav = MockNavigator::new();
        let mut client: MatchmakingClient<MockChannel> = MatchmakingClient::new();
        assert!(!client.cancel(&mut nav));
        assert!(nav.calls.is_empty());
        assert_eq!(client.ticket(), &QueueTicket::NotQueued);
    }

    #[test]
    fn test_cancel_sends_leave_and_hides_ui() {
        let t0 = Instant::now();
        let mut connector = MockConnector::new();
        let mut nav = MockNavigator::new();
        let mut client = joined(&mut connector, &mut nav, t0);
        let handle = connector.handle(QUEUE_WS_PATH).unwrap();

        assert!(client.cancel(&mut nav));
        assert_eq!(handle.sent(), vec![r#"{"type":"leave_message"}"#.to_string()]);
        assert_eq!(nav.count(&NavCall::HideQueue), 1);
        assert!(!client.is_queued());
    }

    #[test]
    fn test_close_while_queued_drops_ticket() {
        let t0 = Instant::now();
        let mut connector = MockConnector::new();
        let mut nav = MockNavigator::new();
        let mut client = joined(&mut connector, &mut nav, t0);
        connector.handle(QUEUE_WS_PATH).unwrap().server_close();

        assert_eq!(client.poll(&mut nav), Some(QueueOutcome::Dropped));
        assert_eq!(client.ticket(), &QueueTicket::NotQueued);
        assert_eq!(nav.count(&NavCall::HideQueue), 1);
    }

    #[test]
    fn test_queue_timer_refresh_each_second() {
        let t0 = Instant::now();
        let mut connector = MockConnector::new();
        let mut nav = MockNavigator::new();
        let mut client = joined(&mut connector, &mut nav, t0);

        client.tick_timer(&mut nav, t0 + Duration::from_millis(500));
        client.tick_timer(&mut nav, t0 + Duration::from_millis(1000));
        client.tick_timer(&mut nav, t0 + Duration::from_millis(1500));
        client.tick_timer(&mut nav, t0 + Duration::from_secs(65));

        let timers: Vec<_> = nav
            .calls
            .iter()
            .filter_map(|c| match c {
                NavCall::QueueTimer(t) => Some(t.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(timers, vec!["00:00", "00:01", "01:05"]);
    }

    #[test]
    fn test_local_game_returns_session_id() {
        let mut nav = MockNavigator::new();
        let mut client: MatchmakingClient<MockChannel> = MatchmakingClient::new();
        let id = client.start_local_game(&MockApi::new(), &mut nav).unwrap();
        assert_eq!(id, "local-1");
    }

    #[test]
    fn test_local_game_transport_error() {
        let mut nav = MockNavigator::new();
        let api = MockApi::new();
        *api.local_game_response.borrow_mut() = Err(ApiError::Transport("timeout".to_string()));
        let mut client: MatchmakingClient<MockChannel> = MatchmakingClient::new();
        assert!(matches!(
            client.start_local_game(&api, &mut nav),
            Err(ClientError::Api(ApiError::Transport(_)))
        ));
    }
}
