//! Tournament client - one long-lived channel for a whole bracket
//!
//! Bracket state lives on the server; every `tournament_message` means the
//! bracket changed and the bracket page, if on screen, has to be fetched
//! again. Ready toggles are sent and never applied locally.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::constants::{tournament_view, ROUND_TIMER_INTERVAL, TOURNAMENT_WS_PATH};
use super::error::ClientError;
use super::format::format_countdown;
use super::io_traits::{send_json, ApiClient, ChannelConnector, ChannelEvent, MessageChannel};
use super::protocol::{
    decode, ReadyState, RoundDeadline, TournamentClientMessage, TournamentServerMessage,
    TournamentSnapshot,
};
use super::traits::{Navigator, RoundCountdown};

/// Last bracket data pushed by the server (or supplied by the loaded view)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TournamentView {
    pub tournament_id: Option<String>,
    pub match_id: Option<String>,
    pub ready: BTreeMap<String, bool>,
    pub rounds: Vec<RoundDeadline>,
}

impl TournamentView {
    fn apply(&mut self, snapshot: TournamentSnapshot) {
        if snapshot.match_id.is_some() {
            self.match_id = snapshot.match_id;
        }
        if !snapshot.ready.is_empty() {
            self.ready = snapshot.ready;
        }
        if !snapshot.rounds.is_empty() {
            self.rounds = snapshot.rounds;
        }
    }

    /// Remaining time of every known round at `wall`
    pub fn countdowns(&self, wall: DateTime<Utc>) -> Vec<RoundCountdown> {
        self.rounds
            .iter()
            .map(|r| RoundCountdown {
                round: r.round,
                remaining: format_countdown(r.deadline, wall),
            })
            .collect()
    }
}

pub struct TournamentClient<Ch: MessageChannel> {
    channel: Option<Ch>,
    view: TournamentView,
    last_timer_refresh: Option<Instant>,
}

impl<Ch: MessageChannel> Default for TournamentClient<Ch> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ch: MessageChannel> TournamentClient<Ch> {
    pub fn new() -> Self {
        Self {
            channel: None,
            view: TournamentView::default(),
            last_timer_refresh: None,
        }
    }

    pub fn tournament_id(&self) -> Option<&str> {
        self.view.tournament_id.as_deref()
    }

    pub fn view(&self) -> &TournamentView {
        &self.view
    }

    pub fn is_connected(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_open())
    }

    /// Register for a tournament, then connect and show its page
    pub fn join<C, A, N>(
        &mut self,
        connector: &mut C,
        api: &A,
        nav: &mut N,
        tournament_id: &str,
    ) -> Result<(), ClientError>
    where
        C: ChannelConnector<Channel = Ch>,
        A: ApiClient + ?Sized,
        N: Navigator + ?Sized,
    {
        let response = api.join_tournament(tournament_id).map_err(|e| {
            error!(tournament = %tournament_id, error = %e, "[TOURNAMENT] Join request failed");
            ClientError::from(e)
        })?;
        if !response.is_success() {
            let message = response.failure_message();
            warn!(tournament = %tournament_id, message = %message, "[TOURNAMENT] Join rejected");
            nav.notify(&message);
            return Err(ClientError::Rejected(message));
        }

        self.connect(connector, tournament_id)?;
        let next = response
            .next_url
            .unwrap_or_else(|| tournament_view(tournament_id));
        if let Err(e) = nav.load_view(&next) {
            error!(view = %next, error = %e, "[TOURNAMENT] Failed to load view");
        }
        nav.update_navbar();
        info!(tournament = %tournament_id, "[TOURNAMENT] Joined");
        Ok(())
    }

    /// Open the tournament channel, or reuse the one already open
    pub fn connect<C>(&mut self, connector: &mut C, tournament_id: &str) -> Result<(), ClientError>
    where
        C: ChannelConnector<Channel = Ch>,
    {
        if self.view.tournament_id.as_deref() != Some(tournament_id) {
            self.view = TournamentView {
                tournament_id: Some(tournament_id.to_string()),
                ..Default::default()
            };
        }
        if self.is_connected() {
            debug!(tournament = %tournament_id, "[TOURNAMENT] Reusing open channel");
            return Ok(());
        }
        info!(tournament = %tournament_id, "[TOURNAMENT] Connecting");
        let channel = connector.open(TOURNAMENT_WS_PATH)?;
        self.channel = Some(channel);
        Ok(())
    }

    /// Drain the tournament channel. Returns the session id of a started game.
    ///
    /// The bracket view is only reloaded while it is the page on screen.
    pub fn poll<N: Navigator + ?Sized>(&mut self, nav: &mut N, game_active: bool) -> Option<String> {
        loop {
            let event = self.channel.as_mut()?.poll_event()?;
            match event {
                ChannelEvent::Opened => debug!("[TOURNAMENT] Channel open"),
                ChannelEvent::Text(text) => {
                    match decode::<TournamentServerMessage>("tournament", &text) {
                        Some(TournamentServerMessage::TournamentMessage { message, data }) => {
                            debug!(message = ?message, "[TOURNAMENT] Bracket update");
                            if let Some(snapshot) = data {
                                self.view.apply(snapshot);
                                self.last_timer_refresh = None;
                            }
                            self.refresh(nav, game_active);
                        }
                        Some(TournamentServerMessage::GameStart { session_id }) => {
                            info!(session = %session_id, "[TOURNAMENT] Game start");
                            return Some(session_id);
                        }
                        Some(TournamentServerMessage::Unknown) => {
                            debug!("[TOURNAMENT] Ignoring unknown message type");
                        }
                        None => {}
                    }
                }
                ChannelEvent::Closed { reason } => {
                    info!(reason = ?reason, "[TOURNAMENT] Channel closed");
                    self.channel = None;
                    return None;
                }
                ChannelEvent::Error(e) => {
                    error!(error = %e, "[TOURNAMENT] Channel error");
                    self.channel = None;
                    return None;
                }
            }
        }
    }

    fn refresh<N: Navigator + ?Sized>(&mut self, nav: &mut N, game_active: bool) {
        nav.update_navbar();
        if game_active || !nav.is_showing_tournament() {
            return;
        }
        if let Some(id) = self.view.tournament_id.as_deref() {
            let path = tournament_view(id);
            if let Err(e) = nav.load_view(&path) {
                error!(view = %path, error = %e, "[TOURNAMENT] Failed to reload view");
            }
        }
    }

    /// Send a ready toggle for `match_id`. Logged no-op when not connected.
    pub fn send_ready(&mut self, ready_state: ReadyState, match_id: &str) -> bool {
        let Some(channel) = self.channel.as_mut().filter(|c| c.is_open()) else {
            error!("[TOURNAMENT] Cannot send ready state: channel not open");
            return false;
        };
        let msg = TournamentClientMessage::ReadyStateUpdate {
            ready_state,
            match_id: match_id.to_string(),
        };
        match send_json(channel, &msg) {
            Ok(()) => {
                debug!(match_id = %match_id, ready = ?ready_state, "[TOURNAMENT] Ready state sent");
                true
            }
            Err(e) => {
                error!(error = %e, "[TOURNAMENT] Failed to send ready state");
                false
            }
        }
    }

    /// Round deadlines found in a freshly loaded view
    pub fn observe_round_deadlines(&mut self, rounds: Vec<RoundDeadline>) {
        self.view.rounds = rounds;
        self.last_timer_refresh = None;
    }

    /// Recompute the round countdowns, once a second
    pub fn tick_timers<N: Navigator + ?Sized>(
        &mut self,
        nav: &mut N,
        now: Instant,
        wall: DateTime<Utc>,
    ) {
        if self.view.rounds.is_empty() {
            return;
        }
        let due = self
            .last_timer_refresh
            .map(|t| now.saturating_duration_since(t) >= ROUND_TIMER_INTERVAL)
            .unwrap_or(true);
        if due {
            self.last_timer_refresh = Some(now);
            nav.update_round_timers(&self.view.countdowns(wall));
        }
    }

    /// Close the channel and forget the tournament
    pub fn leave(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.view = TournamentView::default();
        self.last_timer_refresh = None;
    }
}
