//! Game session - one game channel from handshake to teardown
//!
//! The session polls for `game_init`, then mirrors the server's state stream
//! into the shared render frame (rescaled to the current canvas) and streams
//! the held keys back as move commands at a bounded rate. The phase machine
//! itself is the pure `next_phase` function so it can be tested on its own.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::banner::{forfeiting_player, pause_banner, Banner, Language};
use super::constants::{END_BANNER_DURATION, INIT_POLL_INTERVAL};
use super::input::{move_intents, KeyBindings, KeyState, TouchButton};
use super::io_traits::{send_json, ChannelEvent, MessageChannel};
use super::protocol::{
    decode, GameClientMessage, GameInitData, GameServerMessage, GameStateData, ServerStatus,
};
use super::rate_limit::SendRateLimiter;
use super::scaling::ScaleFactors;
use super::traits::{RenderBridge, RenderFrame, SharedFrame};
use super::types::{EntitySnapshot, GameMode, WindowSize};

// =============================================================================
// PHASE MACHINE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Socket handshake in progress
    Connecting,
    /// Polling `game_init_request` until the server answers
    AwaitingInit,
    Active,
    Paused,
    /// Winner or forfeit received, end banner on screen
    Ended,
    /// Torn down; absorbs every input
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseInput {
    ChannelOpened,
    InitReceived,
    StatusReported(ServerStatus),
    /// `winner_message` or `forfeit_notification`
    GameOver,
    /// Channel closed or errored
    ChannelLost,
    /// End banner displayed long enough
    BannerElapsed,
}

/// Pure phase transition
pub fn next_phase(phase: GamePhase, input: PhaseInput) -> GamePhase {
    use GamePhase::*;
    use PhaseInput::*;

    match (phase, input) {
        (Closed, _) => Closed,
        // Teardown waits for the banner
        (Ended, ChannelLost) => Ended,
        (Ended, BannerElapsed) => Closed,
        (_, ChannelLost) => Closed,
        (Connecting, ChannelOpened) => AwaitingInit,
        (Connecting | AwaitingInit, InitReceived) => Active,
        (Active, StatusReported(ServerStatus::Paused)) => Paused,
        (Paused, StatusReported(status))
            if status != ServerStatus::Paused && status != ServerStatus::Unknown =>
        {
            Active
        }
        (Active | Paused, GameOver) => Ended,
        (phase, _) => phase,
    }
}

/// Why a session was (or must be) torn down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownReason {
    /// Server closed the game channel
    ChannelClosed,
    TransportError(String),
    /// End banner elapsed
    GameOver,
    /// A newer session took the slot
    Replaced,
    LoggedOut,
}

impl TeardownReason {
    /// Whether the user should be sent back to a landing view afterwards
    pub fn navigates_away(&self) -> bool {
        !matches!(self, TeardownReason::Replaced | TeardownReason::LoggedOut)
    }
}

// =============================================================================
// GAME SESSION
// =============================================================================

/// One game, owned by the coordinator's session slot
pub struct GameSession<Ch: MessageChannel> {
    session_id: String,
    generation: u64,
    channel: Ch,
    phase: GamePhase,
    language: Language,

    // Set by game_init
    mode: Option<GameMode>,
    window: Option<WindowSize>,
    player1: String,
    player2: String,

    snapshot: EntitySnapshot,
    status: Option<ServerStatus>,
    winner: Option<String>,
    forfeit_message: Option<String>,

    keys: KeyState,
    input_attached: bool,
    send_loop: Option<SendRateLimiter>,
    last_init_request: Option<Instant>,
    ended_at: Option<Instant>,

    frame: SharedFrame,
    rendering: bool,
    torn_down: bool,
}

impl<Ch: MessageChannel> GameSession<Ch> {
    pub fn new(session_id: &str, generation: u64, channel: Ch, language: Language) -> Self {
        let frame = RenderFrame {
            session_id: session_id.to_string(),
            language,
            ..Default::default()
        };
        Self {
            session_id: session_id.to_string(),
            generation,
            channel,
            phase: GamePhase::Connecting,
            language,
            mode: None,
            window: None,
            player1: String::new(),
            player2: String::new(),
            snapshot: EntitySnapshot::default(),
            status: None,
            winner: None,
            forfeit_message: None,
            keys: KeyState::new(),
            input_attached: false,
            send_loop: None,
            last_init_request: None,
            ended_at: None,
            frame: Arc::new(RwLock::new(frame)),
            rendering: false,
            torn_down: false,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.mode
    }

    pub fn window(&self) -> Option<WindowSize> {
        self.window
    }

    pub fn players(&self) -> (&str, &str) {
        (&self.player1, &self.player2)
    }

    pub fn snapshot(&self) -> &EntitySnapshot {
        &self.snapshot
    }

    pub fn status(&self) -> Option<ServerStatus> {
        self.status
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn forfeit_message(&self) -> Option<&str> {
        self.forfeit_message.as_deref()
    }

    pub fn frame(&self) -> SharedFrame {
        Arc::clone(&self.frame)
    }

    pub fn is_input_attached(&self) -> bool {
        self.input_attached
    }

    pub fn is_sending(&self) -> bool {
        self.send_loop.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn is_playing(&self) -> bool {
        matches!(self.phase, GamePhase::Active | GamePhase::Paused)
    }

    fn transition(&mut self, input: PhaseInput) {
        let next = next_phase(self.phase, input);
        if next != self.phase {
            debug!(
                session = %self.session_id,
                from = ?self.phase,
                to = ?next,
                "[GAME] Phase change"
            );
            self.phase = next;
        }
    }

    // -------------------------------------------------------------------------
    // Inbound
    // -------------------------------------------------------------------------

    /// Drain every pending channel event.
    ///
    /// Stops at the first event that requires a teardown.
    pub fn pump<R: RenderBridge + ?Sized>(
        &mut self,
        bridge: &mut R,
        now: Instant,
    ) -> Option<TeardownReason> {
        if self.torn_down {
            return None;
        }
        while let Some(event) = self.channel.poll_event() {
            if let Some(reason) = self.handle_event(event, bridge, now) {
                return Some(reason);
            }
        }
        None
    }

    pub fn handle_event<R: RenderBridge + ?Sized>(
        &mut self,
        event: ChannelEvent,
        bridge: &mut R,
        now: Instant,
    ) -> Option<TeardownReason> {
        match event {
            ChannelEvent::Opened => {
                info!(session = %self.session_id, "[GAME] Channel open");
                self.on_opened(now);
                None
            }
            ChannelEvent::Text(text) => {
                if let Some(msg) = decode::<GameServerMessage>("game", &text) {
                    self.handle_message(msg, bridge, now);
                }
                None
            }
            ChannelEvent::Closed { reason } => {
                info!(session = %self.session_id, reason = ?reason, "[GAME] Channel closed");
                self.on_channel_lost(TeardownReason::ChannelClosed)
            }
            ChannelEvent::Error(e) => {
                error!(session = %self.session_id, error = %e, "[GAME] Channel error");
                self.on_channel_lost(TeardownReason::TransportError(e))
            }
        }
    }

    fn on_opened(&mut self, now: Instant) {
        if self.phase == GamePhase::Connecting {
            self.transition(PhaseInput::ChannelOpened);
            self.last_init_request = Some(now);
        }
    }

    fn on_channel_lost(&mut self, reason: TeardownReason) -> Option<TeardownReason> {
        self.send_loop = None;
        self.transition(PhaseInput::ChannelLost);
        if self.phase == GamePhase::Ended {
            debug!(session = %self.session_id, "[GAME] Channel lost during end banner, teardown deferred");
            return None;
        }
        Some(reason)
    }

    pub fn handle_message<R: RenderBridge + ?Sized>(
        &mut self,
        msg: GameServerMessage,
        bridge: &mut R,
        now: Instant,
    ) {
        match msg {
            GameServerMessage::GameInit { data } => self.on_init(data, bridge, now),
            GameServerMessage::GameState { data } => self.on_state(data, bridge),
            GameServerMessage::WinnerMessage { winner } => {
                if !self.is_playing() && self.phase != GamePhase::Ended {
                    debug!(session = %self.session_id, "[GAME] Winner before init, dropped");
                    return;
                }
                info!(session = %self.session_id, winner = %winner, "[GAME] Winner");
                self.winner = Some(winner);
                self.on_game_over(now);
            }
            GameServerMessage::ForfeitNotification { message } => {
                if !self.is_playing() && self.phase != GamePhase::Ended {
                    debug!(session = %self.session_id, "[GAME] Forfeit before init, dropped");
                    return;
                }
                info!(session = %self.session_id, message = %message, "[GAME] Forfeit");
                self.forfeit_message = Some(message);
                self.on_game_over(now);
            }
            GameServerMessage::Unknown => {
                debug!(session = %self.session_id, "[GAME] Ignoring unknown message type");
            }
        }
    }

    fn on_init<R: RenderBridge + ?Sized>(
        &mut self,
        data: GameInitData,
        bridge: &mut R,
        now: Instant,
    ) {
        if !matches!(self.phase, GamePhase::Connecting | GamePhase::AwaitingInit) {
            debug!(session = %self.session_id, "[GAME] Duplicate game_init ignored");
            return;
        }

        let scale = ScaleFactors::between(data.window, bridge.canvas_size());
        self.window = Some(data.window);
        self.mode = Some(data.mode);
        self.player1 = data.player1;
        self.player2 = data.player2;
        self.snapshot.apply(
            data.state.paddle1.as_ref(),
            data.state.paddle2.as_ref(),
            data.state.ball.as_ref(),
            scale,
        );
        self.transition(PhaseInput::InitReceived);
        if let Some(status) = data.state.status() {
            self.status = Some(status);
            self.transition(PhaseInput::StatusReported(status));
        }

        self.input_attached = true;
        self.send_loop = Some(SendRateLimiter::new(now));
        self.publish(true);
        bridge.start(self.frame());
        self.rendering = true;

        info!(
            session = %self.session_id,
            mode = ?data.mode,
            player1 = %self.player1,
            player2 = %self.player2,
            "[GAME] Game initialized"
        );
    }

    fn on_state<R: RenderBridge + ?Sized>(&mut self, data: GameStateData, bridge: &mut R) {
        if !self.is_playing() {
            debug!(session = %self.session_id, phase = ?self.phase, "[GAME] game_state dropped");
            return;
        }
        let Some(window) = self.window else {
            return;
        };
        let scale = ScaleFactors::between(window, bridge.canvas_size());
        self.snapshot.apply(
            data.paddle1.as_ref(),
            data.paddle2.as_ref(),
            data.ball.as_ref(),
            scale,
        );
        if let Some(status) = data.status() {
            self.status = Some(status);
            self.transition(PhaseInput::StatusReported(status));
        }
        self.publish(true);
    }

    fn on_game_over(&mut self, now: Instant) {
        self.transition(PhaseInput::GameOver);
        if self.ended_at.is_none() {
            self.ended_at = Some(now);
        }
        self.detach_input();
        self.publish(false);
    }

    fn detach_input(&mut self) {
        self.send_loop = None;
        self.keys.clear();
        self.input_attached = false;
    }

    /// Copy the current state into the shared render frame
    fn publish(&self, show_entities: bool) {
        let mut banners = Vec::new();
        if self.phase == GamePhase::Paused {
            banners.extend(pause_banner(&self.snapshot, &self.player1, &self.player2));
        }
        if let Some(message) = &self.forfeit_message {
            banners.push(Banner::Forfeit {
                player: forfeiting_player(message).to_string(),
            });
        }
        if let Some(name) = &self.winner {
            banners.push(Banner::Winner { name: name.clone() });
        }

        let mut frame = self.frame.write();
        frame.mode = self.mode;
        frame.player1 = self.player1.clone();
        frame.player2 = self.player2.clone();
        frame.entities = self.snapshot.clone();
        frame.show_entities = show_entities;
        frame.banners = banners;
        frame.language = self.language;
    }

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    /// Per-frame work: init polling, the move send loop and the end banner
    pub fn tick(&mut self, now: Instant, bindings: &KeyBindings) -> Option<TeardownReason> {
        if self.torn_down {
            return None;
        }

        if self.phase == GamePhase::Connecting && self.channel.is_open() {
            self.on_opened(now);
        }

        match self.phase {
            GamePhase::AwaitingInit => self.poll_init(now),
            GamePhase::Active | GamePhase::Paused => self.run_send_loop(now, bindings),
            GamePhase::Ended => {
                let elapsed = self
                    .ended_at
                    .map(|t| now.saturating_duration_since(t) >= END_BANNER_DURATION)
                    .unwrap_or(true);
                if elapsed {
                    self.transition(PhaseInput::BannerElapsed);
                    return Some(TeardownReason::GameOver);
                }
            }
            GamePhase::Connecting | GamePhase::Closed => {}
        }
        None
    }

    fn poll_init(&mut self, now: Instant) {
        let due = self
            .last_init_request
            .map(|t| now.saturating_duration_since(t) >= INIT_POLL_INTERVAL)
            .unwrap_or(true);
        if !due || !self.channel.is_open() {
            return;
        }
        self.last_init_request = Some(now);
        if let Err(e) = send_json(&mut self.channel, &GameClientMessage::GameInitRequest) {
            warn!(session = %self.session_id, error = %e, "[GAME] Init request failed");
        }
    }

    fn run_send_loop(&mut self, now: Instant, bindings: &KeyBindings) {
        let Some(limiter) = self.send_loop.as_mut() else {
            return;
        };
        if !self.channel.is_open() {
            debug!(session = %self.session_id, "[GAME] Channel not open, send loop stopped");
            self.send_loop = None;
            return;
        }
        if !limiter.ready(now) {
            return;
        }
        let Some(mode) = self.mode else {
            return;
        };
        for intent in move_intents(mode, bindings, &self.keys) {
            let msg = GameClientMessage::MoveCommand { message: intent };
            if let Err(e) = send_json(&mut self.channel, &msg) {
                warn!(session = %self.session_id, error = %e, "[GAME] Move command failed");
                break;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Input
    // -------------------------------------------------------------------------

    pub fn key_down(&mut self, key: &str) {
        if self.input_attached {
            self.keys.press(key);
        }
    }

    pub fn key_up(&mut self, key: &str) {
        if self.input_attached {
            self.keys.release(key);
        }
    }

    pub fn touch_start(&mut self, button: TouchButton) {
        if self.input_attached {
            self.keys.touch_start(button);
        }
    }

    pub fn touch_end(&mut self, button: TouchButton) {
        if self.input_attached {
            self.keys.touch_end(button);
        }
    }

    // -------------------------------------------------------------------------
    // Leaving
    // -------------------------------------------------------------------------

    /// Concede an online game. Returns false when not applicable.
    pub fn forfeit(&mut self) -> bool {
        self.send_leave(GameMode::Online, GameClientMessage::ForfeitMessage)
    }

    /// Abandon a local game. Returns false when not applicable.
    pub fn quit(&mut self) -> bool {
        self.send_leave(GameMode::Local, GameClientMessage::QuitMessage)
    }

    fn send_leave(&mut self, required: GameMode, msg: GameClientMessage) -> bool {
        if self.mode != Some(required) || !self.is_playing() {
            warn!(
                session = %self.session_id,
                mode = ?self.mode,
                phase = ?self.phase,
                "[GAME] {:?} not allowed here",
                msg
            );
            return false;
        }
        match send_json(&mut self.channel, &msg) {
            Ok(()) => true,
            Err(e) => {
                error!(session = %self.session_id, error = %e, "[GAME] Failed to send {:?}", msg);
                false
            }
        }
    }

    /// Release input, the channel and the renderer. Idempotent.
    ///
    /// Returns false if the session was already torn down.
    pub fn teardown<R: RenderBridge + ?Sized>(
        &mut self,
        bridge: &mut R,
        reason: &TeardownReason,
    ) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        self.detach_input();
        self.last_init_request = None;
        self.channel.close();
        if self.rendering {
            bridge.stop();
            self.rendering = false;
        }
        self.phase = GamePhase::Closed;
        info!(session = %self.session_id, reason = ?reason, "[GAME] Session torn down");
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
